//! Cache configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::util::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "scriptcache.json";

/// Script cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Suffix appended to a script name to form its cache file name
    pub extension: String,
    /// Directory the cache files are kept in
    pub cache_dir: PathBuf,
    /// Source extensions (without the dot) whose scripts are cached
    pub script_extensions: Vec<String>,
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            extension: ".sbin".to_string(),
            cache_dir: PathBuf::from(".scriptCache"),
            script_extensions: ["program", "material", "particle", "compositor"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Load settings from a JSON file.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let mut config: Self = serde_json::from_str(&text)?;
        config.normalize()?;
        Ok(config)
    }

    /// Load settings, falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            warn!("ignoring cache config {}: {}", path.display(), e);
            Self::default()
        })
    }

    /// Save settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Whether `name` is a cache file (ends with the binary extension).
    pub fn is_binary(&self, name: &str) -> bool {
        name.rfind('.')
            .map(|i| &name[i..] == self.extension)
            .unwrap_or(false)
    }

    /// Whether scripts named `name` are eligible for caching.
    pub fn is_eligible(&self, name: &str) -> bool {
        match name.rsplit_once('.') {
            Some((_, ext)) => self.script_extensions.iter().any(|e| e == ext),
            None => false,
        }
    }

    /// Cache file name for a text script.
    pub fn binary_name(&self, script: &str) -> String {
        format!("{}{}", script, self.extension)
    }

    /// Load patterns for cache files, one per eligible extension.
    pub fn patterns(&self) -> Vec<String> {
        self.script_extensions
            .iter()
            .map(|ext| format!("*.{}{}", ext, self.extension))
            .collect()
    }

    /// Bring extensions into canonical form: a leading dot on the cache
    /// suffix, none on source extensions. Fails on an empty or multi-part
    /// cache suffix.
    pub fn normalize(&mut self) -> Result<()> {
        if self.extension.is_empty() || self.extension == "." {
            return Err(Error::Config("cache extension must not be empty".to_string()));
        }
        if !self.extension.starts_with('.') {
            self.extension.insert(0, '.');
        }
        if self.extension[1..].contains('.') {
            return Err(Error::Config(format!(
                "cache extension {:?} must be a single suffix",
                self.extension
            )));
        }
        for ext in &mut self.script_extensions {
            if let Some(stripped) = ext.strip_prefix('.') {
                *ext = stripped.to_string();
            }
        }
        Ok(())
    }
}
