//! Script cache coherency.
//!
//! [`ScriptCacheManager`] sits between a resource system and a script
//! compiler. The resource system reports group and script lifecycle events;
//! the manager decides per script whether the cached binary can stand in for
//! the text, and writes a fresh binary after every clean text compile.
//!
//! A cached tree is used only while the text source's modification time is
//! not newer than the one stamped into the binary's header. Trees that failed
//! to compile are never written.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use super::archive::CacheArchive;
use super::collaborator::{CompileError, ResourceTimestamps, ScriptCompiler};
use super::config::CacheConfig;
use super::profiler::GroupProfile;
use crate::ast::Ast;
use crate::util::Result;

/// What the caller should do with a script after [`ScriptCacheManager::on_script_start`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptDecision {
    /// Parse and compile the text as usual.
    Parse,
    /// The cached tree was already compiled; skip the text.
    Skip,
}

/// Cache coherency manager for one resource system.
pub struct ScriptCacheManager<C: ScriptCompiler, T: ResourceTimestamps> {
    config: CacheConfig,
    archive: Option<CacheArchive>,
    compiler: C,
    timestamps: T,
    active_group: String,
    active_script: String,
    invalid: HashSet<String>,
    profile: Option<GroupProfile>,
    last_profile: Option<GroupProfile>,
}

impl<C: ScriptCompiler, T: ResourceTimestamps> ScriptCacheManager<C, T> {
    /// Create a manager, opening (and if needed creating) the cache
    /// directory. If the directory cannot be used, caching is disabled for
    /// the lifetime of the manager.
    pub fn new(mut config: CacheConfig, compiler: C, timestamps: T) -> Self {
        let archive = if let Err(e) = config.normalize() {
            warn!("script cache disabled: {}", e);
            None
        } else if config.enabled {
            match CacheArchive::open(&config.cache_dir) {
                Ok(archive) => Some(archive),
                Err(e) => {
                    warn!("script cache disabled: {}", e);
                    None
                }
            }
        } else {
            debug!("script cache disabled by configuration");
            None
        };

        Self {
            config,
            archive,
            compiler,
            timestamps,
            active_group: String::new(),
            active_script: String::new(),
            invalid: HashSet::new(),
            profile: None,
            last_profile: None,
        }
    }

    /// Whether cache files are being read and written.
    pub fn is_enabled(&self) -> bool {
        self.archive.is_some()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn archive(&self) -> Option<&CacheArchive> {
        self.archive.as_ref()
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn compiler_mut(&mut self) -> &mut C {
        &mut self.compiler
    }

    pub fn timestamps(&self) -> &T {
        &self.timestamps
    }

    pub fn timestamps_mut(&mut self) -> &mut T {
        &mut self.timestamps
    }

    pub fn active_group(&self) -> &str {
        &self.active_group
    }

    pub fn active_script(&self) -> &str {
        &self.active_script
    }

    /// Whether `name` reported a compile error since its last parse started.
    pub fn is_invalid(&self, name: &str) -> bool {
        self.invalid.contains(name)
    }

    /// Profile of the running group, or of the last finished one.
    pub fn profile(&self) -> Option<&GroupProfile> {
        self.profile.as_ref().or(self.last_profile.as_ref())
    }

    /// Load patterns a resource system should register so cache files are
    /// picked up alongside text scripts. Empty while caching is disabled.
    pub fn script_patterns(&self) -> Vec<String> {
        if self.archive.is_none() {
            return Vec::new();
        }
        self.config.patterns()
    }

    pub fn on_group_start(&mut self, group: &str, script_count: usize) {
        debug!("group {} scripting started ({} scripts)", group, script_count);
        self.active_group = group.to_string();
        self.profile = Some(GroupProfile::start(group, script_count));
    }

    /// Decide how `name` is processed.
    ///
    /// A name carrying the binary extension is loaded straight from the
    /// cache and compiled; failures are returned since there is no text to
    /// fall back to. A text name is served from the cache when a fresh
    /// binary exists; otherwise, or if the binary cannot be read, the caller
    /// parses the text.
    #[tracing::instrument(skip(self), fields(group = %self.active_group))]
    pub fn on_script_start(&mut self, name: &str) -> Result<ScriptDecision> {
        self.active_script = name.to_string();
        self.invalid.remove(name);

        let Some(archive) = &self.archive else {
            return Ok(ScriptDecision::Parse);
        };

        if self.config.is_binary(name) {
            let ast = archive.load(name)?;
            info!("processing binary script: {}", name);
            self.compile_cached(name, &ast);
            return Ok(ScriptDecision::Skip);
        }

        if !self.config.is_eligible(name) {
            return Ok(ScriptDecision::Parse);
        }

        let binary = self.config.binary_name(name);
        if !archive.exists(&binary) {
            self.record(|p| p.misses += 1);
            return Ok(ScriptDecision::Parse);
        }

        let stored = match archive.stored_timestamp(&binary) {
            Ok(stamp) => stamp,
            Err(e) => {
                warn!("unreadable cache file {}: {}", binary, e);
                self.record(|p| p.corrupt += 1);
                return Ok(ScriptDecision::Parse);
            }
        };
        let source = self.timestamps.modified_time(&self.active_group, name);
        if source > stored {
            info!("file changed, re-parsing: {}", name);
            self.record(|p| p.stale += 1);
            return Ok(ScriptDecision::Parse);
        }

        let ast = match archive.load(&binary) {
            Ok(ast) => ast,
            Err(e) => {
                warn!("corrupt cache file {}: {}", binary, e);
                self.record(|p| p.corrupt += 1);
                return Ok(ScriptDecision::Parse);
            }
        };
        info!("processing binary script: {}", binary);
        self.compile_cached(name, &ast);
        Ok(ScriptDecision::Skip)
    }

    /// Record a compile error. The script's next tree will not be cached.
    pub fn on_compile_error(&mut self, name: &str, code: u32, line: u32, message: &str) {
        warn!("{}:{}: error {}: {}", name, line, code, message);
        self.invalid.insert(name.to_string());
    }

    /// Cache a tree the compiler just accepted. Returns whether a cache file
    /// was written.
    pub fn on_compile_success(&mut self, ast: &Ast) -> Result<bool> {
        let name = match ast.file() {
            Some(file) if !file.is_empty() => file.to_string(),
            _ => self.active_script.clone(),
        };
        let invalid = self.invalid.remove(&name);

        let Some(archive) = &self.archive else {
            return Ok(false);
        };
        if self.config.is_binary(&name) || !self.config.is_eligible(&name) {
            return Ok(false);
        }

        if invalid {
            info!("not caching {}: compile reported errors", name);
            self.record(|p| p.skipped_invalid += 1);
            return Ok(false);
        }

        let modified = self.timestamps.modified_time(&self.active_group, &name);
        archive.store(&self.config.binary_name(&name), ast, modified)?;
        debug!("cached {} (source time {})", name, modified);
        self.record(|p| p.stored += 1);
        Ok(true)
    }

    /// Finish the group's profile and log it.
    pub fn on_group_end(&mut self, group: &str) -> Option<&GroupProfile> {
        if let Some(mut profile) = self.profile.take() {
            if profile.group != group {
                debug!("group {} ended while {} was active", group, profile.group);
            }
            profile.finish();
            info!("{}", profile);
            self.last_profile = Some(profile);
        }
        self.last_profile.as_ref()
    }

    fn compile_cached(&mut self, name: &str, ast: &Ast) {
        let errors = self.compiler.compile_from_tree(ast, &self.active_group);
        self.record(|p| p.hits += 1);
        for CompileError {
            code, line, message, ..
        } in errors
        {
            // A binary-named script is never cached, so there is nothing to
            // suppress.
            if self.config.is_binary(name) {
                warn!("{}:{}: error {}: {}", name, line, code, message);
            } else {
                self.on_compile_error(name, code, line, &message);
            }
        }
    }

    fn record(&mut self, update: impl FnOnce(&mut GroupProfile)) {
        if let Some(profile) = self.profile.as_mut() {
            update(profile);
        }
    }
}
