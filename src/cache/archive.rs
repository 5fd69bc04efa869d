//! Directory holding cached script binaries.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::ast::Ast;
use crate::sbin::{read_header_file, ScriptReader, ScriptWriter};
use crate::util::{Error, Result, Timestamp};

/// Cache directory handle.
#[derive(Debug, Clone)]
pub struct CacheArchive {
    dir: PathBuf,
}

impl CacheArchive {
    /// Open the cache directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(Error::CacheDir {
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "path exists and is not a directory",
                ),
                path: dir,
            });
        }
        if let Err(source) = std::fs::create_dir_all(&dir) {
            return Err(Error::CacheDir { path: dir, source });
        }
        debug!("cache directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Location of a cache file.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path(name).is_file()
    }

    /// Source modification time stored in a cache file's header.
    pub fn stored_timestamp(&self, name: &str) -> Result<Timestamp> {
        Ok(read_header_file(self.path(name))?.last_modified)
    }

    pub fn load(&self, name: &str) -> Result<Ast> {
        ScriptReader::new().read_file(self.path(name))
    }

    /// Write a cache file. A partially written file is removed on failure.
    pub fn store(&self, name: &str, ast: &Ast, modified: Timestamp) -> Result<()> {
        let path = self.path(name);
        let result = ScriptWriter::new().write_file(&path, ast, modified);
        if result.is_err() {
            let _ = std::fs::remove_file(&path);
        }
        result
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        match std::fs::remove_file(self.path(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Node, Sequence};
    use tempfile::tempdir;

    #[test]
    fn test_store_and_load() -> Result<()> {
        let dir = tempdir()?;
        let archive = CacheArchive::open(dir.path().join("cache"))?;
        assert!(archive.dir().is_dir());

        let mut ast = Ast::new();
        let p = ast.add_root(Node::property("lod_distances").at("a.material", 4));
        ast.add(p, Sequence::Default, Node::atom("100").at("a.material", 4))?;

        assert!(!archive.exists("a.material.sbin"));
        archive.store("a.material.sbin", &ast, 99)?;
        assert!(archive.exists("a.material.sbin"));
        assert_eq!(archive.stored_timestamp("a.material.sbin")?, 99);

        let loaded = archive.load("a.material.sbin")?;
        assert_eq!(loaded, ast);
        assert_eq!(loaded.file(), Some("a.material.sbin"));

        archive.remove("a.material.sbin")?;
        archive.remove("a.material.sbin")?;
        assert!(!archive.exists("a.material.sbin"));
        Ok(())
    }

    #[test]
    fn test_open_over_file() -> Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("cache");
        std::fs::write(&blocker, "")?;
        assert!(matches!(
            CacheArchive::open(&blocker),
            Err(Error::CacheDir { .. })
        ));
        Ok(())
    }
}
