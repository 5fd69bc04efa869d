//! Interfaces the cache manager consumes.
//!
//! The manager never parses or compiles scripts itself. It hands decoded
//! trees to a [`ScriptCompiler`] and asks a [`ResourceTimestamps`] source how
//! old each text script is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::ast::Ast;
use crate::util::Timestamp;

// ============================================================================
// Compiler
// ============================================================================

/// Diagnostic reported by a compiler for one script.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{file}:{line}: error {code}: {message}")]
pub struct CompileError {
    pub code: u32,
    pub file: String,
    pub line: u32,
    pub message: String,
}

impl CompileError {
    pub fn new(code: u32, file: impl Into<String>, line: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// Consumer of parsed script trees.
pub trait ScriptCompiler {
    /// Translate `ast` into resources of `group`. Returns the diagnostics;
    /// an empty list means the tree compiled cleanly.
    fn compile_from_tree(&mut self, ast: &Ast, group: &str) -> Vec<CompileError>;
}

impl<C: ScriptCompiler + ?Sized> ScriptCompiler for &mut C {
    fn compile_from_tree(&mut self, ast: &Ast, group: &str) -> Vec<CompileError> {
        (**self).compile_from_tree(ast, group)
    }
}

impl<C: ScriptCompiler + ?Sized> ScriptCompiler for Box<C> {
    fn compile_from_tree(&mut self, ast: &Ast, group: &str) -> Vec<CompileError> {
        (**self).compile_from_tree(ast, group)
    }
}

// ============================================================================
// Timestamps
// ============================================================================

/// Source of modification times for text scripts.
pub trait ResourceTimestamps {
    /// Modification time of `name` in `group`, or 0 when unknown.
    fn modified_time(&self, group: &str, name: &str) -> Timestamp;
}

impl<T: ResourceTimestamps + ?Sized> ResourceTimestamps for &T {
    fn modified_time(&self, group: &str, name: &str) -> Timestamp {
        (**self).modified_time(group, name)
    }
}

/// Timestamps read from the filesystem.
///
/// Each group may be mapped to its own directory; unmapped groups resolve
/// names against the root directory.
#[derive(Debug, Clone)]
pub struct FsResourceTimestamps {
    root: PathBuf,
    groups: HashMap<String, PathBuf>,
}

impl FsResourceTimestamps {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            groups: HashMap::new(),
        }
    }

    /// Resolve scripts of `group` against `dir`.
    pub fn with_group(mut self, group: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.groups.insert(group.into(), dir.into());
        self
    }

    /// Path a script name resolves to.
    pub fn resolve(&self, group: &str, name: &str) -> PathBuf {
        self.groups.get(group).unwrap_or(&self.root).join(name)
    }
}

impl ResourceTimestamps for FsResourceTimestamps {
    fn modified_time(&self, group: &str, name: &str) -> Timestamp {
        file_modified(&self.resolve(group, name)).unwrap_or(0)
    }
}

/// Modification time of a file in whole seconds since the Unix epoch.
pub fn file_modified(path: &Path) -> Option<Timestamp> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .map(|d| d.as_secs())
}
