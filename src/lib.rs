//! # Script Cache
//!
//! Binary caching of parsed script trees.
//!
//! Parsing text scripts (materials, GPU programs, particle systems,
//! compositors) on every start is slow. This crate stores the parsed tree of
//! each script in a compact binary file and, on later runs, hands the cached
//! tree to the compiler instead of re-parsing the text, as long as the text
//! has not been modified since the binary was written.
//!
//! ## Modules
//!
//! - [`util`] - Errors and shared types
//! - [`ast`] - Arena-backed script tree (atoms, properties, objects)
//! - [`sbin`] - Binary format: string table, blocks, encoder, decoder
//! - [`cache`] - Cache directory, configuration and coherency manager
//!
//! ## Example
//!
//! ```no_run
//! use scriptcache::prelude::*;
//!
//! let mut ast = Ast::new();
//! let mat = ast.add_root(Node::object("mat1", "material").at("a.material", 1));
//! let diffuse = ast.add(mat, Sequence::Children, Node::property("diffuse"))?;
//! ast.add(diffuse, Sequence::Default, Node::atom("1.0"))?;
//!
//! ScriptWriter::new().write_file("a.material.sbin", &ast, 0)?;
//! let cached = ScriptReader::new().read_file("a.material.sbin")?;
//! assert_eq!(cached, ast);
//! # Ok::<(), scriptcache::Error>(())
//! ```

pub mod util;
pub mod ast;
pub mod sbin;
pub mod cache;

// Re-export commonly used types
pub use util::{Error, Result, Timestamp};
pub use ast::{Ast, Node, NodeId, NodeKind, NodeType, Sequence};
pub use sbin::{ScriptReader, ScriptWriter};
pub use cache::{CacheConfig, ScriptCacheManager, ScriptDecision};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result, Timestamp};
    pub use crate::ast::{Ast, Node, NodeId, NodeKind, NodeType, Sequence};
    pub use crate::sbin::{ScriptHeader, ScriptReader, ScriptWriter, StringTable};
    pub use crate::cache::{
        CacheArchive, CacheConfig, CompileError, FsResourceTimestamps, GroupProfile,
        ResourceTimestamps, ScriptCacheManager, ScriptCompiler, ScriptDecision,
    };
}
