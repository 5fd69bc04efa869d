//! Script cache: decides when a cached binary may replace a text script.
//!
//! - [`ScriptCacheManager`] - lifecycle hooks and the staleness policy
//! - [`CacheArchive`] - the directory holding cache files
//! - [`CacheConfig`] - extensions, directory and on/off switch
//! - [`GroupProfile`] - per-group timing and counters
//! - [`ScriptCompiler`] / [`ResourceTimestamps`] - injected collaborators

mod archive;
mod collaborator;
mod config;
mod manager;
mod profiler;

pub use archive::*;
pub use collaborator::*;
pub use config::*;
pub use manager::*;
pub use profiler::*;
