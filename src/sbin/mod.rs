//! Binary script tree format.
//!
//! A cached script is a parsed tree flattened into a linear run of blocks.
//! Child sequences are bracketed by transition markers, so the tree can be
//! rebuilt with a stack instead of recursion. All text lives in a string
//! table at the end of the stream and node blocks refer to it by ID.
//!
//! ## File Structure
//!
//! ```text
//! +---------------------+
//! | Magic: "SBIN"       |  4 bytes (u32 LE)
//! +---------------------+
//! | String Table Offset |  8 bytes (u64 LE, from header start)
//! +---------------------+
//! | Last Modified       |  8 bytes (u64 LE, seconds)
//! +---------------------+
//! | Down                |  transition, tag 0
//! | Node ...            |  preorder, each followed by its
//! | Down .. Up          |  bracketed child sequences
//! | Up                  |
//! +---------------------+
//! | String Table        |  count, then (id, len, bytes)...
//! +---------------------+
//! ```
//!
//! Every block opens with a 9 byte header: class (u8), type (u32) and
//! block ID (u32).

mod block;
mod format;
mod reader;
mod stream;
mod string_table;
mod writer;

#[cfg(test)]
mod tests;

pub use block::*;
pub use format::*;
pub use reader::*;
pub use stream::*;
pub use string_table::*;
pub use writer::*;
