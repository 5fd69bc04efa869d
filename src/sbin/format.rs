//! Script binary format constants.

/// Magic value at the start of every cached script (`b"SBIN"` read as a
/// little-endian `u32`).
pub const SCRIPT_MAGIC: u32 = u32::from_le_bytes(*b"SBIN");

/// Size of the file header in bytes: magic, string table offset, timestamp.
pub const HEADER_SIZE: usize = 20;

/// Offset of the string table position in the header.
pub const STRING_TABLE_OFFSET_POS: usize = 4;

/// Offset of the source modification time in the header.
pub const LAST_MODIFIED_POS: usize = 12;

/// Size of the common block header: class, type, block ID.
pub const BLOCK_HEADER_SIZE: usize = 9;

/// Size of the node info prefix: block header plus line number.
pub const NODE_INFO_SIZE: usize = BLOCK_HEADER_SIZE + 4;

/// Block class of node blocks.
pub const BLOCK_CLASS_NODE: u8 = 0x01;

/// Block class of tree transition markers.
pub const BLOCK_CLASS_TRANSITION: u8 = 0x02;

/// Block class of the trailing string table.
pub const BLOCK_CLASS_STRING_TABLE: u8 = 0x03;

/// Transition opening a child sequence.
pub const DIRECTION_DOWN: u32 = 1;

/// Transition closing a child sequence.
pub const DIRECTION_UP: u32 = 2;

/// First ID handed out by a fresh string table.
pub const FIRST_STRING_ID: u32 = 1;

/// Block type written for blocks whose type field carries no meaning.
pub const UNUSED_BLOCK_TYPE: u32 = 0;
