//! Fixed-layout blocks of the script binary format.
//!
//! Every block starts with a [`BlockHeader`]. Integers are little-endian and
//! fields are written one by one, so there is no alignment padding.

use std::io::{Read, Seek, Write};

use super::format::*;
use super::stream::{IStream, OStream};
use super::string_table::StringId;
use crate::ast::{NodeId, NodeType, Sequence};
use crate::util::{Error, Result, Timestamp};

/// Block class discriminant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockClass {
    Node,
    Transition,
    StringTable,
}

impl BlockClass {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            BLOCK_CLASS_NODE => Some(Self::Node),
            BLOCK_CLASS_TRANSITION => Some(Self::Transition),
            BLOCK_CLASS_STRING_TABLE => Some(Self::StringTable),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::Node => BLOCK_CLASS_NODE,
            Self::Transition => BLOCK_CLASS_TRANSITION,
            Self::StringTable => BLOCK_CLASS_STRING_TABLE,
        }
    }
}

/// Direction of a transition marker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Opens a child sequence of the most recent node.
    Down,
    /// Closes the innermost open sequence.
    Up,
}

impl Direction {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            DIRECTION_DOWN => Some(Self::Down),
            DIRECTION_UP => Some(Self::Up),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        match self {
            Self::Down => DIRECTION_DOWN,
            Self::Up => DIRECTION_UP,
        }
    }
}

/// Map a transition tag back to the sequence it brackets.
pub fn sequence_from_tag(tag: u32) -> Option<Sequence> {
    match tag {
        0 => Some(Sequence::Default),
        1 => Some(Sequence::Children),
        2 => Some(Sequence::Values),
        3 => Some(Sequence::Overrides),
        _ => None,
    }
}

/// Map a block type back to a node type.
pub fn node_type_from_u32(value: u32) -> Option<NodeType> {
    match value {
        1 => Some(NodeType::Atom),
        2 => Some(NodeType::Object),
        3 => Some(NodeType::Property),
        _ => None,
    }
}

/// Work item on the encoder's explicit stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockEntry {
    Transition { direction: Direction, tag: Sequence },
    Node(NodeId),
}

/// File header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScriptHeader {
    pub magic: u32,
    pub string_table_offset: u64,
    /// Modification time of the text source the tree was compiled from.
    pub last_modified: Timestamp,
}

impl ScriptHeader {
    pub fn new(string_table_offset: u64, last_modified: Timestamp) -> Self {
        Self {
            magic: SCRIPT_MAGIC,
            string_table_offset,
            last_modified,
        }
    }

    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        out.write_u32(self.magic)?;
        out.write_u64(self.string_table_offset)?;
        out.write_u64(self.last_modified)
    }

    /// Read and validate the header.
    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        let magic = input.read_u32()?;
        if magic != SCRIPT_MAGIC {
            return Err(Error::InvalidMagic { found: magic });
        }
        Ok(Self {
            magic,
            string_table_offset: input.read_u64()?,
            last_modified: input.read_u64()?,
        })
    }
}

/// Common prefix of every block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub class: u8,
    pub block_type: u32,
    pub block_id: u32,
}

impl BlockHeader {
    pub fn new(class: BlockClass, block_type: u32, block_id: u32) -> Self {
        Self {
            class: class.as_u8(),
            block_type,
            block_id,
        }
    }

    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        out.write_u8(self.class)?;
        out.write_u32(self.block_type)?;
        out.write_u32(self.block_id)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            class: input.read_u8()?,
            block_type: input.read_u32()?,
            block_id: input.read_u32()?,
        })
    }

    /// Read a header and rewind so the full block can be read afterwards.
    pub fn peek<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        let header = Self::read(input)?;
        input.skip(-(BLOCK_HEADER_SIZE as i64))?;
        Ok(header)
    }

    pub fn class(&self) -> Option<BlockClass> {
        BlockClass::from_u8(self.class)
    }
}

/// Transition marker block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionBlock {
    pub header: BlockHeader,
    pub direction: u32,
    pub user_data: u32,
}

impl TransitionBlock {
    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.header.write(out)?;
        out.write_u32(self.direction)?;
        out.write_u32(self.user_data)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            header: BlockHeader::read(input)?,
            direction: input.read_u32()?,
            user_data: input.read_u32()?,
        })
    }
}

/// Block header plus source line, shared by all node blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeInfo {
    pub header: BlockHeader,
    pub line: u32,
}

impl NodeInfo {
    pub fn new(node_type: NodeType, block_id: u32, line: u32) -> Self {
        Self {
            header: BlockHeader::new(BlockClass::Node, node_type as u32, block_id),
            line,
        }
    }

    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.header.write(out)?;
        out.write_u32(self.line)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            header: BlockHeader::read(input)?,
            line: input.read_u32()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtomBlock {
    pub info: NodeInfo,
    pub id: u32,
    pub value: StringId,
}

impl AtomBlock {
    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.info.write(out)?;
        out.write_u32(self.id)?;
        out.write_u32(self.value)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            info: NodeInfo::read(input)?,
            id: input.read_u32()?,
            value: input.read_u32()?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PropertyBlock {
    pub info: NodeInfo,
    pub id: u32,
    pub name: StringId,
}

impl PropertyBlock {
    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.info.write(out)?;
        out.write_u32(self.id)?;
        out.write_u32(self.name)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            info: NodeInfo::read(input)?,
            id: input.read_u32()?,
            name: input.read_u32()?,
        })
    }
}

/// Fixed part of an object block. The bases and environment variable tails
/// follow it directly in the stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ObjectBlock {
    pub info: NodeInfo,
    pub name: StringId,
    pub cls: StringId,
    pub id: u32,
    pub is_abstract: bool,
    pub bases_count: u64,
    pub env_count: u64,
}

impl ObjectBlock {
    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.info.write(out)?;
        out.write_u32(self.name)?;
        out.write_u32(self.cls)?;
        out.write_u32(self.id)?;
        out.write_bool(self.is_abstract)?;
        out.write_u64(self.bases_count)?;
        out.write_u64(self.env_count)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        Ok(Self {
            info: NodeInfo::read(input)?,
            name: input.read_u32()?,
            cls: input.read_u32()?,
            id: input.read_u32()?,
            is_abstract: input.read_bool()?,
            bases_count: input.read_u64()?,
            env_count: input.read_u64()?,
        })
    }
}

/// Header of the trailing string table section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StringTableBlock {
    pub header: BlockHeader,
    pub count: u64,
}

impl StringTableBlock {
    pub fn write<W: Write + Seek>(&self, out: &mut OStream<W>) -> Result<()> {
        self.header.write(out)?;
        out.write_u64(self.count)
    }

    pub fn read<R: Read + Seek>(input: &mut IStream<R>) -> Result<Self> {
        let header = BlockHeader::read(input)?;
        if header.class() != Some(BlockClass::StringTable) {
            return Err(Error::invalid(format!(
                "expected string table block, found class {}",
                header.class
            )));
        }
        Ok(Self {
            header,
            count: input.read_u64()?,
        })
    }
}
