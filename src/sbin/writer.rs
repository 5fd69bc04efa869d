//! Script tree encoder.
//!
//! Trees are walked depth-first with an explicit stack. Each child sequence
//! is pushed as a bracketed run `Down, node.., Up`, reversed so that popping
//! yields the nodes in their original order. Blocks are written as they are
//! popped, so stream order is visitation order.

use std::io::{Seek, Write};
use std::path::Path;

use tracing::debug;

use super::block::*;
use super::format::UNUSED_BLOCK_TYPE;
use super::stream::OStream;
use super::string_table::{StringId, StringTable};
use crate::ast::{Ast, NodeId, NodeKind, NodeType, Sequence};
use crate::util::{Error, Result, Timestamp};

/// Encoder for script trees.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    strings: StringTable,
    block_id: u32,
}

impl ScriptWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode `ast` into `sink`, stamping it with the source's modification
    /// time.
    ///
    /// The header is written relative to the sink's starting position and
    /// patched once the string table offset is known; the sink is left
    /// positioned at the end of the stream.
    pub fn serialize<W: Write + Seek>(
        &mut self,
        sink: W,
        ast: &Ast,
        modified: Timestamp,
    ) -> Result<()> {
        let mut out = OStream::new(sink)?;
        self.serialize_into(&mut out, ast, modified)
    }

    #[tracing::instrument(skip_all, fields(nodes = ast.len()))]
    fn serialize_into<W: Write + Seek>(
        &mut self,
        out: &mut OStream<W>,
        ast: &Ast,
        modified: Timestamp,
    ) -> Result<()> {
        self.strings.clear();
        self.block_id = 0;

        let header_pos = out.pos();
        let mut header = ScriptHeader::new(0, modified); // offset patched below
        header.write(out)?;

        let mut stack: Vec<BlockEntry> = Vec::new();
        push_sequence(&mut stack, ast.roots(), Sequence::Default);

        while let Some(entry) = stack.pop() {
            self.write_block(out, ast, entry)?;

            if let BlockEntry::Node(id) = entry {
                match &lookup(ast, id)?.kind {
                    NodeKind::Atom(_) => {}
                    NodeKind::Property(prop) => {
                        push_sequence(&mut stack, prop.values(), Sequence::Default);
                    }
                    NodeKind::Object(obj) => {
                        push_sequence(&mut stack, obj.children(), Sequence::Children);
                        push_sequence(&mut stack, obj.values(), Sequence::Values);
                        push_sequence(&mut stack, obj.overrides(), Sequence::Overrides);
                    }
                }
            }
        }

        header.string_table_offset = out.pos() - header_pos;
        self.write_string_table(out)?;
        let end = out.pos();

        out.seek(header_pos)?;
        header.write(out)?;
        out.seek(end)?;
        out.flush()?;

        debug!(
            "serialized {} blocks, {} strings, {} bytes",
            self.block_id,
            self.strings.len(),
            end - header_pos
        );
        Ok(())
    }

    /// Encode into a fresh byte vector.
    pub fn serialize_to_vec(&mut self, ast: &Ast, modified: Timestamp) -> Result<Vec<u8>> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        self.serialize(&mut cursor, ast, modified)?;
        Ok(cursor.into_inner())
    }

    /// Encode into a file, creating or truncating it.
    pub fn write_file(&mut self, path: impl AsRef<Path>, ast: &Ast, modified: Timestamp) -> Result<()> {
        let mut out = OStream::create(path)?;
        self.serialize_into(&mut out, ast, modified)
    }

    /// String table of the last pass.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Number of blocks written by the last pass, string table included.
    pub fn block_count(&self) -> u32 {
        self.block_id
    }

    fn next_block_id(&mut self) -> u32 {
        self.block_id += 1;
        self.block_id
    }

    fn write_block<W: Write + Seek>(
        &mut self,
        out: &mut OStream<W>,
        ast: &Ast,
        entry: BlockEntry,
    ) -> Result<()> {
        match entry {
            BlockEntry::Transition { direction, tag } => TransitionBlock {
                header: BlockHeader::new(
                    BlockClass::Transition,
                    UNUSED_BLOCK_TYPE,
                    self.next_block_id(),
                ),
                direction: direction.as_u32(),
                user_data: tag as u32,
            }
            .write(out),
            BlockEntry::Node(id) => {
                let node = lookup(ast, id)?;
                let block_id = self.next_block_id();
                match &node.kind {
                    NodeKind::Atom(atom) => AtomBlock {
                        info: NodeInfo::new(NodeType::Atom, block_id, node.line),
                        id: atom.id,
                        value: self.strings.intern(&atom.value),
                    }
                    .write(out),
                    NodeKind::Property(prop) => PropertyBlock {
                        info: NodeInfo::new(NodeType::Property, block_id, node.line),
                        id: prop.id,
                        name: self.strings.intern(&prop.name),
                    }
                    .write(out),
                    NodeKind::Object(obj) => {
                        ObjectBlock {
                            info: NodeInfo::new(NodeType::Object, block_id, node.line),
                            name: self.strings.intern(&obj.name),
                            cls: self.strings.intern(&obj.cls),
                            id: obj.id,
                            is_abstract: obj.is_abstract,
                            bases_count: obj.bases.len() as u64,
                            env_count: obj.variables.len() as u64,
                        }
                        .write(out)?;

                        for base in &obj.bases {
                            let id = self.strings.intern(base);
                            out.write_u32(id)?;
                        }
                        for (key, value) in &obj.variables {
                            let key_id = self.strings.intern(key);
                            let value_id = self.strings.intern(value);
                            out.write_u32(key_id)?;
                            out.write_u32(value_id)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }

    fn write_string_table<W: Write + Seek>(&mut self, out: &mut OStream<W>) -> Result<()> {
        StringTableBlock {
            header: BlockHeader::new(
                BlockClass::StringTable,
                UNUSED_BLOCK_TYPE,
                self.next_block_id(),
            ),
            count: self.strings.len() as u64,
        }
        .write(out)?;

        for (id, value) in self.strings.iter() {
            let len = string_len(id, value)?;
            out.write_u32(id)?;
            out.write_u32(len)?;
            out.write_bytes(value.as_bytes())?;
        }
        Ok(())
    }
}

/// Push `Down, nodes.., Up` so that popping yields them in order.
fn push_sequence(stack: &mut Vec<BlockEntry>, nodes: &[NodeId], tag: Sequence) {
    stack.push(BlockEntry::Transition {
        direction: Direction::Up,
        tag,
    });
    stack.extend(nodes.iter().rev().map(|&id| BlockEntry::Node(id)));
    stack.push(BlockEntry::Transition {
        direction: Direction::Down,
        tag,
    });
}

fn lookup(ast: &Ast, id: NodeId) -> Result<&crate::ast::Node> {
    ast.get(id)
        .ok_or_else(|| Error::serialization(format!("node {} is not in the tree", id.index())))
}

fn string_len(id: StringId, value: &str) -> Result<u32> {
    u32::try_from(value.len()).map_err(|_| {
        Error::serialization(format!(
            "string {id} is {} bytes, longer than the format allows",
            value.len()
        ))
    })
}
