//! Script tree decoder.
//!
//! Decoding takes two passes over the stream. The string table is read
//! first by seeking to the offset recorded in the header; then the node and
//! transition region is read linearly from just after the header, using an
//! explicit stack of `(parent, sequence)` pairs opened by `Down` markers and
//! closed by `Up` markers. The string table block terminates the region.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::debug;

use super::block::*;
use super::format::HEADER_SIZE;
use super::stream::IStream;
use super::string_table::{StringId, StringTable};
use crate::ast::{Ast, Node, NodeId, NodeType, Sequence};
use crate::util::{Error, Result};

/// Decoder for script trees.
#[derive(Debug, Default)]
pub struct ScriptReader {
    strings: StringTable,
    blocks: u32,
}

impl ScriptReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a stream. `file_name` is recorded as the `file` of every node.
    #[tracing::instrument(skip_all, fields(file = file_name))]
    pub fn deserialize<R: Read + Seek>(&mut self, source: R, file_name: &str) -> Result<Ast> {
        let mut input = IStream::new(source)?;
        let start = input.pos();
        let header = ScriptHeader::read(&mut input)?;

        let table = start
            .checked_add(header.string_table_offset)
            .ok_or_else(|| Error::invalid("string table offset out of range"))?;
        input.seek(table)?;
        self.strings.clear();
        self.blocks = 0;
        self.read_string_table(&mut input)?;

        input.seek(start + HEADER_SIZE as u64)?;

        let mut ast = Ast::new();
        let mut parents: Vec<(Option<NodeId>, Sequence)> = Vec::new();
        let mut current: Option<NodeId> = None;

        loop {
            let block = BlockHeader::peek(&mut input)?;
            self.blocks += 1;
            match block.class() {
                Some(BlockClass::Transition) => {
                    let transition = TransitionBlock::read(&mut input)?;
                    match Direction::from_u32(transition.direction) {
                        Some(Direction::Down) => {
                            let tag = sequence_from_tag(transition.user_data).ok_or_else(|| {
                                Error::malformed(format!(
                                    "unknown sequence tag {} in block {}",
                                    transition.user_data, block.block_id
                                ))
                            })?;
                            parents.push((current, tag));
                        }
                        Some(Direction::Up) => {
                            let (node, _) = parents.pop().ok_or_else(|| {
                                Error::malformed(format!(
                                    "block {} closes a sequence that was never opened",
                                    block.block_id
                                ))
                            })?;
                            current = node;
                        }
                        None => {
                            return Err(Error::malformed(format!(
                                "unknown transition direction {} in block {}",
                                transition.direction, block.block_id
                            )));
                        }
                    }
                }
                Some(BlockClass::Node) => {
                    let node = self.read_node(&mut input, &block, file_name)?;
                    let id = match parents.last() {
                        Some(&(Some(parent), tag)) => ast.add(parent, tag, node)?,
                        _ => ast.add_root(node),
                    };
                    current = Some(id);
                }
                Some(BlockClass::StringTable) => break,
                None => {
                    return Err(Error::invalid(format!(
                        "unknown block class {} at offset {}",
                        block.class,
                        input.pos()
                    )));
                }
            }
        }

        if !parents.is_empty() {
            return Err(Error::malformed(format!(
                "{} sequence(s) left open at end of tree data",
                parents.len()
            )));
        }

        debug!(
            "deserialized {} nodes, {} strings",
            ast.len(),
            self.strings.len()
        );
        Ok(ast)
    }

    /// Decode an in-memory buffer.
    pub fn deserialize_slice(&mut self, bytes: &[u8], file_name: &str) -> Result<Ast> {
        self.deserialize(std::io::Cursor::new(bytes), file_name)
    }

    /// Decode a file. Nodes record the file name (without directories).
    pub fn read_file(&mut self, path: impl AsRef<Path>) -> Result<Ast> {
        let path = path.as_ref();
        let file = open(path)?;
        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::UnexpectedEof(size));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        #[cfg(feature = "mmap")]
        {
            // Safety: the mapping is read-only and dropped before returning.
            // Cache files are only rewritten by this process between decode
            // calls, never during one.
            let mmap = unsafe { memmap2::Mmap::map(&file) }?;
            self.deserialize(std::io::Cursor::new(&mmap[..]), &name)
        }

        #[cfg(not(feature = "mmap"))]
        {
            self.deserialize(BufReader::new(file), &name)
        }
    }

    /// String table of the last pass.
    pub fn strings(&self) -> &StringTable {
        &self.strings
    }

    /// Number of blocks read by the last pass, string table included.
    pub fn block_count(&self) -> u32 {
        self.blocks
    }

    fn read_string_table<R: Read + Seek>(&mut self, input: &mut IStream<R>) -> Result<()> {
        let block = StringTableBlock::read(input)?;
        for _ in 0..block.count {
            let id = input.read_u32()?;
            let len = input.read_u32()? as usize;
            let bytes = input.read_bytes(len)?;
            self.strings.insert(id, String::from_utf8(bytes)?);
        }
        Ok(())
    }

    fn read_node<R: Read + Seek>(
        &self,
        input: &mut IStream<R>,
        header: &BlockHeader,
        file_name: &str,
    ) -> Result<Node> {
        let node_type = node_type_from_u32(header.block_type).ok_or_else(|| {
            Error::invalid(format!(
                "unknown node type {} in block {}",
                header.block_type, header.block_id
            ))
        })?;

        match node_type {
            NodeType::Atom => {
                let block = AtomBlock::read(input)?;
                Ok(Node::atom(self.resolve(block.value)?)
                    .with_id(block.id)
                    .at(file_name, block.info.line))
            }
            NodeType::Property => {
                let block = PropertyBlock::read(input)?;
                Ok(Node::property(self.resolve(block.name)?)
                    .with_id(block.id)
                    .at(file_name, block.info.line))
            }
            NodeType::Object => {
                let block = ObjectBlock::read(input)?;
                let mut node = Node::object(self.resolve(block.name)?, self.resolve(block.cls)?)
                    .with_id(block.id)
                    .with_abstract(block.is_abstract)
                    .at(file_name, block.info.line);

                for _ in 0..block.bases_count {
                    let id = input.read_u32()?;
                    node = node.with_base(self.resolve(id)?);
                }
                for _ in 0..block.env_count {
                    let key = input.read_u32()?;
                    let value = input.read_u32()?;
                    node = node.with_variable(self.resolve(key)?, self.resolve(value)?);
                }
                Ok(node)
            }
        }
    }

    fn resolve(&self, id: StringId) -> Result<&str> {
        self.strings.resolve(id)
    }
}

/// Read and validate only the header of a stream.
pub fn read_header<R: Read + Seek>(source: R) -> Result<ScriptHeader> {
    let mut input = IStream::new(source)?;
    ScriptHeader::read(&mut input)
}

/// Read and validate only the header of a file.
pub fn read_header_file(path: impl AsRef<Path>) -> Result<ScriptHeader> {
    let file = open(path.as_ref())?;
    read_header(BufReader::new(file))
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })
}
