use super::*;
use crate::ast::{Ast, Node, Sequence};
use std::io::Cursor;
use tempfile::NamedTempFile;

fn material() -> crate::util::Result<Ast> {
    let mut ast = Ast::new();
    let base = ast.add_root(
        Node::object("base", "material")
            .at("a.material", 1)
            .with_abstract(true),
    );
    let tech = ast.add(base, Sequence::Children, Node::object("", "technique").at("a.material", 3))?;
    let pass = ast.add(tech, Sequence::Children, Node::object("", "pass").at("a.material", 4))?;
    let ambient = ast.add(pass, Sequence::Children, Node::property("ambient").at("a.material", 5))?;
    for v in ["1", "1", "1"] {
        ast.add(ambient, Sequence::Default, Node::atom(v).at("a.material", 5))?;
    }

    let derived = ast.add_root(
        Node::object("derived", "material")
            .at("a.material", 9)
            .with_id(7)
            .with_base("base")
            .with_variable("diffuse", "0 0 1"),
    );
    ast.add(derived, Sequence::Values, Node::atom("extra").at("a.material", 9))?;
    ast.add(derived, Sequence::Overrides, Node::object("", "technique").at("a.material", 10))?;
    Ok(ast)
}

#[test]
fn test_write_and_read_file() -> crate::util::Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    let ast = material()?;
    ScriptWriter::new().write_file(path, &ast, 1_700_000_000)?;

    let header = read_header_file(path)?;
    assert_eq!(header.magic, SCRIPT_MAGIC);
    assert_eq!(header.last_modified, 1_700_000_000);

    let decoded = ScriptReader::new().read_file(path)?;
    assert_eq!(decoded, ast);

    let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(decoded.iter().all(|(_, n)| n.file == file_name));
    Ok(())
}

#[test]
fn test_object_details_survive() -> crate::util::Result<()> {
    let ast = material()?;
    let bytes = ScriptWriter::new().serialize_to_vec(&ast, 0)?;
    let decoded = ScriptReader::new().deserialize_slice(&bytes, "a.material.sbin")?;

    let roots = decoded.roots();
    assert_eq!(roots.len(), 2);

    let base = decoded.node(roots[0]);
    assert!(base.as_object().unwrap().is_abstract);
    assert_eq!(base.line, 1);

    let derived = decoded.node(roots[1]).as_object().unwrap();
    assert_eq!(derived.id, 7);
    assert_eq!(derived.bases, vec!["base".to_string()]);
    assert_eq!(derived.variables.get("diffuse").map(String::as_str), Some("0 0 1"));
    assert_eq!(derived.values().len(), 1);
    assert_eq!(derived.overrides().len(), 1);
    assert!(derived.children().is_empty());
    Ok(())
}

#[test]
fn test_overrides_written_first() -> crate::util::Result<()> {
    let mut ast = Ast::new();
    ast.add_root(Node::object("o", "material"));
    let bytes = ScriptWriter::new().serialize_to_vec(&ast, 0)?;

    let transition = BLOCK_HEADER_SIZE + 8;
    let object = NODE_INFO_SIZE + 4 + 4 + 4 + 1 + 8 + 8;
    let mut pos = HEADER_SIZE + transition + object;

    // Down/Up pairs for overrides, values, children, in that order
    let mut tags = Vec::new();
    for _ in 0..3 {
        assert_eq!(bytes[pos], BLOCK_CLASS_TRANSITION);
        let tag_pos = pos + BLOCK_HEADER_SIZE + 4;
        tags.push(u32::from_le_bytes(bytes[tag_pos..tag_pos + 4].try_into().unwrap()));
        pos += 2 * transition;
    }
    assert_eq!(
        tags,
        vec![
            Sequence::Overrides as u32,
            Sequence::Values as u32,
            Sequence::Children as u32
        ]
    );
    Ok(())
}

#[test]
fn test_writer_reuse_resets_state() -> crate::util::Result<()> {
    let mut writer = ScriptWriter::new();
    writer.serialize_to_vec(&material()?, 0)?;
    let first_count = writer.strings().len();

    let mut small = Ast::new();
    small.add_root(Node::atom("only"));
    writer.serialize_to_vec(&small, 0)?;
    assert!(first_count > 1);
    assert_eq!(writer.strings().len(), 1);
    assert_eq!(writer.strings().resolve(FIRST_STRING_ID)?, "only");
    // Down, atom, Up, string table
    assert_eq!(writer.block_count(), 4);
    Ok(())
}

#[test]
fn test_reader_reuse_resets_strings() -> crate::util::Result<()> {
    let mut reader = ScriptReader::new();
    let first = ScriptWriter::new().serialize_to_vec(&material()?, 0)?;
    reader.deserialize_slice(&first, "a")?;

    let mut small = Ast::new();
    small.add_root(Node::atom("only"));
    let second = ScriptWriter::new().serialize_to_vec(&small, 0)?;
    let decoded = reader.deserialize_slice(&second, "b")?;
    assert_eq!(decoded, small);
    assert_eq!(reader.strings().len(), 1);
    Ok(())
}

#[test]
fn test_stream_at_nonzero_offset() -> crate::util::Result<()> {
    let ast = material()?;
    let mut cursor = Cursor::new(vec![0u8; 11]);
    cursor.set_position(11);
    ScriptWriter::new().serialize(&mut cursor, &ast, 5)?;

    cursor.set_position(11);
    let decoded = ScriptReader::new().deserialize(&mut cursor, "a")?;
    assert_eq!(decoded, ast);
    Ok(())
}

#[test]
fn test_deep_tree_is_iterative() -> crate::util::Result<()> {
    let mut ast = Ast::new();
    let mut parent = ast.add_root(Node::object("o0", "pass"));
    for i in 1..20_000 {
        parent = ast.add(parent, Sequence::Children, Node::object(format!("o{i}"), "pass"))?;
    }
    ast.add(parent, Sequence::Values, Node::atom("leaf"))?;

    let bytes = ScriptWriter::new().serialize_to_vec(&ast, 0)?;
    let decoded = ScriptReader::new().deserialize_slice(&bytes, "deep")?;
    assert_eq!(decoded.len(), ast.len());
    assert_eq!(decoded, ast);
    Ok(())
}
