//! Integration tests for encoding script trees and decoding them back.

use scriptcache::ast::dump;
use scriptcache::prelude::*;
use scriptcache::sbin::{read_header, HEADER_SIZE, SCRIPT_MAGIC};

use std::io::Cursor;
use tempfile::NamedTempFile;

/// A small material script:
///
/// ```text
/// material mat1
/// {
///     diffuse 1.0 0.5
///     technique { pass { ambient 1 1 1 } }
/// }
/// ```
fn mat1() -> Ast {
    let mut ast = Ast::new();
    let mat = ast.add_root(Node::object("mat1", "material").at("a.material", 1));
    let diffuse = ast
        .add(mat, Sequence::Children, Node::property("diffuse").at("a.material", 3))
        .expect("add diffuse");
    for v in ["1.0", "0.5"] {
        ast.add(diffuse, Sequence::Default, Node::atom(v).at("a.material", 3))
            .expect("add value");
    }
    let tech = ast
        .add(mat, Sequence::Children, Node::object("", "technique").at("a.material", 4))
        .expect("add technique");
    let pass = ast
        .add(tech, Sequence::Children, Node::object("", "pass").at("a.material", 4))
        .expect("add pass");
    let ambient = ast
        .add(pass, Sequence::Children, Node::property("ambient").at("a.material", 4))
        .expect("add ambient");
    for _ in 0..3 {
        ast.add(ambient, Sequence::Default, Node::atom("1").at("a.material", 4))
            .expect("add value");
    }
    ast
}

#[test]
fn test_roundtrip_material() {
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();
    let ast = mat1();

    ScriptWriter::new()
        .write_file(path, &ast, 1_234)
        .expect("Failed to write cache file");

    let decoded = ScriptReader::new()
        .read_file(path)
        .expect("Failed to read cache file");
    assert_eq!(decoded, ast);

    let root = decoded.node(decoded.roots()[0]);
    let mat = root.as_object().expect("root should be an object");
    assert_eq!((mat.name.as_str(), mat.cls.as_str()), ("mat1", "material"));
    assert_eq!(mat.children().len(), 2);
    assert_eq!(root.parent(), None);
}

#[test]
fn test_dump_of_decoded_tree() {
    let bytes = ScriptWriter::new().serialize_to_vec(&mat1(), 0).unwrap();
    let decoded = ScriptReader::new()
        .deserialize_slice(&bytes, "a.material")
        .unwrap();

    let text = dump::to_string(&decoded);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "a.material - 1 - material \"mat1\" =",
            "\tdiffuse = 1.0 0.5",
            "\ta.material - 4 - technique \"\" =",
            "\t\ta.material - 4 - pass \"\" =",
            "\t\t\tambient = 1 1 1",
        ]
    );
}

#[test]
fn test_repeated_values_share_one_string() {
    let mut ast = Ast::new();
    let prop = ast.add_root(Node::property("set"));
    for _ in 0..50 {
        ast.add(prop, Sequence::Default, Node::atom("on")).unwrap();
    }

    let mut writer = ScriptWriter::new();
    let bytes = writer.serialize_to_vec(&ast, 0).unwrap();
    assert_eq!(writer.strings().len(), 2);

    let mut reader = ScriptReader::new();
    let decoded = reader.deserialize_slice(&bytes, "x").unwrap();
    assert_eq!(reader.strings().len(), 2);
    assert_eq!(decoded, ast);
}

#[test]
fn test_header_only() {
    let bytes = ScriptWriter::new().serialize_to_vec(&mat1(), 77).unwrap();
    let header = read_header(Cursor::new(&bytes)).unwrap();
    assert_eq!(header.magic, SCRIPT_MAGIC);
    assert_eq!(header.last_modified, 77);
    assert!(header.string_table_offset as usize > HEADER_SIZE);
    assert!((header.string_table_offset as usize) < bytes.len());
}

#[test]
fn test_corrupt_magic_rejected() {
    let mut bytes = ScriptWriter::new().serialize_to_vec(&mat1(), 0).unwrap();
    bytes[1] = b'X';
    let err = ScriptReader::new()
        .deserialize_slice(&bytes, "x")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidMagic { .. }));
}

#[test]
fn test_truncated_string_section() {
    let mut bytes = ScriptWriter::new().serialize_to_vec(&mat1(), 0).unwrap();
    let offset = read_header(Cursor::new(&bytes)).unwrap().string_table_offset as usize;

    // Rewrite the string count to claim only the first entry exists
    let count_pos = offset + 9;
    bytes[count_pos..count_pos + 8].copy_from_slice(&1u64.to_le_bytes());

    let err = ScriptReader::new()
        .deserialize_slice(&bytes, "x")
        .unwrap_err();
    assert!(matches!(err, Error::StringNotFound(_)));
}

#[test]
fn test_cut_short_anywhere() {
    let bytes = ScriptWriter::new().serialize_to_vec(&mat1(), 0).unwrap();
    for len in 0..bytes.len() {
        let result = ScriptReader::new().deserialize_slice(&bytes[..len], "x");
        let err = result.expect_err("truncated stream must not decode");
        assert!(err.is_format_error(), "len {len}: {err}");
    }
}

#[test]
fn test_deep_tree() {
    let mut ast = Ast::new();
    let mut prop = ast.add_root(Node::property("p0"));
    for i in 1..10_000 {
        prop = ast
            .add(prop, Sequence::Default, Node::property(format!("p{i}")))
            .unwrap();
    }
    ast.add(prop, Sequence::Default, Node::atom("bottom")).unwrap();

    let bytes = ScriptWriter::new().serialize_to_vec(&ast, 0).unwrap();
    let decoded = ScriptReader::new().deserialize_slice(&bytes, "x").unwrap();
    assert_eq!(decoded.len(), 10_001);
    assert_eq!(decoded, ast);
}

#[test]
fn test_empty_tree() {
    let bytes = ScriptWriter::new().serialize_to_vec(&Ast::new(), 0).unwrap();
    let decoded = ScriptReader::new().deserialize_slice(&bytes, "x").unwrap();
    assert!(decoded.is_empty());
    assert_eq!(decoded.file(), None);
}
