//! Small helpers for walking loosely-typed lopdf objects

use lopdf::{Document, Object, ObjectId, StringFormat};
use crate::error::{Error, Result};

/// Page tree depth limit when following `/Parent` links
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Follow a reference (if any) to the object it points at.
///
/// Returns `None` for dangling references.
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Read a numeric array such as `/Rect` or `/MediaBox`, resolving references
pub(crate) fn number_array(doc: &Document, obj: &Object) -> Option<Vec<f32>> {
    let array = resolve(doc, obj)?.as_array().ok()?;
    array
        .iter()
        .map(|item| resolve(doc, item).and_then(|n| n.as_float().ok()))
        .collect()
}

/// Object ID of the first page in document order
pub(crate) fn first_page_id(doc: &Document) -> Result<ObjectId> {
    doc.get_pages()
        .values()
        .next()
        .copied()
        .ok_or(Error::EmptyTemplate)
}

/// Look up a page attribute, walking up the page tree for inheritable keys
/// (`/Resources`, `/MediaBox`, ...).
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node_id = page_id;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        let node = doc.get_object(node_id).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        node_id = match node.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => *parent_id,
            _ => return None,
        };
    }
    None
}

/// Decode a PDF text string: UTF-16BE when it carries a byte order mark,
/// otherwise one byte per character.
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a text string for a dictionary value such as `/V`
pub(crate) fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_string_latin() {
        assert_eq!(decode_text_string(b"employee_name"), "employee_name");
    }

    #[test]
    fn test_decode_text_string_utf16() {
        let bytes = [0xFE, 0xFF, 0x00, 0x4A, 0x00, 0xF6];
        assert_eq!(decode_text_string(&bytes), "Jö");
    }

    #[test]
    fn test_encode_text_string_roundtrips_non_ascii() {
        match encode_text_string("Zoë") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(decode_text_string(&bytes), "Zoë");
            }
            other => panic!("unexpected encoding: {:?}", other),
        }
    }

    #[test]
    fn test_first_page_id_empty_document() {
        let doc = Document::with_version("1.5");
        assert!(matches!(first_page_id(&doc), Err(Error::EmptyTemplate)));
    }
}
