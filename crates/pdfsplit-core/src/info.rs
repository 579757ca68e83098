//! Cheap document facts for upload screens

use lopdf::{Document, Object};
use serde::Serialize;

use crate::error::{PdfSplitError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub page_count: u32,
    pub version: String,
    pub encrypted: bool,
    pub title: Option<String>,
    pub author: Option<String>,
    pub size_bytes: usize,
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfSplitError::DocumentParse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}

/// Page count, header version and Info strings.
///
/// Encrypted files are reported rather than rejected so an upload screen can
/// explain why the split will refuse them.
pub fn document_info(bytes: &[u8]) -> Result<DocumentInfo> {
    let doc = Document::load_mem(bytes).map_err(|e| PdfSplitError::DocumentParse(e.to_string()))?;
    Ok(document_info_of(&doc, bytes.len()))
}

/// [`document_info`] for a document that is already parsed
pub fn document_info_of(doc: &Document, size_bytes: usize) -> DocumentInfo {
    let info = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|object| match object {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|object| object.as_dict().ok());

    let text = |key: &[u8]| {
        info.and_then(|dict| dict.get(key).ok())
            .and_then(|value| match value {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            })
            .filter(|value| !value.trim().is_empty())
    };

    DocumentInfo {
        page_count: doc.get_pages().len() as u32,
        version: doc.version.clone(),
        encrypted: doc.is_encrypted(),
        title: text(b"Title"),
        author: text(b"Author"),
        size_bytes,
    }
}

/// PDF text strings are UTF-16BE with a BOM, or a Latin-1 superset otherwise
fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xfe, 0xff, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}
