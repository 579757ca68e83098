//! Page geometry and inherited page attributes
//!
//! Page dictionaries may leave `MediaBox`, `CropBox`, `Rotate` and `Resources`
//! to an ancestor `Pages` node. The helpers here walk the `Parent` chain so a
//! split page can carry those values itself.

use lopdf::{Dictionary, Document, Object};
use serde::Serialize;

use crate::error::{PdfSplitError, Result};

/// Attributes a page inherits from its ancestors in the page tree
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `Parent` links in damaged files
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when no `MediaBox` is present anywhere in the chain
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageOrientation {
    Portrait,
    Landscape,
    Square,
}

/// Size and orientation of one page, in PDF points
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageGeometry {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    /// Clockwise, normalized to 0, 90, 180 or 270
    pub rotation: i32,
    pub has_content: bool,
    pub orientation: PageOrientation,
}

impl PageGeometry {
    pub fn from_document(doc: &Document, page_number: u32) -> Result<Self> {
        let page_id = *doc.get_pages().get(&page_number).ok_or_else(|| {
            PdfSplitError::InvalidRange(format!("page {} does not exist", page_number))
        })?;
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| PdfSplitError::DocumentParse(format!("page {}: {}", page_number, e)))?;

        let [x0, y0, x1, y1] = inherited_attribute(doc, page, b"MediaBox")
            .and_then(|value| box_from_object(doc, value))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        let rotation = inherited_attribute(doc, page, b"Rotate")
            .and_then(|value| resolve(doc, value).as_i64().ok())
            .map(normalize_rotation)
            .unwrap_or(0);

        let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());

        Ok(Self {
            page_number,
            width: width as f32,
            height: height as f32,
            rotation,
            has_content: page.has(b"Contents"),
            orientation: orientation_of(width, height, rotation),
        })
    }

    /// Width and height as displayed, with rotation applied
    pub fn display_size(&self) -> (f32, f32) {
        if self.rotation % 180 == 90 {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}

/// Every page in the document, in page order
pub fn all_page_geometry(doc: &Document) -> Result<Vec<PageGeometry>> {
    doc.get_pages()
        .keys()
        .map(|&page_number| PageGeometry::from_document(doc, page_number))
        .collect()
}

/// Look `key` up on the page, then on each ancestor `Pages` node
pub(crate) fn inherited_attribute<'a>(
    doc: &'a Document,
    page: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent_id = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_object(parent_id).and_then(Object::as_dict).ok()?;
    }
    None
}

/// Follow a single indirect reference, leaving direct objects untouched
fn resolve<'a>(doc: &'a Document, value: &'a Object) -> &'a Object {
    match value {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(value),
        direct => direct,
    }
}

fn box_from_object(doc: &Document, value: &Object) -> Option<[f64; 4]> {
    let items = resolve(doc, value).as_array().ok()?;
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = match resolve(doc, item) {
            Object::Integer(n) => *n as f64,
            Object::Real(n) => *n as f64,
            _ => return None,
        };
    }
    Some(rect)
}

fn normalize_rotation(angle: i64) -> i32 {
    (angle.rem_euclid(360) / 90 * 90) as i32
}

fn orientation_of(width: f64, height: f64, rotation: i32) -> PageOrientation {
    let (w, h) = if rotation % 180 == 90 {
        (height, width)
    } else {
        (width, height)
    };
    if (w - h).abs() < 1.0 {
        PageOrientation::Square
    } else if w > h {
        PageOrientation::Landscape
    } else {
        PageOrientation::Portrait
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Dictionary, Object};

    /// Two pages: the first inherits a landscape MediaBox and Rotate from the
    /// page tree, the second overrides MediaBox with a square one
    fn inherited_tree() -> Document {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let first = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
        ]));
        let second = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(500),
                    Object::Integer(500),
                ]),
            ),
            ("Contents", Object::Reference((99, 0))),
        ]));
        doc.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(2)),
                (
                    "Kids",
                    Object::Array(vec![Object::Reference(first), Object::Reference(second)]),
                ),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(842.0),
                        Object::Real(595.0),
                    ]),
                ),
                ("Rotate", Object::Integer(-270)),
            ])),
        );
        let catalog = doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog));
        doc
    }

    #[test]
    fn test_normalize_rotation() {
        assert_eq!(normalize_rotation(0), 0);
        assert_eq!(normalize_rotation(360), 0);
        assert_eq!(normalize_rotation(450), 90);
        assert_eq!(normalize_rotation(-90), 270);
        assert_eq!(normalize_rotation(-270), 90);
    }

    #[test]
    fn test_geometry_inherits_from_page_tree() {
        let doc = inherited_tree();
        let first = PageGeometry::from_document(&doc, 1).unwrap();
        assert_eq!(first.width, 842.0);
        assert_eq!(first.height, 595.0);
        assert_eq!(first.rotation, 90);
        assert!(!first.has_content);
        // landscape box turned a quarter becomes portrait on screen
        assert_eq!(first.orientation, PageOrientation::Portrait);
        assert_eq!(first.display_size(), (595.0, 842.0));
    }

    #[test]
    fn test_page_level_media_box_wins() {
        let doc = inherited_tree();
        let second = PageGeometry::from_document(&doc, 2).unwrap();
        assert_eq!((second.width, second.height), (500.0, 500.0));
        assert_eq!(second.orientation, PageOrientation::Square);
        assert!(second.has_content);
    }

    #[test]
    fn test_all_page_geometry_is_in_page_order() {
        let doc = inherited_tree();
        let pages = all_page_geometry(&doc).unwrap();
        let numbers: Vec<u32> = pages.iter().map(|p| p.page_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_missing_page_is_reported() {
        let doc = inherited_tree();
        let err = PageGeometry::from_document(&doc, 3).unwrap_err();
        assert!(matches!(err, PdfSplitError::InvalidRange(_)));
    }

    #[test]
    fn test_box_rejects_wrong_arity() {
        let doc = inherited_tree();
        let value = Object::Array(vec![Object::Integer(0), Object::Integer(0)]);
        assert_eq!(box_from_object(&doc, &value), None);
    }
}
