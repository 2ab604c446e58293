//! Form field discovery on the first page's annotation list
//!
//! Annotation dictionaries are parsed into [`Annotation`] records first, then
//! filtered down to addressable widget fields. Nothing downstream touches the
//! raw dictionaries except through an [`AnnotationSlot`].

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::Result;
use crate::layout::FieldRect;
use super::objects::{decode_text_string, number_array, resolve};

/// Where an annotation dictionary lives, so it can be patched in place
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationSlot {
    /// Indirect object referenced from `/Annots`
    Indirect(ObjectId),
    /// Dictionary stored directly inside the `/Annots` array at this index
    Inline(usize),
}

/// Annotation `/Subtype`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationSubtype {
    Widget,
    Other(String),
    Missing,
}

impl AnnotationSubtype {
    fn from_object(obj: Option<&Object>) -> Self {
        match obj {
            Some(Object::Name(name)) if name.as_slice() == b"Widget" => Self::Widget,
            Some(Object::Name(name)) => Self::Other(String::from_utf8_lossy(name).into_owned()),
            _ => Self::Missing,
        }
    }
}

/// Why a raw field name has no usable logical name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldNameError {
    #[error("field name {0:?} is too short to carry delimiters")]
    TooShort(String),
    #[error("field name is empty")]
    Empty,
}

/// A field name as stored: a delimited string literal such as `(employee_name)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFieldName(String);

impl RawFieldName {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Rebuild the literal token for a `/T` entry. Non-string values are not names.
    pub fn from_object(obj: &Object) -> Option<Self> {
        match obj {
            Object::String(bytes, _) => Some(Self(format!("({})", decode_text_string(bytes)))),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strip the outer delimiter characters: `(first_name)` becomes `first_name`.
    ///
    /// The first and last characters are removed whatever they are.
    pub fn logical_name(&self) -> std::result::Result<&str, FieldNameError> {
        let raw = self.0.as_str();
        let mut chars = raw.char_indices();
        let (start, end) = match (chars.next(), chars.next_back()) {
            (Some((_, first)), Some((last_idx, _))) => (first.len_utf8(), last_idx),
            _ => return Err(FieldNameError::TooShort(raw.to_string())),
        };
        match &raw[start..end] {
            "" => Err(FieldNameError::Empty),
            name => Ok(name),
        }
    }
}

/// One parsed entry of the page's `/Annots` array
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub slot: AnnotationSlot,
    pub subtype: AnnotationSubtype,
    pub raw_name: Option<RawFieldName>,
    pub rect: Option<FieldRect>,
}

impl Annotation {
    pub fn is_widget(&self) -> bool {
        self.subtype == AnnotationSubtype::Widget
    }
}

/// A located, addressable widget field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    /// Verbatim `/Rect`; absent when the entry is missing or malformed
    pub rect: Option<FieldRect>,
    pub slot: AnnotationSlot,
}

/// Reason a widget or matched field was passed over
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Widget has no usable `/T` entry
    Unnamed,
    /// `/T` too short to strip delimiters from
    MalformedName(String),
    /// Matched a value but has no geometry to draw into
    MissingRectangle,
}

/// A field-level anomaly, recorded instead of aborting the fill
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedField {
    pub name: Option<String>,
    pub slot: AnnotationSlot,
    pub reason: SkipReason,
}

/// Result of scanning page 0
#[derive(Debug, Clone, Default)]
pub struct FieldScan {
    /// Whether the page carried an `/Annots` array at all
    pub has_annotations: bool,
    pub annotation_count: usize,
    pub fields: Vec<FormField>,
    pub skipped: Vec<SkippedField>,
}

/// Parse a page's `/Annots` array into typed records.
///
/// Returns `None` when the page has no annotation array. Entries that are
/// dangling references or not dictionaries are dropped.
pub fn parse_annotations(doc: &Document, page_id: ObjectId) -> Result<Option<Vec<Annotation>>> {
    let page_dict = doc.get_object(page_id)?.as_dict()?;

    let annots = match page_dict.get(b"Annots").ok().and_then(|obj| resolve(doc, obj)) {
        Some(Object::Array(array)) => array,
        _ => return Ok(None),
    };

    let mut annotations = Vec::with_capacity(annots.len());
    for (index, entry) in annots.iter().enumerate() {
        let (slot, dict) = match entry {
            Object::Reference(id) => match doc.get_object(*id).and_then(Object::as_dict) {
                Ok(dict) => (AnnotationSlot::Indirect(*id), dict),
                Err(_) => {
                    debug!(?id, "skipping unresolvable annotation");
                    continue;
                }
            },
            Object::Dictionary(dict) => (AnnotationSlot::Inline(index), dict),
            _ => continue,
        };

        annotations.push(Annotation {
            slot,
            subtype: AnnotationSubtype::from_object(dict.get(b"Subtype").ok()),
            raw_name: dict
                .get(b"T")
                .ok()
                .and_then(|obj| resolve(doc, obj))
                .and_then(RawFieldName::from_object),
            rect: dict
                .get(b"Rect")
                .ok()
                .and_then(|obj| number_array(doc, obj))
                .and_then(|coords| FieldRect::from_slice(&coords)),
        });
    }

    Ok(Some(annotations))
}

/// Filter parsed annotations down to named widget fields, in document order.
pub fn locate_fields(annotations: &[Annotation]) -> (Vec<FormField>, Vec<SkippedField>) {
    let mut fields = Vec::new();
    let mut skipped = Vec::new();

    for annotation in annotations {
        if !annotation.is_widget() {
            debug!(subtype = ?annotation.subtype, "ignoring non-widget annotation");
            continue;
        }

        let raw = match &annotation.raw_name {
            Some(raw) => raw,
            None => {
                debug!(slot = ?annotation.slot, "skipping unnamed widget");
                skipped.push(SkippedField {
                    name: None,
                    slot: annotation.slot,
                    reason: SkipReason::Unnamed,
                });
                continue;
            }
        };

        match raw.logical_name() {
            Ok(name) => {
                debug!(name, rect = ?annotation.rect, "located form field");
                fields.push(FormField {
                    name: name.to_string(),
                    rect: annotation.rect,
                    slot: annotation.slot,
                });
            }
            Err(FieldNameError::Empty) => {
                debug!(slot = ?annotation.slot, "skipping widget with empty name");
                skipped.push(SkippedField {
                    name: None,
                    slot: annotation.slot,
                    reason: SkipReason::Unnamed,
                });
            }
            Err(err) => {
                warn!(%err, "treating widget as unnamed");
                skipped.push(SkippedField {
                    name: None,
                    slot: annotation.slot,
                    reason: SkipReason::MalformedName(raw.as_str().to_string()),
                });
            }
        }
    }

    (fields, skipped)
}

/// Parse and locate the form fields of the given page.
pub fn scan_page(doc: &Document, page_id: ObjectId) -> Result<FieldScan> {
    let annotations = match parse_annotations(doc, page_id)? {
        Some(annotations) => annotations,
        None => {
            debug!("page has no annotation array");
            return Ok(FieldScan::default());
        }
    };

    let (fields, skipped) = locate_fields(&annotations);
    Ok(FieldScan {
        has_annotations: true,
        annotation_count: annotations.len(),
        fields,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, StringFormat};

    fn widget(name: Option<&str>, rect: Option<[f32; 4]>, slot: usize) -> Annotation {
        Annotation {
            slot: AnnotationSlot::Inline(slot),
            subtype: AnnotationSubtype::Widget,
            raw_name: name.map(RawFieldName::new),
            rect: rect.map(|r| FieldRect::new(r[0], r[1], r[2], r[3])),
        }
    }

    #[test]
    fn test_logical_name_strips_delimiters() {
        assert_eq!(RawFieldName::new("(first_name)").logical_name(), Ok("first_name"));
        assert_eq!(RawFieldName::new("<x>").logical_name(), Ok("x"));
    }

    #[test]
    fn test_logical_name_too_short() {
        assert_eq!(
            RawFieldName::new("(").logical_name(),
            Err(FieldNameError::TooShort("(".to_string()))
        );
        assert!(matches!(
            RawFieldName::new("").logical_name(),
            Err(FieldNameError::TooShort(_))
        ));
    }

    #[test]
    fn test_logical_name_multibyte_delimiters() {
        assert_eq!(RawFieldName::new("«name»").logical_name(), Ok("name"));
        assert_eq!(RawFieldName::new("()").logical_name(), Err(FieldNameError::Empty));
    }

    #[test]
    fn test_from_object_wraps_string() {
        let obj = Object::String(b"employee_name".to_vec(), StringFormat::Literal);
        let raw = RawFieldName::from_object(&obj).unwrap();
        assert_eq!(raw.as_str(), "(employee_name)");
        assert_eq!(raw.logical_name(), Ok("employee_name"));
        assert!(RawFieldName::from_object(&Object::Name(b"employee_name".to_vec())).is_none());
    }

    #[test]
    fn test_locate_fields_filters_and_keeps_order() {
        let link = Annotation {
            slot: AnnotationSlot::Inline(0),
            subtype: AnnotationSubtype::Other("Link".to_string()),
            raw_name: Some(RawFieldName::new("(employee_name)")),
            rect: Some(FieldRect::new(0.0, 0.0, 10.0, 10.0)),
        };
        let annotations = vec![
            link,
            widget(Some("(manager_name)"), Some([1.0, 1.0, 2.0, 2.0]), 1),
            widget(None, Some([1.0, 1.0, 2.0, 2.0]), 2),
            widget(Some("("), None, 3),
            widget(Some("(employee_name)"), None, 4),
        ];

        let (fields, skipped) = locate_fields(&annotations);
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["manager_name", "employee_name"]);
        assert_eq!(fields[1].rect, None);

        let reasons: Vec<&SkipReason> = skipped.iter().map(|s| &s.reason).collect();
        assert_eq!(
            reasons,
            vec![&SkipReason::Unnamed, &SkipReason::MalformedName("(".to_string())]
        );
    }

    #[test]
    fn test_locate_fields_keeps_duplicates() {
        let annotations = vec![
            widget(Some("(employee_name)"), Some([0.0, 0.0, 1.0, 1.0]), 0),
            widget(Some("(employee_name)"), Some([5.0, 5.0, 6.0, 6.0]), 1),
        ];
        let (fields, _) = locate_fields(&annotations);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].slot, AnnotationSlot::Inline(0));
        assert_eq!(fields[1].slot, AnnotationSlot::Inline(1));
    }

    #[test]
    fn test_parse_annotations_inline_and_indirect() {
        let mut doc = Document::with_version("1.5");
        let indirect = doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "T" => Object::string_literal("manager_name"),
            "Rect" => vec![Object::Integer(10), Object::Integer(20), Object::Integer(30), Object::Integer(40)],
        });
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => vec![
                indirect.into(),
                Object::Dictionary(dictionary! {
                    "Subtype" => "Widget",
                    "T" => Object::string_literal("employee_name"),
                    "Rect" => vec![Object::Integer(1)],
                }),
                Object::Reference((999, 0)),
            ],
        });

        let annotations = parse_annotations(&doc, page_id).unwrap().unwrap();
        assert_eq!(annotations.len(), 2);
        assert_eq!(annotations[0].slot, AnnotationSlot::Indirect(indirect));
        assert_eq!(annotations[0].rect, Some(FieldRect::new(10.0, 20.0, 30.0, 40.0)));
        assert_eq!(annotations[1].slot, AnnotationSlot::Inline(1));
        assert_eq!(annotations[1].rect, None);
    }

    #[test]
    fn test_scan_page_without_annots() {
        let mut doc = Document::with_version("1.5");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        let scan = scan_page(&doc, page_id).unwrap();
        assert!(!scan.has_annotations);
        assert!(scan.fields.is_empty());
    }
}
