//! In-place patches to filled field annotations

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::debug;

use crate::error::Result;
use super::fields::AnnotationSlot;
use super::objects::encode_text_string;

/// Field flag bit 1: the field may not be changed by the user
pub const READ_ONLY_FLAG: i64 = 1;

/// Mutable access to the annotation dictionary stored at `slot` on `page_id`
fn annotation_dict_mut<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    slot: AnnotationSlot,
) -> Result<Option<&'a mut Dictionary>> {
    let index = match slot {
        AnnotationSlot::Indirect(id) => return Ok(Some(doc.get_object_mut(id)?.as_dict_mut()?)),
        AnnotationSlot::Inline(index) => index,
    };

    let annots_ref = match doc.get_object(page_id)?.as_dict()?.get(b"Annots") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };
    let annots = match annots_ref {
        Some(id) => doc.get_object_mut(id)?,
        None => doc.get_object_mut(page_id)?.as_dict_mut()?.get_mut(b"Annots")?,
    };

    Ok(annots
        .as_array_mut()?
        .get_mut(index)
        .and_then(|entry| entry.as_dict_mut().ok()))
}

/// Set the read-only bit on a field, keeping its other flags.
///
/// With `value`, also store it as the field's `/V` for viewers that render
/// native form values.
pub fn mark_filled(doc: &mut Document, page_id: ObjectId, slot: AnnotationSlot, value: Option<&str>) -> Result<()> {
    let Some(annotation) = annotation_dict_mut(doc, page_id, slot)? else {
        debug!(?slot, "annotation disappeared before it could be marked");
        return Ok(());
    };

    let flags = annotation
        .get(b"Ff")
        .ok()
        .and_then(|ff| ff.as_i64().ok())
        .unwrap_or(0);
    annotation.set("Ff", Object::Integer(flags | READ_ONLY_FLAG));

    if let Some(value) = value {
        annotation.set("V", encode_text_string(value));
    }

    Ok(())
}

/// Ask viewers to regenerate field appearances from `/V`.
///
/// Does nothing when the document has no `/AcroForm`.
pub fn set_need_appearances(doc: &mut Document) -> Result<()> {
    let acroform_ref = match doc.catalog()?.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => {
            debug!("document has no AcroForm dictionary");
            return Ok(());
        }
    };

    let acroform = match acroform_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc.catalog_mut()?.get_mut(b"AcroForm")?.as_dict_mut()?,
    };
    acroform.set("NeedAppearances", Object::Boolean(true));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    fn page_with_inline_annots(doc: &mut Document) -> ObjectId {
        doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => vec![Object::Dictionary(dictionary! {
                "Subtype" => "Widget",
                "T" => Object::string_literal("employee_name"),
                "Ff" => 4096,
            })],
        })
    }

    #[test]
    fn test_mark_filled_preserves_other_flags() {
        let mut doc = Document::with_version("1.5");
        let page_id = page_with_inline_annots(&mut doc);

        mark_filled(&mut doc, page_id, AnnotationSlot::Inline(0), None).unwrap();

        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let annot = page.get(b"Annots").unwrap().as_array().unwrap()[0].as_dict().unwrap();
        assert_eq!(annot.get(b"Ff").unwrap().as_i64().unwrap(), 4097);
        assert!(annot.get(b"V").is_err());
    }

    #[test]
    fn test_mark_filled_indirect_annots_array_with_value() {
        let mut doc = Document::with_version("1.5");
        let annots_id = doc.add_object(Object::Array(vec![Object::Dictionary(dictionary! {
            "Subtype" => "Widget",
        })]));
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Annots" => annots_id });

        mark_filled(&mut doc, page_id, AnnotationSlot::Inline(0), Some("Brad")).unwrap();

        let annots = doc.get_object(annots_id).unwrap().as_array().unwrap();
        let annot = annots[0].as_dict().unwrap();
        assert_eq!(annot.get(b"Ff").unwrap().as_i64().unwrap(), READ_ONLY_FLAG);
        assert_eq!(annot.get(b"V").unwrap().as_str().unwrap(), b"Brad");
    }

    #[test]
    fn test_mark_filled_indirect_annotation() {
        let mut doc = Document::with_version("1.5");
        let annot_id = doc.add_object(dictionary! { "Subtype" => "Widget" });
        let page_id = doc.add_object(dictionary! { "Type" => "Page", "Annots" => vec![Object::Reference(annot_id)] });

        mark_filled(&mut doc, page_id, AnnotationSlot::Indirect(annot_id), None).unwrap();

        let annot = doc.get_object(annot_id).unwrap().as_dict().unwrap();
        assert_eq!(annot.get(b"Ff").unwrap().as_i64().unwrap(), READ_ONLY_FLAG);
    }

    #[test]
    fn test_set_need_appearances() {
        let mut doc = Document::with_version("1.5");
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "AcroForm" => dictionary! { "Fields" => Vec::<Object>::new() },
        });
        doc.trailer.set("Root", catalog_id);

        set_need_appearances(&mut doc).unwrap();

        let acroform = doc.catalog().unwrap().get(b"AcroForm").unwrap().as_dict().unwrap();
        assert_eq!(acroform.get(b"NeedAppearances").unwrap(), &Object::Boolean(true));
    }

    #[test]
    fn test_set_need_appearances_without_acroform() {
        let mut doc = Document::with_version("1.5");
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog" });
        doc.trailer.set("Root", catalog_id);

        set_need_appearances(&mut doc).unwrap();
        assert!(doc.catalog().unwrap().get(b"AcroForm").is_err());
    }
}
