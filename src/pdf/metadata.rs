//! Template inspection: page count and located form fields

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};
use super::fields::{scan_page, FormField, SkippedField};
use super::objects::first_page_id;

/// Count pages by reading the Count field from the Pages dictionary,
/// falling back to walking the page tree when Count is unusable.
pub(crate) fn page_count(doc: &Document) -> usize {
    let declared = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Pages").ok())
        .and_then(|pages| match pages {
            Object::Reference(id) => doc.get_object(*id).ok(),
            other => Some(other),
        })
        .and_then(|pages| pages.as_dict().ok())
        .and_then(|pages| pages.get(b"Count").ok())
        .and_then(|count| count.as_i64().ok());

    match declared {
        Some(n) if n > 0 => n as usize,
        _ => doc.get_pages().len(),
    }
}

/// Summary of a template's first page
#[derive(Debug, Clone)]
pub struct TemplateInfo {
    /// Number of pages in the PDF
    pub page_count: usize,
    /// Entries in page 0's `/Annots`, of any subtype
    pub annotation_count: usize,
    /// Addressable widget fields, in document order
    pub fields: Vec<FormField>,
    /// Widgets that could not be addressed
    pub skipped: Vec<SkippedField>,
}

/// Load a template and describe its fillable fields
pub fn inspect_template(path: &Path) -> Result<TemplateInfo> {
    let doc = super::fill::load_template(path)?;
    inspect_document(&doc)
}

/// Describe an already loaded template
pub fn inspect_document(doc: &Document) -> Result<TemplateInfo> {
    let page_id = first_page_id(doc)?;
    let scan = scan_page(doc, page_id)?;

    Ok(TemplateInfo {
        page_count: page_count(doc),
        annotation_count: scan.annotation_count,
        fields: scan.fields,
        skipped: scan.skipped,
    })
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    let doc = super::fill::load_template(path)?;
    match page_count(&doc) {
        0 => Err(Error::EmptyTemplate),
        n => Ok(n),
    }
}
