//! Filling a template's first page from a value map
//!
//! Values are drawn as text on an overlay page that is merged on top of the
//! template, because some viewers ignore native form field values or lack the
//! fonts the form asks for. Filled fields are then marked read-only so viewers
//! that do render the form model don't offer an editable box over the text.

use std::io::Write;
use std::path::{Path, PathBuf};

use lopdf::{Document, ObjectId};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::layout::PageBox;
use super::fields::{scan_page, SkippedField};
use super::merge::merge_overlay;
use super::mutate::{mark_filled, set_need_appearances};
use super::objects::{first_page_id, inherited_attribute, number_array};
use super::overlay::OverlayPage;
use super::values::{resolve_instructions, ValueMap};

/// Options controlling how values are applied
#[derive(Debug, Clone, PartialEq)]
pub struct FillOptions {
    /// Draw values as visible text on top of the page
    pub draw_text: bool,
    /// Also store values in the fields' `/V` and request appearance regeneration
    pub native_form_compat: bool,
    /// Font size for every drawn value, in points
    pub font_size: f32,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            draw_text: true,
            native_form_compat: false,
            font_size: 12.0,
        }
    }
}

/// Outcome of a fill
#[derive(Debug, Clone, Default)]
pub struct FillReport {
    /// Where the finished PDF was written, when written to a file
    pub output_path: Option<PathBuf>,
    /// Whether page 0 carried an annotation array
    pub has_annotations: bool,
    /// Number of addressable widget fields found
    pub located: usize,
    /// Names of fields that received a value, in document order
    pub applied: Vec<String>,
    /// Field-level anomalies that were skipped
    pub skipped: Vec<SkippedField>,
    /// XObject resource name of the merged overlay, if one was drawn
    pub overlay: Option<String>,
}

/// Load a template from disk
pub fn load_template(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(Error::TemplateNotFound(path.to_path_buf()));
    }
    Document::load(path).map_err(|source| Error::TemplateUnreadable {
        origin: path.display().to_string(),
        source,
    })
}

/// The page box to size the overlay with
fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(|media_box| number_array(doc, media_box))
        .and_then(|coords| PageBox::from_slice(&coords))
        .unwrap_or_else(PageBox::letter)
}

/// Fill page 0 of an in-memory document.
///
/// Field-level anomalies are skipped and reported; only document-level
/// failures return an error.
pub fn fill_document(doc: &mut Document, values: &ValueMap, options: &FillOptions) -> Result<FillReport> {
    let page_id = first_page_id(doc)?;
    let scan = scan_page(doc, page_id)?;

    if !scan.has_annotations && !values.is_empty() {
        warn!("first page has no annotations, no values will be applied");
    }

    let resolution = resolve_instructions(&scan.fields, values);
    let mut report = FillReport {
        output_path: None,
        has_annotations: scan.has_annotations,
        located: scan.fields.len(),
        applied: Vec::new(),
        skipped: scan.skipped,
        overlay: None,
    };
    report.skipped.extend(resolution.skipped);

    if resolution.instructions.is_empty() {
        debug!("no values matched, leaving template unchanged");
        return Ok(report);
    }

    if options.draw_text {
        let mut overlay = OverlayPage::new(page_box(doc, page_id), options.font_size);
        for instruction in &resolution.instructions {
            overlay.draw(instruction);
        }
        // Temporary file is removed when `staged` drops, whether or not the merge succeeds
        let staged = overlay.seal()?.stage()?;
        report.overlay = Some(merge_overlay(doc, page_id, &staged)?);
    }

    for instruction in &resolution.instructions {
        let native_value = options.native_form_compat.then_some(instruction.text.as_str());
        mark_filled(doc, page_id, instruction.slot, native_value)?;
        report.applied.push(instruction.name.clone());
    }

    if options.native_form_compat {
        set_need_appearances(doc)?;
    }

    info!(
        located = report.located,
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "filled form"
    );
    Ok(report)
}

/// Fill a template file and write the result.
///
/// Without an `output` path a fresh uniquely named `.pdf` in the system temp
/// directory is used; the report carries the final path either way.
pub fn fill_pdf(
    input: &Path,
    output: Option<&Path>,
    values: &ValueMap,
    options: &FillOptions,
) -> Result<FillReport> {
    let mut doc = load_template(input)?;
    let mut report = fill_document(&mut doc, values, options)?;

    let destination = match output {
        Some(path) => path.to_path_buf(),
        None => generated_output_path()?,
    };
    write_document(&mut doc, &destination)?;

    info!(path = %destination.display(), "pdf written");
    report.output_path = Some(destination);
    Ok(report)
}

/// Fill a template held in memory and return the finished PDF bytes
pub fn fill_pdf_bytes(template: &[u8], values: &ValueMap, options: &FillOptions) -> Result<(Vec<u8>, FillReport)> {
    let mut doc = Document::load_mem(template).map_err(|source| Error::TemplateUnreadable {
        origin: "<memory>".to_string(),
        source,
    })?;
    let report = fill_document(&mut doc, values, options)?;
    Ok((serialize(&mut doc)?, report))
}

fn serialize(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// Write the document next to `destination` and move it into place, so a
/// failed write never leaves a half-written file behind.
pub fn write_document(doc: &mut Document, destination: &Path) -> Result<()> {
    let bytes = serialize(doc)?;

    let failure = |source: std::io::Error| Error::OutputWriteFailure {
        path: destination.to_path_buf(),
        source,
    };

    let dir = destination
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut staged = NamedTempFile::new_in(dir).map_err(failure)?;
    staged.write_all(&bytes).map_err(failure)?;
    staged.flush().map_err(failure)?;
    staged.persist(destination).map_err(|err| failure(err.error))?;
    Ok(())
}

/// A fresh, uniquely named output path in the system temp directory
fn generated_output_path() -> Result<PathBuf> {
    let path = tempfile::Builder::new()
        .prefix("timeoff-request-")
        .suffix(".pdf")
        .tempfile()?
        .into_temp_path()
        .keep()
        .map_err(|err| Error::Io(err.error))?;
    Ok(path)
}
