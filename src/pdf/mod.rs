//! Form filling engine

pub mod fields;
pub mod values;
pub mod overlay;
pub mod merge;
pub mod mutate;
pub mod fill;
pub mod metadata;
mod objects;

// Re-export commonly used items
pub use fields::{
    locate_fields, parse_annotations, scan_page, Annotation, AnnotationSlot, AnnotationSubtype,
    FieldNameError, FieldScan, FormField, RawFieldName, SkipReason, SkippedField,
};
pub use values::{resolve_instructions, OverlayInstruction, Resolution, ValueMap};
pub use overlay::{OverlayPage, SealedOverlay, StagedOverlay};
pub use merge::merge_overlay;
pub use mutate::{mark_filled, set_need_appearances, READ_ONLY_FLAG};
pub use fill::{fill_document, fill_pdf, fill_pdf_bytes, load_template, write_document, FillOptions, FillReport};
pub use metadata::{count_pages, inspect_document, inspect_template, TemplateInfo};
