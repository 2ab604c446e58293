//! Time-off request form filler
//!
//! Fills the widget fields on the first page of a PDF form by drawing each
//! value as text on an overlay merged on top of the page, then marking the
//! filled fields read-only. The drawn text renders in viewers that ignore or
//! mishandle native form field values.
//!
//! # Example
//!
//! ```no_run
//! use timeoff_pdf::pdf::{fill_pdf, FillOptions};
//! use timeoff_pdf::request::TimeOffRequest;
//! use std::path::Path;
//!
//! let request = TimeOffRequest {
//!     employee_name: Some("Dolores Abernathy".to_string()),
//!     requested_dates: Some("August 17th - September 10th".to_string()),
//!     ..Default::default()
//! };
//!
//! let report = fill_pdf(
//!     Path::new("form.pdf"),
//!     Some(Path::new("form-filled.pdf")),
//!     &request.to_value_map(),
//!     &FillOptions::default(),
//! ).expect("Failed to fill form");
//!
//! println!("filled {} fields", report.applied.len());
//! ```

pub mod error;
pub mod pdf;
pub mod layout;
pub mod request;

// Re-export commonly used items
pub use error::{Error, Result};
