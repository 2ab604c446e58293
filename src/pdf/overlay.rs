//! Overlay page rendering using lopdf content operations
//!
//! Field values are drawn onto a fresh single-page document that is later
//! composited onto the template. The lifecycle is explicit:
//! [`OverlayPage`] collects text runs, [`OverlayPage::seal`] consumes it and
//! serializes the page exactly once, and [`SealedOverlay::stage`] writes it to
//! a uniquely named temporary file that is removed when the
//! [`StagedOverlay`] is dropped.

use std::io::Write;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat, Stream};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;
use crate::layout::PageBox;
use super::values::OverlayInstruction;

/// Resource name of the overlay font
pub const OVERLAY_FONT: &str = "F1";

/// A page under construction. Drawing order is preserved; overlapping runs
/// simply overpaint.
#[derive(Debug)]
pub struct OverlayPage {
    page_box: PageBox,
    font_size: f32,
    operations: Vec<Operation>,
    text_runs: usize,
}

impl OverlayPage {
    pub fn new(page_box: PageBox, font_size: f32) -> Self {
        Self {
            page_box,
            font_size,
            operations: Vec::new(),
            text_runs: 0,
        }
    }

    /// Draw one instruction's text at its baseline position
    pub fn draw(&mut self, instruction: &OverlayInstruction) {
        let position = instruction.position;
        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![OVERLAY_FONT.into(), self.font_size.into()]),
            Operation::new("Td", vec![position.x.into(), position.y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&instruction.text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
        self.text_runs += 1;
    }

    pub fn text_runs(&self) -> usize {
        self.text_runs
    }

    /// Finish the page and serialize it as a one-page PDF
    pub fn seal(self) -> Result<SealedOverlay> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                OVERLAY_FONT => font_id,
            },
        });

        let mut operations = vec![Operation::new("g", vec![0.into()])];
        operations.extend(self.operations);
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let media_box: Vec<Object> = self
            .page_box
            .to_array()
            .iter()
            .map(|&v| Object::Real(v))
            .collect();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box,
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        debug!(text_runs = self.text_runs, size = bytes.len(), "sealed overlay page");

        Ok(SealedOverlay {
            bytes,
            page_box: self.page_box,
            text_runs: self.text_runs,
        })
    }
}

/// A finished overlay page, serialized
#[derive(Debug, Clone)]
pub struct SealedOverlay {
    bytes: Vec<u8>,
    page_box: PageBox,
    text_runs: usize,
}

impl SealedOverlay {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn page_box(&self) -> PageBox {
        self.page_box
    }

    pub fn text_runs(&self) -> usize {
        self.text_runs
    }

    /// Write the overlay to a fresh uniquely named temporary file
    pub fn stage(&self) -> Result<StagedOverlay> {
        let mut file = tempfile::Builder::new()
            .prefix("timeoff-overlay-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(&self.bytes)?;
        file.flush()?;
        debug!(path = %file.path().display(), "staged overlay page");
        Ok(StagedOverlay {
            file,
            page_box: self.page_box,
        })
    }
}

/// An overlay staged on disk. The file is deleted when this value drops,
/// on success and error paths alike.
#[derive(Debug)]
pub struct StagedOverlay {
    file: NamedTempFile,
    page_box: PageBox,
}

impl StagedOverlay {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    pub fn page_box(&self) -> PageBox {
        self.page_box
    }

    /// Load the staged page back as a document for merging
    pub fn load(&self) -> Result<Document> {
        Ok(Document::load(self.file.path())?)
    }
}

/// Encode text for a WinAnsiEncoding simple font.
///
/// Characters outside the encoding are replaced with `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(c: char) -> u8 {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => c as u8,
        _ => match c {
            '€' => 0x80,
            '‚' => 0x82,
            'ƒ' => 0x83,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            'ˆ' => 0x88,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '˜' => 0x98,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::DrawPosition;
    use crate::pdf::fields::AnnotationSlot;

    fn instruction(text: &str, x: f32, y: f32) -> OverlayInstruction {
        OverlayInstruction {
            name: "employee_name".to_string(),
            text: text.to_string(),
            position: DrawPosition { x, y },
            slot: AnnotationSlot::Inline(0),
        }
    }

    #[test]
    fn test_encode_win_ansi() {
        assert_eq!(encode_win_ansi("Abc"), b"Abc".to_vec());
        assert_eq!(encode_win_ansi("Zoë"), vec![b'Z', b'o', 0xEB]);
        assert_eq!(encode_win_ansi("a\u{2014}b"), vec![b'a', 0x97, b'b']);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
    }

    #[test]
    fn test_sealed_overlay_contains_text_in_order() {
        let mut page = OverlayPage::new(PageBox::letter(), 12.0);
        page.draw(&instruction("first", 54.0, 54.0));
        page.draw(&instruction("second (2)", 104.0, 204.0));
        let sealed = page.seal().unwrap();
        assert_eq!(sealed.text_runs(), 2);

        let doc = Document::load_mem(sealed.as_bytes()).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();

        let shown: Vec<Vec<u8>> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .map(|op| op.operands[0].as_str().unwrap().to_vec())
            .collect();
        assert_eq!(shown, vec![b"first".to_vec(), b"second (2)".to_vec()]);

        let positions: Vec<(f32, f32)> = content
            .operations
            .iter()
            .filter(|op| op.operator == "Td")
            .map(|op| (op.operands[0].as_float().unwrap(), op.operands[1].as_float().unwrap()))
            .collect();
        assert_eq!(positions, vec![(54.0, 54.0), (104.0, 204.0)]);
    }

    #[test]
    fn test_staged_overlay_removed_on_drop() {
        let mut page = OverlayPage::new(PageBox::letter(), 12.0);
        page.draw(&instruction("Dolores", 10.0, 10.0));
        let sealed = page.seal().unwrap();

        let staged = sealed.stage().unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(staged.load().unwrap().get_pages().len(), 1);

        drop(staged);
        assert!(!path.exists());
    }

    #[test]
    fn test_staged_paths_are_unique() {
        let sealed = OverlayPage::new(PageBox::letter(), 12.0).seal().unwrap();
        let a = sealed.stage().unwrap();
        let b = sealed.stage().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
