//! Field geometry and draw position calculations

/// Offset applied from a field's lower-left corner to the text baseline,
/// in PDF points. Identical for every field.
pub const PADDING: f32 = 4.0;

/// An annotation rectangle as stored in the PDF: two opposite corners
/// in no particular order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl FieldRect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Build from a `/Rect` array's four numbers
    pub fn from_slice(coords: &[f32]) -> Option<Self> {
        match coords {
            [x1, y1, x2, y2] => Some(Self::new(*x1, *y1, *x2, *y2)),
            _ => None,
        }
    }

    pub fn left(&self) -> f32 {
        self.x1.min(self.x2)
    }

    pub fn bottom(&self) -> f32 {
        self.y1.min(self.y2)
    }

    pub fn right(&self) -> f32 {
        self.x1.max(self.x2)
    }

    pub fn top(&self) -> f32 {
        self.y1.max(self.y2)
    }

    /// Baseline position for text drawn into this field
    pub fn draw_position(&self) -> DrawPosition {
        DrawPosition {
            x: self.left() + PADDING,
            y: self.bottom() + PADDING,
        }
    }
}

/// Text baseline origin in page space (origin at bottom-left of the page)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawPosition {
    pub x: f32,
    pub y: f32,
}

/// A page box such as `/MediaBox`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter size (8.5" × 11") in points
    pub fn letter() -> Self {
        Self {
            llx: 0.0,
            lly: 0.0,
            urx: 612.0,
            ury: 792.0,
        }
    }

    pub fn from_slice(coords: &[f32]) -> Option<Self> {
        let rect = FieldRect::from_slice(coords)?;
        Some(Self {
            llx: rect.left(),
            lly: rect.bottom(),
            urx: rect.right(),
            ury: rect.top(),
        })
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.llx, self.lly, self.urx, self.ury]
    }
}
