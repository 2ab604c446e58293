//! Matching caller-supplied values onto located fields

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::layout::DrawPosition;
use super::fields::{AnnotationSlot, FormField, SkipReason, SkippedField};

/// Field name to display value. Absent and empty values leave a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueMap {
    values: HashMap<String, Option<String>>,
}

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Option<String>>) {
        self.values.insert(name.into(), value.into());
    }

    /// Parse a raw `NAME=VALUE` assignment and insert it
    pub fn insert_assignment(&mut self, assignment: &str) -> Result<()> {
        match assignment.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                self.insert(name.trim(), value.to_string());
                Ok(())
            }
            _ => Err(Error::InvalidFieldAssignment(assignment.to_string())),
        }
    }

    /// The value to draw for `name`, or `None` when absent or empty
    pub fn display_value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|value| value.as_deref())
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ValueMap
where
    K: Into<String>,
    V: Into<Option<String>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = ValueMap::new();
        for (name, value) in iter {
            map.insert(name, value);
        }
        map
    }
}

/// A field paired with its display string and baseline position
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayInstruction {
    pub name: String,
    pub text: String,
    pub position: DrawPosition,
    pub slot: AnnotationSlot,
}

/// Instructions to draw plus matched fields that could not be drawn
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub instructions: Vec<OverlayInstruction>,
    pub skipped: Vec<SkippedField>,
}

/// Resolve values for each field, preserving field order.
///
/// Fields with no value produce nothing. Fields with a value but no
/// rectangle are recorded as skipped and their annotation stays untouched.
pub fn resolve_instructions(fields: &[FormField], values: &ValueMap) -> Resolution {
    let mut resolution = Resolution::default();

    for field in fields {
        let Some(text) = values.display_value(&field.name) else {
            continue;
        };

        match field.rect {
            Some(rect) => {
                let position = rect.draw_position();
                debug!(name = %field.name, x = position.x, y = position.y, "resolved field");
                resolution.instructions.push(OverlayInstruction {
                    name: field.name.clone(),
                    text: text.to_string(),
                    position,
                    slot: field.slot,
                });
            }
            None => {
                warn!(name = %field.name, "field has no rectangle, leaving it unfilled");
                resolution.skipped.push(SkippedField {
                    name: Some(field.name.clone()),
                    slot: field.slot,
                    reason: SkipReason::MissingRectangle,
                });
            }
        }
    }

    resolution
}
