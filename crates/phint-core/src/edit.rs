//! Byte-range source editing

use thiserror::Error;

/// Errors that can occur during edit application
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EditError {
    #[error("Overlapping edits detected at offset {0}")]
    OverlappingEdits(usize),

    #[error("Edit range {start}..{end} out of bounds for source length {len}")]
    OutOfBounds { start: usize, end: usize, len: usize },

    #[error("Edit range {start}..{end} does not fall on a character boundary")]
    NotCharBoundary { start: usize, end: usize },
}

/// A single replacement of `source[start..end]`
///
/// An insertion is an edit whose range is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
    /// Human-readable description of the edit
    pub message: String,
}

impl Edit {
    pub fn new(
        start: usize,
        end: usize,
        replacement: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            replacement: replacement.into(),
            message: message.into(),
        }
    }

    /// Insert `text` at `offset` without removing anything
    pub fn insert(offset: usize, text: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(offset, offset, text, message)
    }
}

/// Apply edits to source code
///
/// Edits are applied from the end of the source towards the start so that
/// earlier offsets stay valid while later ones are rewritten. Two insertions
/// at the same offset are allowed and keep their input order.
pub fn apply_edits(source: &str, edits: &[Edit]) -> Result<String, EditError> {
    if edits.is_empty() {
        return Ok(source.to_string());
    }

    // Stable sort keeps same-offset insertions in input order
    let mut sorted: Vec<(usize, &Edit)> = edits.iter().enumerate().collect();
    sorted.sort_by(|(ia, a), (ib, b)| b.start.cmp(&a.start).then(ib.cmp(ia)));

    let len = source.len();
    let mut prev_start: Option<usize> = None;

    for (_, edit) in &sorted {
        if edit.start > edit.end || edit.end > len {
            return Err(EditError::OutOfBounds {
                start: edit.start,
                end: edit.end,
                len,
            });
        }
        if !source.is_char_boundary(edit.start) || !source.is_char_boundary(edit.end) {
            return Err(EditError::NotCharBoundary {
                start: edit.start,
                end: edit.end,
            });
        }
        if let Some(prev) = prev_start {
            if edit.end > prev {
                return Err(EditError::OverlappingEdits(edit.start));
            }
        }
        prev_start = Some(edit.start);
    }

    let mut result = source.to_string();
    for (_, edit) in sorted {
        result.replace_range(edit.start..edit.end, &edit.replacement);
    }

    Ok(result)
}

/// Convert byte offset to line and column numbers (1-based)
pub fn offset_to_line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }

    (line, column)
}
