//! Parsing line selections and tracking which lines they cover during a scan.

use crate::domain::errors::CommentError;
use crate::domain::model::{LabelSection, LineRange, Selection};

/// Parse `"N"` or `"N-M"` into a [`LineRange`].
pub fn parse_range(spec: &str) -> Result<LineRange, CommentError> {
    let invalid = |reason| CommentError::InvalidRangeSyntax {
        spec: spec.to_string(),
        reason,
    };

    let trimmed = spec.trim();
    let (start, end) = if trimmed.contains('-') {
        let parts: Vec<&str> = trimmed.split('-').collect();
        let [start, end] = parts.as_slice() else {
            return Err(invalid("use 'start-end'"));
        };
        let start = parse_line_number(start)
            .ok_or_else(|| invalid("invalid start line number"))?;
        let end = parse_line_number(end)
            .ok_or_else(|| invalid("invalid end line number"))?;
        (start, end)
    } else {
        let line = parse_line_number(trimmed)
            .ok_or_else(|| invalid("expected a positive line number or a range"))?;
        (line, line)
    };

    LineRange::new(start, end)
        .ok_or_else(|| invalid("end line is before start line"))
}

fn parse_line_number(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|line| *line > 0)
}

/// Build a selection from either a range spec or a label pair.
pub fn selection_from_parts(
    lines: Option<&str>,
    labels: Option<(&str, &str)>,
) -> Result<Option<Selection>, CommentError> {
    match (lines, labels) {
        (Some(spec), _) => Ok(Some(parse_range(spec)?.into())),
        (None, Some((start, end))) => Ok(Some(LabelSection::new(start, end)?.into())),
        (None, None) => Ok(None),
    }
}

/// Streaming predicate over 1-based line numbers.
///
/// Feed every line through [`LineSelector::select`] in order, then call
/// [`LineSelector::finish`] with the total line count; bounds and label
/// presence can only be checked once the input is exhausted.
#[derive(Debug, Clone)]
pub struct LineSelector<'a> {
    selection: &'a Selection,
    in_section: bool,
    found_start: bool,
}

impl<'a> LineSelector<'a> {
    pub fn new(selection: &'a Selection) -> Self {
        Self {
            selection,
            in_section: false,
            found_start: false,
        }
    }

    /// Whether `line_number` (with content `text`) should be transformed.
    ///
    /// Label lines themselves are never selected; only the lines strictly
    /// between a start label and the following end label are.
    pub fn select(&mut self, line_number: usize, text: &str) -> bool {
        match self.selection {
            Selection::Lines(range) => range.contains(line_number),
            Selection::Labels(section) => {
                if self.in_section {
                    if text.contains(section.end_label()) {
                        self.in_section = false;
                        return false;
                    }
                    return true;
                }
                if text.contains(section.start_label()) {
                    self.in_section = true;
                    self.found_start = true;
                }
                false
            }
        }
    }

    /// Validate the selection against the complete input.
    pub fn finish(self, total_lines: usize) -> Result<(), CommentError> {
        match self.selection {
            Selection::Lines(range) if range.end() > total_lines => {
                Err(CommentError::RangeOutOfBounds {
                    end: range.end(),
                    lines: total_lines,
                })
            }
            Selection::Lines(_) => Ok(()),
            Selection::Labels(section) if !self.found_start => {
                let label = section.start_label().to_string();
                Err(CommentError::StartLabelNotFound(label))
            }
            Selection::Labels(section) if self.in_section => {
                let label = section.end_label().to_string();
                Err(CommentError::EndLabelNotFound(label))
            }
            Selection::Labels(_) => Ok(()),
        }
    }
}
