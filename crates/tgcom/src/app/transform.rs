//! Line-level comment transforms.
//!
//! Lines are handled as raw bytes, so any encoding that keeps ASCII markers
//! intact works. Every function here is total: a line that cannot be
//! uncommented comes back unchanged. Matching is purely textual, so string
//! literals that happen to start with the marker are treated like comments.

use crate::domain::model::{Action, Marker};

const SPACE: &[u8] = b" ";

/// Apply `action` to a single line.
pub fn apply(action: Action, line: &[u8], marker: &Marker) -> Vec<u8> {
    match action {
        Action::Comment => comment(line, marker),
        Action::Uncomment => uncomment(line, marker),
        Action::Toggle => toggle(line, marker),
    }
}

pub fn comment(line: &[u8], marker: &Marker) -> Vec<u8> {
    match marker {
        Marker::Simple(prefix) => [prefix.as_bytes(), SPACE, line].concat(),
        Marker::Paired { prefix, suffix } => {
            [prefix.as_bytes(), SPACE, line, SPACE, suffix.as_bytes()].concat()
        }
    }
}

pub fn uncomment(line: &[u8], marker: &Marker) -> Vec<u8> {
    match marker {
        Marker::Simple(prefix) => uncomment_simple(line, prefix.as_bytes()),
        Marker::Paired { prefix, suffix } => {
            uncomment_paired(line, prefix.as_bytes(), suffix.as_bytes())
        }
    }
}

pub fn toggle(line: &[u8], marker: &Marker) -> Vec<u8> {
    if is_commented(line, marker) {
        uncomment(line, marker)
    } else {
        comment(line, marker)
    }
}

/// Whether `line` carries the marker after any leading indentation.
pub fn is_commented(line: &[u8], marker: &Marker) -> bool {
    match marker {
        Marker::Simple(prefix) => line.trim_ascii_start().starts_with(prefix.as_bytes()),
        Marker::Paired { prefix, suffix } => {
            paired_body(line.trim_ascii(), prefix.as_bytes(), suffix.as_bytes()).is_some()
        }
    }
}

fn uncomment_simple(line: &[u8], prefix: &[u8]) -> Vec<u8> {
    let trimmed = line.trim_ascii_start();
    let Some(rest) = trimmed.strip_prefix(prefix) else {
        return line.to_vec();
    };

    let indent = &line[..line.len() - trimmed.len()];
    let rest = rest.strip_prefix(SPACE).unwrap_or(rest);
    [indent, rest].concat()
}

fn uncomment_paired(line: &[u8], prefix: &[u8], suffix: &[u8]) -> Vec<u8> {
    let Some(body) = paired_body(line.trim_ascii(), prefix, suffix) else {
        return line.to_vec();
    };

    let leading = line.len() - line.trim_ascii_start().len();
    let trailing = line.len() - line.trim_ascii_end().len();
    let body = body.strip_prefix(SPACE).unwrap_or(body);
    let body = body.strip_suffix(SPACE).unwrap_or(body);
    [&line[..leading], body, &line[line.len() - trailing..]].concat()
}

// The delimiters must not overlap: `<!-->` is not a wrapped empty line.
fn paired_body<'a>(inner: &'a [u8], prefix: &[u8], suffix: &[u8]) -> Option<&'a [u8]> {
    if inner.len() < prefix.len() + suffix.len() {
        return None;
    }
    inner.strip_prefix(prefix)?.strip_suffix(suffix)
}
