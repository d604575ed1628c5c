//! Domain-specific errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("language not specified and no filename provided")]
    MissingLanguage,

    #[error("invalid marker '{0}'")]
    InvalidMarker(String),

    #[error("invalid action '{0}': use 'comment', 'uncomment', or 'toggle'")]
    InvalidAction(String),

    #[error("invalid range '{spec}': {reason}")]
    InvalidRangeSyntax { spec: String, reason: &'static str },

    #[error("line {end} is out of range (input has {lines} lines)")]
    RangeOutOfBounds { end: usize, lines: usize },

    #[error("start and end labels must be non-empty")]
    EmptyLabel,

    #[error("start label '{0}' not found")]
    StartLabelNotFound(String),

    #[error("end label '{0}' not found")]
    EndLabelNotFound(String),

    #[error("invalid target '{0}': use '<file>' or '<file>:<lines>'")]
    InvalidTarget(String),

    #[error("no lines selected for {0}: pass a line range or a label pair")]
    MissingSelection(PathBuf),

    #[error("refusing to overwrite existing file {}", .0.display())]
    ArtifactExists(PathBuf),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<CommentError>,
    },
}

impl CommentError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        CommentError::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach the originating file to an error raised while processing it.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        CommentError::InFile {
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// Strip any file attribution and return the underlying error.
    pub fn root(&self) -> &CommentError {
        match self {
            CommentError::InFile { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_file_prefixes_path_and_keeps_root() {
        let missing = CommentError::StartLabelNotFound("BEGIN".into());
        let err = missing.in_file("src/main.go");
        assert_eq!(
            err.to_string(),
            "src/main.go: start label 'BEGIN' not found"
        );
        assert!(matches!(err.root(), CommentError::StartLabelNotFound(_)));
    }

    #[test]
    fn io_errors_expose_their_source() {
        let err = CommentError::io(
            "failed to open file",
            io::Error::new(io::ErrorKind::NotFound, "no such file"),
        );
        let source = std::error::Error::source(&err).expect("io source");
        assert_eq!(source.to_string(), "no such file");
    }
}
