//! Domain models for markers, selections, actions, and run configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::domain::errors::CommentError;

/// Single-line comment syntax for a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Marker {
    /// A prefix such as `//` or `#`.
    Simple(String),
    /// A delimiter pair wrapping the whole line, such as `<!--` and `-->`.
    Paired { prefix: String, suffix: String },
}

impl Marker {
    pub fn simple(prefix: impl Into<String>) -> Self {
        Marker::Simple(prefix.into())
    }

    pub fn paired(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Marker::Paired {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Parse a marker string. One token is a simple prefix, two whitespace
    /// separated tokens (`"<!-- -->"`) are a prefix/suffix pair.
    pub fn parse(value: &str) -> Result<Self, CommentError> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        match parts.as_slice() {
            [prefix] => Ok(Marker::simple(*prefix)),
            [prefix, suffix] => Ok(Marker::paired(*prefix, *suffix)),
            _ => Err(CommentError::InvalidMarker(value.to_string())),
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Marker::Simple(prefix) => f.write_str(prefix),
            Marker::Paired { prefix, suffix } => write!(f, "{prefix} {suffix}"),
        }
    }
}

/// What to do with each selected line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Action {
    /// Prepend (or wrap with) the comment marker.
    Comment,
    /// Remove the comment marker when present.
    Uncomment,
    /// Uncomment commented lines, comment the rest.
    #[default]
    Toggle,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Comment => "comment",
            Action::Uncomment => "uncomment",
            Action::Toggle => "toggle",
        }
    }
}

impl FromStr for Action {
    type Err = CommentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "comment" => Ok(Action::Comment),
            "uncomment" => Ok(Action::Uncomment),
            "toggle" | "" => Ok(Action::Toggle),
            other => Err(CommentError::InvalidAction(other.to_string())),
        }
    }
}

/// Inclusive, 1-based line interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    start: usize,
    end: usize,
}

impl LineRange {
    /// Returns `None` unless `1 <= start <= end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start >= 1 && start <= end).then_some(Self { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

impl fmt::Display for LineRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Lines between a start-label line and the next end-label line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSection {
    start: String,
    end: String,
}

impl LabelSection {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Result<Self, CommentError> {
        let start = start.into();
        let end = end.into();
        if start.is_empty() || end.is_empty() {
            return Err(CommentError::EmptyLabel);
        }
        Ok(Self { start, end })
    }

    pub fn start_label(&self) -> &str {
        &self.start
    }

    pub fn end_label(&self) -> &str {
        &self.end
    }
}

/// Which lines an invocation touches. The two forms are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Lines(LineRange),
    Labels(LabelSection),
}

impl From<LineRange> for Selection {
    fn from(value: LineRange) -> Self {
        Selection::Lines(value)
    }
}

impl From<LabelSection> for Selection {
    fn from(value: LabelSection) -> Self {
        Selection::Labels(value)
    }
}

/// Where lines are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    File(PathBuf),
    Stdin,
}

impl Target {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Target::File(path) => Some(path),
            Target::Stdin => None,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::File(path) => write!(f, "{}", path.display()),
            Target::Stdin => f.write_str("<stdin>"),
        }
    }
}

/// Fully resolved inputs for a single engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub target: Target,
    pub selection: Selection,
    pub marker: Marker,
    pub action: Action,
    pub dry_run: bool,
}
