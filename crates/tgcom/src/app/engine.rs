//! Mutation engine: scan a source, transform selected lines, then commit,
//! preview, or stream the result.

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;

use crate::app::selection::LineSelector;
use crate::app::transform;
use crate::domain::errors::CommentError;
use crate::domain::model::{RunConfig, Target};
use crate::infra::fs;

/// How the engine disposed of the transformed lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    /// The target file was rewritten in place.
    Commit,
    /// Selected lines were reported without persisting anything.
    Preview,
    /// All lines were written to the output sink.
    Stream,
}

/// Summary of a single engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub target: Target,
    pub mode: ApplyMode,
    pub lines_scanned: usize,
    pub lines_selected: usize,
    pub lines_changed: usize,
}

/// A selected line before and after transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange<'a> {
    pub line: usize,
    pub original: &'a [u8],
    pub transformed: &'a [u8],
}

// Previews are for people, so bytes that are not UTF-8 render lossily.
impl fmt::Display for LineChange<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}: {} -> {}",
            self.line,
            String::from_utf8_lossy(self.original),
            String::from_utf8_lossy(self.transformed)
        )
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ScanStats {
    scanned: usize,
    selected: usize,
    changed: usize,
}

/// Applies comment transforms to files and streams.
#[derive(Debug, Default)]
pub struct MutationEngine;

impl MutationEngine {
    pub fn new() -> Self {
        Self
    }

    /// Run `config` against its target.
    ///
    /// File targets are rewritten durably unless `dry_run` is set. Standard
    /// input is read from the process and written to `sink`. Previews always
    /// go to `sink`.
    pub fn apply(
        &self,
        config: &RunConfig,
        sink: &mut dyn Write,
    ) -> Result<ApplyReport, CommentError> {
        match &config.target {
            Target::Stdin => {
                let stdin = io::stdin();
                self.apply_stream(stdin.lock(), config, sink)
            }
            Target::File(path) => {
                let source = open_source(path)?;
                if config.dry_run {
                    self.preview(source, config, sink)
                } else {
                    self.commit(path, source, config)
                }
            }
        }
    }

    /// Run `config` over an arbitrary reader, writing either the preview or
    /// the transformed content to `sink`. Nothing is persisted.
    pub fn apply_stream<R: BufRead>(
        &self,
        reader: R,
        config: &RunConfig,
        sink: &mut dyn Write,
    ) -> Result<ApplyReport, CommentError> {
        if config.dry_run {
            return self.preview(reader, config, sink);
        }

        let stats = scan(reader, config, &mut Passthrough(&mut *sink))?;
        fs::flush(sink, "output")?;
        Ok(report(config, ApplyMode::Stream, stats))
    }

    fn preview<R: BufRead>(
        &self,
        reader: R,
        config: &RunConfig,
        sink: &mut dyn Write,
    ) -> Result<ApplyReport, CommentError> {
        let stats = scan(reader, config, &mut Preview(&mut *sink))?;
        fs::flush(sink, "preview")?;
        Ok(report(config, ApplyMode::Preview, stats))
    }

    fn commit<R: BufRead>(
        &self,
        path: &Path,
        source: R,
        config: &RunConfig,
    ) -> Result<ApplyReport, CommentError> {
        let stats = fs::rewrite(path, |writer| {
            scan(source, config, &mut Passthrough(writer))
        })?;
        tracing::info!(
            path = %path.display(),
            changed = stats.changed,
            action = config.action.as_str(),
            "rewrote file"
        );
        Ok(report(config, ApplyMode::Commit, stats))
    }
}

fn open_source(path: &Path) -> Result<BufReader<File>, CommentError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|err| CommentError::io("failed to open file", err))
}

fn report(config: &RunConfig, mode: ApplyMode, stats: ScanStats) -> ApplyReport {
    ApplyReport {
        target: config.target.clone(),
        mode,
        lines_scanned: stats.scanned,
        lines_selected: stats.selected,
        lines_changed: stats.changed,
    }
}

/// Receives every scanned line in input order.
trait LineSink {
    fn untouched(&mut self, content: &[u8], terminator: &[u8]) -> io::Result<()>;
    fn selected(&mut self, change: &LineChange<'_>, terminator: &[u8]) -> io::Result<()>;
}

/// Writes the full transformed content.
struct Passthrough<W>(W);

impl<W: Write> LineSink for Passthrough<W> {
    fn untouched(&mut self, content: &[u8], terminator: &[u8]) -> io::Result<()> {
        self.0.write_all(content)?;
        self.0.write_all(terminator)
    }

    fn selected(&mut self, change: &LineChange<'_>, terminator: &[u8]) -> io::Result<()> {
        self.0.write_all(change.transformed)?;
        self.0.write_all(terminator)
    }
}

/// Writes one record per selected line.
struct Preview<W>(W);

impl<W: Write> LineSink for Preview<W> {
    fn untouched(&mut self, _content: &[u8], _terminator: &[u8]) -> io::Result<()> {
        Ok(())
    }

    fn selected(&mut self, change: &LineChange<'_>, _terminator: &[u8]) -> io::Result<()> {
        writeln!(self.0, "{change}")
    }
}

fn scan<R: BufRead>(
    mut reader: R,
    config: &RunConfig,
    sink: &mut impl LineSink,
) -> Result<ScanStats, CommentError> {
    let mut selector = LineSelector::new(&config.selection);
    let mut stats = ScanStats::default();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = reader
            .read_until(b'\n', &mut buf)
            .map_err(|err| CommentError::io("failed to read input", err))?;
        if read == 0 {
            break;
        }

        stats.scanned += 1;
        let line = stats.scanned;
        let (content, terminator) = split_terminator(&buf);

        if !selector.select(line, &String::from_utf8_lossy(content)) {
            sink.untouched(content, terminator).map_err(write_error)?;
            continue;
        }

        let transformed = transform::apply(config.action, content, &config.marker);
        stats.selected += 1;
        if transformed != content {
            stats.changed += 1;
        }

        let change = LineChange {
            line,
            original: content,
            transformed: &transformed,
        };
        sink.selected(&change, terminator).map_err(write_error)?;
    }

    selector.finish(stats.scanned)?;
    tracing::debug!(
        input = %config.target,
        scanned = stats.scanned,
        selected = stats.selected,
        changed = stats.changed,
        "scan complete"
    );
    Ok(stats)
}

fn write_error(err: io::Error) -> CommentError {
    CommentError::io("failed to write output", err)
}

// A final line without a terminator is written with `\n`.
fn split_terminator(raw: &[u8]) -> (&[u8], &'static [u8]) {
    if let Some(content) = raw.strip_suffix(b"\r\n") {
        (content, b"\r\n")
    } else if let Some(content) = raw.strip_suffix(b"\n") {
        (content, b"\n")
    } else {
        (raw, b"\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use crate::domain::model::{Action, LabelSection, LineRange, Marker, Selection};

    fn stdin_config(selection: Selection, action: Action, dry_run: bool) -> RunConfig {
        RunConfig {
            target: Target::Stdin,
            selection,
            marker: Marker::simple("//"),
            action,
            dry_run,
        }
    }

    fn lines(start: usize, end: usize) -> Selection {
        Selection::Lines(LineRange::new(start, end).unwrap())
    }

    fn run(input: &str, config: &RunConfig) -> (Result<ApplyReport, CommentError>, String) {
        let mut out = Vec::new();
        let result = MutationEngine::new().apply_stream(Cursor::new(input), config, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn stream_transforms_selected_lines_only() {
        let config = stdin_config(lines(2, 3), Action::Comment, false);
        let (result, out) = run("a\nb\nc\nd\n", &config);
        let report = result.unwrap();
        assert_eq!(out, "a\n// b\n// c\nd\n");
        assert_eq!(report.mode, ApplyMode::Stream);
        assert_eq!(report.lines_scanned, 4);
        assert_eq!(report.lines_selected, 2);
        assert_eq!(report.lines_changed, 2);
    }

    #[test]
    fn preserves_crlf_and_terminates_last_line() {
        let config = stdin_config(lines(1, 1), Action::Toggle, false);
        let (result, out) = run("// a\r\nb", &config);
        assert!(result.is_ok());
        assert_eq!(out, "a\r\nb\n");
    }

    #[test]
    fn uncomment_counts_only_real_changes() {
        let config = stdin_config(lines(1, 2), Action::Uncomment, false);
        let (result, out) = run("// a\nb\n", &config);
        assert_eq!(out, "a\nb\n");
        assert_eq!(result.unwrap().lines_changed, 1);
    }

    #[test]
    fn preview_lists_each_selected_line() {
        let config = stdin_config(lines(1, 2), Action::Toggle, true);
        let (result, out) = run("x = 1\n// y = 2\nz\n", &config);
        assert_eq!(result.unwrap().mode, ApplyMode::Preview);
        assert_eq!(
            out,
            "line 1: x = 1 -> // x = 1\nline 2: // y = 2 -> y = 2\n"
        );
    }

    #[test]
    fn labels_drive_selection() {
        let section = LabelSection::new("BEGIN", "END").unwrap();
        let config = stdin_config(Selection::Labels(section), Action::Comment, false);
        let (result, out) = run("// BEGIN\nf();\n// END\ng();\n", &config);
        assert!(result.is_ok());
        assert_eq!(out, "// BEGIN\n// f();\n// END\ng();\n");
    }

    #[test]
    fn out_of_bounds_is_reported_after_scan() {
        let config = stdin_config(lines(2, 9), Action::Comment, false);
        let (result, _) = run("a\nb\n", &config);
        assert!(matches!(
            result,
            Err(CommentError::RangeOutOfBounds { end: 9, lines: 2 })
        ));
    }

    #[test]
    fn non_utf8_lines_are_commented_as_bytes() {
        let config = stdin_config(lines(1, 2), Action::Toggle, false);
        let input: &[u8] = b"int caf\xe9 = 1;\n// \xff\r\nrest\n";
        let mut out = Vec::new();
        let report = MutationEngine::new()
            .apply_stream(Cursor::new(input), &config, &mut out)
            .unwrap();
        assert_eq!(out, b"// int caf\xe9 = 1;\n\xff\r\nrest\n");
        assert_eq!(report.lines_changed, 2);
    }

    #[test]
    fn preview_renders_non_utf8_lossily() {
        let config = stdin_config(lines(1, 1), Action::Comment, true);
        let input: &[u8] = b"caf\xe9\n";
        let mut out = Vec::new();
        MutationEngine::new()
            .apply_stream(Cursor::new(input), &config, &mut out)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "line 1: caf\u{fffd} -> // caf\u{fffd}\n"
        );
    }

    #[test]
    fn empty_input_has_no_lines() {
        let config = stdin_config(lines(1, 1), Action::Comment, false);
        let (result, out) = run("", &config);
        assert!(matches!(
            result,
            Err(CommentError::RangeOutOfBounds { end: 1, lines: 0 })
        ));
        assert!(out.is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let config = RunConfig {
            target: Target::File("definitely/not/here.go".into()),
            ..stdin_config(lines(1, 1), Action::Comment, false)
        };
        match MutationEngine::new().apply(&config, &mut Vec::<u8>::new()) {
            Err(CommentError::Io { source, .. }) => {
                assert_eq!(source.kind(), io::ErrorKind::NotFound)
            }
            other => panic!("expected io error, got {other:?}"),
        }
    }
}
