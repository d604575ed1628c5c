//! Fan one invocation out over a comma-separated list of targets.

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app::engine::{ApplyReport, MutationEngine};
use crate::app::language::LanguageRegistry;
use crate::app::selection::parse_range;
use crate::domain::errors::CommentError;
use crate::domain::model::{Action, Marker, RunConfig, Selection, Target};

/// A file, optionally carrying its own `:lines` selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub path: PathBuf,
    pub selection: Option<Selection>,
}

impl TargetSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            selection: None,
        }
    }
}

impl FromStr for TargetSpec {
    type Err = CommentError;

    /// `path` or `path:N` / `path:N-M`. A suffix that is not a line spec is
    /// treated as part of the path, so `C:\src\main.c` still parses.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(CommentError::InvalidTarget(value.to_string()));
        }

        match value.rsplit_once(':') {
            Some((path, lines)) if looks_like_line_spec(lines) => {
                if path.is_empty() {
                    return Err(CommentError::InvalidTarget(value.to_string()));
                }
                Ok(Self {
                    path: PathBuf::from(path),
                    selection: Some(parse_range(lines)?.into()),
                })
            }
            Some((_, "")) => Err(CommentError::InvalidTarget(value.to_string())),
            _ => Ok(Self::new(value)),
        }
    }
}

fn looks_like_line_spec(value: &str) -> bool {
    !value.trim().is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_digit() || ch == '-' || ch.is_whitespace())
}

/// Parse `a.go:1-3,b.py,c.rs:7`. Empty entries between commas are ignored.
pub fn parse_targets(list: &str) -> Result<Vec<TargetSpec>, CommentError> {
    let targets = list
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(TargetSpec::from_str)
        .collect::<Result<Vec<_>, _>>()?;

    if targets.is_empty() {
        return Err(CommentError::InvalidTarget(list.to_string()));
    }
    Ok(targets)
}

/// Settings shared by every target in a batch.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Used for targets without an inline selection.
    pub selection: Option<Selection>,
    pub language: Option<String>,
    /// Explicit marker; bypasses language resolution entirely.
    pub marker: Option<Marker>,
    pub action: Action,
    pub dry_run: bool,
}

/// Runs the engine over targets one at a time, stopping at the first failure.
pub struct BatchDriver<'a> {
    registry: &'a LanguageRegistry,
    engine: MutationEngine,
}

impl<'a> BatchDriver<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self {
            registry,
            engine: MutationEngine::new(),
        }
    }

    /// Resolve the run configuration for a single target.
    pub fn run_config(
        &self,
        target: Target,
        selection: Option<&Selection>,
        options: &BatchOptions,
    ) -> Result<RunConfig, CommentError> {
        let Some(selection) = selection.or(options.selection.as_ref()).cloned() else {
            let name = match target.path() {
                Some(path) => path.to_path_buf(),
                None => PathBuf::from("<stdin>"),
            };
            return Err(CommentError::MissingSelection(name));
        };

        let marker = match &options.marker {
            Some(marker) => marker.clone(),
            None => self
                .registry
                .resolve_marker(options.language.as_deref(), target.path())?,
        };

        Ok(RunConfig {
            target,
            selection,
            marker,
            action: options.action,
            dry_run: options.dry_run,
        })
    }

    /// Apply `options` to each target in order.
    ///
    /// The first failure is returned with its path attached. Files processed
    /// before it keep their new content.
    pub fn apply_all(
        &self,
        targets: &[TargetSpec],
        options: &BatchOptions,
        sink: &mut dyn Write,
    ) -> Result<Vec<ApplyReport>, CommentError> {
        let label_previews = options.dry_run && targets.len() > 1;
        let mut reports = Vec::with_capacity(targets.len());

        for spec in targets {
            let report = self
                .apply_one(spec, options, sink, label_previews)
                .map_err(|err| err.in_file(&spec.path))?;
            reports.push(report);
        }

        Ok(reports)
    }

    fn apply_one(
        &self,
        spec: &TargetSpec,
        options: &BatchOptions,
        sink: &mut dyn Write,
        label_preview: bool,
    ) -> Result<ApplyReport, CommentError> {
        let config = self.run_config(
            Target::File(spec.path.clone()),
            spec.selection.as_ref(),
            options,
        )?;
        tracing::debug!(
            path = %spec.path.display(),
            marker = %config.marker,
            "processing target"
        );

        if label_preview {
            writeln!(sink, "==> {} <==", spec.path.display())
                .map_err(|err| CommentError::io("failed to write header", err))?;
        }
        self.engine.apply(&config, sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    use crate::domain::model::{LabelSection, LineRange};

    #[test]
    fn parses_bare_and_ranged_targets() {
        let targets = parse_targets("a.go:1-3, b.py ,c.rs:7,").unwrap();
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].path, PathBuf::from("a.go"));
        assert_eq!(
            targets[0].selection,
            Some(Selection::Lines(LineRange::new(1, 3).unwrap()))
        );
        assert_eq!(targets[1], TargetSpec::new("b.py"));
        assert_eq!(
            targets[2].selection,
            Some(Selection::Lines(LineRange::new(7, 7).unwrap()))
        );
    }

    #[test]
    fn non_numeric_suffix_stays_in_path() {
        let spec: TargetSpec = r"C:\src\main.c".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from(r"C:\src\main.c"));
        assert!(spec.selection.is_none());
    }

    #[test]
    fn malformed_targets_are_rejected() {
        assert!(matches!(
            "main.go:".parse::<TargetSpec>(),
            Err(CommentError::InvalidTarget(_))
        ));
        assert!(matches!(
            "main.go:5-2".parse::<TargetSpec>(),
            Err(CommentError::InvalidRangeSyntax { .. })
        ));
        assert!(matches!(
            parse_targets(" , "),
            Err(CommentError::InvalidTarget(_))
        ));
    }

    #[test]
    fn bare_target_without_global_selection_fails() {
        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let result = driver.run_config(
            Target::File("main.go".into()),
            None,
            &BatchOptions::default(),
        );
        assert!(matches!(result, Err(CommentError::MissingSelection(_))));
    }

    #[test]
    fn explicit_marker_skips_registry() {
        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let options = BatchOptions {
            selection: Some(Selection::Lines(LineRange::new(1, 1).unwrap())),
            marker: Some(Marker::simple(";;")),
            ..BatchOptions::default()
        };
        let config = driver
            .run_config(Target::File("init.el".into()), None, &options)
            .unwrap();
        assert_eq!(config.marker, Marker::simple(";;"));
    }

    #[test]
    fn applies_per_file_and_global_selections() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let go = dir.path().join("main.go");
        let py = dir.path().join("tool.py");
        fs::write(&go, "a\nb\nc\n")?;
        fs::write(&py, "x\n# BEGIN\ny\n# END\n")?;

        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let targets = vec![
            TargetSpec {
                path: go.clone(),
                selection: Some(Selection::Lines(LineRange::new(2, 3).unwrap())),
            },
            TargetSpec::new(&py),
        ];
        let options = BatchOptions {
            selection: Some(Selection::Labels(LabelSection::new("BEGIN", "END")?)),
            action: Action::Comment,
            ..BatchOptions::default()
        };

        let reports = driver.apply_all(&targets, &options, &mut Vec::<u8>::new())?;

        assert_eq!(reports.len(), 2);
        assert_eq!(fs::read_to_string(&go)?, "a\n// b\n// c\n");
        assert_eq!(fs::read_to_string(&py)?, "x\n# BEGIN\n# y\n# END\n");
        Ok(())
    }

    #[test]
    fn first_failure_stops_batch_and_names_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let first = dir.path().join("first.go");
        let broken = dir.path().join("broken.go");
        let last = dir.path().join("last.go");
        for path in [&first, &broken, &last] {
            fs::write(path, "one\ntwo\n")?;
        }

        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let targets = vec![
            TargetSpec::new(&first),
            TargetSpec {
                path: broken.clone(),
                selection: Some(Selection::Lines(LineRange::new(1, 5).unwrap())),
            },
            TargetSpec::new(&last),
        ];
        let options = BatchOptions {
            selection: Some(Selection::Lines(LineRange::new(1, 1).unwrap())),
            action: Action::Comment,
            ..BatchOptions::default()
        };

        let err = driver
            .apply_all(&targets, &options, &mut Vec::<u8>::new())
            .unwrap_err();

        match &err {
            CommentError::InFile { path, .. } => assert_eq!(path, &broken),
            other => panic!("expected a file-attributed error, got {other:?}"),
        }
        assert!(matches!(err.root(), CommentError::RangeOutOfBounds { .. }));
        assert_eq!(fs::read_to_string(&first)?, "// one\ntwo\n");
        assert_eq!(fs::read_to_string(&broken)?, "one\ntwo\n");
        assert_eq!(fs::read_to_string(&last)?, "one\ntwo\n");
        Ok(())
    }

    #[test]
    fn batch_errors_name_the_file_once() {
        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let options = BatchOptions {
            selection: Some(Selection::Lines(LineRange::new(1, 1).unwrap())),
            ..BatchOptions::default()
        };
        let targets = [TargetSpec::new("no/such/dir/main.c")];

        let err = driver
            .apply_all(&targets, &options, &mut Vec::<u8>::new())
            .unwrap_err();

        let message = err.to_string();
        assert_eq!(message, "no/such/dir/main.c: failed to open file");
        assert_eq!(message.matches("main.c").count(), 1);
    }

    #[test]
    fn multi_file_preview_labels_each_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let a = dir.path().join("a.sh");
        let b = dir.path().join("b.lua");
        fs::write(&a, "echo a\n")?;
        fs::write(&b, "print(1)\n")?;

        let registry = LanguageRegistry::builtin();
        let driver = BatchDriver::new(&registry);
        let options = BatchOptions {
            selection: Some(Selection::Lines(LineRange::new(1, 1).unwrap())),
            dry_run: true,
            ..BatchOptions::default()
        };
        let targets = [TargetSpec::new(&a), TargetSpec::new(&b)];
        let mut out = Vec::new();
        driver.apply_all(&targets, &options, &mut out)?;

        let out = String::from_utf8(out)?;
        let header = format!("==> {} <==\nline 1: echo a -> # echo a", a.display());
        assert!(out.contains(&header));
        assert!(out.contains("line 1: print(1) -> -- print(1)"));
        assert_eq!(fs::read_to_string(&a)?, "echo a\n");
        Ok(())
    }
}
