use std::io::Cursor;

use insta::assert_snapshot;
use tgcom::app::engine::MutationEngine;
use tgcom::app::language::LanguageRegistry;
use tgcom::domain::model::{Action, LabelSection, RunConfig, Selection, Target};

#[test]
fn dry_run_preview_renders() {
    let source = "\
fn main() {
    // BEGIN debug
    println!(\"tracing on\");
    // eprintln!(\"verbose\");
    // END debug
    run();
}
";
    let marker = LanguageRegistry::builtin()
        .resolve_marker(Some("rust"), None)
        .unwrap();
    let config = RunConfig {
        target: Target::Stdin,
        selection: Selection::Labels(LabelSection::new("BEGIN debug", "END debug").unwrap()),
        marker,
        action: Action::Toggle,
        dry_run: true,
    };

    let mut out = Vec::new();
    MutationEngine::new()
        .apply_stream(Cursor::new(source), &config, &mut out)
        .unwrap();
    let rendered = String::from_utf8(out).unwrap();

    assert_snapshot!("dry_run_preview", rendered);
}
