//! End-to-end runs over real script files in temp directories.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use loctag::{
    plan_sync_with_rng, run_sync, run_sync_with_rng, OutputMode, SyncError, SyncOptions,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn in_place() -> SyncOptions {
    SyncOptions {
        output: OutputMode::InPlace,
        ..SyncOptions::default()
    }
}

fn write_script(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

/// Matches ` #loc:<id>` at the end of a line and returns the id.
fn trailing_loc_id(line: &str) -> Option<&str> {
    let (text, id) = line.rsplit_once("#loc:")?;
    assert!(text.ends_with(' '));
    Some(id)
}

#[test]
fn fresh_line_gets_one_scoped_marker() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "main.scn", "== intro\nHello world\n");

    let report = run_sync(&[path.clone()], &in_place()).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.kept, 0);

    let content = fs::read_to_string(&path).unwrap();
    let line = content.lines().nth(1).unwrap();
    assert!(line.starts_with("Hello world "));

    let id = trailing_loc_id(line).unwrap();
    let suffix = id.strip_prefix("main_intro_").unwrap();
    assert_eq!(suffix.len(), 4);
    assert!(suffix
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    assert_eq!(content.matches("#loc:").count(), 1);

    assert_eq!(report.table.get(id), Some("Hello world"));
}

#[test]
fn second_run_is_byte_identical_noop() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "main.scn",
        "== intro\nHello world\n-- deeper\nAnother line\n",
    );

    run_sync(&[path.clone()], &in_place()).unwrap();
    let after_first = fs::read(&path).unwrap();

    let report = run_sync(&[path.clone()], &in_place()).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.replaced, 0);
    assert_eq!(report.kept, 2);
    assert!(report.files_written.is_empty());
    assert_eq!(fs::read(&path).unwrap(), after_first);
}

#[test]
fn retag_all_redraws_every_suffix() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "main.scn", "Bonjour #loc:main_XXXX\n");

    let options = SyncOptions {
        retag_all: true,
        output: OutputMode::InPlace,
        ..SyncOptions::default()
    };
    let report = run_sync_with_rng(&[path.clone()], &options, StdRng::seed_from_u64(9)).unwrap();
    assert_eq!(report.replaced, 1);

    let content = fs::read_to_string(&path).unwrap();
    let line = content.lines().next().unwrap();
    assert!(line.starts_with("Bonjour #loc:main_"));
    let id = trailing_loc_id(line).unwrap();
    assert_ne!(id, "main_XXXX");
    assert_eq!(report.table.get(id), Some("Bonjour"));
}

#[test]
fn existing_tag_kept_and_collected() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "main.scn", "Bonjour #loc:main_XXXX\n");
    let before = fs::read(&path).unwrap();

    let report = run_sync(&[path.clone()], &in_place()).unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);
    assert_eq!(report.kept, 1);
    assert_eq!(report.table.get("main_XXXX"), Some("Bonjour"));
}

#[test]
fn duplicate_runs_on_a_line_abort_without_writing() {
    let dir = TempDir::new().unwrap();
    let fine = write_script(&dir, "a.scn", "First line\n");
    let broken = write_script(&dir, "b.scn", "One\nHey [b]mid[/b] tail\n");
    let before = fs::read(&fine).unwrap();

    let err = run_sync(&[fine.clone(), broken], &in_place()).unwrap_err();
    match err {
        SyncError::Classify(e) => assert!(e.to_string().contains(":2:")),
        other => panic!("expected classification failure, got {other}"),
    }
    assert_eq!(fs::read(&fine).unwrap(), before);
}

#[test]
fn tag_content_and_code_text_never_tagged() {
    let dir = TempDir::new().unwrap();
    let path = write_script(
        &dir,
        "main.scn",
        "$greeting = \"Hello\"\nSpoken line #note:internal\n",
    );

    let report = run_sync(&[path.clone()], &in_place()).unwrap();
    assert_eq!(report.inserted, 1);

    let content = fs::read_to_string(&path).unwrap();
    // The assignment line is untouched; the note hashtag is untouched; the
    // marker lands between the spoken text and the note.
    assert_eq!(content.lines().next().unwrap(), "$greeting = \"Hello\"");
    let line = content.lines().nth(1).unwrap();
    assert!(line.starts_with("Spoken line #loc:main_"));
    assert!(line.ends_with(" #note:internal"));
}

#[test]
fn debug_suffix_output_leaves_sources_untouched() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "main.scn", "Hello\n");
    let before = fs::read(&path).unwrap();

    let report = run_sync(&[path.clone()], &SyncOptions::default()).unwrap();
    assert_eq!(fs::read(&path).unwrap(), before);

    let sibling = dir.path().join("main.scn.tagged");
    assert_eq!(report.files_written, vec![sibling.clone()]);
    let tagged = fs::read_to_string(&sibling).unwrap();
    assert!(tagged.starts_with("Hello #loc:main_"));
}

#[test]
fn shared_include_tagged_once_across_documents() {
    let dir = TempDir::new().unwrap();
    write_script(&dir, "shared.scn", "Shared line\n");
    let a = write_script(&dir, "a.scn", "@include shared.scn\nA line\n");
    let b = write_script(&dir, "b.scn", "@include shared.scn\nB line\n");

    let report = run_sync(&[a, b], &in_place()).unwrap();
    assert_eq!(report.inserted, 3);

    let shared = fs::read_to_string(dir.path().join("shared.scn")).unwrap();
    assert_eq!(shared.matches("#loc:shared_").count(), 1);
}

#[test]
fn string_table_preserves_document_order() {
    let dir = TempDir::new().unwrap();
    let path = write_script(&dir, "main.scn", "== one\nAlpha\n== two\nBeta\nGamma\n");

    let plan =
        plan_sync_with_rng(&[path], &SyncOptions::default(), StdRng::seed_from_u64(1)).unwrap();
    let texts: Vec<&str> = plan.table.iter().map(|(_, text)| text).collect();
    assert_eq!(texts, vec!["Alpha", "Beta", "Gamma"]);

    let ids: Vec<&str> = plan.table.iter().map(|(id, _)| id).collect();
    assert!(ids[0].starts_with("main_one_"));
    assert!(ids[1].starts_with("main_two_"));
    assert!(ids[2].starts_with("main_two_"));
}

#[test]
fn patch_failure_keeps_earlier_files_written() {
    let dir = TempDir::new().unwrap();
    let first = write_script(&dir, "a.scn", "A line\n");
    let second = write_script(&dir, "b.scn", "B line\n");

    let options = in_place();
    let plan = plan_sync_with_rng(
        &[first.clone(), second.clone()],
        &options,
        StdRng::seed_from_u64(3),
    )
    .unwrap();
    // Sabotage the second file between planning and applying.
    fs::remove_file(&second).unwrap();

    let err = loctag::apply_plan(plan, &options).unwrap_err();
    assert!(matches!(err, SyncError::Patch(_)));
    let a_content = fs::read_to_string(&first).unwrap();
    assert!(a_content.contains("#loc:a_"));
}
