use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::tag::{Tag, TagType};
use music_file_tag_renamer::models::{ConflictPolicy, Outcome, ProgressEvent};
use music_file_tag_renamer::worker::{process_files, spawn_batch, BatchRequest, CancelToken};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Smallest valid RIFF/WAVE file: PCM fmt chunk plus a few samples.
fn write_minimal_wav(path: &Path) {
    let data = [0u8; 8];
    let mut bytes: Vec<u8> = Vec::new();
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36u32 + data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&44100u32.to_le_bytes());
    bytes.extend_from_slice(&88200u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&data);
    fs::write(path, bytes).unwrap();
}

fn write_tagged_wav(path: &Path, title: &str, artist: &str) {
    write_minimal_wav(path);
    let mut tag = Tag::new(TagType::RiffInfo);
    tag.set_title(title.to_string());
    tag.set_artist(artist.to_string());
    tag.save_to_path(path, WriteOptions::default()).unwrap();
}

fn request(files: Vec<PathBuf>, dry_run: bool, policy: ConflictPolicy) -> BatchRequest {
    BatchRequest {
        files,
        template: "%artist% - %title%".to_string(),
        dry_run,
        policy,
        max_filename_length: None,
    }
}

fn run(req: &BatchRequest) -> (music_file_tag_renamer::models::RenamePlan, Vec<ProgressEvent>) {
    let mut events = Vec::new();
    let plan = process_files(req, &CancelToken::new(), |ev| events.push(ev));
    (plan, events)
}

#[test]
fn renames_a_tagged_file_from_its_metadata() {
    let td = tempdir().unwrap();
    let source = td.path().join("a.wav");
    write_tagged_wav(&source, "Song", "Band");

    let req = request(vec![source.clone()], false, ConflictPolicy::Suffix);
    let (plan, _) = run(&req);

    assert_eq!(plan.succeeded, 1);
    assert_eq!(plan.failed, 0);
    assert_eq!(plan.items[0].outcome, Outcome::Renamed);
    assert_eq!(
        plan.items[0].final_path.as_deref(),
        Some(td.path().join("Band - Song.wav").as_path())
    );
    assert!(td.path().join("Band - Song.wav").exists());
    assert!(!source.exists());
}

#[test]
fn duplicate_metadata_gets_suffixed_in_input_order() {
    let td = tempdir().unwrap();
    let one = td.path().join("one.wav");
    let two = td.path().join("two.wav");
    write_tagged_wav(&one, "X", "Y");
    write_tagged_wav(&two, "X", "Y");

    let req = request(vec![one, two], false, ConflictPolicy::Suffix);
    let (plan, _) = run(&req);

    assert_eq!(plan.succeeded, 2);
    assert_eq!(
        plan.items[0].final_path.as_deref(),
        Some(td.path().join("Y - X.wav").as_path())
    );
    assert_eq!(
        plan.items[1].final_path.as_deref(),
        Some(td.path().join("Y - X_1.wav").as_path())
    );
    assert!(td.path().join("Y - X.wav").exists());
    assert!(td.path().join("Y - X_1.wav").exists());
}

#[test]
fn existing_destination_is_skipped_under_skip_policy() {
    let td = tempdir().unwrap();
    let source = td.path().join("a.wav");
    write_tagged_wav(&source, "Song", "Band");
    fs::write(td.path().join("Band - Song.wav"), b"occupied").unwrap();

    let req = request(vec![source.clone()], false, ConflictPolicy::Skip);
    let (plan, _) = run(&req);

    assert_eq!(plan.succeeded, 0);
    assert_eq!(plan.failed, 1);
    assert_eq!(plan.items[0].outcome, Outcome::Skipped);
    // Skip leaves final_path unset even though a candidate name existed.
    assert!(plan.items[0].candidate_name.is_some());
    assert!(plan.items[0].final_path.is_none());
    assert!(source.exists());
    assert_eq!(
        fs::read(td.path().join("Band - Song.wav")).unwrap(),
        b"occupied"
    );
}

#[test]
fn untagged_file_gets_the_fallback_name() {
    let td = tempdir().unwrap();
    let source = td.path().join("untagged.wav");
    write_minimal_wav(&source);

    let req = request(vec![source], false, ConflictPolicy::Suffix);
    let (plan, _) = run(&req);

    assert_eq!(plan.succeeded, 1);
    assert!(td
        .path()
        .join("Unknown Artist - Unknown Title.wav")
        .exists());
}

#[test]
fn unreadable_metadata_is_not_a_batch_failure() {
    let td = tempdir().unwrap();
    let source = td.path().join("garbage.mp3");
    fs::write(&source, b"this is not an mpeg stream").unwrap();

    let req = request(vec![source], false, ConflictPolicy::Suffix);
    let (plan, _) = run(&req);

    // Extraction recovers with an empty record; the rename itself still works.
    assert_eq!(plan.succeeded, 1);
    assert!(td
        .path()
        .join("Unknown Artist - Unknown Title.mp3")
        .exists());
}

#[test]
fn template_with_no_usable_output_is_unchanged_and_counted_failed() {
    let td = tempdir().unwrap();
    let source = td.path().join("a.wav");
    write_minimal_wav(&source);

    let mut req = request(vec![source.clone()], false, ConflictPolicy::Suffix);
    req.template = "%album%".to_string();
    let (plan, _) = run(&req);

    assert_eq!(plan.succeeded, 0);
    assert_eq!(plan.failed, 1);
    assert_eq!(plan.items[0].outcome, Outcome::Unchanged);
    assert!(plan.items[0].candidate_name.is_none());
    assert!(plan.items[0].final_path.is_none());
    assert!(plan.items[0].error.is_some());
    assert!(source.exists());
}

#[test]
fn missing_source_is_a_per_file_failure_that_does_not_abort() {
    let td = tempdir().unwrap();
    let missing = td.path().join("gone.wav");
    let ok = td.path().join("ok.wav");
    write_tagged_wav(&ok, "Song", "Band");

    let req = request(vec![missing, ok], false, ConflictPolicy::Suffix);
    let (plan, events) = run(&req);

    assert_eq!(plan.items[0].outcome, Outcome::Failed);
    assert!(plan.items[0].error.is_some());
    assert_eq!(plan.items[1].outcome, Outcome::Renamed);
    assert_eq!(plan.succeeded, 1);
    assert_eq!(plan.failed, 1);
    assert_eq!(events.len(), 2);
}

#[test]
fn dry_run_touches_nothing_and_matches_a_later_commit() {
    let td = tempdir().unwrap();
    let one = td.path().join("one.wav");
    let two = td.path().join("two.wav");
    write_tagged_wav(&one, "X", "Y");
    write_tagged_wav(&two, "X", "Y");
    let files = vec![one.clone(), two.clone()];

    let dry = request(files.clone(), true, ConflictPolicy::Suffix);
    let (dry_plan, _) = run(&dry);

    // Nothing moved; both would-be destinations were recorded.
    assert!(one.exists());
    assert!(two.exists());
    assert!(!td.path().join("Y - X.wav").exists());
    assert_eq!(dry_plan.succeeded, 2);
    let recorded: Vec<PathBuf> = dry_plan
        .items
        .iter()
        .map(|i| i.final_path.clone().unwrap())
        .collect();
    assert_eq!(
        recorded,
        vec![td.path().join("Y - X.wav"), td.path().join("Y - X_1.wav")]
    );

    // An identical commit run lands exactly on the recorded destinations.
    let commit = request(files, false, ConflictPolicy::Suffix);
    let (commit_plan, _) = run(&commit);
    let landed: Vec<PathBuf> = commit_plan
        .items
        .iter()
        .map(|i| i.final_path.clone().unwrap())
        .collect();
    assert_eq!(landed, recorded);
    for p in &landed {
        assert!(p.exists());
    }
}

#[test]
fn one_progress_event_per_file_in_order_with_matching_counts() {
    let td = tempdir().unwrap();
    let a = td.path().join("a.wav");
    let b = td.path().join("b.wav");
    let c = td.path().join("c.mp3");
    write_tagged_wav(&a, "One", "Artist");
    write_tagged_wav(&b, "Two", "Artist");
    fs::write(&c, b"garbage").unwrap();

    let req = request(vec![a, b, c], true, ConflictPolicy::Suffix);
    let (plan, events) = run(&req);

    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.index).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(events.iter().all(|e| e.total == 3));
    assert_eq!(
        events.iter().map(|e| e.display_name.clone()).collect::<Vec<_>>(),
        vec!["a.wav", "b.wav", "c.mp3"]
    );
    let renamed = plan
        .items
        .iter()
        .filter(|i| i.outcome == Outcome::Renamed)
        .count();
    assert_eq!(plan.succeeded, renamed);
    assert_eq!(plan.failed, plan.items.len() - renamed);
}

#[test]
fn cancellation_stops_at_a_file_boundary() {
    let td = tempdir().unwrap();
    let a = td.path().join("a.wav");
    write_tagged_wav(&a, "Song", "Band");

    let cancel = CancelToken::new();
    cancel.request();
    let req = request(vec![a.clone()], false, ConflictPolicy::Suffix);
    let plan = process_files(&req, &cancel, |_| {});

    assert!(plan.items.is_empty());
    assert_eq!(plan.succeeded, 0);
    assert!(a.exists());
}

#[tokio::test]
async fn spawn_batch_streams_events_and_returns_the_plan() {
    let td = tempdir().unwrap();
    let a = td.path().join("a.wav");
    write_tagged_wav(&a, "Song", "Band");

    let req = request(vec![a], false, ConflictPolicy::Suffix);
    let mut batch = spawn_batch(req);

    let mut events = Vec::new();
    while let Some(ev) = batch.events.recv().await {
        events.push(ev);
    }
    let plan = batch.handle.await.unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].index, 1);
    assert_eq!(plan.succeeded, 1);
    assert!(td.path().join("Band - Song.wav").exists());
}
