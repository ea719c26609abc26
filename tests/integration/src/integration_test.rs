//! End-to-end integration tests for manifest-driven reconciliation
//!
//! These tests exercise the complete flow: manifest loading -> item and
//! replica construction -> reconciliation over real directories.

use std::path::Path;

use airship_core::transform::FnTransformer;
use airship_core::{
    FileOutcome, Manifest, NativeFile, Reconciler, RunReport, TransformerRegistry,
};
use airship_fs::RobustnessConfig;
use airship_test_utils::ReplicaDir;
use pretty_assertions::assert_eq;

const MANIFEST: &str = r#"
[options]
io_timeout_secs = 10

[[replicas]]
id = "steam"
kind = "directory"
root = "steam"

[[replicas]]
id = "laptop"
kind = "directory"
root = "laptop"

[[replicas]]
id = "cloud"
kind = "directory"
root = "cloud"

[[items]]
name = "Transistor"
pattern = '^[Pp]rofile[1-5]\.sav$'
folder = "remote"

[items.targets]
steam = "237930"
laptop = "237930"
cloud = { identifier = "transistor", folder = "Documents" }

[[items]]
name = "Notes"
pattern = '\.txt$'
transformer = "crlf"

[items.targets]
laptop = "notes"
cloud = "notes"
"#;

/// Normalises line endings for comparison and writes CRLF to the cloud.
fn crlf_transformer() -> FnTransformer {
    FnTransformer::builder()
        .compare(|_filename, a, b| {
            let strip = |data: &[u8]| data.iter().copied().filter(|&b| b != b'\r').collect::<Vec<u8>>();
            Ok(strip(a) == strip(b))
        })
        .write(|filename, data, destination, _metadata| {
            let text = String::from_utf8_lossy(data).replace("\r\n", "\n");
            let native = if destination == "cloud" {
                text.replace('\n', "\r\n")
            } else {
                text
            };
            Ok(NativeFile::new(filename, native))
        })
        .build()
}

fn registry() -> TransformerRegistry {
    let mut registry = TransformerRegistry::new();
    registry.register("crlf", crlf_transformer());
    registry
}

async fn sync(manifest_path: &Path) -> RunReport {
    let manifest = Manifest::load(manifest_path).unwrap();
    let registry = registry();
    manifest.validate(&registry).unwrap();

    let items = manifest.to_items(&registry).unwrap();
    let replicas = manifest.build_replicas(manifest_path.parent().unwrap(), RobustnessConfig::default());
    let mut reconciler = Reconciler::new(replicas)
        .unwrap()
        .with_options(manifest.options.to_options());
    reconciler.run(&items).await
}

fn seeded() -> ReplicaDir {
    let dir = ReplicaDir::new();
    dir.write("airship.toml", MANIFEST, 1);

    dir.write("steam/237930/remote/Profile1.sav", "steam-p1", 300);
    dir.write("laptop/237930/remote/Profile1.sav", "laptop-p1", 200);
    dir.write("laptop/237930/remote/Profile2.sav", "laptop-p2", 250);
    dir.write("cloud/transistor/Documents/Profile1.sav", "steam-p1", 350);

    dir.write("laptop/notes/todo.txt", "milk\neggs\n", 500);
    dir.write("cloud/notes/todo.txt", "milk\r\neggs\r\n", 100);
    dir.write("cloud/notes/ideas.txt", "airship\r\n", 400);
    dir
}

#[tokio::test]
async fn test_first_pass_converges_every_replica() {
    let dir = seeded();
    let report = sync(&dir.path("airship.toml")).await;

    let transistor = report.item("Transistor").unwrap();
    assert_eq!(transistor.participants, vec!["steam", "laptop", "cloud"]);

    // Cloud holds the same content as steam, so only the laptop copy is stale
    let p1 = transistor.file("Profile1.sav").unwrap();
    assert_eq!(p1.winner.as_deref(), Some("steam"));
    assert_eq!(p1.written, vec!["laptop"]);
    dir.assert_content("laptop/237930/remote/Profile1.sav", "steam-p1");

    let p2 = transistor.file("Profile2.sav").unwrap();
    assert_eq!(p2.written, vec!["steam", "cloud"]);
    dir.assert_content("steam/237930/remote/Profile2.sav", "laptop-p2");
    dir.assert_content("cloud/transistor/Documents/Profile2.sav", "laptop-p2");

    let notes = report.item("Notes").unwrap();
    assert_eq!(notes.file("todo.txt").unwrap().outcome, FileOutcome::InSync);
    assert_eq!(notes.file("ideas.txt").unwrap().written, vec!["laptop"]);
    dir.assert_content("laptop/notes/ideas.txt", "airship\n");
    dir.assert_content("cloud/notes/todo.txt", "milk\r\neggs\r\n");
}

#[tokio::test]
async fn test_edit_propagates_on_next_pass() {
    let dir = seeded();
    let first = sync(&dir.path("airship.toml")).await;
    assert!(first.write_count() > 0);

    let settled = sync(&dir.path("airship.toml")).await;
    assert_eq!(settled.write_count(), 0);

    // An edit on one replica, newer than anything written so far
    let later = dir.mtime("laptop/237930/remote/Profile1.sav") + 60;
    dir.write("cloud/transistor/Documents/Profile1.sav", "cloud-edit", later);

    let report = sync(&dir.path("airship.toml")).await;
    let p1 = report.item("Transistor").unwrap().file("Profile1.sav").unwrap();
    assert_eq!(p1.winner.as_deref(), Some("cloud"));
    assert_eq!(p1.written, vec!["steam", "laptop"]);
    dir.assert_content("steam/237930/remote/Profile1.sav", "cloud-edit");
    dir.assert_content("laptop/237930/remote/Profile1.sav", "cloud-edit");
}

#[tokio::test]
async fn test_one_broken_item_does_not_stop_the_run() {
    let dir = seeded();
    // The cloud loses its notes directory: Notes cannot run, Transistor can
    std::fs::remove_dir_all(dir.path("cloud/notes")).unwrap();

    let report = sync(&dir.path("airship.toml")).await;

    assert!(!report.item("Notes").unwrap().is_reconciled());
    assert!(report.item("Transistor").unwrap().is_reconciled());
    dir.assert_content("laptop/237930/remote/Profile1.sav", "steam-p1");
    assert!(report.has_problems());
}

#[tokio::test]
async fn test_report_serializes_to_json() {
    let dir = seeded();
    let report = sync(&dir.path("airship.toml")).await;

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"]["status"], "completed");
    assert_eq!(json["items"].as_array().unwrap().len(), 2);
    assert!(json["items"][0]["files"][0]["digest"]
        .as_str()
        .unwrap()
        .starts_with("sha256:"));
}
