//! Reconciliation between directory-backed replicas

use airship_core::{DirectoryReplica, FileOutcome, Reconciler, Replica, SyncItem};
use airship_test_utils::ReplicaDir;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn replicas(dirs: &[(&str, &ReplicaDir)]) -> Vec<Box<dyn Replica>> {
    dirs.iter()
        .map(|(id, dir)| Box::new(dir.replica(id)) as Box<dyn Replica>)
        .collect()
}

fn saves_item() -> SyncItem {
    SyncItem::builder("game", r"\.dat$")
        .target("laptop", "game")
        .target("desktop", "game")
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_directories_converge() {
    let laptop = ReplicaDir::new();
    let desktop = ReplicaDir::new();
    laptop.write("game/save.dat", "new", 200);
    desktop.write("game/save.dat", "old", 100);
    desktop.write("game/sub/extra.dat", "extra", 150);

    let mut reconciler =
        Reconciler::new(replicas(&[("laptop", &laptop), ("desktop", &desktop)])).unwrap();
    let report = reconciler.run(&[saves_item()]).await;

    let game = report.item("game").unwrap();
    assert_eq!(game.file("save.dat").unwrap().written, vec!["desktop"]);
    assert_eq!(game.file("sub/extra.dat").unwrap().written, vec!["laptop"]);

    desktop.assert_content("game/save.dat", "new");
    laptop.assert_content("game/sub/extra.dat", "extra");
    laptop.assert_content("game/save.dat", "new");
}

#[tokio::test]
async fn test_second_pass_writes_nothing() {
    let laptop = ReplicaDir::new();
    let desktop = ReplicaDir::new();
    laptop.write("game/save.dat", "new", 200);
    desktop.write("game/save.dat", "old", 100);
    desktop.write("game/other.dat", "other", 150);

    let mut reconciler =
        Reconciler::new(replicas(&[("laptop", &laptop), ("desktop", &desktop)])).unwrap();
    let first = reconciler.run(&[saves_item()]).await;
    assert_eq!(first.write_count(), 2);

    let second = reconciler.run(&[saves_item()]).await;
    assert_eq!(second.write_count(), 0);
    for file in &second.item("game").unwrap().files {
        assert_eq!(file.outcome, FileOutcome::InSync, "{} was not in sync", file.filename);
    }
}

#[tokio::test]
async fn test_missing_target_directory_is_not_ready() {
    let laptop = ReplicaDir::new();
    let desktop = ReplicaDir::new();
    laptop.write("game/save.dat", "new", 200);
    desktop.mkdir("elsewhere");

    let mut reconciler =
        Reconciler::new(replicas(&[("laptop", &laptop), ("desktop", &desktop)])).unwrap();
    let report = reconciler.run(&[saves_item()]).await;

    assert!(!report.item("game").unwrap().is_reconciled());
    assert!(!desktop.exists("game/save.dat"));
}

#[tokio::test]
async fn test_missing_root_fails_activation() {
    let laptop = ReplicaDir::new();
    laptop.write("game/save.dat", "new", 200);
    let gone = DirectoryReplica::new("desktop", laptop.path("does-not-exist"));

    let boxed: Vec<Box<dyn Replica>> = vec![Box::new(laptop.replica("laptop")), Box::new(gone)];
    let mut reconciler = Reconciler::new(boxed).unwrap();
    let report = reconciler.run(&[saves_item()]).await;

    assert!(report.items.is_empty());
    assert!(!report.replicas[1].active);
}

#[rstest]
#[case::newer_on_laptop(300, 100, "laptop-copy")]
#[case::newer_on_desktop(100, 300, "desktop-copy")]
#[tokio::test]
async fn test_newest_copy_wins(#[case] laptop_mtime: i64, #[case] desktop_mtime: i64, #[case] expected: &str) {
    let laptop = ReplicaDir::new();
    let desktop = ReplicaDir::new();
    laptop.write("game/save.dat", "laptop-copy", laptop_mtime);
    desktop.write("game/save.dat", "desktop-copy", desktop_mtime);

    let mut reconciler =
        Reconciler::new(replicas(&[("laptop", &laptop), ("desktop", &desktop)])).unwrap();
    reconciler.run(&[saves_item()]).await;

    laptop.assert_content("game/save.dat", expected);
    desktop.assert_content("game/save.dat", expected);
}

#[tokio::test]
async fn test_in_flight_temp_files_are_ignored() {
    let laptop = ReplicaDir::new();
    let desktop = ReplicaDir::new();
    laptop.write("game/save.dat", "new", 200);
    laptop.write("game/.save.dat.1.1.airship-tmp", "partial", 300);
    desktop.write("game/save.dat", "old", 100);

    let mut reconciler =
        Reconciler::new(replicas(&[("laptop", &laptop), ("desktop", &desktop)])).unwrap();
    let everything = SyncItem::builder("game", ".*")
        .target("laptop", "game")
        .target("desktop", "game")
        .build()
        .unwrap();
    let report = reconciler.run(&[everything]).await;

    assert_eq!(report.item("game").unwrap().files.len(), 1);
    assert!(!desktop.exists("game/.save.dat.1.1.airship-tmp"));
}
