//! Replica fixtures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use airship_core::{DirectoryReplica, MemoryReplica, Replica};
use tempfile::TempDir;

/// Box clones of `replicas` for handing to a reconciler while the caller
/// keeps handles to inspect them afterwards.
pub fn boxed(replicas: &[&MemoryReplica]) -> Vec<Box<dyn Replica>> {
    replicas
        .iter()
        .map(|replica| Box::new((*replica).clone()) as Box<dyn Replica>)
        .collect()
}

/// A temporary directory to root a [`DirectoryReplica`] in.
///
/// # Example
///
/// ```rust,no_run
/// use airship_test_utils::ReplicaDir;
///
/// let dir = ReplicaDir::new();
/// dir.write("game/save.dat", "X", 100);
/// assert_eq!(dir.mtime("game/save.dat"), 100);
/// ```
pub struct ReplicaDir {
    temp_dir: TempDir,
}

impl Default for ReplicaDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    /// A directory replica rooted here.
    pub fn replica(&self, id: &str) -> DirectoryReplica {
        DirectoryReplica::new(id, self.root())
    }

    /// Write `content` to `relative` (creating parents) and set its
    /// modification time to `mtime` seconds since the epoch.
    pub fn write(&self, relative: &str, content: impl AsRef<[u8]>, mtime: i64) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        self.touch(relative, mtime);
    }

    /// Create an empty directory.
    pub fn mkdir(&self, relative: &str) {
        fs::create_dir_all(self.path(relative)).unwrap();
    }

    pub fn touch(&self, relative: &str, mtime: i64) {
        let file = fs::File::options()
            .write(true)
            .open(self.path(relative))
            .unwrap();
        let secs = u64::try_from(mtime).expect("fixture mtimes are non-negative");
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
            .unwrap();
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    /// Modification time in whole seconds since the epoch.
    pub fn mtime(&self, relative: &str) -> i64 {
        let modified = fs::metadata(self.path(relative))
            .unwrap()
            .modified()
            .unwrap();
        let secs = modified.duration_since(UNIX_EPOCH).unwrap().as_secs();
        i64::try_from(secs).unwrap()
    }

    /// Assert a file exists with exactly `expected` content.
    pub fn assert_content(&self, relative: &str, expected: &str) {
        assert!(self.exists(relative), "{relative} does not exist");
        assert_eq!(self.read(relative), expected, "unexpected content in {relative}");
    }
}
