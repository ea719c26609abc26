//! Atomic I/O operations for directory-backed replicas

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, UNIX_EPOCH};

use backoff::ExponentialBackoffBuilder;
use fs2::FileExt;

use crate::{Error, Result, path};

/// Suffix carried by in-flight temp files; listings skip them.
pub const TEMP_SUFFIX: &str = ".airship-tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Retry and durability settings for [`write_atomic`].
#[derive(Debug, Clone, Copy)]
pub struct RobustnessConfig {
    /// Give up retrying a contended rename after this long.
    pub max_elapsed: Duration,
    /// First delay between retries; grows exponentially.
    pub initial_interval: Duration,
    /// Flush file contents to disk before the rename.
    pub fsync: bool,
}

impl Default for RobustnessConfig {
    fn default() -> Self {
        Self {
            max_elapsed: Duration::from_secs(2),
            initial_interval: Duration::from_millis(10),
            fsync: true,
        }
    }
}

/// Write `content` to `target` atomically.
///
/// Content goes to a uniquely named, exclusively locked temp file in the same
/// directory which is then renamed over the target. Renames that fail with a
/// transient error (sharing violations, contention) are retried with
/// exponential backoff.
pub fn write_atomic(target: &Path, content: &[u8], robustness: RobustnessConfig) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }

    let temp_path = temp_path_for(target);
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)
        .map_err(|e| Error::io(&temp_path, e))?;

    let written = (|| {
        temp_file
            .try_lock_exclusive()
            .map_err(|_| Error::LockFailed { path: target.to_path_buf() })?;
        temp_file.write_all(content).map_err(|e| Error::io(&temp_path, e))?;
        if robustness.fsync {
            temp_file.sync_all().map_err(|e| Error::io(&temp_path, e))?;
        }
        temp_file
            .unlock()
            .map_err(|_| Error::LockFailed { path: target.to_path_buf() })
    })();
    drop(temp_file);

    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    let policy = ExponentialBackoffBuilder::new()
        .with_initial_interval(robustness.initial_interval)
        .with_max_elapsed_time(Some(robustness.max_elapsed))
        .build();

    let renamed = backoff::retry(policy, || {
        fs::rename(&temp_path, target).map_err(|e| match e.kind() {
            ErrorKind::PermissionDenied | ErrorKind::WouldBlock => {
                tracing::debug!(path = %target.display(), "rename contended, retrying");
                backoff::Error::transient(e)
            }
            _ => backoff::Error::permanent(e),
        })
    });

    renamed.map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        let source = match e {
            backoff::Error::Permanent(err) => err,
            backoff::Error::Transient { err, .. } => err,
        };
        Error::io(target, source)
    })
}

fn temp_path_for(target: &Path) -> PathBuf {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let unique = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    target.with_file_name(format!(
        ".{}.{}.{}{}",
        file_name,
        std::process::id(),
        unique,
        TEMP_SUFFIX
    ))
}

/// Read an entire file.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::io(path, e))
}

/// Modification time of `path` in whole seconds since the Unix epoch.
///
/// Returns `Ok(None)` when the platform cannot report a modification time or
/// reports one before the epoch.
pub fn modified_unix_seconds(path: &Path) -> Result<Option<i64>> {
    let metadata = fs::metadata(path).map_err(|e| Error::io(path, e))?;
    let Ok(modified) = metadata.modified() else {
        return Ok(None);
    };
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_secs()).ok()))
}

/// List every regular file under `root`, recursively, as sorted `/`-separated
/// relative names. In-flight temp files are skipped.
pub fn list_files_recursive(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries = fs::read_dir(&dir).map_err(|e| Error::io(&dir, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&dir, e))?;
            let file_type = entry.file_type().map_err(|e| Error::io(entry.path(), e))?;
            let entry_path = entry.path();
            if file_type.is_dir() {
                pending.push(entry_path);
            } else if file_type.is_file() {
                if entry.file_name().to_string_lossy().ends_with(TEMP_SUFFIX) {
                    continue;
                }
                match path::to_slash_path(root, &entry_path) {
                    Some(name) => names.push(name),
                    None => {
                        tracing::warn!(path = %entry_path.display(), "Skipping file with non-UTF-8 name");
                    }
                }
            }
        }
    }

    names.sort();
    Ok(names)
}

/// Read a UTF-8 text file.
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::io(path, e))
}
