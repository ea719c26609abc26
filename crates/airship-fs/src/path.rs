//! Relative path handling for replica-side filenames
//!
//! Replica filenames are always `/`-separated and relative to the replica's
//! current target directory. Names come from transformers and remote listings,
//! so they are resolved lexically and never allowed to leave their root.

use std::path::{Component, Path, PathBuf};

use crate::{Error, Result};

/// Resolve a `/`-separated relative name against `root`.
///
/// Backslashes are treated as separators, `.` segments are dropped and `..`
/// pops a previous segment. A name that is absolute, empty, or climbs above
/// `root` is rejected with [`Error::PathEscape`].
pub fn resolve_within(root: &Path, relative: &str) -> Result<PathBuf> {
    let normalized = relative.replace('\\', "/");
    if normalized.starts_with('/') || has_drive_prefix(&normalized) {
        return Err(Error::PathEscape { path: relative.to_string() });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(Error::PathEscape { path: relative.to_string() });
                }
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err(Error::PathEscape { path: relative.to_string() });
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(segments);
    Ok(resolved)
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Render `path` relative to `root` with `/` separators.
///
/// Returns `None` when `path` is not under `root` or contains non-UTF-8
/// components.
pub fn to_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            _ => return None,
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

/// Validate a single path segment such as a replica target identifier.
///
/// Segments must be non-empty, must not be `.` or `..`, and must not contain
/// separators or NUL bytes.
pub fn validate_segment(segment: &str) -> Result<()> {
    let invalid = segment.is_empty()
        || segment == "."
        || segment == ".."
        || segment.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidSegment { segment: segment.to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_plain_name() {
        let root = Path::new("/data/replica");
        let resolved = resolve_within(root, "0/resume.png").unwrap();
        assert_eq!(resolved, Path::new("/data/replica/0/resume.png"));
    }

    #[test]
    fn resolve_rejects_escape() {
        let root = Path::new("/data/replica");
        assert!(matches!(
            resolve_within(root, "../secrets"),
            Err(Error::PathEscape { .. })
        ));
        assert!(resolve_within(root, "/etc/passwd").is_err());
        assert!(resolve_within(root, "C:/Windows").is_err());
    }

    #[test]
    fn slash_path_round_trip() {
        let root = Path::new("/data");
        let path = root.join("saves").join("Profile1.sav");
        assert_eq!(to_slash_path(root, &path).as_deref(), Some("saves/Profile1.sav"));
        assert_eq!(to_slash_path(root, root), None);
    }
}
