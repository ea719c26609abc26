//! Command implementations for airship-cli

pub mod sync;
pub mod validate;

use std::path::{Path, PathBuf};

use airship_core::config::default_manifest_path;

use crate::error::{CliError, Result};

pub use sync::run_sync;
pub use validate::run_validate;

/// Human-output settings shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub quiet: bool,
}

impl Output {
    /// Print a line unless `--quiet` was given.
    pub fn line(&self, line: impl std::fmt::Display) {
        if !self.quiet {
            println!("{line}");
        }
    }
}

/// The manifest to use: `explicit` if given, else the default lookup from
/// `cwd`. Relative paths are taken relative to `cwd`.
pub fn resolve_manifest(cwd: &Path, explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_absolute() => Ok(path),
        Some(path) => Ok(cwd.join(path)),
        None => default_manifest_path(cwd).ok_or_else(|| {
            CliError::user(format!(
                "No manifest found. Create {} or pass --manifest.",
                airship_core::config::MANIFEST_FILE
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn explicit_relative_manifest_is_joined_to_cwd() {
        let temp = TempDir::new().unwrap();
        let resolved = resolve_manifest(temp.path(), Some(PathBuf::from("m.yaml"))).unwrap();
        assert_eq!(resolved, temp.path().join("m.yaml"));
    }

    #[test]
    fn explicit_manifest_wins_over_lookup() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("airship.toml"), "").unwrap();
        let explicit = temp.path().join("other.toml");
        assert_eq!(resolve_manifest(temp.path(), Some(explicit.clone())).unwrap(), explicit);
    }
}
