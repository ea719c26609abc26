//! Replica backed by a local directory
//!
//! Targets resolve to `root/identifier[/folder]`. Listing is recursive and
//! reports `/`-separated names relative to the target directory.

use std::path::{Path, PathBuf};

use airship_fs::io::{self, RobustnessConfig};
use airship_fs::{resolve_within, validate_segment};
use async_trait::async_trait;

use super::Replica;
use crate::item::ReplicaTarget;
use crate::model::Timestamp;
use crate::{Error, Result};

/// A replica rooted at a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryReplica {
    id: String,
    root: PathBuf,
    target: Option<ReplicaTarget>,
    robustness: RobustnessConfig,
}

impl DirectoryReplica {
    pub fn new(id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            root: root.into(),
            target: None,
            robustness: RobustnessConfig::default(),
        }
    }

    pub fn with_robustness(mut self, robustness: RobustnessConfig) -> Self {
        self.robustness = robustness;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the current target resolves to.
    pub fn target_dir(&self) -> Result<PathBuf> {
        let target = self
            .target
            .as_ref()
            .ok_or_else(|| Error::replica(&self.id, "resolve target", "no target configured"))?;
        validate_segment(&target.identifier)?;
        let item_dir = self.root.join(&target.identifier);
        match &target.folder {
            Some(folder) => Ok(resolve_within(&item_dir, folder)?),
            None => Ok(item_dir),
        }
    }

    fn file_path(&self, filename: &str) -> Result<PathBuf> {
        Ok(resolve_within(&self.target_dir()?, filename)?)
    }

    async fn blocking<T, F>(&self, operation: &str, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> airship_fs::Result<T> + Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(result) => result.map_err(|e| Error::replica(&self.id, operation, e)),
            Err(join) => Err(Error::replica(&self.id, operation, join)),
        }
    }
}

#[async_trait]
impl Replica for DirectoryReplica {
    fn id(&self) -> &str {
        &self.id
    }

    async fn activate(&mut self) -> Result<()> {
        let canonical = dunce::canonicalize(&self.root)
            .map_err(|e| Error::activation(&self.id, format!("{}: {e}", self.root.display())))?;
        if !canonical.is_dir() {
            return Err(Error::activation(
                &self.id,
                format!("{} is not a directory", canonical.display()),
            ));
        }
        tracing::debug!(replica = %self.id, root = %canonical.display(), "Directory replica activated");
        self.root = canonical;
        Ok(())
    }

    fn configure_target(&mut self, target: &ReplicaTarget) {
        self.target = Some(target.clone());
    }

    async fn confirm_ready(&self) -> Result<()> {
        let dir = self
            .target_dir()
            .map_err(|e| Error::readiness(&self.id, e))?;
        if dir.is_dir() {
            Ok(())
        } else {
            Err(Error::readiness(&self.id, format!("{} does not exist", dir.display())))
        }
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let dir = self.target_dir()?;
        self.blocking("list files", move || io::list_files_recursive(&dir))
            .await
    }

    async fn stat_timestamp(&self, filename: &str) -> Result<Timestamp> {
        let path = self.file_path(filename)?;
        let seconds = self
            .blocking("stat", move || io::modified_unix_seconds(&path))
            .await?;
        Ok(seconds.map_or(Timestamp::INVALID, Timestamp::new))
    }

    async fn fetch(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.file_path(filename)?;
        self.blocking("fetch", move || io::read_bytes(&path)).await
    }

    /// Runs on the blocking pool; a timed-out store is not cancelled.
    async fn store(&self, filename: &str, data: &[u8]) -> Result<()> {
        let path = self.file_path(filename)?;
        let data = data.to_vec();
        let robustness = self.robustness;
        self.blocking("store", move || io::write_atomic(&path, &data, robustness))
            .await
    }

    async fn release(&mut self) -> Result<()> {
        self.target = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn target_dir_joins_identifier_and_folder() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("237930").join("Documents")).unwrap();

        let mut replica = DirectoryReplica::new("laptop", temp.path());
        replica.activate().await.unwrap();
        replica.configure_target(&ReplicaTarget::new("237930").with_folder("Documents"));

        assert!(replica.confirm_ready().await.is_ok());
        assert!(replica.target_dir().unwrap().ends_with("237930/Documents"));
    }

    #[tokio::test]
    async fn escaping_names_are_rejected() {
        let temp = tempfile::TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("game")).unwrap();

        let mut replica = DirectoryReplica::new("laptop", temp.path());
        replica.activate().await.unwrap();
        replica.configure_target(&ReplicaTarget::new("game"));

        assert!(replica.store("../outside.dat", b"X").await.is_err());
        assert!(!temp.path().join("outside.dat").exists());
    }

    #[tokio::test]
    async fn missing_root_fails_activation() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut replica = DirectoryReplica::new("laptop", temp.path().join("missing"));
        assert!(matches!(replica.activate().await, Err(Error::Activation { .. })));
    }

    #[tokio::test]
    async fn invalid_identifier_is_not_ready() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut replica = DirectoryReplica::new("laptop", temp.path());
        replica.activate().await.unwrap();
        replica.configure_target(&ReplicaTarget::new(".."));
        assert!(matches!(replica.confirm_ready().await, Err(Error::Readiness { .. })));
    }
}
