//! Declarative sync items
//!
//! A [`SyncItem`] groups the native files that make up one logical item (a
//! game's saves, an app's profile), names the replicas that must hold them,
//! and carries the transformer that maps between their encodings.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::transform::{IdentityTransformer, Transformer};
use crate::{Error, Result};

/// Where an item lives on one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaTarget {
    /// Backend-specific identifier of the item (app id, container name,
    /// directory name).
    pub identifier: String,
    /// Folder within the item, if any.
    pub folder: Option<String>,
}

impl ReplicaTarget {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            folder: None,
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }
}

#[derive(Debug, Clone)]
struct TargetSpec {
    identifier: String,
    folder: Option<String>,
}

/// One logical group of native files reconciled together.
#[derive(Clone)]
pub struct SyncItem {
    name: String,
    pattern: Regex,
    folder: Option<String>,
    targets: BTreeMap<String, TargetSpec>,
    transformer: Arc<dyn Transformer>,
}

impl SyncItem {
    /// Start declaring an item matching native filenames against `pattern`.
    pub fn builder(name: impl Into<String>, pattern: impl Into<String>) -> SyncItemBuilder {
        SyncItemBuilder {
            name: name.into(),
            pattern: pattern.into(),
            folder: None,
            targets: BTreeMap::new(),
            transformer: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Whether a native filename belongs to this item.
    ///
    /// The pattern is searched anywhere in the name, not anchored: use `^`
    /// and `$` to pin it to the whole name.
    pub fn matches(&self, filename: &str) -> bool {
        self.pattern.is_match(filename)
    }

    /// Whether the item needs `replica_id` to take part.
    pub fn requires(&self, replica_id: &str) -> bool {
        self.targets.contains_key(replica_id)
    }

    /// Ids of the replicas this item needs.
    pub fn required_replicas(&self) -> impl Iterator<Item = &str> {
        self.targets.keys().map(String::as_str)
    }

    /// Resolved target for `replica_id`: the per-replica folder if one was
    /// declared, otherwise the item-wide folder.
    pub fn target_for(&self, replica_id: &str) -> Option<ReplicaTarget> {
        self.targets.get(replica_id).map(|spec| ReplicaTarget {
            identifier: spec.identifier.clone(),
            folder: spec.folder.clone().or_else(|| self.folder.clone()),
        })
    }

    pub fn transformer(&self) -> &dyn Transformer {
        self.transformer.as_ref()
    }
}

impl fmt::Debug for SyncItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncItem")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("folder", &self.folder)
            .field("targets", &self.targets)
            .finish_non_exhaustive()
    }
}

/// Builder for [`SyncItem`].
pub struct SyncItemBuilder {
    name: String,
    pattern: String,
    folder: Option<String>,
    targets: BTreeMap<String, TargetSpec>,
    transformer: Option<Arc<dyn Transformer>>,
}

impl SyncItemBuilder {
    /// Item-wide default folder, used on replicas without their own override.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Require `replica_id`, where the item is known as `identifier`.
    pub fn target(mut self, replica_id: impl Into<String>, identifier: impl Into<String>) -> Self {
        self.targets.insert(
            replica_id.into(),
            TargetSpec {
                identifier: identifier.into(),
                folder: None,
            },
        );
        self
    }

    /// Require `replica_id` with a replica-specific folder.
    pub fn target_in(
        mut self,
        replica_id: impl Into<String>,
        identifier: impl Into<String>,
        folder: impl Into<String>,
    ) -> Self {
        self.targets.insert(
            replica_id.into(),
            TargetSpec {
                identifier: identifier.into(),
                folder: Some(folder.into()),
            },
        );
        self
    }

    pub fn transformer(mut self, transformer: impl Transformer + 'static) -> Self {
        self.transformer = Some(Arc::new(transformer));
        self
    }

    pub fn shared_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Compile the pattern and freeze the declaration. Items without a
    /// transformer use [`IdentityTransformer`].
    pub fn build(self) -> Result<SyncItem> {
        let pattern = Regex::new(&self.pattern).map_err(|source| Error::InvalidPattern {
            item: self.name.clone(),
            source,
        })?;

        Ok(SyncItem {
            name: self.name,
            pattern,
            folder: self.folder,
            targets: self.targets,
            transformer: self
                .transformer
                .unwrap_or_else(|| Arc::new(IdentityTransformer)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transistor() -> SyncItem {
        SyncItem::builder("Transistor", r"^[Pp]rofile[1-5]\.sav$")
            .folder("remote")
            .target("steam", "237930")
            .target_in("cloud", "GPYC69L4CR~transistor", "Documents")
            .build()
            .unwrap()
    }

    #[test]
    fn target_folder_falls_back_to_item_default() {
        let item = transistor();
        assert_eq!(
            item.target_for("steam"),
            Some(ReplicaTarget::new("237930").with_folder("remote"))
        );
        assert_eq!(
            item.target_for("cloud"),
            Some(ReplicaTarget::new("GPYC69L4CR~transistor").with_folder("Documents"))
        );
        assert_eq!(item.target_for("other"), None);
    }

    #[test]
    fn required_replicas_are_the_targeted_ones() {
        let item = transistor();
        assert!(item.requires("steam"));
        assert!(!item.requires("other"));
        assert_eq!(item.required_replicas().collect::<Vec<_>>(), vec!["cloud", "steam"]);
    }

    #[test]
    fn pattern_matching() {
        let item = transistor();
        assert!(item.matches("Profile1.sav"));
        assert!(item.matches("profile5.sav"));
        assert!(!item.matches("Profile6.sav"));
        assert!(!item.matches("Profile1.sav.bak"));
    }

    #[test]
    fn unanchored_pattern_matches_anywhere() {
        let item = SyncItem::builder("CrossCode", r"save_[012]$")
            .target("steam", "368340")
            .build()
            .unwrap();
        assert!(item.matches("save_0"));
        assert!(item.matches("CQ_save_0"));
        assert!(!item.matches("save_0.bak"));

        let anchored = SyncItem::builder("CrossCode", r"^save_[012]$")
            .target("steam", "368340")
            .build()
            .unwrap();
        assert!(!anchored.matches("CQ_save_0"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = SyncItem::builder("Broken", "([unclosed").build().unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { ref item, .. } if item == "Broken"));
    }
}
