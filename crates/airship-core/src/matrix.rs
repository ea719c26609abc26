//! Cross-replica version matrix
//!
//! For one item, maps each canonical filename to one slot per participating
//! replica. A slot is either empty (the replica does not hold the file) or a
//! [`Version`], so a body exists exactly when a timestamp does.

use std::collections::BTreeMap;

use crate::model::{CanonicalEntry, Timestamp};

/// One replica's copy of a canonical file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub timestamp: Timestamp,
    pub data: Vec<u8>,
}

impl Version {
    pub fn new(timestamp: impl Into<Timestamp>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            timestamp: timestamp.into(),
            data: data.into(),
        }
    }
}

/// Per-replica versions of a single canonical file, in participation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileVersions {
    slots: Vec<Option<Version>>,
}

impl FileVersions {
    /// All slots empty.
    pub fn empty(width: usize) -> Self {
        Self {
            slots: vec![None; width],
        }
    }

    pub fn from_slots(slots: Vec<Option<Version>>) -> Self {
        Self { slots }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Option<Version>] {
        &self.slots
    }

    pub fn get(&self, slot: usize) -> Option<&Version> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Timestamps per slot, `None` where the replica lacks the file.
    pub fn timestamps(&self) -> Vec<Option<Timestamp>> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().map(|v| v.timestamp))
            .collect()
    }

    /// Place `version` in `slot`, returning the version it replaced.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not less than [`width`](Self::width).
    pub fn set(&mut self, slot: usize, version: Version) -> Option<Version> {
        self.slots[slot].replace(version)
    }

    /// Re-stamp an existing version. Empty slots stay empty.
    pub(crate) fn set_timestamp(&mut self, slot: usize, timestamp: Timestamp) {
        if let Some(version) = self.slots.get_mut(slot).and_then(Option::as_mut) {
            version.timestamp = timestamp;
        }
    }
}

/// Canonical filename to per-replica versions for one item pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMatrix {
    participants: Vec<String>,
    files: BTreeMap<String, FileVersions>,
}

impl VersionMatrix {
    /// Empty matrix over `participants`, in participation order.
    pub fn new(participants: Vec<String>) -> Self {
        Self {
            participants,
            files: BTreeMap::new(),
        }
    }

    pub fn participants(&self) -> &[String] {
        &self.participants
    }

    /// Record a canonical entry read from the replica at `slot`.
    ///
    /// Returns the version previously recorded for the same filename and
    /// replica, which happens when two native files map to one canonical name.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a participant index.
    pub fn insert(&mut self, slot: usize, entry: CanonicalEntry) -> Option<Version> {
        let width = self.participants.len();
        self.files
            .entry(entry.filename)
            .or_insert_with(|| FileVersions::empty(width))
            .set(slot, Version::new(entry.timestamp, entry.data))
    }

    pub fn get(&self, filename: &str) -> Option<&FileVersions> {
        self.files.get(filename)
    }

    pub fn files(&self) -> impl Iterator<Item = (&str, &FileVersions)> {
        self.files.iter().map(|(name, versions)| (name.as_str(), versions))
    }

    pub fn into_files(self) -> BTreeMap<String, FileVersions> {
        self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_fills_one_slot_per_replica() {
        let mut matrix = VersionMatrix::new(vec!["a".into(), "b".into()]);
        matrix.insert(0, CanonicalEntry::new("save.dat", Timestamp::new(100), "X"));
        matrix.insert(1, CanonicalEntry::new("other.dat", Timestamp::new(7), "O"));

        let save = matrix.get("save.dat").unwrap();
        assert_eq!(save.timestamps(), vec![Some(Timestamp::new(100)), None]);
        assert_eq!(save.get(1), None);
        assert_eq!(matrix.len(), 2);
    }

    #[test]
    fn duplicate_canonical_name_replaces_and_reports() {
        let mut matrix = VersionMatrix::new(vec!["a".into()]);
        assert!(matrix.insert(0, CanonicalEntry::new("f", Timestamp::new(1), "old")).is_none());
        let replaced = matrix.insert(0, CanonicalEntry::new("f", Timestamp::new(2), "new"));
        assert_eq!(replaced, Some(Version::new(1, "old")));
        assert_eq!(matrix.get("f").unwrap().get(0), Some(&Version::new(2, "new")));
    }
}
