//! Per-file merge algorithm
//!
//! Resolution runs in two phases over one file's [`FileVersions`]:
//!
//! 1. **Coalescing**: walking timestamps upwards, every version re-stamps the
//!    older versions holding the same content with its own timestamp. Clock
//!    skew and idempotent re-saves therefore stop looking like distinct
//!    versions.
//! 2. **Winner selection**: the highest (coalesced) timestamp wins, first in
//!    participation order on ties. Every slot strictly older than the
//!    winner, including empty ones, is stale.
//!
//! A file with an invalid timestamp on any replica is never resolved.

use crate::Result;
use crate::matrix::FileVersions;
use crate::model::Timestamp;

/// Outcome of resolving one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The replica at this slot reported the invalid sentinel; nothing may be
    /// written for this file.
    InvalidTimestamp { slot: usize },
    /// No replica holds the file.
    Empty,
    Resolved(MergePlan),
}

/// What to propagate for one resolved file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub winner: usize,
    pub timestamp: Timestamp,
    /// Slots to overwrite with the winner's body, in participation order.
    pub stale: Vec<usize>,
    /// Number of slots re-stamped during coalescing.
    pub coalesced: usize,
}

/// First slot holding the invalid sentinel, if any.
pub fn invalid_slot(versions: &FileVersions) -> Option<usize> {
    versions
        .slots()
        .iter()
        .position(|slot| slot.as_ref().is_some_and(|v| !v.timestamp.is_valid()))
}

/// Coalesce content-equal versions onto the newest timestamp of their group.
///
/// Timestamps are walked upwards one level at a time. Every version at the
/// current level is a reference and is compared against every older version;
/// matching older versions are re-stamped to the level. A group therefore
/// ends up on the timestamp of its newest member, and no two versions with
/// different content are ever brought onto a shared timestamp.
///
/// `same` is the semantic equality check, called as `same(reference, other)`.
/// Returns the number of re-stamped slots. An error from `same` aborts the
/// pass and leaves already re-stamped slots in place.
pub fn coalesce<F>(versions: &mut FileVersions, mut same: F) -> Result<usize>
where
    F: FnMut(&[u8], &[u8]) -> Result<bool>,
{
    let mut floor: Option<Timestamp> = None;
    let mut adjusted = 0;

    loop {
        let level = versions
            .slots()
            .iter()
            .flatten()
            .map(|v| v.timestamp)
            .filter(|&ts| ts.is_valid() && floor.is_none_or(|f| ts > f))
            .min();

        let Some(level) = level else {
            break;
        };

        let mut raised: Vec<usize> = Vec::new();
        for reference in versions.slots().iter().flatten().filter(|v| v.timestamp == level) {
            for (slot, candidate) in versions.slots().iter().enumerate() {
                let Some(candidate) = candidate else { continue };
                if !candidate.timestamp.is_valid() || candidate.timestamp >= level || raised.contains(&slot) {
                    continue;
                }
                if same(&reference.data, &candidate.data)? {
                    raised.push(slot);
                }
            }
        }

        for slot in raised {
            versions.set_timestamp(slot, level);
            adjusted += 1;
        }
        floor = Some(level);
    }

    Ok(adjusted)
}

/// Slot with the highest timestamp, first in participation order on ties.
pub fn select_winner(versions: &FileVersions) -> Option<usize> {
    let mut best: Option<(usize, Timestamp)> = None;
    for (slot, version) in versions.slots().iter().enumerate() {
        let Some(version) = version else { continue };
        if best.is_none_or(|(_, ts)| version.timestamp > ts) {
            best = Some((slot, version.timestamp));
        }
    }
    best.map(|(slot, _)| slot)
}

/// Slots older than `timestamp`, treating empty slots as older than any
/// version, excluding `winner`.
pub fn stale_slots(versions: &FileVersions, winner: usize, timestamp: Timestamp) -> Vec<usize> {
    versions
        .slots()
        .iter()
        .enumerate()
        .filter(|&(slot, version)| {
            slot != winner && version.as_ref().is_none_or(|v| v.timestamp < timestamp)
        })
        .map(|(slot, _)| slot)
        .collect()
}

/// Run the guard, coalescing and winner selection for one file.
pub fn resolve<F>(versions: &mut FileVersions, same: F) -> Result<Resolution>
where
    F: FnMut(&[u8], &[u8]) -> Result<bool>,
{
    if let Some(slot) = invalid_slot(versions) {
        return Ok(Resolution::InvalidTimestamp { slot });
    }

    let coalesced = coalesce(versions, same)?;

    let Some(winner) = select_winner(versions) else {
        return Ok(Resolution::Empty);
    };
    let timestamp = versions
        .get(winner)
        .map(|v| v.timestamp)
        .unwrap_or(Timestamp::INVALID);

    Ok(Resolution::Resolved(MergePlan {
        winner,
        timestamp,
        stale: stale_slots(versions, winner, timestamp),
        coalesced,
    }))
}
