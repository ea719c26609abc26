use super::{ReadOutput, ResolvedBodies, Transformer};
use crate::Result;
use crate::model::{CanonicalEntry, Metadata, NativeFile, Timestamp};

/// Pass-through transformer: native and canonical forms are the same bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransformer;

impl Transformer for IdentityTransformer {}

pub(crate) fn read(
    filename: &str,
    timestamp: Timestamp,
    data: Vec<u8>,
    _origin: &str,
) -> Result<ReadOutput> {
    Ok(ReadOutput::single(CanonicalEntry::new(filename, timestamp, data)))
}

pub(crate) fn compare(_filename: &str, a: &[u8], b: &[u8]) -> Result<bool> {
    Ok(a == b)
}

pub(crate) fn write(
    filename: &str,
    data: &[u8],
    _destination: &str,
    _metadata: &Metadata,
) -> Result<NativeFile> {
    Ok(NativeFile::new(filename, data))
}

pub(crate) fn after(_resolved: &ResolvedBodies, _replicas: &[String], _metadata: &Metadata) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_round_trip() {
        let t = IdentityTransformer;
        let out = t.read("save.dat", Timestamp::new(100), b"X".to_vec(), "a").unwrap();
        assert_eq!(out.entries, vec![CanonicalEntry::new("save.dat", Timestamp::new(100), "X")]);
        assert!(out.metadata.is_empty());

        let native = t.write("save.dat", b"X", "b", &Metadata::new()).unwrap();
        assert_eq!(native, NativeFile::new("save.dat", "X"));
    }

    #[test]
    fn identity_compare_is_byte_equality() {
        let t = IdentityTransformer;
        assert!(t.compare("f", b"abc", b"abc").unwrap());
        assert!(!t.compare("f", b"abc", b"abd").unwrap());
    }
}
