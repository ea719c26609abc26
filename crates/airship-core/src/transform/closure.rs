use std::fmt;

use super::{ReadOutput, ResolvedBodies, Transformer, identity};
use crate::Result;
use crate::model::{Metadata, NativeFile, Timestamp};

pub type ReadFn = Box<dyn Fn(&str, Timestamp, Vec<u8>, &str) -> Result<ReadOutput> + Send + Sync>;
pub type CompareFn = Box<dyn Fn(&str, &[u8], &[u8]) -> Result<bool> + Send + Sync>;
pub type WriteFn = Box<dyn Fn(&str, &[u8], &str, &Metadata) -> Result<NativeFile> + Send + Sync>;
pub type AfterFn = Box<dyn Fn(&ResolvedBodies, &[String], &Metadata) -> Result<()> + Send + Sync>;

/// A transformer assembled from closures.
///
/// Functions left unset on the builder are bound to the identity behaviour
/// when [`FnTransformerBuilder::build`] runs, so calls never branch on
/// presence.
pub struct FnTransformer {
    read: ReadFn,
    compare: CompareFn,
    write: WriteFn,
    after: AfterFn,
}

impl FnTransformer {
    pub fn builder() -> FnTransformerBuilder {
        FnTransformerBuilder::default()
    }
}

impl fmt::Debug for FnTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTransformer").finish_non_exhaustive()
    }
}

impl Transformer for FnTransformer {
    fn read(&self, filename: &str, timestamp: Timestamp, data: Vec<u8>, origin: &str) -> Result<ReadOutput> {
        (self.read)(filename, timestamp, data, origin)
    }

    fn compare(&self, filename: &str, a: &[u8], b: &[u8]) -> Result<bool> {
        (self.compare)(filename, a, b)
    }

    fn write(&self, filename: &str, data: &[u8], destination: &str, metadata: &Metadata) -> Result<NativeFile> {
        (self.write)(filename, data, destination, metadata)
    }

    fn after(&self, resolved: &ResolvedBodies, replicas: &[String], metadata: &Metadata) -> Result<()> {
        (self.after)(resolved, replicas, metadata)
    }
}

/// Builder for [`FnTransformer`].
#[derive(Default)]
pub struct FnTransformerBuilder {
    read: Option<ReadFn>,
    compare: Option<CompareFn>,
    write: Option<WriteFn>,
    after: Option<AfterFn>,
}

impl FnTransformerBuilder {
    pub fn read<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, Timestamp, Vec<u8>, &str) -> Result<ReadOutput> + Send + Sync + 'static,
    {
        self.read = Some(Box::new(f));
        self
    }

    pub fn compare<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[u8], &[u8]) -> Result<bool> + Send + Sync + 'static,
    {
        self.compare = Some(Box::new(f));
        self
    }

    pub fn write<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &[u8], &str, &Metadata) -> Result<NativeFile> + Send + Sync + 'static,
    {
        self.write = Some(Box::new(f));
        self
    }

    pub fn after<F>(mut self, f: F) -> Self
    where
        F: Fn(&ResolvedBodies, &[String], &Metadata) -> Result<()> + Send + Sync + 'static,
    {
        self.after = Some(Box::new(f));
        self
    }

    pub fn build(self) -> FnTransformer {
        FnTransformer {
            read: self.read.unwrap_or_else(|| Box::new(identity::read)),
            compare: self.compare.unwrap_or_else(|| Box::new(identity::compare)),
            write: self.write.unwrap_or_else(|| Box::new(identity::write)),
            after: self.after.unwrap_or_else(|| Box::new(identity::after)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CanonicalEntry;

    #[test]
    fn unset_functions_fall_back_to_identity() {
        // Only read is customised: lower-cases the first letter like a
        // case-insensitive save slot
        let t = FnTransformer::builder()
            .read(|filename, timestamp, data, _origin| {
                let mut chars = filename.chars();
                let renamed = match chars.next() {
                    Some(first) => first.to_lowercase().chain(chars).collect(),
                    None => String::new(),
                };
                Ok(ReadOutput::single(CanonicalEntry::new(renamed, timestamp, data)))
            })
            .build();

        let out = t.read("Profile1.sav", Timestamp::new(7), b"s".to_vec(), "a").unwrap();
        assert_eq!(out.entries[0].filename, "profile1.sav");

        assert!(t.compare("profile1.sav", b"s", b"s").unwrap());
        let native = t.write("profile1.sav", b"s", "b", &Metadata::new()).unwrap();
        assert_eq!(native.filename, "profile1.sav");
        assert!(t.after(&ResolvedBodies::new(), &[], &Metadata::new()).is_ok());
    }
}
