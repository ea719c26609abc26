//! Transformers for exercising the reconciler.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use airship_core::transform::FnTransformer;
use airship_core::{CanonicalEntry, Error, Metadata, NativeFile, ReadOutput, ResolvedBodies};

/// Splits `*.bundle` files into one canonical entry per `key=value` line,
/// all stamped with the bundle's timestamp. Other files pass through.
/// Canonical files are written back as plain files named after their key.
pub fn bundle_splitter() -> FnTransformer {
    FnTransformer::builder()
        .read(|filename, timestamp, data, _origin| {
            if !filename.ends_with(".bundle") {
                return Ok(ReadOutput::single(CanonicalEntry::new(filename, timestamp, data)));
            }
            let text = String::from_utf8(data).map_err(|e| Error::transform(filename, e))?;
            let entries = text
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| -> Result<CanonicalEntry, Error> {
                    let (key, value) = line
                        .split_once('=')
                        .ok_or_else(|| Error::transform(filename, format!("malformed line: {line}")))?;
                    Ok(CanonicalEntry::new(key.trim(), timestamp, value.trim()))
                })
                .collect::<Result<Vec<_>, Error>>()?;
            Ok(ReadOutput::many(entries))
        })
        .build()
}

/// Fails `read` for the given native filenames when read from `origin`;
/// identity otherwise.
pub fn failing_reads_on(origin: &str, names: &[&str]) -> FnTransformer {
    let origin = origin.to_string();
    let names: HashSet<String> = names.iter().map(|n| n.to_string()).collect();
    FnTransformer::builder()
        .read(move |filename, timestamp, data, from| {
            if from == origin && names.contains(filename) {
                return Err(Error::transform(filename, "corrupt file"));
            }
            Ok(ReadOutput::single(CanonicalEntry::new(filename, timestamp, data)))
        })
        .build()
}

/// Fails `write` towards `destination`; identity otherwise.
pub fn failing_writes_to(destination: &str) -> FnTransformer {
    let destination = destination.to_string();
    FnTransformer::builder()
        .write(move |filename, data, to, _metadata| {
            if to == destination {
                return Err(Error::transform(filename, format!("cannot encode for {to}")));
            }
            Ok(NativeFile::new(filename, data))
        })
        .build()
}

/// Treats bodies differing only in ASCII case as equal.
pub fn case_insensitive() -> FnTransformer {
    FnTransformer::builder()
        .compare(|_filename, a, b| Ok(a.eq_ignore_ascii_case(b)))
        .build()
}

/// Fails every comparison.
pub fn failing_compare() -> FnTransformer {
    FnTransformer::builder()
        .compare(|filename, _a, _b| Err(Error::transform(filename, "cannot compare")))
        .build()
}

/// Native files start with a `#header` line. Reading strips it into the
/// `header` metadata key; writing puts the item's header back on top.
pub fn header_transformer() -> FnTransformer {
    FnTransformer::builder()
        .read(|filename, timestamp, data, _origin| {
            let text = String::from_utf8(data).map_err(|e| Error::transform(filename, e))?;
            let (header, body) = text
                .split_once('\n')
                .filter(|(first, _)| first.starts_with('#'))
                .map(|(first, rest)| (first.to_string(), rest.to_string()))
                .unwrap_or_else(|| (String::new(), text.clone()));
            let mut metadata = Metadata::new();
            if !header.is_empty() {
                metadata.insert("header", header);
            }
            Ok(ReadOutput::single(CanonicalEntry::new(filename, timestamp, body)).with_metadata(metadata))
        })
        .write(|filename, data, _destination, metadata| {
            let mut native = Vec::new();
            if let Some(header) = metadata.get("header") {
                native.extend_from_slice(header);
                native.push(b'\n');
            }
            native.extend_from_slice(data);
            Ok(NativeFile::new(filename, native))
        })
        .build()
}

/// One recorded `after` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AfterCall {
    pub resolved: ResolvedBodies,
    pub replicas: Vec<String>,
}

/// Shared log of `after` calls.
#[derive(Debug, Clone, Default)]
pub struct AfterLog {
    calls: Arc<Mutex<Vec<AfterCall>>>,
}

impl AfterLog {
    pub fn calls(&self) -> Vec<AfterCall> {
        self.calls.lock().unwrap().clone()
    }
}

/// Identity transformer recording every `after` call.
pub fn recording_after() -> (FnTransformer, AfterLog) {
    let log = AfterLog::default();
    let calls = Arc::clone(&log.calls);
    let transformer = FnTransformer::builder()
        .after(move |resolved, replicas, _metadata| {
            calls.lock().unwrap().push(AfterCall {
                resolved: resolved.clone(),
                replicas: replicas.to_vec(),
            });
            Ok(())
        })
        .build();
    (transformer, log)
}

/// Identity transformer whose `after` hook always fails.
pub fn failing_after() -> FnTransformer {
    FnTransformer::builder()
        .after(|_resolved, _replicas, _metadata| {
            Err(Error::Manifest {
                message: "post-processing failed".into(),
            })
        })
        .build()
}
