//! Manifest loading and transformer lookup
//!
//! A manifest declares the replicas of a run and the items reconciled across
//! them. It may be written in TOML, JSON or YAML; the format is picked from
//! the file extension.
//!
//! ```toml
//! [options]
//! io_timeout_secs = 10
//!
//! [[replicas]]
//! id = "laptop"
//! kind = "directory"
//! root = "saves/laptop"
//!
//! [[replicas]]
//! id = "desktop"
//! kind = "directory"
//! root = "/mnt/desktop/saves"
//!
//! [[items]]
//! name = "Transistor"
//! pattern = '\.sav$'
//!
//! [items.targets]
//! laptop = "Transistor"
//! desktop = { identifier = "Transistor", folder = "Profiles" }
//! ```

mod manifest;
mod registry;

pub use manifest::{
    ItemSpec, Manifest, OptionsSection, ReplicaBackend, ReplicaSpec, TargetEntry,
    default_manifest_path, MANIFEST_ENV, MANIFEST_FILE,
};
pub use registry::TransformerRegistry;
