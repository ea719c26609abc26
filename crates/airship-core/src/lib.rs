//! Airship core: multi-replica file reconciliation
//!
//! Keeps groups of files identical across several storage backends
//! ("replicas"). For each declared [`SyncItem`] the [`Reconciler`] reads every
//! replica's native files, maps them to canonical form with the item's
//! [`Transformer`], picks the newest version of each file and writes it back
//! to every replica holding an older version or none.
//!
//! # Example
//!
//! ```
//! use airship_core::{MemoryReplica, Replica, Reconciler, SyncItem};
//!
//! # tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(async {
//! let a = MemoryReplica::builder("a").file("game", "save.dat", 100, "X").build();
//! let b = MemoryReplica::builder("b").file("game", "save.dat", 50, "Y").build();
//!
//! let item = SyncItem::builder("game", r"\.dat$")
//!     .target("a", "game")
//!     .target("b", "game")
//!     .build()
//!     .unwrap();
//!
//! let replicas: Vec<Box<dyn Replica>> = vec![Box::new(a.clone()), Box::new(b.clone())];
//! let mut reconciler = Reconciler::new(replicas).unwrap();
//! let report = reconciler.run(&[item]).await;
//!
//! assert_eq!(report.write_count(), 1);
//! assert_eq!(b.file("game/save.dat").unwrap().data, b"X");
//! # });
//! ```

pub mod config;
pub mod error;
pub mod item;
pub mod matrix;
pub mod merge;
pub mod model;
pub mod reconcile;
pub mod replica;
pub mod transform;

pub use config::{Manifest, TransformerRegistry};
pub use error::{Error, Result};
pub use item::{ReplicaTarget, SyncItem, SyncItemBuilder};
pub use matrix::{FileVersions, Version, VersionMatrix};
pub use merge::{MergePlan, Resolution};
pub use model::{CanonicalEntry, Metadata, NativeFile, Timestamp};
pub use reconcile::{
    FileOutcome, FileReport, ItemReport, ItemStatus, ReadFailure, ReconcileOptions, Reconciler,
    ReplicaStatus, RunOutcome, RunReport, WriteFailure,
};
pub use replica::{DirectoryReplica, MemoryReplica, Replica};
pub use transform::{FnTransformer, IdentityTransformer, ReadOutput, ResolvedBodies, Transformer};
