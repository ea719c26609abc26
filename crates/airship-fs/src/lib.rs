//! Filesystem primitives for Airship
//!
//! Provides sandboxed relative-path resolution, atomic I/O, checksums and
//! format-agnostic manifest loading used by the directory replica and the CLI.

pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod path;

pub use config::{ConfigFormat, ConfigStore};
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use path::{resolve_within, to_slash_path, validate_segment};
