//! Shared test utilities for the airship workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`replicas`]: memory replica helpers and the [`ReplicaDir`] directory fixture
//! - [`transformers`]: transformers exercising fan-out, metadata and failure paths

pub mod replicas;
pub mod transformers;

pub use replicas::{ReplicaDir, boxed};
