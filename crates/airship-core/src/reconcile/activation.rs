//! Replica slots and their activation bookkeeping

use std::future::Future;
use std::time::Duration;

use super::report::ReplicaStatus;
use crate::replica::Replica;
use crate::{Error, Result};

/// Activation state of one replica for the lifetime of a reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Activation {
    Pending,
    Active,
    Failed(String),
}

pub(crate) struct ReplicaSlot {
    pub(crate) replica: Box<dyn Replica>,
    pub(crate) activation: Activation,
}

impl ReplicaSlot {
    pub(crate) fn new(replica: Box<dyn Replica>) -> Self {
        Self {
            replica,
            activation: Activation::Pending,
        }
    }

    pub(crate) fn id(&self) -> &str {
        self.replica.id()
    }

    pub(crate) fn is_active(&self) -> bool {
        self.activation == Activation::Active
    }

    /// Activate once; later calls keep the first result.
    pub(crate) async fn ensure_activated(&mut self, timeout: Duration) -> bool {
        if self.activation != Activation::Pending {
            return self.is_active();
        }

        let id = self.id().to_string();
        match timed(timeout, &id, "activate", self.replica.activate()).await {
            Ok(()) => {
                tracing::info!(replica = %id, "Replica activated");
                self.activation = Activation::Active;
            }
            Err(e) => {
                tracing::warn!(replica = %id, error = %e, "Replica failed to activate; excluding it from this run");
                self.activation = Activation::Failed(e.to_string());
            }
        }
        self.is_active()
    }

    pub(crate) fn status(&self) -> ReplicaStatus {
        ReplicaStatus {
            id: self.id().to_string(),
            active: self.is_active(),
            error: match &self.activation {
                Activation::Failed(reason) => Some(reason.clone()),
                Activation::Pending | Activation::Active => None,
            },
        }
    }
}

/// Bound a replica call by `timeout`, turning expiry into [`Error::Timeout`].
///
/// Expiry drops `call`; work it already handed to a blocking thread keeps
/// running.
pub(crate) async fn timed<T, F>(timeout: Duration, replica: &str, operation: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            replica: replica.to_string(),
            operation: operation.to_string(),
            timeout,
        }),
    }
}
