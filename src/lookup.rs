//! Status lookup capability and the in-memory status table.
//!
//! The connection handler only sees the [`StatusLookup`] trait. Any backing
//! store can sit behind it as long as it tolerates concurrent callers.

use crate::status::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

/// Why a lookup produced no status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("identifier not found")]
    NotFound,
    #[error("status store unavailable: {0}")]
    Unavailable(String),
}

/// Resolve an identifier to its current status.
///
/// Called concurrently from every worker, so implementations synchronize
/// internally.
pub trait StatusLookup: Send + Sync + 'static {
    fn lookup(&self, id: &[u8]) -> Result<StatusCode, LookupError>;
}

/// Thread-safe in-memory identifier to status map.
#[derive(Debug, Default)]
pub struct StatusTable {
    entries: RwLock<HashMap<Vec<u8>, StatusCode>>,
}

impl StatusTable {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build a table pre-seeded with `entries`.
    pub fn from_entries<I, K>(entries: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (K, StatusCode)>,
        K: Into<Vec<u8>>,
    {
        let map: HashMap<Vec<u8>, StatusCode> = entries
            .into_iter()
            .map(|(id, status)| (id.into(), status))
            .collect();
        info!(entries = map.len(), "Initializing status table");
        Arc::new(Self {
            entries: RwLock::new(map),
        })
    }

    /// Insert or replace the status of `id`, returning the previous one.
    pub fn set(&self, id: impl Into<Vec<u8>>, status: StatusCode) -> Option<StatusCode> {
        let id = id.into();
        debug!(id = %String::from_utf8_lossy(&id), %status, "Status updated");
        match self.entries.write() {
            Ok(mut entries) => entries.insert(id, status),
            Err(poisoned) => poisoned.into_inner().insert(id, status),
        }
    }

    pub fn remove(&self, id: &[u8]) -> Option<StatusCode> {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(id),
            Err(poisoned) => poisoned.into_inner().remove(id),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StatusLookup for StatusTable {
    fn lookup(&self, id: &[u8]) -> Result<StatusCode, LookupError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| LookupError::Unavailable("status table lock poisoned".to_string()))?;
        entries.get(id).copied().ok_or(LookupError::NotFound)
    }
}
