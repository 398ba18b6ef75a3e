//! Append-only persistence for ride request records.
//!
//! Two logs live behind [`RequestRecordStore`]:
//!
//! - the **submission log**: every [`RideRequest`] exactly as it was submitted
//!   (status `pending`), in insertion order, never updated or deleted;
//! - the **status log**: every [`StatusTransition`] applied afterwards.
//!
//! Live status is a fold of the status log over the submission log, see [`load_live`].
//! Backends: [`MemoryRecordStore`] for tests and sessions without durability,
//! [`JsonFileRecordStore`] for a durable JSON file.

mod file;
mod memory;

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::request::{RequestId, RequestStatus, RideRequest};

pub use file::JsonFileRecordStore;
pub use memory::MemoryRecordStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to {action} '{}': {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid request log '{}': {message}", path.display())]
    InvalidFormat { path: PathBuf, message: String },
    #[error("request id {id} is not greater than the last stored id {last}")]
    NonIncreasingId { id: RequestId, last: RequestId },
    #[error("cannot record a transition for unknown request {0}")]
    UnknownRequest(RequestId),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
}

/// A status change applied to a stored request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub at: DateTime<Utc>,
}

/// Persisted sequence of ride requests.
///
/// Writes are synchronous and durable for durable backends. They are not atomic across
/// independent writers: two processes appending at the same time may lose one append.
pub trait RequestRecordStore {
    /// Append a fully formed request. Ids must be strictly increasing.
    fn enqueue(&mut self, record: &RideRequest) -> Result<(), StoreError>;

    /// Every request ever appended, in insertion order, as submitted.
    fn load_all(&self) -> Result<Vec<RideRequest>, StoreError>;

    /// Append a status change for a stored request.
    fn record_transition(&mut self, transition: &StatusTransition) -> Result<(), StoreError>;

    /// Every status change ever recorded, in insertion order.
    fn load_transitions(&self) -> Result<Vec<StatusTransition>, StoreError>;

    fn last_id(&self) -> Result<Option<RequestId>, StoreError> {
        Ok(self.load_all()?.last().map(RideRequest::id))
    }
}

impl<T: RequestRecordStore + ?Sized> RequestRecordStore for Box<T> {
    fn enqueue(&mut self, record: &RideRequest) -> Result<(), StoreError> {
        (**self).enqueue(record)
    }

    fn load_all(&self) -> Result<Vec<RideRequest>, StoreError> {
        (**self).load_all()
    }

    fn record_transition(&mut self, transition: &StatusTransition) -> Result<(), StoreError> {
        (**self).record_transition(transition)
    }

    fn load_transitions(&self) -> Result<Vec<StatusTransition>, StoreError> {
        (**self).load_transitions()
    }

    fn last_id(&self) -> Result<Option<RequestId>, StoreError> {
        (**self).last_id()
    }
}

/// Submission log with the status log applied, in insertion order.
///
/// Transitions that would move a request backwards or out of a terminal state are skipped,
/// so the first terminal transition recorded for a request wins.
pub fn load_live(store: &impl RequestRecordStore) -> Result<Vec<RideRequest>, StoreError> {
    let mut records = store.load_all()?;
    let positions: HashMap<RequestId, usize> = records
        .iter()
        .enumerate()
        .map(|(index, record)| (record.id(), index))
        .collect();

    for transition in store.load_transitions()? {
        let Some(&index) = positions.get(&transition.request_id) else {
            tracing::warn!(
                request_id = transition.request_id,
                "status transition for unknown request ignored"
            );
            continue;
        };
        if let Err(error) = records[index].transition(transition.status) {
            tracing::debug!(%error, "conflicting status transition ignored");
        }
    }
    Ok(records)
}

/// Shared append rule: ids must grow strictly.
pub(crate) fn check_next_id(
    last: Option<RequestId>,
    record: &RideRequest,
) -> Result<(), StoreError> {
    match last {
        Some(last) if record.id() <= last => Err(StoreError::NonIncreasingId {
            id: record.id(),
            last,
        }),
        _ => Ok(()),
    }
}
