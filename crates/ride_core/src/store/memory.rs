use super::{check_next_id, RequestRecordStore, StatusTransition, StoreError};
use crate::request::{RequestId, RideRequest};

/// Volatile store: records live as long as the value does.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    records: Vec<RideRequest>,
    transitions: Vec<StatusTransition>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RequestRecordStore for MemoryRecordStore {
    fn enqueue(&mut self, record: &RideRequest) -> Result<(), StoreError> {
        check_next_id(self.records.last().map(RideRequest::id), record)?;
        self.records.push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<RideRequest>, StoreError> {
        Ok(self.records.clone())
    }

    fn record_transition(&mut self, transition: &StatusTransition) -> Result<(), StoreError> {
        if !self
            .records
            .iter()
            .any(|record| record.id() == transition.request_id)
        {
            return Err(StoreError::UnknownRequest(transition.request_id));
        }
        self.transitions.push(*transition);
        Ok(())
    }

    fn load_transitions(&self) -> Result<Vec<StatusTransition>, StoreError> {
        Ok(self.transitions.clone())
    }

    fn last_id(&self) -> Result<Option<RequestId>, StoreError> {
        Ok(self.records.last().map(RideRequest::id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::pricing::compute_fare;
    use crate::request::{DestinationDescriptor, RequestStatus, RideKind};
    use crate::store::load_live;
    use crate::zones::Zone;

    fn record(id: RequestId) -> RideRequest {
        RideRequest::new(
            id,
            RideKind::Pickup,
            None,
            DestinationDescriptor::Zone(Zone::Main),
            None,
            compute_fare(None, Zone::Main).fare,
            Utc.timestamp_millis_opt(id as i64).unwrap(),
        )
    }

    #[test]
    fn appends_in_insertion_order() {
        let mut store = MemoryRecordStore::new();
        store.enqueue(&record(10)).unwrap();
        store.enqueue(&record(11)).unwrap();
        let ids: Vec<_> = store.load_all().unwrap().iter().map(RideRequest::id).collect();
        assert_eq!(ids, vec![10, 11]);
        assert_eq!(store.last_id().unwrap(), Some(11));
    }

    #[test]
    fn rejects_non_increasing_ids() {
        let mut store = MemoryRecordStore::new();
        store.enqueue(&record(10)).unwrap();
        let err = store.enqueue(&record(10)).unwrap_err();
        assert!(matches!(err, StoreError::NonIncreasingId { id: 10, last: 10 }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn live_view_applies_first_terminal_transition() {
        let mut store = MemoryRecordStore::new();
        store.enqueue(&record(1)).unwrap();
        store.enqueue(&record(2)).unwrap();
        let at = Utc.timestamp_millis_opt(5).unwrap();
        for (request_id, status) in [
            (1, RequestStatus::Matched),
            (1, RequestStatus::Cancelled),
            (2, RequestStatus::Cancelled),
        ] {
            store
                .record_transition(&StatusTransition {
                    request_id,
                    status,
                    at,
                })
                .unwrap();
        }

        let live = load_live(&store).unwrap();
        assert_eq!(live[0].status(), RequestStatus::Matched);
        assert_eq!(live[1].status(), RequestStatus::Cancelled);
        // The submission log itself stays as submitted.
        assert!(store
            .load_all()
            .unwrap()
            .iter()
            .all(|record| record.status() == RequestStatus::Pending));
    }

    #[test]
    fn transition_for_unknown_request_is_rejected() {
        let mut store = MemoryRecordStore::new();
        let err = store
            .record_transition(&StatusTransition {
                request_id: 99,
                status: RequestStatus::Matched,
                at: Utc.timestamp_millis_opt(0).unwrap(),
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownRequest(99)));
    }
}
