//! Record Service
//!
//! Façade between the HTTP layer and the record store. Converts external
//! shapes into typed values (rejecting bad timestamps and expressions before
//! any store call), delegates, and maps results back to external shapes.

use std::sync::Arc;

use crate::records::error::{RecordError, RecordResult};
use crate::records::model::{TransactionRecordDto, TransactionRecordQueryDto};
use crate::storage::timestamp;
use crate::storage::{RecordStore, TransactionRecordQuery};

/// Transaction record operations
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn RecordStore>,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// Persist one record and return it with its assigned id.
    ///
    /// `eventTimestamp` is normalized to ISO-8601. The insert timestamp is
    /// not read back, so the response omits it.
    pub async fn create_record(
        &self,
        mut record: TransactionRecordDto,
    ) -> RecordResult<TransactionRecordDto> {
        let event_timestamp = timestamp::decode(&record.event_timestamp)
            .map_err(RecordError::timestamp("eventTimestamp"))?;

        let id = self
            .store
            .insert(
                &record.unique_id,
                event_timestamp,
                &record.event_type,
                &record.data,
            )
            .await?;

        tracing::info!(
            transaction_record_id = id,
            unique_id = %record.unique_id,
            event_type = %record.event_type,
            "Transaction record created"
        );

        record.transaction_record_id = Some(id);
        record.insert_timestamp = None;
        record.event_timestamp = timestamp::to_iso8601(&event_timestamp);
        Ok(record)
    }

    /// Full history of one unique id, in insertion order
    pub async fn get_by_unique_id(&self, unique_id: &str) -> RecordResult<Vec<TransactionRecordDto>> {
        let records = self.store.query_by_unique_id(unique_id).await?;
        Ok(records.into_iter().map(TransactionRecordDto::from).collect())
    }

    /// Records matching the search, in insertion order
    pub async fn search(
        &self,
        query: TransactionRecordQueryDto,
    ) -> RecordResult<Vec<TransactionRecordDto>> {
        let query = TransactionRecordQuery::try_from(query).map_err(|e| {
            tracing::warn!(error = %e, "Rejected transaction record search");
            e
        })?;

        let records = self.store.search(&query).await?;
        Ok(records.into_iter().map(TransactionRecordDto::from).collect())
    }

    /// Check that the store is reachable
    pub async fn test_connection(&self) -> RecordResult<()> {
        Ok(self.store.test_connection().await?)
    }
}
