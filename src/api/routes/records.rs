//! Transaction Record Routes
//!
//! - POST /transactionRecords - Store a record
//! - GET /transactionRecords/:uniqueId - History of one unique id
//! - POST /transactionRecords/search - Search records

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::records::{TransactionRecordDto, TransactionRecordQueryDto};

/// POST /transactionRecords
///
/// Returns the record with its assigned `transactionRecordId`.
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Json(record): Json<TransactionRecordDto>,
) -> ApiResult<Json<TransactionRecordDto>> {
    let created = state.service.create_record(record).await?;
    Ok(Json(created))
}

/// GET /transactionRecords/:uniqueId
///
/// An unknown id yields an empty list.
pub async fn get_by_unique_id(
    State(state): State<Arc<AppState>>,
    Path(unique_id): Path<String>,
) -> ApiResult<Json<Vec<TransactionRecordDto>>> {
    let records = state.service.get_by_unique_id(&unique_id).await?;
    Ok(Json(records))
}

/// POST /transactionRecords/search
pub async fn search_records(
    State(state): State<Arc<AppState>>,
    Json(query): Json<TransactionRecordQueryDto>,
) -> ApiResult<Json<Vec<TransactionRecordDto>>> {
    let records = state.service.search(query).await?;

    tracing::debug!(count = records.len(), "Search returned records");
    Ok(Json(records))
}
