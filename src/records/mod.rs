//! Transaction record façade
//!
//! - **model**: External JSON shapes and their conversion to typed values
//! - **service**: `RecordService`, the operations exposed over HTTP
//! - **error**: Error types

pub mod error;
pub mod model;
pub mod service;

pub use error::{RecordError, RecordResult};
pub use model::{
    DataQueryExpressionDto, TimestampRangeDto, TransactionRecordDto, TransactionRecordQueryDto,
};
pub use service::RecordService;
