pub mod config;
pub mod error;
pub mod scan;
pub mod service;
pub mod table;
pub mod typed;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use scan::{scan_segment, ParallelScanner, SegmentScan, DEFAULT_SEGMENTS};
pub use service::DataService;
pub use table::{TableName, STAGE_ENV};
pub use typed::{ItemSubset, TableField, TableItem, TypedDataService};
