//! Upload orchestration: validate, compress, store with retry, hand back URLs.
//!
//! Every upload walks the stages `pending → compressing → uploading →
//! done | failed`, emitted as `tracing` debug events.

mod error;
mod orchestrator;
mod types;

pub use error::UploadError;
pub use orchestrator::UploadOrchestrator;
pub use types::{AssetCategory, UploadFile, UploadPolicy, UploadStage, UploadedAsset};
