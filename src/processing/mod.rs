//! Document processing pipeline: extraction, chunking, indexing, and summary orchestration.

pub mod chunking;
pub mod query;
mod service;
pub mod types;
pub mod upload;

pub use service::{PipelineApi, SummaryPipeline};
pub use types::{
    ChunkingError, ErrorKind, IndexingError, PipelineError, RunReport, Stage, StageReport,
    StageStatus, SummarizationError,
};
pub use upload::UploadedDocument;
