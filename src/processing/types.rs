//! Error kinds and run reports for the processing pipeline.

use crate::{
    config::ConfigError, embedding::EmbeddingClientError, extraction::ExtractionError,
    index::IndexError, summarization::SummarizationClientError,
};
use serde::Serialize;
use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Errors produced while configuring the text chunker.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunks must be allowed at least one character.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every chunk.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    OverlapTooLarge {
        /// Requested overlap in characters.
        overlap: usize,
        /// Requested chunk size in characters.
        chunk_size: usize,
    },
}

/// Failures while turning chunks into a searchable index.
#[derive(Debug, Error)]
pub enum IndexingError {
    /// The embedding provider failed to produce vectors.
    #[error(transparent)]
    Embedding(#[from] EmbeddingClientError),
    /// The vectors could not be assembled into an index.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Failures while retrieving context and generating the summary.
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The retrieval query could not be embedded.
    #[error("failed to embed retrieval query: {0}")]
    QueryEmbedding(EmbeddingClientError),
    /// The index rejected the retrieval query.
    #[error("retrieval failed: {0}")]
    Retrieval(#[from] IndexError),
    /// The chat model failed to produce a summary.
    #[error(transparent)]
    Client(#[from] SummarizationClientError),
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// PDF text extraction.
    Extraction,
    /// Chunking, embedding and index construction.
    Indexing,
    /// Retrieval and summary generation.
    Summarization,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 3] = [Stage::Extraction, Stage::Indexing, Stage::Summarization];
}

/// Coarse classification of a pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// The PDF could not be read or held no text.
    Extraction,
    /// Embedding or index construction failed.
    Indexing,
    /// Retrieval or the chat model failed.
    Summarization,
    /// A required credential or setting was missing.
    Configuration,
    /// Anything the pipeline did not anticipate.
    Unexpected,
}

/// Errors emitted by the document processing pipeline.
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The PDF could not be opened or parsed.
    #[error("Error extracting text from PDF: {0}")]
    Extraction(#[from] ExtractionError),
    /// The PDF parsed but contained no extractable text.
    #[error("No text could be extracted from the PDF.")]
    NoText,
    /// Chunk embedding or index construction failed.
    #[error(
        "Failed to load embedding model. Please check your HuggingFace token and internet connection.\nError: {0}"
    )]
    Indexing(#[from] IndexingError),
    /// Retrieval or summary generation failed.
    #[error("Error generating summary: {0}")]
    Summarization(#[from] SummarizationError),
    /// A stage could not run because configuration was missing.
    #[error("{}", configuration_message(.stage, .source))]
    Configuration {
        /// Stage that needed the missing configuration.
        stage: Stage,
        /// What was missing.
        source: ConfigError,
    },
    /// An unanticipated failure, such as a panic inside a stage.
    #[error("An error occurred: {0}")]
    Unexpected(String),
}

fn configuration_message(stage: &Stage, source: &ConfigError) -> String {
    match stage {
        Stage::Extraction => format!("Error extracting text from PDF: {source}"),
        Stage::Indexing => format!(
            "Failed to load embedding model. Please check your HuggingFace token and internet connection.\nError: {source}"
        ),
        Stage::Summarization => format!("Error generating summary: {source}"),
    }
}

impl PipelineError {
    /// Classify the failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Extraction(_) | Self::NoText => ErrorKind::Extraction,
            Self::Indexing(_) => ErrorKind::Indexing,
            Self::Summarization(_) => ErrorKind::Summarization,
            Self::Configuration { .. } => ErrorKind::Configuration,
            Self::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// Stage the failure belongs to, when known.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Extraction(_) | Self::NoText => Some(Stage::Extraction),
            Self::Indexing(_) => Some(Stage::Indexing),
            Self::Summarization(_) => Some(Stage::Summarization),
            Self::Configuration { stage, .. } => Some(*stage),
            Self::Unexpected(_) => None,
        }
    }

    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    pub(crate) fn from_embedding(stage: Stage, error: EmbeddingClientError) -> Self {
        match error {
            EmbeddingClientError::MissingCredentials(variable) => Self::Configuration {
                stage,
                source: ConfigError::MissingVariable(variable.to_string()),
            },
            other if stage == Stage::Summarization => {
                Self::Summarization(SummarizationError::QueryEmbedding(other))
            }
            other => Self::Indexing(IndexingError::Embedding(other)),
        }
    }

    pub(crate) fn from_summarization(error: SummarizationClientError) -> Self {
        match error {
            SummarizationClientError::MissingCredentials(variable) => Self::Configuration {
                stage: Stage::Summarization,
                source: ConfigError::MissingVariable(variable.to_string()),
            },
            other => Self::Summarization(SummarizationError::Client(other)),
        }
    }
}

/// Outcome of one stage within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    /// The stage completed.
    Succeeded,
    /// The stage ran and failed; the run stopped here.
    Failed,
    /// The stage never ran because an earlier one failed.
    Skipped,
}

/// Status line for one stage.
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    /// Which stage this line describes.
    pub stage: Stage,
    /// How the stage ended.
    pub status: StageStatus,
    /// Message suitable for display.
    pub message: String,
}

/// Observable result of processing one upload.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Identifier correlating this report with log lines.
    pub run_id: String,
    /// Name of the uploaded file.
    pub filename: String,
    /// One entry per stage, in execution order.
    pub stages: Vec<StageReport>,
    /// Characters extracted from the PDF, when extraction succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_chars: Option<usize>,
    /// Chunks indexed, when indexing succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,
    /// The generated summary, when the run succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Classification of the failure that stopped the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    /// RFC 3339 completion time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl RunReport {
    /// Start an empty report for an upload.
    pub fn new(run_id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            filename: filename.into(),
            stages: Vec::with_capacity(Stage::ALL.len()),
            extracted_chars: None,
            chunk_count: None,
            summary: None,
            error_kind: None,
            completed_at: None,
        }
    }

    /// Record a completed stage.
    pub fn succeed(&mut self, stage: Stage, message: impl Into<String>) {
        self.stages.push(StageReport {
            stage,
            status: StageStatus::Succeeded,
            message: message.into(),
        });
    }

    /// Record the failure that stopped the run and mark every later stage as skipped.
    pub fn fail(&mut self, error: &PipelineError) {
        let failed_stage = error
            .stage()
            .or_else(|| self.next_pending_stage())
            .unwrap_or(Stage::Summarization);
        self.stages.retain(|report| report.stage != failed_stage);
        self.stages.push(StageReport {
            stage: failed_stage,
            status: StageStatus::Failed,
            message: error.user_message(),
        });
        self.error_kind = Some(error.kind());
        while let Some(stage) = self.next_pending_stage() {
            self.stages.push(StageReport {
                stage,
                status: StageStatus::Skipped,
                message: "Skipped because an earlier stage failed.".to_string(),
            });
        }
    }

    /// Stamp the completion time.
    pub fn finish(&mut self) {
        self.completed_at = OffsetDateTime::now_utc().format(&Rfc3339).ok();
    }

    /// Whether the run produced a summary.
    pub fn succeeded(&self) -> bool {
        self.summary.is_some()
    }

    /// Status line for `stage`, if recorded.
    pub fn stage(&self, stage: Stage) -> Option<&StageReport> {
        self.stages.iter().find(|report| report.stage == stage)
    }

    fn next_pending_stage(&self) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| self.stage(*stage).is_none())
    }
}
