//! Pipeline coordinating extraction, indexing, retrieval, and summary generation.

use crate::{
    config::{Config, ConfigError},
    embedding::{EmbeddingClient, EmbeddingClientError, HuggingFaceEmbeddingClient},
    extraction::{ExtractedText, ExtractionError, PdfTextExtractor, TextExtractor},
    index::{DEFAULT_TOP_K, VectorIndex},
    metrics::{MetricsSnapshot, RunMetrics},
    processing::{
        chunking::TextChunker,
        query::{QueryStrategy, WholeDocumentQuery},
        types::{IndexingError, PipelineError, RunReport, Stage, StageStatus, SummarizationError},
        upload::{ScratchPdf, UploadedDocument},
    },
    summarization::{
        GroqSummarizationClient, SummarizationClient, SummarizationRequest,
        prompt::{CONTEXT_SEPARATOR, render_blog_prompt},
    },
};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::Instrument;
use uuid::Uuid;

/// Runs one uploaded paper through extraction, indexing, and summarization.
///
/// The pipeline owns long-lived handles to both providers so the login handshake and HTTP
/// connection pools survive across runs. Runs are serialized: a second upload waits until the
/// first has produced its report. Construct it once near process start and share it through an
/// `Arc`.
pub struct SummaryPipeline {
    extractor: Arc<dyn TextExtractor>,
    chunker: TextChunker,
    embedding_client: Box<dyn EmbeddingClient>,
    summarization_client: Box<dyn SummarizationClient>,
    query_strategy: Box<dyn QueryStrategy>,
    top_k: usize,
    credential_warnings: Vec<String>,
    metrics: Arc<RunMetrics>,
    run_gate: Mutex<()>,
}

/// Abstraction over the pipeline used by the presentation surfaces (HTTP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Process one upload end to end and describe what happened.
    ///
    /// Stage failures are reported inside the returned [`RunReport`], never as a panic or error.
    async fn summarize_upload(&self, upload: UploadedDocument) -> RunReport;

    /// Notices about missing credentials, shown before any upload.
    fn credential_warnings(&self) -> Vec<String>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl SummaryPipeline {
    /// Assemble a pipeline from explicit components with the default chunker and query strategy.
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        embedding_client: Box<dyn EmbeddingClient>,
        summarization_client: Box<dyn SummarizationClient>,
    ) -> Self {
        Self {
            extractor,
            chunker: TextChunker::default(),
            embedding_client,
            summarization_client,
            query_strategy: Box::new(WholeDocumentQuery),
            top_k: DEFAULT_TOP_K,
            credential_warnings: Vec::new(),
            metrics: Arc::new(RunMetrics::new()),
            run_gate: Mutex::new(()),
        }
    }

    /// Build the production pipeline: `pdf-extract`, Hugging Face embeddings, and Groq.
    ///
    /// Missing credentials do not fail construction; they surface as warnings here and as a
    /// configuration failure of the stage that needs them.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        tracing::info!("Initializing provider clients");
        let embedding_client = HuggingFaceEmbeddingClient::from_config(config)?;
        let summarization_client = GroqSummarizationClient::from_config(config)?;
        Ok(Self::new(
            Arc::new(PdfTextExtractor::new()),
            Box::new(embedding_client),
            Box::new(summarization_client),
        )
        .with_credential_warnings(config.credential_warnings()))
    }

    /// Replace how the retrieval query and prompt question are derived.
    pub fn with_query_strategy(mut self, strategy: impl QueryStrategy + 'static) -> Self {
        self.query_strategy = Box::new(strategy);
        self
    }

    /// Replace the chunker.
    pub fn with_chunker(mut self, chunker: TextChunker) -> Self {
        self.chunker = chunker;
        self
    }

    /// Attach startup notices about missing credentials.
    pub fn with_credential_warnings(mut self, warnings: Vec<String>) -> Self {
        self.credential_warnings = warnings;
        self
    }

    /// Process one upload end to end.
    pub async fn summarize_upload(&self, upload: UploadedDocument) -> RunReport {
        let _turn = self.run_gate.lock().await;
        let run_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "run",
            run_id = %run_id,
            file = %upload.filename,
            fingerprint = %upload.fingerprint(),
        );

        async move {
            self.metrics.record_run_started();
            tracing::info!(bytes = upload.bytes.len(), "Processing upload");
            let mut report = RunReport::new(run_id, upload.filename.clone());

            match self.run_stages(&upload, &mut report).await {
                Ok(summary) => {
                    self.metrics.record_summary();
                    tracing::info!(chars = summary.chars().count(), "Summary generated");
                    report.summary = Some(summary);
                }
                Err(error) => {
                    report.fail(&error);
                    if let Some(failed) = report
                        .stages
                        .iter()
                        .find(|line| line.status == StageStatus::Failed)
                    {
                        self.metrics.record_failure(failed.stage);
                    }
                    tracing::warn!(kind = ?error.kind(), error = %error, "Run halted");
                }
            }

            report.finish();
            report
        }
        .instrument(span)
        .await
    }

    /// Return the current run counters.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn run_stages(
        &self,
        upload: &UploadedDocument,
        report: &mut RunReport,
    ) -> Result<String, PipelineError> {
        let scratch = ScratchPdf::write(&upload.bytes).map_err(ExtractionError::from)?;
        let extracted = self.extract(scratch.path()).await?;
        drop(scratch);

        if extracted.is_blank() {
            return Err(PipelineError::NoText);
        }
        let chars = extracted.char_count();
        report.extracted_chars = Some(chars);
        report.succeed(
            Stage::Extraction,
            format!("Extracted {chars} characters from the PDF."),
        );

        let index = self.build_index(&extracted.text).await?;
        report.chunk_count = Some(index.len());
        report.succeed(Stage::Indexing, "Vectorstore created successfully.");

        let summary = self.summarize(&extracted.text, &index).await?;
        report.succeed(Stage::Summarization, "Blog summary generated.");
        Ok(summary)
    }

    async fn extract(&self, path: &Path) -> Result<ExtractedText, PipelineError> {
        let extractor = Arc::clone(&self.extractor);
        let path = path.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&path))
            .await
            .map_err(|error| ExtractionError::Aborted(error.to_string()))??;
        tracing::info!(
            pages = extracted.page_count,
            chars = extracted.char_count(),
            "Text extracted"
        );
        Ok(extracted)
    }

    async fn build_index(&self, text: &str) -> Result<VectorIndex, PipelineError> {
        let chunks = self.chunker.split_text(text);
        tracing::debug!(
            chunks = chunks.len(),
            chunk_size = self.chunker.chunk_size(),
            overlap = self.chunker.chunk_overlap(),
            "Split document"
        );

        let vectors = self
            .embedding_client
            .generate_embeddings(chunks.clone())
            .await
            .map_err(|error| PipelineError::from_embedding(Stage::Indexing, error))?;
        let index = VectorIndex::build(chunks, vectors).map_err(IndexingError::from)?;

        tracing::info!(
            chunks = index.len(),
            dimension = index.dimension(),
            model = %self.embedding_client.model(),
            "Vector index built"
        );
        Ok(index)
    }

    async fn summarize(&self, text: &str, index: &VectorIndex) -> Result<String, PipelineError> {
        let query = self.query_strategy.retrieval_query(text).into_owned();
        let mut vectors = self
            .embedding_client
            .generate_embeddings(vec![query])
            .await
            .map_err(|error| PipelineError::from_embedding(Stage::Summarization, error))?;
        let query_vector = vectors.pop().ok_or_else(|| {
            PipelineError::from_embedding(
                Stage::Summarization,
                EmbeddingClientError::InvalidResponse("no vector for retrieval query".into()),
            )
        })?;

        let hits = index
            .search(&query_vector, self.top_k)
            .map_err(SummarizationError::from)?;
        tracing::debug!(
            retrieved = hits.len(),
            nearest = hits.first().map(|hit| hit.distance),
            "Retrieved context"
        );
        let context = hits
            .iter()
            .map(|hit| hit.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join(CONTEXT_SEPARATOR);

        let question = self.query_strategy.question(text);
        let prompt = render_blog_prompt(&context, &question);
        self.summarization_client
            .generate_summary(SummarizationRequest::for_prompt(prompt))
            .await
            .map_err(PipelineError::from_summarization)
    }
}

#[async_trait]
impl PipelineApi for SummaryPipeline {
    async fn summarize_upload(&self, upload: UploadedDocument) -> RunReport {
        SummaryPipeline::summarize_upload(self, upload).await
    }

    fn credential_warnings(&self) -> Vec<String> {
        self.credential_warnings.clone()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        SummaryPipeline::metrics_snapshot(self)
    }
}
