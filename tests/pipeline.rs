use std::{path::Path, sync::Arc, time::Duration};

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use httpmock::{
    Method::{GET, POST},
    Mock, MockServer,
};
use paperblog::{
    api,
    config::{CHAT_REQUEST_TIMEOUT, Config},
    embedding::HuggingFaceEmbeddingClient,
    extraction::{ExtractedText, ExtractionError, PdfTextExtractor, TextExtractor},
    processing::{ErrorKind, Stage, StageStatus, SummaryPipeline, UploadedDocument},
    summarization::GroqSummarizationClient,
};
use serde_json::json;
use tower::ServiceExt;

const FEATURE_PATH: &str =
    "/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction";
const CHAT_PATH: &str = "/openai/v1/chat/completions";

/// Minimal one-page PDF showing `phrase` in Helvetica, with exact xref offsets.
fn single_page_pdf(phrase: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 100 700 Td ({phrase}) Tj ET");
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = Vec::new();
    let objects = [
        "1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n".to_string(),
        "2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n".to_string(),
        "3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << /Font << /F1 5 0 R >> >> >> endobj\n".to_string(),
        format!(
            "4 0 obj << /Length {} >> stream\n{content}\nendstream endobj\n",
            content.len()
        ),
        "5 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n".to_string(),
    ];
    for object in &objects {
        offsets.push(out.len());
        out.extend_from_slice(object.as_bytes());
    }
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 6\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 6 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{xref_start}\n").as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn config_for(server: &MockServer, token: Option<&str>, api_key: Option<&str>) -> Config {
    Config {
        huggingface_token: token.map(str::to_string),
        groq_api_key: api_key.map(str::to_string),
        huggingface_hub_url: server.base_url(),
        huggingface_inference_url: server.url("/models"),
        groq_api_url: server.url("/openai/v1"),
        server_port: None,
    }
}

struct ProviderMocks<'a> {
    whoami: Mock<'a>,
    features: Mock<'a>,
    chat: Mock<'a>,
}

async fn mock_embeddings(server: &MockServer) -> (Mock<'_>, Mock<'_>) {
    let whoami = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/whoami-v2")
                .header("authorization", "Bearer hf_test");
            then.status(200).json_body(json!({ "name": "tester" }));
        })
        .await;
    let features = server
        .mock_async(|when, then| {
            when.method(POST).path(FEATURE_PATH);
            then.status(200).json_body(json!([[0.1, 0.2, 0.3]]));
        })
        .await;
    (whoami, features)
}

async fn mock_providers(server: &MockServer, chat_delay: Duration) -> ProviderMocks<'_> {
    let (whoami, features) = mock_embeddings(server).await;
    let chat = server
        .mock_async(move |when, then| {
            when.method(POST)
                .path(CHAT_PATH)
                .header("authorization", "Bearer gsk_test");
            then.status(200).delay(chat_delay).json_body(json!({
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Title: Hello, World Explained" }
                }]
            }));
        })
        .await;
    ProviderMocks {
        whoami,
        features,
        chat,
    }
}

fn upload(phrase: &str) -> UploadedDocument {
    UploadedDocument::new("paper.pdf", single_page_pdf(phrase))
}

#[tokio::test]
async fn short_paper_is_summarized_end_to_end() {
    let server = MockServer::start_async().await;
    let mocks = mock_providers(&server, Duration::ZERO).await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");

    let report = pipeline.summarize_upload(upload("Hello world.")).await;

    assert!(report.succeeded(), "report: {report:?}");
    assert_eq!(
        report.summary.as_deref(),
        Some("Title: Hello, World Explained")
    );
    assert_eq!(report.chunk_count, Some(1));
    assert_eq!(report.extracted_chars, Some(12));
    let extraction = report.stage(Stage::Extraction).expect("extraction");
    assert_eq!(extraction.message, "Extracted 12 characters from the PDF.");

    mocks.whoami.assert_hits_async(1).await;
    mocks.features.assert_hits_async(2).await;
    mocks.chat.assert_hits_async(1).await;
}

#[tokio::test]
async fn prompt_sent_to_chat_model_carries_paper_text() {
    let server = MockServer::start_async().await;
    let _embeddings = mock_embeddings(&server).await;
    let prompt_check = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(CHAT_PATH)
                .body_contains("Context: ")
                .body_contains("Hello world.")
                .body_contains("write a blog-style explainer");
            then.status(200).json_body(json!({
                "choices": [{ "message": { "role": "assistant", "content": "checked" } }]
            }));
        })
        .await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");

    let report = pipeline.summarize_upload(upload("Hello world.")).await;

    assert!(report.succeeded(), "report: {report:?}");
    prompt_check.assert_hits_async(1).await;
}

struct BlankExtractor;

impl TextExtractor for BlankExtractor {
    fn extract(&self, _path: &Path) -> Result<ExtractedText, ExtractionError> {
        Ok(ExtractedText {
            text: String::new(),
            page_count: 0,
        })
    }
}

#[tokio::test]
async fn document_without_text_never_reaches_providers() {
    let server = MockServer::start_async().await;
    let mocks = mock_providers(&server, Duration::ZERO).await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::new(
        Arc::new(BlankExtractor),
        Box::new(HuggingFaceEmbeddingClient::from_config(&config).expect("embedder")),
        Box::new(GroqSummarizationClient::from_config(&config).expect("chat")),
    );

    let report = pipeline.summarize_upload(upload("ignored")).await;

    let extraction = report.stage(Stage::Extraction).expect("extraction");
    assert_eq!(extraction.status, StageStatus::Failed);
    assert_eq!(extraction.message, "No text could be extracted from the PDF.");
    assert_eq!(report.error_kind, Some(ErrorKind::Extraction));
    assert!(report.summary.is_none());

    mocks.whoami.assert_hits_async(0).await;
    mocks.features.assert_hits_async(0).await;
    mocks.chat.assert_hits_async(0).await;
}

#[tokio::test]
async fn missing_huggingface_token_fails_indexing() {
    let server = MockServer::start_async().await;
    let mocks = mock_providers(&server, Duration::ZERO).await;
    let config = config_for(&server, None, Some("gsk_test"));
    let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");

    let report = pipeline.summarize_upload(upload("Hello world.")).await;

    assert_eq!(
        report.stage(Stage::Extraction).map(|line| line.status),
        Some(StageStatus::Succeeded)
    );
    let indexing = report.stage(Stage::Indexing).expect("indexing");
    assert_eq!(indexing.status, StageStatus::Failed);
    assert!(indexing.message.contains("Failed to load embedding model"));
    assert!(indexing.message.contains("HUGGINGFACE_TOKEN"));
    assert_eq!(
        report.stage(Stage::Summarization).map(|line| line.status),
        Some(StageStatus::Skipped)
    );

    mocks.whoami.assert_hits_async(0).await;
    mocks.chat.assert_hits_async(0).await;
}

#[tokio::test]
async fn slow_chat_model_times_out() {
    let server = MockServer::start_async().await;
    let mocks = mock_providers(&server, Duration::from_secs(3)).await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::new(
        Arc::new(PdfTextExtractor::new()),
        Box::new(HuggingFaceEmbeddingClient::from_config(&config).expect("embedder")),
        Box::new(
            GroqSummarizationClient::new(
                config.groq_api_key.clone(),
                config.groq_api_url.clone(),
                Duration::from_millis(300),
            )
            .expect("chat"),
        ),
    );

    let report = pipeline.summarize_upload(upload("Hello world.")).await;

    let summarization = report.stage(Stage::Summarization).expect("summarization");
    assert_eq!(summarization.status, StageStatus::Failed);
    assert!(summarization.message.starts_with("Error generating summary: "));
    assert!(summarization.message.contains("timed out"));
    assert_eq!(report.error_kind, Some(ErrorKind::Summarization));
    assert!(report.summary.is_none());
    mocks.features.assert_hits_async(2).await;
}

#[tokio::test]
async fn malformed_pdf_is_an_extraction_failure() {
    let server = MockServer::start_async().await;
    let mocks = mock_providers(&server, Duration::ZERO).await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");

    let report = pipeline
        .summarize_upload(UploadedDocument::new("broken.pdf", b"not a pdf".to_vec()))
        .await;

    let extraction = report.stage(Stage::Extraction).expect("extraction");
    assert_eq!(extraction.status, StageStatus::Failed);
    assert!(extraction.message.starts_with("Error extracting text from PDF: "));
    mocks.features.assert_hits_async(0).await;
}

#[tokio::test]
async fn http_upload_runs_pipeline_and_serves_download() {
    let server = MockServer::start_async().await;
    let _mocks = mock_providers(&server, Duration::ZERO).await;
    let config = config_for(&server, Some("hf_test"), Some("gsk_test"));
    let pipeline = SummaryPipeline::from_config(&config).expect("pipeline");
    let app = api::create_router(Arc::new(pipeline));

    let boundary = "paperblog-integration";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"paper.pdf\"\r\nContent-Type: application/pdf\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(&single_page_pdf("Hello world."));
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/summaries")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);
    let report: serde_json::Value = serde_json::from_slice(
        &to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body"),
    )
    .expect("json");
    assert_eq!(report["summary"], "Title: Hello, World Explained");
    assert_eq!(report["stages"][2]["status"], "succeeded");

    let download = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/summary.txt")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("download");
    assert_eq!(download.status(), StatusCode::OK);
    let text = to_bytes(download.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(&text[..], b"Title: Hello, World Explained");

    let metrics = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("metrics");
    let metrics: serde_json::Value = serde_json::from_slice(
        &to_bytes(metrics.into_body(), usize::MAX)
            .await
            .expect("body"),
    )
    .expect("json");
    assert_eq!(metrics["runs_started"], 1);
    assert_eq!(metrics["summaries_generated"], 1);
}

#[test]
fn standard_timeout_is_thirty_seconds() {
    assert_eq!(CHAT_REQUEST_TIMEOUT, Duration::from_secs(30));
}
