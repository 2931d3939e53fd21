#![deny(missing_docs)]

//! Core library for the research paper explainer: turns a PDF into a blog-style summary.

/// HTTP routing, handlers, and the upload page.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction and adapters.
pub mod embedding;
/// PDF text extraction.
pub mod extraction;
/// In-memory nearest-neighbour index over chunk embeddings.
pub mod index;
/// Structured logging and tracing setup.
pub mod logging;
/// Run metrics helpers.
pub mod metrics;
/// Document processing pipeline.
pub mod processing;
/// Summary generation via a hosted chat model.
pub mod summarization;
