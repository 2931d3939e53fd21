//! How a run turns the document into a retrieval query and a question for the chat model.
//!
//! The shipped strategy uses the entire paper for both. That makes retrieval largely
//! redundant (the question already contains every chunk) and can overflow the model's
//! context window on long papers. It is kept behind [`QueryStrategy`] so a design with a short
//! question distinct from the retrieved context can replace it without touching the pipeline.

use std::borrow::Cow;

/// Derives the retrieval query and the prompt question from the extracted document text.
pub trait QueryStrategy: Send + Sync {
    /// Text embedded to look up similar chunks.
    fn retrieval_query<'a>(&self, document: &'a str) -> Cow<'a, str>;

    /// Text substituted for `{question}` in the prompt.
    fn question<'a>(&self, document: &'a str) -> Cow<'a, str>;
}

/// Uses the whole document as both the retrieval query and the question.
#[derive(Debug, Default, Clone, Copy)]
pub struct WholeDocumentQuery;

impl QueryStrategy for WholeDocumentQuery {
    fn retrieval_query<'a>(&self, document: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(document)
    }

    fn question<'a>(&self, document: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(document)
    }
}
