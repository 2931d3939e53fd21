//! Uploaded documents and the scratch file they are parsed from.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Raw bytes of a user-supplied PDF.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    /// File name as supplied by the client.
    pub filename: String,
    /// Document contents.
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    /// Wrap uploaded bytes.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// Whether the file name carries a `.pdf` extension (case-insensitive).
    pub fn has_pdf_extension(&self) -> bool {
        Path::new(&self.filename)
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
    }

    /// Hex-encoded SHA-256 of the contents, used to correlate log lines.
    pub fn fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.bytes))
    }
}

/// Temporary `.pdf` file holding an upload while it is parsed.
///
/// The file is removed when the value is dropped, including during unwinding.
#[derive(Debug)]
pub struct ScratchPdf {
    file: NamedTempFile,
}

impl ScratchPdf {
    /// Write `bytes` to a fresh temporary file.
    pub fn write(bytes: &[u8]) -> std::io::Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix("paperblog-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(Self { file })
    }

    /// Location of the scratch file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
