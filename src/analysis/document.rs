use crate::error::AnalysisError;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// Only PDF uploads are accepted.
pub const PDF_MIME: &str = "application/pdf";

/// Upload size cap (10 MB).
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

/// An uploaded document, ready to hand to the analysis client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentFile {
    pub name: String,
    pub mime_type: String,
    /// Base64-encoded file bytes
    pub data: String,
}

impl DocumentFile {
    /// Validate and wrap raw file bytes.
    ///
    /// Rejects anything that is not exactly `application/pdf` before any
    /// bytes are encoded or any network call is made.
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, AnalysisError> {
        let mime_type = mime_type.into();
        if mime_type != PDF_MIME {
            return Err(AnalysisError::UnsupportedFormat(mime_type));
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(AnalysisError::TooLarge {
                size: bytes.len(),
                limit: MAX_DOCUMENT_BYTES,
            });
        }

        Ok(Self {
            name: name.into(),
            mime_type,
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        })
    }

    /// Validate a document that arrived already base64-encoded (HTTP body).
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.mime_type != PDF_MIME {
            return Err(AnalysisError::UnsupportedFormat(self.mime_type.clone()));
        }
        // Base64 expands by 4/3; compare against the decoded size
        let decoded_len = self.data.len() / 4 * 3;
        if decoded_len > MAX_DOCUMENT_BYTES {
            return Err(AnalysisError::TooLarge {
                size: decoded_len,
                limit: MAX_DOCUMENT_BYTES,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_pdf_mime() {
        let err = DocumentFile::from_bytes("cat.png", "image/png", b"not a pdf").unwrap_err();
        assert!(matches!(err, AnalysisError::UnsupportedFormat(m) if m == "image/png"));
    }

    #[test]
    fn rejects_oversized_document() {
        let big = vec![0u8; MAX_DOCUMENT_BYTES + 1];
        let err = DocumentFile::from_bytes("big.pdf", PDF_MIME, &big).unwrap_err();
        assert!(matches!(err, AnalysisError::TooLarge { .. }));
    }

    #[test]
    fn accepts_pdf_and_encodes_base64() {
        let doc = DocumentFile::from_bytes("brief.pdf", PDF_MIME, b"%PDF-1.7").unwrap();
        assert_eq!(doc.mime_type, PDF_MIME);
        assert_eq!(
            base64::engine::general_purpose::STANDARD
                .decode(&doc.data)
                .unwrap(),
            b"%PDF-1.7"
        );
        assert!(doc.validate().is_ok());
    }
}
