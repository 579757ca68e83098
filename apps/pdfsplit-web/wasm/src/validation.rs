//! Upload checks run before a file reaches the splitter
//!
//! Cheap checks first (type, size, header, trailer), then a full parse for the
//! document facts shown on the upload screen.

use pdfsplit_core::{document_info, DocumentInfo, PdfSplitError};
use thiserror::Error;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// 100 MiB
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Smallest byte count that can hold a `%PDF-x.y` header
const MIN_PDF_BYTES: usize = 8;

/// How far from the end the `%%EOF` marker may sit
const EOF_SEARCH_WINDOW: usize = 1024;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Please select a PDF file")]
    WrongType { mime_type: String },

    #[error("File is too large ({}). Maximum size is {}", format_bytes(*size), format_bytes(*limit))]
    TooLarge { size: usize, limit: usize },

    #[error("File too small to be a valid PDF")]
    TooSmall,

    #[error("Not a valid PDF file (missing %PDF- header)")]
    MissingHeader,

    #[error("PDF appears truncated (missing %%EOF marker)")]
    Truncated,

    #[error("PDF is password-protected")]
    Encrypted,

    #[error(transparent)]
    Document(#[from] PdfSplitError),
}

/// Check what the browser tells us about a file before reading it.
///
/// Some platforms report an empty MIME type; a `.pdf` name is accepted then.
pub fn check_upload(file_name: &str, mime_type: &str, size: usize) -> Result<(), UploadError> {
    let looks_like_pdf = mime_type == PDF_MIME_TYPE
        || (mime_type.is_empty() && file_name.to_ascii_lowercase().ends_with(".pdf"));
    if !looks_like_pdf {
        return Err(UploadError::WrongType {
            mime_type: mime_type.to_string(),
        });
    }

    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge {
            size,
            limit: MAX_UPLOAD_BYTES,
        });
    }

    Ok(())
}

/// Quick validation without full parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), UploadError> {
    if bytes.len() < MIN_PDF_BYTES {
        return Err(UploadError::TooSmall);
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(UploadError::MissingHeader);
    }

    let tail = &bytes[bytes.len().saturating_sub(EOF_SEARCH_WINDOW)..];
    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(UploadError::Truncated);
    }

    Ok(())
}

/// Full validation: quick checks, then parse for page count and metadata
pub fn validate_pdf(bytes: &[u8]) -> Result<DocumentInfo, UploadError> {
    quick_validate(bytes)?;

    let info = document_info(bytes)?;
    if info.encrypted {
        return Err(UploadError::Encrypted);
    }
    if info.page_count == 0 {
        return Err(PdfSplitError::EmptyDocument.into());
    }
    Ok(info)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
