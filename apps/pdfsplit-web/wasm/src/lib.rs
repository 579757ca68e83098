//! WASM bindings for splitting a PDF into pages and zipping a selection
//!
//! All document state lives in Rust inside a [`SplitSession`]; JavaScript
//! only handles DOM events, file reading and triggering downloads.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { SplitSession, checkUpload } from './pkg/pdfsplit_wasm.js';
//!
//! await init();
//!
//! checkUpload(file.name, file.type, file.size);
//! const session = new SplitSession();
//! session.setProgressCallback((event) => updateBar(event.percentage, event.message));
//! session.load(file.name, bytes);
//! while (session.step()) await nextFrame();
//!
//! session.setPageSelection("1, 3");
//! session.startArchive();
//! while (session.archiveStep()) await nextFrame();
//! download(session.takeArchive(), session.archiveFileName());
//! ```
//!
//! Errors thrown into JavaScript are plain objects:
//! `{ kind, stage, message, retryable }`.

pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use pdfsplit_core::{PdfSplitError, Stage};
use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use session::{SessionError, SessionState, SplitSession};
pub use validation::UploadError;

/// Initialize the WASM module
/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Get the library version
#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Reject wrong file types and oversized files before reading them
#[wasm_bindgen(js_name = checkUpload)]
pub fn check_upload(file_name: &str, mime_type: &str, size: usize) -> Result<(), JsValue> {
    validation::check_upload(file_name, mime_type, size)
        .map_err(|e| to_js_error(&ErrorPayload::from(&e)))
}

/// Quick validation check for a PDF file
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    validation::quick_validate(bytes).map_err(|e| to_js_error(&ErrorPayload::from(&e)))
}

/// Page count, version and metadata without creating a session
#[wasm_bindgen(js_name = getPdfInfo)]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info =
        validation::validate_pdf(bytes).map_err(|e| to_js_error(&ErrorPayload::from(&e)))?;
    to_js(&info)
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    validation::format_bytes(bytes)
}

/// Archive name for an uploaded file, stamped with the current UTC time
#[wasm_bindgen(js_name = archiveFileName)]
pub fn archive_file_name(source_name: &str) -> String {
    pdfsplit_core::archive_file_name(source_name)
}

/// Error shape handed to JavaScript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub stage: Option<Stage>,
    pub message: String,
    pub retryable: bool,
}

impl From<&PdfSplitError> for ErrorPayload {
    fn from(err: &PdfSplitError) -> Self {
        let kind = serde_json::to_value(err.kind())
            .ok()
            .and_then(|value| value.as_str().map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            kind,
            stage: err.stage(),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl From<&UploadError> for ErrorPayload {
    fn from(err: &UploadError) -> Self {
        match err {
            UploadError::Document(inner) => Self::from(inner),
            other => Self {
                kind: "validation".to_string(),
                stage: None,
                message: other.to_string(),
                retryable: false,
            },
        }
    }
}

impl From<&SessionError> for ErrorPayload {
    fn from(err: &SessionError) -> Self {
        match err {
            SessionError::Pipeline(inner) => Self::from(inner),
            SessionError::Upload(inner) => Self::from(inner),
            SessionError::Preview(_) => Self {
                kind: "preview".to_string(),
                stage: None,
                message: err.to_string(),
                retryable: false,
            },
            other => Self {
                kind: "invalid_state".to_string(),
                stage: None,
                message: other.to_string(),
                retryable: false,
            },
        }
    }
}

pub(crate) fn to_js_error(payload: &ErrorPayload) -> JsValue {
    serde_wasm_bindgen::to_value(payload).unwrap_or_else(|_| JsValue::from_str(&payload.message))
}

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}
