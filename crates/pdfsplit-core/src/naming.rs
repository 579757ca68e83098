//! Deterministic output file names
//!
//! Page artifacts are named `{base}_page_{nnn}.pdf` and archives
//! `{base}_split_{YYYY-MM-DDTHH-MM-SS}.zip`, where `base` is the uploaded
//! file name with one trailing `.pdf` removed.

use chrono::{DateTime, Utc};

/// Used when the upload name is empty or just ".pdf"
pub const FALLBACK_BASE_NAME: &str = "document";

const PDF_SUFFIX: &str = ".pdf";

/// Strip a single trailing `.pdf` (any case) from a file name
pub fn base_name(file_name: &str) -> &str {
    let split_at = file_name.len().saturating_sub(PDF_SUFFIX.len());
    let stem = match file_name.get(split_at..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(PDF_SUFFIX) => &file_name[..split_at],
        _ => file_name,
    };

    if stem.is_empty() {
        FALLBACK_BASE_NAME
    } else {
        stem
    }
}

/// `invoice.pdf`, page 3 -> `invoice_page_003.pdf`
pub fn page_file_name(source_name: &str, page_number: u32) -> String {
    format!("{}_page_{:03}.pdf", base_name(source_name), page_number)
}

/// Archive name stamped with the current UTC time
pub fn archive_file_name(source_name: &str) -> String {
    archive_file_name_at(source_name, Utc::now())
}

/// Archive name stamped with `at`, e.g. `report_split_2024-01-15T10-30-45.zip`
pub fn archive_file_name_at(source_name: &str, at: DateTime<Utc>) -> String {
    format!("{}_split_{}.zip", base_name(source_name), timestamp(at))
}

/// ISO-8601 with `:` replaced by `-` and the fraction/zone dropped, so the
/// value sorts lexically and is safe on every filesystem
fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S").to_string()
}
