//! Page selection helpers
//!
//! Choosing pages is the caller's job; these helpers turn range text like
//! `"1-3, 5, 8-10"` into page numbers and pick the matching artifacts.

use std::collections::BTreeSet;

use crate::error::{PdfSplitError, Result};
use crate::split::PageArtifact;

/// Parse page range text into sorted, unique page numbers
pub fn parse_ranges(input: &str) -> Result<Vec<u32>> {
    parse_bounded(input, None)
}

/// [`parse_ranges`], additionally rejecting pages past `page_count`
///
/// Each part is checked before it is expanded, so `"1-4000000000"` fails
/// without materializing the range.
pub fn parse_ranges_within(input: &str, page_count: u32) -> Result<Vec<u32>> {
    parse_bounded(input, Some(page_count))
}

fn parse_bounded(input: &str, page_count: Option<u32>) -> Result<Vec<u32>> {
    let mut pages = BTreeSet::new();

    for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let start = parse_page(start)?;
            let end = parse_page(end)?;
            if start > end {
                return Err(PdfSplitError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }
            check_bound(end, page_count)?;
            pages.extend(start..=end);
        } else {
            let page = parse_page(part)?;
            check_bound(page, page_count)?;
            pages.insert(page);
        }
    }

    Ok(pages.into_iter().collect())
}

fn check_bound(page: u32, page_count: Option<u32>) -> Result<()> {
    match page_count {
        Some(count) if page > count => Err(PdfSplitError::InvalidRange(format!(
            "Page {} is out of range (1-{})",
            page, count
        ))),
        _ => Ok(()),
    }
}

fn parse_page(text: &str) -> Result<u32> {
    let text = text.trim();
    match text.parse::<u32>() {
        Ok(0) => Err(PdfSplitError::InvalidRange(
            "Page numbers must be >= 1".into(),
        )),
        Ok(page) => Ok(page),
        Err(_) => Err(PdfSplitError::InvalidRange(format!(
            "Invalid page: {}",
            text
        ))),
    }
}

/// Artifacts whose page number is in `page_numbers`, in ascending page order
pub fn select_pages(artifacts: &[PageArtifact], page_numbers: &[u32]) -> Vec<PageArtifact> {
    let wanted: BTreeSet<u32> = page_numbers.iter().copied().collect();
    let mut selected: Vec<PageArtifact> = artifacts
        .iter()
        .filter(|artifact| wanted.contains(&artifact.page_number))
        .cloned()
        .collect();
    selected.sort_by_key(|artifact| artifact.page_number);
    selected
}
