//! End-to-end split then archive, through the public API only
//!
//! Run with: cargo test -p pdfsplit-core --test pipeline

#[path = "common/fixtures.rs"]
mod fixtures;

use std::io::{Cursor, Read};
use std::sync::mpsc;

use pdfsplit_core::{
    archive_file_name, archive_pages, parse_ranges_within, select_pages, split_document,
    ErrorKind, NoProgress, PdfSplitError, ProgressEvent, Stage,
};
use pretty_assertions::assert_eq;
use zip::ZipArchive;

fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).unwrap();
            let mut data = Vec::new();
            entry.read_to_end(&mut data).unwrap();
            (entry.name().to_string(), data)
        })
        .collect()
}

// ============================================================================
// Split + archive
// ============================================================================

#[test]
fn test_invoice_pages_one_and_three() {
    let pdf = fixtures::create_test_pdf(3);
    let pages = split_document(&pdf, "invoice.pdf", &mut NoProgress).unwrap();

    let names: Vec<&str> = pages.iter().map(|p| p.file_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "invoice_page_001.pdf",
            "invoice_page_002.pdf",
            "invoice_page_003.pdf"
        ]
    );

    let wanted = parse_ranges_within("1, 3", 3).unwrap();
    let selected = select_pages(&pages, &wanted);
    let archive_name = archive_file_name("invoice.pdf");
    let archive = archive_pages(&selected, Some(archive_name.as_str()), &mut NoProgress).unwrap();

    assert!(archive.file_name.starts_with("invoice_split_"));
    let entries = zip_entries(&archive.bytes);
    assert_eq!(
        entries.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
        vec!["invoice_page_001.pdf", "invoice_page_003.pdf"]
    );
    assert_eq!(entries[1].1, pages[2].bytes);

    let content = fixtures::only_page_content(&entries[1].1);
    let text = String::from_utf8_lossy(&content);
    assert!(text.contains("(Page 3)"), "content was {}", text);
}

#[test]
fn test_every_artifact_is_a_single_page_pdf() {
    let pdf = fixtures::create_test_pdf(6);
    let pages = split_document(&pdf, "scan.PDF", &mut NoProgress).unwrap();

    assert_eq!(pages.len(), 6);
    for (i, page) in pages.iter().enumerate() {
        let n = i as u32 + 1;
        assert_eq!(page.page_number, n);
        assert_eq!(page.file_name, format!("scan_page_{:03}.pdf", n));
        let content = fixtures::only_page_content(&page.bytes);
        assert!(String::from_utf8_lossy(&content).contains(&format!("(Page {})", n)));
    }
}

#[test]
fn test_combined_progress_is_monotonic_over_channel() {
    let (tx, rx) = mpsc::channel::<ProgressEvent>();
    let mut sink = |event: ProgressEvent| {
        let _ = tx.send(event);
    };

    let pdf = fixtures::create_test_pdf(5);
    let pages = split_document(&pdf, "report.pdf", &mut sink).unwrap();
    archive_pages(&pages, None, &mut sink).unwrap();
    drop(sink);
    drop(tx);

    let events: Vec<ProgressEvent> = rx.iter().collect();
    let percentages: Vec<u8> = events.iter().map(|e| e.percentage).collect();
    assert_eq!(percentages.first(), Some(&0));
    assert_eq!(percentages.last(), Some(&100));
    assert!(percentages.windows(2).all(|w| w[0] <= w[1]), "{:?}", percentages);

    for event in &events {
        let (low, high) = event.stage.bounds();
        assert!(
            (low..=high).contains(&event.percentage),
            "{:?} outside {}..={}",
            event,
            low,
            high
        );
    }
    assert_eq!(events.last().map(|e| e.stage), Some(Stage::Complete));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_zero_byte_upload() {
    let mut events = Vec::new();
    let err = split_document(&[], "empty.pdf", &mut |e: ProgressEvent| events.push(e)).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DocumentParse);
    assert_eq!(err.stage(), Some(Stage::Reading));
    assert!(err.to_string().starts_with("Split failed"));
    assert_eq!(events.len(), 1);
    assert_eq!((events[0].stage, events[0].percentage), (Stage::Reading, 0));
}

#[test]
fn test_nothing_selected() {
    let pdf = fixtures::create_test_pdf(2);
    let pages = split_document(&pdf, "a.pdf", &mut NoProgress).unwrap();
    let selected = select_pages(&pages, &[]);

    let err = archive_pages(&selected, None, &mut NoProgress).unwrap_err();
    assert!(matches!(err, PdfSplitError::EmptySelection));
    assert!(!err.is_retryable());
}

#[test]
fn test_out_of_range_selection() {
    let err = parse_ranges_within("2-4", 3).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRange);
    assert_eq!(err.stage(), None);
}
