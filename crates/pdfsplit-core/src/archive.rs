//! ZIP assembly for a selection of split pages
//!
//! Members are stored flat (no directory entries) under each artifact's file
//! name, deflated at the configured level. Like the splitter, the builder works
//! one member per call so a caller can yield between insertions.

use std::io::{Cursor, Write};

use serde::Serialize;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::cancel::CancelToken;
use crate::error::{PdfSplitError, Result};
use crate::naming::archive_file_name;
use crate::options::ArchiveOptions;
use crate::progress::{zip_percentage, ProgressSink, ProgressTracker, Stage, SPLIT_DONE, ZIP_FINALIZE};
use crate::split::PageArtifact;

/// A finished archive ready to hand to a download sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveResult {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub member_count: u32,
}

/// Incremental ZIP writer over an in-memory buffer
pub struct ArchiveBuilder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    entry_options: SimpleFileOptions,
    cancel: CancelToken,
    tracker: ProgressTracker,
    total: u32,
    added: u32,
}

impl ArchiveBuilder {
    /// Start an archive that will hold `total` members; emits `zipping` at 90%.
    ///
    /// `total == 0` is rejected with [`PdfSplitError::EmptySelection`] before
    /// any event is emitted.
    pub fn new<P: ProgressSink + ?Sized>(
        total: u32,
        options: &ArchiveOptions,
        progress: &mut P,
    ) -> Result<Self> {
        if total == 0 {
            return Err(PdfSplitError::EmptySelection);
        }
        options.validate()?;

        // level 0 means store; the deflate encoder only accepts 1-9
        let entry_options = match options.compression_level {
            0 => SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            level => SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(level))),
        };

        let mut tracker = ProgressTracker::default();
        tracker.emit(
            progress,
            Stage::Zipping,
            0,
            total,
            SPLIT_DONE,
            "Creating ZIP archive...",
        );

        Ok(Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            entry_options,
            cancel: CancelToken::default(),
            tracker,
            total,
            added: 0,
        })
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn members_added(&self) -> u32 {
        self.added
    }

    /// Insert one artifact under its file name
    pub fn add<P: ProgressSink + ?Sized>(
        &mut self,
        artifact: &PageArtifact,
        progress: &mut P,
    ) -> Result<()> {
        self.cancel.check(Stage::Zipping)?;
        if self.added >= self.total {
            return Err(PdfSplitError::ArchiveBuild(format!(
                "archive was sized for {} members",
                self.total
            )));
        }

        self.writer
            .start_file(artifact.file_name.as_str(), self.entry_options)
            .and_then(|_| self.writer.write_all(&artifact.bytes).map_err(Into::into))
            .map_err(|e| {
                PdfSplitError::ArchiveBuild(format!("adding {}: {}", artifact.file_name, e))
            })?;

        let index = self.added;
        self.added += 1;
        self.tracker.emit(
            progress,
            Stage::Zipping,
            self.added,
            self.total,
            zip_percentage(index, self.total),
            format!("Adding page {}/{} to archive...", self.added, self.total),
        );
        tracing::debug!(member = %artifact.file_name, size = artifact.bytes.len(), "archive member added");
        Ok(())
    }

    /// Compress and close the archive, emitting `zipping` at 98% and `complete` at 100%
    pub fn finish<P: ProgressSink + ?Sized>(
        mut self,
        file_name: String,
        progress: &mut P,
    ) -> Result<ArchiveResult> {
        if self.added != self.total {
            return Err(PdfSplitError::ArchiveBuild(format!(
                "expected {} members, got {}",
                self.total, self.added
            )));
        }

        self.tracker.emit(
            progress,
            Stage::Zipping,
            self.total,
            self.total,
            ZIP_FINALIZE,
            "Compressing archive...",
        );

        let bytes = self
            .writer
            .finish()
            .map_err(|e| PdfSplitError::ArchiveBuild(format!("finalizing archive: {}", e)))?
            .into_inner();

        self.tracker.emit(
            progress,
            Stage::Complete,
            self.total,
            self.total,
            100,
            "Archive ready",
        );
        tracing::info!(archive = %file_name, members = self.total, size = bytes.len(), "archive built");

        Ok(ArchiveResult {
            file_name,
            bytes,
            member_count: self.total,
        })
    }
}

/// Pack `selected` into one ZIP, members in input order.
///
/// When `archive_name` is `None` the name is generated from
/// [`naming::FALLBACK_BASE_NAME`](crate::naming::FALLBACK_BASE_NAME) and the current time.
pub fn archive_pages<P: ProgressSink + ?Sized>(
    selected: &[PageArtifact],
    archive_name: Option<&str>,
    progress: &mut P,
) -> Result<ArchiveResult> {
    archive_pages_with(
        selected,
        archive_name,
        &ArchiveOptions::default(),
        &CancelToken::default(),
        progress,
    )
}

/// [`archive_pages`] with explicit options and a cancellation token
pub fn archive_pages_with<P: ProgressSink + ?Sized>(
    selected: &[PageArtifact],
    archive_name: Option<&str>,
    options: &ArchiveOptions,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<ArchiveResult> {
    let file_name = archive_name
        .map(str::to_string)
        .unwrap_or_else(|| archive_file_name(""));

    let mut builder = ArchiveBuilder::new(selected.len() as u32, options, progress)?
        .with_cancel_token(cancel.clone());
    for artifact in selected {
        builder.add(artifact, progress)?;
    }
    builder.finish(file_name, progress)
}
