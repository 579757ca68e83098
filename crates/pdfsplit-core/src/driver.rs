//! Async drivers that yield to the runtime between pages and members
//!
//! Enabled with the `async` feature. The work per step is unchanged; the
//! drivers only add a `yield_now` after each unit so other tasks (a UI
//! channel, a cancel request) get scheduled during long runs.
//!
//! Tests live in `tests/async_driver.rs` and need the feature:
//! `cargo test -p pdfsplit-core --features async`

use tokio::task::yield_now;

use crate::archive::{ArchiveBuilder, ArchiveResult};
use crate::cancel::CancelToken;
use crate::error::Result;
use crate::naming::archive_file_name;
use crate::options::{ArchiveOptions, SplitOptions};
use crate::progress::{ProgressSink, Stage};
use crate::split::{PageArtifact, PageSplitter};

pub async fn split_document_async<P: ProgressSink + ?Sized>(
    bytes: &[u8],
    source_name: &str,
    options: &SplitOptions,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<Vec<PageArtifact>> {
    cancel.check(Stage::Reading)?;
    let mut splitter = PageSplitter::open(bytes, source_name, options.clone(), progress)?
        .with_cancel_token(cancel.clone());

    let mut artifacts = Vec::with_capacity(splitter.total_pages() as usize);
    while let Some(artifact) = splitter.split_next(progress)? {
        artifacts.push(artifact);
        yield_now().await;
    }
    Ok(artifacts)
}

pub async fn archive_pages_async<P: ProgressSink + ?Sized>(
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
        yield_now().await;
    }
    builder.finish(file_name, progress)
}
