//! PDF page splitting and ZIP archiving
//!
//! This crate turns one multi-page PDF into independent single-page PDFs and
//! packs a chosen subset of them into a ZIP, entirely in memory using lopdf.
//!
//! - [`split_document`]: one [`PageArtifact`] per page, in page order
//! - [`archive_pages`]: one ZIP from selected artifacts
//! - [`PageSplitter`] / [`ArchiveBuilder`]: the same work one unit per call,
//!   for hosts that must yield between pages (browser event loop, async runtime)
//!
//! Both stages report through a [`ProgressSink`] and honour a [`CancelToken`].

pub mod archive;
pub mod cancel;
#[cfg(feature = "async")]
pub mod driver;
pub mod error;
pub mod info;
pub mod naming;
pub mod options;
pub mod page_info;
pub mod progress;
pub mod selection;
pub mod split;
pub mod thumbnail;

#[cfg(test)]
mod fixtures;

pub use archive::{archive_pages, archive_pages_with, ArchiveBuilder, ArchiveResult};
pub use cancel::CancelToken;
#[cfg(feature = "async")]
pub use driver::{archive_pages_async, split_document_async};
pub use error::{ErrorKind, PdfSplitError, Result};
pub use info::{document_info, document_info_of, get_page_count, DocumentInfo};
pub use naming::{archive_file_name, base_name, page_file_name};
pub use options::{ArchiveOptions, PipelineConfig, SplitOptions, ThumbnailOptions};
pub use page_info::{all_page_geometry, PageGeometry, PageOrientation};
pub use progress::{NoProgress, ProgressEvent, ProgressSink, Stage};
pub use selection::{parse_ranges, parse_ranges_within, select_pages};
pub use split::{split_document, split_document_with, PageArtifact, PageSplitter, SourceDocument};
pub use thumbnail::{
    generate_thumbnails, placeholder, NoRasterizer, Thumbnail, ThumbnailError, ThumbnailOutcome,
    ThumbnailRenderer,
};
