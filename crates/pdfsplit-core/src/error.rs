use serde::Serialize;
use thiserror::Error;

use crate::progress::Stage;

pub type Result<T> = std::result::Result<T, PdfSplitError>;

#[derive(Error, Debug)]
pub enum PdfSplitError {
    #[error("Split failed: could not parse PDF: {0}")]
    DocumentParse(String),

    #[error("Split failed: PDF has no pages")]
    EmptyDocument,

    #[error("Split failed: could not extract page {page}: {reason}")]
    PageSerialization { page: u32, reason: String },

    #[error("Archive failed: {0}")]
    ArchiveBuild(String),

    #[error("Archive failed: no pages selected")]
    EmptySelection,

    #[error("{stage} cancelled")]
    Cancelled { stage: Stage },

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Coarse error classification for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DocumentParse,
    EmptyDocument,
    PageSerialization,
    ArchiveBuild,
    EmptySelection,
    Cancelled,
    InvalidRange,
    InvalidConfig,
}

impl PdfSplitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DocumentParse(_) => ErrorKind::DocumentParse,
            Self::EmptyDocument => ErrorKind::EmptyDocument,
            Self::PageSerialization { .. } => ErrorKind::PageSerialization,
            Self::ArchiveBuild(_) => ErrorKind::ArchiveBuild,
            Self::EmptySelection => ErrorKind::EmptySelection,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::InvalidRange(_) => ErrorKind::InvalidRange,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
        }
    }

    /// Pipeline stage the failure belongs to. Range parsing and configuration
    /// happen before either stage runs and have none.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::DocumentParse(_) | Self::EmptyDocument => Some(Stage::Reading),
            Self::PageSerialization { .. } => Some(Stage::Splitting),
            Self::ArchiveBuild(_) | Self::EmptySelection => Some(Stage::Zipping),
            Self::Cancelled { stage } => Some(*stage),
            Self::InvalidRange(_) | Self::InvalidConfig(_) => None,
        }
    }

    /// Whether running the same request again could succeed without new input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ArchiveBuild(_) | Self::Cancelled { .. })
    }
}
