//! Pipeline configuration
//!
//! Every field has a default, so a partial JSON document such as
//! `{"archive": {"compression_level": 9}}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PdfSplitError, Result};

/// Deflate level used when the caller does not choose one
pub const DEFAULT_COMPRESSION_LEVEL: u8 = 6;
pub const MAX_COMPRESSION_LEVEL: u8 = 9;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub split: SplitOptions,
    pub archive: ArchiveOptions,
    pub thumbnail: ThumbnailOptions,
}

impl PipelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| PdfSplitError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.archive.validate()?;
        self.thumbnail.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitOptions {
    /// Flate-compress uncompressed streams in each page artifact
    pub compress_streams: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            compress_streams: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveOptions {
    /// Deflate level, 0 (store) to 9 (smallest)
    pub compression_level: u8,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl ArchiveOptions {
    pub fn with_level(compression_level: u8) -> Self {
        Self { compression_level }
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > MAX_COMPRESSION_LEVEL {
            return Err(PdfSplitError::InvalidConfig(format!(
                "compression level {} is outside 0-{}",
                self.compression_level, MAX_COMPRESSION_LEVEL
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThumbnailOptions {
    /// Upper bound on the render scale; 1.0 is one pixel per PDF point
    pub scale: f32,
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            max_width: 300,
            max_height: 400,
        }
    }
}

impl ThumbnailOptions {
    pub fn validate(&self) -> Result<()> {
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(PdfSplitError::InvalidConfig(format!(
                "thumbnail scale must be positive, got {}",
                self.scale
            )));
        }
        if self.max_width == 0 || self.max_height == 0 {
            return Err(PdfSplitError::InvalidConfig(
                "thumbnail bounds must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
