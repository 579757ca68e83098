//! Optional page previews
//!
//! Thumbnails are a side service: a renderer failure turns into
//! [`ThumbnailOutcome::Unavailable`] and never reaches the split or archive
//! stages. No rasterizer ships with the crate: [`NoRasterizer`] reports every
//! page as unavailable, and hosts with one plug it in as a [`ThumbnailRenderer`].
//! [`placeholder`] draws an empty page outline at the displayed aspect ratio
//! for skeleton tiles; it is never reported as a rendered preview.

use std::collections::BTreeMap;

use base64::Engine;
use lopdf::Document;
use thiserror::Error;

use crate::options::ThumbnailOptions;
use crate::page_info::PageGeometry;
use crate::split::PageArtifact;

#[derive(Error, Debug)]
pub enum ThumbnailError {
    #[error("page could not be read: {0}")]
    Unreadable(String),

    #[error("image encoding failed: {0}")]
    Encode(String),

    #[error("no page rasterizer available")]
    NoRasterizer,
}

/// A rendered preview, PNG encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub page_number: u32,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl Thumbnail {
    /// `data:image/png;base64,...`, ready for an `<img src>`
    pub fn to_data_url(&self) -> String {
        let engine = base64::engine::general_purpose::STANDARD;
        format!("data:image/png;base64,{}", engine.encode(&self.png))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbnailOutcome {
    Ready(Thumbnail),
    Unavailable { reason: String },
}

impl ThumbnailOutcome {
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        match self {
            ThumbnailOutcome::Ready(thumbnail) => Some(thumbnail),
            ThumbnailOutcome::Unavailable { .. } => None,
        }
    }
}

pub trait ThumbnailRenderer {
    fn render(
        &self,
        artifact: &PageArtifact,
        options: &ThumbnailOptions,
    ) -> Result<Thumbnail, ThumbnailError>;
}

/// Pixel size for a page of `width` x `height` points: the largest scale that
/// fits `max_width` x `max_height` without exceeding `options.scale`
pub fn fit_dimensions(width: f32, height: f32, options: &ThumbnailOptions) -> (u32, u32) {
    if width <= 0.0 || height <= 0.0 {
        return (options.max_width.max(1), options.max_height.max(1));
    }
    let scale = (options.max_width as f32 / width)
        .min(options.max_height as f32 / height)
        .min(options.scale);
    let px = |points: f32| ((points * scale).round() as u32).max(1);
    (px(width), px(height))
}

const PAPER: [u8; 3] = [0xff, 0xff, 0xff];
const EDGE: [u8; 3] = [0xb0, 0xb0, 0xb0];

/// Renderer for hosts without a rasterizer; every page is unavailable
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRasterizer;

impl ThumbnailRenderer for NoRasterizer {
    fn render(&self, _: &PageArtifact, _: &ThumbnailOptions) -> Result<Thumbnail, ThumbnailError> {
        Err(ThumbnailError::NoRasterizer)
    }
}

/// Blank page outline at the artifact's displayed size.
///
/// Carries no page content; use it to size a tile while no preview exists.
pub fn placeholder(
    artifact: &PageArtifact,
    options: &ThumbnailOptions,
) -> Result<Thumbnail, ThumbnailError> {
    let doc =
        Document::load_mem(&artifact.bytes).map_err(|e| ThumbnailError::Unreadable(e.to_string()))?;
    let geometry =
        PageGeometry::from_document(&doc, 1).map_err(|e| ThumbnailError::Unreadable(e.to_string()))?;

    let (page_width, page_height) = geometry.display_size();
    let (width, height) = fit_dimensions(page_width, page_height, options);

    let mut pixels = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let on_edge = x == 0 || y == 0 || x + 1 == width || y + 1 == height;
            pixels.extend_from_slice(if on_edge { &EDGE } else { &PAPER });
        }
    }

    Ok(Thumbnail {
        page_number: artifact.page_number,
        width,
        height,
        png: encode_png(width, height, &pixels)?,
    })
}

fn encode_png(width: u32, height: u32, rgb: &[u8]) -> Result<Vec<u8>, ThumbnailError> {
    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder
            .write_header()
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
        writer
            .write_image_data(rgb)
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
        writer
            .finish()
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;
    }
    Ok(buffer)
}

/// Render one preview; failures become `Unavailable`
pub fn thumbnail_for<R: ThumbnailRenderer + ?Sized>(
    renderer: &R,
    artifact: &PageArtifact,
    options: &ThumbnailOptions,
) -> ThumbnailOutcome {
    match renderer.render(artifact, options) {
        Ok(thumbnail) => ThumbnailOutcome::Ready(thumbnail),
        Err(ThumbnailError::NoRasterizer) => {
            tracing::debug!(page = artifact.page_number, "no rasterizer, thumbnail skipped");
            ThumbnailOutcome::Unavailable {
                reason: ThumbnailError::NoRasterizer.to_string(),
            }
        }
        Err(e) => {
            tracing::warn!(page = artifact.page_number, error = %e, "thumbnail unavailable");
            ThumbnailOutcome::Unavailable {
                reason: e.to_string(),
            }
        }
    }
}

/// Previews for every artifact keyed by page number, reporting `(done, total)`
pub fn generate_thumbnails<R, F>(
    renderer: &R,
    artifacts: &[PageArtifact],
    options: &ThumbnailOptions,
    mut on_progress: F,
) -> BTreeMap<u32, ThumbnailOutcome>
where
    R: ThumbnailRenderer + ?Sized,
    F: FnMut(u32, u32),
{
    let total = artifacts.len() as u32;
    let mut thumbnails = BTreeMap::new();
    for (done, artifact) in (1..).zip(artifacts) {
        thumbnails.insert(
            artifact.page_number,
            thumbnail_for(renderer, artifact, options),
        );
        on_progress(done, total);
    }
    thumbnails
}
