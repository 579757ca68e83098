//! Stateful split session
//!
//! Holds the uploaded document, the split pages, the selection and the last
//! archive in Rust memory. Long work is driven one unit per call
//! (`step` / `archiveStep`) so JavaScript can hand control back to the
//! browser between pages and keep the progress bar painting.
//!
//! ```text
//! idle --load--> splitting --step..--> ready --startArchive--> archiving --archiveStep..--> ready
//!   ^                |                   |                          |
//!   +---- reset / failure / cancel ------+------ failure / cancel --+ (back to ready)
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use pdfsplit_core::thumbnail::thumbnail_for;
use pdfsplit_core::{
    all_page_geometry, archive_file_name, document_info_of, generate_thumbnails,
    parse_ranges_within, placeholder, ArchiveBuilder, ArchiveOptions, ArchiveResult,
    CancelToken, DocumentInfo, NoRasterizer, PageArtifact, PageGeometry, PageOrientation,
    PageSplitter, PdfSplitError, PipelineConfig, ProgressEvent, ProgressSink, ThumbnailError,
    ThumbnailOutcome,
};
use serde::Serialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;

use crate::validation::{quick_validate, UploadError};
use crate::{to_js, to_js_error, ErrorPayload};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Pipeline(#[from] PdfSplitError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Cannot {action} while the session is {state}")]
    WrongState {
        action: &'static str,
        state: SessionState,
    },

    #[error("Page {0} does not exist")]
    UnknownPage(u32),

    #[error("Preview failed: {0}")]
    Preview(#[from] ThumbnailError),
}

impl From<SessionError> for JsValue {
    fn from(err: SessionError) -> Self {
        to_js_error(&ErrorPayload::from(&err))
    }
}

/// Where the session is in its lifecycle
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Splitting,
    Ready,
    Archiving,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Splitting => "splitting",
            SessionState::Ready => "ready",
            SessionState::Archiving => "archiving",
        })
    }
}

/// Work in flight
enum Job {
    None,
    Split(PageSplitter),
    Archive {
        builder: ArchiveBuilder,
        queue: Vec<usize>,
        next: usize,
        file_name: String,
    },
}

/// Forwards progress events to the JavaScript callback as plain objects
struct JsProgress(Option<js_sys::Function>);

impl ProgressSink for JsProgress {
    fn report(&mut self, event: ProgressEvent) {
        if let Some(ref callback) = self.0 {
            if let Ok(value) = serde_wasm_bindgen::to_value(&event) {
                let _ = callback.call1(&JsValue::null(), &value);
            }
        }
    }
}

/// One row of the page grid
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub page_number: u32,
    pub file_name: String,
    pub size_bytes: usize,
    pub selected: bool,
    pub width: f32,
    pub height: f32,
    pub rotation: i32,
    pub orientation: PageOrientation,
}

/// Stateful split session that holds the document and its pages in Rust memory
#[wasm_bindgen]
pub struct SplitSession {
    config: PipelineConfig,
    source_name: String,
    info: Option<DocumentInfo>,
    geometry: Vec<PageGeometry>,
    pages: Vec<PageArtifact>,
    selected: BTreeSet<u32>,
    thumbnails: BTreeMap<u32, ThumbnailOutcome>,
    archive: Option<ArchiveResult>,
    job: Job,
    cancel: CancelToken,
    progress_callback: Option<js_sys::Function>,
}

impl Default for SplitSession {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl SplitSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source_name: String::new(),
            info: None,
            geometry: Vec::new(),
            pages: Vec::new(),
            selected: BTreeSet::new(),
            thumbnails: BTreeMap::new(),
            archive: None,
            job: Job::None,
            cancel: CancelToken::new(),
            progress_callback: None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn state(&self) -> SessionState {
        match self.job {
            Job::Split(_) => SessionState::Splitting,
            Job::Archive { .. } => SessionState::Archiving,
            Job::None if self.pages.is_empty() => SessionState::Idle,
            Job::None => SessionState::Ready,
        }
    }

    /// Set a progress callback function
    /// Callback signature: (event: { stage, currentUnit, totalUnits, percentage, message }) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    /// Replace the pipeline configuration from a JSON document
    pub fn configure(&mut self, json: &str) -> Result<(), JsValue> {
        self.config = PipelineConfig::from_json_str(json).map_err(SessionError::from)?;
        Ok(())
    }

    #[wasm_bindgen(js_name = setCompressionLevel)]
    pub fn set_compression_level(&mut self, level: u8) -> Result<(), JsValue> {
        let archive = ArchiveOptions::with_level(level);
        archive.validate().map_err(SessionError::from)?;
        self.config.archive = archive;
        Ok(())
    }

    /// Validate and open a document, then wait for `step` calls.
    /// Returns document info on success.
    pub fn load(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let mut progress = self.js_progress();
        let info = self.load_internal(name, bytes, &mut progress)?;
        to_js(&info)
    }

    /// Split the next page. Returns `false` once every page is split.
    pub fn step(&mut self) -> Result<bool, JsValue> {
        let mut progress = self.js_progress();
        Ok(self.step_internal(&mut progress)?)
    }

    /// Split every remaining page without yielding
    #[wasm_bindgen(js_name = splitAll)]
    pub fn split_all(&mut self) -> Result<(), JsValue> {
        let mut progress = self.js_progress();
        Ok(self.split_all_internal(&mut progress)?)
    }

    #[wasm_bindgen(js_name = getDocumentInfo)]
    pub fn get_document_info(&self) -> Result<JsValue, JsValue> {
        to_js(&self.info)
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    #[wasm_bindgen(js_name = getPages)]
    pub fn get_pages(&self) -> Result<JsValue, JsValue> {
        to_js(&self.page_summaries())
    }

    #[wasm_bindgen(js_name = getPageInfo)]
    pub fn get_page_info(&self, page_number: u32) -> Result<JsValue, JsValue> {
        let geometry = self
            .geometry
            .iter()
            .find(|g| g.page_number == page_number)
            .ok_or(SessionError::UnknownPage(page_number))?;
        to_js(geometry)
    }

    /// Set page selection from range text like "1-3, 5, 8-10"
    #[wasm_bindgen(js_name = setPageSelection)]
    pub fn set_page_selection(&mut self, range_str: &str) -> Result<(), JsValue> {
        Ok(self.set_page_selection_internal(range_str)?)
    }

    /// Flip one page's selection; returns whether it is now selected
    #[wasm_bindgen(js_name = togglePage)]
    pub fn toggle_page(&mut self, page_number: u32) -> Result<bool, JsValue> {
        Ok(self.toggle_page_internal(page_number)?)
    }

    #[wasm_bindgen(js_name = selectAll)]
    pub fn select_all(&mut self) {
        self.selected = self.pages.iter().map(|p| p.page_number).collect();
    }

    #[wasm_bindgen(js_name = clearSelection)]
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    #[wasm_bindgen(js_name = getSelectedPages)]
    pub fn get_selected_pages(&self) -> Vec<u32> {
        self.selected.iter().copied().collect()
    }

    /// Bytes of one split page, for a single-page download
    #[wasm_bindgen(js_name = getPageBytes)]
    pub fn get_page_bytes(&self, page_number: u32) -> Result<js_sys::Uint8Array, JsValue> {
        Ok(to_uint8_array(&self.page(page_number)?.bytes))
    }

    #[wasm_bindgen(js_name = getPageFileName)]
    pub fn get_page_file_name(&self, page_number: u32) -> Result<String, JsValue> {
        Ok(self.page(page_number)?.file_name.clone())
    }

    /// Begin zipping the selected pages; drive with `archiveStep`
    #[wasm_bindgen(js_name = startArchive)]
    pub fn start_archive(&mut self) -> Result<(), JsValue> {
        let mut progress = self.js_progress();
        Ok(self.start_archive_internal(&mut progress)?)
    }

    /// Add the next member, or finish the archive. Returns `false` when done.
    #[wasm_bindgen(js_name = archiveStep)]
    pub fn archive_step(&mut self) -> Result<bool, JsValue> {
        let mut progress = self.js_progress();
        Ok(self.archive_step_internal(&mut progress)?)
    }

    /// Zip the selected pages in one call
    #[wasm_bindgen(js_name = buildArchive)]
    pub fn build_archive(&mut self) -> Result<js_sys::Uint8Array, JsValue> {
        let mut progress = self.js_progress();
        let archive = self.build_archive_internal(&mut progress)?;
        Ok(to_uint8_array(&archive.bytes))
    }

    /// Bytes of the finished archive; releases them from the session
    #[wasm_bindgen(js_name = takeArchive)]
    pub fn take_archive(&mut self) -> Option<js_sys::Uint8Array> {
        self.archive
            .as_mut()
            .map(|archive| to_uint8_array(&std::mem::take(&mut archive.bytes)))
    }

    #[wasm_bindgen(js_name = archiveFileName)]
    pub fn archive_file_name(&self) -> Option<String> {
        self.archive.as_ref().map(|a| a.file_name.clone())
    }

    /// Preview of one page as a `data:image/png;base64,` URL, or `undefined`
    /// when no rasterizer is available
    #[wasm_bindgen(js_name = getThumbnail)]
    pub fn get_thumbnail(&mut self, page_number: u32) -> Result<Option<String>, JsValue> {
        Ok(self.thumbnail_internal(page_number)?)
    }

    /// Empty page outline at the page's displayed aspect ratio, as a data URL.
    /// For sizing grid tiles; shows no page content.
    #[wasm_bindgen(js_name = getPlaceholder)]
    pub fn get_placeholder(&self, page_number: u32) -> Result<String, JsValue> {
        Ok(self.placeholder_internal(page_number)?)
    }

    /// Previews for every page as `{ [pageNumber]: dataUrl | null }`.
    /// Callback signature: (current: number, total: number) => void
    #[wasm_bindgen(js_name = generateThumbnails)]
    pub fn generate_thumbnails(
        &mut self,
        callback: Option<js_sys::Function>,
    ) -> Result<JsValue, JsValue> {
        let urls = self.generate_thumbnails_internal(|current, total| {
            if let Some(ref callback) = callback {
                let _ = callback.call2(
                    &JsValue::null(),
                    &JsValue::from(current),
                    &JsValue::from(total),
                );
            }
        });
        to_js(&urls)
    }

    /// Ask the running split or archive to stop at its next step
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Drop the document, pages and archive and return to idle
    pub fn reset(&mut self) {
        let config = std::mem::take(&mut self.config);
        let progress_callback = self.progress_callback.take();
        *self = Self {
            config,
            progress_callback,
            ..Self::new()
        };
    }
}

impl SplitSession {
    fn js_progress(&self) -> JsProgress {
        JsProgress(self.progress_callback.clone())
    }

    fn wrong_state(&self, action: &'static str) -> SessionError {
        SessionError::WrongState {
            action,
            state: self.state(),
        }
    }

    fn page(&self, page_number: u32) -> Result<&PageArtifact, SessionError> {
        self.pages
            .iter()
            .find(|p| p.page_number == page_number)
            .ok_or(SessionError::UnknownPage(page_number))
    }

    /// A fresh token for a new run, unless the current one is still untripped
    fn arm_cancel_token(&mut self) -> CancelToken {
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
        self.cancel.clone()
    }

    fn load_internal<P: ProgressSink + ?Sized>(
        &mut self,
        name: &str,
        bytes: &[u8],
        progress: &mut P,
    ) -> Result<DocumentInfo, SessionError> {
        if matches!(self.state(), SessionState::Splitting | SessionState::Archiving) {
            return Err(self.wrong_state("load a document"));
        }
        self.reset();

        // header and trailer only; the one full parse happens in open
        quick_validate(bytes)?;
        let cancel = self.arm_cancel_token();
        let splitter = PageSplitter::open(bytes, name, self.config.split.clone(), progress)?
            .with_cancel_token(cancel);

        let document = splitter.source().document();
        let info = document_info_of(document, bytes.len());
        self.geometry = all_page_geometry(document)?;
        self.source_name = name.to_string();
        self.info = Some(info.clone());
        self.job = Job::Split(splitter);
        Ok(info)
    }

    fn step_internal<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<bool, SessionError> {
        let state = self.state();
        let Job::Split(splitter) = &mut self.job else {
            return Err(SessionError::WrongState {
                action: "split",
                state,
            });
        };

        match splitter.split_next(progress) {
            Ok(Some(artifact)) => {
                self.pages.push(artifact);
                Ok(true)
            }
            Ok(None) => {
                self.job = Job::None;
                self.select_all();
                Ok(false)
            }
            Err(e) => {
                // no partial page sets
                self.reset();
                Err(e.into())
            }
        }
    }

    fn split_all_internal<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<(), SessionError> {
        while self.step_internal(progress)? {}
        Ok(())
    }

    fn require_ready(&self, action: &'static str) -> Result<(), SessionError> {
        if self.state() != SessionState::Ready {
            return Err(self.wrong_state(action));
        }
        Ok(())
    }

    fn set_page_selection_internal(&mut self, range_str: &str) -> Result<(), SessionError> {
        self.require_ready("select pages")?;
        let pages = parse_ranges_within(range_str, self.pages.len() as u32)?;
        self.selected = pages.into_iter().collect();
        Ok(())
    }

    fn toggle_page_internal(&mut self, page_number: u32) -> Result<bool, SessionError> {
        self.page(page_number)?;
        if self.selected.remove(&page_number) {
            Ok(false)
        } else {
            self.selected.insert(page_number);
            Ok(true)
        }
    }

    fn page_summaries(&self) -> Vec<PageSummary> {
        self.pages
            .iter()
            .zip(&self.geometry)
            .map(|(page, geometry)| PageSummary {
                page_number: page.page_number,
                file_name: page.file_name.clone(),
                size_bytes: page.size_bytes(),
                selected: self.selected.contains(&page.page_number),
                width: geometry.width,
                height: geometry.height,
                rotation: geometry.rotation,
                orientation: geometry.orientation,
            })
            .collect()
    }

    fn start_archive_internal<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<(), SessionError> {
        self.require_ready("build an archive")?;

        let queue: Vec<usize> = self
            .pages
            .iter()
            .enumerate()
            .filter(|(_, page)| self.selected.contains(&page.page_number))
            .map(|(index, _)| index)
            .collect();

        let cancel = self.arm_cancel_token();
        let builder = ArchiveBuilder::new(queue.len() as u32, &self.config.archive, progress)?
            .with_cancel_token(cancel);

        self.archive = None;
        self.job = Job::Archive {
            builder,
            queue,
            next: 0,
            file_name: archive_file_name(&self.source_name),
        };
        Ok(())
    }

    fn archive_step_internal<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<bool, SessionError> {
        let state = self.state();
        let Job::Archive {
            builder,
            queue,
            next,
            ..
        } = &mut self.job
        else {
            return Err(SessionError::WrongState {
                action: "add to the archive",
                state,
            });
        };

        if let Some(&index) = queue.get(*next) {
            return match builder.add(&self.pages[index], progress) {
                Ok(()) => {
                    *next += 1;
                    Ok(true)
                }
                Err(e) => {
                    // pages survive; the selection can be zipped again
                    self.job = Job::None;
                    Err(e.into())
                }
            };
        }

        let Job::Archive {
            builder, file_name, ..
        } = std::mem::replace(&mut self.job, Job::None)
        else {
            return Ok(false);
        };
        self.archive = Some(builder.finish(file_name, progress)?);
        Ok(false)
    }

    fn build_archive_internal<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<&ArchiveResult, SessionError> {
        self.start_archive_internal(progress)?;
        while self.archive_step_internal(progress)? {}
        self.archive
            .as_ref()
            .ok_or_else(|| self.wrong_state("read the archive"))
    }

    fn thumbnail_internal(&mut self, page_number: u32) -> Result<Option<String>, SessionError> {
        let artifact = self
            .pages
            .iter()
            .find(|p| p.page_number == page_number)
            .ok_or(SessionError::UnknownPage(page_number))?;
        let options = &self.config.thumbnail;
        let outcome = self
            .thumbnails
            .entry(page_number)
            .or_insert_with(|| thumbnail_for(&NoRasterizer, artifact, options));
        Ok(outcome.thumbnail().map(|t| t.to_data_url()))
    }

    fn placeholder_internal(&self, page_number: u32) -> Result<String, SessionError> {
        let tile = placeholder(self.page(page_number)?, &self.config.thumbnail)?;
        Ok(tile.to_data_url())
    }

    fn generate_thumbnails_internal<F: FnMut(u32, u32)>(
        &mut self,
        on_progress: F,
    ) -> BTreeMap<u32, Option<String>> {
        self.thumbnails = generate_thumbnails(
            &NoRasterizer,
            &self.pages,
            &self.config.thumbnail,
            on_progress,
        );
        self.thumbnails
            .iter()
            .map(|(&page, outcome)| (page, outcome.thumbnail().map(|t| t.to_data_url())))
            .collect()
    }
}

fn to_uint8_array(bytes: &[u8]) -> js_sys::Uint8Array {
    let array = js_sys::Uint8Array::new_with_length(bytes.len() as u32);
    array.copy_from(bytes);
    array
}
