//! PDF Split algorithm
//!
//! Turns one N-page PDF into N independent single-page PDFs using
//! "Construction by Whitelist":
//! 1. Materialize attributes the page inherits from the page tree
//! 2. Traverse the dependency graph from the page to find every required object
//! 3. Copy only those objects into a fresh document
//! 4. Give the copy its own one-page tree and catalog
//!
//! The splitter is a step-wise producer: [`PageSplitter::split_next`] handles
//! exactly one page, so a caller can yield to its event loop between pages.

use std::collections::{BTreeSet, HashSet};

use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::error::{PdfSplitError, Result};
use crate::naming::page_file_name;
use crate::options::SplitOptions;
use crate::page_info::{inherited_attribute, INHERITABLE_KEYS};
use crate::progress::{split_percentage, ProgressSink, ProgressTracker, Stage, READ_DONE, SPLIT_DONE};

/// One split page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageArtifact {
    /// 1-based, contiguous within a split
    pub page_number: u32,
    /// A complete single-page PDF, independent of the source buffer
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub file_name: String,
}

impl PageArtifact {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// A parsed, read-only source document with at least one page
#[derive(Debug)]
pub struct SourceDocument {
    doc: Document,
    page_ids: Vec<ObjectId>,
    /// Page and Pages nodes; never copied into a page artifact
    tree_nodes: HashSet<ObjectId>,
}

impl SourceDocument {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).map_err(|e| {
            tracing::warn!(size = bytes.len(), error = %e, "rejected unparsable input");
            PdfSplitError::DocumentParse(e.to_string())
        })?;

        if doc.is_encrypted() {
            return Err(PdfSplitError::DocumentParse(
                "document is password-protected".into(),
            ));
        }

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(PdfSplitError::EmptyDocument);
        }

        let tree_nodes = doc
            .objects
            .iter()
            .filter(|(_, object)| is_page_tree_node(object))
            .map(|(id, _)| *id)
            .chain(page_ids.iter().copied())
            .collect();

        Ok(Self {
            doc,
            page_ids,
            tree_nodes,
        })
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Build and serialize a standalone PDF holding only `page_number` (1-based)
    pub fn extract_page(&self, page_number: u32, options: &SplitOptions) -> Result<Vec<u8>> {
        let fail = |reason: String| PdfSplitError::PageSerialization {
            page: page_number,
            reason,
        };

        let page_id = page_number
            .checked_sub(1)
            .and_then(|index| self.page_ids.get(index as usize))
            .copied()
            .ok_or_else(|| {
                PdfSplitError::InvalidRange(format!(
                    "Page {} does not exist (document has {} pages)",
                    page_number,
                    self.page_count()
                ))
            })?;

        let source_page = self
            .doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| fail(format!("page object unreadable: {}", e)))?;

        let mut page = source_page.clone();
        for key in INHERITABLE_KEYS {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(&self.doc, source_page, key) {
                    page.set(key.to_vec(), value.clone());
                }
            }
        }
        page.remove(b"Parent");

        let info = self.doc.trailer.get(b"Info").ok().cloned();

        let mut out = Document::with_version(self.doc.version.clone());
        let mut pending = Vec::new();
        for (_, value) in page.iter() {
            collect_references(value, &mut pending);
        }
        if let Some(info) = &info {
            collect_references(info, &mut pending);
        }

        let mut visited = BTreeSet::new();
        while let Some(id) = pending.pop() {
            if self.tree_nodes.contains(&id) || !visited.insert(id) {
                continue;
            }
            if let Ok(object) = self.doc.get_object(id) {
                collect_references(object, &mut pending);
                out.objects.insert(id, object.clone());
            }
        }

        out.max_id = self.doc.max_id;
        let pages_id = out.new_object_id();
        page.set("Parent", Object::Reference(pages_id));
        out.objects.insert(page_id, Object::Dictionary(page));
        out.objects.insert(
            pages_id,
            Object::Dictionary(Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Pages".to_vec())),
                ("Count", Object::Integer(1)),
                ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ])),
        );
        let catalog_id = out.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        out.trailer.set("Root", Object::Reference(catalog_id));
        if let Some(info) = info {
            out.trailer.set("Info", info);
        }

        // links to other pages would otherwise point at nothing after renumbering
        let kept: BTreeSet<ObjectId> = out.objects.keys().copied().collect();
        for object in out.objects.values_mut() {
            drop_dangling(object, &kept);
        }
        for (_, value) in out.trailer.iter_mut() {
            drop_dangling(value, &kept);
        }

        out.renumber_objects();
        if options.compress_streams {
            out.compress();
        }

        let mut buffer = Vec::new();
        out.save_to(&mut buffer)
            .map_err(|e| fail(format!("save failed: {}", e)))?;

        Ok(buffer)
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    object
        .as_dict()
        .and_then(|dict| dict.get(b"Type"))
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

/// Push every indirect reference reachable inside `object` without following them
fn collect_references(object: &Object, out: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => out.push(*id),
        Object::Array(items) => items.iter().for_each(|item| collect_references(item, out)),
        Object::Dictionary(dict) => dict.iter().for_each(|(_, v)| collect_references(v, out)),
        Object::Stream(stream) => stream
            .dict
            .iter()
            .for_each(|(_, v)| collect_references(v, out)),
        _ => {}
    }
}

/// Replace references to objects that were not copied with `null`
fn drop_dangling(object: &mut Object, kept: &BTreeSet<ObjectId>) {
    match object {
        Object::Reference(id) if !kept.contains(id) => *object = Object::Null,
        Object::Array(items) => items.iter_mut().for_each(|item| drop_dangling(item, kept)),
        Object::Dictionary(dict) => dict.iter_mut().for_each(|(_, v)| drop_dangling(v, kept)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, v)| drop_dangling(v, kept)),
        _ => {}
    }
}

/// Step-wise splitter over a parsed document
pub struct PageSplitter {
    source: SourceDocument,
    source_name: String,
    options: SplitOptions,
    cancel: CancelToken,
    tracker: ProgressTracker,
    next_index: u32,
    finished: bool,
}

impl PageSplitter {
    /// Parse `bytes` and report the `reading` stage.
    ///
    /// Emits `reading` at 0% before parsing and at 10% once the page count is
    /// known. Unparsable input fails after the first event only.
    pub fn open<P: ProgressSink + ?Sized>(
        bytes: &[u8],
        source_name: &str,
        options: SplitOptions,
        progress: &mut P,
    ) -> Result<Self> {
        let mut tracker = ProgressTracker::default();
        tracker.emit(progress, Stage::Reading, 0, 0, 0, "Reading PDF file...");

        let source = SourceDocument::parse(bytes)?;
        let total = source.page_count();
        tracing::info!(source = source_name, pages = total, "document loaded");

        tracker.emit(
            progress,
            Stage::Reading,
            0,
            total,
            READ_DONE,
            format!("Found {} pages", total),
        );

        Ok(Self {
            source,
            source_name: source_name.to_string(),
            options,
            cancel: CancelToken::default(),
            tracker,
            next_index: 0,
            finished: false,
        })
    }

    /// Poll `token` before every page
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn total_pages(&self) -> u32 {
        self.source.page_count()
    }

    pub fn pages_done(&self) -> u32 {
        self.next_index
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn source(&self) -> &SourceDocument {
        &self.source
    }

    /// Produce the next page, or `None` once every page has been produced.
    ///
    /// The call that observes the end emits the closing `splitting` event at 90%.
    /// After an error the splitter is exhausted.
    pub fn split_next<P: ProgressSink + ?Sized>(
        &mut self,
        progress: &mut P,
    ) -> Result<Option<PageArtifact>> {
        if self.finished {
            return Ok(None);
        }

        let total = self.total_pages();
        if self.next_index == total {
            self.finished = true;
            self.tracker.emit(
                progress,
                Stage::Splitting,
                total,
                total,
                SPLIT_DONE,
                "All pages split",
            );
            tracing::info!(source = %self.source_name, pages = total, "split complete");
            return Ok(None);
        }

        match self.produce(self.next_index, progress) {
            Ok(artifact) => {
                self.next_index += 1;
                Ok(Some(artifact))
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    fn produce<P: ProgressSink + ?Sized>(
        &mut self,
        index: u32,
        progress: &mut P,
    ) -> Result<PageArtifact> {
        self.cancel.check(Stage::Splitting)?;

        let total = self.total_pages();
        let page_number = index + 1;
        let bytes = self.source.extract_page(page_number, &self.options)?;

        self.tracker.emit(
            progress,
            Stage::Splitting,
            page_number,
            total,
            split_percentage(index, total),
            format!("Splitting page {}/{}...", page_number, total),
        );
        tracing::debug!(page = page_number, size = bytes.len(), "page extracted");

        Ok(PageArtifact {
            page_number,
            bytes,
            file_name: page_file_name(&self.source_name, page_number),
        })
    }

    /// Drive the splitter to completion. All-or-nothing.
    pub fn run<P: ProgressSink + ?Sized>(mut self, progress: &mut P) -> Result<Vec<PageArtifact>> {
        let mut artifacts = Vec::with_capacity(self.total_pages() as usize);
        while let Some(artifact) = self.split_next(progress)? {
            artifacts.push(artifact);
        }
        Ok(artifacts)
    }
}

/// Split a PDF into one single-page PDF per page, in page order
pub fn split_document<P: ProgressSink + ?Sized>(
    bytes: &[u8],
    source_name: &str,
    progress: &mut P,
) -> Result<Vec<PageArtifact>> {
    split_document_with(
        bytes,
        source_name,
        &SplitOptions::default(),
        &CancelToken::default(),
        progress,
    )
}

/// [`split_document`] with explicit options and a cancellation token
pub fn split_document_with<P: ProgressSink + ?Sized>(
    bytes: &[u8],
    source_name: &str,
    options: &SplitOptions,
    cancel: &CancelToken,
    progress: &mut P,
) -> Result<Vec<PageArtifact>> {
    cancel.check(Stage::Reading)?;
    PageSplitter::open(bytes, source_name, options.clone(), progress)?
        .with_cancel_token(cancel.clone())
        .run(progress)
}
