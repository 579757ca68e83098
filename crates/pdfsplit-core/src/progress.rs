//! Progress events shared by the split and archive stages
//!
//! Both stages report into one percentage space so a single progress bar can
//! follow the whole pipeline:
//!
//! ```text
//! reading    0 ..= 10
//! splitting 10 ..= 90
//! zipping   90 ..= 98
//! complete        100
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline phase a progress event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Reading,
    Splitting,
    Zipping,
    Complete,
}

impl Stage {
    /// Inclusive percentage bounds owned by this stage
    pub fn bounds(self) -> (u8, u8) {
        match self {
            Stage::Reading => (0, READ_DONE),
            Stage::Splitting => (READ_DONE, SPLIT_DONE),
            Stage::Zipping => (SPLIT_DONE, ZIP_FINALIZE),
            Stage::Complete => (100, 100),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Reading => "reading",
            Stage::Splitting => "splitting",
            Stage::Zipping => "zipping",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) const READ_DONE: u8 = 10;
pub(crate) const SPLIT_DONE: u8 = 90;
pub(crate) const ZIP_FINALIZE: u8 = 98;

/// Snapshot of pipeline state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    pub stage: Stage,
    pub current_unit: u32,
    pub total_units: u32,
    /// 0..=100, never decreasing within one run
    pub percentage: u8,
    /// Human readable, never parsed
    pub message: String,
}

/// Receiver of progress events.
///
/// Implemented for any `FnMut(ProgressEvent)` closure, so a channel sender
/// can be wrapped as `|event| { let _ = tx.send(event); }`.
pub trait ProgressSink {
    fn report(&mut self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event, for callers that do not display progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// Percentage for the splitting event of zero-based page `index`.
///
/// `10 + floor(index / total * 80)`, so always in `[10, 90)`.
pub fn split_percentage(index: u32, total: u32) -> u8 {
    scaled(READ_DONE, SPLIT_DONE - READ_DONE, index, total)
}

/// Percentage reported after inserting zero-based archive member `index`.
///
/// `90 + floor(index / total * 8)`, so always in `[90, 98)`.
pub fn zip_percentage(index: u32, total: u32) -> u8 {
    scaled(SPLIT_DONE, ZIP_FINALIZE - SPLIT_DONE, index, total)
}

fn scaled(base: u8, span: u8, index: u32, total: u32) -> u8 {
    if total == 0 {
        return base;
    }
    let index = u64::from(index.min(total));
    let offset = index * u64::from(span) / u64::from(total);
    base + offset.min(u64::from(span)) as u8
}

/// Keeps the percentages handed to a sink monotonic across one stage run
#[derive(Debug, Default, Clone)]
pub(crate) struct ProgressTracker {
    last: u8,
}

impl ProgressTracker {
    pub(crate) fn emit<P: ProgressSink + ?Sized>(
        &mut self,
        sink: &mut P,
        stage: Stage,
        current_unit: u32,
        total_units: u32,
        percentage: u8,
        message: impl Into<String>,
    ) {
        let (low, high) = stage.bounds();
        let percentage = percentage.clamp(low, high).max(self.last);
        self.last = percentage;
        sink.report(ProgressEvent {
            stage,
            current_unit,
            total_units,
            percentage,
            message: message.into(),
        });
    }
}
