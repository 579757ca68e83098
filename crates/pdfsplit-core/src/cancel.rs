//! Cooperative cancellation
//!
//! The split and archive stages poll a [`CancelToken`] before every page and
//! every archive member. Clones share the same flag, so a UI thread can keep one
//! clone and hand the other to the running job.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{PdfSplitError, Result};
use crate::progress::Stage;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Fail with [`PdfSplitError::Cancelled`] if the token has been tripped
    pub(crate) fn check(&self, stage: Stage) -> Result<()> {
        if self.is_cancelled() {
            tracing::debug!(%stage, "cancellation observed");
            return Err(PdfSplitError::Cancelled { stage });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let token = CancelToken::new();
        let handle = token.clone();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_check_reports_stage() {
        let token = CancelToken::new();
        assert!(token.check(Stage::Zipping).is_ok());
        token.cancel();
        let err = token.check(Stage::Zipping).unwrap_err();
        assert!(matches!(
            err,
            PdfSplitError::Cancelled {
                stage: Stage::Zipping
            }
        ));
    }
}
