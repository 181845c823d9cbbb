//! Cancellation tokens for render tasks
//!
//! Provides cancellation tokens that let an in-flight render be cancelled
//! cooperatively. Rasterizers check the token between units of work and stop
//! early; the viewer ignores the result of a cancelled render either way.

use crate::Generation;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// Cancellation token for cooperative render cancellation
///
/// Rasterizers can periodically check `is_cancelled()` to determine if they
/// should stop processing. Clones share the same underlying cancellation
/// state via Arc.
///
/// # Example
///
/// ```
/// use pdf_viewer_scheduler::CancellationToken;
///
/// let token = CancellationToken::new();
/// let render_token = token.clone();
///
/// // On the render thread:
/// // for band in bands {
/// //     if render_token.is_cancelled() {
/// //         return Err(Cancelled);
/// //     }
/// //     // ... rasterize band ...
/// // }
///
/// // On navigation:
/// token.cancel();
/// assert!(render_token.is_cancelled());
/// ```
#[derive(Debug, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token
    ///
    /// The token starts in a non-cancelled state.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Cancel this token
    ///
    /// All clones of this token will also observe the cancellation.
    /// Calling it more than once has no further effect.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Returns `true` if `cancel()` has been called on this token or any clone.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Single-entry registry for the render currently in flight
///
/// A viewer never has more than one render pending. Beginning a new render
/// cancels the token of the one it replaces; finishing only clears the slot
/// when the finishing render is still the active one.
#[derive(Debug, Default)]
pub struct RenderSlot {
    active: Option<(Generation, CancellationToken)>,
}

impl RenderSlot {
    /// Create an empty slot
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `generation` as the active render and return its token
    ///
    /// Any render still registered is cancelled first.
    pub fn begin(&mut self, generation: Generation) -> CancellationToken {
        self.cancel();

        let token = CancellationToken::new();
        self.active = Some((generation, token.clone()));
        token
    }

    /// Cancel and drop the active render, if any
    ///
    /// Returns the generation that was cancelled.
    pub fn cancel(&mut self) -> Option<Generation> {
        let (generation, token) = self.active.take()?;
        token.cancel();
        Some(generation)
    }

    /// Mark `generation` as settled
    ///
    /// Returns `true` if it was the active render. A stale generation leaves
    /// the slot untouched.
    pub fn finish(&mut self, generation: Generation) -> bool {
        match &self.active {
            Some((active, _)) if *active == generation => {
                self.active = None;
                true
            }
            _ => false,
        }
    }

    /// Generation of the render in flight
    pub fn active(&self) -> Option<Generation> {
        self.active.as_ref().map(|(generation, _)| *generation)
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }
}
