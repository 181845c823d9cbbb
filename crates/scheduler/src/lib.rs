//! PDF Viewer Scheduler Library
//!
//! Bookkeeping for the page viewer's render tasks.
//!
//! A viewer keeps at most one render in flight. Every render is stamped with a
//! [`Generation`] and carries a [`CancellationToken`]; the [`RenderSlot`] holds
//! the one active pair and cancels the previous token whenever a new render is
//! started. Completions compare their generation against the counter and are
//! discarded once stale.
//!
//! # Example
//!
//! ```
//! use pdf_viewer_scheduler::{GenerationCounter, RenderSlot};
//!
//! let mut generations = GenerationCounter::new();
//! let mut slot = RenderSlot::new();
//!
//! let first = generations.advance();
//! let first_token = slot.begin(first);
//!
//! // Navigating away supersedes the first render.
//! let second = generations.advance();
//! let _second_token = slot.begin(second);
//!
//! assert!(first_token.is_cancelled());
//! assert!(!generations.is_current(first));
//! assert!(slot.finish(second));
//! ```

mod cancel;
mod generation;

pub use cancel::{CancellationToken, RenderSlot};
pub use generation::{Generation, GenerationCounter};
