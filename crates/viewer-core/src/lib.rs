//! UI-free state machine behind the page viewer.
//!
//! [`ViewerCore`] owns the current document handle, the page cursor, the
//! viewport width and the single pending render. It never performs I/O: the
//! async driver asks it for a [`RenderTicket`], does the work, and reports
//! back. Results whose generation is no longer current are refused.

mod layout;
mod state;

use std::fmt;

pub use layout::{fit_width, is_valid_viewport_width, PageLayout, MIN_VIEWPORT_WIDTH_PX};
pub use state::{LoadTicket, RenderTicket, RenderedSummary, ViewerCore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentInfo {
    pub total_pages: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("already at the first page")]
    AtFirstPage,
    #[error("already at the last page")]
    AtLastPage,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RenderStartError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("viewport width must be a positive number of pixels, got {0}")]
    InvalidViewport(f32),
}

/// What the host shows next to the page: `k / N` and the state of the
/// previous/next controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageIndicator {
    pub current_page: u32,
    pub total_pages: u32,
    pub previous_enabled: bool,
    pub next_enabled: bool,
}

impl fmt::Display for PageIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total_pages == 0 {
            write!(f, "— / —")
        } else {
            write!(f, "{} / {}", self.current_page, self.total_pages)
        }
    }
}
