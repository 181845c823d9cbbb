//! Presentation adapters.
//!
//! A [`ViewerSurface`] paints whatever the viewer last accepted and shows the
//! page indicator. Callbacks run while the viewer holds its state lock, in the
//! order the state changed; implementations must not call back into the
//! viewer from them.

use crate::{RenderError, RenderedPage};
use viewer_core::PageIndicator;

pub trait ViewerSurface: Send + Sync {
    fn page_changed(&self, indicator: PageIndicator);
    fn paint(&self, page: &RenderedPage);
    fn render_failed(&self, error: &RenderError);
    fn status(&self, _message: &str) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSurface;

impl ViewerSurface for NullSurface {
    fn page_changed(&self, _indicator: PageIndicator) {}
    fn paint(&self, _page: &RenderedPage) {}
    fn render_failed(&self, _error: &RenderError) {}
}

/// Reports surface events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingSurface;

impl ViewerSurface for LoggingSurface {
    fn page_changed(&self, indicator: PageIndicator) {
        tracing::info!(
            page = %indicator,
            previous = indicator.previous_enabled,
            next = indicator.next_enabled,
            "page indicator"
        );
    }

    fn paint(&self, page: &RenderedPage) {
        tracing::info!(
            page = page.page,
            width = page.width_px,
            height = page.height_px,
            "painted page"
        );
    }

    fn render_failed(&self, error: &RenderError) {
        tracing::warn!(%error, "render failed");
    }

    fn status(&self, message: &str) {
        tracing::info!("{message}");
    }
}
