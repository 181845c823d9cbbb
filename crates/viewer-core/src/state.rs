use crate::{
    is_valid_viewport_width, DocumentInfo, NavigationError, PageIndicator, RenderStartError,
};
use pdf_engine::DocumentHandle;
use pdf_viewer_scheduler::{CancellationToken, Generation, GenerationCounter, RenderSlot};

/// Issued by [`ViewerCore::begin_load`].
#[derive(Debug)]
pub struct LoadTicket {
    pub generation: Generation,
    /// Document released by this load; the driver must close it.
    pub previous: Option<DocumentHandle>,
}

/// Everything a worker needs to render the current page.
#[derive(Debug, Clone)]
pub struct RenderTicket {
    pub generation: Generation,
    pub document: DocumentHandle,
    /// One-based page number.
    pub page: u32,
    pub total_pages: u32,
    pub viewport_width_px: f32,
    pub token: CancellationToken,
}

impl RenderTicket {
    pub fn page_index(&self) -> u32 {
        self.page - 1
    }
}

/// The most recently accepted render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedSummary {
    pub generation: Generation,
    pub document: DocumentHandle,
    pub page: u32,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug)]
pub struct ViewerCore {
    document: Option<DocumentHandle>,
    current_page: u32,
    total_pages: u32,
    viewport_width_px: f32,
    generations: GenerationCounter,
    pending: RenderSlot,
    last_rendered: Option<RenderedSummary>,
}

impl ViewerCore {
    pub fn new(viewport_width_px: f32) -> Self {
        let viewport_width_px =
            if is_valid_viewport_width(viewport_width_px) { viewport_width_px } else { 1.0 };

        Self {
            document: None,
            current_page: 1,
            total_pages: 0,
            viewport_width_px,
            generations: GenerationCounter::new(),
            pending: RenderSlot::new(),
            last_rendered: None,
        }
    }

    pub fn document(&self) -> Option<DocumentHandle> {
        self.document
    }

    pub fn is_loaded(&self) -> bool {
        self.document.is_some()
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn viewport_width_px(&self) -> f32 {
        self.viewport_width_px
    }

    pub fn pending_render(&self) -> Option<Generation> {
        self.pending.active()
    }

    /// Whether no load, render or clear has been issued since `generation`.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.generations.is_current(generation)
    }

    pub fn last_rendered(&self) -> Option<RenderedSummary> {
        self.last_rendered
    }

    pub fn page_indicator(&self) -> PageIndicator {
        let loaded = self.is_loaded();
        PageIndicator {
            current_page: self.current_page,
            total_pages: self.total_pages,
            previous_enabled: loaded && self.current_page > 1,
            next_enabled: loaded && self.current_page < self.total_pages,
        }
    }

    /// Drop the current document and pending render ahead of a decode.
    ///
    /// The page cursor is left alone so that a failed decode does not move it.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.pending.cancel();
        let generation = self.generations.advance();
        let previous = self.release();

        LoadTicket { generation, previous }
    }

    /// Install a decoded document.
    ///
    /// Returns `None` when another load or a clear happened after `ticket` was
    /// issued; the caller then owns `document` and must close it.
    pub fn finish_load(
        &mut self,
        ticket: &LoadTicket,
        document: DocumentHandle,
        page_count: u32,
    ) -> Option<DocumentInfo> {
        if !self.generations.is_current(ticket.generation) || page_count == 0 {
            return None;
        }

        self.document = Some(document);
        self.current_page = 1;
        self.total_pages = page_count;

        Some(DocumentInfo { total_pages: page_count })
    }

    /// Remember the width the next render should use.
    pub fn set_viewport_width(&mut self, viewport_width_px: f32) -> Result<(), RenderStartError> {
        if !is_valid_viewport_width(viewport_width_px) {
            return Err(RenderStartError::InvalidViewport(viewport_width_px));
        }
        self.viewport_width_px = viewport_width_px;
        Ok(())
    }

    /// Start rendering the current page, cancelling the render in flight.
    pub fn begin_render(&mut self, viewport_width_px: f32) -> Result<RenderTicket, RenderStartError> {
        let document = self.document.ok_or(RenderStartError::NoDocument)?;
        self.set_viewport_width(viewport_width_px)?;

        let generation = self.generations.advance();
        let token = self.pending.begin(generation);

        Ok(RenderTicket {
            generation,
            document,
            page: self.current_page,
            total_pages: self.total_pages,
            viewport_width_px,
            token,
        })
    }

    /// Accept a finished render if it is still the newest one.
    pub fn complete_render(&mut self, ticket: &RenderTicket, width_px: u32, height_px: u32) -> bool {
        let was_pending = self.pending.finish(ticket.generation);

        if !was_pending
            || !self.generations.is_current(ticket.generation)
            || self.document != Some(ticket.document)
        {
            return false;
        }

        self.last_rendered = Some(RenderedSummary {
            generation: ticket.generation,
            document: ticket.document,
            page: ticket.page,
            width_px,
            height_px,
        });
        true
    }

    /// Settle a render that produced no bitmap.
    ///
    /// Returns `true` if it was still the newest render, meaning its failure
    /// should be reported rather than discarded.
    pub fn abandon_render(&mut self, ticket: &RenderTicket) -> bool {
        self.pending.finish(ticket.generation) && self.generations.is_current(ticket.generation)
    }

    pub fn next(&mut self) -> Result<u32, NavigationError> {
        if !self.is_loaded() {
            return Err(NavigationError::NoDocument);
        }
        if self.current_page >= self.total_pages {
            return Err(NavigationError::AtLastPage);
        }
        self.current_page += 1;
        Ok(self.current_page)
    }

    pub fn previous(&mut self) -> Result<u32, NavigationError> {
        if !self.is_loaded() {
            return Err(NavigationError::NoDocument);
        }
        if self.current_page <= 1 {
            return Err(NavigationError::AtFirstPage);
        }
        self.current_page -= 1;
        Ok(self.current_page)
    }

    /// Reset to the empty state, returning the handle the driver must close.
    pub fn clear(&mut self) -> Option<DocumentHandle> {
        self.pending.cancel();
        self.generations.advance();
        self.current_page = 1;
        self.release()
    }

    fn release(&mut self) -> Option<DocumentHandle> {
        self.total_pages = 0;
        self.last_rendered = None;
        self.document.take()
    }
}
