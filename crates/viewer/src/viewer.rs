use crate::{DecodeError, NullSurface, RenderError, ViewerConfig, ViewerSurface};
use parking_lot::{Mutex, RwLock};
use pdf_engine::{
    DocumentHandle, OpenSource, PdfEngine, PdfEngineError, RenderRequest, RgbaImage,
};
use pdf_viewer_scheduler::Generation;
use std::sync::Arc;
use viewer_core::{
    fit_width, DocumentInfo, NavigationError, PageIndicator, RenderTicket, ViewerCore,
};

/// A bitmap the viewer accepted for display.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub document: DocumentHandle,
    pub generation: Generation,
    /// One-based page number.
    pub page: u32,
    pub total_pages: u32,
    pub width_px: u32,
    pub height_px: u32,
    pub scale: f32,
    pub bitmap: RgbaImage,
}

#[derive(Debug, Clone)]
pub enum RenderOutcome {
    Rendered(Arc<RenderedPage>),
    /// A newer render, load or clear was issued before this one settled.
    Superseded,
}

impl RenderOutcome {
    pub fn rendered(&self) -> Option<&Arc<RenderedPage>> {
        match self {
            Self::Rendered(page) => Some(page),
            Self::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}

struct Shared {
    core: ViewerCore,
    visible: Option<Arc<RenderedPage>>,
}

/// Single-page PDF viewer with supersession of stale renders.
///
/// Decoding and rasterization run on tokio's blocking pool. State changes go
/// through [`ViewerCore`]; a render's result is applied only if no newer
/// render, load or clear happened while it was running. Cloning yields
/// another handle to the same viewer.
pub struct PdfPageViewer<E> {
    engine: Arc<RwLock<E>>,
    shared: Arc<Mutex<Shared>>,
    surface: Arc<dyn ViewerSurface>,
}

impl<E> Clone for PdfPageViewer<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            shared: Arc::clone(&self.shared),
            surface: Arc::clone(&self.surface),
        }
    }
}

impl<E: PdfEngine + 'static> PdfPageViewer<E> {
    pub fn new(engine: E, config: &ViewerConfig) -> Self {
        Self::with_surface(engine, config, Arc::new(NullSurface))
    }

    pub fn with_surface(engine: E, config: &ViewerConfig, surface: Arc<dyn ViewerSurface>) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            shared: Arc::new(Mutex::new(Shared {
                core: ViewerCore::new(config.initial_render_width()),
                visible: None,
            })),
            surface,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.lock().core.is_loaded()
    }

    pub fn current_page(&self) -> u32 {
        self.shared.lock().core.current_page()
    }

    pub fn total_pages(&self) -> u32 {
        self.shared.lock().core.total_pages()
    }

    pub fn viewport_width_px(&self) -> f32 {
        self.shared.lock().core.viewport_width_px()
    }

    pub fn page_indicator(&self) -> PageIndicator {
        self.shared.lock().core.page_indicator()
    }

    /// Generation of the render still in flight, if any.
    pub fn pending_render(&self) -> Option<Generation> {
        self.shared.lock().core.pending_render()
    }

    /// The most recently accepted render of the current document.
    pub fn visible_page(&self) -> Option<Arc<RenderedPage>> {
        self.shared.lock().visible.clone()
    }

    /// Replace the current document with one decoded from `bytes` and render
    /// its first page.
    ///
    /// On failure the viewer is left empty and the page cursor is unchanged.
    /// Failures of the first-page render go to the surface, not to the caller.
    /// The decoded document is installed by the worker, so dropping this
    /// future after decoding started still leaves a consistent viewer.
    pub async fn load(&self, bytes: Vec<u8>) -> Result<DocumentInfo, DecodeError> {
        let ticket = {
            let mut shared = self.shared.lock();
            let ticket = shared.core.begin_load();
            shared.visible = None;
            self.surface.page_changed(shared.core.page_indicator());
            ticket
        };

        let generation = ticket.generation;
        tracing::debug!(%generation, bytes = bytes.len(), "decoding document");

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        let surface = Arc::clone(&self.surface);
        let info = tokio::task::spawn_blocking(move || {
            let mut engine = engine.write();
            if let Some(handle) = ticket.previous {
                close_document(&mut *engine, handle);
            }

            let opened = open_document(&mut *engine, bytes);
            let mut state = shared.lock();
            let (handle, page_count) = match opened {
                Ok(opened) => opened,
                Err(err) => {
                    tracing::warn!(%generation, %err, "failed to decode document");
                    if state.core.is_current(generation) {
                        surface.status("Could not render PDF");
                    }
                    return Err(DecodeError::Engine(err));
                }
            };

            match state.core.finish_load(&ticket, handle, page_count) {
                Some(info) => {
                    surface.status(&format!("PDF loaded — {} page(s)", info.total_pages));
                    surface.page_changed(state.core.page_indicator());
                    Ok(info)
                }
                None => {
                    drop(state);
                    tracing::debug!(%generation, "load superseded");
                    close_document(&mut *engine, handle);
                    Err(DecodeError::Superseded)
                }
            }
        })
        .await
        .map_err(|_| DecodeError::Interrupted)??;

        tracing::info!(pages = info.total_pages, "document loaded");
        self.refresh(None).await;
        Ok(info)
    }

    /// Render the current page fitted to `viewport_width_px`.
    ///
    /// The width must be finite and at least
    /// [`MIN_VIEWPORT_WIDTH_PX`](viewer_core::MIN_VIEWPORT_WIDTH_PX); a
    /// narrower viewport could not hold a single pixel column. Cancels the
    /// render in flight first. Errors of a render that is still current are
    /// returned and reported to the surface; anything else resolves as
    /// [`RenderOutcome::Superseded`]. The result is applied by the worker, so
    /// the pending render settles even if this future is dropped.
    pub async fn render_current(&self, viewport_width_px: f32) -> Result<RenderOutcome, RenderError> {
        let ticket = {
            let mut shared = self.shared.lock();
            match shared.core.begin_render(viewport_width_px) {
                Ok(ticket) => {
                    self.surface.status(&format!(
                        "Rendering page {} / {}...",
                        ticket.page, ticket.total_pages
                    ));
                    ticket
                }
                Err(err) => {
                    let err = RenderError::from(err);
                    self.surface.render_failed(&err);
                    return Err(err);
                }
            }
        };

        let generation = ticket.generation;
        tracing::debug!(
            %generation,
            page = ticket.page,
            width = viewport_width_px,
            "render started"
        );

        let engine = Arc::clone(&self.engine);
        let completion = RenderCompletion {
            shared: Arc::clone(&self.shared),
            surface: Arc::clone(&self.surface),
            ticket,
            settled: false,
        };
        let result = tokio::task::spawn_blocking(move || {
            let rendered = render_ticket(&*engine.read(), &completion.ticket);
            completion.apply(rendered)
        })
        .await;

        match result {
            Ok(outcome) => outcome,
            Err(join_err) => {
                tracing::error!(%generation, %join_err, "render worker stopped");
                if self.shared.lock().core.is_current(generation) {
                    Err(RenderError::Interrupted)
                } else {
                    Ok(RenderOutcome::Superseded)
                }
            }
        }
    }

    pub async fn next(&self) -> Result<(), NavigationError> {
        self.navigate(ViewerCore::next).await
    }

    pub async fn previous(&self) -> Result<(), NavigationError> {
        self.navigate(ViewerCore::previous).await
    }

    /// React to a container width change.
    ///
    /// Re-renders the current page when a document is loaded. Otherwise only
    /// remembers the width for the next load.
    pub async fn resize(&self, viewport_width_px: f32) {
        let loaded = {
            let mut shared = self.shared.lock();
            if !shared.core.is_loaded() {
                if shared.core.set_viewport_width(viewport_width_px).is_err() {
                    tracing::debug!(width = viewport_width_px, "ignoring unusable viewport width");
                }
                false
            } else {
                true
            }
        };

        if loaded {
            self.refresh(Some(viewport_width_px)).await;
        }
    }

    /// Cancel any render, release the document and reset to the empty state.
    pub async fn clear(&self) {
        let released = {
            let mut shared = self.shared.lock();
            let released = shared.core.clear();
            shared.visible = None;
            self.surface.page_changed(shared.core.page_indicator());
            released
        };

        if let Some(handle) = released {
            tracing::debug!(handle = handle.raw(), "clearing viewer");
            self.close_detached(handle).await;
        }
    }

    async fn navigate(
        &self,
        step: fn(&mut ViewerCore) -> Result<u32, NavigationError>,
    ) -> Result<(), NavigationError> {
        {
            let mut shared = self.shared.lock();
            step(&mut shared.core)?;
            self.surface.page_changed(shared.core.page_indicator());
        }

        self.refresh(None).await;
        Ok(())
    }

    /// Render the current page at `width`, or at the remembered width.
    async fn refresh(&self, width: Option<f32>) {
        let width = width.unwrap_or_else(|| self.viewport_width_px());
        // Current failures already reached the surface.
        let _ = self.render_current(width).await;
    }

    async fn close_detached(&self, handle: DocumentHandle) {
        let engine = Arc::clone(&self.engine);
        let closed =
            tokio::task::spawn_blocking(move || close_document(&mut *engine.write(), handle)).await;

        if let Err(err) = closed {
            tracing::warn!(handle = handle.raw(), %err, "close worker stopped");
        }
    }
}

/// Applies a finished render to the viewer on the worker thread.
///
/// Dropping it unapplied (worker panic, or the job never ran) abandons the
/// ticket so the pending slot does not outlive the render.
struct RenderCompletion {
    shared: Arc<Mutex<Shared>>,
    surface: Arc<dyn ViewerSurface>,
    ticket: RenderTicket,
    settled: bool,
}

impl RenderCompletion {
    fn apply(
        mut self,
        result: Result<RenderedPage, PdfEngineError>,
    ) -> Result<RenderOutcome, RenderError> {
        self.settled = true;
        let ticket = &self.ticket;
        let mut shared = self.shared.lock();

        match result {
            Ok(rendered) => {
                if !shared.core.complete_render(ticket, rendered.width_px, rendered.height_px) {
                    tracing::debug!(generation = %ticket.generation, "render superseded");
                    return Ok(RenderOutcome::Superseded);
                }

                let page = Arc::new(rendered);
                shared.visible = Some(Arc::clone(&page));
                self.surface.paint(&page);
                self.surface.status(&format!("Page {} rendered", page.page));
                tracing::debug!(generation = %ticket.generation, page = page.page, "render applied");
                Ok(RenderOutcome::Rendered(page))
            }
            Err(source) => {
                if !shared.core.abandon_render(ticket) || source.is_cancelled() {
                    tracing::debug!(generation = %ticket.generation, "render cancelled");
                    return Ok(RenderOutcome::Superseded);
                }

                let err = RenderError::Page { page: ticket.page, source };
                tracing::warn!(%err, "render failed");
                self.surface.render_failed(&err);
                Err(err)
            }
        }
    }
}

impl Drop for RenderCompletion {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut shared = self.shared.lock();
        if shared.core.abandon_render(&self.ticket) {
            self.surface.render_failed(&RenderError::Interrupted);
        }
    }
}

fn open_document<E: PdfEngine + ?Sized>(
    engine: &mut E,
    bytes: Vec<u8>,
) -> Result<(DocumentHandle, u32), PdfEngineError> {
    let handle = engine.open(OpenSource::Bytes(bytes))?;
    match engine.page_count(handle) {
        Ok(count) => Ok((handle, count)),
        Err(err) => {
            close_document(engine, handle);
            Err(err)
        }
    }
}

fn close_document<E: PdfEngine + ?Sized>(engine: &mut E, handle: DocumentHandle) {
    if let Err(err) = engine.close(handle) {
        tracing::warn!(handle = handle.raw(), %err, "failed to close document");
    }
}

fn render_ticket<E: PdfEngine + ?Sized>(
    engine: &E,
    ticket: &RenderTicket,
) -> Result<RenderedPage, PdfEngineError> {
    // The handle may already be closed once the token has fired.
    if ticket.token.is_cancelled() {
        return Err(PdfEngineError::Cancelled);
    }

    let size = engine.page_size(ticket.document, ticket.page_index())?;
    let layout = fit_width(size, ticket.viewport_width_px)
        .ok_or(PdfEngineError::InvalidSurface { width: 0, height: 0 })?;

    let bitmap = engine.render_page(
        ticket.document,
        RenderRequest {
            page_index: ticket.page_index(),
            width_px: layout.width_px,
            height_px: layout.height_px,
        },
        &ticket.token,
    )?;

    Ok(RenderedPage {
        document: ticket.document,
        generation: ticket.generation,
        page: ticket.page,
        total_pages: ticket.total_pages,
        width_px: bitmap.width(),
        height_px: bitmap.height(),
        scale: layout.scale,
        bitmap,
    })
}
