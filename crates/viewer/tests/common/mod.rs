#![allow(dead_code)]

use parking_lot::Mutex;
use pdf_engine::{
    CancellationToken, DocumentHandle, LopdfEngine, OpenSource, PageSize, PdfEngine,
    PdfEngineError, RenderRequest, RgbaImage,
};
use pdf_viewer::{PageIndicator, PdfPageViewer, RenderError, RenderedPage, ViewerConfig, ViewerSurface};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Indicator(String),
    Painted { document: DocumentHandle, page: u32, width: u32, height: u32 },
    Failed(String),
    Status(String),
}

#[derive(Debug, Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<SurfaceEvent>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<SurfaceEvent> {
        self.events.lock().clone()
    }

    pub fn take_events(&self) -> Vec<SurfaceEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn paints(&self) -> Vec<SurfaceEvent> {
        self.events().into_iter().filter(|e| matches!(e, SurfaceEvent::Painted { .. })).collect()
    }

    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Failed(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SurfaceEvent::Status(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn last_indicator(&self) -> Option<String> {
        self.events().into_iter().rev().find_map(|e| match e {
            SurfaceEvent::Indicator(text) => Some(text),
            _ => None,
        })
    }
}

impl ViewerSurface for RecordingSurface {
    fn page_changed(&self, indicator: PageIndicator) {
        self.events.lock().push(SurfaceEvent::Indicator(indicator.to_string()));
    }

    fn paint(&self, page: &RenderedPage) {
        self.events.lock().push(SurfaceEvent::Painted {
            document: page.document,
            page: page.page,
            width: page.width_px,
            height: page.height_px,
        });
    }

    fn render_failed(&self, error: &RenderError) {
        self.events.lock().push(SurfaceEvent::Failed(error.to_string()));
    }

    fn status(&self, message: &str) {
        self.events.lock().push(SurfaceEvent::Status(message.to_owned()));
    }
}

/// A render parked inside the engine until the test releases it.
pub struct StartedRender {
    pub document: DocumentHandle,
    pub page_index: u32,
    pub width_px: u32,
    release: crossbeam_channel::Sender<()>,
}

impl StartedRender {
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

pub struct GateControl {
    armed: AtomicBool,
    honour_cancellation: AtomicBool,
    failing_pages: Mutex<HashSet<u32>>,
    open_documents: AtomicUsize,
    started: mpsc::UnboundedSender<StartedRender>,
}

impl GateControl {
    /// Park every subsequent render until released.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Let released renders finish even when their token was cancelled.
    pub fn ignore_cancellation(&self) {
        self.honour_cancellation.store(false, Ordering::SeqCst);
    }

    /// Make every render of the zero-based `page_index` fail.
    pub fn fail_page(&self, page_index: u32) {
        self.failing_pages.lock().insert(page_index);
    }

    /// Documents opened through the engine and not yet closed.
    pub fn open_documents(&self) -> usize {
        self.open_documents.load(Ordering::SeqCst)
    }
}

/// Lopdf engine whose renders can be parked, failed, or made deaf to
/// cancellation.
pub struct GatedEngine {
    inner: LopdfEngine,
    control: Arc<GateControl>,
}

impl PdfEngine for GatedEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let handle = self.inner.open(source)?;
        self.control.open_documents.fetch_add(1, Ordering::SeqCst);
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        self.inner.page_count(handle)
    }

    fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, PdfEngineError> {
        self.inner.page_size(handle, page_index)
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, PdfEngineError> {
        if self.control.failing_pages.lock().contains(&request.page_index) {
            return Err(PdfEngineError::Backend("corrupt content stream".to_owned()));
        }

        if self.control.armed.load(Ordering::SeqCst) {
            let (release, parked) = crossbeam_channel::bounded(1);
            let _ = self.control.started.send(StartedRender {
                document: handle,
                page_index: request.page_index,
                width_px: request.width_px,
                release,
            });
            let _ = parked.recv();

            if !self.control.honour_cancellation.load(Ordering::SeqCst) {
                return self.inner.render_page(handle, request, &CancellationToken::new());
            }
        }

        self.inner.render_page(handle, request, cancel)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.inner.close(handle)?;
        self.control.open_documents.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct Harness {
    pub viewer: PdfPageViewer<GatedEngine>,
    pub control: Arc<GateControl>,
    pub started: mpsc::UnboundedReceiver<StartedRender>,
    pub surface: Arc<RecordingSurface>,
}

impl Harness {
    pub async fn next_started(&mut self) -> StartedRender {
        tokio::time::timeout(Duration::from_secs(10), self.started.recv())
            .await
            .expect("render should start")
            .expect("engine should still be alive")
    }

    /// Wait until a concurrent load or clear has released the document.
    pub async fn wait_until_unloaded(&self) {
        eventually(|| !self.viewer.is_loaded()).await;
    }
}

/// Poll `condition` until it holds, failing the test after ten seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition should eventually hold");
}

/// Viewer over a gated engine, rendering at `width` with no padding.
pub fn harness(width: f32) -> Harness {
    let (tx, started) = mpsc::unbounded_channel();
    let control = Arc::new(GateControl {
        armed: AtomicBool::new(false),
        honour_cancellation: AtomicBool::new(true),
        failing_pages: Mutex::new(HashSet::new()),
        open_documents: AtomicUsize::new(0),
        started: tx,
    });
    let engine = GatedEngine { inner: LopdfEngine::new(), control: Arc::clone(&control) };
    let surface = Arc::new(RecordingSurface::default());
    let viewer =
        PdfPageViewer::with_surface(engine, &ViewerConfig::new(width, 0.0), surface.clone());

    Harness { viewer, control, started, surface }
}
