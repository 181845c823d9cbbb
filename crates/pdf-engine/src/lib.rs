//! Decode/render provider for the page viewer.
//!
//! The viewer consumes two capabilities: open a document from bytes (yielding
//! its page count and page geometry) and rasterize one page into a pixel
//! surface of a requested size, cooperatively cancellable. [`PdfEngine`] is
//! that seam; [`LopdfEngine`] is the default implementation and
//! `pdfium_backend::PdfiumEngine` (feature `pdfium`) renders real content.

use image::{ImageBuffer, Rgba};
use std::path::{Path, PathBuf};

pub use pdf_viewer_scheduler::CancellationToken;

mod lopdf_engine;

#[cfg(feature = "pdfium")]
pub mod pdfium_backend;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use lopdf_engine::LopdfEngine;

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub(crate) fn next(previous: &mut u64) -> Self {
        *previous += 1;
        Self(*previous)
    }
}

/// Intrinsic page size in PDF points, with page rotation already applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageSize {
    pub const LETTER: PageSize = PageSize { width_pt: 612.0, height_pt: 792.0 };
}

/// One page rasterized into a surface of exactly `width_px` x `height_px`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderRequest {
    /// Zero-based page index.
    pub page_index: u32,
    pub width_px: u32,
    pub height_px: u32,
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("invalid render surface {width}x{height}")]
    InvalidSurface { width: u32, height: u32 },
    #[error("render cancelled")]
    Cancelled,
    #[error("backend error: {0}")]
    Backend(String),
}

impl PdfEngineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Document store and rasterizer.
///
/// `open` and `close` mutate the store; queries and rendering only read it, so
/// a shared engine can serve several renders while a load waits for exclusive
/// access.
pub trait PdfEngine: Send + Sync {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    /// Rasterize a page. Implementations check `cancel` between units of work
    /// and return [`PdfEngineError::Cancelled`] once it fires.
    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Largest width or height of a render surface.
pub const MAX_SURFACE_DIMENSION_PX: u32 = 16_384;

/// Largest render surface by area, 256 MiB of RGBA.
pub const MAX_SURFACE_PIXELS: u64 = 1 << 26;

/// Rejects empty surfaces and surfaces too large to allocate.
pub(crate) fn check_surface(request: RenderRequest) -> Result<(), PdfEngineError> {
    let pixels = u64::from(request.width_px) * u64::from(request.height_px);
    if pixels == 0
        || request.width_px > MAX_SURFACE_DIMENSION_PX
        || request.height_px > MAX_SURFACE_DIMENSION_PX
        || pixels > MAX_SURFACE_PIXELS
    {
        return Err(PdfEngineError::InvalidSurface {
            width: request.width_px,
            height: request.height_px,
        });
    }
    Ok(())
}
