//! Pdfium-backed engine that rasterizes real page content.
//!
//! Pdfium documents borrow the library instance, so the engine keeps the raw
//! bytes per handle and reopens the document for each render.

use crate::{
    check_surface, CancellationToken, DocumentHandle, OpenSource, PageSize, PdfEngine,
    PdfEngineError, RenderRequest, RgbaImage,
};
use pdfium_render::prelude::*;
use std::collections::HashMap;
use std::fs;

struct DocumentRecord {
    bytes: Vec<u8>,
    page_sizes: Vec<PageSize>,
}

pub struct PdfiumEngine {
    pdfium: Pdfium,
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

fn backend(err: PdfiumError) -> PdfEngineError {
    PdfEngineError::Backend(err.to_string())
}

/// Pdfium addresses pages with `u16`.
fn pdfium_page_index(page_index: u32, page_count: u32) -> Result<u16, PdfEngineError> {
    u16::try_from(page_index)
        .map_err(|_| PdfEngineError::PageOutOfRange { page: page_index, page_count })
}

impl PdfiumEngine {
    pub fn from_system_library() -> Result<Self, PdfEngineError> {
        let bindings = Pdfium::bind_to_system_library().map_err(|err| {
            PdfEngineError::Backend(format!("failed to bind pdfium system library: {err}"))
        })?;

        Ok(Self { pdfium: Pdfium::new(bindings), next_handle: 0, docs: HashMap::new() })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

impl PdfEngine for PdfiumEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = {
            let document = self.pdfium.load_pdf_from_byte_slice(&bytes, None).map_err(backend)?;
            document
                .pages()
                .iter()
                .map(|page| PageSize { width_pt: page.width().value, height_pt: page.height().value })
                .collect::<Vec<_>>()
        };

        if page_sizes.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        let handle = DocumentHandle::next(&mut self.next_handle);
        self.docs.insert(handle, DocumentRecord { bytes, page_sizes });
        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        let record = self.record(handle)?;
        record.page_sizes.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: record.page_sizes.len() as u32,
        })
    }

    fn render_page(
        &self,
        handle: DocumentHandle,
        request: RenderRequest,
        cancel: &CancellationToken,
    ) -> Result<RgbaImage, PdfEngineError> {
        self.page_size(handle, request.page_index)?;
        check_surface(request)?;

        if cancel.is_cancelled() {
            return Err(PdfEngineError::Cancelled);
        }

        let record = self.record(handle)?;
        let document =
            self.pdfium.load_pdf_from_byte_slice(&record.bytes, None).map_err(backend)?;
        let index = pdfium_page_index(request.page_index, record.page_sizes.len() as u32)?;
        let page = document.pages().get(index).map_err(backend)?;

        if cancel.is_cancelled() {
            return Err(PdfEngineError::Cancelled);
        }

        let config = PdfRenderConfig::new()
            .set_target_width(request.width_px as i32)
            .set_maximum_height(request.height_px as i32);
        let bitmap = page.render_with_config(&config).map_err(backend)?;

        if cancel.is_cancelled() {
            return Err(PdfEngineError::Cancelled);
        }

        let image = bitmap.as_image().to_rgba8();
        if image.dimensions() == (request.width_px, request.height_px) {
            return Ok(image);
        }

        Ok(image::imageops::resize(
            &image,
            request.width_px,
            request.height_px,
            image::imageops::FilterType::Triangle,
        ))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}
