use crate::{
    check_surface, CancellationToken, DocumentHandle, OpenSource, PageSize, PdfEngine,
    PdfEngineError, RenderRequest, RgbaImage,
};
use image::Rgba;
use lopdf::{Dictionary, Document};
use std::collections::HashMap;
use std::fs;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const FRAME: Rgba<u8> = Rgba([220, 220, 220, 255]);
const BAND_ROWS: u32 = 64;

#[derive(Debug, Clone)]
struct DocumentRecord {
    page_sizes: Vec<PageSize>,
}

/// Pure-Rust engine: lopdf for structure, a frame-only rasterizer for pixels.
#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_documents(&self) -> usize {
        self.docs.len()
    }

    fn parse_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            sizes.push(page_size(dict));
        }

        if sizes.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        Ok(sizes)
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, PdfEngineError> {
        self.docs.get(&handle).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

fn page_size(dict: &Dictionary) -> PageSize {
    let size = dict
        .get(b"MediaBox")
        .ok()
        .and_then(|obj| obj.as_array().ok())
        .and_then(|array| {
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            Some(PageSize { width_pt: (x1 - x0).abs(), height_pt: (y1 - y0).abs() })
        })
        .filter(|size| size.width_pt > 0.0 && size.height_pt > 0.0)
        .unwrap_or(PageSize::LETTER);

    let rotate = dict.get(b"Rotate").ok().and_then(|obj| obj.as_i64().ok()).unwrap_or(0);

    if rotate.rem_euclid(180) == 90 {
        PageSize { width_pt: size.height_pt, height_pt: size.width_pt }
    } else {
        size
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let page_sizes = Self::parse_sizes(&bytes)?;

        let handle = DocumentHandle::next(&mut self.next_handle);
        tracing::debug!(handle = handle.raw(), pages = page_sizes.len(), "opened document");
        self.docs.insert(handle, DocumentRecord { page_sizes });

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

        let (width, height) = (request.width_px, request.height_px);
        let framed = width >= 4 && height >= 4;
        let mut image = RgbaImage::new(width, height);

        let mut band_start = 0;
        while band_start < height {
            if cancel.is_cancelled() {
                return Err(PdfEngineError::Cancelled);
            }

            let band_end = (band_start + BAND_ROWS).min(height);
            for y in band_start..band_end {
                let edge_row = y == 0 || y == height - 1;
                for x in 0..width {
                    let edge = edge_row || x == 0 || x == width - 1;
                    image.put_pixel(x, y, if framed && edge { FRAME } else { PAPER });
                }
            }
            band_start = band_end;
        }

        Ok(image)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn render(engine: &LopdfEngine, handle: DocumentHandle, width: u32, height: u32) -> RgbaImage {
        engine
            .render_page(
                handle,
                RenderRequest { page_index: 0, width_px: width, height_px: height },
                &CancellationToken::new(),
            )
            .expect("render should succeed")
    }

    #[test]
    fn opens_pdf_and_reads_page_count() {
        let mut engine = LopdfEngine::new();
        let handle = engine
            .open(OpenSource::Bytes(fixtures::letter_pages(3)))
            .expect("open should succeed");

        assert_eq!(engine.page_count(handle).expect("count should succeed"), 3);
        assert_eq!(engine.page_size(handle, 2).expect("size should succeed"), PageSize::LETTER);
    }

    #[test]
    fn reads_media_box_and_rotation() {
        let mut engine = LopdfEngine::new();
        let bytes = fixtures::pdf_with_pages(&[
            fixtures::FixturePage::new(400.0, 300.0),
            fixtures::FixturePage::new(400.0, 300.0).rotated(90),
        ])
        .expect("fixture should build");
        let handle = engine.open(OpenSource::Bytes(bytes)).expect("open should succeed");

        assert_eq!(
            engine.page_size(handle, 0).expect("size"),
            PageSize { width_pt: 400.0, height_pt: 300.0 }
        );
        assert_eq!(
            engine.page_size(handle, 1).expect("size"),
            PageSize { width_pt: 300.0, height_pt: 400.0 }
        );
    }

    #[test]
    fn render_fills_exact_surface_with_frame() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(1))).expect("open should succeed");

        let image = render(&engine, handle, 153, 198);

        assert_eq!(image.dimensions(), (153, 198));
        assert_eq!(*image.get_pixel(0, 0), FRAME);
        assert_eq!(*image.get_pixel(76, 99), PAPER);
    }

    #[test]
    fn cancelled_token_stops_render() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(1))).expect("open should succeed");

        let token = CancellationToken::new();
        token.cancel();

        let err = engine
            .render_page(handle, RenderRequest { page_index: 0, width_px: 10, height_px: 10 }, &token)
            .expect_err("cancelled render should fail");

        assert!(err.is_cancelled());
    }

    #[test]
    fn zero_sized_surface_is_rejected() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(1))).expect("open should succeed");

        let err = engine
            .render_page(
                handle,
                RenderRequest { page_index: 0, width_px: 0, height_px: 10 },
                &CancellationToken::new(),
            )
            .expect_err("empty surface should fail");

        assert!(matches!(err, PdfEngineError::InvalidSurface { width: 0, height: 10 }));
    }

    #[test]
    fn oversized_surface_is_rejected_before_allocating() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(1))).expect("open should succeed");
        let token = CancellationToken::new();

        let too_wide = RenderRequest { page_index: 0, width_px: 2_000_000, height_px: 2_588_235 };
        let err = engine.render_page(handle, too_wide, &token).expect_err("too wide");
        assert!(matches!(err, PdfEngineError::InvalidSurface { width: 2_000_000, .. }));

        // Each side fits, the area does not.
        let too_large = RenderRequest { page_index: 0, width_px: 16_000, height_px: 16_000 };
        let err = engine.render_page(handle, too_large, &token).expect_err("too large");
        assert!(matches!(err, PdfEngineError::InvalidSurface { .. }));

        let largest_side = RenderRequest {
            page_index: 0,
            width_px: crate::MAX_SURFACE_DIMENSION_PX,
            height_px: 8,
        };
        let image = engine.render_page(handle, largest_side, &token).expect("within limits");
        assert_eq!(image.dimensions(), (crate::MAX_SURFACE_DIMENSION_PX, 8));
    }

    #[test]
    fn out_of_range_page_is_reported() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(2))).expect("open should succeed");

        let err = engine.page_size(handle, 2).expect_err("page 2 does not exist");
        assert!(matches!(err, PdfEngineError::PageOutOfRange { page: 2, page_count: 2 }));
    }

    #[test]
    fn garbage_bytes_fail_to_parse() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"definitely not a pdf".to_vec()))
            .expect_err("garbage should not open");

        assert!(matches!(err, PdfEngineError::Parse(_)));
        assert_eq!(engine.open_documents(), 0);
    }

    #[test]
    fn encrypted_marker_is_rejected() {
        let mut engine = LopdfEngine::new();
        let err = engine
            .open(OpenSource::Bytes(b"%PDF-1.7\n/Encrypt 5 0 R\n".to_vec()))
            .expect_err("encrypted marker should be rejected");

        assert!(matches!(err, PdfEngineError::EncryptedUnsupported));
    }

    #[test]
    fn invalid_handle_returns_error() {
        let engine = LopdfEngine::new();
        let err =
            engine.page_count(DocumentHandle(999)).expect_err("should fail for unknown handle");

        assert!(matches!(err, PdfEngineError::InvalidHandle(999)));
    }

    #[test]
    fn close_releases_handle() {
        let mut engine = LopdfEngine::new();
        let handle =
            engine.open(OpenSource::Bytes(fixtures::letter_pages(1))).expect("open should succeed");

        engine.close(handle).expect("close should succeed");

        assert!(matches!(engine.page_count(handle), Err(PdfEngineError::InvalidHandle(_))));
        assert!(engine.close(handle).is_err());
    }
}
