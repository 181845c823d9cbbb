use pdf_engine::PdfEngineError;
use viewer_core::RenderStartError;

/// A `load` that did not produce a document. The viewer is left empty.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to decode PDF: {0}")]
    Engine(#[from] PdfEngineError),
    #[error("document load was superseded by a newer load or clear")]
    Superseded,
    #[error("decode worker stopped before finishing")]
    Interrupted,
}

/// A page that could not be rendered. The document stays loaded and other
/// pages remain navigable.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("viewport width must be a positive number of pixels, got {0}")]
    InvalidViewport(f32),
    #[error("failed to render page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: PdfEngineError,
    },
    #[error("render worker stopped before finishing")]
    Interrupted,
}

impl From<RenderStartError> for RenderError {
    fn from(err: RenderStartError) -> Self {
        match err {
            RenderStartError::NoDocument => Self::NoDocument,
            RenderStartError::InvalidViewport(px) => Self::InvalidViewport(px),
        }
    }
}
