//! Asynchronous single-page PDF viewer.
//!
//! [`PdfPageViewer`] loads a PDF from an in-memory buffer, renders one page at
//! a time fitted to the available width and navigates forward and backward.
//! Only one render is ever active: issuing a new one (navigation, resize, load
//! or clear) cancels the previous one, and a render that settles after being
//! superseded is discarded instead of painted.
//!
//! ```no_run
//! use pdf_viewer::{PdfPageViewer, ViewerConfig};
//!
//! # async fn show(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let viewer = PdfPageViewer::new(pdf_engine::default_engine(), &ViewerConfig::default());
//! let info = viewer.load(bytes).await?;
//! println!("{} page(s)", info.total_pages);
//!
//! viewer.next().await?;
//! viewer.resize(412.0).await;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod surface;
mod viewer;

pub use config::{ConfigError, ViewerConfig};
pub use error::{DecodeError, RenderError};
pub use surface::{LoggingSurface, NullSurface, ViewerSurface};
pub use viewer::{PdfPageViewer, RenderOutcome, RenderedPage};
pub use viewer_core::{DocumentInfo, NavigationError, PageIndicator};
