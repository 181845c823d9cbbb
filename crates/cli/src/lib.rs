use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdf_engine::{default_engine, LopdfEngine, OpenSource, PdfEngine};
use pdf_viewer::{LoggingSurface, NavigationError, PdfPageViewer, RenderedPage, ViewerConfig};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "pdf-viewer-cli")]
#[command(about = "Single-page PDF viewer CLI")]
pub struct Cli {
    /// Viewer configuration file (key = value lines).
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable PDF metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Render one page through the viewer and write it as PNG.
    Render {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Viewport width in pixels; defaults to the configured width.
        #[arg(long)]
        width: Option<f32>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Walk every page with the viewer and write one PNG per page.
    Pages {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        width: Option<f32>,
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::Render { file, page, width, output } => {
            let config = viewer_config(cli.config.as_deref(), width)?;
            run_render(&config, &file, page, output.as_deref())
        }
        Commands::Pages { file, width, out_dir } => {
            let config = viewer_config(cli.config.as_deref(), width)?;
            run_pages(&config, &file, &out_dir)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(file)).context("failed to open PDF")?;

    let page_count = engine.page_count(handle)?;
    let size = engine.page_size(handle, 0)?;
    let payload = InfoOutput {
        path: file.display().to_string(),
        page_count,
        first_page_size_pt: Some(PageSizeOutput { width: size.width_pt, height: size.height_pt }),
    };

    let json = serde_json::to_string_pretty(&payload)?;
    println!("{json}");

    engine.close(handle)?;

    Ok(())
}

fn run_render(config: &ViewerConfig, file: &Path, page: u32, output: Option<&Path>) -> Result<()> {
    ensure_pdf_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let rendered = runtime()?.block_on(async {
        let viewer = open_viewer(config, bytes).await?;

        let total = viewer.total_pages();
        if page > total {
            anyhow::bail!("page {page} is out of range, document has {total} page(s)");
        }

        while viewer.current_page() < page {
            viewer.next().await?;
        }

        accepted_page(&viewer, page)
    })?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_page_output(file, page));

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    write_png(&rendered, &output)?;
    println!("{}", output.display());

    Ok(())
}

fn run_pages(config: &ViewerConfig, file: &Path, out_dir: &Path) -> Result<()> {
    ensure_pdf_exists(file)?;

    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    runtime()?.block_on(async {
        let viewer = open_viewer(config, bytes).await?;

        loop {
            let page = accepted_page(&viewer, viewer.current_page())?;
            let name = format!("page-{}.png", page.page);
            write_png(&page, &out_dir.join(&name))?;
            println!(
                "{}/{} {}x{} {name}",
                page.page, page.total_pages, page.width_px, page.height_px
            );

            match viewer.next().await {
                Ok(()) => {}
                Err(NavigationError::AtLastPage) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok::<(), anyhow::Error>(())
    })
}

async fn open_viewer(config: &ViewerConfig, bytes: Vec<u8>) -> Result<PdfPageViewer<LopdfEngine>> {
    let viewer = PdfPageViewer::with_surface(default_engine(), config, Arc::new(LoggingSurface));
    let info = viewer.load(bytes).await.context("failed to open PDF")?;
    tracing::debug!(pages = info.total_pages, "viewer ready");
    Ok(viewer)
}

/// The bitmap the viewer accepted for `page`.
///
/// Render failures only reach the surface, so a missing bitmap is the error.
fn accepted_page(
    viewer: &PdfPageViewer<LopdfEngine>,
    page: u32,
) -> Result<Arc<RenderedPage>> {
    viewer
        .visible_page()
        .filter(|visible| visible.page == page)
        .with_context(|| format!("failed to render page {page}"))
}

fn viewer_config(file: Option<&Path>, width: Option<f32>) -> Result<ViewerConfig> {
    let config = ViewerConfig::resolve(file).context("failed to load configuration")?;

    match width {
        Some(width) if !(width.is_finite() && width >= 1.0) => {
            anyhow::bail!("--width must be at least one pixel, got {width}")
        }
        Some(width) => Ok(config.with_viewport_width(width).with_padding(0.0)),
        None => Ok(config),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn write_png(page: &RenderedPage, output: &Path) -> Result<()> {
    page.bitmap
        .save_with_format(output, image::ImageFormat::Png)
        .with_context(|| format!("failed to write image to {}", output.display()))
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_page_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");

    file.with_file_name(format!("{stem}-page-{page}.png"))
}
