use pdf_engine::PageSize;

/// Surface size for one page rendered to fit a viewport width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageLayout {
    pub scale: f32,
    pub width_px: u32,
    pub height_px: u32,
}

/// Smallest viewport width that still yields a one-pixel-wide bitmap.
pub const MIN_VIEWPORT_WIDTH_PX: f32 = 1.0;

pub fn is_valid_viewport_width(viewport_width_px: f32) -> bool {
    viewport_width_px.is_finite() && viewport_width_px >= MIN_VIEWPORT_WIDTH_PX
}

/// Uniform scale mapping the page width onto the viewport width.
///
/// The bitmap is `floor(viewport_width_px)` wide and proportionally tall
/// (rounded down, never below one pixel).
pub fn fit_width(page: PageSize, viewport_width_px: f32) -> Option<PageLayout> {
    if !is_valid_viewport_width(viewport_width_px)
        || !(page.width_pt > 0.0)
        || !(page.height_pt > 0.0)
    {
        return None;
    }

    let viewport = f64::from(viewport_width_px);
    let scale = viewport / f64::from(page.width_pt);
    let width_px = viewport.floor() as u32;
    let height_px = (f64::from(page.height_pt) * scale).floor().max(1.0) as u32;

    Some(PageLayout { scale: scale as f32, width_px, height_px })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_width_scales_letter_page() {
        let layout = fit_width(PageSize::LETTER, 306.0).expect("layout");
        assert_eq!(layout.scale, 0.5);
        assert_eq!((layout.width_px, layout.height_px), (306, 396));
    }

    #[test]
    fn fit_width_rounds_down_both_dimensions() {
        let layout = fit_width(PageSize::LETTER, 800.7).expect("layout");
        assert_eq!(layout.width_px, 800);
        // 792 * 800.7 / 612 = 1036.20...
        assert_eq!(layout.height_px, 1036);
    }

    #[test]
    fn fit_width_preserves_landscape_aspect() {
        let page = PageSize { width_pt: 800.0, height_pt: 400.0 };
        let layout = fit_width(page, 200.0).expect("layout");
        assert_eq!((layout.width_px, layout.height_px), (200, 100));
    }

    #[test]
    fn fit_width_keeps_at_least_one_row() {
        let strip = PageSize { width_pt: 10_000.0, height_pt: 1.0 };
        let layout = fit_width(strip, 100.0).expect("layout");
        assert_eq!(layout.height_px, 1);
    }

    #[test]
    fn fit_width_rejects_unusable_viewports() {
        assert_eq!(fit_width(PageSize::LETTER, 0.0), None);
        assert_eq!(fit_width(PageSize::LETTER, -20.0), None);
        assert_eq!(fit_width(PageSize::LETTER, 0.5), None);
        assert_eq!(fit_width(PageSize::LETTER, f32::NAN), None);
        assert_eq!(fit_width(PageSize::LETTER, f32::INFINITY), None);
    }
}
