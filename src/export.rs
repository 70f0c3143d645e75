//! Page layout for turning one tall report capture into a paginated
//! document. Rasterizing the capture happens in the browser.

use crate::errors::AppError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Upper bound on pages one export may produce.
pub const MAX_PAGES: usize = 500;

/// A4 portrait, millimetres.
pub const A4: PageSize = PageSize {
    width: 210.0,
    height: 297.0,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CaptureSize {
    pub capture_width: f64,
    pub capture_height: f64,
}

/// Where the full capture is drawn on one page. Every page draws the whole
/// image; `y` shifts it up so the page shows its own slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PagePlacement {
    pub page: usize,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayout {
    pub page_size: PageSize,
    pub pages: Vec<PagePlacement>,
}

pub fn paginate(capture: CaptureSize, page: PageSize) -> Result<PageLayout, AppError> {
    let dimensions = [
        ("capture width", capture.capture_width),
        ("capture height", capture.capture_height),
        ("page width", page.width),
        ("page height", page.height),
    ];
    if let Some((name, value)) = dimensions
        .iter()
        .find(|(_, value)| !value.is_finite() || *value <= 0.0)
    {
        return Err(AppError::render(format!("{name} must be positive, got {value}")));
    }

    let scaled_height = capture.capture_height * page.width / capture.capture_width;
    let pages_needed = (scaled_height / page.height).ceil().max(1.0);
    if !pages_needed.is_finite() || pages_needed > MAX_PAGES as f64 {
        return Err(AppError::render(format!(
            "capture would need {pages_needed} pages, limit is {MAX_PAGES}"
        )));
    }
    let page_count = pages_needed as usize;

    let pages = (0..page_count)
        .map(|index| PagePlacement {
            page: index + 1,
            x: 0.0,
            y: -(index as f64) * page.height,
            width: page.width,
            height: scaled_height,
        })
        .collect();

    Ok(PageLayout {
        page_size: page,
        pages,
    })
}

pub fn export_file_name(title: &str, today: NaiveDate) -> String {
    format!("MomentReport_{title}_{}.pdf", today.format("%Y%m%d"))
}
