//! PDF watermarking
//!
//! This crate stamps a text or image watermark onto every page of a PDF
//! using lopdf, either as a single positioned insert or tiled over a grid.
//!
//! The pipeline is:
//! - `render::draw_watermarks`: draw the watermark on a blank page of the
//!   target size
//! - `compose::add_watermark_to_pdf`: import that page as a Form XObject
//!   and paint it over each page of the input

pub mod compose;
pub mod config;
pub mod error;
pub mod fonts;
pub mod geometry;
pub mod import;
pub mod options;
pub mod picture;
pub mod render;
pub mod report;

pub use compose::{add_watermark_from_options, add_watermark_to_file, add_watermark_to_pdf};
pub use config::WatermarkConfig;
pub use error::WatermarkError;
pub use fonts::{needs_installed_fonts, FontDiscovery, FontSource, NoFonts};
pub use geometry::{change_base, fit_image, RotationMatrix};
pub use options::{
    Alignment, Color, DrawingOptions, FilesOptions, GridOptions, InsertOptions, Layout,
    WatermarkSource,
};
pub use render::{draw_watermarks, PreparedWatermark};
pub use report::{RunSummary, WatermarkReport};

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, WatermarkError> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| WatermarkError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
