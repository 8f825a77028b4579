use serde::Serialize;
use std::path::PathBuf;

/// Outcome of watermarking one file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatermarkReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    /// Distinct page sizes a watermark page was rendered for
    pub rendered_sizes: usize,
    pub processing_time_ms: u64,
}

/// Result of a whole run, as printed by `--json`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub success: bool,
    pub error: Option<String>,
    pub files: Vec<WatermarkReport>,
    pub total_pages: u32,
    pub total_time_ms: u64,
}

impl RunSummary {
    pub fn completed(files: Vec<WatermarkReport>) -> Self {
        let total_pages = files.iter().map(|f| f.page_count).sum();
        let total_time_ms = files.iter().map(|f| f.processing_time_ms).sum();
        Self {
            success: true,
            error: None,
            files,
            total_pages,
            total_time_ms,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            files: Vec::new(),
            total_pages: 0,
            total_time_ms: 0,
        }
    }
}
