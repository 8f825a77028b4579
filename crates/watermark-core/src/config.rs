//! TOML configuration
//!
//! Every key is optional. Values given on the command line take precedence
//! over the file, which takes precedence over the built-in defaults.
//!
//! ```toml
//! [drawing]
//! opacity = 0.2
//! angle = 30
//! text_color = "#FF0000"
//! text_font = "Times-Roman"
//!
//! [grid]
//! horizontal_boxes = 4
//! margin = true
//!
//! [insert]
//! horizontal_alignment = "left"
//! ```

use crate::error::WatermarkError;
use crate::options::{
    Alignment, Color, DrawingOptions, GridOptions, InsertOptions, WatermarkSource,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub drawing: DrawingConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub insert: InsertConfig,
}

impl WatermarkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WatermarkError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            WatermarkError::ConfigError(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, WatermarkError> {
        toml::from_str(s).map_err(|e| WatermarkError::ConfigError(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DrawingConfig {
    pub opacity: Option<f64>,
    pub angle: Option<f64>,
    pub text_color: Option<String>,
    pub text_font: Option<String>,
    pub text_size: Option<f64>,
    pub unselectable: Option<bool>,
    pub image_scale: Option<f64>,
}

impl DrawingConfig {
    /// Overlay `overrides` on top of this config, key by key
    pub fn merge(&self, overrides: &DrawingConfig) -> DrawingConfig {
        DrawingConfig {
            opacity: overrides.opacity.or(self.opacity),
            angle: overrides.angle.or(self.angle),
            text_color: overrides
                .text_color
                .clone()
                .or_else(|| self.text_color.clone()),
            text_font: overrides
                .text_font
                .clone()
                .or_else(|| self.text_font.clone()),
            text_size: overrides.text_size.or(self.text_size),
            unselectable: overrides.unselectable.or(self.unselectable),
            image_scale: overrides.image_scale.or(self.image_scale),
        }
    }

    /// Build validated drawing options, filling unset keys with defaults
    pub fn build(&self, watermark: WatermarkSource) -> Result<DrawingOptions, WatermarkError> {
        let mut drawing = DrawingOptions::new(watermark);
        if let Some(opacity) = self.opacity {
            drawing.opacity = opacity;
        }
        if let Some(angle) = self.angle {
            drawing.angle = angle;
        }
        if let Some(color) = &self.text_color {
            drawing.text_color = Color::from_hex(color)?;
        }
        if let Some(font) = &self.text_font {
            drawing.text_font = font.clone();
        }
        if let Some(size) = self.text_size {
            drawing.text_size = size;
        }
        if let Some(unselectable) = self.unselectable {
            drawing.unselectable = unselectable;
        }
        if let Some(scale) = self.image_scale {
            drawing.image_scale = scale;
        }
        drawing.validate()?;
        Ok(drawing)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    pub horizontal_boxes: Option<u32>,
    pub vertical_boxes: Option<u32>,
    pub margin: Option<bool>,
}

impl GridConfig {
    pub fn merge(&self, overrides: &GridConfig) -> GridConfig {
        GridConfig {
            horizontal_boxes: overrides.horizontal_boxes.or(self.horizontal_boxes),
            vertical_boxes: overrides.vertical_boxes.or(self.vertical_boxes),
            margin: overrides.margin.or(self.margin),
        }
    }

    pub fn build(&self) -> Result<GridOptions, WatermarkError> {
        let defaults = GridOptions::default();
        let grid = GridOptions {
            horizontal_boxes: self.horizontal_boxes.unwrap_or(defaults.horizontal_boxes),
            vertical_boxes: self.vertical_boxes.unwrap_or(defaults.vertical_boxes),
            margin: self.margin.unwrap_or(defaults.margin),
        };
        grid.validate()?;
        Ok(grid)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InsertConfig {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub horizontal_alignment: Option<String>,
}

impl InsertConfig {
    pub fn merge(&self, overrides: &InsertConfig) -> InsertConfig {
        InsertConfig {
            x: overrides.x.or(self.x),
            y: overrides.y.or(self.y),
            horizontal_alignment: overrides
                .horizontal_alignment
                .clone()
                .or_else(|| self.horizontal_alignment.clone()),
        }
    }

    pub fn build(&self) -> Result<InsertOptions, WatermarkError> {
        let defaults = InsertOptions::default();
        let horizontal_alignment = match &self.horizontal_alignment {
            Some(value) => value.parse::<Alignment>()?,
            None => defaults.horizontal_alignment,
        };
        let insert = InsertOptions {
            x: self.x.unwrap_or(defaults.x),
            y: self.y.unwrap_or(defaults.y),
            horizontal_alignment,
        };
        insert.validate()?;
        Ok(insert)
    }
}
