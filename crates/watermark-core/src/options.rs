//! Watermark options
//!
//! Plain configuration structs: what to draw, how to lay it out, and which
//! files to process.

use crate::error::WatermarkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Horizontal alignment of an inserted watermark relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    Left,
    Right,
    #[default]
    Center,
}

impl FromStr for Alignment {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "right" => Ok(Alignment::Right),
            "center" => Ok(Alignment::Center),
            _ => Err(WatermarkError::InvalidAlignment(s.to_string())),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
        };
        f.write_str(name)
    }
}

/// RGB color with components in the 0-1 range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Parse "#RRGGBB", "RRGGBB" or "#RGB"
    pub fn from_hex(color: &str) -> Result<Self, WatermarkError> {
        let hex = color.trim().trim_start_matches('#');
        let invalid = || WatermarkError::InvalidColor(color.to_string());

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| -> Result<f32, WatermarkError> {
            u8::from_str_radix(digits, 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| invalid())
        };

        match hex.len() {
            6 => Ok(Color {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            3 => {
                let doubled: String = hex.chars().flat_map(|c| [c, c]).collect();
                Color::from_hex(&doubled)
            }
            _ => Err(invalid()),
        }
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

/// What gets stamped: a string of text or an image file
#[derive(Debug, Clone, PartialEq)]
pub enum WatermarkSource {
    Text(String),
    Image(PathBuf),
}

impl WatermarkSource {
    /// An existing file is treated as an image, anything else as text
    pub fn from_arg(watermark: &str) -> Self {
        let path = Path::new(watermark);
        if path.is_file() {
            WatermarkSource::Image(path.to_path_buf())
        } else {
            WatermarkSource::Text(watermark.to_string())
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            WatermarkSource::Text(text) => Some(text),
            WatermarkSource::Image(_) => None,
        }
    }

    pub fn image(&self) -> Option<&Path> {
        match self {
            WatermarkSource::Image(path) => Some(path),
            WatermarkSource::Text(_) => None,
        }
    }
}

/// Options shared by every layout
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingOptions {
    pub watermark: WatermarkSource,
    pub opacity: f64,
    /// Counter-clockwise rotation in degrees
    pub angle: f64,
    pub text_color: Color,
    pub text_font: String,
    pub text_size: f64,
    /// Draw text as glyph outlines so it cannot be selected or extracted
    pub unselectable: bool,
    pub image_scale: f64,
}

pub const DEFAULT_OPACITY: f64 = 0.1;
pub const DEFAULT_ANGLE: f64 = 45.0;
pub const DEFAULT_TEXT_FONT: &str = "Helvetica";
pub const DEFAULT_TEXT_SIZE: f64 = 12.0;
pub const DEFAULT_IMAGE_SCALE: f64 = 1.0;

impl DrawingOptions {
    pub fn new(watermark: WatermarkSource) -> Self {
        Self {
            watermark,
            opacity: DEFAULT_OPACITY,
            angle: DEFAULT_ANGLE,
            text_color: Color::BLACK,
            text_font: DEFAULT_TEXT_FONT.to_string(),
            text_size: DEFAULT_TEXT_SIZE,
            unselectable: false,
            image_scale: DEFAULT_IMAGE_SCALE,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.watermark.text()
    }

    pub fn image(&self) -> Option<&Path> {
        self.watermark.image()
    }

    pub fn validate(&self) -> Result<(), WatermarkError> {
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::InvalidOption(format!(
                "opacity must be between 0 and 1, got {}",
                self.opacity
            )));
        }
        if !self.angle.is_finite() {
            return Err(WatermarkError::InvalidOption(format!(
                "angle must be a finite number, got {}",
                self.angle
            )));
        }
        if self.text_size.is_nan() || self.text_size <= 0.0 {
            return Err(WatermarkError::InvalidOption(format!(
                "text size must be positive, got {}",
                self.text_size
            )));
        }
        if self.image_scale.is_nan() || self.image_scale <= 0.0 {
            return Err(WatermarkError::InvalidOption(format!(
                "image scale must be positive, got {}",
                self.image_scale
            )));
        }
        if let WatermarkSource::Text(text) = &self.watermark {
            if text.is_empty() {
                return Err(WatermarkError::NothingToDraw);
            }
        }
        Ok(())
    }
}

/// Tile the watermark over a grid of boxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridOptions {
    pub horizontal_boxes: u32,
    pub vertical_boxes: u32,
    /// Draw in the middle of each box instead of on the box corners
    pub margin: bool,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            horizontal_boxes: 3,
            vertical_boxes: 6,
            margin: false,
        }
    }
}

impl GridOptions {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.horizontal_boxes == 0 || self.vertical_boxes == 0 {
            return Err(WatermarkError::InvalidOption(
                "grid box counts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Place a single watermark at a fractional position of the page
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InsertOptions {
    pub x: f64,
    pub y: f64,
    pub horizontal_alignment: Alignment,
}

impl Default for InsertOptions {
    fn default() -> Self {
        Self {
            x: 0.5,
            y: 0.5,
            horizontal_alignment: Alignment::Center,
        }
    }
}

impl InsertOptions {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        for (name, value) in [("x", self.x), ("y", self.y)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(WatermarkError::InvalidOption(format!(
                    "{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Layout {
    Grid(GridOptions),
    Insert(InsertOptions),
}

impl Layout {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        match self {
            Layout::Grid(grid) => grid.validate(),
            Layout::Insert(insert) => insert.validate(),
        }
    }
}

/// Input/output file pairs to process
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilesOptions {
    pairs: Vec<(PathBuf, PathBuf)>,
}

impl FilesOptions {
    /// Pair every input PDF with its output path.
    ///
    /// A file input is written to `output` (or overwritten in place). A
    /// directory input is searched recursively for `.pdf` files, each one
    /// written to the same relative path under `output` (or in place).
    pub fn new(input: &Path, output: Option<&Path>) -> Result<Self, WatermarkError> {
        if input.is_file() {
            let output = output.unwrap_or(input).to_path_buf();
            return Ok(Self {
                pairs: vec![(input.to_path_buf(), output)],
            });
        }

        if !input.is_dir() {
            return Err(WatermarkError::InputNotFound(input.display().to_string()));
        }

        let output_dir = output.unwrap_or(input);
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(WatermarkError::InvalidOption(format!(
                "output {} must be a directory when the input is a directory",
                output_dir.display()
            )));
        }

        let mut inputs = Vec::new();
        collect_pdfs(input, &mut inputs)?;
        inputs.sort();

        let pairs = inputs
            .into_iter()
            .map(|path| {
                let relative = path.strip_prefix(input).unwrap_or(&path).to_path_buf();
                let target = output_dir.join(relative);
                (path, target)
            })
            .collect();

        Ok(Self { pairs })
    }

    pub fn from_pairs(pairs: Vec<(PathBuf, PathBuf)>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.pairs
            .iter()
            .map(|(input, output)| (input.as_path(), output.as_path()))
    }
}

fn collect_pdfs(dir: &Path, found: &mut Vec<PathBuf>) -> Result<(), WatermarkError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_pdfs(&path, found)?;
        } else if path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false)
        {
            found.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alignment_parses_case_insensitively() {
        assert_eq!("LEFT".parse::<Alignment>().unwrap(), Alignment::Left);
        assert_eq!("right".parse::<Alignment>().unwrap(), Alignment::Right);
        assert_eq!(" Center ".parse::<Alignment>().unwrap(), Alignment::Center);
    }

    #[test]
    fn test_alignment_rejects_unknown_value() {
        let err = "middle".parse::<Alignment>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid alignment value: 'middle'");
    }

    #[test]
    fn test_color_from_hex() {
        let c = Color::from_hex("#FF0000").unwrap();
        assert_eq!((c.r, c.g, c.b), (1.0, 0.0, 0.0));

        let c = Color::from_hex("00ff00").unwrap();
        assert_eq!((c.r, c.g, c.b), (0.0, 1.0, 0.0));

        let c = Color::from_hex("#00f").unwrap();
        assert_eq!((c.r, c.g, c.b), (0.0, 0.0, 1.0));
    }

    #[test]
    fn test_color_rejects_garbage() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("red").is_err());
        assert!(Color::from_hex("#GG0000").is_err());
        assert!(Color::from_hex("#ééé").is_err());
    }

    #[test]
    fn test_source_from_arg() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();
        assert_eq!(
            WatermarkSource::from_arg(path),
            WatermarkSource::Image(file.path().to_path_buf())
        );
        assert_eq!(
            WatermarkSource::from_arg("CONFIDENTIAL"),
            WatermarkSource::Text("CONFIDENTIAL".into())
        );
    }

    #[test]
    fn test_drawing_defaults() {
        let drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        assert_eq!(drawing.opacity, 0.1);
        assert_eq!(drawing.angle, 45.0);
        assert_eq!(drawing.text_font, "Helvetica");
        assert_eq!(drawing.text_size, 12.0);
        assert!(drawing.validate().is_ok());
    }

    #[test]
    fn test_drawing_validation() {
        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.opacity = 1.5;
        assert!(drawing.validate().is_err());

        let mut drawing = DrawingOptions::new(WatermarkSource::Text("Draft".into()));
        drawing.image_scale = 0.0;
        assert!(drawing.validate().is_err());

        let drawing = DrawingOptions::new(WatermarkSource::Text(String::new()));
        assert!(matches!(
            drawing.validate(),
            Err(WatermarkError::NothingToDraw)
        ));
    }

    #[test]
    fn test_layout_validation() {
        let grid = GridOptions {
            horizontal_boxes: 0,
            ..GridOptions::default()
        };
        assert!(Layout::Grid(grid).validate().is_err());

        let insert = InsertOptions {
            x: 1.2,
            ..InsertOptions::default()
        };
        assert!(Layout::Insert(insert).validate().is_err());
        assert!(Layout::Insert(InsertOptions::default()).validate().is_ok());
    }

    #[test]
    fn test_files_single_file_defaults_to_in_place() {
        let file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        let files = FilesOptions::new(file.path(), None).unwrap();
        let pairs: Vec<_> = files.iter().collect();
        assert_eq!(pairs, vec![(file.path(), file.path())]);
    }

    #[test]
    fn test_files_directory_is_mirrored() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        std::fs::create_dir(input.path().join("nested")).unwrap();
        std::fs::write(input.path().join("b.pdf"), b"%PDF-").unwrap();
        std::fs::write(input.path().join("nested/a.PDF"), b"%PDF-").unwrap();
        std::fs::write(input.path().join("notes.txt"), b"skip").unwrap();

        let files = FilesOptions::new(input.path(), Some(output.path())).unwrap();
        let pairs: Vec<(PathBuf, PathBuf)> = files
            .iter()
            .map(|(i, o)| (i.to_path_buf(), o.to_path_buf()))
            .collect();

        assert_eq!(
            pairs,
            vec![
                (input.path().join("b.pdf"), output.path().join("b.pdf")),
                (
                    input.path().join("nested/a.PDF"),
                    output.path().join("nested/a.PDF")
                ),
            ]
        );
    }

    #[test]
    fn test_files_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pdf");
        assert!(matches!(
            FilesOptions::new(&missing, None),
            Err(WatermarkError::InputNotFound(_))
        ));
    }
}
