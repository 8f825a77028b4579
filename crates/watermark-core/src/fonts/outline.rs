//! Text drawn as filled glyph outlines
//!
//! Used for installed TrueType/OpenType fonts (including collections such as
//! the usual CJK `.ttc` files). The glyphs become plain vector paths, so no
//! font program is embedded and the text cannot be selected.

use crate::error::WatermarkError;
use lopdf::content::Operation;
use std::fmt;
use ttf_parser::{Face, OutlineBuilder};

/// An installed font face, kept as raw bytes and parsed on use
#[derive(Clone)]
pub struct OutlineFont {
    family: String,
    data: Vec<u8>,
    index: u32,
}

impl fmt::Debug for OutlineFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineFont")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl OutlineFont {
    /// Wrap font bytes, checking that face `index` parses
    pub fn from_bytes(
        family: impl Into<String>,
        data: Vec<u8>,
        index: u32,
    ) -> Result<Self, WatermarkError> {
        Face::parse(&data, index)
            .map_err(|e| WatermarkError::FontError(format!("Failed to parse font: {}", e)))?;
        Ok(Self {
            family: family.into(),
            data,
            index,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn face(&self) -> Result<Face<'_>, WatermarkError> {
        Face::parse(&self.data, self.index)
            .map_err(|e| WatermarkError::FontError(format!("Failed to parse font: {}", e)))
    }

    /// Whether every non-whitespace character of `text` has a glyph
    pub fn covers(&self, text: &str) -> Result<bool, WatermarkError> {
        let face = self.face()?;
        Ok(text
            .chars()
            .filter(|c| !c.is_whitespace())
            .all(|c| face.glyph_index(c).is_some()))
    }

    /// Width of `text` in points at `size`
    pub fn string_width(&self, text: &str, size: f64) -> Result<f64, WatermarkError> {
        let face = self.face()?;
        let units: u32 = text
            .chars()
            .map(|c| {
                face.glyph_index(c)
                    .and_then(|gid| face.glyph_hor_advance(gid))
                    .map(u32::from)
                    .unwrap_or(0)
            })
            .sum();
        Ok(f64::from(units) * size / f64::from(face.units_per_em()))
    }

    /// Path operations filling `text` with its baseline starting at (x, y)
    pub fn text_operations(
        &self,
        text: &str,
        x: f64,
        y: f64,
        size: f64,
    ) -> Result<Vec<Operation>, WatermarkError> {
        let face = self.face()?;
        let scale = size / f64::from(face.units_per_em());

        let mut builder = PathBuilder {
            operations: Vec::new(),
            origin_x: x,
            origin_y: y,
            scale,
        };

        for c in text.chars() {
            let Some(gid) = face.glyph_index(c) else {
                continue;
            };
            face.outline_glyph(gid, &mut builder);
            let advance = face.glyph_hor_advance(gid).unwrap_or(0);
            builder.origin_x += f64::from(advance) * scale;
        }

        let mut operations = builder.operations;
        if !operations.is_empty() {
            operations.push(Operation::new("f", vec![]));
        }
        Ok(operations)
    }
}

/// Collects glyph outlines as PDF path operators in page units
struct PathBuilder {
    operations: Vec<Operation>,
    origin_x: f64,
    origin_y: f64,
    scale: f64,
}

impl PathBuilder {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (self.origin_x + f64::from(x) * self.scale) as f32,
            (self.origin_y + f64::from(y) * self.scale) as f32,
        )
    }

    fn current_point(&self) -> Option<(f32, f32)> {
        let last = self.operations.last()?;
        let n = last.operands.len();
        if n < 2 {
            return None;
        }
        let x = last.operands[n - 2].as_float().ok()?;
        let y = last.operands[n - 1].as_float().ok()?;
        Some((x, y))
    }
}

impl OutlineBuilder for PathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.operations
            .push(Operation::new("m", vec![px.into(), py.into()]));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (px, py) = self.point(x, y);
        self.operations
            .push(Operation::new("l", vec![px.into(), py.into()]));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (cx, cy) = self.point(x1, y1);
        let (ex, ey) = self.point(x, y);
        let (sx, sy) = self.current_point().unwrap_or((ex, ey));

        let c1x = sx + 2.0 / 3.0 * (cx - sx);
        let c1y = sy + 2.0 / 3.0 * (cy - sy);
        let c2x = ex + 2.0 / 3.0 * (cx - ex);
        let c2y = ey + 2.0 / 3.0 * (cy - ey);

        self.operations.push(Operation::new(
            "c",
            vec![
                c1x.into(),
                c1y.into(),
                c2x.into(),
                c2y.into(),
                ex.into(),
                ey.into(),
            ],
        ));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (c1x, c1y) = self.point(x1, y1);
        let (c2x, c2y) = self.point(x2, y2);
        let (ex, ey) = self.point(x, y);
        self.operations.push(Operation::new(
            "c",
            vec![
                c1x.into(),
                c1y.into(),
                c2x.into(),
                c2y.into(),
                ex.into(),
                ey.into(),
            ],
        ));
    }

    fn close(&mut self) {
        self.operations.push(Operation::new("h", vec![]));
    }
}
