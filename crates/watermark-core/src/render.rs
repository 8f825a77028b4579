//! Watermark rendering
//!
//! Draws the watermark onto a blank one-page PDF of the target page size.
//! The whole canvas is rotated once, so every position is computed in the
//! unrotated page layout and then moved into the rotated frame with
//! [`change_base`].

use crate::error::WatermarkError;
use crate::fonts::standard::encode_win_ansi;
use crate::fonts::{resolve_font, FontSource, ResolvedFont, StandardFont};
use crate::geometry::{centered_origin, change_base, fit_image, Point, RotationMatrix, Size};
use crate::options::{Alignment, DrawingOptions, GridOptions, InsertOptions, Layout};
use crate::picture::{attach_soft_mask, WatermarkImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, StringFormat};

const FONT_NAME: &str = "F0";
const IMAGE_NAME: &str = "Im0";
const GRAPHICS_STATE_NAME: &str = "GS0";

/// Everything that can be worked out once per run: the font text is drawn
/// with and the decoded image.
#[derive(Debug, Clone)]
pub struct PreparedWatermark {
    text: Option<(String, ResolvedFont)>,
    image: Option<WatermarkImage>,
}

impl PreparedWatermark {
    pub fn prepare(
        drawing: &DrawingOptions,
        fonts: &dyn FontSource,
    ) -> Result<Self, WatermarkError> {
        let text = drawing
            .text()
            .map(|text| (text.to_string(), resolve_font(drawing, fonts)));

        let image = match drawing.image() {
            Some(path) => {
                let image = WatermarkImage::open(path)?;
                tracing::debug!(
                    "Loaded image {} ({}x{})",
                    path.display(),
                    image.width(),
                    image.height()
                );
                Some(image)
            }
            None => None,
        };

        Ok(Self { text, image })
    }

    /// Build from parts already in hand
    pub fn from_parts(text: Option<(String, ResolvedFont)>, image: Option<WatermarkImage>) -> Self {
        Self { text, image }
    }

    pub fn image(&self) -> Option<&WatermarkImage> {
        self.image.as_ref()
    }

    fn text_width(&self, size: f64) -> Result<Option<f64>, WatermarkError> {
        match &self.text {
            Some((text, font)) => Ok(Some(font.string_width(text, size)?)),
            None => Ok(None),
        }
    }
}

/// A blank page being drawn on
pub struct WatermarkCanvas {
    width: f64,
    height: f64,
    rotation: RotationMatrix,
    operations: Vec<Operation>,
    standard_font: Option<StandardFont>,
    uses_image: bool,
}

impl WatermarkCanvas {
    /// Start a page, setting colour, opacity and rotation up front
    pub fn new(width: f64, height: f64, drawing: &DrawingOptions) -> Self {
        let rotation = RotationMatrix::from_degrees(drawing.angle);
        let color = drawing.text_color;
        let operations = vec![
            Operation::new("gs", vec![Object::Name(GRAPHICS_STATE_NAME.as_bytes().to_vec())]),
            Operation::new(
                "rg",
                vec![
                    Object::Real(color.r),
                    Object::Real(color.g),
                    Object::Real(color.b),
                ],
            ),
            Operation::new("cm", rotation.as_cm().iter().map(|v| real(*v)).collect()),
        ];

        Self {
            width,
            height,
            rotation,
            operations,
            standard_font: None,
            uses_image: false,
        }
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Text with its baseline centred on (x, y), in canvas coordinates
    fn draw_centred_text(
        &mut self,
        text: &str,
        font: &ResolvedFont,
        x: f64,
        y: f64,
        size: f64,
    ) -> Result<(), WatermarkError> {
        let left = x - font.string_width(text, size)? / 2.0;
        match font {
            ResolvedFont::Standard(standard) => {
                self.standard_font = Some(*standard);
                self.operations.extend([
                    Operation::new("BT", vec![]),
                    Operation::new(
                        "Tf",
                        vec![Object::Name(FONT_NAME.as_bytes().to_vec()), real(size)],
                    ),
                    Operation::new("Td", vec![real(left), real(y)]),
                    Operation::new(
                        "Tj",
                        vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
                    ),
                    Operation::new("ET", vec![]),
                ]);
            }
            ResolvedFont::Outline(outline) => {
                let paths = outline.text_operations(text, left, y, size)?;
                self.operations.extend(paths);
            }
        }
        Ok(())
    }

    /// Image of `size` centred on (x, y), in canvas coordinates
    fn draw_centred_image(&mut self, x: f64, y: f64, size: Size) {
        let origin = centered_origin(Point::new(x, y), size);
        self.uses_image = true;
        self.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(size.width),
                    real(0.0),
                    real(0.0),
                    real(size.height),
                    real(origin.x),
                    real(origin.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
    }

    /// Serialise the canvas as a one-page PDF
    pub fn finish(
        self,
        drawing: &DrawingOptions,
        prepared: &PreparedWatermark,
    ) -> Result<Vec<u8>, WatermarkError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut resources = Dictionary::new();

        let mut graphics_state = Dictionary::new();
        graphics_state.set("Type", Object::Name(b"ExtGState".to_vec()));
        graphics_state.set("ca", real(drawing.opacity));
        graphics_state.set("CA", real(drawing.opacity));
        let mut ext_g_states = Dictionary::new();
        ext_g_states.set(GRAPHICS_STATE_NAME, Object::Dictionary(graphics_state));
        resources.set("ExtGState", Object::Dictionary(ext_g_states));

        if let Some(font) = self.standard_font {
            let mut fonts = Dictionary::new();
            fonts.set(FONT_NAME, Object::Dictionary(font.to_dictionary()));
            resources.set("Font", Object::Dictionary(fonts));
        }

        if self.uses_image {
            let image = prepared.image().ok_or(WatermarkError::NothingToDraw)?;
            let (mut stream, mask) = image.to_streams()?;
            if let Some(mask) = mask {
                let mask_id = doc.add_object(Object::Stream(mask));
                attach_soft_mask(&mut stream, mask_id);
            }
            let image_id = doc.add_object(Object::Stream(stream));
            let mut xobjects = Dictionary::new();
            xobjects.set(IMAGE_NAME, Object::Reference(image_id));
            resources.set("XObject", Object::Dictionary(xobjects));
        }

        let content = Content {
            operations: self.operations,
        };
        let encoded = content.encode().map_err(|e| {
            WatermarkError::OperationError(format!("Failed to encode watermark content: {}", e))
        })?;
        let content_id = doc.add_object(Object::Stream(lopdf::Stream::new(
            Dictionary::new(),
            encoded,
        )));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(pages_id));
        page.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                real(self.width),
                real(self.height),
            ]),
        );
        page.set("Contents", Object::Reference(content_id));
        page.set("Resources", Object::Dictionary(resources));
        let page_id = doc.add_object(Object::Dictionary(page));

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
        pages.set("Count", Object::Integer(1));
        doc.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| {
            WatermarkError::OperationError(format!("Failed to save watermark page: {}", e))
        })?;
        Ok(buffer)
    }
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Draw one watermark centred on (x, y), given in page coordinates
pub fn draw_one_watermark(
    canvas: &mut WatermarkCanvas,
    x: f64,
    y: f64,
    drawing: &DrawingOptions,
    prepared: &PreparedWatermark,
    image_size: Size,
) -> Result<(), WatermarkError> {
    let p = change_base(x, y, &canvas.rotation);

    if let Some((text, font)) = &prepared.text {
        canvas.draw_centred_text(text, font, p.x, p.y, drawing.text_size)?;
    }

    if prepared.image.is_some() {
        canvas.draw_centred_image(p.x, p.y, image_size);
    }

    Ok(())
}

/// Place a single watermark at a fractional position of the page
pub fn draw_insert_watermark(
    canvas: &mut WatermarkCanvas,
    drawing: &DrawingOptions,
    insert: &InsertOptions,
    prepared: &PreparedWatermark,
) -> Result<(), WatermarkError> {
    let (width, height) = (canvas.width, canvas.height);
    let max_image_height = (2.0 * insert.y * height).min(2.0 * (2.0 * (1.0 - insert.y) * height));
    let mut image_size = Size::zero();

    let watermark_width = if let Some(text_width) = prepared.text_width(drawing.text_size)? {
        text_width
    } else if let Some(image) = &prepared.image {
        let max_image_width = match insert.horizontal_alignment {
            Alignment::Left => insert.x * width,
            Alignment::Right => (1.0 - insert.x) * width,
            Alignment::Center => (2.0 * (1.0 - insert.x) * width).min(2.0 * insert.x * width),
        };
        let natural = image.natural_size();
        image_size = fit_image(
            natural.width,
            natural.height,
            max_image_width,
            max_image_height,
            drawing.image_scale,
        );
        image_size.width
    } else {
        return Err(WatermarkError::NothingToDraw);
    };

    let offset = match insert.horizontal_alignment {
        Alignment::Left => -watermark_width / 2.0,
        Alignment::Right => watermark_width / 2.0,
        Alignment::Center => 0.0,
    };

    draw_one_watermark(
        canvas,
        insert.x * width + offset,
        insert.y * height,
        drawing,
        prepared,
        image_size,
    )
}

/// Page-layout centres of every grid watermark
///
/// Without margin the watermarks sit on the box corners, so there is one
/// more per axis than there are boxes. With margin they sit in the middle
/// of each box.
pub fn grid_points(width: f64, height: f64, grid: &GridOptions) -> Vec<Point> {
    let horizontal_spacing = width / f64::from(grid.horizontal_boxes);
    let vertical_spacing = height / f64::from(grid.vertical_boxes);
    let start = u32::from(grid.margin);

    let mut points = Vec::new();
    for x_index in start..=grid.horizontal_boxes {
        for y_index in start..=grid.vertical_boxes {
            let mut x = f64::from(x_index) * horizontal_spacing;
            let mut y = f64::from(y_index) * vertical_spacing;
            if grid.margin {
                x -= horizontal_spacing / 2.0;
                y -= vertical_spacing / 2.0;
            }
            points.push(Point::new(x, y));
        }
    }
    points
}

/// Tile the watermark over the page
pub fn draw_grid_watermark(
    canvas: &mut WatermarkCanvas,
    drawing: &DrawingOptions,
    grid: &GridOptions,
    prepared: &PreparedWatermark,
) -> Result<(), WatermarkError> {
    let horizontal_spacing = canvas.width / f64::from(grid.horizontal_boxes);
    let vertical_spacing = canvas.height / f64::from(grid.vertical_boxes);

    let image_size = match &prepared.image {
        Some(image) => {
            let natural = image.natural_size();
            fit_image(
                natural.width,
                natural.height,
                horizontal_spacing,
                vertical_spacing,
                drawing.image_scale,
            )
        }
        None => Size::zero(),
    };

    for point in grid_points(canvas.width, canvas.height, grid) {
        draw_one_watermark(canvas, point.x, point.y, drawing, prepared, image_size)?;
    }
    Ok(())
}

/// Render the watermark page for a page of `width` x `height` points
pub fn draw_watermarks(
    width: f64,
    height: f64,
    drawing: &DrawingOptions,
    layout: &Layout,
    prepared: &PreparedWatermark,
) -> Result<Vec<u8>, WatermarkError> {
    let mut canvas = WatermarkCanvas::new(width, height, drawing);

    match layout {
        Layout::Insert(insert) => draw_insert_watermark(&mut canvas, drawing, insert, prepared)?,
        Layout::Grid(grid) => draw_grid_watermark(&mut canvas, drawing, grid, prepared)?,
    }

    tracing::debug!(
        "Rendered watermark page {}x{} with {} operations",
        width,
        height,
        canvas.operations.len()
    );

    canvas.finish(drawing, prepared)
}
