//! Image watermarks
//!
//! The picture is decoded once and embedded as a Flate-compressed RGB image
//! XObject. Transparency is kept through a separate greyscale soft mask.

use crate::error::WatermarkError;
use crate::geometry::Size;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Object, Stream};
use std::io::Write;
use std::path::Path;

/// Decoded image pixels ready to embed
#[derive(Debug, Clone)]
pub struct WatermarkImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

impl WatermarkImage {
    /// Decode a PNG or JPEG file
    pub fn open(path: &Path) -> Result<Self, WatermarkError> {
        let decoded = image::open(path).map_err(|e| {
            WatermarkError::ImageError(format!("{}: {}", path.display(), e))
        })?;
        Ok(Self::from_dynamic(decoded))
    }

    /// Decode an image held in memory
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WatermarkError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| WatermarkError::ImageError(e.to_string()))?;
        Ok(Self::from_dynamic(decoded))
    }

    fn from_dynamic(decoded: image::DynamicImage) -> Self {
        let has_alpha = decoded.color().has_alpha();
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        let pixels = rgba.into_raw();
        let mut rgb = Vec::with_capacity(pixels.len() / 4 * 3);
        let mut alpha = Vec::with_capacity(if has_alpha { pixels.len() / 4 } else { 0 });
        for px in pixels.chunks_exact(4) {
            rgb.extend_from_slice(&px[..3]);
            if has_alpha {
                alpha.push(px[3]);
            }
        }

        Self {
            width,
            height,
            rgb,
            alpha: has_alpha.then_some(alpha),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Natural drawing size: one point per pixel
    pub fn natural_size(&self) -> Size {
        Size::new(f64::from(self.width), f64::from(self.height))
    }

    /// Image XObject stream plus the soft mask stream when the image has
    /// transparency. The caller wires the mask in with [`attach_soft_mask`].
    pub fn to_streams(&self) -> Result<(Stream, Option<Stream>), WatermarkError> {
        let image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(self.width),
                "Height" => i64::from(self.height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            deflate(&self.rgb)?,
        );

        let mask = match &self.alpha {
            Some(alpha) => Some(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(self.width),
                    "Height" => i64::from(self.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                    "Filter" => "FlateDecode",
                },
                deflate(alpha)?,
            )),
            None => None,
        };

        Ok((image, mask))
    }
}

/// Point an image XObject at its soft mask object
pub fn attach_soft_mask(image: &mut Stream, mask_id: lopdf::ObjectId) {
    image.dict.set("SMask", Object::Reference(mask_id));
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, WatermarkError> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
