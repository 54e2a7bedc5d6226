use image::{imageops::FilterType, DynamicImage, GenericImageView};

use crate::error::BufferError;

/// Uploaded images larger than this on either side are scaled down first.
pub const DEFAULT_MAX_SIDE: u32 = 800;

/// Decoded RGBA pixels, row-major.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl PixelBuffer {
    pub fn from_rgba(data: Vec<u8>, width: u32, height: u32) -> Result<Self, BufferError> {
        if data.len() != width as usize * height as usize * 4 {
            return Err(BufferError::SizeMismatch {
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Buffer filled with a single colour. Alpha is opaque.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = std::iter::repeat([rgb[0], rgb[1], rgb[2], 255])
            .take(width as usize * height as usize)
            .flatten()
            .collect();
        Self {
            data,
            width,
            height,
        }
    }

    pub fn from_image(img: &DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            data: rgba.into_raw(),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }
}

/// Shrink `img` so neither side exceeds `max_side`, keeping aspect ratio.
pub fn scale_to_fit(img: &DynamicImage, max_side: u32) -> (DynamicImage, f64) {
    let (width, height) = img.dimensions();
    if width <= max_side && height <= max_side {
        return (img.clone(), 1.0);
    }

    let ratio = (max_side as f64 / width as f64).min(max_side as f64 / height as f64);
    let new_width = ((width as f64 * ratio).round() as u32).max(1);
    let new_height = ((height as f64 * ratio).round() as u32).max(1);
    log::debug!("scaling {}x{} to {}x{}", width, height, new_width, new_height);
    (
        img.resize_exact(new_width, new_height, FilterType::Triangle),
        ratio,
    )
}
