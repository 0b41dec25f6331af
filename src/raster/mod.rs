//! Raster conversion - encoded image bytes to a 64x64 RGB565 grid
//!
//! The pipeline is: decode, optional center-square crop, resize to the
//! display size, then pack every pixel into 16 bits.
//!
//! Channel placement is blue-red-green rather than the usual red-green-blue:
//!
//! ```text
//! 15      11 10        5 4       0
//! [ B7..B3 ] [ R7..R2  ] [ G7..G3 ]
//! ```
//!
//! The target display expects this order, so it must not be "corrected".

use image::imageops::FilterType;
use image::DynamicImage;
use serde::Serialize;
use thiserror::Error;

/// Output grid width in pixels
pub const GRID_WIDTH: u32 = 64;

/// Output grid height in pixels
pub const GRID_HEIGHT: u32 = 64;

/// How the source is framed before resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CropMode {
    /// Resize the whole image, distorting non-square sources
    #[default]
    None,
    /// Crop the longer axis to a centered square first
    CenterSquare,
}

/// Raster conversion errors
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Square region selected by a center crop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRegion {
    pub left: u32,
    pub top: u32,
    pub size: u32,
}

impl CropRegion {
    /// Largest centered square inside a `width x height` image
    pub fn center_square(width: u32, height: u32) -> Self {
        let size = width.min(height);
        Self {
            left: (width - size) / 2,
            top: (height - size) / 2,
            size,
        }
    }
}

/// Pack 8-bit channels into the display's 16-bit layout
pub fn pack_rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((b as u16 & 0b1111_1000) << 8) | ((r as u16 & 0b1111_1100) << 3) | (g as u16 >> 3)
}

/// A 64x64 grid of packed pixels, row-major with a top-left origin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PixelGrid {
    width: u32,
    height: u32,
    data: Vec<Vec<u16>>,
}

impl PixelGrid {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> &[Vec<u16>] {
        &self.data
    }

    /// Packed value at column `x`, row `y`
    pub fn get(&self, x: u32, y: u32) -> Option<u16> {
        self.data
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }
}

/// Converts source images into [`PixelGrid`]s
///
/// Stateless apart from the resampling filter, so one instance can be
/// shared by every request.
#[derive(Debug, Clone, Copy)]
pub struct RasterConverter {
    filter: FilterType,
}

impl Default for RasterConverter {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl RasterConverter {
    /// Create a converter with a specific resampling filter
    pub fn with_filter(filter: FilterType) -> Self {
        Self { filter }
    }

    /// Decode `bytes` and convert them
    pub fn convert(&self, bytes: &[u8], crop: CropMode) -> Result<PixelGrid, RasterError> {
        let image = image::load_from_memory(bytes)?;
        Ok(self.convert_image(&image, crop))
    }

    /// Convert an already decoded image
    pub fn convert_image(&self, image: &DynamicImage, crop: CropMode) -> PixelGrid {
        let framed = match crop {
            CropMode::None => image.clone(),
            CropMode::CenterSquare => {
                let region = CropRegion::center_square(image.width(), image.height());
                image.crop_imm(region.left, region.top, region.size, region.size)
            }
        };

        let rgba = framed
            .resize_exact(GRID_WIDTH, GRID_HEIGHT, self.filter)
            .to_rgba8();

        let data = rgba
            .rows()
            .map(|row| {
                row.map(|pixel| {
                    let [r, g, b, _] = pixel.0;
                    pack_rgb565(r, g, b)
                })
                .collect()
            })
            .collect();

        PixelGrid {
            width: GRID_WIDTH,
            height: GRID_HEIGHT,
            data,
        }
    }
}
