use image::RgbaImage;

use crate::assets::{AssetError, TilesetAsset};

/// One cell of a sliced tileset: its pixel rectangle inside the source image
/// and the matching UV rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileFrame {
    pub index: u32,
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
}

/// A decoded tileset image plus its row-major list of cell frames.
#[derive(Debug, Clone)]
pub struct TileTextures {
    image: RgbaImage,
    frames: Vec<TileFrame>,
    tile_size: u32,
}

impl TileTextures {
    /// Decode PNG bytes and slice them according to `tileset`.
    pub fn from_png(bytes: &[u8], tileset: &TilesetAsset) -> Result<Self, AssetError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Self::slice(image, tileset.tile_size, tileset.grid_width, tileset.grid_height)
    }

    /// Slice `image` into `cols × rows` cells of `tile_size` pixels.
    ///
    /// The image may be larger than the grid (extra pixels are ignored) but
    /// not smaller.
    pub fn slice(image: RgbaImage, tile_size: u32, cols: u32, rows: u32) -> Result<Self, AssetError> {
        let (img_w, img_h) = image.dimensions();
        if tile_size == 0 || cols * tile_size > img_w || rows * tile_size > img_h {
            return Err(AssetError::Geometry {
                actual_w: img_w,
                actual_h: img_h,
                cols,
                rows,
                tile_size,
            });
        }

        let total_w = img_w as f32;
        let total_h = img_h as f32;
        let frames = (0..cols * rows)
            .map(|index| {
                let x = (index % cols) * tile_size;
                let y = (index / cols) * tile_size;
                TileFrame {
                    index,
                    x,
                    y,
                    size: tile_size,
                    uv_min: [x as f32 / total_w, y as f32 / total_h],
                    uv_max: [(x + tile_size) as f32 / total_w, (y + tile_size) as f32 / total_h],
                }
            })
            .collect();

        Ok(Self { image, frames, tile_size })
    }

    pub fn len(&self) -> usize { self.frames.len() }
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }
    pub fn tile_size(&self) -> u32 { self.tile_size }
    pub fn image(&self) -> &RgbaImage { &self.image }
    pub fn frames(&self) -> &[TileFrame] { &self.frames }

    /// Frame for a tile index; negative or out-of-range indices yield `None`.
    pub fn get(&self, index: i32) -> Option<&TileFrame> {
        usize::try_from(index).ok().and_then(|i| self.frames.get(i))
    }

    /// Copy of a single cell's pixels.
    pub fn cell_pixels(&self, index: i32) -> Option<RgbaImage> {
        let frame = self.get(index)?;
        Some(image::imageops::crop_imm(&self.image, frame.x, frame.y, frame.size, frame.size).to_image())
    }
}
