use glam::Vec2;
use log::{debug, info, warn};

use super::grid::TileGrid;
use super::tileset::{TileFrame, TileTextures};
use crate::assets::{AssetError, AssetSource, TilesetAsset};

/// Fraction of the viewport a fitted map may occupy.
pub const FIT_MARGIN: f32 = 0.95;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("tileset '{0}' has not been loaded")]
    NotLoaded(&'static str),
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// One visual tile placed on the map, in unscaled map pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedTile {
    pub texture: u32,
    pub col: u32,
    pub row: u32,
    pub position: Vec2,
}

/// Uniform scale plus offset that maps map pixels to viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitTransform {
    pub scale: f32,
    pub offset: Vec2,
}

impl FitTransform {
    pub const IDENTITY: Self = Self { scale: 1.0, offset: Vec2::ZERO };

    pub fn apply(&self, map_px: Vec2) -> Vec2 {
        map_px * self.scale + self.offset
    }
}

impl Default for FitTransform {
    fn default() -> Self { Self::IDENTITY }
}

/// Scale a `map_w × map_h` pixel map into the viewport and centre it.
///
/// ```text
/// scale = min(vw / map_w, vh / map_h, 1) * 0.95
/// ```
/// Maps larger than the viewport shrink; smaller maps are never enlarged.
pub fn fit_to_viewport(map_size: Vec2, viewport: Vec2) -> FitTransform {
    if map_size.x <= 0.0 || map_size.y <= 0.0 {
        return FitTransform::IDENTITY;
    }
    let scale = (viewport.x / map_size.x).min(viewport.y / map_size.y).min(1.0) * FIT_MARGIN;
    let offset = (viewport - map_size * scale) / 2.0;
    FitTransform { scale, offset }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderSummary {
    pub placed: usize,
    /// Cells with a negative index.
    pub empty: usize,
    /// Cells whose index is past the end of the tileset.
    pub unknown: usize,
    pub scale: f32,
}

/// Turns a [`TileGrid`] into placed tiles for a loaded tileset.
pub struct TilemapRenderer {
    tileset: TilesetAsset,
    textures: Option<TileTextures>,
    placed: Vec<PlacedTile>,
    transform: FitTransform,
    viewport: Vec2,
    map_size: Vec2,
}

impl TilemapRenderer {
    pub fn new(tileset: TilesetAsset, viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            tileset,
            textures: None,
            placed: Vec::new(),
            transform: FitTransform::IDENTITY,
            viewport: Vec2::new(viewport_width as f32, viewport_height as f32),
            map_size: Vec2::ZERO,
        }
    }

    /// Fetch and slice the tileset image. Loading twice is a no-op.
    pub async fn load(&mut self, source: &impl AssetSource) -> Result<(), RenderError> {
        if self.textures.is_some() {
            return Ok(());
        }
        info!("Loading tileset '{}' from {}", self.tileset.id, self.tileset.path);
        let bytes = source.fetch(self.tileset.path).await?;
        self.load_from_bytes(&bytes)
    }

    /// Slice already-fetched PNG bytes.
    pub fn load_from_bytes(&mut self, png_bytes: &[u8]) -> Result<(), RenderError> {
        let textures = TileTextures::from_png(png_bytes, &self.tileset)?;
        info!("Tileset loaded: {} tiles extracted", textures.len());
        self.textures = Some(textures);
        Ok(())
    }

    pub fn is_loaded(&self) -> bool { self.textures.is_some() }
    pub fn tileset(&self) -> &TilesetAsset { &self.tileset }
    pub fn textures(&self) -> Option<&TileTextures> { self.textures.as_ref() }
    pub fn texture_count(&self) -> usize { self.textures.as_ref().map_or(0, TileTextures::len) }
    pub fn placed(&self) -> &[PlacedTile] { &self.placed }
    pub fn transform(&self) -> FitTransform { self.transform }
    pub fn viewport(&self) -> Vec2 { self.viewport }
    pub fn map_size(&self) -> Vec2 { self.map_size }

    pub fn frame(&self, texture: u32) -> Option<&TileFrame> {
        self.textures.as_ref()?.frames().get(texture as usize)
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = Vec2::new(width as f32, height as f32);
        self.transform = fit_to_viewport(self.map_size, self.viewport);
    }

    /// Replace the placed tiles with one tile per drawable cell of `grid`.
    ///
    /// Negative cells are empty. Indices past the end of the tileset are
    /// skipped with a warning.
    pub fn render(&mut self, grid: &TileGrid) -> Result<RenderSummary, RenderError> {
        let Some(textures) = self.textures.as_ref() else {
            return Err(RenderError::NotLoaded(self.tileset.id));
        };
        self.placed.clear();

        let tile_size = self.tileset.tile_size;
        let mut summary = RenderSummary::default();
        for (x, y, tile) in grid.cells() {
            if tile < 0 {
                summary.empty += 1;
                continue;
            }
            let Some(frame) = textures.get(tile) else {
                warn!("Tile index {tile} not found in tileset '{}'", self.tileset.id);
                summary.unknown += 1;
                continue;
            };
            self.placed.push(PlacedTile {
                texture: frame.index,
                col: x as u32,
                row: y as u32,
                position: Vec2::new((x as u32 * tile_size) as f32, (y as u32 * tile_size) as f32),
            });
        }
        summary.placed = self.placed.len();

        self.map_size = Vec2::new(
            (grid.width() as u32 * tile_size) as f32,
            (grid.height() as u32 * tile_size) as f32,
        );
        self.transform = fit_to_viewport(self.map_size, self.viewport);
        summary.scale = self.transform.scale;

        debug!(
            "Tilemap rendered: {}x{} tiles, scale: {}%",
            grid.width(),
            grid.height(),
            (self.transform.scale * 100.0).round()
        );
        Ok(summary)
    }

    /// Drop every placed tile; the tileset stays loaded.
    pub fn clear(&mut self) {
        self.placed.clear();
    }

    /// Drop placed tiles and the sliced tileset.
    pub fn destroy(&mut self) {
        self.placed.clear();
        self.textures = None;
    }
}
