pub mod grid;
pub mod renderer;
pub mod tileset;

pub use grid::{GridError, TileGrid, DECORATION_TILE, FLOOR_TILE, WALL_TILE};
pub use renderer::{fit_to_viewport, FitTransform, PlacedTile, RenderError, RenderSummary, TilemapRenderer};
pub use tileset::{TileFrame, TileTextures};
