//! Tile-grid movement with smooth pixel interpolation.

use glam::{IVec2, Vec2};

use crate::tilemap::{TileGrid, DECORATION_TILE, WALL_TILE};

pub const DEFAULT_TILE_SIZE: u32 = 16;
/// Pixels travelled per tick on each axis.
pub const DEFAULT_SPEED: f32 = 2.0;
pub const DEFAULT_BLOCKING_TILES: [i32; 2] = [WALL_TILE, DECORATION_TILE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Idle,
    /// Interpolating toward a committed target tile.
    Moving,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    #[error("a move is already in progress")]
    Busy,
    #[error("no direction given")]
    NoDirection,
    #[error("tile ({x}, {y}) is outside the map")]
    OutOfBounds { x: i32, y: i32 },
    #[error("tile ({x}, {y}) is blocked by tile {tile}")]
    Blocked { x: i32, y: i32, tile: i32 },
}

/// Tile ids the player cannot walk onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockingTiles(Vec<i32>);

impl BlockingTiles {
    pub fn new(ids: impl IntoIterator<Item = i32>) -> Self {
        Self(ids.into_iter().collect())
    }

    pub fn none() -> Self { Self(Vec::new()) }

    pub fn contains(&self, tile: i32) -> bool { self.0.contains(&tile) }

    pub fn ids(&self) -> &[i32] { &self.0 }
}

impl Default for BlockingTiles {
    fn default() -> Self { Self::new(DEFAULT_BLOCKING_TILES) }
}

/// Move `current` one step of at most `speed` toward `target`, landing
/// exactly on it once within reach.
fn step_axis(current: f32, target: f32, speed: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= speed {
        target
    } else {
        current + delta.signum() * speed
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    tile: IVec2,
    pixel: Vec2,
    target: Vec2,
    state: MotionState,
    speed: f32,
    tile_size: u32,
    blocking: BlockingTiles,
}

impl Player {
    pub fn new(x: i32, y: i32) -> Self {
        let mut player = Self {
            tile: IVec2::ZERO,
            pixel: Vec2::ZERO,
            target: Vec2::ZERO,
            state: MotionState::Idle,
            speed: DEFAULT_SPEED,
            tile_size: DEFAULT_TILE_SIZE,
            blocking: BlockingTiles::default(),
        };
        player.set_position(x, y);
        player
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.max(f32::EPSILON);
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size.max(1);
        let (x, y) = (self.tile.x, self.tile.y);
        self.set_position(x, y);
        self
    }

    pub fn with_blocking_tiles(mut self, blocking: BlockingTiles) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn tile_position(&self) -> IVec2 { self.tile }
    pub fn pixel_position(&self) -> Vec2 { self.pixel }
    pub fn target_pixel(&self) -> Vec2 { self.target }
    pub fn state(&self) -> MotionState { self.state }
    pub fn is_moving(&self) -> bool { self.state == MotionState::Moving }
    pub fn speed(&self) -> f32 { self.speed }
    pub fn tile_size(&self) -> u32 { self.tile_size }
    pub fn blocking_tiles(&self) -> &BlockingTiles { &self.blocking }

    fn tile_origin(&self, tile: IVec2) -> Vec2 {
        tile.as_vec2() * self.tile_size as f32
    }

    /// Commit a one-tile move by `(dx, dy)` if the destination is walkable.
    ///
    /// The logical tile changes immediately; the pixel position catches up
    /// over the following [`update`](Self::update) calls. Requests made
    /// while a move is in flight are dropped.
    pub fn try_move(&mut self, dx: i32, dy: i32, grid: &TileGrid) -> Result<(), MoveError> {
        if self.state == MotionState::Moving {
            return Err(MoveError::Busy);
        }
        if dx == 0 && dy == 0 {
            return Err(MoveError::NoDirection);
        }

        let dest = self.tile + IVec2::new(dx.signum(), dy.signum());
        let Some(tile) = grid.get(dest.x, dest.y) else {
            return Err(MoveError::OutOfBounds { x: dest.x, y: dest.y });
        };
        if self.blocking.contains(tile) {
            return Err(MoveError::Blocked { x: dest.x, y: dest.y, tile });
        }

        self.tile = dest;
        self.target = self.tile_origin(dest);
        self.state = MotionState::Moving;
        Ok(())
    }

    /// Advance the interpolation by one tick. No-op while idle.
    pub fn update(&mut self) {
        if self.state == MotionState::Idle {
            return;
        }
        self.pixel.x = step_axis(self.pixel.x, self.target.x, self.speed);
        self.pixel.y = step_axis(self.pixel.y, self.target.y, self.speed);
        if self.pixel == self.target {
            self.state = MotionState::Idle;
        }
    }

    /// Teleport to `(x, y)`, cancelling any move in flight.
    pub fn set_position(&mut self, x: i32, y: i32) {
        self.tile = IVec2::new(x, y);
        self.target = self.tile_origin(self.tile);
        self.pixel = self.target;
        self.state = MotionState::Idle;
    }
}
