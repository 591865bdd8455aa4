//! Game-side state: the active map, the player, and the quest hand-off.
//!
//! Everything here lives on the UI thread except [`SlotGuard`] and
//! [`Lifetime`], which travel with the in-flight quest request.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::assets::{AssetSource, TilesetAsset};
use crate::config::ClientConfig;
use crate::input::InputCapture;
use crate::motion::{BlockingTiles, MoveError, Player};
use crate::quest::{Quest, TilePoint};
use crate::tilemap::{RenderError, RenderSummary, TileGrid, TilemapRenderer};

pub const DEFAULT_MAP_WIDTH: usize = 50;
pub const DEFAULT_MAP_HEIGHT: usize = 37;
/// Preferred start on the default map; a floor tile of the test pattern.
pub const DEFAULT_SPAWN: TilePoint = TilePoint { x: 6, y: 5 };

// ── Single-flight slot ───────────────────────────────────────────────────────

/// At most one quest request in flight.
#[derive(Debug, Clone, Default)]
pub struct RequestSlot {
    busy: Arc<AtomicBool>,
}

impl RequestSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, or `None` if a request already holds it.
    pub fn try_acquire(&self) -> Option<SlotGuard> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SlotGuard { busy: Arc::clone(&self.busy) })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Frees its [`RequestSlot`] when dropped.
#[derive(Debug)]
pub struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

// ── Lifetime ─────────────────────────────────────────────────────────────────

/// Cancellation flag shared with async continuations.
#[derive(Debug, Clone, Default)]
pub struct Lifetime {
    cancelled: Arc<AtomicBool>,
}

impl Lifetime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        !self.cancelled.swap(true, Ordering::AcqRel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

// ── Spawn ────────────────────────────────────────────────────────────────────

fn walkable(grid: &TileGrid, blocking: &BlockingTiles, x: i32, y: i32) -> bool {
    grid.get(x, y).is_some_and(|tile| !blocking.contains(tile))
}

/// `preferred` if it is inside `grid` and walkable, otherwise the first
/// walkable tile in row-major order. `None` only when nothing is walkable.
pub fn walkable_spawn(grid: &TileGrid, blocking: &BlockingTiles, preferred: Option<TilePoint>) -> Option<TilePoint> {
    if let Some(spawn) = preferred {
        if walkable(grid, blocking, spawn.x, spawn.y) {
            return Some(spawn);
        }
        warn!("Spawn ({}, {}) is not walkable, searching for another", spawn.x, spawn.y);
    }
    grid.cells()
        .find(|&(_, _, tile)| !blocking.contains(tile))
        .map(|(x, y, _)| TilePoint { x: x as i32, y: y as i32 })
}

/// Pick the player's start tile on `grid` from the quest's own spawn.
pub fn resolve_spawn(quest: &Quest, grid: &TileGrid, blocking: &BlockingTiles) -> Option<TilePoint> {
    walkable_spawn(grid, blocking, quest.spawn_point())
}

// ── Session ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum QuestApplyError {
    #[error("quest has no maps")]
    NoMaps,
    #[error("quest map has no walkable tile")]
    NoWalkableTile,
}

pub struct GameSession {
    grid: TileGrid,
    player: Player,
    input: InputCapture,
    tiles: TilemapRenderer,
    quest: Option<Quest>,
    slot: RequestSlot,
    lifetime: Lifetime,
    map_dirty: bool,
}

impl GameSession {
    /// A session on the default test map, the player on [`DEFAULT_SPAWN`]
    /// or the first walkable tile if the configured blocking tiles rule it out.
    pub fn new(config: &ClientConfig, tileset: TilesetAsset, input: InputCapture) -> Self {
        let grid = TileGrid::test_pattern(DEFAULT_MAP_WIDTH, DEFAULT_MAP_HEIGHT);
        let blocking = BlockingTiles::new(config.blocking_tiles.iter().copied());
        let spawn = walkable_spawn(&grid, &blocking, Some(DEFAULT_SPAWN)).unwrap_or(DEFAULT_SPAWN);
        let player = Player::new(spawn.x, spawn.y)
            .with_tile_size(tileset.tile_size)
            .with_speed(config.player_speed)
            .with_blocking_tiles(blocking);
        Self {
            grid,
            player,
            input,
            tiles: TilemapRenderer::new(tileset, config.window_width, config.window_height),
            quest: None,
            slot: RequestSlot::new(),
            lifetime: Lifetime::new(),
            map_dirty: true,
        }
    }

    /// Load the tileset and lay out the current map.
    pub async fn load(&mut self, source: &impl AssetSource) -> Result<RenderSummary, RenderError> {
        self.tiles.load(source).await?;
        self.map_dirty = true;
        self.redraw_if_dirty()?
            .ok_or(RenderError::NotLoaded(self.tiles.tileset().id))
    }

    /// One fixed-timestep update: advance motion, then start a move if a
    /// direction is held. `None` when no direction is held.
    pub fn tick(&mut self) -> Option<Result<(), MoveError>> {
        self.player.update();
        let (dx, dy) = self.input.poll_direction();
        if dx == 0 && dy == 0 {
            return None;
        }
        let result = self.player.try_move(dx, dy, &self.grid);
        if let Err(e) = &result {
            if *e != MoveError::Busy {
                debug!("Move rejected: {e}");
            }
        }
        Some(result)
    }

    /// Swap in the quest's first map and respawn the player. The new map is
    /// laid out on the next [`redraw_if_dirty`](Self::redraw_if_dirty).
    pub fn apply_quest(&mut self, quest: Quest) -> Result<(), QuestApplyError> {
        if self.lifetime.is_cancelled() {
            debug!("Session closed, dropping quest '{}'", quest.title);
            return Ok(());
        }
        let map = quest.first_map().ok_or(QuestApplyError::NoMaps)?;
        let grid = map.tiles.clone();
        let spawn = resolve_spawn(&quest, &grid, self.player.blocking_tiles())
            .ok_or(QuestApplyError::NoWalkableTile)?;

        info!(
            "Quest '{}': map {}x{}, spawn ({}, {})",
            quest.title,
            grid.width(),
            grid.height(),
            spawn.x,
            spawn.y
        );
        for objective in &quest.objectives {
            info!("  objective: {objective}");
        }

        self.grid = grid;
        self.player.set_position(spawn.x, spawn.y);
        self.quest = Some(quest);
        self.map_dirty = true;
        Ok(())
    }

    /// Re-lay the map if it changed. `Ok(None)` when nothing was dirty.
    pub fn redraw_if_dirty(&mut self) -> Result<Option<RenderSummary>, RenderError> {
        if !self.map_dirty {
            return Ok(None);
        }
        let summary = self.tiles.render(&self.grid)?;
        self.map_dirty = false;
        Ok(Some(summary))
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.tiles.set_viewport(width, height);
    }

    /// Cancel pending work, release input and drop map resources.
    /// Only the first call does anything.
    pub fn teardown(&mut self) -> bool {
        if !self.lifetime.cancel() {
            return false;
        }
        self.input.release();
        self.tiles.destroy();
        info!("Game session torn down");
        true
    }

    pub fn grid(&self) -> &TileGrid { &self.grid }
    pub fn player(&self) -> &Player { &self.player }
    pub fn tiles(&self) -> &TilemapRenderer { &self.tiles }
    pub fn input(&self) -> &InputCapture { &self.input }
    pub fn quest(&self) -> Option<&Quest> { self.quest.as_ref() }
    pub fn slot(&self) -> &RequestSlot { &self.slot }
    pub fn lifetime(&self) -> &Lifetime { &self.lifetime }
    pub fn is_map_dirty(&self) -> bool { self.map_dirty }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
