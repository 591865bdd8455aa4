use std::io::Cursor;

use glam::IVec2;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::json;
use sgravoquest::assets::{self, MemorySource};
use sgravoquest::config::ClientConfig;
use sgravoquest::input::{KeyCode, KeyboardHub};
use sgravoquest::motion::{BlockingTiles, MoveError};
use sgravoquest::quest::{Quest, TilePoint};
use sgravoquest::session::{resolve_spawn, GameSession, Lifetime, QuestApplyError, RequestSlot};
use sgravoquest::tilemap::{RenderError, TileGrid};

fn tileset_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(192, 176, Rgba([0, 0, 0, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn session(hub: &KeyboardHub) -> GameSession {
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    GameSession::new(&ClientConfig::default(), tileset, hub.attach())
}

fn quest(value: serde_json::Value) -> Quest {
    Quest::from_value(value).unwrap()
}

fn walled_quest(start: serde_json::Value) -> Quest {
    quest(json!({
        "title": "Cellar",
        "description": "Rats",
        "objectives": ["Clear the cellar"],
        "maps": [{
            "id": "cellar",
            "tiles": [
                [14, 14, 14, 14],
                [14, 25, 1, 14],
                [14, 1, 1, 14],
                [14, 14, 14, 14]
            ],
            "startPosition": start
        }],
        "npcs": [],
        "enemies": []
    }))
}

// ── RequestSlot / Lifetime ────────────────────────────────────────────────────

#[test]
fn slot_admits_one_request_at_a_time() {
    let slot = RequestSlot::new();
    let guard = slot.try_acquire().unwrap();
    assert!(slot.is_busy());
    assert!(slot.try_acquire().is_none());
    drop(guard);
    assert!(!slot.is_busy());
    assert!(slot.try_acquire().is_some());
}

#[test]
fn slot_guard_can_be_released_from_another_thread() {
    let slot = RequestSlot::new();
    let guard = slot.try_acquire().unwrap();
    std::thread::spawn(move || drop(guard)).join().unwrap();
    assert!(!slot.is_busy());
}

#[test]
fn lifetime_cancels_once() {
    let lifetime = Lifetime::new();
    let shared = lifetime.clone();
    assert!(!shared.is_cancelled());
    assert!(lifetime.cancel());
    assert!(!lifetime.cancel());
    assert!(shared.is_cancelled());
}

// ── Spawn resolution ──────────────────────────────────────────────────────────

#[test]
fn start_position_is_used_when_walkable() {
    let quest = walled_quest(json!({ "x": 2, "y": 2 }));
    let grid = &quest.maps[0].tiles;
    let spawn = resolve_spawn(&quest, grid, &BlockingTiles::default());
    assert_eq!(spawn, Some(TilePoint { x: 2, y: 2 }));
}

#[test]
fn blocked_start_falls_back_to_first_walkable() {
    let quest = walled_quest(json!({ "x": 1, "y": 1 }));
    let grid = &quest.maps[0].tiles;
    let spawn = resolve_spawn(&quest, grid, &BlockingTiles::default());
    assert_eq!(spawn, Some(TilePoint { x: 2, y: 1 }));
}

#[test]
fn out_of_grid_start_falls_back() {
    let quest = walled_quest(json!({ "x": 40, "y": -3 }));
    let grid = &quest.maps[0].tiles;
    assert_eq!(resolve_spawn(&quest, grid, &BlockingTiles::default()), Some(TilePoint { x: 2, y: 1 }));
}

#[test]
fn player_entity_is_the_single_map_spawn() {
    let quest = quest(json!({
        "title": "Meadow",
        "description": "Grass",
        "objectives": ["Walk"],
        "map": { "width": 3, "height": 2, "tiles": [[0, 0, 0], [0, 0, 0]] },
        "entities": [
            { "type": "enemy", "x": 0, "y": 0, "name": "Slime" },
            { "type": "player", "x": 2, "y": 1 }
        ]
    }));
    let grid = &quest.maps[0].tiles;
    assert_eq!(resolve_spawn(&quest, grid, &BlockingTiles::default()), Some(TilePoint { x: 2, y: 1 }));
}

#[test]
fn fully_blocked_map_has_no_spawn() {
    let quest = walled_quest(json!(null));
    let grid = TileGrid::filled(3, 3, 14);
    assert_eq!(resolve_spawn(&quest, &grid, &BlockingTiles::default()), None);
}

// ── GameSession ───────────────────────────────────────────────────────────────

#[test]
fn starts_on_the_default_map() {
    let hub = KeyboardHub::new();
    let session = session(&hub);
    assert_eq!((session.grid().width(), session.grid().height()), (50, 37));
    assert_eq!(session.player().tile_position(), IVec2::new(6, 5));
    assert!(session.quest().is_none());
    assert!(session.is_map_dirty());
}

#[test]
fn default_spawn_is_walkable() {
    let hub = KeyboardHub::new();
    let session = session(&hub);
    let at = session.player().tile_position();
    let tile = session.grid().get(at.x, at.y).unwrap();
    assert!(!session.player().blocking_tiles().contains(tile), "spawned on blocking tile {tile}");
}

#[test]
fn default_spawn_respects_configured_blocking_tiles() {
    let hub = KeyboardHub::new();
    let config = ClientConfig { blocking_tiles: vec![1], ..ClientConfig::default() };
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    let session = GameSession::new(&config, tileset, hub.attach());
    // Floor blocks here, so the first non-floor tile (a wall corner) is used.
    assert_eq!(session.player().tile_position(), IVec2::ZERO);
}

#[test]
fn tick_without_input_only_advances_motion() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    assert_eq!(session.tick(), None);
}

#[test]
fn held_key_moves_the_player() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    hub.key_down(KeyCode::ArrowRight);

    assert_eq!(session.tick(), Some(Ok(())));
    assert_eq!(session.player().tile_position(), IVec2::new(7, 5));
    // Still interpolating toward (7, 5).
    assert_eq!(session.tick(), Some(Err(MoveError::Busy)));
}

#[test]
fn blocked_moves_leave_the_player_in_place() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    // (6, 4) is on the decoration stripe.
    hub.key_down(KeyCode::KeyW);
    assert_eq!(session.tick(), Some(Err(MoveError::Blocked { x: 6, y: 4, tile: 25 })));
    assert_eq!(session.player().tile_position(), IVec2::new(6, 5));
}

#[test]
fn applying_a_quest_swaps_map_and_spawn() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    session.apply_quest(walled_quest(json!({ "x": 2, "y": 2 }))).unwrap();

    assert_eq!((session.grid().width(), session.grid().height()), (4, 4));
    assert_eq!(session.player().tile_position(), IVec2::new(2, 2));
    assert_eq!(session.quest().unwrap().title, "Cellar");
    assert!(session.is_map_dirty());
}

#[test]
fn quest_without_maps_is_rejected() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    let empty = quest(json!({ "title": "Nothing", "maps": [] }));
    assert!(matches!(session.apply_quest(empty), Err(QuestApplyError::NoMaps)));
    assert_eq!(session.grid().width(), 50);
}

#[test]
fn redraw_needs_a_loaded_tileset() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    assert!(matches!(session.redraw_if_dirty(), Err(RenderError::NotLoaded(_))));
}

#[tokio::test]
async fn load_lays_out_the_default_map_once() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    let source = MemorySource::new().with("tilesets/tiny-dungeon.png", tileset_png());

    let summary = session.load(&source).await.unwrap();
    assert_eq!(summary.placed, 50 * 37);
    assert!(!session.is_map_dirty());
    assert_eq!(session.redraw_if_dirty().unwrap(), None);

    session.apply_quest(walled_quest(json!({ "x": 2, "y": 2 }))).unwrap();
    let summary = session.redraw_if_dirty().unwrap().unwrap();
    assert_eq!(summary.placed, 16);
}

#[test]
fn teardown_runs_once() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    assert_eq!(hub.listener_count(), 1);

    assert!(session.teardown());
    assert!(!session.teardown());
    assert!(session.lifetime().is_cancelled());
    assert!(!session.input().is_attached());
    assert_eq!(hub.listener_count(), 0);
    assert!(!session.tiles().is_loaded());
}

#[test]
fn quests_arriving_after_teardown_are_ignored() {
    let hub = KeyboardHub::new();
    let mut session = session(&hub);
    session.teardown();
    session.apply_quest(walled_quest(json!({ "x": 2, "y": 2 }))).unwrap();
    assert!(session.quest().is_none());
    assert_eq!(session.grid().width(), 50);
}

#[test]
fn dropping_the_session_detaches_input() {
    let hub = KeyboardHub::new();
    drop(session(&hub));
    assert_eq!(hub.listener_count(), 0);
}
