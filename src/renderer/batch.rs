//! CPU-side vertex assembly for a frame.

use std::collections::{BTreeMap, HashMap};

use glam::Vec2;

use super::pipeline::{quad, TileVertex, WHITE};
use crate::assets;
use crate::quest::{Placement, Quest, TilePoint};
use crate::tilemap::{FitTransform, TilemapRenderer};

/// Flat colour drawn for the player when no sprite is loaded.
pub const PLAYER_FALLBACK_TINT: [f32; 4] = [0.95, 0.8, 0.2, 1.0];

pub const NPC_SPRITE: &str = "npc";
pub const ENEMY_SPRITE: &str = "monster";
pub const ITEM_SPRITE: &str = "chest";

/// Flat colour for a sprite id whose image is not loaded.
pub fn fallback_tint(sprite: &str) -> [f32; 4] {
    match sprite {
        NPC_SPRITE => [0.3, 0.7, 0.95, 1.0],
        ENEMY_SPRITE => [0.9, 0.25, 0.25, 1.0],
        ITEM_SPRITE => [0.75, 0.55, 0.2, 1.0],
        _ => PLAYER_FALLBACK_TINT,
    }
}

/// Quads sharing one sprite image, drawn with a single bind group.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteBatch {
    pub sprite: &'static str,
    pub vertices: Vec<TileVertex>,
}

/// A non-player sprite standing on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpritePlacement {
    pub sprite: &'static str,
    pub at: TilePoint,
}

/// One textured quad per placed map tile, in viewport pixels.
pub fn map_vertices(tiles: &TilemapRenderer) -> Vec<TileVertex> {
    let transform = tiles.transform();
    let size = Vec2::splat(tiles.tileset().tile_size as f32 * transform.scale);
    let mut verts = Vec::with_capacity(tiles.placed().len() * 6);
    for placed in tiles.placed() {
        let Some(frame) = tiles.frame(placed.texture) else { continue };
        verts.extend_from_slice(&quad(transform.apply(placed.position), size, frame.uv_min, frame.uv_max, WHITE));
    }
    verts
}

/// A one-tile sprite quad at `pixel` (unscaled map pixels).
///
/// `sprite_uv` is the far corner of the sprite's first frame; `None` draws
/// a square of `fallback` colour over the blank atlas.
pub fn sprite_vertices(
    pixel: Vec2,
    tile_size: u32,
    transform: FitTransform,
    sprite_uv: Option<[f32; 2]>,
    fallback: [f32; 4],
) -> [TileVertex; 6] {
    let size = Vec2::splat(tile_size as f32 * transform.scale);
    match sprite_uv {
        Some(uv_max) => quad(transform.apply(pixel), size, [0.0, 0.0], uv_max, WHITE),
        None => quad(transform.apply(pixel), size, [0.0, 0.0], [1.0, 1.0], fallback),
    }
}

/// The player quad at its interpolated pixel position.
pub fn player_vertices(pixel: Vec2, tile_size: u32, transform: FitTransform, sprite_uv: Option<[f32; 2]>) -> [TileVertex; 6] {
    sprite_vertices(pixel, tile_size, transform, sprite_uv, PLAYER_FALLBACK_TINT)
}

fn catalog_sprite(requested: &str, default: &'static str) -> &'static str {
    assets::sprite(requested).map_or(default, |s| s.id)
}

/// NPCs, enemies and items on the quest's first map.
///
/// Multi-map placements go through [`Quest::placements`], so ids missing
/// from the catalogs are not drawn. Single-map `entities` other than the
/// player are drawn by kind; unrecognised kinds are skipped.
pub fn sprite_placements(quest: &Quest) -> Vec<SpritePlacement> {
    let Some(map) = quest.first_map() else { return Vec::new() };

    let placed = quest.placements(map).into_iter().map(|p| match p {
        Placement::Npc { npc, at } => SpritePlacement { sprite: catalog_sprite(&npc.sprite, NPC_SPRITE), at },
        Placement::Enemy { enemy, at } => SpritePlacement { sprite: catalog_sprite(&enemy.sprite, ENEMY_SPRITE), at },
    });
    let entities = quest.entities.iter().filter_map(|e| {
        let sprite = match e.kind.to_ascii_lowercase().as_str() {
            "npc" => NPC_SPRITE,
            "enemy" | "monster" => ENEMY_SPRITE,
            "chest" | "item" => ITEM_SPRITE,
            _ => return None,
        };
        Some(SpritePlacement { sprite, at: TilePoint { x: e.x, y: e.y } })
    });
    placed.chain(entities).collect()
}

/// Quads for `placements`, grouped per sprite in a stable order.
pub fn placement_batches(
    placements: &[SpritePlacement],
    tile_size: u32,
    transform: FitTransform,
    sprite_uvs: &HashMap<&'static str, [f32; 2]>,
) -> Vec<SpriteBatch> {
    let mut grouped: BTreeMap<&'static str, Vec<TileVertex>> = BTreeMap::new();
    for placement in placements {
        let pixel = Vec2::new(placement.at.x as f32, placement.at.y as f32) * tile_size as f32;
        let quad = sprite_vertices(
            pixel,
            tile_size,
            transform,
            sprite_uvs.get(placement.sprite).copied(),
            fallback_tint(placement.sprite),
        );
        grouped.entry(placement.sprite).or_default().extend_from_slice(&quad);
    }
    grouped
        .into_iter()
        .map(|(sprite, vertices)| SpriteBatch { sprite, vertices })
        .collect()
}

/// UV extent of the first `frame_w × frame_h` frame of a sprite sheet.
pub fn first_frame_uv(image_w: u32, image_h: u32, frame_w: u32, frame_h: u32) -> [f32; 2] {
    if image_w == 0 || image_h == 0 {
        return [1.0, 1.0];
    }
    [
        (frame_w as f32 / image_w as f32).min(1.0),
        (frame_h as f32 / image_h as f32).min(1.0),
    ]
}
