use std::io::Cursor;

use glam::Vec2;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sgravoquest::assets::{self, AssetError, MemorySource};
use sgravoquest::renderer::batch::{first_frame_uv, map_vertices, player_vertices, PLAYER_FALLBACK_TINT};
use sgravoquest::renderer::pipeline::WHITE;
use sgravoquest::tilemap::{
    fit_to_viewport, FitTransform, GridError, RenderError, TileGrid, TileTextures, TilemapRenderer,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([40, 80, 120, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn loaded_renderer(width: u32, height: u32) -> TilemapRenderer {
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    let mut renderer = TilemapRenderer::new(tileset, width, height);
    renderer.load_from_bytes(&png(192, 176)).unwrap();
    renderer
}

// ── TileGrid ──────────────────────────────────────────────────────────────────

#[test]
fn grid_rejects_ragged_rows() {
    let err = TileGrid::from_rows(vec![vec![1, 1, 1], vec![1, 1]]).unwrap_err();
    assert_eq!(err, GridError::Ragged { row: 1, expected: 3, found: 2 });
}

#[test]
fn grid_rejects_empty_input() {
    assert_eq!(TileGrid::from_rows(vec![]).unwrap_err(), GridError::Empty);
    assert_eq!(TileGrid::from_rows(vec![vec![]]).unwrap_err(), GridError::Empty);
}

#[test]
fn grid_lookup_outside_is_none() {
    let grid = TileGrid::from_rows(vec![vec![1, 2], vec![3, 4]]).unwrap();
    assert_eq!(grid.get(1, 1), Some(4));
    assert_eq!(grid.get(2, 0), None);
    assert_eq!(grid.get(0, -1), None);
}

#[test]
fn test_pattern_layout() {
    let grid = TileGrid::test_pattern(50, 37);
    assert_eq!((grid.width(), grid.height()), (50, 37));
    assert_eq!(grid.get(0, 10), Some(14));
    assert_eq!(grid.get(49, 36), Some(14));
    assert_eq!(grid.get(2, 3), Some(25));
    assert_eq!(grid.get(2, 4), Some(1));
}

#[test]
fn grid_deserializes_from_nested_arrays() {
    let grid: TileGrid = serde_json::from_str("[[1, -1], [14, 25]]").unwrap();
    assert_eq!(grid.get(1, 0), Some(-1));
    assert!(serde_json::from_str::<TileGrid>("[[1, 2], [3]]").is_err());
}

// ── Tileset slicing ───────────────────────────────────────────────────────────

#[test]
fn tiny_dungeon_slices_into_132_tiles() {
    let tileset = assets::tileset("tiny-dungeon").unwrap();
    let textures = TileTextures::from_png(&png(192, 176), tileset).unwrap();
    assert_eq!(textures.len(), 132);

    let frame = textures.get(13).unwrap();
    assert_eq!((frame.x, frame.y), (16, 16));
    assert_eq!(frame.uv_min, [16.0 / 192.0, 16.0 / 176.0]);
    assert_eq!(frame.uv_max, [32.0 / 192.0, 32.0 / 176.0]);

    assert!(textures.get(131).is_some());
    assert!(textures.get(132).is_none());
    assert!(textures.get(-1).is_none());
}

#[test]
fn cell_pixels_copies_one_tile() {
    let tileset = assets::tileset("tiny-dungeon").unwrap();
    let textures = TileTextures::from_png(&png(192, 176), tileset).unwrap();
    let cell = textures.cell_pixels(5).unwrap();
    assert_eq!(cell.dimensions(), (16, 16));
}

#[test]
fn undersized_image_is_a_geometry_error() {
    let tileset = assets::tileset("tiny-dungeon").unwrap();
    let err = TileTextures::from_png(&png(100, 100), tileset).unwrap_err();
    assert!(matches!(err, AssetError::Geometry { actual_w: 100, actual_h: 100, cols: 12, rows: 11, tile_size: 16 }));
}

#[test]
fn garbage_bytes_are_a_decode_error() {
    let tileset = assets::tileset("tiny-dungeon").unwrap();
    let err = TileTextures::from_png(b"not a png", tileset).unwrap_err();
    assert!(matches!(err, AssetError::Decode(_)));
}

// ── Rendering ─────────────────────────────────────────────────────────────────

#[test]
fn render_before_load_fails() {
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    let mut renderer = TilemapRenderer::new(tileset, 800, 600);
    let err = renderer.render(&TileGrid::filled(2, 2, 1)).unwrap_err();
    assert!(matches!(err, RenderError::NotLoaded("tiny-dungeon")));
}

#[test]
fn render_places_one_tile_per_known_cell() {
    let mut renderer = loaded_renderer(800, 600);
    let grid = TileGrid::from_rows(vec![vec![0, 131, 132, -1], vec![-5, 14, 25, 1]]).unwrap();
    let summary = renderer.render(&grid).unwrap();

    assert_eq!(summary.placed, 5);
    assert_eq!(summary.unknown, 1);
    assert_eq!(summary.empty, 2);

    let first = renderer.placed()[0];
    assert_eq!((first.texture, first.col, first.row), (0, 0, 0));
    let second = renderer.placed()[1];
    assert_eq!((second.texture, second.col, second.row), (131, 1, 0));
    assert_eq!(second.position, Vec2::new(16.0, 0.0));
}

#[test]
fn render_replaces_previous_tiles() {
    let mut renderer = loaded_renderer(800, 600);
    renderer.render(&TileGrid::filled(10, 10, 1)).unwrap();
    assert_eq!(renderer.placed().len(), 100);
    renderer.render(&TileGrid::filled(2, 3, 1)).unwrap();
    assert_eq!(renderer.placed().len(), 6);
    assert_eq!(renderer.map_size(), Vec2::new(32.0, 48.0));
}

#[test]
fn default_map_fits_the_default_window() {
    let mut renderer = loaded_renderer(800, 600);
    let summary = renderer.render(&TileGrid::test_pattern(50, 37)).unwrap();
    assert_eq!(summary.placed, 50 * 37);
    assert!((summary.scale - 0.95).abs() < 1e-6);

    let offset = renderer.transform().offset;
    assert!((offset.x - 20.0).abs() < 1e-3);
    assert!((offset.y - 18.8).abs() < 1e-3);
}

#[test]
fn load_is_a_no_op_once_loaded() {
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut renderer = loaded_renderer(800, 600);
    // An empty source would fail if it were consulted.
    rt.block_on(renderer.load(&MemorySource::new())).unwrap();
    assert_eq!(renderer.texture_count(), 132);
}

#[tokio::test]
async fn load_from_a_source() {
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    let source = MemorySource::new().with(tileset.path, png(192, 176));
    let mut renderer = TilemapRenderer::new(tileset, 800, 600);
    renderer.load(&source).await.unwrap();
    assert!(renderer.is_loaded());
    assert_eq!(renderer.texture_count(), 132);
}

#[tokio::test]
async fn load_from_a_source_missing_the_tileset() {
    let tileset = *assets::tileset("tiny-dungeon").unwrap();
    let mut renderer = TilemapRenderer::new(tileset, 800, 600);
    let err = renderer.load(&MemorySource::new()).await.unwrap_err();
    assert!(matches!(err, RenderError::Asset(AssetError::UnknownAsset(_))));
    assert!(!renderer.is_loaded());
}

#[test]
fn destroy_unloads_and_clear_keeps_tileset() {
    let mut renderer = loaded_renderer(800, 600);
    renderer.render(&TileGrid::filled(3, 3, 1)).unwrap();
    renderer.clear();
    assert!(renderer.placed().is_empty());
    assert!(renderer.is_loaded());

    renderer.render(&TileGrid::filled(3, 3, 1)).unwrap();
    renderer.destroy();
    assert!(renderer.placed().is_empty());
    assert!(!renderer.is_loaded());
}

#[test]
fn resizing_refits_the_map() {
    let mut renderer = loaded_renderer(800, 600);
    renderer.render(&TileGrid::filled(100, 100, 1)).unwrap();
    renderer.set_viewport(400, 400);
    assert!((renderer.transform().scale - 0.25 * 0.95).abs() < 1e-6);
}

// ── Fit transform ─────────────────────────────────────────────────────────────

#[test]
fn large_maps_shrink() {
    let fit = fit_to_viewport(Vec2::new(1600.0, 1600.0), Vec2::new(800.0, 600.0));
    assert!((fit.scale - 0.375 * 0.95).abs() < 1e-6);
    let drawn = Vec2::splat(1600.0 * fit.scale);
    assert!((fit.offset.x - (800.0 - drawn.x) / 2.0).abs() < 1e-3);
}

#[test]
fn small_maps_are_not_enlarged() {
    let fit = fit_to_viewport(Vec2::new(160.0, 112.0), Vec2::new(800.0, 600.0));
    assert!((fit.scale - 0.95).abs() < 1e-6);
}

#[test]
fn empty_map_uses_identity() {
    assert_eq!(fit_to_viewport(Vec2::ZERO, Vec2::new(800.0, 600.0)), FitTransform::IDENTITY);
}

// ── Vertex batches ────────────────────────────────────────────────────────────

#[test]
fn six_vertices_per_placed_tile() {
    let mut renderer = loaded_renderer(800, 600);
    renderer.render(&TileGrid::from_rows(vec![vec![1, -1, 2]]).unwrap()).unwrap();
    let verts = map_vertices(&renderer);
    assert_eq!(verts.len(), 12);
    assert!(verts.iter().all(|v| v.tint == WHITE));
}

#[test]
fn player_quad_follows_the_fit_transform() {
    let fit = FitTransform { scale: 0.5, offset: Vec2::new(10.0, 20.0) };
    let verts = player_vertices(Vec2::new(32.0, 16.0), 16, fit, None);
    assert_eq!(verts[0].position, [26.0, 28.0]);
    assert_eq!(verts[5].position, [34.0, 36.0]);
    assert_eq!(verts[0].tint, PLAYER_FALLBACK_TINT);

    let sprite = player_vertices(Vec2::ZERO, 16, FitTransform::IDENTITY, Some([0.25, 1.0]));
    assert_eq!(sprite[5].uv, [0.25, 1.0]);
    assert_eq!(sprite[0].tint, WHITE);
}

#[test]
fn first_frame_of_a_sheet() {
    assert_eq!(first_frame_uv(64, 16, 16, 16), [0.25, 1.0]);
    assert_eq!(first_frame_uv(8, 8, 16, 16), [1.0, 1.0]);
}
