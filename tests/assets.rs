use std::io::Cursor;

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use sgravoquest::assets::{
    self, AssetError, AssetSource, CdnSource, ClientSource, MemorySource, MirrorSource, CDN_BASE,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

// ── Catalog ───────────────────────────────────────────────────────────────────

#[test]
fn tilesets_are_catalogued() {
    let tiny = assets::tileset("tiny-dungeon").unwrap();
    assert_eq!(tiny.tile_size, 16);
    assert_eq!(tiny.tile_count(), 132);
    assert_eq!(tiny.url(), format!("{CDN_BASE}/tilesets/tiny-dungeon.png"));

    let sample = assets::tileset("tiny-dungeon-sample").unwrap();
    assert_eq!(sample.tile_count(), 2500);

    assert!(assets::tileset("overworld").is_none());
}

#[test]
fn sprites_are_catalogued() {
    for id in ["hero", "npc", "monster", "chest"] {
        let sprite = assets::sprite(id).unwrap();
        assert!(sprite.url().starts_with(CDN_BASE));
    }
    assert!(assets::sprite("dragon").is_none());
}

#[test]
fn every_asset_has_a_url() {
    let urls = assets::all_asset_urls();
    assert_eq!(urls.len(), assets::TILESETS.len() + assets::SPRITES.len());
    assert!(urls[0].ends_with("tilesets/tiny-dungeon.png"));
}

// ── Sources ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn memory_source_serves_inserted_bytes() {
    let source = MemorySource::new().with("sprites/hero.png", vec![1, 2, 3]);
    assert_eq!(source.fetch("sprites/hero.png").await.unwrap(), vec![1, 2, 3]);
    assert!(matches!(
        source.fetch("sprites/npc.png").await,
        Err(AssetError::UnknownAsset(path)) if path == "sprites/npc.png"
    ));
}

#[tokio::test]
async fn mirror_source_indexes_nested_files() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("tilesets")).unwrap();
    std::fs::write(dir.path().join("tilesets/tiny-dungeon.png"), b"tiles").unwrap();
    std::fs::write(dir.path().join("README"), b"readme").unwrap();

    let mirror = MirrorSource::open(dir.path());
    assert_eq!(mirror.len(), 2);
    assert!(mirror.contains("tilesets/tiny-dungeon.png"));
    assert_eq!(mirror.fetch("tilesets/tiny-dungeon.png").await.unwrap(), b"tiles");
    assert!(matches!(mirror.fetch("sprites/hero.png").await, Err(AssetError::UnknownAsset(_))));
}

#[tokio::test]
async fn mirror_of_a_missing_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let mirror = MirrorSource::open(dir.path().join("nope"));
    assert!(mirror.is_empty());
}

#[tokio::test]
async fn client_source_prefers_the_mirror() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("sprites")).unwrap();
    std::fs::write(dir.path().join("sprites/hero.png"), png(16, 16)).unwrap();

    let source = ClientSource::from_mirror_dir(Some(dir.path()));
    assert!(matches!(source, ClientSource::Mirror(_)));
    let hero = assets::load_sprite(&source, assets::sprite("hero").unwrap()).await.unwrap();
    assert_eq!(hero.dimensions(), (16, 16));

    assert!(matches!(ClientSource::from_mirror_dir(None), ClientSource::Cdn(_)));
}

#[tokio::test]
async fn load_sprite_rejects_non_images() {
    let source = MemorySource::new().with("sprites/chest.png", b"nope".to_vec());
    let err = assets::load_sprite(&source, assets::sprite("chest").unwrap()).await.unwrap_err();
    assert!(matches!(err, AssetError::Decode(_)));
}

async fn serve_cdn() -> String {
    let hero = png(32, 16);
    let app = Router::new()
        .route("/sprites/hero.png", get(move || async move { hero.clone() }))
        .fallback(|| async { StatusCode::NOT_FOUND });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

#[tokio::test]
async fn cdn_source_fetches_over_http() {
    let base = serve_cdn().await;
    let cdn = CdnSource::with_base(&base);
    let hero = assets::load_sprite(&cdn, assets::sprite("hero").unwrap()).await.unwrap();
    assert_eq!(hero.dimensions(), (32, 16));
}

#[tokio::test]
async fn cdn_source_reports_http_status() {
    let base = serve_cdn().await;
    let cdn = CdnSource::with_base(&base);
    let err = cdn.fetch("sprites/npc.png").await.unwrap_err();
    assert!(matches!(err, AssetError::Status { status: 404, .. }));
}
