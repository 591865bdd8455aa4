//! Catalog of the CDN-hosted tilesets and sprites, and the sources that
//! fetch their bytes.
//!
//! Every asset is addressed by a path relative to [`CDN_BASE`], so a local
//! mirror of the CDN tree can stand in for the network (see [`MirrorSource`]).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

pub const CDN_BASE: &str = "https://cdn.jsdelivr.net/gh/giobi/sgravoquest-assets@main";

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("unknown asset '{0}'")]
    UnknownAsset(String),
    #[error("failed to fetch {path}: {source}")]
    Fetch { path: String, source: reqwest::Error },
    #[error("fetching {path} returned HTTP {status}")]
    Status { path: String, status: u16 },
    #[error("failed to read {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("image is {actual_w}x{actual_h}px, too small for {cols}x{rows} cells of {tile_size}px")]
    Geometry { actual_w: u32, actual_h: u32, cols: u32, rows: u32, tile_size: u32 },
}

// ── Catalog ──────────────────────────────────────────────────────────────────

/// A single image subdivided into a grid of equally sized square cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilesetAsset {
    pub id: &'static str,
    pub name: &'static str,
    /// Path relative to [`CDN_BASE`].
    pub path: &'static str,
    pub tile_size: u32,
    /// Number of cell columns.
    pub grid_width: u32,
    /// Number of cell rows.
    pub grid_height: u32,
    pub license: &'static str,
}

impl TilesetAsset {
    pub fn url(&self) -> String { format!("{CDN_BASE}/{}", self.path) }
    pub fn tile_count(&self) -> u32 { self.grid_width * self.grid_height }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpriteAsset {
    pub id: &'static str,
    pub name: &'static str,
    pub path: &'static str,
    pub frame_width: u32,
    pub frame_height: u32,
    pub license: &'static str,
}

impl SpriteAsset {
    pub fn url(&self) -> String { format!("{CDN_BASE}/{}", self.path) }
}

pub const TILESETS: &[TilesetAsset] = &[
    TilesetAsset {
        id: "tiny-dungeon",
        name: "Tiny Dungeon",
        path: "tilesets/tiny-dungeon.png",
        tile_size: 16,
        grid_width: 12,
        grid_height: 11,
        license: "CC0",
    },
    TilesetAsset {
        id: "tiny-dungeon-sample",
        name: "Tiny Dungeon Sample Map",
        path: "tilesets/tiny-dungeon-sample.png",
        tile_size: 16,
        grid_width: 50,
        grid_height: 50,
        license: "CC0",
    },
];

pub const SPRITES: &[SpriteAsset] = &[
    SpriteAsset { id: "hero", name: "Hero Character", path: "sprites/hero.png", frame_width: 16, frame_height: 16, license: "CC0" },
    SpriteAsset { id: "npc", name: "NPC Character", path: "sprites/npc.png", frame_width: 16, frame_height: 16, license: "CC0" },
    SpriteAsset { id: "monster", name: "Monster Enemy", path: "sprites/monster.png", frame_width: 16, frame_height: 16, license: "CC0" },
    SpriteAsset { id: "chest", name: "Treasure Chest", path: "sprites/chest.png", frame_width: 16, frame_height: 16, license: "CC0" },
];

pub fn tileset(id: &str) -> Option<&'static TilesetAsset> {
    TILESETS.iter().find(|t| t.id == id)
}

pub fn sprite(id: &str) -> Option<&'static SpriteAsset> {
    SPRITES.iter().find(|s| s.id == id)
}

/// Full CDN URL of every catalogued asset, tilesets first.
pub fn all_asset_urls() -> Vec<String> {
    TILESETS
        .iter()
        .map(TilesetAsset::url)
        .chain(SPRITES.iter().map(SpriteAsset::url))
        .collect()
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Somewhere asset bytes can be fetched from, keyed by catalog path.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError>;
}

/// Fetches assets over HTTP from the CDN (or any server with the same layout).
#[derive(Debug, Clone)]
pub struct CdnSource {
    client: reqwest::Client,
    base: String,
}

impl CdnSource {
    pub fn new() -> Self {
        Self::with_base(CDN_BASE)
    }

    pub fn with_base(base: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for CdnSource {
    fn default() -> Self { Self::new() }
}

impl AssetSource for CdnSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let url = format!("{}/{}", self.base, path);
        debug!("Fetching asset {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| AssetError::Fetch { path: path.to_string(), source })?;
        if !response.status().is_success() {
            return Err(AssetError::Status {
                path: path.to_string(),
                status: response.status().as_u16(),
            });
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| AssetError::Fetch { path: path.to_string(), source })?;
        Ok(bytes.to_vec())
    }
}

/// A local directory laid out like the CDN tree.
///
/// The directory is indexed once when opened; files added afterwards are not
/// seen.
#[derive(Debug, Clone)]
pub struct MirrorSource {
    root: PathBuf,
    files: HashMap<String, PathBuf>,
}

impl MirrorSource {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let mut files = HashMap::new();
        for entry in walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(relative) = entry.path().strip_prefix(&root) else { continue };
            // Catalog paths always use forward slashes.
            let key = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(key, entry.path().to_path_buf());
        }
        debug!("Asset mirror {:?}: {} files indexed", root, files.len());
        Self { root, files }
    }

    pub fn root(&self) -> &Path { &self.root }
    pub fn len(&self) -> usize { self.files.len() }
    pub fn is_empty(&self) -> bool { self.files.is_empty() }
    pub fn contains(&self, path: &str) -> bool { self.files.contains_key(path) }
}

impl AssetSource for MirrorSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        let Some(file) = self.files.get(path) else {
            warn!("Asset {path} is not present in mirror {:?}", self.root);
            return Err(AssetError::UnknownAsset(path.to_string()));
        };
        tokio::fs::read(file)
            .await
            .map_err(|source| AssetError::Io { path: path.to_string(), source })
    }
}

/// Assets already held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, path: &str, bytes: Vec<u8>) {
        self.files.insert(path.to_string(), bytes);
    }

    pub fn with(mut self, path: &str, bytes: Vec<u8>) -> Self {
        self.insert(path, bytes);
        self
    }
}

impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| AssetError::UnknownAsset(path.to_string()))
    }
}

/// Fetch and decode a sprite image.
pub async fn load_sprite(
    source: &impl AssetSource,
    sprite: &SpriteAsset,
) -> Result<image::RgbaImage, AssetError> {
    let bytes = source.fetch(sprite.path).await?;
    let img = image::load_from_memory(&bytes)?.to_rgba8();
    debug!("Sprite '{}' loaded: {}x{}", sprite.id, img.width(), img.height());
    Ok(img)
}

/// The source the game client should use: the local mirror when one is
/// configured, otherwise the CDN.
pub enum ClientSource {
    Cdn(CdnSource),
    Mirror(MirrorSource),
}

impl ClientSource {
    pub fn from_mirror_dir(dir: Option<&Path>) -> Self {
        match dir {
            Some(dir) => ClientSource::Mirror(MirrorSource::open(dir)),
            None => ClientSource::Cdn(CdnSource::new()),
        }
    }
}

impl AssetSource for ClientSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, AssetError> {
        match self {
            ClientSource::Cdn(cdn) => cdn.fetch(path).await,
            ClientSource::Mirror(mirror) => mirror.fetch(path).await,
        }
    }
}
