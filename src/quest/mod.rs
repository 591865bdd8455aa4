//! Quests: the structured adventure produced by a generation provider.
//!
//! - [`extract`] digs a JSON object out of model output.
//! - [`validate`] checks its shape and normalises `map` into `maps`.
//! - [`provider`] and [`prompt`] describe the outbound request.
//! - [`generator`] performs the round trip (server side).
//! - [`client`] asks the proxy for a quest (game side).
//!
//! The typed [`Quest`] below is what the game consumes. It accepts both
//! wire layouts; fields a layout does not have are simply empty.

pub mod client;
pub mod extract;
pub mod generator;
pub mod prompt;
pub mod provider;
pub mod validate;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tilemap::TileGrid;

pub use client::QuestClient;
pub use extract::{recover_json, ExtractError, Strategy};
pub use generator::QuestGenerator;
pub use provider::{ProviderKind, ProviderSettings};
pub use validate::{Schema, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum QuestError {
    #[error("Prompt is required")]
    EmptyPrompt,
    #[error("{0} not configured")]
    MissingCredential(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{provider} API error: {status}")]
    Upstream { provider: &'static str, status: u16 },
    #[error("{0} response did not contain generated text")]
    MalformedResponse(&'static str),
    #[error(transparent)]
    Payload(#[from] ExtractError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("quest server returned {status}: {message}")]
    Proxy { status: u16, message: String },
    #[error("quest does not match the expected layout: {0}")]
    Decode(#[from] serde_json::Error),
}

// ── Model ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub objectives: Vec<String>,
    #[serde(default)]
    pub maps: Vec<QuestMap>,
    /// Single-map layout only.
    #[serde(default)]
    pub entities: Vec<QuestEntity>,
    #[serde(default)]
    pub npcs: Vec<QuestNpc>,
    #[serde(default)]
    pub enemies: Vec<QuestEnemy>,
    #[serde(default)]
    pub dialogs: Vec<Dialog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestMap {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    pub tiles: TileGrid,
    #[serde(default)]
    pub npcs: Vec<NpcPlacement>,
    #[serde(default)]
    pub enemies: Vec<EnemyPlacement>,
    #[serde(default)]
    pub start_position: Option<TilePoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEntity {
    #[serde(rename = "type")]
    pub kind: String,
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcPlacement {
    pub npc_id: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnemyPlacement {
    pub enemy_id: String,
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestNpc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
    #[serde(default)]
    pub dialog_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestEnemy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sprite: String,
    #[serde(default)]
    pub hp: u32,
    #[serde(default)]
    pub atk: u32,
    #[serde(default)]
    pub def: u32,
    #[serde(default)]
    pub exp: u32,
    #[serde(default)]
    pub gold: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub id: String,
    #[serde(default)]
    pub text: Vec<String>,
    #[serde(default)]
    pub choices: Vec<DialogChoice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogChoice {
    pub text: String,
    #[serde(default)]
    pub next_dialog_id: Option<String>,
    #[serde(default)]
    pub action: Option<DialogAction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogAction {
    Battle,
    GiveItem,
    End,
    #[serde(other)]
    Unknown,
}

/// A placement resolved against the quest catalogs.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement<'a> {
    Npc { npc: &'a QuestNpc, at: TilePoint },
    Enemy { enemy: &'a QuestEnemy, at: TilePoint },
}

impl Quest {
    /// Parse a proxy response. A bare `map` is accepted in place of `maps`.
    pub fn from_value(mut value: Value) -> Result<Self, serde_json::Error> {
        value = validate::normalize(value);
        serde_json::from_value(value)
    }

    pub fn first_map(&self) -> Option<&QuestMap> {
        self.maps.first()
    }

    pub fn npc(&self, id: &str) -> Option<&QuestNpc> {
        self.npcs.iter().find(|n| n.id == id)
    }

    pub fn enemy(&self, id: &str) -> Option<&QuestEnemy> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn dialog(&self, id: &str) -> Option<&Dialog> {
        self.dialogs.iter().find(|d| d.id == id)
    }

    /// NPC and enemy placements on `map` whose ids exist in the catalogs.
    /// Placements pointing at unknown ids are left out.
    pub fn placements<'a>(&'a self, map: &QuestMap) -> Vec<Placement<'a>> {
        let npcs = map.npcs.iter().filter_map(|p| {
            self.npc(&p.npc_id).map(|npc| Placement::Npc { npc, at: TilePoint { x: p.x, y: p.y } })
        });
        let enemies = map.enemies.iter().filter_map(|p| {
            self.enemy(&p.enemy_id).map(|enemy| Placement::Enemy { enemy, at: TilePoint { x: p.x, y: p.y } })
        });
        npcs.chain(enemies).collect()
    }

    /// Where the player should appear on the first map, if the quest says.
    ///
    /// `startPosition` wins; otherwise a single-map `player` entity.
    pub fn spawn_point(&self) -> Option<TilePoint> {
        self.first_map()
            .and_then(|m| m.start_position)
            .or_else(|| {
                self.entities
                    .iter()
                    .find(|e| e.kind.eq_ignore_ascii_case("player"))
                    .map(|e| TilePoint { x: e.x, y: e.y })
            })
    }
}
