//! Structural checks on a recovered quest object.
//!
//! Validation works on the raw JSON so that whatever the model produced is
//! passed on unchanged once it has the required shape.

use serde_json::{Map, Value};

/// Which of the two quest layouts a provider is asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// One `map` plus a flat `entities` list.
    SingleMap,
    /// Several `maps` plus `npcs`/`enemies`/`dialogs` catalogs.
    MultiMap,
}

impl Schema {
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Schema::SingleMap => &["title", "description", "objectives", "map", "entities"],
            Schema::MultiMap => &["title", "description", "objectives", "maps", "npcs", "enemies"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid quest structure - expected a JSON object")]
    NotAnObject,
    #[error("Invalid quest structure - missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
    #[error("Invalid quest structure - no maps")]
    NoMaps,
    #[error("Invalid map tiles in {0}")]
    InvalidTiles(String),
}

/// Absent, `null`, `false` and `""` all count as missing.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn has_tiles(map: &Value) -> bool {
    map.get("tiles")
        .and_then(Value::as_array)
        .is_some_and(|rows| !rows.is_empty())
}

pub fn validate(quest: &Value, schema: Schema) -> Result<(), ValidationError> {
    let Some(fields) = quest.as_object() else {
        return Err(ValidationError::NotAnObject);
    };

    let missing: Vec<String> = schema
        .required_fields()
        .iter()
        .filter(|name| is_missing(fields.get(**name)))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    match schema {
        Schema::SingleMap => {
            if !has_tiles(&fields["map"]) {
                return Err(ValidationError::InvalidTiles("map".to_string()));
            }
        }
        Schema::MultiMap => {
            let maps = fields["maps"].as_array().ok_or(ValidationError::NoMaps)?;
            if maps.is_empty() {
                return Err(ValidationError::NoMaps);
            }
            if let Some(i) = maps.iter().position(|m| !has_tiles(m)) {
                return Err(ValidationError::InvalidTiles(format!("maps[{i}]")));
            }
        }
    }
    Ok(())
}

/// Add a `maps` list holding the singular `map`, if there is one and no
/// `maps` list yet. Every other field is left as it was.
pub fn normalize(mut quest: Value) -> Value {
    if let Some(fields) = quest.as_object_mut() {
        if !fields.contains_key("maps") {
            if let Some(map) = fields.get("map").cloned() {
                fields.insert("maps".to_string(), Value::Array(vec![map]));
            }
        }
    }
    quest
}

fn catalog_ids<'a>(fields: &'a Map<String, Value>, catalog: &str) -> Vec<&'a str> {
    fields
        .get(catalog)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|e| e.get("id")?.as_str()).collect())
        .unwrap_or_default()
}

/// Placements whose `npcId`/`enemyId` has no entry in the top-level
/// `npcs`/`enemies` catalog, as human-readable descriptions.
pub fn dangling_references(quest: &Value) -> Vec<String> {
    let Some(fields) = quest.as_object() else { return Vec::new() };
    let Some(maps) = fields.get("maps").and_then(Value::as_array) else { return Vec::new() };

    let npc_ids = catalog_ids(fields, "npcs");
    let enemy_ids = catalog_ids(fields, "enemies");
    let mut dangling = Vec::new();

    for (i, map) in maps.iter().enumerate() {
        let map_name = map.get("id").and_then(Value::as_str).map_or_else(|| format!("maps[{i}]"), str::to_string);
        for (list, key, known) in [("npcs", "npcId", &npc_ids), ("enemies", "enemyId", &enemy_ids)] {
            let Some(placements) = map.get(list).and_then(Value::as_array) else { continue };
            for id in placements.iter().filter_map(|p| p.get(key)?.as_str()) {
                if !known.contains(&id) {
                    dangling.push(format!("{map_name}: {key} '{id}' is not in the {list} catalog"));
                }
            }
        }
    }
    dangling
}
