//! Instruction templates sent to the generation providers.

/// Single-map layout: the user's prompt is embedded in one instruction.
pub fn single_map_instruction(prompt: &str, language: &str) -> String {
    format!(
        r#"Generate RPG quest: "{prompt}"

Return ONLY JSON:
{{
  "title": "Title in {language}",
  "description": "Description in {language} (1 sentence)",
  "objectives": ["obj 1", "obj 2"],
  "map": {{
    "width": 10,
    "height": 7,
    "tiles": [[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0],[0,0,0,0,0,0,0,0,0,0]]
  }},
  "entities": [
    {{"type": "player", "x": 1, "y": 3}},
    {{"type": "enemy", "x": 8, "y": 4, "name": "Name"}}
  ]
}}

Tiles: 0=grass, 1=water, 2=mountain, 3=forest, 4=path
Map: 10 columns x 7 rows EXACT
All text in {language}.
KEEP IT SHORT"#
    )
}

/// Multi-map layout: a system instruction; the user's prompt travels as a
/// separate chat message.
pub fn multi_map_system(language: &str) -> String {
    format!(
        r#"You are an expert RPG game designer.
Turn the user's prompt into an RPG adventure in JSON format.

Rules:
- Maps at most 20x20 tiles
- Tile ids: 1=floor, 14=wall, 25=decoration
- NPCs and enemies with positions
- Engaging dialogs
- 3-5 clear objectives
- All player-facing text in {language}

Return ONLY valid JSON, no extra text.

JSON format:
{{
  "title": "Adventure title",
  "description": "Short description",
  "maps": [{{
    "id": "village",
    "name": "Village",
    "width": 15,
    "height": 15,
    "tiles": [[1,1,14,...], ...],
    "npcs": [{{"npcId": "elder", "x": 7, "y": 7}}],
    "enemies": [],
    "startPosition": {{"x": 5, "y": 5}}
  }}],
  "npcs": [{{
    "id": "elder",
    "name": "Village Elder",
    "sprite": "npc",
    "dialogId": "elder_intro"
  }}],
  "enemies": [{{
    "id": "dragon",
    "name": "Red Dragon",
    "sprite": "monster",
    "hp": 100,
    "atk": 25,
    "def": 10,
    "exp": 500,
    "gold": 1000
  }}],
  "dialogs": [{{
    "id": "elder_intro",
    "text": ["Welcome, hero!", "The kingdom is in danger!"],
    "choices": [
      {{"text": "I will help!", "nextDialogId": "elder_quest"}},
      {{"text": "I cannot help", "action": "end"}}
    ]
  }}],
  "objectives": [
    "Talk to the elder",
    "Defeat the dragon",
    "Save the kingdom"
  ]
}}"#
    )
}
