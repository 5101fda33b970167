//! The JSON Schema the narrator's scene updates must satisfy.
//!
//! One canonical schema serves both the endpoint's structured-output mode
//! and local validation. Only `scene` and `options` are required; the other
//! sections are sent back only when they changed.

use serde_json::{json, Value};

use crate::ai::SchemaSpec;

/// Schema spec for a [`crate::world::SceneUpdate`].
pub fn scene_schema_spec() -> SchemaSpec {
    SchemaSpec {
        name: "SceneUpdate".to_string(),
        description: Some("The game state update for one turn of the adventure".to_string()),
        schema: scene_schema(),
    }
}

fn item_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "id": { "type": "string", "description": "Unique item identifier" },
            "name": { "type": "string" },
            "description": { "type": "string" },
            "type": { "type": "string", "enum": ["weapon", "armor", "potion", "key", "misc"] },
            "properties": {
                "type": "object",
                "properties": {
                    "damage": { "type": "integer" },
                    "defense": { "type": "integer" },
                    "healing": { "type": "integer" },
                    "effects": { "type": "array", "items": { "type": "string" } }
                }
            },
            "quantity": { "type": "integer", "minimum": 0 }
        },
        "required": ["id", "name", "description", "type", "quantity"]
    })
}

pub fn scene_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "scene": {
                "type": "string",
                "description": "Description of the current scene and surroundings"
            },
            "location": {
                "type": "object",
                "properties": {
                    "name": { "type": "string", "description": "Name of the location" },
                    "description": { "type": "string", "description": "Description of the location" },
                    "terrain": { "type": "string", "description": "Kind of terrain" }
                },
                "required": ["name", "description", "terrain"]
            },
            "weather": {
                "type": "object",
                "properties": {
                    "current": { "type": "string", "description": "E.g. sunny, raining, snowing" },
                    "temperature": { "type": "integer", "description": "Degrees Celsius" },
                    "effects": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["current", "temperature", "effects"]
            },
            "time": {
                "type": "object",
                "properties": {
                    "minute": { "type": "integer", "minimum": 0, "maximum": 59 },
                    "hour": { "type": "integer", "minimum": 0, "maximum": 23 },
                    "day": { "type": "integer", "minimum": 1 },
                    "month": { "type": "integer", "minimum": 1 },
                    "year": { "type": "integer" },
                    "dayTime": { "type": "string", "enum": ["morning", "afternoon", "evening", "night"] },
                    "totalMinutes": { "type": "integer", "minimum": 0 }
                },
                "required": ["minute", "hour", "day", "month", "year", "dayTime", "totalMinutes"]
            },
            "player": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "gender": { "type": "string" },
                    "age": { "type": "integer" },
                    "background": { "type": "string" },
                    "health": { "type": "integer" },
                    "maxHealth": { "type": "integer" },
                    "inventory": { "type": "array", "items": item_schema() },
                    "abilities": { "type": "array", "items": { "type": "string" } },
                    "gold": { "type": "integer" }
                },
                "required": [
                    "name", "gender", "age", "background", "health", "maxHealth",
                    "inventory", "abilities", "gold"
                ]
            },
            "world": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string" },
                    "rules": { "type": "string" },
                    "setting": { "type": "string" },
                    "mainStoryline": { "type": "string" }
                },
                "required": ["name", "description", "rules", "setting", "mainStoryline"]
            },
            "npcsPresent": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string" },
                        "name": { "type": "string" },
                        "type": { "type": "string", "enum": ["human", "animal", "monster", "other"] },
                        "age": { "type": "integer" },
                        "gender": { "type": "string", "enum": ["male", "female", "unknown", "other"] },
                        "description": { "type": "string" },
                        "personality": { "type": "string" },
                        "background": { "type": "string" },
                        "intentions": { "type": "string" },
                        "inventory": { "type": "array", "items": item_schema() },
                        "health": { "type": "integer" },
                        "maxHealth": { "type": "integer" },
                        "isHostile": { "type": "boolean" }
                    },
                    "required": [
                        "id", "name", "type", "description", "personality",
                        "background", "intentions", "isHostile"
                    ]
                }
            },
            "options": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "string", "description": "Unique option identifier" },
                        "text": { "type": "string", "description": "Text of the action" },
                        "consequence": { "type": "string", "description": "What the choice leads to" },
                        "timeChange": {
                            "type": "integer",
                            "description": "Minutes the action takes (5 to 100)"
                        },
                        "goldChange": {
                            "type": "integer",
                            "description": "Gold gained (positive) or spent (negative)"
                        }
                    },
                    "required": ["id", "text", "consequence"]
                }
            }
        },
        "required": ["scene", "options"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::SceneUpdate;

    #[test]
    fn test_schema_accepts_minimal_update() {
        let validator = jsonschema::validator_for(&scene_schema()).unwrap();
        let minimal = json!({
            "scene": "You stand at the city gate.",
            "options": [
                { "id": "enter", "text": "Enter the city", "consequence": "You pass the gate." }
            ]
        });
        assert!(validator.validate(&minimal).is_ok());

        // And it deserializes into the typed update.
        let update: SceneUpdate = serde_json::from_value(minimal).unwrap();
        assert!(update.location.is_none());
        assert_eq!(update.options.len(), 1);
    }

    #[test]
    fn test_schema_rejects_missing_options() {
        let validator = jsonschema::validator_for(&scene_schema()).unwrap();
        let missing = json!({ "scene": "An empty plain." });
        assert!(validator.validate(&missing).is_err());
    }

    #[test]
    fn test_schema_accepts_full_seed_state() {
        let validator = jsonschema::validator_for(&scene_schema()).unwrap();
        let mut state = crate::seed::starting_state();
        state.scene = "The market hums around you.".to_string();
        state.options.push(crate::world::ChoiceOption {
            id: "browse".into(),
            text: "Browse the stalls".into(),
            consequence: "A merchant waves you over.".into(),
            time_change: Some(15),
            gold_change: None,
        });
        let value = serde_json::to_value(&state).unwrap();
        assert!(validator.validate(&value).is_ok());
    }
}
