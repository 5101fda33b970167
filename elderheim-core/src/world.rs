//! Elderheim game world types.
//!
//! Contains the data model the narrator fills in: items, NPCs, weather,
//! the in-world clock, the player, and the scene with its options. Wire
//! field names are camelCase to match the schema the model is given.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Items
// ============================================================================

/// Something the player or an NPC can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ItemProperties>,
    pub quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Weapon,
    Armor,
    Potion,
    Key,
    Misc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defense: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healing: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effects: Option<Vec<String>>,
}

// ============================================================================
// NPCs
// ============================================================================

/// A character or creature present in the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Npc {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NpcKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    pub description: String,
    pub personality: String,
    pub background: String,
    pub intentions: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_health: Option<i32>,
    pub is_hostile: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpcKind {
    Human,
    Animal,
    Monster,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
    Other,
}

// ============================================================================
// Weather and time
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    /// E.g. "sunny", "raining", "snowing".
    pub current: String,
    /// Degrees Celsius.
    pub temperature: i32,
    /// Effects the weather has on play.
    pub effects: Vec<String>,
}

/// The in-world clock. Months are 30 days, years are 12 months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTime {
    pub minute: u32,
    pub hour: u32,
    pub day: u32,
    pub month: u32,
    pub year: u32,
    pub day_time: DayTime,
    /// Game minutes elapsed since the adventure began.
    pub total_minutes: u64,
}

impl GameTime {
    /// Advance the clock, rolling over minutes, hours, days, months, and
    /// years, and recomputing the time of day.
    pub fn advance(&mut self, minutes: u32) {
        self.total_minutes += u64::from(minutes);
        self.minute += minutes;
        while self.minute >= 60 {
            self.minute -= 60;
            self.hour += 1;
        }
        while self.hour >= 24 {
            self.hour -= 24;
            self.day += 1;
        }
        while self.day > 30 {
            self.day -= 30;
            self.month += 1;
        }
        while self.month > 12 {
            self.month -= 12;
            self.year += 1;
        }
        self.day_time = DayTime::for_hour(self.hour);
    }

    /// "HH:MM" for display and prompts.
    pub fn clock(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayTime {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DayTime {
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            5..=11 => DayTime::Morning,
            12..=17 => DayTime::Afternoon,
            18..=21 => DayTime::Evening,
            _ => DayTime::Night,
        }
    }
}

impl fmt::Display for DayTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DayTime::Morning => "morning",
            DayTime::Afternoon => "afternoon",
            DayTime::Evening => "evening",
            DayTime::Night => "night",
        };
        write!(f, "{label}")
    }
}

// ============================================================================
// Player and world
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub name: String,
    pub gender: String,
    pub age: u32,
    pub background: String,
    pub health: i32,
    pub max_health: i32,
    pub inventory: Vec<Item>,
    pub abilities: Vec<String>,
    pub gold: i64,
}

impl Player {
    /// Restore health, capped at the maximum.
    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }
}

/// The fixed facts of the game world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldInfo {
    pub name: String,
    pub description: String,
    pub rules: String,
    pub setting: String,
    pub main_storyline: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub name: String,
    pub description: String,
    pub terrain: String,
}

// ============================================================================
// Scene
// ============================================================================

/// One action the player can take from the current scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    pub id: String,
    pub text: String,
    pub consequence: String,
    /// Minutes the action takes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_change: Option<u32>,
    /// Gold gained (positive) or spent (negative).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gold_change: Option<i64>,
}

/// The complete, always-populated game state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub scene: String,
    pub location: Location,
    pub weather: Weather,
    pub time: GameTime,
    pub player: Player,
    pub world: WorldInfo,
    pub npcs_present: Vec<Npc>,
    pub options: Vec<ChoiceOption>,
}

impl GameState {
    /// Merge a scene update: present sections replace their counterparts,
    /// absent sections persist.
    pub fn apply(&mut self, update: SceneUpdate) {
        self.scene = update.scene;
        if let Some(location) = update.location {
            self.location = location;
        }
        if let Some(weather) = update.weather {
            self.weather = weather;
        }
        if let Some(time) = update.time {
            self.time = time;
        }
        if let Some(player) = update.player {
            self.player = player;
        }
        if let Some(world) = update.world {
            self.world = world;
        }
        if let Some(npcs) = update.npcs_present {
            self.npcs_present = npcs;
        }
        self.options = update.options;
    }
}

/// What the narrator returns for a turn: the scene and options are always
/// present, everything else only when it changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneUpdate {
    pub scene: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<GameTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<Player>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world: Option<WorldInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npcs_present: Option<Vec<Npc>>,
    pub options: Vec<ChoiceOption>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn test_time_advance_rolls_minutes_and_hours() {
        let mut time = seed::starting_time();
        time.advance(55);
        assert_eq!((time.hour, time.minute), (9, 55));

        time.advance(10);
        assert_eq!((time.hour, time.minute), (10, 5));
        assert_eq!(time.total_minutes, 65);
    }

    #[test]
    fn test_time_advance_rolls_days_months_years() {
        let mut time = seed::starting_time();
        // 20 months of 30 days each.
        time.advance(20 * 30 * 24 * 60);
        assert_eq!(time.day, 1);
        assert_eq!(time.month, 1);
        assert_eq!(time.year, 1249);
    }

    #[test]
    fn test_day_time_bands() {
        assert_eq!(DayTime::for_hour(5), DayTime::Morning);
        assert_eq!(DayTime::for_hour(11), DayTime::Morning);
        assert_eq!(DayTime::for_hour(12), DayTime::Afternoon);
        assert_eq!(DayTime::for_hour(18), DayTime::Evening);
        assert_eq!(DayTime::for_hour(22), DayTime::Night);
        assert_eq!(DayTime::for_hour(3), DayTime::Night);
    }

    #[test]
    fn test_apply_update_keeps_absent_sections() {
        let mut state = seed::starting_state();
        let old_weather = state.weather.clone();
        let old_gold = state.player.gold;

        let update = SceneUpdate {
            scene: "A cart rattles past.".into(),
            location: Some(Location {
                name: "Market Square".into(),
                description: "Stalls and shouting merchants.".into(),
                terrain: "urban".into(),
            }),
            weather: None,
            time: None,
            player: None,
            world: None,
            npcs_present: None,
            options: vec![ChoiceOption {
                id: "look".into(),
                text: "Look around".into(),
                consequence: "You take in the square.".into(),
                time_change: Some(5),
                gold_change: None,
            }],
        };
        state.apply(update);

        assert_eq!(state.scene, "A cart rattles past.");
        assert_eq!(state.location.name, "Market Square");
        assert_eq!(state.weather, old_weather);
        assert_eq!(state.player.gold, old_gold);
        assert_eq!(state.options.len(), 1);
    }

    #[test]
    fn test_player_heal_caps_at_max() {
        let mut player = seed::starting_player();
        player.health = 90;
        player.heal(25);
        assert_eq!(player.health, player.max_health);
        assert!(!player.is_dead());

        player.health = 0;
        assert!(player.is_dead());
    }

    #[test]
    fn test_wire_field_names_are_camel_case() {
        let player = seed::starting_player();
        let json = serde_json::to_value(&player).unwrap();
        assert!(json.get("maxHealth").is_some());
        assert_eq!(json["inventory"][0]["type"], "weapon");

        let npc_json = serde_json::json!({
            "id": "guard1",
            "name": "Gate Guard",
            "type": "human",
            "description": "A bored guard.",
            "personality": "gruff",
            "background": "city watch",
            "intentions": "keep the peace",
            "isHostile": false
        });
        let npc: Npc = serde_json::from_value(npc_json).unwrap();
        assert_eq!(npc.kind, NpcKind::Human);
        assert!(!npc.is_hostile);
    }
}
