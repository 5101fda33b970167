//! Starting data for a new adventure.

use crate::world::{
    GameState, GameTime, DayTime, Item, ItemKind, ItemProperties, Location, Player, Weather,
    WorldInfo,
};

pub fn world_info() -> WorldInfo {
    WorldInfo {
        name: "Elderheim".to_string(),
        description: "A world of sword and sorcery, full of ancient ruins, mysterious forests, \
                      and dangerous dungeons."
            .to_string(),
        rules: "Low fantasy. Magic exists but is rare. Humans, elves, dwarves, and orcs walk the \
                land. Death is final. Choices change the world."
            .to_string(),
        setting: "Medieval fantasy, with steampunk touches in some regions. The realm stands on \
                  the edge of war."
            .to_string(),
        main_storyline: "Find the ancient artifact that can stop the coming catastrophe and the \
                         war brewing between the races."
            .to_string(),
    }
}

/// The adventure opens at nine in the morning, day 1 of month 5, year 1247
/// of the Imperial calendar.
pub fn starting_time() -> GameTime {
    GameTime {
        minute: 0,
        hour: 9,
        day: 1,
        month: 5,
        year: 1247,
        day_time: DayTime::Morning,
        total_minutes: 0,
    }
}

pub fn starting_weather() -> Weather {
    Weather {
        current: "sunny".to_string(),
        temperature: 18,
        effects: vec![
            "good visibility".to_string(),
            "dry ground".to_string(),
            "light breeze".to_string(),
        ],
    }
}

pub fn starting_location() -> Location {
    Location {
        name: "Newhaven".to_string(),
        description: "A large trading city at the crossroads of ancient trade routes".to_string(),
        terrain: "urban".to_string(),
    }
}

pub fn starting_player() -> Player {
    Player {
        name: "Altair".to_string(),
        gender: "male".to_string(),
        age: 27,
        background: "A former guardsman seeking adventure after an unjust dismissal.".to_string(),
        health: 100,
        max_health: 100,
        inventory: vec![
            Item {
                id: "sword1".to_string(),
                name: "Plain Sword".to_string(),
                description: "A dependable steel sword.".to_string(),
                kind: ItemKind::Weapon,
                properties: Some(ItemProperties {
                    damage: Some(10),
                    ..ItemProperties::default()
                }),
                quantity: 1,
            },
            Item {
                id: "armor1".to_string(),
                name: "Leather Armor".to_string(),
                description: "Light protection.".to_string(),
                kind: ItemKind::Armor,
                properties: Some(ItemProperties {
                    defense: Some(5),
                    ..ItemProperties::default()
                }),
                quantity: 1,
            },
            Item {
                id: "potion_heal1".to_string(),
                name: "Minor Healing Potion".to_string(),
                description: "Restores a little health.".to_string(),
                kind: ItemKind::Potion,
                properties: Some(ItemProperties {
                    healing: Some(25),
                    ..ItemProperties::default()
                }),
                quantity: 2,
            },
        ],
        abilities: vec![
            "swordsmanship".to_string(),
            "endurance".to_string(),
            "survival".to_string(),
        ],
        gold: 15,
    }
}

/// A fresh game state before the opening scene is generated.
pub fn starting_state() -> GameState {
    GameState {
        scene: String::new(),
        location: starting_location(),
        weather: starting_weather(),
        time: starting_time(),
        player: starting_player(),
        world: world_info(),
        npcs_present: Vec::new(),
        options: Vec::new(),
    }
}
