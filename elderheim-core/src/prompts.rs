//! Prompt construction for the narrator.

use crate::world::{ChoiceOption, GameState};

/// The narrator's base system prompt.
pub const NARRATOR_SYSTEM: &str = include_str!("prompts/narrator.txt");

/// Prompt for the opening scene of a new adventure.
pub fn opening_prompt(state: &GameState) -> String {
    let world = &state.world;
    let player = &state.player;
    let location = &state.location;
    let weather = &state.weather;
    let time = &state.time;
    format!(
        "Create the opening scene for a fantasy adventure in the world of {world_name}.\n\
         \n\
         World description: {world_description}\n\
         Rules: {rules}\n\
         Setting: {setting}\n\
         Main storyline: {storyline}\n\
         \n\
         The protagonist: {name}, {gender}, {age} years old. {background}\n\
         \n\
         Current location: {location_name}, {location_description}\n\
         Weather: {weather_current}, {temperature}°C\n\
         Time: {clock}, {day_time}, Day {day}, Month {month}, Year {year}\n\
         \n\
         Describe the scene in detail and offer 3-4 options for action. For each option, state \
         how much time it takes in minutes (from 5 to 100).\n\
         Could new characters appear? If so, describe them in detail (personality, intentions, \
         backstory).",
        world_name = world.name,
        world_description = world.description,
        rules = world.rules,
        setting = world.setting,
        storyline = world.main_storyline,
        name = player.name,
        gender = player.gender,
        age = player.age,
        background = player.background,
        location_name = location.name,
        location_description = location.description,
        weather_current = weather.current,
        temperature = weather.temperature,
        clock = time.clock(),
        day_time = time.day_time,
        day = time.day,
        month = time.month,
        year = time.year,
    )
}

/// Prompt for the scene that follows a player's choice.
pub fn next_scene_prompt(state: &GameState, choice: &ChoiceOption) -> String {
    let player = &state.player;
    let inventory = if player.inventory.is_empty() {
        "empty".to_string()
    } else {
        player
            .inventory
            .iter()
            .map(|item| item.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "The player chose: {choice_text}\n\
         Consequence: {consequence}\n\
         \n\
         Current location: {location_name}, {location_description}\n\
         Current time: {clock}, {day_time}, Day {day}, Month {month}, Year {year}\n\
         Weather: {weather_current}, {temperature}°C\n\
         Player gold: {gold} coins\n\
         Player health: {health}/{max_health}\n\
         Inventory: {inventory}\n\
         \n\
         Create a new scene describing what happened after the player's choice. Offer 3-4 new \
         options for action with the time they take (in minutes), and state any change in gold.\n\
         \n\
         Requirements:\n\
         1. Use the time {clock} in the scene text, not any other time.\n\
         2. If an action involves spending or receiving gold, state it in the goldChange \
         parameter.\n\
         3. Update the location, add or remove NPCs, and adjust inventory or health as needed.",
        choice_text = choice.text,
        consequence = choice.consequence,
        location_name = state.location.name,
        location_description = state.location.description,
        clock = state.time.clock(),
        day_time = state.time.day_time,
        day = state.time.day,
        month = state.time.month,
        year = state.time.year,
        weather_current = state.weather.current,
        temperature = state.weather.temperature,
        gold = player.gold,
        health = player.health,
        max_health = player.max_health,
        inventory = inventory,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    #[test]
    fn test_opening_prompt_names_world_and_player() {
        let state = seed::starting_state();
        let prompt = opening_prompt(&state);
        assert!(prompt.contains("Elderheim"));
        assert!(prompt.contains("Altair"));
        assert!(prompt.contains("09:00"));
    }

    #[test]
    fn test_next_scene_prompt_carries_situation() {
        let mut state = seed::starting_state();
        state.player.gold = 42;
        let choice = ChoiceOption {
            id: "haggle".into(),
            text: "Haggle with the merchant".into(),
            consequence: "The merchant frowns.".into(),
            time_change: Some(10),
            gold_change: Some(-5),
        };
        let prompt = next_scene_prompt(&state, &choice);
        assert!(prompt.contains("Haggle with the merchant"));
        assert!(prompt.contains("42 coins"));
        assert!(prompt.contains("Plain Sword"));
    }
}
