//! Console rendering for the adventure.

use elderheim_core::world::{GameState, Npc, NpcKind};

/// Print the scene header, description, nearby characters, and options.
pub fn display_state(state: &GameState) {
    println!("\n{}", "=".repeat(70));

    println!(
        "📍 {} | 🕒 {} ({}) | 📅 Day {}, Month {}, Year {}",
        state.location.name,
        state.time.clock(),
        state.time.day_time,
        state.time.day,
        state.time.month,
        state.time.year
    );
    println!(
        "🌤️ Weather: {}, {}°C",
        state.weather.current, state.weather.temperature
    );

    let health_percent = if state.player.max_health > 0 {
        state.player.health * 100 / state.player.max_health
    } else {
        0
    };
    let health_emoji = if health_percent <= 25 {
        "💔"
    } else if health_percent <= 50 {
        "🖤"
    } else {
        "❤️"
    };
    println!(
        "{} Health: {}/{} | 💰 Gold: {}",
        health_emoji, state.player.health, state.player.max_health, state.player.gold
    );
    println!("{}", "=".repeat(70));

    println!("\n{}\n", state.scene);

    if !state.npcs_present.is_empty() {
        println!("🧑 Characters nearby:");
        for npc in &state.npcs_present {
            print_npc(npc);
        }
        println!();
    }

    println!("Options:");
    for (index, option) in state.options.iter().enumerate() {
        let mut notes = Vec::new();
        if let Some(minutes) = option.time_change {
            notes.push(format!("⏱️ {minutes} min"));
        }
        match option.gold_change {
            Some(delta) if delta > 0 => notes.push(format!("💰 +{delta} gold")),
            Some(delta) if delta < 0 => notes.push(format!("💰 {delta} gold")),
            _ => {
                let text = option.text.to_lowercase();
                if text.contains("buy") || text.contains("purchase") || text.contains("pay") {
                    notes.push("💰 Costs gold".to_string());
                } else if text.contains("sell") || text.contains("reward") || text.contains("payment")
                {
                    notes.push("💰 Can earn gold".to_string());
                }
            }
        }
        let note_string = if notes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", notes.join(", "))
        };
        println!("{}. {}{}", index + 1, option.text, note_string);
    }
    println!("{}. 🎒 Open inventory", state.options.len() + 1);
}

fn print_npc(npc: &Npc) {
    let emoji = match npc.kind {
        NpcKind::Human => "🚹",
        NpcKind::Animal => "🐾",
        NpcKind::Monster => "👾",
        NpcKind::Other => "👻",
    };
    let hostility = if npc.is_hostile { " 🔥 (Hostile)" } else { "" };
    println!("  {} {}: {}{}", emoji, npc.name, npc.description, hostility);
}

/// Format text inside a box of double-line borders, with an optional title
/// on the top edge.
pub fn format_in_box(text: &str, title: Option<&str>) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut width = lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
    if let Some(title) = title {
        // Room for "═[ title ]" on the top border.
        width = width.max(title.chars().count() + 4);
    }

    let top = match title {
        Some(title) => {
            // "═[ title ]" occupies title length + 5 of the interior.
            let used = title.chars().count() + 5;
            format!("╔═[ {} ]{}╗", title, "═".repeat(width + 2 - used))
        }
        None => format!("╔{}╗", "═".repeat(width + 2)),
    };
    let bottom = format!("╚{}╝", "═".repeat(width + 2));

    let mut out = String::new();
    out.push_str(&top);
    for line in &lines {
        out.push('\n');
        let padding = " ".repeat(width - line.chars().count());
        out.push_str(&format!("║ {line}{padding} ║"));
    }
    out.push('\n');
    out.push_str(&bottom);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_lines_share_a_width() {
        let boxed = format_in_box("short\na longer line here", None);
        let widths: Vec<usize> = boxed.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert!(boxed.starts_with('╔'));
        assert!(boxed.ends_with('╝'));
    }

    #[test]
    fn test_box_title_fits_the_border() {
        let boxed = format_in_box("line", Some("The End"));
        let first = boxed.lines().next().unwrap();
        assert!(first.contains("[ The End ]"));
        let widths: Vec<usize> = boxed.lines().map(|l| l.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
