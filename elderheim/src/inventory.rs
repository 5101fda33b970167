//! Inventory browsing and item actions.

use std::io;

use elderheim_core::world::{ItemKind, Player};

use crate::read_choice;

/// Interactive inventory loop: list items, show details, use or drop.
pub fn browse(stdin: &io::Stdin, player: &mut Player) -> io::Result<()> {
    loop {
        println!("\n🎒 Inventory:\n");
        if player.inventory.is_empty() {
            println!("  The inventory is empty.\n");
            return Ok(());
        }

        for (index, item) in player.inventory.iter().enumerate() {
            let emoji = match item.kind {
                ItemKind::Weapon => "⚔️",
                ItemKind::Armor => "🛡️",
                ItemKind::Potion => "🧉",
                ItemKind::Key => "🗝️",
                ItemKind::Misc => "📜",
            };
            let quantity = if item.quantity > 1 {
                format!(" ({})", item.quantity)
            } else {
                String::new()
            };
            println!("  {}. {} {}{}", index + 1, emoji, item.name, quantity);
        }

        println!("\nSelect an item for details and actions, or 0 to go back:");
        let Some(selection) = read_choice(stdin)? else {
            println!("Invalid selection, try again.");
            continue;
        };
        if selection == 0 {
            return Ok(());
        }
        let Some(index) = selection.checked_sub(1).filter(|i| *i < player.inventory.len())
        else {
            println!("Invalid selection, try again.");
            continue;
        };

        inspect_item(stdin, player, index)?;
    }
}

fn inspect_item(stdin: &io::Stdin, player: &mut Player, index: usize) -> io::Result<()> {
    let item = &player.inventory[index];
    println!("\nAbout '{}':\n", item.name);
    println!("Description: {}", item.description);
    if let Some(properties) = &item.properties {
        if let Some(damage) = properties.damage {
            println!("Damage: {damage}");
        }
        if let Some(defense) = properties.defense {
            println!("Defense: {defense}");
        }
        if let Some(healing) = properties.healing {
            println!("Healing: {healing}");
        }
        if let Some(effects) = &properties.effects {
            if !effects.is_empty() {
                println!("Effects: {}", effects.join(", "));
            }
        }
    }

    println!("\nActions:");
    println!("1. Use");
    println!("2. Drop");
    println!("0. Back");

    match read_choice(stdin)? {
        Some(1) => use_item(player, index),
        Some(2) => drop_item(stdin, player, index)?,
        _ => {}
    }
    Ok(())
}

fn use_item(player: &mut Player, index: usize) {
    let item = &player.inventory[index];
    println!("You use the {}.", item.name);

    if item.kind == ItemKind::Potion {
        if let Some(healing) = item.properties.as_ref().and_then(|p| p.healing) {
            player.heal(healing);
            println!("You drink the potion and restore {healing} health!");

            let item = &mut player.inventory[index];
            item.quantity = item.quantity.saturating_sub(1);
            if item.quantity == 0 {
                player.inventory.remove(index);
            }
            return;
        }
    }
    println!("Nothing happens.");
}

fn drop_item(stdin: &io::Stdin, player: &mut Player, index: usize) -> io::Result<()> {
    use std::io::BufRead;

    let name = player.inventory[index].name.clone();
    println!("Are you sure you want to drop the {name}? (yes/no):");
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    if line.trim().eq_ignore_ascii_case("yes") {
        player.inventory.remove(index);
        println!("You drop the {name}.");
    }
    Ok(())
}
