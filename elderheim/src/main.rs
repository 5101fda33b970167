//! Console front end for the Elderheim adventure.

mod inventory;
mod render;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use elderheim_core::{GameSession, SessionConfig};
use openrouter::OpenRouter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("\nFatal error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "{}",
        render::format_in_box(
            "🎲 Welcome to the Elderheim adventure! 🏰",
            None
        )
    );

    let client = OpenRouter::from_env()?;
    let mut session = GameSession::new(Arc::new(client), SessionConfig::default());

    println!("Generating the opening scene...");
    session.begin().await?;
    render::display_state(session.state());

    let stdin = io::stdin();
    while !session.is_game_over() {
        print!("Your choice (enter a number): ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            println!("\nFarewell, traveler.");
            return Ok(());
        }
        let Ok(choice) = line.trim().parse::<usize>() else {
            println!("Invalid input. Please enter a number.");
            continue;
        };

        let option_count = session.state().options.len();
        if choice == option_count + 1 {
            inventory::browse(&stdin, session.player_mut())?;
            continue;
        }
        if choice < 1 || choice > option_count {
            println!("Please choose a number from 1 to {}.", option_count + 1);
            continue;
        }

        let chosen = session.state().options[choice - 1].clone();
        println!("\n{}", "-".repeat(70));
        println!("You chose: {}", chosen.text);
        println!("{}", chosen.consequence);
        println!("{}\n", "-".repeat(70));
        match chosen.gold_change {
            Some(delta) if delta > 0 => println!("You gained {delta} gold."),
            Some(delta) if delta < 0 => println!("You spent {} gold.", -delta),
            _ => {}
        }

        println!("Generating the next scene...");
        match session.choose(choice).await {
            Ok(state) => render::display_state(state),
            Err(err) => {
                eprintln!("\nFailed to generate the next scene: {err}");
                println!("Let's try that again...");
            }
        }
    }

    println!(
        "\n{}",
        render::format_in_box(
            "Your character has died.\nThe adventure is over.",
            Some("The End")
        )
    );
    Ok(())
}

/// Read one numeric menu choice; `None` for non-numeric input.
fn read_choice(stdin: &io::Stdin) -> io::Result<Option<usize>> {
    let mut line = String::new();
    if stdin.lock().read_line(&mut line)? == 0 {
        return Ok(Some(0));
    }
    Ok(line.trim().parse::<usize>().ok())
}
