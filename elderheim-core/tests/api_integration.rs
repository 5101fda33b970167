//! Integration tests that call the real OpenRouter API.
//!
//! These require OPENROUTER_API_KEY to be set (via .env file or environment).
//! Run with: `cargo test -p elderheim-core --test api_integration -- --ignored`
//!
//! They are marked #[ignore] by default to avoid API costs in CI, failures
//! when no key is available, and slow test runs.

use std::sync::Arc;

use elderheim_core::{GameSession, SessionConfig};
use openrouter::OpenRouter;

fn setup() {
    let _ = dotenvy::dotenv();
}

fn has_api_key() -> bool {
    std::env::var("OPENROUTER_API_KEY").is_ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -p elderheim-core --test api_integration -- --ignored
async fn test_opening_scene_against_live_api() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: OPENROUTER_API_KEY not set");
        return;
    }

    let client = OpenRouter::from_env().expect("client from env");
    let mut session = GameSession::new(Arc::new(client), SessionConfig::default());

    let state = session.begin().await.expect("opening scene");
    assert!(!state.scene.is_empty(), "narrator should describe a scene");
    assert!(
        !state.options.is_empty(),
        "narrator should offer at least one option"
    );

    println!("Scene: {}", state.scene);
    for (i, option) in state.options.iter().enumerate() {
        println!("{}. {}", i + 1, option.text);
    }
}

#[tokio::test]
#[ignore]
async fn test_one_full_turn_against_live_api() {
    setup();
    if !has_api_key() {
        eprintln!("Skipping test: OPENROUTER_API_KEY not set");
        return;
    }

    let client = OpenRouter::from_env().expect("client from env");
    let mut session = GameSession::new(Arc::new(client), SessionConfig::default());

    session.begin().await.expect("opening scene");

    let state = session.choose(1).await.expect("next scene");
    assert!(!state.scene.is_empty());
    assert!(
        !state.options.is_empty(),
        "the next scene should offer options too"
    );
}
