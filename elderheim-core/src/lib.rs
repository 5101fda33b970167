//! Elderheim text-adventure engine with an AI narrator.
//!
//! This crate provides:
//! - A text and structured generation pipeline over a chat-completion
//!   provider, with JSON extraction, schema validation, and error-aware
//!   retries
//! - The game world data model, seed data, and scene schema
//! - A session orchestrator that drives the narrator turn by turn
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use elderheim_core::{GameSession, SessionConfig};
//! use openrouter::OpenRouter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = OpenRouter::from_env()?;
//!     let mut session = GameSession::new(Arc::new(client), SessionConfig::default());
//!
//!     let state = session.begin().await?;
//!     println!("{}", state.scene);
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod dice;
pub mod prompts;
pub mod schema;
pub mod seed;
pub mod session;
pub mod testing;
pub mod world;

// Primary public API
pub use ai::{
    ChatMessage, ChatProvider, ChatRole, GenerateError, Generator, SchemaSpec, StructuredOptions,
    TextOptions, TextReply,
};
pub use session::{GameSession, SessionConfig, SessionError};
pub use world::{GameState, SceneUpdate};
