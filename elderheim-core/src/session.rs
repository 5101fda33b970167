//! GameSession - the primary public API for playing an adventure.
//!
//! Wraps the generation pipeline and the mutable game state into a single
//! turn-by-turn interface: generate the opening scene, apply a chosen
//! option, generate the next scene, merge it back into state.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::ai::{ChatMessage, ChatProvider, GenerateError, Generator, StructuredOptions};
use crate::prompts;
use crate::schema;
use crate::seed;
use crate::world::{GameState, Player, SceneUpdate};

/// Minutes an action takes when the narrator did not say.
const DEFAULT_ACTION_MINUTES: u32 = 5;

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("generation failed: {0}")]
    Generation(#[from] GenerateError),

    #[error("invalid choice {index}; expected 1..={max}")]
    InvalidChoice { index: usize, max: usize },

    #[error("the adventure is over")]
    GameOver,
}

/// Configuration for a new game session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Reply-language code for the narrator.
    pub language: String,

    /// Sampling temperature override for scene generation.
    pub temperature: Option<f32>,

    /// Output-size bound override for scene generation.
    pub max_tokens: Option<u32>,

    /// Structured-generation attempts per scene.
    pub max_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            temperature: None,
            max_tokens: None,
            max_attempts: 3,
        }
    }
}

impl SessionConfig {
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A running adventure.
pub struct GameSession {
    generator: Generator,
    config: SessionConfig,
    state: GameState,
    history: Vec<ChatMessage>,
    game_over: bool,
}

impl GameSession {
    /// Create a session over the given provider, starting from the seed
    /// world.
    pub fn new(provider: Arc<dyn ChatProvider>, config: SessionConfig) -> Self {
        Self {
            generator: Generator::new(provider),
            config,
            state: seed::starting_state(),
            history: Vec::new(),
            game_over: false,
        }
    }

    /// Generate the opening scene.
    pub async fn begin(&mut self) -> Result<&GameState, SessionError> {
        let prompt = prompts::opening_prompt(&self.state);
        let update = self.request_scene(&prompt).await?;
        self.state.apply(update);
        self.check_player();
        info!(options = self.state.options.len(), "opening scene ready");
        Ok(&self.state)
    }

    /// Apply the player's choice (1-based, as displayed) and generate the
    /// next scene.
    pub async fn choose(&mut self, choice_number: usize) -> Result<&GameState, SessionError> {
        if self.game_over {
            return Err(SessionError::GameOver);
        }
        let max = self.state.options.len();
        if choice_number == 0 || choice_number > max {
            return Err(SessionError::InvalidChoice {
                index: choice_number,
                max,
            });
        }
        let choice = self.state.options[choice_number - 1].clone();

        self.history.push(ChatMessage::user(&choice.text));
        self.state
            .time
            .advance(choice.time_change.unwrap_or(DEFAULT_ACTION_MINUTES));
        if let Some(delta) = choice.gold_change {
            self.state.player.gold += delta;
        }
        self.history.push(ChatMessage::assistant(&choice.consequence));

        let prompt = prompts::next_scene_prompt(&self.state, &choice);
        let update = self.request_scene(&prompt).await?;
        self.state.apply(update);
        self.check_player();
        Ok(&self.state)
    }

    async fn request_scene(&self, prompt: &str) -> Result<SceneUpdate, SessionError> {
        let mut options = StructuredOptions::new(schema::scene_schema_spec());
        options.text.system_message = Some(prompts::NARRATOR_SYSTEM.to_string());
        options.text.history = self.history.clone();
        options.text.language = Some(self.config.language.clone());
        options.text.temperature = self.config.temperature;
        options.text.max_tokens = self.config.max_tokens;
        options.max_attempts = self.config.max_attempts;
        Ok(self.generator.generate_structured(prompt, options).await?)
    }

    fn check_player(&mut self) {
        if self.state.player.is_dead() {
            info!("player character has died");
            self.game_over = true;
        }
    }

    /// The current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable access to the player, for direct interactions (inventory
    /// use/drop) that bypass the narrator.
    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.state.player
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }
}
