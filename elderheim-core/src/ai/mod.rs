//! Text and structured generation over a chat-completion provider.
//!
//! The [`Generator`] is the caller-facing surface: it assembles messages
//! (system, reshaped history, language-suffixed prompt), submits requests
//! through the provider, whose client routes everything through the request
//! governor, and, for structured generation, coerces free-form model output
//! into validated, typed data with error-aware retries.

pub mod extract;
pub mod language;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use openrouter::{
    ChatRequest, ChatResponse, JsonSchemaFormat, Message, OpenRouter, ResponseFormat, StreamDelta,
    StreamOutcome, ToolCall, ToolChoice, ToolDefinition,
};

/// Default system message for plain text generation.
pub const DEFAULT_TEXT_SYSTEM: &str = "You are a helpful assistant.";

/// Default system message for structured generation.
pub const DEFAULT_STRUCTURED_SYSTEM: &str =
    "You are a helpful assistant that produces structured data on request.";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_STRUCTURED_TEMPERATURE: f32 = 0.3;
const DEFAULT_STRUCTURED_MAX_TOKENS: u32 = 4096;
const DEFAULT_STRUCTURED_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from the generation pipeline.
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("API error: {0}")]
    Api(#[from] openrouter::Error),

    #[error("empty response from the API")]
    EmptyResponse,

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("the model returned the schema itself instead of data")]
    SchemaEcho,

    #[error("data does not match the schema: {0}")]
    SchemaViolation(String),

    #[error("the validation schema is itself invalid: {0}")]
    InvalidSchema(String),

    #[error("structured generation failed after {attempts} attempts; last error: {last_error}")]
    AttemptsExhausted { attempts: u32, last_error: String },
}

/// Abstract seam over the chat-completion client, so the pipeline can be
/// exercised against scripted providers in tests.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a completion request and return the full response.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, openrouter::Error>;

    /// Send a streaming request, feeding each delta to the callback, and
    /// return the accumulated outcome once the stream ends.
    async fn complete_stream(
        &self,
        request: ChatRequest,
        on_delta: Box<dyn FnMut(StreamDelta) + Send>,
    ) -> Result<StreamOutcome, openrouter::Error>;

    /// The model requests default to.
    fn model(&self) -> &str;
}

#[async_trait]
impl ChatProvider for OpenRouter {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, openrouter::Error> {
        self.chat(request).await
    }

    async fn complete_stream(
        &self,
        request: ChatRequest,
        on_delta: Box<dyn FnMut(StreamDelta) + Send>,
    ) -> Result<StreamOutcome, openrouter::Error> {
        self.chat_stream(request, on_delta).await
    }

    fn model(&self) -> &str {
        OpenRouter::model(self)
    }
}

/// A role-tagged unit of conversation history, owned by the caller. The
/// generator only reads it and reshapes it into the wire format per request.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// Identifier of the call this message answers (tool results only).
    pub tool_call_id: Option<String>,
    /// Tool calls this assistant turn issued.
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(ChatRole::System, text)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    fn plain(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            tool_call_id: None,
            tool_calls: None,
        }
    }

    fn to_wire(&self) -> Message {
        match (self.role, &self.tool_call_id, &self.tool_calls) {
            (ChatRole::Tool, Some(id), _) => Message::tool(id, &self.content),
            (ChatRole::Assistant, _, Some(calls)) => {
                Message::assistant_tool_calls(&self.content, calls.clone())
            }
            (role, _, _) => match role {
                ChatRole::System => Message::system(&self.content),
                ChatRole::User => Message::user(&self.content),
                ChatRole::Assistant => Message::assistant(&self.content),
                // A tool message with no call id degrades to a user message
                // rather than sending an unanswerable tool turn.
                ChatRole::Tool => Message::user(&self.content),
            },
        }
    }
}

/// Options for text generation.
#[derive(Default)]
pub struct TextOptions {
    /// System message; a generic default applies when absent.
    pub system_message: Option<String>,
    /// Prior conversation, oldest first.
    pub history: Vec<ChatMessage>,
    /// Reply-language code appended to the prompt when recognized.
    pub language: Option<String>,
    /// Tools the model may call.
    pub tools: Option<Vec<ToolDefinition>>,
    pub tool_choice: Option<ToolChoice>,
    /// Raw request parameters passed through to the endpoint.
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Governor priority; higher runs first.
    pub priority: i32,
    /// Per-request timeout.
    pub timeout: Option<Duration>,
}

/// Options for structured generation.
pub struct StructuredOptions {
    pub text: TextOptions,
    pub schema: SchemaSpec,
    /// Full request/validate cycles before giving up.
    pub max_attempts: u32,
}

impl StructuredOptions {
    pub fn new(schema: SchemaSpec) -> Self {
        Self {
            text: TextOptions::default(),
            schema,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// A named JSON Schema, used both for the endpoint's structured-output mode
/// and for local validation.
#[derive(Debug, Clone)]
pub struct SchemaSpec {
    pub name: String,
    pub description: Option<String>,
    pub schema: Value,
}

/// What text generation returns.
#[derive(Debug, Clone)]
pub struct TextReply {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// The caller-facing generation surface.
pub struct Generator {
    provider: Arc<dyn ChatProvider>,
}

impl Generator {
    pub fn new(provider: Arc<dyn ChatProvider>) -> Self {
        Self { provider }
    }

    /// Generate a text reply.
    pub async fn generate_text(
        &self,
        prompt: &str,
        options: TextOptions,
    ) -> Result<TextReply, GenerateError> {
        let system = options
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_TEXT_SYSTEM);
        let messages =
            build_messages(system, &options.history, prompt, options.language.as_deref());
        info!(messages = messages.len(), "generating text");

        let request = apply_options(ChatRequest::new(messages), &options);
        let response = self.provider.complete(request).await?;

        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or(GenerateError::EmptyResponse)?;
        let content = message.content.unwrap_or_default();
        info!(chars = content.len(), "text generation finished");
        if let Some(calls) = &message.tool_calls {
            info!(tool_calls = calls.len(), "model issued tool calls");
        }

        Ok(TextReply {
            content,
            tool_calls: message.tool_calls,
        })
    }

    /// Generate a text reply under streaming, invoking `on_delta` with each
    /// content fragment and each tool-call list update as it arrives.
    pub async fn generate_text_stream<F>(
        &self,
        prompt: &str,
        options: TextOptions,
        on_delta: F,
    ) -> Result<TextReply, GenerateError>
    where
        F: FnMut(StreamDelta) + Send + 'static,
    {
        let system = options
            .system_message
            .as_deref()
            .unwrap_or(DEFAULT_TEXT_SYSTEM);
        let messages =
            build_messages(system, &options.history, prompt, options.language.as_deref());
        info!(messages = messages.len(), "generating text (streaming)");

        let request = apply_options(ChatRequest::new(messages), &options);
        let outcome = self
            .provider
            .complete_stream(request, Box::new(on_delta))
            .await?;
        info!(chars = outcome.content.len(), "streaming generation finished");

        Ok(TextReply {
            content: outcome.content,
            tool_calls: outcome.tool_calls,
        })
    }

    /// Obtain a value that both parses and validates against the given
    /// schema, retrying with error-aware corrective prompts.
    pub async fn generate_structured<T>(
        &self,
        prompt: &str,
        options: StructuredOptions,
    ) -> Result<T, GenerateError>
    where
        T: DeserializeOwned,
    {
        let StructuredOptions {
            text: options,
            schema,
            max_attempts,
        } = options;

        let validator = jsonschema::validator_for(&schema.schema)
            .map_err(|e| GenerateError::InvalidSchema(e.to_string()))?;

        let system = format!(
            "{}\n\n{}",
            options
                .system_message
                .as_deref()
                .unwrap_or(DEFAULT_STRUCTURED_SYSTEM),
            strict_format_instructions(&schema.schema),
        );
        let base_messages =
            build_messages(&system, &options.history, prompt, options.language.as_deref());

        let response_format = ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: schema.name.clone(),
                description: schema.description.clone(),
                schema: schema.schema.clone(),
                strict: true,
            },
        };

        let mut last_error: Option<GenerateError> = None;
        for attempt in 1..=max_attempts {
            info!(attempt, max_attempts, "structured generation attempt");

            let mut messages = base_messages.clone();
            if attempt > 1 {
                if let Some(err) = &last_error {
                    messages.push(Message::user(corrective_message(err)));
                }
            }

            let mut request = apply_options(ChatRequest::new(messages), &options)
                .with_response_format(response_format.clone());
            if request.temperature.is_none() {
                request.temperature = Some(DEFAULT_STRUCTURED_TEMPERATURE);
            }
            if request.max_tokens.is_none() {
                request.max_tokens = Some(DEFAULT_STRUCTURED_MAX_TOKENS);
            }
            if request.timeout.is_none() {
                request.timeout = Some(DEFAULT_STRUCTURED_TIMEOUT);
            }

            match self.structured_attempt::<T>(request, &validator).await {
                Ok(value) => {
                    info!(attempt, "structured generation succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    warn!(attempt, error = %err, "structured generation attempt failed");
                    last_error = Some(err);
                }
            }
        }

        let last_error = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        Err(GenerateError::AttemptsExhausted {
            attempts: max_attempts,
            last_error,
        })
    }

    async fn structured_attempt<T>(
        &self,
        request: ChatRequest,
        validator: &jsonschema::Validator,
    ) -> Result<T, GenerateError>
    where
        T: DeserializeOwned,
    {
        let response = self.provider.complete(request).await?;
        let message = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or(GenerateError::EmptyResponse)?;
        let raw = message.content.unwrap_or_default();

        let extracted = extract::extract_json(&raw);
        if extracted.is_empty() {
            return Err(GenerateError::InvalidJson(
                "response content is empty".to_string(),
            ));
        }
        let parsed: Value = serde_json::from_str(&extracted)
            .map_err(|e| GenerateError::InvalidJson(e.to_string()))?;

        if looks_like_schema(&parsed) {
            return Err(GenerateError::SchemaEcho);
        }
        if let Err(error) = validator.validate(&parsed) {
            return Err(GenerateError::SchemaViolation(error.to_string()));
        }

        serde_json::from_value(parsed).map_err(|e| GenerateError::SchemaViolation(e.to_string()))
    }
}

fn build_messages(
    system: &str,
    history: &[ChatMessage],
    prompt: &str,
    language: Option<&str>,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system));
    for entry in history {
        messages.push(entry.to_wire());
    }
    messages.push(Message::user(language::apply_language_suffix(
        prompt, language,
    )));
    messages
}

fn apply_options(mut request: ChatRequest, options: &TextOptions) -> ChatRequest {
    if let Some(tools) = &options.tools {
        if !tools.is_empty() {
            request.tools = Some(tools.clone());
        }
    }
    if let Some(tool_choice) = &options.tool_choice {
        request.tool_choice = Some(tool_choice.clone());
    }
    request.temperature = options.temperature;
    request.top_p = options.top_p;
    request.max_tokens = options.max_tokens;
    request.priority = options.priority;
    request.timeout = options.timeout;
    request
}

/// Whether a parsed value is structurally a JSON Schema rather than data,
/// i.e. the model echoed the schema back instead of filling it.
fn looks_like_schema(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some("object")
        && value.get("properties").map_or(false, Value::is_object)
}

fn strict_format_instructions(schema: &Value) -> String {
    let pretty = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "CRITICAL: your reply MUST be ONLY a valid JSON object matching the structure below.\n\
         Do NOT include any extra text, explanations, comments, or markdown formatting before \
         or after the JSON object.\n\
         Do NOT return a string containing JSON. The reply must be the JSON object itself.\n\
         Do NOT return null or any other type. ONLY the JSON object.\n\n\
         The JSON structure you must return (FILLED WITH DATA, not the schema itself):\n\
         {pretty}\n\n\
         ONCE MORE: RETURN ONLY THE RAW JSON OBJECT AND NOTHING ELSE."
    )
}

fn corrective_message(err: &GenerateError) -> String {
    format!(
        "The previous attempt failed. Error: {err}. Return ONLY the JSON object with the data, \
         matching the schema."
    )
}
