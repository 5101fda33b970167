//! Minimal OpenRouter chat-completions client.
//!
//! This crate provides a focused client for the OpenAI-compatible
//! chat-completions endpoint with:
//! - Non-streaming and streaming completions
//! - Tool-call support, including incremental accumulation under streaming
//! - Structured-output mode (strict JSON schema response format)
//! - A request governor that serializes, rate-limits, and retries all calls

pub mod governor;

pub use governor::{GovernorConfig, RequestGovernor};

use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tokio_stream::Stream;
use tracing::debug;

const API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.5-pro-exp-03-25:free";
const APP_REFERER: &str = "https://elderheim.game";
const APP_TITLE: &str = "Elderheim";

/// Errors that can occur when using the client.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error("API key not configured")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("API returned no usable response")]
    EmptyResponse,

    #[error("request governor shut down before the task completed")]
    GovernorShutdown,
}

impl Error {
    /// Whether this error carries the quota signature the governor retries
    /// on: HTTP 429, a "rate limit" phrase, or a "timeout" phrase.
    pub fn is_rate_limited(&self) -> bool {
        if let Error::Api { status: 429, .. } = self {
            return true;
        }
        let text = self.to_string();
        text.contains("429") || text.contains("rate limit") || text.contains("timeout")
    }
}

/// OpenRouter API client.
///
/// Cheap to clone; clones share the underlying HTTP pool and governor.
#[derive(Clone)]
pub struct OpenRouter {
    transport: Transport,
    governor: RequestGovernor,
}

#[derive(Clone)]
struct Transport {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenRouter {
    /// Create a new client with the given API key.
    ///
    /// Must be called within a tokio runtime (the governor spawns its
    /// pruning task here).
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            transport: Transport {
                client: reqwest::Client::builder()
                    .timeout(Duration::from_secs(120))
                    .connect_timeout(Duration::from_secs(30))
                    .build()
                    .expect("Failed to build HTTP client"),
                api_key: api_key.into(),
                model: DEFAULT_MODEL.to_string(),
                base_url: API_BASE.to_string(),
            },
            governor: RequestGovernor::default(),
        }
    }

    /// Create a client from `OPENROUTER_API_KEY`, honoring `OPENROUTER_MODEL`
    /// when set.
    pub fn from_env() -> Result<Self, Error> {
        let api_key = std::env::var("OPENROUTER_API_KEY").map_err(|_| Error::NoApiKey)?;
        let mut client = Self::new(api_key);
        if let Ok(model) = std::env::var("OPENROUTER_MODEL") {
            client = client.with_model(model);
        }
        Ok(client)
    }

    /// Set the default model for this client.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.transport.model = model.into();
        self
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.transport.base_url = base_url.into();
        self
    }

    /// Replace the governor configuration.
    pub fn with_governor_config(mut self, config: GovernorConfig) -> Self {
        self.governor = RequestGovernor::new(config);
        self
    }

    /// The model requests default to.
    pub fn model(&self) -> &str {
        &self.transport.model
    }

    /// Send a completion request through the governor and return the full
    /// response.
    pub async fn chat(&self, mut request: ChatRequest) -> Result<ChatResponse, Error> {
        if request.model.is_empty() {
            request.model = self.transport.model.clone();
        }
        request.stream = false;

        let priority = request.priority;
        let transport = self.transport.clone();
        self.governor
            .enqueue(
                move || {
                    let transport = transport.clone();
                    let request = request.clone();
                    async move {
                        let response = transport.execute(&request).await?;
                        response
                            .json::<ChatResponse>()
                            .await
                            .map_err(|e| Error::Parse(e.to_string()))
                    }
                },
                priority,
            )
            .await
    }

    /// Send a streaming completion request through the governor, feeding
    /// each delta to `on_delta`, and return the accumulated outcome once the
    /// stream ends.
    ///
    /// The whole stream is consumed inside the governed task, so the
    /// completion is recorded against the rate window when the stream ends.
    pub async fn chat_stream<F>(
        &self,
        mut request: ChatRequest,
        on_delta: F,
    ) -> Result<StreamOutcome, Error>
    where
        F: FnMut(StreamDelta) + Send + 'static,
    {
        if request.model.is_empty() {
            request.model = self.transport.model.clone();
        }
        request.stream = true;

        let priority = request.priority;
        let transport = self.transport.clone();
        let on_delta = std::sync::Arc::new(std::sync::Mutex::new(on_delta));
        self.governor
            .enqueue(
                move || {
                    let transport = transport.clone();
                    let request = request.clone();
                    let on_delta = std::sync::Arc::clone(&on_delta);
                    async move {
                        let response = transport.execute(&request).await?;
                        let stream = Box::pin(sse_chunk_stream(response));
                        accumulate_stream(stream, &mut |delta| {
                            let mut on_delta =
                                on_delta.lock().expect("stream callback poisoned");
                            (*on_delta)(delta)
                        })
                        .await
                    }
                },
                priority,
            )
            .await
    }
}

impl Transport {
    async fn execute(&self, request: &ChatRequest) -> Result<reqwest::Response, Error> {
        debug!(model = %request.model, messages = request.messages.len(), stream = request.stream, "sending chat completion request");
        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(Error::Api { status, message });
        }
        Ok(response)
    }
}

// ============================================================================
// Public types
// ============================================================================

/// A completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    pub stream: bool,
    /// Governor priority; higher drains first. Not part of the wire format.
    #[serde(skip)]
    pub priority: i32,
    /// Per-request timeout. Not part of the wire format.
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ChatRequest {
    /// Create a new request with the given messages. The client fills in
    /// its default model unless one is set explicitly.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            model: String::new(),
            messages,
            temperature: None,
            top_p: None,
            max_tokens: None,
            stop: None,
            tools: None,
            tool_choice: None,
            response_format: None,
            stream: false,
            priority: 0,
            timeout: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_stop(mut self, stop: Vec<String>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = Some(tool_choice);
        self
    }

    pub fn with_response_format(mut self, response_format: ResponseFormat) -> Self {
        self.response_format = Some(response_format);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A message in the conversation, in the wire shape the endpoint expects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    /// A tool-result message carrying the identifier of the call it answers.
    pub fn tool(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            tool_calls: None,
        }
    }

    /// An assistant turn that invoked tools.
    pub fn assistant_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_call_id: None,
            tool_calls: Some(tool_calls),
        }
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(text.into()),
            tool_call_id: None,
            tool_calls: None,
        }
    }
}

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A model-issued request to invoke a function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub r#type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON arguments; under streaming this accumulates fragment by
    /// fragment.
    pub arguments: String,
}

/// A tool the model may call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub r#type: String,
    pub function: FunctionSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn function(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            r#type: "function".to_string(),
            function: FunctionSpec {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

/// Tool choice directive.
#[derive(Debug, Clone)]
pub enum ToolChoice {
    Auto,
    None,
    Function { name: String },
}

impl Serialize for ToolChoice {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Function { name } => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

/// Structured-output directive for the endpoint's native JSON-schema mode.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Clone, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub schema: serde_json::Value,
    pub strict: bool,
}

/// A completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ResponseMessage>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

// ============================================================================
// Streaming types
// ============================================================================

/// One incremental chunk of a streaming response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// An incremental tool-call fragment. A fragment whose identifier has not
/// been seen opens a new call; later fragments for the same identifier
/// extend it.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionDelta>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

/// A delta handed to the streaming callback.
#[derive(Debug, Clone)]
pub enum StreamDelta {
    /// A fragment of content text.
    Content(String),
    /// The current state of the accumulated tool-call list.
    ToolCalls(Vec<ToolCall>),
}

/// What a fully consumed stream adds up to.
#[derive(Debug, Clone)]
pub struct StreamOutcome {
    pub content: String,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Merge one tool-call fragment into the in-progress list, keyed by call
/// identifier. Fragments without an identifier are ignored.
pub fn merge_tool_call_delta(calls: &mut Vec<ToolCall>, delta: &ToolCallDelta) {
    let Some(id) = delta.id.as_deref().filter(|id| !id.is_empty()) else {
        return;
    };
    if let Some(existing) = calls.iter_mut().find(|c| c.id == id) {
        if let Some(function) = &delta.function {
            if let Some(name) = &function.name {
                existing.function.name = name.clone();
            }
            if let Some(arguments) = &function.arguments {
                existing.function.arguments.push_str(arguments);
            }
        }
    } else {
        calls.push(ToolCall {
            id: id.to_string(),
            r#type: "function".to_string(),
            function: FunctionCall {
                name: delta
                    .function
                    .as_ref()
                    .and_then(|f| f.name.clone())
                    .unwrap_or_default(),
                arguments: delta
                    .function
                    .as_ref()
                    .and_then(|f| f.arguments.clone())
                    .unwrap_or_default(),
            },
        });
    }
}

/// Consume a chunk stream, accumulating content and tool calls and invoking
/// the callback with each delta as it arrives.
pub async fn accumulate_stream<S>(
    mut stream: S,
    on_delta: &mut (dyn FnMut(StreamDelta) + Send),
) -> Result<StreamOutcome, Error>
where
    S: Stream<Item = Result<ChatChunk, Error>> + Unpin,
{
    let mut content = String::new();
    let mut tool_calls: Option<Vec<ToolCall>> = None;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        let Some(choice) = chunk.choices.into_iter().next() else {
            continue;
        };
        if let Some(text) = choice.delta.content {
            if !text.is_empty() {
                content.push_str(&text);
                on_delta(StreamDelta::Content(text));
            }
        }
        if let Some(deltas) = choice.delta.tool_calls {
            let calls = tool_calls.get_or_insert_with(Vec::new);
            for delta in &deltas {
                merge_tool_call_delta(calls, delta);
            }
            on_delta(StreamDelta::ToolCalls(calls.clone()));
        }
    }

    debug!(
        content_len = content.len(),
        tool_calls = tool_calls.as_ref().map_or(0, Vec::len),
        "stream finished"
    );
    Ok(StreamOutcome {
        content,
        tool_calls,
    })
}

// ============================================================================
// SSE parsing
// ============================================================================

/// Turn an SSE response body into a stream of chunks. A carry-over buffer
/// holds event data split across network reads; `data: [DONE]` ends the
/// stream.
fn sse_chunk_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<ChatChunk, Error>> {
    response
        .bytes_stream()
        .scan((String::new(), false), |(buffer, done), result| {
            if *done {
                return futures::future::ready(None);
            }
            let events = match result {
                Ok(bytes) => {
                    buffer.push_str(&String::from_utf8_lossy(&bytes));
                    parse_sse_buffered(buffer, done)
                }
                Err(e) => vec![Err(Error::Network(e.to_string()))],
            };
            futures::future::ready(Some(events))
        })
        .flat_map(futures::stream::iter)
}

/// Parse complete SSE lines out of the buffer, leaving incomplete data for
/// the next read. Comment lines (OpenRouter sends keepalives starting with
/// `:`) and other SSE metadata are skipped.
fn parse_sse_buffered(buffer: &mut String, done: &mut bool) -> Vec<Result<ChatChunk, Error>> {
    let mut events = Vec::new();

    loop {
        let Some(newline_pos) = buffer.find('\n') else {
            break;
        };
        let line = buffer[..newline_pos].trim_end_matches('\r');

        if let Some(data) = line.strip_prefix("data: ") {
            if data == "[DONE]" {
                *done = true;
                buffer.clear();
                break;
            }
            if !data.is_empty() {
                match serde_json::from_str::<ChatChunk>(data) {
                    Ok(chunk) => events.push(Ok(chunk)),
                    Err(e) => {
                        // Incomplete JSON means the event is still arriving;
                        // keep the line in the buffer.
                        if e.is_eof() {
                            break;
                        }
                        events.push(Err(Error::Parse(format!("SSE parse error: {e}"))));
                    }
                }
            }
        }

        buffer.drain(..=newline_pos);
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let client = OpenRouter::new("test-key");
        assert_eq!(client.model(), DEFAULT_MODEL);

        let client = client.with_model("anthropic/claude-sonnet-4");
        assert_eq!(client.model(), "anthropic/claude-sonnet-4");
    }

    #[test]
    fn test_request_serialization_skips_unset_fields() {
        let request = ChatRequest::new(vec![Message::user("Hello")])
            .with_priority(3)
            .with_timeout(Duration::from_secs(30));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert!(json.get("temperature").is_none());
        assert!(json.get("tools").is_none());
        // Governor priority and timeout never hit the wire.
        assert!(json.get("priority").is_none());
        assert!(json.get("timeout").is_none());
    }

    #[test]
    fn test_tool_choice_serialization() {
        assert_eq!(
            serde_json::to_value(ToolChoice::Auto).unwrap(),
            serde_json::json!("auto")
        );
        assert_eq!(
            serde_json::to_value(ToolChoice::Function {
                name: "roll_dice".into()
            })
            .unwrap(),
            serde_json::json!({"type": "function", "function": {"name": "roll_dice"}})
        );
    }

    #[test]
    fn test_response_format_serialization() {
        let format = ResponseFormat::JsonSchema {
            json_schema: JsonSchemaFormat {
                name: "GameState".into(),
                description: None,
                schema: serde_json::json!({"type": "object"}),
                strict: true,
            },
        };
        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["type"], "json_schema");
        assert_eq!(json["json_schema"]["name"], "GameState");
        assert_eq!(json["json_schema"]["strict"], true);
    }

    #[test]
    fn test_sse_parse_split_across_reads() {
        let mut buffer = String::from(r#"data: {"choices":[{"delta":{"content":"Hel"#);
        let mut done = false;

        // No complete line yet.
        let events = parse_sse_buffered(&mut buffer, &mut done);
        assert!(events.is_empty());

        buffer.push_str("lo\"}}]}\n");
        let events = parse_sse_buffered(&mut buffer, &mut done);
        assert_eq!(events.len(), 1);
        let chunk = events[0].as_ref().unwrap();
        assert_eq!(
            chunk.choices[0].delta.content.as_deref(),
            Some("Hello")
        );
        assert!(!done);
    }

    #[test]
    fn test_sse_done_terminates() {
        let mut buffer = String::from(
            "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"}}]}\ndata: [DONE]\ndata: ignored\n",
        );
        let mut done = false;
        let events = parse_sse_buffered(&mut buffer, &mut done);
        assert_eq!(events.len(), 1);
        assert!(done);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_sse_skips_comments_and_metadata() {
        let mut buffer = String::from(
            ": OPENROUTER PROCESSING\nevent: message\ndata: {\"choices\":[]}\n",
        );
        let mut done = false;
        let events = parse_sse_buffered(&mut buffer, &mut done);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_ok());
    }

    #[test]
    fn test_merge_tool_call_fragments() {
        let mut calls = Vec::new();
        merge_tool_call_delta(
            &mut calls,
            &ToolCallDelta {
                id: Some("a".into()),
                function: Some(FunctionDelta {
                    name: Some("f".into()),
                    arguments: Some("{\"x\":".into()),
                }),
            },
        );
        merge_tool_call_delta(
            &mut calls,
            &ToolCallDelta {
                id: Some("a".into()),
                function: Some(FunctionDelta {
                    name: None,
                    arguments: Some("1}".into()),
                }),
            },
        );

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "f");
        assert_eq!(calls[0].function.arguments, "{\"x\":1}");
    }

    #[test]
    fn test_merge_opens_new_call_per_identifier() {
        let mut calls = Vec::new();
        merge_tool_call_delta(
            &mut calls,
            &ToolCallDelta {
                id: Some("a".into()),
                function: Some(FunctionDelta {
                    name: Some("first".into()),
                    arguments: None,
                }),
            },
        );
        merge_tool_call_delta(
            &mut calls,
            &ToolCallDelta {
                id: Some("b".into()),
                function: Some(FunctionDelta {
                    name: Some("second".into()),
                    arguments: Some("{}".into()),
                }),
            },
        );
        // A fragment with no identifier is dropped.
        merge_tool_call_delta(
            &mut calls,
            &ToolCallDelta {
                id: None,
                function: Some(FunctionDelta {
                    name: None,
                    arguments: Some("orphan".into()),
                }),
            },
        );

        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].function.name, "first");
        assert_eq!(calls[1].function.name, "second");
        assert_eq!(calls[1].function.arguments, "{}");
    }

    #[tokio::test]
    async fn test_accumulate_stream() {
        let chunks = vec![
            Ok(ChatChunk {
                choices: vec![ChunkChoice {
                    delta: Delta {
                        content: Some("Once upon ".into()),
                        tool_calls: None,
                    },
                    finish_reason: None,
                }],
            }),
            Ok(ChatChunk {
                choices: vec![ChunkChoice {
                    delta: Delta {
                        content: Some("a time".into()),
                        tool_calls: Some(vec![ToolCallDelta {
                            id: Some("call_1".into()),
                            function: Some(FunctionDelta {
                                name: Some("look".into()),
                                arguments: Some("{}".into()),
                            }),
                        }]),
                    },
                    finish_reason: None,
                }],
            }),
        ];
        let stream = Box::pin(futures::stream::iter(chunks));

        let mut seen = Vec::new();
        let outcome = accumulate_stream(stream, &mut |delta| seen.push(delta))
            .await
            .unwrap();

        assert_eq!(outcome.content, "Once upon a time");
        let calls = outcome.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "look");

        // Two content deltas plus one tool-call notification.
        assert_eq!(seen.len(), 3);
        assert!(matches!(&seen[0], StreamDelta::Content(t) if t == "Once upon "));
        assert!(matches!(&seen[2], StreamDelta::ToolCalls(c) if c.len() == 1));
    }

    #[test]
    fn test_rate_limit_signature() {
        assert!(Error::Api {
            status: 429,
            message: "slow down".into()
        }
        .is_rate_limited());
        assert!(Error::Network("connection timeout".into()).is_rate_limited());
        assert!(Error::Network("rate limit exceeded".into()).is_rate_limited());
        assert!(!Error::Api {
            status: 500,
            message: "server fell over".into()
        }
        .is_rate_limited());
        assert!(!Error::EmptyResponse.is_rate_limited());
    }
}
