//! Testing utilities for the adventure engine.
//!
//! [`ScriptedProvider`] stands in for the real API client so the generation
//! pipeline and the session can be exercised deterministically, without
//! network calls. It returns canned responses in order and records every
//! request it receives for assertions.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ai::ChatProvider;
use openrouter::{
    accumulate_stream, ChatChunk, ChatRequest, ChatResponse, Choice, Error, ResponseMessage,
    StreamDelta, StreamOutcome,
};

enum Scripted {
    Response(Result<ChatResponse, Error>),
    Stream(Vec<ChatChunk>),
}

/// A chat provider that replays scripted responses.
#[derive(Default)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text response.
    pub fn push_text(&self, content: &str) {
        self.push_response(text_response(content));
    }

    /// Queue a full response.
    pub fn push_response(&self, response: ChatResponse) {
        self.lock_script()
            .push_back(Scripted::Response(Ok(response)));
    }

    /// Queue an error.
    pub fn push_error(&self, error: Error) {
        self.lock_script().push_back(Scripted::Response(Err(error)));
    }

    /// Queue a chunk script for a streaming call.
    pub fn push_stream(&self, chunks: Vec<ChatChunk>) {
        self.lock_script().push_back(Scripted::Stream(chunks));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.lock_requests().clone()
    }

    pub fn request_count(&self) -> usize {
        self.lock_requests().len()
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, VecDeque<Scripted>> {
        self.script.lock().expect("script poisoned")
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<ChatRequest>> {
        self.requests.lock().expect("request log poisoned")
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, Error> {
        self.lock_requests().push(request);
        match self.lock_script().pop_front() {
            Some(Scripted::Response(result)) => result,
            Some(Scripted::Stream(_)) => Err(Error::Config(
                "scripted a stream, got a completion call".to_string(),
            )),
            None => Err(Error::Config("no scripted responses left".to_string())),
        }
    }

    async fn complete_stream(
        &self,
        request: ChatRequest,
        mut on_delta: Box<dyn FnMut(StreamDelta) + Send>,
    ) -> Result<StreamOutcome, Error> {
        self.lock_requests().push(request);
        let chunks = match self.lock_script().pop_front() {
            Some(Scripted::Stream(chunks)) => chunks,
            Some(Scripted::Response(_)) => {
                return Err(Error::Config(
                    "scripted a completion, got a stream call".to_string(),
                ))
            }
            None => return Err(Error::Config("no scripted responses left".to_string())),
        };
        let stream = Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)));
        accumulate_stream(stream, &mut *on_delta).await
    }

    fn model(&self) -> &str {
        "scripted/test-model"
    }
}

/// Build a response whose single choice carries the given text.
pub fn text_response(content: &str) -> ChatResponse {
    ChatResponse {
        choices: vec![Choice {
            message: Some(ResponseMessage {
                content: Some(content.to_string()),
                tool_calls: None,
            }),
            finish_reason: Some("stop".to_string()),
        }],
        usage: None,
    }
}

/// Build a minimal valid scene update as the narrator would return it.
pub fn scene_response(scene: &str, option_texts: &[&str]) -> ChatResponse {
    let options: Vec<serde_json::Value> = option_texts
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::json!({
                "id": format!("opt{}", i + 1),
                "text": text,
                "consequence": format!("You decide to {}.", text.to_lowercase()),
                "timeChange": 10
            })
        })
        .collect();
    let update = serde_json::json!({
        "scene": scene,
        "options": options,
    });
    text_response(&update.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_provider_replays_in_order() {
        let provider = ScriptedProvider::new();
        provider.push_text("first");
        provider.push_text("second");

        let request = ChatRequest::new(vec![]);
        let first = provider.complete(request.clone()).await.unwrap();
        let second = provider.complete(request.clone()).await.unwrap();

        assert_eq!(
            first.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("first")
        );
        assert_eq!(
            second.choices[0].message.as_ref().unwrap().content.as_deref(),
            Some("second")
        );
        assert_eq!(provider.request_count(), 2);

        // Exhausted scripts turn into errors, not panics.
        assert!(provider.complete(request).await.is_err());
    }
}
