//! HTTP client for the remote chat backend.

use crate::config::Config;
use crate::error::{SendError, SendResult};
use crate::events::{Message, Role};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the per-request correlation id
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Something that can answer a chat message given the prior transcript.
pub trait ChatBackend {
    /// Send `message` with `history` (the transcript before `message`) and
    /// return the assistant's reply text.
    fn send_message(
        &self,
        message: &str,
        history: &[Message],
    ) -> impl Future<Output = SendResult<String>> + Send;
}

/// Entry in `conversation_history` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        HistoryEntry {
            role: message.role(),
            content: message.content().to_string(),
        }
    }
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<HistoryEntry>,
}

/// Body returned by `POST /chat`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl ChatResponse {
    /// Only `success: true` with a reply string counts as a reply
    pub fn into_reply(self) -> SendResult<String> {
        match (self.success, self.response) {
            (true, Some(text)) => Ok(text),
            (true, None) => Err(SendError::Decode(
                "successful response without a `response` field".to_string(),
            )),
            (false, _) => Err(SendError::Unsuccessful {
                detail: self.error_message,
            }),
        }
    }
}

/// Error body of a non-2xx response
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

impl ErrorBody {
    fn detail_text(self) -> Option<String> {
        match self.detail? {
            serde_json::Value::String(text) => Some(text),
            other => Some(other.to_string()),
        }
    }
}

/// Body returned by `GET /health`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
}

/// reqwest-backed client for the chat backend
#[derive(Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    chat_url: String,
    health_url: String,
    timeout_ms: u64,
}

impl ChatClient {
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            chat_url: config.chat_endpoint(),
            health_url: config.health_endpoint(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Perform one chat round trip
    pub async fn send(&self, message: &str, history: &[Message]) -> SendResult<String> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "chat_round_trip",
            %request_id,
            history_len = history.len()
        );

        let payload = ChatRequest {
            message: message.to_string(),
            conversation_history: history.iter().map(HistoryEntry::from).collect(),
        };

        async move {
            tracing::debug!(url = %self.chat_url, "sending chat request");

            let response = self
                .client
                .post(&self.chat_url)
                .header(REQUEST_ID_HEADER, request_id.to_string())
                .json(&payload)
                .send()
                .await
                .map_err(|e| self.classify(e))?;

            let status = response.status();
            let bytes = response.bytes().await.map_err(|e| self.classify(e))?;

            if !status.is_success() {
                let detail = serde_json::from_slice::<ErrorBody>(&bytes)
                    .ok()
                    .and_then(ErrorBody::detail_text);
                return Err(SendError::Status {
                    status: status.as_u16(),
                    detail,
                });
            }

            let body: ChatResponse = serde_json::from_slice(&bytes)
                .map_err(|e| SendError::Decode(e.to_string()))?;
            let reply = body.into_reply()?;
            tracing::debug!(reply_len = reply.len(), "chat request succeeded");
            Ok(reply)
        }
        .instrument(span)
        .await
    }

    /// Probe the backend health endpoint
    pub async fn health(&self) -> SendResult<HealthStatus> {
        let response = self
            .client
            .get(&self.health_url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SendError::Status {
                status: status.as_u16(),
                detail: None,
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        serde_json::from_slice(&bytes).map_err(|e| SendError::Decode(e.to_string()))
    }

    fn classify(&self, error: reqwest::Error) -> SendError {
        if error.is_timeout() {
            SendError::Timeout(self.timeout_ms)
        } else {
            SendError::Network(error)
        }
    }
}

impl ChatBackend for ChatClient {
    fn send_message(
        &self,
        message: &str,
        history: &[Message],
    ) -> impl Future<Output = SendResult<String>> + Send {
        self.send(message, history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_wire_shape() {
        let history = vec![Message::assistant("Hi, ask me anything")];
        let request = ChatRequest {
            message: "Hello".to_string(),
            conversation_history: history.iter().map(HistoryEntry::from).collect(),
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "message": "Hello",
                "conversation_history": [
                    { "role": "assistant", "content": "Hi, ask me anything" }
                ]
            })
        );
    }

    #[test]
    fn success_with_text_is_a_reply() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"success": true, "response": "Hi there!", "timestamp": "2024-01-01T00:00:00"}"#)
                .unwrap();
        assert_eq!(body.into_reply().unwrap(), "Hi there!");
    }

    #[test]
    fn unsuccessful_flag_is_an_error() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"success": false, "response": "I apologize", "error_message": "quota"}"#,
        )
        .unwrap();
        match body.into_reply() {
            Err(SendError::Unsuccessful { detail }) => assert_eq!(detail.as_deref(), Some("quota")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn missing_success_flag_is_an_error() {
        let body: ChatResponse = serde_json::from_str(r#"{"response": "hi"}"#).unwrap();
        assert!(body.into_reply().is_err());
    }

    #[test]
    fn error_detail_accepts_structured_values() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": [{"msg": "field required"}]}"#).unwrap();
        assert!(body.detail_text().unwrap().contains("field required"));

        let body: ErrorBody = serde_json::from_str(r#"{"detail": "Message cannot be empty"}"#).unwrap();
        assert_eq!(body.detail_text().as_deref(), Some("Message cannot be empty"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            timeout_ms: 0,
            ..Config::default()
        };
        let err = ChatClient::new(&config).err().unwrap();
        assert!(err.to_string().contains("timeout_ms"));
    }
}
