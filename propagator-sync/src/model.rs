//! Generative model boundary.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MAX_OUTPUT_TOKENS: u32 = 16_384;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Text in, text out. One call per site, never retried.
pub trait ModelClient: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Blocking client for the Anthropic Messages API.
pub struct AnthropicClient {
    agent: ureq::Agent,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

impl ModelClient for AnthropicClient {
    fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        let request = MessageRequest {
            model: &self.model,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        tracing::debug!(model = %self.model, chars = prompt.len(), "sending model request");
        let response = self
            .agent
            .post(&self.endpoint())
            .set("x-api-key", &self.api_key)
            .set("anthropic-version", ANTHROPIC_VERSION)
            .set("content-type", "application/json")
            .send_json(&request);

        let response = match response {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                return Err(ModelError::Api { status, body });
            }
            Err(ureq::Error::Transport(t)) => return Err(ModelError::Transport(t.to_string())),
        };

        let body: MessageResponse = response
            .into_json()
            .map_err(|e| ModelError::Decode(e.to_string()))?;
        Ok(extract_text(body))
    }
}

fn extract_text(response: MessageResponse) -> String {
    response
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Other => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_shape() {
        let request = MessageRequest {
            model: "m",
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: [Message {
                role: "user",
                content: "hi",
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "m",
                "max_tokens": 16384,
                "messages": [{"role": "user", "content": "hi"}]
            })
        );
    }

    #[test]
    fn text_blocks_are_concatenated_and_others_ignored() {
        let body: MessageResponse = serde_json::from_str(
            r#"{"id":"msg_1","content":[
                {"type":"text","text":"--- FILE: a.md ---\n"},
                {"type":"tool_use","id":"t","name":"x","input":{}},
                {"type":"text","text":"A\n--- END FILE ---"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(body), "--- FILE: a.md ---\nA\n--- END FILE ---");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = AnthropicClient::new("k", "m", "http://localhost:1/");
        assert_eq!(client.endpoint(), "http://localhost:1/v1/messages");
    }

    #[test]
    fn unreachable_host_is_transport_error() {
        let client = AnthropicClient::new("k", "m", "http://127.0.0.1:9");
        let err = client.complete("hello").unwrap_err();
        assert!(matches!(err, ModelError::Transport(_)), "{err}");
    }
}
