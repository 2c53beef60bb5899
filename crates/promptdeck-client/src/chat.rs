//! Chat completion client for OpenAI-compatible endpoints.

use async_trait::async_trait;
use log::{debug, info};
use promptdeck_config::ChatConfig;
use promptdeck_core::{BackendError, ChatBackend, Message};
use serde::Deserialize;
use serde_json::{Value, json};

/// Leading system instruction sent with every request, ahead of the
/// conversation's own messages.
const MARKDOWN_INSTRUCTION: &str = "You are a helpful assistant. Format your responses using \
     markdown for better readability. Use markdown features like headings, lists, code blocks, \
     and emphasis where appropriate.";

/// Reqwest-backed chat completion client.
pub struct ChatCompletionsClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionsClient {
    /// Build a client from chat settings and the user credential.
    pub fn new(config: &ChatConfig, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// The completions endpoint for the configured base URL.
    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Build the request body for the API.
    fn build_request_body(&self, messages: &[Message]) -> Value {
        let mut wire: Vec<Value> = Vec::with_capacity(messages.len() + 1);
        wire.push(json!({
            "role": "system",
            "content": MARKDOWN_INSTRUCTION,
        }));
        for message in messages {
            wire.push(json!({
                "role": message.role.as_str(),
                "content": message.content,
            }));
        }
        json!({
            "model": self.model,
            "messages": wire,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        })
    }
}

/// Response payload: only the first choice's text matters.
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatBackend for ChatCompletionsClient {
    /// Send the full transcript and return the first completion's text,
    /// empty when the API returns no content.
    async fn complete(&self, messages: &[Message]) -> Result<String, BackendError> {
        let body = self.build_request_body(messages);
        info!(
            "requesting chat completion (model={}, message_count={})",
            self.model,
            messages.len()
        );
        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|err| BackendError::Transport(err.to_string()))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!("chat completion received (reply_len={})", reply.len());
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::{ChatCompletionsClient, CompletionResponse, MARKDOWN_INSTRUCTION};
    use pretty_assertions::assert_eq;
    use promptdeck_config::ChatConfig;
    use promptdeck_core::Message;

    fn client() -> ChatCompletionsClient {
        ChatCompletionsClient::new(&ChatConfig::default(), "sk-test")
    }

    #[test]
    fn endpoint_joins_without_duplicate_slash() {
        let config = ChatConfig {
            base_url: "https://api.openai.com/v1/".to_string(),
            ..ChatConfig::default()
        };
        let client = ChatCompletionsClient::new(&config, "sk-test");
        assert_eq!(
            client.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn request_body_carries_instruction_then_transcript() {
        let body = client().build_request_body(&[
            Message::system("prompt body"),
            Message::user("Write a follow-up email"),
        ]);
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_tokens"], 1000);

        let messages = body["messages"].as_array().expect("messages");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], MARKDOWN_INSTRUCTION);
        assert_eq!(messages[1]["role"], "system");
        assert_eq!(messages[1]["content"], "prompt body");
        assert_eq!(messages[2]["role"], "user");
    }

    #[test]
    fn missing_choice_content_reads_as_empty() {
        let parsed: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{}}]}"#).expect("parse");
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        assert_eq!(reply, "");

        let empty: CompletionResponse = serde_json::from_str(r#"{}"#).expect("parse");
        assert!(empty.choices.is_empty());
    }
}
