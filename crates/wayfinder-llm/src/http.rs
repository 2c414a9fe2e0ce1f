//! `reqwest`-backed reference [`LlmClient`], talking to any OpenAI-compatible
//! chat-completions endpoint. Concrete vendor wiring (model name, auth
//! header) is configuration, not code — see `wayfinder::config`.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::client::{LlmClient, LlmOptions};
use crate::errors::LlmError;

#[derive(Clone, Debug)]
pub struct HttpLlmClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

pub struct HttpLlmClient {
    http: reqwest::Client,
    config: HttpLlmClientConfig,
}

impl HttpLlmClient {
    pub fn new(config: HttpLlmClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn classify_transport_error(err: &reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(std::time::Duration::from_secs(0))
        } else if err.is_connect() {
            LlmError::Unreachable(err.to_string())
        } else {
            LlmError::Backend(err.to_string())
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: serde_json::Value,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn invoke(&self, prompt: &str, options: &LlmOptions) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: serde_json::Value::String(prompt.to_string()),
            }],
        };

        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::classify_transport_error(&e))?;

        if !resp.status().is_success() {
            return Err(LlmError::Backend(format!("status {}", resp.status())));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("malformed response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Backend("empty choices array".to_string()))
    }

    async fn invoke_with_image(
        &self,
        prompt: &str,
        image_path: &Path,
        options: &LlmOptions,
    ) -> Result<String, LlmError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|e| LlmError::Backend(format!("reading {}: {e}", image_path.display())))?;
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, &bytes);
        let content = serde_json::json!([
            { "type": "text", "text": prompt },
            { "type": "image_url", "image_url": { "url": format!("data:image/png;base64,{encoded}") } },
        ]);
        let body = ChatRequest {
            model: &self.config.model,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            messages: vec![ChatMessage { role: "user", content }],
        };

        let resp = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::classify_transport_error(&e))?;

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Backend(format!("malformed response body: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Backend("empty choices array".to_string()))
    }
}
