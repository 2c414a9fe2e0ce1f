use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::errors::LlmError;

/// Per-call tuning; callers build one from `RunOptions` (`llm_timeout_ms`,
/// `llm_max_retries`) rather than hardcoding it per invocation.
#[derive(Clone, Debug)]
pub struct LlmOptions {
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(300_000),
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// The LLM-backend contract the core consumes (spec.md §6): a best-effort
/// JSON-returning text endpoint, and an optional vision endpoint. Every
/// caller treats the reply as untrusted text that may not parse.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(&self, prompt: &str, options: &LlmOptions) -> Result<String, LlmError>;

    async fn invoke_with_image(
        &self,
        prompt: &str,
        image_path: &Path,
        options: &LlmOptions,
    ) -> Result<String, LlmError> {
        let _ = (prompt, image_path, options);
        Err(LlmError::VisionUnsupported)
    }
}

/// Wraps any [`LlmClient`] with the retry-with-backoff policy spec.md §5/§6
/// assumes everywhere an LLM is consulted: up to `max_retries` attempts,
/// exponential backoff starting at 200ms, only retrying on transient errors.
pub async fn invoke_with_retry(
    client: &dyn LlmClient,
    prompt: &str,
    options: &LlmOptions,
    max_retries: u32,
) -> Result<String, LlmError> {
    let mut attempt = 0;
    let mut delay = Duration::from_millis(200);
    loop {
        match tokio::time::timeout(options.timeout, client.invoke(prompt, options)).await {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(err)) if err.is_retryable() && attempt < max_retries => {
                tracing::warn!(attempt, error = %err, "llm call failed, retrying");
            }
            Ok(Err(err)) => return Err(err),
            Err(_) if attempt < max_retries => {
                tracing::warn!(attempt, "llm call timed out, retrying");
            }
            Err(_) => return Err(LlmError::Timeout(options.timeout)),
        }
        attempt += 1;
        tokio::time::sleep(delay).await;
        delay *= 2;
    }
}

/// Deterministic client for tests and offline development: returns a fixed
/// reply (or cycles through a queue), never errors, never sleeps.
#[derive(Default)]
pub struct MockLlmClient {
    replies: std::sync::Mutex<std::collections::VecDeque<String>>,
    fallback: String,
}

impl MockLlmClient {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            replies: std::sync::Mutex::new(std::collections::VecDeque::new()),
            fallback: fallback.into(),
        }
    }

    pub fn with_queue(replies: impl IntoIterator<Item = String>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into_iter().collect()),
            fallback: String::new(),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn invoke(&self, _prompt: &str, _options: &LlmOptions) -> Result<String, LlmError> {
        let mut queue = self.replies.lock().unwrap();
        Ok(queue.pop_front().unwrap_or_else(|| self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn retry_gives_up_after_budget_on_non_retryable() {
        struct AlwaysBackend;
        #[async_trait]
        impl LlmClient for AlwaysBackend {
            async fn invoke(&self, _: &str, _: &LlmOptions) -> Result<String, LlmError> {
                Err(LlmError::Backend("bad request".into()))
            }
        }
        let err = invoke_with_retry(&AlwaysBackend, "p", &LlmOptions::default(), 3)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Backend(_)));
    }

    #[tokio::test]
    async fn mock_client_cycles_queue_then_falls_back() {
        let client = MockLlmClient::with_queue(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(client.invoke("x", &LlmOptions::default()).await.unwrap(), "a");
        assert_eq!(client.invoke("x", &LlmOptions::default()).await.unwrap(), "b");
        assert_eq!(client.invoke("x", &LlmOptions::default()).await.unwrap(), "");
    }
}
