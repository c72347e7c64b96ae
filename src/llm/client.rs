//! LLM transport.
//!
//! The core depends only on the [`LlmClient`] trait (§6): a chat-style
//! completion endpoint supporting function-calling with an `auto`/`required`
//! tool-choice hint. [`HttpLlmClient`] is the one concrete implementation
//! shipped, targeting any OpenAI-compatible `/chat/completions` endpoint.

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, warn};

use super::types::{ChatCompletionRequest, ChatCompletionResponse, GenerationOptions, Message, ToolChoice, ToolDefinition};
use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// The chat-completions contract the cognitive loop and the intent index
/// builder consume. Any provider satisfying it may be substituted.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Issue one chat-completions call with an explicit tool list and
    /// tool-choice hint.
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        tool_choice: ToolChoice,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse>;
}

/// An OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct HttpLlmClient {
    client: Client,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl HttpLlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.api_key.expose_secret()))
                .map_err(|e| Error::ConfigurationInvalid(format!("invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(HttpLlmClient {
            client,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    async fn send_once(&self, request: &ChatCompletionRequest) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!("LLM request: model={} tool_choice={:?}", request.model, request.tool_choice);

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response.json::<ChatCompletionResponse>().await?)
        } else {
            let body = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 || status.is_server_error() {
                Err(Error::LlmTransport(format!("transient error ({}): {}", status, body)))
            } else {
                Err(Error::LlmTransport(format!("request failed ({}): {}", status, body)))
            }
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        tool_choice: ToolChoice,
        options: GenerationOptions,
    ) -> Result<ChatCompletionResponse> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            stream: Some(false),
            tools: Some(tools),
            tool_choice: Some(tool_choice),
        };

        let mut delays = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(200))
            .with_max_elapsed_time(Some(Duration::from_secs(30)))
            .build();

        let mut attempt = 0u32;
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }
                    match delays.next_backoff() {
                        Some(delay) => {
                            warn!("LLM request attempt {} failed, retrying in {:?}: {}", attempt, delay, e);
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Role;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: String) -> LlmConfig {
        LlmConfig {
            api_key: SecretString::from("test-key".to_string()),
            model: "gpt-4o".to_string(),
            base_url,
            timeout_secs: 5,
            max_retries: 0,
        }
    }

    #[test]
    fn client_construction_succeeds_with_valid_config() {
        let client = HttpLlmClient::new(&test_config("https://example.invalid/v1".to_string()));
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn complete_parses_a_successful_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "hello"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let client = HttpLlmClient::new(&test_config(server.uri())).unwrap();
        let response = client
            .complete(vec![Message::user("hi")], vec![], ToolChoice::Auto, GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(response.choices[0].message.role, Role::Assistant);
        assert_eq!(response.choices[0].message.content, "hello");
    }

    #[tokio::test]
    async fn complete_retries_on_server_error_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-2",
                "model": "gpt-4o",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "retried"},
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let mut config = test_config(server.uri());
        config.max_retries = 2;
        let client = HttpLlmClient::new(&config).unwrap();
        let response = client
            .complete(vec![Message::user("hi")], vec![], ToolChoice::Auto, GenerationOptions::default())
            .await
            .unwrap();

        assert_eq!(response.choices[0].message.content, "retried");
    }
}
