//! Chat-completion client abstraction for the planner.
//!
//! The [`ChatClient`] trait decouples planning from the model backend.
//! [`HttpChatClient`] talks to an OpenAI-compatible endpoint; tests use
//! scripted clients that return canned replies without touching the network.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::io::config::LlmConfig;

/// One planning exchange: a system instruction plus a user instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    /// Hard upper bound on the whole exchange.
    pub timeout: Duration,
}

/// Abstraction over chat model backends.
pub trait ChatClient {
    /// Send a single request and return the reply text. No retries.
    fn complete(&self, request: &ChatRequest) -> Result<String>;
}

impl<C: ChatClient + ?Sized> ChatClient for &C {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        (**self).complete(request)
    }
}

impl<C: ChatClient + ?Sized> ChatClient for Box<C> {
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        (**self).complete(request)
    }
}

/// Client used when no endpoint is configured. Every request fails at once,
/// which sends the planner straight to its rule-based fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineChatClient;

impl ChatClient for OfflineChatClient {
    fn complete(&self, _request: &ChatRequest) -> Result<String> {
        Err(anyhow!("no model endpoint configured"))
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
    /// Some servers put the whole answer here and leave `content` null.
    #[serde(default)]
    reasoning_content: Option<String>,
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
#[derive(Debug, Clone)]
pub struct HttpChatClient {
    http: Client,
    url: String,
    model: String,
}

impl HttpChatClient {
    pub fn new(url: &str, model: &str, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {key}"))
                .context("api key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let http = Client::builder()
            .default_headers(headers)
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            url: url.to_string(),
            model: model.to_string(),
        })
    }

    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Option<Self>> {
        let Some(url) = config.api_url.as_deref() else {
            return Ok(None);
        };
        let key = config.api_key();
        if key.is_none() {
            debug!(env = %config.api_key_env, "no api key in environment; sending unauthenticated");
        }
        Self::new(url, &config.model, key.as_deref()).map(Some)
    }
}

impl ChatClient for HttpChatClient {
    #[instrument(skip_all, fields(url = %self.url, model = %self.model, timeout_secs = request.timeout.as_secs()))]
    fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = CompletionBody {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&self.url)
            .timeout(request.timeout)
            .json(&body)
            .send()
            .context("send chat completion request")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion failed");
            return Err(anyhow!(
                "chat completion returned {status}: {}",
                truncate(&text, 200)
            ));
        }

        let parsed: CompletionResponse = response.json().context("parse chat completion body")?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .ok_or_else(|| anyhow!("chat completion had no choices"))?;

        match (message.content, message.reasoning_content) {
            (Some(content), _) if !content.trim().is_empty() => Ok(content),
            (_, Some(reasoning)) if !reasoning.trim().is_empty() => {
                debug!("using reasoning_content in place of empty content");
                Ok(reasoning)
            }
            _ => Err(anyhow!("chat completion message was empty")),
        }
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            system: "system".to_string(),
            user: "user".to_string(),
            max_tokens: 16,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn offline_client_always_fails() {
        let err = OfflineChatClient.complete(&request()).unwrap_err();
        assert!(err.to_string().contains("no model endpoint"));
    }

    #[test]
    fn from_config_without_url_is_none() {
        let client = HttpChatClient::from_config(&LlmConfig::default()).expect("config");
        assert!(client.is_none());
    }

    #[test]
    fn body_serializes_openai_shape() {
        let req = request();
        let body = CompletionBody {
            model: "m",
            messages: [
                Message {
                    role: "system",
                    content: &req.system,
                },
                Message {
                    role: "user",
                    content: &req.user,
                },
            ],
            max_tokens: req.max_tokens,
        };
        let value = serde_json::to_value(&body).expect("serialize");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "user");
        assert_eq!(value["max_tokens"], 16);
    }

    #[test]
    fn response_falls_back_to_reasoning_content() {
        let parsed: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":null,"reasoning_content":"[\"Kitchen\"]"}}]}"#,
        )
        .expect("parse");
        let message = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .expect("message");
        assert!(message.content.is_none());
        assert_eq!(message.reasoning_content.as_deref(), Some("[\"Kitchen\"]"));
    }

    fn client_for(server: &mockito::Server, api_key: Option<&str>) -> HttpChatClient {
        let url = format!("{}/v1/chat/completions", server.url());
        HttpChatClient::new(&url, "test-model", api_key).expect("client")
    }

    #[test]
    fn complete_posts_openai_body_and_returns_content() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "max_tokens": 16,
                "messages": [
                    {"role": "system", "content": "system"},
                    {"role": "user", "content": "user"},
                ],
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"content":"[\"Kitchen\"]"}}]}"#)
            .create();

        let reply = client_for(&server, Some("secret"))
            .complete(&request())
            .expect("reply");
        assert_eq!(reply, r#"["Kitchen"]"#);
        mock.assert();
    }

    #[test]
    fn complete_uses_reasoning_content_when_content_is_empty() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"content":"  ","reasoning_content":"[\"Office\"]"}}]}"#,
            )
            .create();

        let reply = client_for(&server, None).complete(&request()).expect("reply");
        assert_eq!(reply, r#"["Office"]"#);
    }

    #[test]
    fn complete_reports_non_success_status() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("model overloaded")
            .expect(1)
            .create();

        let err = client_for(&server, None).complete(&request()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("500"), "{message}");
        assert!(message.contains("model overloaded"), "{message}");
        mock.assert();
    }

    #[test]
    fn complete_rejects_reply_without_choices() {
        let mut server = mockito::Server::new();
        server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create();

        let err = client_for(&server, None).complete(&request()).unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }
}
