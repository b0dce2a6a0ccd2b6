//! External LLM provider clients.
//!
//! Every call is a single request/response round trip. Gemini and OpenAI
//! honour JSON mode natively; Anthropic relies on the prompt alone.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::config::LLMConfig;
use crate::types::{CompletionRequest, LLMProvider};
use gradkg_core::{Error, Result};

const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";

/// Something that turns a prompt into text.
pub trait Completion: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> impl Future<Output = Result<String>> + Send;

    /// Model name reported with answers.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// Shared HTTP client with a generous timeout for long answers.
pub fn http_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(120))
        .build()
        .unwrap_or_default()
}

/// Completion over a provider's HTTP API.
pub struct HttpCompletion {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: String,
}

impl HttpCompletion {
    pub fn new(client: Client, provider: LLMProvider, model: String, api_key: String) -> Self {
        Self {
            client,
            provider,
            model,
            api_key,
        }
    }

    /// `None` when no provider has a key.
    pub fn from_config(client: Client, config: &LLMConfig) -> Option<Self> {
        config
            .resolve_provider()
            .map(|(provider, model, key)| Self::new(client, provider, model, key))
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }

    async fn post(&self, url: &str, headers: &[(&str, &str)], body: &Value) -> Result<Value> {
        debug!("Calling {} with model {}", self.provider, self.model);
        let mut req = self.client.post(url).json(body);
        for (name, value) in headers {
            req = req.header(*name, *value);
        }
        let response = req
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("{} API error {}: {}", self.provider, status, body);
            return Err(Error::Llm(format!("API error {}: {}", status, body)));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| Error::Llm(format!("Unreadable response: {}", e)))
    }

    async fn complete_gemini(&self, request: &CompletionRequest) -> Result<String> {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                json!({"role": role, "parts": [{"text": m.content}]})
            })
            .collect();
        let mut generation = json!({
            "temperature": request.temperature,
            "maxOutputTokens": request.max_tokens,
        });
        if request.json_mode {
            generation["responseMimeType"] = json!("application/json");
        }
        let mut body = json!({"contents": contents, "generationConfig": generation});
        if let Some(sys) = &request.system {
            body["systemInstruction"] = json!({"parts": [{"text": sys}]});
        }

        let url = format!("{}/{}:generateContent", GEMINI_URL, self.model);
        let parsed = self
            .post(&url, &[("x-goog-api-key", &self.api_key)], &body)
            .await?;
        let text = parsed["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();
        non_empty(text)
    }

    async fn complete_openai(&self, request: &CompletionRequest) -> Result<String> {
        let mut msgs: Vec<Value> = Vec::new();
        if let Some(sys) = &request.system {
            msgs.push(json!({"role": "system", "content": sys}));
        }
        msgs.extend(
            request
                .messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content})),
        );
        let mut body = json!({
            "model": self.model,
            "messages": msgs,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if request.json_mode {
            body["response_format"] = json!({"type": "json_object"});
        }

        let auth = format!("Bearer {}", self.api_key);
        let parsed = self
            .post(OPENAI_URL, &[("Authorization", auth.as_str())], &body)
            .await?;
        non_empty(
            parsed["choices"][0]["message"]["content"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        )
    }

    async fn complete_anthropic(&self, request: &CompletionRequest) -> Result<String> {
        let conv_msgs: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();
        let mut body = json!({
            "model": self.model,
            "messages": conv_msgs,
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        });
        if let Some(sys) = &request.system {
            body["system"] = json!(sys);
        }

        let parsed = self
            .post(
                ANTHROPIC_URL,
                &[
                    ("x-api-key", self.api_key.as_str()),
                    ("anthropic-version", "2023-06-01"),
                ],
                &body,
            )
            .await?;
        let text = parsed["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();
        non_empty(text)
    }
}

fn non_empty(text: String) -> Result<String> {
    if text.trim().is_empty() {
        Err(Error::Llm("Empty completion".into()))
    } else {
        Ok(text)
    }
}

impl Completion for HttpCompletion {
    fn complete(&self, request: CompletionRequest) -> impl Future<Output = Result<String>> + Send {
        async move {
            match self.provider {
                LLMProvider::Gemini => self.complete_gemini(&request).await,
                LLMProvider::OpenAI => self.complete_openai(&request).await,
                LLMProvider::Anthropic => self.complete_anthropic(&request).await,
            }
        }
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }
}
