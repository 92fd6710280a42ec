//! Text-generation client used by the AI-assisted builder.
//!
//! Two providers: `local` speaks the OpenAI-compatible chat-completions API (LM Studio,
//! OpenRouter, …) and `gemini` speaks the Generative Language REST API. Callers depend on
//! the [`TextGenerator`] trait so tests can substitute a canned generator.

use crate::config::GenerationConfig;
use crate::error::{HubError, HubResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Local,
    Gemini,
}

/// A model a provider offers for text generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send `prompt` as a single user message and return the raw text reply.
    async fn generate(&self, provider: Provider, model: Option<&str>, prompt: &str) -> HubResult<String>;

    async fn list_models(&self, provider: Provider) -> HubResult<Vec<ModelInfo>>;
}

// OpenAI-compatible request/response
#[derive(Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct LocalModels {
    data: Vec<LocalModel>,
}

#[derive(Deserialize)]
struct LocalModel {
    id: String,
}

// Gemini request/response
#[derive(Serialize)]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContentOut<'a>>,
}

#[derive(Serialize)]
struct GeminiContentOut<'a> {
    parts: Vec<GeminiPartOut<'a>>,
}

#[derive(Serialize)]
struct GeminiPartOut<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContentIn>,
}

#[derive(Deserialize)]
struct GeminiContentIn {
    #[serde(default)]
    parts: Vec<GeminiPartIn>,
}

#[derive(Deserialize)]
struct GeminiPartIn {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModels {
    #[serde(default)]
    models: Vec<GeminiModel>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiModel {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

/// HTTP-backed generator.
pub struct GenerationClient {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl GenerationClient {
    pub fn new(config: GenerationConfig) -> HubResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| HubError::Config(format!("HTTP client for generation: {e}")))?;
        Ok(Self { config, client })
    }

    fn local_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.local_api_url.trim_end_matches('/'), path)
    }

    fn gemini_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.gemini_api_url.trim_end_matches('/'), path)
    }

    fn gemini_key(&self) -> HubResult<String> {
        self.config
            .gemini_key()
            .ok_or_else(|| HubError::UpstreamGeneration("GEMINI_API_KEY is not set.".to_string()))
    }

    async fn check(res: reqwest::Response, what: &str) -> HubResult<reqwest::Response> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        Err(HubError::UpstreamGeneration(format!("{what} returned {status}: {body}")))
    }

    async fn generate_local(&self, model: Option<&str>, prompt: &str) -> HubResult<String> {
        let model = model.or(self.config.default_local_model.as_deref());
        let body = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            max_tokens: self.config.max_tokens,
        };
        let mut req = self.client.post(self.local_url("chat/completions")).json(&body);
        if let Some(key) = self.config.local_api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            req = req.bearer_auth(key.trim());
        }
        let res = Self::check(req.send().await?, "chat completion").await?;
        let parsed: ChatResponse = res.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| HubError::UpstreamGeneration("empty completion".to_string()))
    }

    async fn generate_gemini(&self, model: Option<&str>, prompt: &str) -> HubResult<String> {
        let key = self.gemini_key()?;
        let model = model.unwrap_or(&self.config.default_gemini_model);
        let body = GeminiRequest {
            contents: vec![GeminiContentOut {
                parts: vec![GeminiPartOut { text: prompt }],
            }],
        };
        let res = self
            .client
            .post(self.gemini_url(&format!("models/{model}:generateContent")))
            .query(&[("key", key.as_str())])
            .json(&body)
            .send()
            .await?;
        let res = Self::check(res, "gemini generateContent").await?;
        let parsed: GeminiResponse = res.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(HubError::UpstreamGeneration("empty gemini response".to_string()));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GenerationClient {
    async fn generate(&self, provider: Provider, model: Option<&str>, prompt: &str) -> HubResult<String> {
        let model = model.map(str::trim).filter(|m| !m.is_empty());
        tracing::info!(target: "minihub::generation", ?provider, model = model.unwrap_or("<default>"), prompt_len = prompt.len(), "generation request");
        match provider {
            Provider::Local => self.generate_local(model, prompt).await,
            Provider::Gemini => self.generate_gemini(model, prompt).await,
        }
    }

    async fn list_models(&self, provider: Provider) -> HubResult<Vec<ModelInfo>> {
        match provider {
            Provider::Local => {
                let res = self
                    .client
                    .get(self.local_url("models"))
                    .send()
                    .await
                    .map_err(|e| HubError::UpstreamGeneration(format!("connection to local model server failed: {e}")))?;
                let res = Self::check(res, "model listing").await?;
                let parsed: LocalModels = res.json().await?;
                Ok(parsed
                    .data
                    .into_iter()
                    .map(|m| ModelInfo {
                        name: m.id.clone(),
                        id: m.id,
                    })
                    .collect())
            }
            Provider::Gemini => {
                let key = self.gemini_key()?;
                let res = self
                    .client
                    .get(self.gemini_url("models"))
                    .query(&[("key", key.as_str())])
                    .send()
                    .await?;
                let res = Self::check(res, "gemini model listing").await?;
                let parsed: GeminiModels = res.json().await?;
                Ok(gemini_text_models(parsed.models))
            }
        }
    }
}

fn gemini_text_models(models: Vec<GeminiModel>) -> Vec<ModelInfo> {
    models
        .into_iter()
        .filter(|m| m.supported_generation_methods.iter().any(|s| s == "generateContent"))
        .map(|m| {
            let id = m.name.trim_start_matches("models/").to_string();
            ModelInfo {
                name: m.display_name.unwrap_or_else(|| id.clone()),
                id,
            }
        })
        .collect()
}
