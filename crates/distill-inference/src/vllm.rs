//! vLLM client over its OpenAI-compatible HTTP API.
//!
//! - `GET  /v1/models`      startup health check
//! - `POST /v1/completions` one request per prompt; vLLM batches concurrent
//!   requests internally, so [`InferenceEngine::generate_batch`] simply issues
//!   them together
//! - `POST /tokenize`       token counts with the served model's tokenizer

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::{Generation, InferenceEngine, SamplingConfig};
use crate::error::InferenceError;
use crate::http::check_response;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(flatten)]
    sampling: &'a SamplingConfig,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Serialize)]
struct TokenizeRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    add_special_tokens: bool,
}

#[derive(Deserialize)]
struct TokenizeResponse {
    count: u64,
}

#[derive(Deserialize)]
struct ModelList {
    data: Vec<ModelCard>,
}

#[derive(Deserialize)]
struct ModelCard {
    id: String,
    #[serde(default)]
    max_model_len: Option<u32>,
}

/// A model as reported by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedModel {
    pub id: String,
    pub max_model_len: Option<u32>,
}

pub struct VllmEngine {
    http: reqwest::Client,
    base_url: String,
    model: String,
}

impl VllmEngine {
    /// # Errors
    ///
    /// Returns [`InferenceError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .user_agent("distill/0.1")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    /// Confirm the server is up and report what it serves.
    ///
    /// Warns if the configured model is not among the served models.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Unavailable`] if the server cannot be reached
    /// or answers with an error.
    pub async fn health_check(&self) -> Result<Vec<ServedModel>, InferenceError> {
        let url = format!("{}/v1/models", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable(format!("{url}: {e}")))?;
        let resp = check_response(resp)
            .await
            .map_err(|e| InferenceError::Unavailable(e.to_string()))?;
        let list: ModelList = resp
            .json()
            .await
            .map_err(|e| InferenceError::Parse(format!("model list: {e}")))?;

        let served: Vec<ServedModel> = list
            .data
            .into_iter()
            .map(|card| ServedModel {
                id: card.id,
                max_model_len: card.max_model_len,
            })
            .collect();
        if !served.iter().any(|m| m.id == self.model) {
            tracing::warn!(
                model = %self.model,
                served = ?served.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
                "configured model not listed by the server"
            );
        }
        Ok(served)
    }
}

#[async_trait]
impl InferenceEngine for VllmEngine {
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<Generation, InferenceError> {
        let url = format!("{}/v1/completions", self.base_url);
        let body = CompletionRequest {
            model: &self.model,
            prompt,
            sampling,
        };

        let started = Instant::now();
        let resp = check_response(self.http.post(&url).json(&body).send().await?).await?;
        let data: CompletionResponse = resp.json().await?;
        let latency = started.elapsed();

        parse_completion(data, latency)
    }

    async fn count_tokens(&self, text: &str) -> Result<u64, InferenceError> {
        let url = format!("{}/tokenize", self.base_url);
        let body = TokenizeRequest {
            model: &self.model,
            prompt: text,
            add_special_tokens: false,
        };
        let resp = check_response(self.http.post(&url).json(&body).send().await?).await?;
        let data: TokenizeResponse = resp.json().await?;
        Ok(data.count)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_completion(data: CompletionResponse, latency: Duration) -> Result<Generation, InferenceError> {
    let choice = data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| InferenceError::Parse("completion without choices".into()))?;
    let (prompt_tokens, completion_tokens) = data
        .usage
        .map_or((0, 0), |u| (u.prompt_tokens, u.completion_tokens));
    Ok(Generation {
        text: choice.text,
        prompt_tokens,
        completion_tokens,
        latency,
    })
}
