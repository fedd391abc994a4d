use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CommonError;

#[derive(Clone, Debug)]
pub struct OllamaClientConfig {
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub probe_timeout: Duration,
    pub temperature: f32,
    pub num_predict: u32,
    pub top_k: u32,
    pub top_p: f32,
}

impl Default for OllamaClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b-instruct-q4_0".to_string(),
            timeout: Duration::from_secs(180),
            probe_timeout: Duration::from_secs(5),
            temperature: 0.1,
            num_predict: 2048,
            top_k: 10,
            top_p: 0.9,
        }
    }
}

impl OllamaClientConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let base_url = std::env::var("OLLAMA_URL").unwrap_or(defaults.base_url);
        let model = std::env::var("OLLAMA_MODEL").unwrap_or(defaults.model);

        let timeout = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        let probe_timeout = std::env::var("OLLAMA_PROBE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.probe_timeout);

        let temperature = std::env::var("OLLAMA_TEMPERATURE")
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .unwrap_or(defaults.temperature);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            probe_timeout,
            temperature,
            ..defaults
        }
    }
}

/// A text-generation backend that is asked for JSON-shaped output.
pub trait InferenceBackend {
    /// Model identifier, part of any cache key derived from a generation.
    fn model_name(&self) -> &str;

    fn endpoint(&self) -> &str;

    /// Cheap reachability check, used to short-circuit before a long generation call.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Run one non-streaming generation. `temperature` overrides the configured default.
    fn generate(
        &self,
        prompt: &str,
        temperature: Option<f32>,
    ) -> impl Future<Output = Result<String, CommonError>> + Send;
}

#[derive(Clone)]
pub struct OllamaClient {
    config: OllamaClientConfig,
    http: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaClientConfig) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("medium-checker/ollama")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &OllamaClientConfig {
        &self.config
    }

    fn generate_request<'a>(&'a self, prompt: &'a str, temperature: Option<f32>) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            format: "json",
            options: GenerateOptions {
                temperature: temperature.unwrap_or(self.config.temperature),
                num_predict: self.config.num_predict,
                top_k: self.config.top_k,
                top_p: self.config.top_p,
            },
        }
    }
}

impl InferenceBackend for OllamaClient {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> &str {
        &self.config.base_url
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.config.base_url);
        match self
            .http
            .get(&url)
            .timeout(self.config.probe_timeout)
            .send()
            .await
        {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                warn!(error = %e, base_url = %self.config.base_url, "ollama probe failed");
                false
            }
        }
    }

    async fn generate(&self, prompt: &str, temperature: Option<f32>) -> Result<String, CommonError> {
        let url = format!("{}/api/generate", self.config.base_url);
        let request = self.generate_request(prompt, temperature);
        let started = Instant::now();

        let resp = self
            .http
            .post(&url)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(CommonError::ModelConnection)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CommonError::ModelBackend {
                status: status.as_u16(),
            });
        }

        let body = resp
            .json::<GenerateResponse>()
            .await
            .map_err(|e| CommonError::ModelUnknown(e.to_string()))?;

        info!(
            model = %self.config.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_chars = body.response.chars().count(),
            done = body.done,
            "ollama generation finished"
        );
        Ok(body.response)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    format: &'static str,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
    top_k: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}
