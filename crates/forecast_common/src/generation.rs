//! Generation backend abstraction.
//!
//! Both the explanation generator and the feature-importance visualizer talk to
//! a text-generation model server through [`GenerationBackend`]. The HTTP
//! implementation speaks the Ollama `/api/generate` protocol or the
//! OpenAI-compatible chat completions protocol; [`FakeGenerationBackend`]
//! returns scripted responses for tests.

use crate::config::{GenerationApi, GenerationConfig};
use crate::error::GenerationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Generic generation backend returning a JSON object.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Call the model with a prompt and expect a JSON object matching `schema_description`.
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_description: &str,
    ) -> Result<Value, GenerationError>;
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    stream: bool,
    format: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String,
}

/// HTTP generation backend.
pub struct HttpGenerationBackend {
    config: GenerationConfig,
    client: reqwest::Client,
}

impl HttpGenerationBackend {
    pub fn new(config: GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, e: reqwest::Error) -> GenerationError {
        if e.is_timeout() {
            GenerationError::Timeout(self.config.timeout_secs)
        } else {
            GenerationError::Http(format!("Request failed: {}", e))
        }
    }

    async fn call_ollama(&self, system_prompt: &str, prompt: &str) -> Result<Value, GenerationError> {
        let request = OllamaRequest {
            model: &self.config.model,
            prompt,
            system: system_prompt,
            stream: false,
            format: "json",
        };

        let response = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(GenerationError::Http(format!(
                "HTTP {} from Ollama",
                response.status()
            )));
        }

        let body: OllamaResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        debug!("Ollama response length: {}", body.response.len());
        parse_model_output(&body.response)
    }

    async fn call_openai_compatible(
        &self,
        system_prompt: &str,
        prompt: &str,
    ) -> Result<Value, GenerationError> {
        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": system_prompt},
                {"role": "user", "content": prompt},
            ],
            "response_format": {"type": "json_object"},
        });

        let mut request = self
            .client
            .post(self.url("/v1/chat/completions"))
            .json(&request_body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;

        if !response.status().is_success() {
            return Err(GenerationError::Http(format!(
                "HTTP {} from OpenAI-compatible API",
                response.status()
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidJson(format!("Failed to parse response: {}", e)))?;

        let text = response_json
            .get("choices")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("message"))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.as_str())
            .ok_or(GenerationError::EmptyResponse)?;

        parse_model_output(text)
    }
}

#[async_trait]
impl GenerationBackend for HttpGenerationBackend {
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema_description: &str,
    ) -> Result<Value, GenerationError> {
        let full_prompt = format!(
            "{}\n\nYou must respond with valid JSON matching this schema:\n{}",
            user_prompt, schema_description
        );
        debug!(model = %self.config.model, "Calling generation backend");

        match self.config.api {
            GenerationApi::Ollama => self.call_ollama(system_prompt, &full_prompt).await,
            GenerationApi::OpenAi => self.call_openai_compatible(system_prompt, &full_prompt).await,
        }
    }
}

/// Parse model text into a JSON object, tolerating surrounding prose or fences.
pub fn parse_model_output(text: &str) -> Result<Value, GenerationError> {
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    let json_str = extract_json(text);
    let value: Value = serde_json::from_str(json_str)
        .map_err(|e| GenerationError::InvalidJson(format!("Model output is not valid JSON: {}", e)))?;
    if !value.is_object() {
        return Err(GenerationError::InvalidJson(
            "Model output is not a JSON object".to_string(),
        ));
    }
    Ok(value)
}

/// Outermost `{...}` block of `response`, or the whole string if there is none.
fn extract_json(response: &str) -> &str {
    match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if end > start => &response[start..=end],
        _ => response.trim(),
    }
}

/// Scripted generation backend for tests.
///
/// Responses are handed out in order and the last one repeats forever. An
/// empty script fails every call with `EmptyResponse`.
pub struct FakeGenerationBackend {
    responses: Mutex<Vec<Result<Value, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerationBackend {
    pub fn new(responses: Vec<Result<Value, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn always_valid(json: Value) -> Self {
        Self::new(vec![Ok(json)])
    }

    pub fn always_error(error: GenerationError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// User prompts received so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerationBackend for FakeGenerationBackend {
    async fn generate_json(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _schema_description: &str,
    ) -> Result<Value, GenerationError> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());

        let mut responses = self.responses.lock().unwrap();
        match responses.len() {
            0 => Err(GenerationError::EmptyResponse),
            1 => responses[0].clone(),
            _ => responses.remove(0),
        }
    }
}
