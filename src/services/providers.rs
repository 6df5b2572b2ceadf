// AI Provider Service
// OpenAI-compatible chat completions backing the generator, refiner and
// analyzer capabilities

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::AnalysisResult;
use super::capabilities::{TextAnalyzer, TextGenerator};
use super::config_store::AppConfig;
use super::errors::{HumanizeError, HumanizeResult};
use super::llm_analyzer::parse_analysis;

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 120;
const GENERATION_MAX_TOKENS: i32 = 4096;
const ANALYSIS_MAX_TOKENS: i32 = 1024;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing content in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
    #[error("API key not configured")]
    MissingApiKey,
    #[error("No model assigned")]
    MissingModel,
}

impl From<ProviderError> for HumanizeError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::MissingApiKey | ProviderError::MissingModel => {
                HumanizeError::Validation(e.to_string())
            }
            ProviderError::HttpError(ref inner) if inner.is_timeout() => {
                HumanizeError::Timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            }
            other => HumanizeError::Provider(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

/// Parse `name:model` (model may be empty).
pub fn parse_provider(spec: &str) -> ProviderSpec {
    match spec.split_once(':') {
        Some((name, model)) => ProviderSpec {
            name: name.trim().to_string(),
            model: model.trim().to_string(),
        },
        None => ProviderSpec {
            name: spec.trim().to_string(),
            model: String::new(),
        },
    }
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: i32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<ChatChoice>>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageResponse>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    pub content: String,
    pub latency_ms: i64,
}

/// One configured chat endpoint: URL, model and credential.
pub struct ChatProvider {
    client: Client,
    name: String,
    url: String,
    model: Option<String>,
    api_key: Option<String>,
}

impl ChatProvider {
    pub fn new(name: &str, url: &str, model: Option<String>, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            name: name.to_string(),
            url: url.to_string(),
            model: model.filter(|m| !m.trim().is_empty()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Build from a `name[:model]` spec, resolving URL, model and key from
    /// the environment and the config file.
    pub fn from_config(spec: &str, config: &AppConfig) -> Self {
        let spec = parse_provider(spec);
        let entry = config.providers.get(&spec.name);
        let url_var = format!("{}_API_URL", spec.name.to_ascii_uppercase());
        let url = env::var(&url_var)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| entry.and_then(|p| p.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());
        let model = if spec.model.is_empty() {
            entry.and_then(|p| p.model.clone())
        } else {
            Some(spec.model)
        };
        let api_key = get_api_key(&spec.name, config);

        Self::new(&spec.name, &url, model, api_key)
    }

    fn credentials(&self) -> Result<(&str, &str), ProviderError> {
        let model = self.model.as_deref().ok_or(ProviderError::MissingModel)?;
        let api_key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        Ok((model, api_key))
    }

    pub async fn call_chat_api(
        &self,
        system: &str,
        user: &str,
        max_tokens: i32,
        temperature: f64,
        use_json_format: bool,
    ) -> Result<ChatResult, ProviderError> {
        let (model, api_key) = self.credentials()?;

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            max_tokens,
            temperature,
            response_format: if use_json_format {
                Some(ResponseFormat {
                    r#type: "json_object".to_string(),
                })
            } else {
                None
            },
        };

        let start = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let content = data
            .choices
            .and_then(|c| c.into_iter().next())
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::MissingContent)?;

        debug!(
            provider = %self.name,
            model = model,
            latency_ms = latency_ms,
            "[PROVIDER] chat completion ok"
        );

        Ok(ChatResult { content, latency_ms })
    }
}

#[async_trait]
impl TextGenerator for ChatProvider {
    async fn generate(&self, system: &str, user: &str, temperature: f64) -> HumanizeResult<String> {
        let result = self
            .call_chat_api(system, user, GENERATION_MAX_TOKENS, temperature, false)
            .await?;
        info!(
            provider = %self.name,
            latency_ms = result.latency_ms,
            chars = result.content.chars().count(),
            "[PROVIDER] generation complete"
        );
        Ok(result.content.trim().to_string())
    }

    fn model_id(&self) -> Option<String> {
        self.model.as_ref().map(|m| format!("{}:{}", self.name, m))
    }
}

#[async_trait]
impl TextAnalyzer for ChatProvider {
    async fn analyze(&self, system: &str, user: &str) -> HumanizeResult<AnalysisResult> {
        let result = self
            .call_chat_api(system, user, ANALYSIS_MAX_TOKENS, 0.0, true)
            .await?;
        parse_analysis(&result.content)
    }

    fn model_id(&self) -> Option<String> {
        self.model.as_ref().map(|m| format!("{}:{}", self.name, m))
    }
}

/// Get API key from environment or config
pub fn get_api_key(provider: &str, config: &AppConfig) -> Option<String> {
    let upper = provider.to_ascii_uppercase();
    let env_keys = [format!("{}_API_KEY", upper), format!("HUMANIZER_{}_API_KEY", upper)];

    for key in env_keys.iter() {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .api_keys
        .get(provider)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::config_store::ProviderConfig;

    #[test]
    fn test_parse_provider() {
        let spec = parse_provider("openai:gpt-4o-mini");
        assert_eq!(spec.name, "openai");
        assert_eq!(spec.model, "gpt-4o-mini");

        let spec2 = parse_provider("deepseek");
        assert_eq!(spec2.name, "deepseek");
        assert_eq!(spec2.model, "");
    }

    #[tokio::test]
    async fn test_missing_model_is_validation_error() {
        let provider = ChatProvider::new("openai", DEFAULT_CHAT_URL, None, Some("k".into()));
        let err = provider.generate("sys", "user", 0.7).await.unwrap_err();
        assert!(matches!(err, HumanizeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_missing_key_is_validation_error() {
        let provider = ChatProvider::new("openai", DEFAULT_CHAT_URL, Some("m".into()), Some("  ".into()));
        let err = TextAnalyzer::analyze(&provider, "sys", "user").await.unwrap_err();
        assert!(matches!(err, HumanizeError::Validation(_)));
    }

    #[test]
    fn test_from_config_uses_provider_entry() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "localtest".to_string(),
            ProviderConfig {
                model: Some("tiny".to_string()),
                base_url: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            },
        );
        config.api_keys.insert("localtest".to_string(), "secret".to_string());

        let provider = ChatProvider::from_config("localtest", &config);
        assert_eq!(TextGenerator::model_id(&provider).as_deref(), Some("localtest:tiny"));
        assert_eq!(provider.url, "http://127.0.0.1:9/v1/chat/completions");
        assert_eq!(provider.api_key.as_deref(), Some("secret"));

        let overridden = ChatProvider::from_config("localtest:big", &config);
        assert_eq!(TextGenerator::model_id(&overridden).as_deref(), Some("localtest:big"));
    }

    #[test]
    fn test_provider_error_mapping() {
        let e: HumanizeError = ProviderError::MissingModel.into();
        assert!(e.is_fatal());
        let e: HumanizeError = ProviderError::ApiError { status: 503, message: "busy".into() }.into();
        assert!(e.is_retryable());
    }
}
