// External Detector
// HTTP adapter for a third-party AI-text judge. Posts the text as JSON and
// reads back {success, message?, data: {fakePercentage, aiWords?, feedback?}}.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::ExternalJudgeResult;
use super::capabilities::{DetectionOutcome, ExternalDetector};
use super::config_store::AppConfig;
use super::errors::{HumanizeError, HumanizeResult};
use super::providers::get_api_key;

pub const DETECTOR_KEY_NAME: &str = "detector";
const DETECTOR_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<DetectData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectData {
    fake_percentage: f64,
    #[serde(default)]
    ai_words: Option<u32>,
    #[serde(default)]
    feedback: Option<String>,
}

pub struct HttpDetector {
    client: Client,
    url: Option<String>,
    api_key: Option<String>,
    min_chars: usize,
}

impl HttpDetector {
    pub fn new(url: Option<String>, api_key: Option<String>, min_chars: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DETECTOR_HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: url.filter(|u| !u.trim().is_empty()),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            min_chars,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let url = std::env::var("HUMANIZER_DETECTOR_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .or_else(|| config.detector.url.clone());
        Self::new(url, get_api_key(DETECTOR_KEY_NAME, config), config.detector.min_chars)
    }

    /// Returns the endpoint and key when the judge can run on `text`.
    fn applicable(&self, text: &str) -> Option<(&str, &str)> {
        if text.trim().chars().count() < self.min_chars {
            return None;
        }
        Some((self.url.as_deref()?, self.api_key.as_deref()?))
    }
}

/// Map a decoded response body onto the detection outcome.
fn interpret(response: DetectResponse) -> HumanizeResult<DetectionOutcome> {
    if !response.success {
        let message = response
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "detector reported failure".to_string());
        return Ok(DetectionOutcome::Rejected(message));
    }

    let data = response
        .data
        .ok_or_else(|| HumanizeError::Parse("detector response missing data".to_string()))?;
    if !data.fake_percentage.is_finite() {
        return Err(HumanizeError::Parse("fakePercentage is not a number".to_string()));
    }

    Ok(DetectionOutcome::Judged(ExternalJudgeResult {
        fake_percentage: data.fake_percentage.clamp(0.0, 100.0),
        ai_words: data.ai_words,
        feedback: data.feedback.filter(|f| !f.trim().is_empty()),
    }))
}

#[async_trait]
impl ExternalDetector for HttpDetector {
    async fn detect(&self, text: &str) -> HumanizeResult<DetectionOutcome> {
        let Some((url, api_key)) = self.applicable(text) else {
            debug!("[DETECTOR] skipped: input too short or detector not configured");
            return Ok(DetectionOutcome::NotApplicable);
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&DetectRequest { text })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    HumanizeError::Timeout(Duration::from_secs(DETECTOR_HTTP_TIMEOUT_SECS))
                } else {
                    HumanizeError::Provider(format!("detector request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "[DETECTOR] HTTP error");
            return Err(HumanizeError::Provider(format!(
                "detector HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let body: DetectResponse = response
            .json()
            .await
            .map_err(|e| HumanizeError::Parse(format!("detector JSON error: {}", e)))?;

        let outcome = interpret(body)?;
        if let DetectionOutcome::Judged(ref judged) = outcome {
            info!(
                fake_percentage = judged.fake_percentage,
                ai_words = judged.ai_words.unwrap_or(0),
                "[DETECTOR] judged"
            );
        }
        Ok(outcome)
    }

    fn source_id(&self) -> Option<String> {
        self.url.clone()
    }
}
