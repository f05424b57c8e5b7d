//! Client for the hosted leaf-disease classifier.
//!
//! The model takes the raw image bytes as the request body and answers with a
//! JSON array of `{label, score}` objects sorted by descending score.

use std::time::Duration;

use actix_web::web::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::ModelConfig;
use crate::error::InferenceError;
use crate::models::{Prediction, UpstreamLabel};

/// Retries apply to transport failures only.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: reqwest::Client,
    url: String,
    token: String,
    retry: RetryPolicy,
}

impl InferenceClient {
    pub fn new(config: &ModelConfig) -> Result<Self, InferenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(InferenceError::Client)?;

        Ok(Self {
            http,
            url: config.url.clone(),
            token: config.token.clone(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff: config.backoff,
            },
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send the image to the model and return its top prediction.
    pub async fn classify(&self, image: Bytes) -> Result<Prediction, InferenceError> {
        let mut attempt = 0;
        loop {
            match self.send(image.clone()).await {
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay(attempt);
                    attempt += 1;
                    warn!(error = %e, attempt, ?delay, "retrying model request");
                    actix_rt::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }

    async fn send(&self, image: Bytes) -> Result<Prediction, InferenceError> {
        let response = self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "model API error");
            return Err(InferenceError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let value = match serde_json::from_str::<Value>(&body) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, body = %body, "model response is not JSON");
                return Err(InferenceError::InvalidResponse(Value::String(body)));
            }
        };

        let prediction = top_prediction(value)?;
        info!(label = %prediction.label, confidence = prediction.confidence, "model prediction");
        Ok(prediction)
    }
}

/// Pick the first entry of the model's ranked output.
pub fn top_prediction(value: Value) -> Result<Prediction, InferenceError> {
    let top = match value.as_array().and_then(|entries| entries.first()) {
        Some(top) => top.clone(),
        None => {
            error!(response = %value, "invalid model response");
            return Err(InferenceError::InvalidResponse(value));
        }
    };

    match serde_json::from_value::<UpstreamLabel>(top) {
        Ok(top) => Ok(top.into()),
        Err(e) => {
            error!(error = %e, response = %value, "model response entry has no label/score");
            Err(InferenceError::InvalidResponse(value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_entry_wins() {
        let prediction = top_prediction(json!([
            { "label": "Tomato_Late_Blight", "score": 0.9321 },
            { "label": "Tomato_Healthy", "score": 0.05 }
        ]))
        .unwrap();

        assert_eq!(prediction.label, "Tomato_Late_Blight");
        assert_eq!(prediction.confidence, 93.21);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let prediction =
            top_prediction(json!([{ "label": "Corn_Rust", "score": 0.5, "box": null }])).unwrap();
        assert_eq!(prediction.label, "Corn_Rust");
        assert_eq!(prediction.confidence, 50.0);
    }

    #[test]
    fn empty_array_is_invalid() {
        match top_prediction(json!([])) {
            Err(InferenceError::InvalidResponse(details)) => assert_eq!(details, json!([])),
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn object_is_invalid_and_kept_for_diagnostics() {
        let payload = json!({ "error": "Model is currently loading", "estimated_time": 20.0 });
        match top_prediction(payload.clone()) {
            Err(InferenceError::InvalidResponse(details)) => assert_eq!(details, payload),
            other => panic!("expected InvalidResponse, got {other:?}"),
        }
    }

    #[test]
    fn entry_without_score_is_invalid() {
        assert!(matches!(
            top_prediction(json!([{ "label": "Apple_Scab" }])),
            Err(InferenceError::InvalidResponse(_))
        ));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(0), Duration::from_millis(100));
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
    }
}
