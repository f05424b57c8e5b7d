use serde::{Deserialize, Serialize};

/// One ranked entry returned by the hosted classifier.
#[derive(Debug, Deserialize)]
pub struct UpstreamLabel {
    pub label: String,
    pub score: f64,
}

/// The top prediction, with confidence as a percentage rounded to two places.
#[derive(Debug)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
}

impl From<UpstreamLabel> for Prediction {
    fn from(top: UpstreamLabel) -> Self {
        Self {
            label: top.label,
            confidence: (top.score * 100.0 * 100.0).round() / 100.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: String,
    pub confidence: String,
}

impl From<Prediction> for PredictionResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            prediction: prediction.label,
            confidence: format!("{:.2}", prediction.confidence),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
