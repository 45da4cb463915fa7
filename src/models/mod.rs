// ContextType Data Models
// Fixed label set, detection results, training samples and boundary payloads

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::services::errors::DetectionError;

// Re-export the evaluation report so boundary payloads can carry it
pub use crate::services::detection::classifier::{ClassificationReport, ContextMetrics};

// ============ Context ============

/// Writing context. Closed set; declaration order is the tie-break order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Context {
    Code,
    Email,
    Chat,
}

impl Context {
    pub const ALL: [Context; 3] = [Context::Code, Context::Email, Context::Chat];

    pub fn as_str(&self) -> &'static str {
        match self {
            Context::Code => "code",
            Context::Email => "email",
            Context::Chat => "chat",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Context::Code => 0,
            Context::Email => 1,
            Context::Chat => 2,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Context {
    type Err = DetectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "code" => Ok(Context::Code),
            "email" => Ok(Context::Email),
            "chat" => Ok(Context::Chat),
            other => Err(DetectionError::Validation(format!(
                "Invalid label '{}'. Must be one of: code, email, chat",
                other
            ))),
        }
    }
}

// ============ Distributions ============

/// One value per context. Produced by either scorer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ContextScores {
    pub code: f64,
    pub email: f64,
    pub chat: f64,
}

impl ContextScores {
    pub fn new(code: f64, email: f64, chat: f64) -> Self {
        Self { code, email, chat }
    }

    pub fn get(&self, context: Context) -> f64 {
        match context {
            Context::Code => self.code,
            Context::Email => self.email,
            Context::Chat => self.chat,
        }
    }

    pub fn set(&mut self, context: Context, value: f64) {
        match context {
            Context::Code => self.code = value,
            Context::Email => self.email = value,
            Context::Chat => self.chat = value,
        }
    }

    pub fn total(&self) -> f64 {
        self.code + self.email + self.chat
    }

    /// Entries in tie-break order.
    pub fn iter(&self) -> impl Iterator<Item = (Context, f64)> + '_ {
        Context::ALL.iter().map(move |c| (*c, self.get(*c)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[serde(rename = "rule-based")]
    RuleBased,
    #[serde(rename = "statistical")]
    Statistical,
}

impl DetectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionMethod::RuleBased => "rule-based",
            DetectionMethod::Statistical => "statistical",
        }
    }
}

impl fmt::Display for DetectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContextPrediction {
    pub context: Context,
    pub confidence: f64,
}

/// Ranked outcome of one detect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub primary: Context,
    pub confidence: f64,
    /// The two non-primary contexts, highest confidence first.
    pub alternatives: [ContextPrediction; 2],
    pub method: DetectionMethod,
}

// ============ Training ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub text: String,
    pub label: Context,
}

impl TrainingSample {
    pub fn new(text: impl Into<String>, label: Context) -> Self {
        Self {
            text: text.into(),
            label,
        }
    }
}

/// Training sample as received from a caller; label not yet validated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabeledSample {
    pub text: String,
    pub label: String,
}

impl TryFrom<&LabeledSample> for TrainingSample {
    type Error = DetectionError;

    fn try_from(sample: &LabeledSample) -> Result<Self, Self::Error> {
        Ok(TrainingSample {
            text: sample.text.clone(),
            label: sample.label.parse()?,
        })
    }
}

// ============ Boundary Payloads ============

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    pub text: String,
    #[serde(default)]
    pub previous_context: Option<String>,
    #[serde(default = "default_true")]
    pub use_ml: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub context: Context,
    pub confidence: f64,
    pub detection_id: String,
    pub timestamp: String,
    pub method: DetectionMethod,
    pub alternative_contexts: Vec<ContextPrediction>,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    pub samples: Vec<LabeledSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainResponse {
    pub status: String,
    pub samples_trained: usize,
    pub accuracy: f64,
    pub feature_count: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_accuracy: Option<f64>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub accuracy: f64,
    pub is_trained: bool,
    pub feature_count: usize,
    pub classes: Vec<Context>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ClassificationReport>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadResponse {
    pub loaded: bool,
    pub accuracy: Option<f64>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_labels_roundtrip_through_str() {
        for ctx in Context::ALL {
            assert_eq!(ctx.as_str().parse::<Context>().unwrap(), ctx);
        }
    }

    #[test]
    fn test_unknown_label_is_validation_error() {
        let err = "Code".parse::<Context>().unwrap_err();
        assert!(matches!(err, DetectionError::Validation(_)));
        assert!("spam".parse::<Context>().is_err());
    }

    #[test]
    fn test_method_serializes_with_wire_names() {
        let json = serde_json::to_string(&DetectionMethod::RuleBased).unwrap();
        assert_eq!(json, "\"rule-based\"");
        let json = serde_json::to_string(&DetectionMethod::Statistical).unwrap();
        assert_eq!(json, "\"statistical\"");
    }

    #[test]
    fn test_detect_request_defaults_to_ml() {
        let req: DetectRequest = serde_json::from_str(r#"{"text": "hello there friend"}"#).unwrap();
        assert!(req.use_ml);
        assert!(req.previous_context.is_none());
    }

    #[test]
    fn test_scores_iterate_in_tie_break_order() {
        let scores = ContextScores::new(0.1, 0.2, 0.7);
        let order: Vec<Context> = scores.iter().map(|(c, _)| c).collect();
        assert_eq!(order, vec![Context::Code, Context::Email, Context::Chat]);
        assert!((scores.total() - 1.0).abs() < 1e-12);
    }
}
