// Service API
// The callable boundary a transport would wrap: detect, train, health, metrics
// Scoring and fitting are CPU-bound and run on tokio's blocking pool.

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    Context, DetectRequest, DetectResponse, HealthResponse, LoadResponse, MetricsResponse,
    TrainRequest, TrainResponse,
};
use crate::services::artifact_store::{ArtifactStore, FileArtifactStore};
use crate::services::config_store::AppConfig;
use crate::services::detection::{DetectionEngine, StatisticalClassifier, Trainer};
use crate::services::errors::{DetectionError, Result};

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn join_failed(e: tokio::task::JoinError) -> DetectionError {
    DetectionError::DetectionFailed(e.into())
}

pub struct ContextService {
    config: AppConfig,
    classifier: Arc<StatisticalClassifier>,
    engine: Arc<DetectionEngine>,
    trainer: Arc<Trainer>,
}

impl ContextService {
    pub fn new(config: AppConfig, store: Arc<dyn ArtifactStore>) -> Self {
        let classifier = Arc::new(StatisticalClassifier::new(config.model.classifier_params()));
        let engine = Arc::new(DetectionEngine::new(Arc::clone(&classifier)));
        let trainer = Arc::new(
            Trainer::new(Arc::clone(&classifier), store, config.model.artifact_key.clone())
                .with_min_samples(config.training.min_samples),
        );
        Self {
            config,
            classifier,
            engine,
            trainer,
        }
    }

    /// Artifacts go to the configured model directory.
    pub fn from_config(config: AppConfig) -> Self {
        let store = Arc::new(FileArtifactStore::new(config.model.model_dir()));
        Self::new(config, store)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Arc<StatisticalClassifier> {
        &self.classifier
    }

    pub async fn detect(&self, request: DetectRequest) -> Result<DetectResponse> {
        let start = Instant::now();
        let min_len = self.config.detection.min_text_length;
        if request.text.chars().count() < min_len {
            return Err(DetectionError::validation(format!(
                "Text must be at least {} characters",
                min_len
            )));
        }
        if let Some(previous) = request.previous_context.as_deref() {
            debug!("[ENGINE] Previous context hint: {}", previous);
        }

        let use_statistical = request.use_ml && self.config.detection.use_statistical;
        let engine = Arc::clone(&self.engine);
        let text = request.text;
        let result = tokio::task::spawn_blocking(move || engine.detect(&text, use_statistical))
            .await
            .map_err(join_failed)??;

        let processing_time_ms = start.elapsed().as_secs_f64() * 1000.0;
        info!(
            "[ENGINE] Detected {} ({:.3}) via {} in {:.2}ms",
            result.primary, result.confidence, result.method, processing_time_ms
        );

        Ok(DetectResponse {
            context: result.primary,
            confidence: result.confidence,
            detection_id: Uuid::new_v4().to_string(),
            timestamp: now_rfc3339(),
            method: result.method,
            alternative_contexts: result.alternatives.to_vec(),
            processing_time_ms,
        })
    }

    pub async fn train(&self, request: TrainRequest) -> Result<TrainResponse> {
        let trainer = Arc::clone(&self.trainer);
        let samples = request.samples;
        let outcome = tokio::task::spawn_blocking(move || trainer.train(&samples))
            .await
            .map_err(join_failed)??;

        Ok(TrainResponse {
            status: "success".to_string(),
            samples_trained: outcome.samples_trained,
            accuracy: outcome.accuracy,
            feature_count: outcome.feature_count,
            timestamp: now_rfc3339(),
        })
    }

    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            model_loaded: self.classifier.is_trained(),
            model_accuracy: self.classifier.accuracy(),
            timestamp: now_rfc3339(),
        }
    }

    pub fn metrics(&self) -> Result<MetricsResponse> {
        let artifact = self.classifier.current().ok_or(DetectionError::UntrainedModel)?;
        Ok(MetricsResponse {
            accuracy: artifact.accuracy,
            is_trained: true,
            feature_count: artifact.vectorizer.feature_count(),
            classes: Context::ALL.to_vec(),
            report: Some(artifact.report.clone()),
            timestamp: now_rfc3339(),
        })
    }

    /// Restore the persisted artifact, if one exists.
    pub async fn load_pretrained(&self) -> Result<LoadResponse> {
        let trainer = Arc::clone(&self.trainer);
        let loaded = tokio::task::spawn_blocking(move || trainer.load())
            .await
            .map_err(join_failed)??;

        let accuracy = self.classifier.accuracy();
        let message = if loaded {
            format!("Model loaded from {}", self.describe_artifact())
        } else {
            format!("No saved model at {}", self.describe_artifact())
        };
        info!("[TRAINER] {}", message);
        Ok(LoadResponse {
            loaded,
            accuracy: if loaded { accuracy } else { None },
            message,
        })
    }

    /// Like `load_pretrained`, but an unreadable artifact is logged and
    /// reported as not loaded; detection then runs on the rules.
    pub async fn load_pretrained_or_rules(&self) -> LoadResponse {
        match self.load_pretrained().await {
            Ok(response) => response,
            Err(e) => {
                warn!("[TRAINER] Saved model unusable, continuing rule-based: {}", e);
                LoadResponse {
                    loaded: false,
                    accuracy: None,
                    message: format!("Saved model unusable ({}), using rules", e),
                }
            }
        }
    }

    fn describe_artifact(&self) -> String {
        self.trainer.store().describe(self.trainer.artifact_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DetectionMethod, LabeledSample};
    use crate::services::artifact_store::MemoryArtifactStore;

    fn service() -> (ContextService, Arc<MemoryArtifactStore>) {
        let store = Arc::new(MemoryArtifactStore::new());
        (ContextService::new(AppConfig::default(), store.clone()), store)
    }

    fn request(text: &str) -> DetectRequest {
        DetectRequest {
            text: text.to_string(),
            previous_context: None,
            use_ml: true,
        }
    }

    fn samples() -> Vec<LabeledSample> {
        let rows = [
            ("function add(a, b) { return a + b; }", "code"),
            ("const x = items.map((i) => i * 2);", "code"),
            ("def main(): return parse(line)", "code"),
            ("for (let i = 0; i < n; i++) { sum += i; }", "code"),
            ("Dear John, please find the report attached. Best regards, Anna", "email"),
            ("Dear team, the meeting moved to Monday. Kind regards, Paul", "email"),
            ("Hello Maria, thank you for your reply. Best regards, Tom", "email"),
            ("Dear Sir, please confirm the meeting. Sincerely, Mark", "email"),
            ("omg that's so cool lol", "chat"),
            ("lol btw are you coming tonight", "chat"),
            ("haha omg no way lol", "chat"),
            ("brb grabbing food lol haha", "chat"),
        ];
        rows.iter()
            .map(|(text, label)| LabeledSample {
                text: text.to_string(),
                label: label.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_detect_rejects_short_text() {
        let (svc, _) = service();
        let err = svc.detect(request("hi")).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_detect_untrained_uses_rules() {
        let (svc, _) = service();
        let mut req = request("Dear John, I hope this email finds you well. Best regards, Sarah");
        req.previous_context = Some("chat".to_string());
        let resp = svc.detect(req).await.unwrap();
        assert_eq!(resp.context, Context::Email);
        assert_eq!(resp.method, DetectionMethod::RuleBased);
        assert_eq!(resp.alternative_contexts.len(), 2);
        assert!(Uuid::parse_str(&resp.detection_id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&resp.timestamp).is_ok());
        assert!(resp.processing_time_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_train_then_detect_statistically() {
        let (svc, store) = service();
        let resp = svc.train(TrainRequest { samples: samples() }).await.unwrap();
        assert_eq!(resp.status, "success");
        assert_eq!(resp.samples_trained, 12);
        assert!((0.0..=1.0).contains(&resp.accuracy));
        assert!(store.exists("context_model"));

        let detected = svc.detect(request("lol omg haha so cool")).await.unwrap();
        assert_eq!(detected.method, DetectionMethod::Statistical);

        let mut forced = request("lol omg haha so cool");
        forced.use_ml = false;
        assert_eq!(svc.detect(forced).await.unwrap().method, DetectionMethod::RuleBased);
    }

    #[tokio::test]
    async fn test_train_validation_errors() {
        let (svc, _) = service();
        let few = TrainRequest {
            samples: samples().into_iter().take(5).collect(),
        };
        assert!(svc.train(few).await.unwrap_err().is_validation());

        let mut bad = samples();
        bad[0].label = "Code".to_string();
        assert!(svc.train(TrainRequest { samples: bad }).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn test_health_and_metrics() {
        let (svc, _) = service();
        let health = svc.health();
        assert_eq!(health.status, "healthy");
        assert!(!health.model_loaded);
        assert!(health.model_accuracy.is_none());
        assert!(matches!(svc.metrics(), Err(DetectionError::UntrainedModel)));

        svc.train(TrainRequest { samples: samples() }).await.unwrap();
        let metrics = svc.metrics().unwrap();
        assert!(metrics.is_trained);
        assert!(metrics.feature_count > 0);
        assert_eq!(metrics.classes, Context::ALL.to_vec());
        assert!(metrics.report.is_some());
        assert!(svc.health().model_loaded);
    }

    #[tokio::test]
    async fn test_load_pretrained() {
        let (svc, store) = service();
        let missing = svc.load_pretrained().await.unwrap();
        assert!(!missing.loaded);
        assert!(missing.accuracy.is_none());

        svc.train(TrainRequest { samples: samples() }).await.unwrap();
        let fresh = ContextService::new(AppConfig::default(), store.clone());
        let loaded = fresh.load_pretrained().await.unwrap();
        assert!(loaded.loaded);
        assert_eq!(loaded.accuracy, svc.classifier().accuracy());

        store.put("context_model", b"{not json").unwrap();
        assert!(matches!(
            fresh.load_pretrained().await,
            Err(DetectionError::Storage(_))
        ));
        assert!(!fresh.health().model_loaded);
    }

    #[tokio::test]
    async fn test_corrupt_artifact_degrades_to_rules() {
        let (svc, store) = service();
        store.put("context_model", b"{not json").unwrap();

        let load = svc.load_pretrained_or_rules().await;
        assert!(!load.loaded);
        assert!(load.accuracy.is_none());

        let resp = svc.detect(request("omg that's so cool! lol 😊")).await.unwrap();
        assert_eq!(resp.method, DetectionMethod::RuleBased);
        assert_eq!(resp.context, Context::Chat);
    }
}
