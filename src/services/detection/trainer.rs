// Training Pipeline
// Validates labeled samples, fits a replacement artifact and persists it
// before it becomes the one served to detection calls.

use std::sync::Arc;
use tracing::info;

use super::classifier::StatisticalClassifier;
use crate::models::{LabeledSample, TrainingSample};
use crate::services::artifact_store::ArtifactStore;
use crate::services::errors::{DetectionError, Result};

pub const DEFAULT_MIN_SAMPLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOutcome {
    pub accuracy: f64,
    pub samples_trained: usize,
    pub feature_count: usize,
}

pub struct Trainer {
    classifier: Arc<StatisticalClassifier>,
    store: Arc<dyn ArtifactStore>,
    artifact_key: String,
    min_samples: usize,
}

impl Trainer {
    pub fn new(
        classifier: Arc<StatisticalClassifier>,
        store: Arc<dyn ArtifactStore>,
        artifact_key: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            store,
            artifact_key: artifact_key.into(),
            min_samples: DEFAULT_MIN_SAMPLES,
        }
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    pub fn artifact_key(&self) -> &str {
        &self.artifact_key
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    /// Parse wire labels; the first bad sample rejects the whole batch.
    pub fn validate(&self, samples: &[LabeledSample]) -> Result<Vec<TrainingSample>> {
        self.check_count(samples.len())?;
        samples
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                TrainingSample::try_from(raw).map_err(|e| match e {
                    DetectionError::Validation(msg) => {
                        DetectionError::validation(format!("sample {}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }

    pub fn train(&self, samples: &[LabeledSample]) -> Result<TrainingOutcome> {
        let parsed = self.validate(samples)?;
        self.train_samples(&parsed)
    }

    pub fn train_samples(&self, samples: &[TrainingSample]) -> Result<TrainingOutcome> {
        self.check_count(samples.len())?;
        if let Some(i) = samples.iter().position(|s| s.text.trim().is_empty()) {
            return Err(DetectionError::validation(format!("sample {} has empty text", i)));
        }

        info!("[TRAINER] Training on {} samples", samples.len());
        let artifact = self.classifier.fit_and_commit(samples, |artifact| {
            self.store.put(&self.artifact_key, &artifact.to_bytes()?)?;
            Ok(())
        })?;

        info!(
            "[TRAINER] Saved '{}' to {} (accuracy {:.3})",
            self.artifact_key,
            self.store.describe(&self.artifact_key),
            artifact.accuracy
        );
        Ok(TrainingOutcome {
            accuracy: artifact.accuracy,
            samples_trained: samples.len(),
            feature_count: artifact.vectorizer.feature_count(),
        })
    }

    /// Restore the last persisted artifact, if any.
    pub fn load(&self) -> Result<bool> {
        self.classifier.load(self.store.as_ref(), &self.artifact_key)
    }

    fn check_count(&self, count: usize) -> Result<()> {
        if count < self.min_samples {
            return Err(DetectionError::validation(format!(
                "Need at least {} samples to train, got {}",
                self.min_samples, count
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Context;
    use crate::services::artifact_store::MemoryArtifactStore;
    use crate::services::detection::fixtures::corpus;

    fn trainer() -> (Trainer, Arc<StatisticalClassifier>, Arc<MemoryArtifactStore>) {
        let classifier = Arc::new(StatisticalClassifier::default());
        let store = Arc::new(MemoryArtifactStore::new());
        let trainer = Trainer::new(Arc::clone(&classifier), store.clone(), "context_model");
        (trainer, classifier, store)
    }

    fn labeled(samples: &[TrainingSample]) -> Vec<LabeledSample> {
        samples
            .iter()
            .map(|s| LabeledSample {
                text: s.text.clone(),
                label: s.label.as_str().to_string(),
            })
            .collect()
    }

    #[test]
    fn test_too_few_samples_rejected() {
        let (trainer, classifier, store) = trainer();
        let five = labeled(&corpus()[..5]);
        let err = trainer.train(&five).unwrap_err();
        assert!(err.is_validation());
        assert!(!classifier.is_trained());
        assert!(!store.exists("context_model"));
    }

    #[test]
    fn test_ten_samples_train_and_persist() {
        let (trainer, classifier, store) = trainer();
        let mut picked = Vec::new();
        for ctx in Context::ALL {
            picked.extend(corpus().into_iter().filter(|s| s.label == ctx).take(4));
        }
        picked.truncate(10);

        let outcome = trainer.train(&labeled(&picked)).unwrap();
        assert!((0.0..=1.0).contains(&outcome.accuracy));
        assert_eq!(outcome.samples_trained, 10);
        assert_eq!(outcome.feature_count, classifier.feature_count());
        assert!(classifier.is_trained());
        assert!(store.exists("context_model"));
    }

    #[test]
    fn test_unknown_label_rejected() {
        let (trainer, classifier, _) = trainer();
        let mut samples = labeled(&corpus());
        samples[3].label = "tweet".to_string();
        let err = trainer.train(&samples).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("sample 3"));
        assert!(!classifier.is_trained());
    }

    #[test]
    fn test_empty_text_rejected() {
        let (trainer, _, _) = trainer();
        let mut samples = corpus();
        samples[0].text = "   ".to_string();
        assert!(trainer.train_samples(&samples).unwrap_err().is_validation());
    }

    #[test]
    fn test_load_restores_persisted_artifact() {
        let (trainer, _, store) = trainer();
        trainer.train_samples(&corpus()).unwrap();

        let fresh = Arc::new(StatisticalClassifier::default());
        let reloader = Trainer::new(Arc::clone(&fresh), store, "context_model");
        assert!(reloader.load().unwrap());
        assert!(fresh.is_trained());

        let (empty, _, _) = self::trainer();
        assert!(!empty.load().unwrap());
    }

    #[test]
    fn test_custom_min_samples() {
        let (trainer, _, _) = trainer();
        let trainer = trainer.with_min_samples(30);
        assert!(trainer.train_samples(&corpus()).unwrap_err().is_validation());
    }
}
