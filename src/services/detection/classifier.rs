// Statistical Classifier
// TF-IDF features + multinomial naive Bayes, trained from labeled samples
//
// The trained state lives in a single `ClassifierArtifact` behind an `Arc`.
// Training and loading build a complete replacement and swap the pointer, so a
// prediction in flight always sees one whole artifact. Fit and load serialize
// on a separate lifecycle lock and never hold the slot lock while working.

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::vectorizer::{SparseVector, TfidfVectorizer, VectorizerParams};
use crate::models::{Context, ContextScores, TrainingSample};
use crate::services::artifact_store::ArtifactStore;
use crate::services::errors::{DetectionError, Result, StorageError};
use crate::services::text_processor::preprocess;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    pub vectorizer: VectorizerParams,
    /// Additive smoothing; must be positive.
    pub alpha: f64,
    /// Share of each context held out for evaluation.
    pub test_size: f64,
    pub seed: u64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            vectorizer: VectorizerParams::default(),
            alpha: 0.1,
            test_size: 0.2,
            seed: 42,
        }
    }
}

// ============================================================================
// Multinomial naive Bayes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    /// Contexts seen in training, in tie-break order.
    classes: Vec<Context>,
    class_log_prior: Vec<f64>,
    /// `[class][feature]`
    feature_log_prob: Vec<Vec<f64>>,
}

impl NaiveBayesModel {
    pub fn fit(rows: &[SparseVector], labels: &[Context], n_features: usize, alpha: f64) -> Self {
        let mut class_count = [0usize; 3];
        let mut feature_count = vec![vec![0.0f64; n_features]; 3];

        for (row, label) in rows.iter().zip(labels) {
            let c = label.index();
            class_count[c] += 1;
            for &(idx, value) in row {
                feature_count[c][idx] += value;
            }
        }

        let total = labels.len().max(1) as f64;
        let mut classes = Vec::new();
        let mut class_log_prior = Vec::new();
        let mut feature_log_prob = Vec::new();

        for ctx in Context::ALL {
            let c = ctx.index();
            if class_count[c] == 0 {
                continue;
            }
            let smoothed_total = feature_count[c].iter().sum::<f64>() + alpha * n_features as f64;
            classes.push(ctx);
            class_log_prior.push((class_count[c] as f64 / total).ln());
            feature_log_prob.push(
                feature_count[c]
                    .iter()
                    .map(|fc| ((fc + alpha) / smoothed_total).ln())
                    .collect(),
            );
        }

        Self {
            classes,
            class_log_prior,
            feature_log_prob,
        }
    }

    /// Posterior over all three contexts; unseen contexts get zero.
    pub fn predict_proba(&self, row: &SparseVector) -> ContextScores {
        let joint: Vec<f64> = self
            .class_log_prior
            .iter()
            .zip(&self.feature_log_prob)
            .map(|(prior, flp)| prior + row.iter().map(|&(idx, v)| v * flp[idx]).sum::<f64>())
            .collect();

        let max = joint.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let log_norm = max + joint.iter().map(|j| (j - max).exp()).sum::<f64>().ln();

        let mut scores = ContextScores::default();
        for (ctx, j) in self.classes.iter().zip(&joint) {
            scores.set(*ctx, (j - log_norm).exp());
        }
        scores
    }

    pub fn classes(&self) -> &[Context] {
        &self.classes
    }
}

fn argmax(scores: &ContextScores) -> Context {
    super::rule_scorer::top_context(scores)
}

// ============================================================================
// Evaluation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextMetrics {
    pub context: Context,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub evaluated_on: usize,
    pub per_context: Vec<ContextMetrics>,
}

impl ClassificationReport {
    pub fn from_predictions(expected: &[Context], predicted: &[Context]) -> Self {
        let evaluated_on = expected.len();
        let correct = expected.iter().zip(predicted).filter(|(e, p)| e == p).count();
        let accuracy = if evaluated_on == 0 {
            0.0
        } else {
            correct as f64 / evaluated_on as f64
        };

        let per_context = Context::ALL
            .iter()
            .map(|&ctx| {
                let tp = expected
                    .iter()
                    .zip(predicted)
                    .filter(|(e, p)| **e == ctx && **p == ctx)
                    .count() as f64;
                let predicted_n = predicted.iter().filter(|p| **p == ctx).count() as f64;
                let support = expected.iter().filter(|e| **e == ctx).count();

                let precision = if predicted_n > 0.0 { tp / predicted_n } else { 0.0 };
                let recall = if support > 0 { tp / support as f64 } else { 0.0 };
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ContextMetrics {
                    context: ctx,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();

        Self {
            accuracy,
            evaluated_on,
            per_context,
        }
    }
}

/// Per-context hold-out split. Returns `(train, test)` sample indices.
///
/// Each context keeps at least one sample for training; contexts with a single
/// sample contribute nothing to the test side.
pub fn stratified_split(labels: &[Context], test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();

    for ctx in Context::ALL {
        let mut members: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == ctx)
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            continue;
        }
        members.shuffle(&mut rng);

        let held_out = ((members.len() as f64 * test_size).round() as usize).min(members.len() - 1);
        test.extend_from_slice(&members[..held_out]);
        train.extend_from_slice(&members[held_out..]);
    }

    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

// ============================================================================
// Artifact
// ============================================================================

/// Everything a trained classifier needs to predict. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierArtifact {
    pub format_version: u32,
    pub vectorizer: TfidfVectorizer,
    pub model: NaiveBayesModel,
    pub accuracy: f64,
    pub report: ClassificationReport,
    pub sample_count: usize,
    pub trained_at: DateTime<Utc>,
}

impl ClassifierArtifact {
    pub fn build(samples: &[TrainingSample], params: &ClassifierParams) -> Result<Self> {
        if samples.is_empty() {
            return Err(DetectionError::validation("No training samples supplied"));
        }
        if params.alpha.is_nan() || params.alpha <= 0.0 {
            return Err(DetectionError::validation("Smoothing alpha must be positive"));
        }
        if !(0.0..1.0).contains(&params.test_size) {
            return Err(DetectionError::validation("test_size must be in [0, 1)"));
        }

        let documents: Vec<String> = samples.iter().map(|s| preprocess(&s.text)).collect();
        let labels: Vec<Context> = samples.iter().map(|s| s.label).collect();

        let (train_idx, test_idx) = stratified_split(&labels, params.test_size, params.seed);
        let eval_idx = if test_idx.is_empty() {
            warn!(
                "[CLASSIFIER] Too few samples to hold any out ({}); scoring on the training split",
                samples.len()
            );
            train_idx.clone()
        } else {
            test_idx
        };

        let pick = |idx: &[usize]| -> (Vec<String>, Vec<Context>) {
            idx.iter().map(|&i| (documents[i].clone(), labels[i])).unzip()
        };
        let (train_docs, train_labels) = pick(&train_idx);
        let (eval_docs, eval_labels) = pick(&eval_idx);

        let holdout_vectorizer = TfidfVectorizer::fit(&train_docs, &params.vectorizer);
        let train_rows: Vec<SparseVector> =
            train_docs.iter().map(|d| holdout_vectorizer.transform(d)).collect();
        let holdout_model = NaiveBayesModel::fit(
            &train_rows,
            &train_labels,
            holdout_vectorizer.feature_count(),
            params.alpha,
        );
        let predicted: Vec<Context> = eval_docs
            .iter()
            .map(|d| argmax(&holdout_model.predict_proba(&holdout_vectorizer.transform(d))))
            .collect();
        let report = ClassificationReport::from_predictions(&eval_labels, &predicted);

        for m in &report.per_context {
            debug!(
                context = %m.context,
                precision = m.precision,
                recall = m.recall,
                f1 = m.f1,
                support = m.support,
                "[CLASSIFIER] evaluation"
            );
        }

        // Served artifact: representation and parameters refit on every sample.
        let vectorizer = TfidfVectorizer::fit(&documents, &params.vectorizer);
        let rows: Vec<SparseVector> = documents.iter().map(|d| vectorizer.transform(d)).collect();
        let model = NaiveBayesModel::fit(&rows, &labels, vectorizer.feature_count(), params.alpha);

        info!(
            "[CLASSIFIER] Trained on {} samples ({} train / {} eval), {} features, accuracy {:.3}",
            samples.len(),
            train_idx.len(),
            report.evaluated_on,
            vectorizer.feature_count(),
            report.accuracy
        );

        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            vectorizer,
            model,
            accuracy: report.accuracy,
            report,
            sample_count: samples.len(),
            trained_at: Utc::now(),
        })
    }

    /// Distribution for already-preprocessed text.
    pub fn predict(&self, normalized: &str) -> ContextScores {
        self.model.predict_proba(&self.vectorizer.transform(normalized))
    }

    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, StorageError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, StorageError> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(StorageError::Incompatible {
                found: artifact.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            });
        }
        artifact.check_shape()?;
        Ok(artifact)
    }

    /// Dimensions must agree before `predict` indexes into them.
    fn check_shape(&self) -> std::result::Result<(), StorageError> {
        let corrupt = |msg: String| Err(StorageError::Corrupt(msg));
        let model = &self.model;
        let n_features = self.vectorizer.feature_count();

        if !self.vectorizer.is_consistent() {
            return corrupt("vocabulary and idf weights disagree".to_string());
        }
        if model.classes.is_empty() {
            return corrupt("model has no classes".to_string());
        }
        if model.class_log_prior.len() != model.classes.len()
            || model.feature_log_prob.len() != model.classes.len()
        {
            return corrupt(format!(
                "{} classes but {} priors and {} likelihood rows",
                model.classes.len(),
                model.class_log_prior.len(),
                model.feature_log_prob.len()
            ));
        }
        if let Some(row) = model.feature_log_prob.iter().find(|r| r.len() != n_features) {
            return corrupt(format!(
                "likelihood row has {} columns, vectorizer has {} features",
                row.len(),
                n_features
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Classifier
// ============================================================================

pub struct StatisticalClassifier {
    params: ClassifierParams,
    slot: RwLock<Option<Arc<ClassifierArtifact>>>,
    lifecycle: Mutex<()>,
}

impl Default for StatisticalClassifier {
    fn default() -> Self {
        Self::new(ClassifierParams::default())
    }
}

impl StatisticalClassifier {
    pub fn new(params: ClassifierParams) -> Self {
        Self {
            params,
            slot: RwLock::new(None),
            lifecycle: Mutex::new(()),
        }
    }

    pub fn params(&self) -> &ClassifierParams {
        &self.params
    }

    pub fn is_trained(&self) -> bool {
        self.slot.read().is_some()
    }

    /// Snapshot of the current artifact.
    pub fn current(&self) -> Option<Arc<ClassifierArtifact>> {
        self.slot.read().clone()
    }

    pub fn predict(&self, normalized: &str) -> Result<ContextScores> {
        let artifact = self.current().ok_or(DetectionError::UntrainedModel)?;
        Ok(artifact.predict(normalized))
    }

    pub fn fit(&self, samples: &[TrainingSample]) -> Result<f64> {
        let artifact = self.fit_and_commit(samples, |_| Ok(()))?;
        Ok(artifact.accuracy)
    }

    /// Build a replacement artifact, hand it to `commit`, then swap it in.
    /// If either step fails the previous artifact stays in place.
    pub fn fit_and_commit<F>(&self, samples: &[TrainingSample], commit: F) -> Result<Arc<ClassifierArtifact>>
    where
        F: FnOnce(&ClassifierArtifact) -> Result<()>,
    {
        let _guard = self.lifecycle.lock();
        let artifact = Arc::new(ClassifierArtifact::build(samples, &self.params)?);
        commit(&artifact)?;
        *self.slot.write() = Some(Arc::clone(&artifact));
        Ok(artifact)
    }

    pub fn save(&self, store: &dyn ArtifactStore, key: &str) -> Result<()> {
        let artifact = self.current().ok_or(DetectionError::UntrainedModel)?;
        store.put(key, &artifact.to_bytes()?)?;
        Ok(())
    }

    /// `Ok(false)` if nothing is stored under `key`; the current artifact is kept.
    /// On a read or decode failure the classifier is left untrained.
    pub fn load(&self, store: &dyn ArtifactStore, key: &str) -> Result<bool> {
        let _guard = self.lifecycle.lock();

        let loaded = store
            .get(key)
            .and_then(|bytes| bytes.map(|b| ClassifierArtifact::from_bytes(&b)).transpose());

        match loaded {
            Ok(Some(artifact)) => {
                info!(
                    "[CLASSIFIER] Loaded artifact '{}' ({} features, accuracy {:.3})",
                    key,
                    artifact.vectorizer.feature_count(),
                    artifact.accuracy
                );
                *self.slot.write() = Some(Arc::new(artifact));
                Ok(true)
            }
            Ok(None) => {
                info!("[CLASSIFIER] No stored artifact at {}", store.describe(key));
                Ok(false)
            }
            Err(e) => {
                warn!("[CLASSIFIER] Failed to load artifact '{}': {}", key, e);
                *self.slot.write() = None;
                Err(e.into())
            }
        }
    }

    pub fn accuracy(&self) -> Option<f64> {
        self.current().map(|a| a.accuracy)
    }

    pub fn feature_count(&self) -> usize {
        self.current().map(|a| a.vectorizer.feature_count()).unwrap_or(0)
    }

    pub fn report(&self) -> Option<ClassificationReport> {
        self.current().map(|a| a.report.clone())
    }

    pub fn classes(&self) -> Vec<Context> {
        Context::ALL.to_vec()
    }
}
