// Detection Engine
// Routes each snippet to the statistical classifier or the rule-based scorer
// - Statistical path: preprocess, then predict with the current artifact
// - Rule-based path: heuristics over the raw text; always available
// Both produce a distribution that is ranked the same way.

use std::sync::Arc;
use tracing::{debug, warn};

use super::classifier::StatisticalClassifier;
use super::ranking::rank;
use super::rule_scorer::RuleBasedScorer;
use crate::models::{ContextScores, DetectionMethod, DetectionResult};
use crate::services::errors::{DetectionError, Result};
use crate::services::text_processor::preprocess;

/// Which scorer handles a call.
enum ScoringPath {
    Statistical,
    RuleBased,
}

pub struct DetectionEngine {
    classifier: Arc<StatisticalClassifier>,
    rules: RuleBasedScorer,
}

impl DetectionEngine {
    pub fn new(classifier: Arc<StatisticalClassifier>) -> Self {
        Self {
            classifier,
            rules: RuleBasedScorer::new(),
        }
    }

    pub fn classifier(&self) -> &Arc<StatisticalClassifier> {
        &self.classifier
    }

    fn choose_path(&self, use_statistical: bool) -> ScoringPath {
        if use_statistical && self.classifier.is_trained() {
            ScoringPath::Statistical
        } else {
            ScoringPath::RuleBased
        }
    }

    pub fn detect(&self, raw_text: &str, use_statistical: bool) -> Result<DetectionResult> {
        if let ScoringPath::Statistical = self.choose_path(use_statistical) {
            match self.statistical_scores(raw_text) {
                Ok(scores) => return Ok(rank(&scores, DetectionMethod::Statistical)),
                // Artifact dropped between the check and the prediction (failed load).
                Err(DetectionError::UntrainedModel) => {
                    warn!("[ENGINE] Model became unavailable mid-request, using rules");
                }
                Err(e) => return Err(DetectionError::DetectionFailed(e.into())),
            }
        }

        let scores = self.rules.score(raw_text);
        debug!(
            code = scores.code,
            email = scores.email,
            chat = scores.chat,
            "[ENGINE] rule-based scores"
        );
        Ok(rank(&scores, DetectionMethod::RuleBased))
    }

    fn statistical_scores(&self, raw_text: &str) -> Result<ContextScores> {
        let normalized = preprocess(raw_text);
        self.classifier.predict(&normalized)
    }
}
