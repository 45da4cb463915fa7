// Detection Module
// Context detection core organized into specialized submodules:
// - rule_scorer: Keyword and pattern heuristics, needs no training
// - vectorizer: TF-IDF features over unigrams and bigrams
// - classifier: Naive Bayes artifact with atomic replace/save/load
// - ranking: Primary context plus ordered alternatives
// - engine: Chooses between the statistical and rule-based paths
// - trainer: Validates samples, fits and persists a new artifact

pub mod rule_scorer;
pub mod vectorizer;
pub mod classifier;
pub mod ranking;
pub mod engine;
pub mod trainer;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used items
pub use rule_scorer::{top_context, RuleBasedScorer};
pub use vectorizer::{TfidfVectorizer, VectorizerParams};
pub use classifier::{ClassifierArtifact, ClassifierParams, StatisticalClassifier};
pub use ranking::rank;
pub use engine::DetectionEngine;
pub use trainer::{Trainer, TrainingOutcome};
