// ContextType Core Services

pub mod text_processor;
pub mod config_store;
pub mod artifact_store;
pub mod errors;
pub mod detection;

pub use text_processor::*;
pub use config_store::*;
pub use artifact_store::{ArtifactStore, FileArtifactStore, MemoryArtifactStore};
pub use errors::{DetectionError, Result, StorageError};

// Re-export detection module items
pub use detection::{
    rank,
    top_context,
    ClassifierArtifact,
    ClassifierParams,
    DetectionEngine,
    RuleBasedScorer,
    StatisticalClassifier,
    TfidfVectorizer,
    Trainer,
    TrainingOutcome,
    VectorizerParams,
};
