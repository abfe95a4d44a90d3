//! logtriage Classifiers
//!
//! The tiered log classification cascade.
//!
//! Tiers are ordered by cost:
//! - Pattern (<2ms): deterministic rule table
//! - Semantic (<50ms): sentence embedding vs. trained label centroids
//! - Remote (seconds): LLM over an OpenAI-compatible API, last resort
//!
//! A [`ClassificationRouter`] owns the tiers and a [`RoutingPolicy`] that picks
//! which of them a record visits; [`BatchRunner`] applies it to whole batches.

pub mod batch;
pub mod classifier;
pub mod config;
pub mod embedding;
pub mod model_loader;
pub mod patterns;
pub mod registry;
pub mod remote;
pub mod router;
pub mod semantic;

pub use batch::{BatchReport, BatchRunner, BatchSummary};
pub use classifier::{ClassificationMetadata, Classifier, ClassifierTier, TierMatch};
pub use config::{
    BatchConfig, EmbedderConfig, PatternsConfig, RemoteConfig, RoutingConfig, SemanticConfig,
    TriageConfig,
};
pub use embedding::{Embedder, HashingEmbedder};
#[cfg(feature = "ml-models")]
pub use model_loader::BertEmbedder;
pub use model_loader::{DeviceType, ModelConfig, ModelSource};
pub use patterns::{PatternClassifier, PatternRule, RuleKind};
pub use registry::{build_embedder, build_router, build_router_with_key};
pub use remote::{CategoryExtractor, RemoteClassifier, RemoteSettings};
pub use router::{
    ClassificationRouter, Route, RouterBuilder, RoutingPolicy, TierStage, PATTERN_TIER,
    REMOTE_TIER, SEMANTIC_TIER,
};
pub use semantic::{CentroidArtifact, LabelCentroid, SemanticClassifier};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::batch::{BatchReport, BatchRunner};
    pub use crate::classifier::{Classifier, ClassifierTier, TierMatch};
    pub use crate::config::TriageConfig;
    pub use crate::router::{ClassificationRouter, RoutingPolicy, TierStage};
}
