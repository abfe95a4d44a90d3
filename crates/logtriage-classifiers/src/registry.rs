//! Router construction from configuration
//!
//! Every tier is built once here, at startup, and injected into the router.
//! Only tiers some route references are constructed, so a pattern-only setup
//! never loads a model or needs an API key. Any problem is a
//! [`Error::Config`] and aborts startup.

use crate::classifier::Classifier;
use crate::config::{EmbedderConfig, RemoteConfig, SemanticConfig, TriageConfig};
use crate::embedding::{Embedder, HashingEmbedder};
use crate::patterns::PatternClassifier;
use crate::remote::{RemoteClassifier, RemoteSettings};
use crate::router::{ClassificationRouter, TierStage, PATTERN_TIER, REMOTE_TIER, SEMANTIC_TIER};
use crate::semantic::{CentroidArtifact, SemanticClassifier};
use logtriage_core::{Error, Result};
use std::sync::Arc;
use tracing::info;

/// Build the router, reading the remote API key from the configured
/// environment variable
pub fn build_router(config: &TriageConfig) -> Result<ClassificationRouter> {
    let api_key = match &config.remote.api_key_env {
        Some(var) if config.routing.referenced_tiers().contains(REMOTE_TIER) => {
            let key = std::env::var(var).map_err(|_| {
                Error::config(format!(
                    "Remote tier is routed but environment variable {} is not set",
                    var
                ))
            })?;
            Some(key)
        }
        _ => None,
    };

    build_router_with_key(config, api_key)
}

/// Build the router with an explicit API key
pub fn build_router_with_key(
    config: &TriageConfig,
    api_key: Option<String>,
) -> Result<ClassificationRouter> {
    config.validate()?;

    let referenced = config.routing.referenced_tiers();
    let mut builder = ClassificationRouter::builder().policy(config.routing.to_policy());

    if referenced.contains(PATTERN_TIER) {
        let pattern = PatternClassifier::with_case_sensitivity(
            PATTERN_TIER,
            config.patterns.rules.clone(),
            config.patterns.case_insensitive,
        )?;
        info!(rules = pattern.rule_count(), "Pattern tier ready");
        builder = builder.tier(Arc::new(pattern));
    }

    if referenced.contains(SEMANTIC_TIER) {
        let semantic = build_semantic(&config.semantic)?;
        builder = builder.stage(
            TierStage::new(semantic).with_min_confidence(config.routing.semantic_threshold),
        );
    }

    if referenced.contains(REMOTE_TIER) {
        let remote = build_remote(&config.remote, api_key)?;
        builder = builder.stage(TierStage::new(remote).with_timeout(config.remote.timeout()));
    }

    let router = builder.build()?;
    info!(tiers = ?router.tier_names(), "Classification router ready");
    Ok(router)
}

fn build_semantic(config: &SemanticConfig) -> Result<Arc<dyn Classifier>> {
    let artifact = CentroidArtifact::from_file(&config.artifact)?;
    let embedder = build_embedder(&config.embedder)?;
    Ok(Arc::new(SemanticClassifier::new(SEMANTIC_TIER, embedder, artifact)?))
}

/// Load the configured embedder
pub fn build_embedder(config: &EmbedderConfig) -> Result<Arc<dyn Embedder>> {
    match config {
        EmbedderConfig::Hashing { dimension } => Ok(Arc::new(HashingEmbedder::new(*dimension)?)),

        #[cfg(feature = "ml-models")]
        EmbedderConfig::Bert {
            source,
            device,
            max_length,
        } => {
            let model_config = crate::model_loader::ModelConfig {
                source: source.clone(),
                device: *device,
                max_length: *max_length,
            };
            Ok(Arc::new(crate::model_loader::BertEmbedder::load(&model_config)?))
        }

        #[cfg(not(feature = "ml-models"))]
        EmbedderConfig::Bert { .. } => Err(Error::config(
            "BERT embedder requires the 'ml-models' feature",
        )),
    }
}

fn build_remote(config: &RemoteConfig, api_key: Option<String>) -> Result<Arc<dyn Classifier>> {
    let settings = RemoteSettings {
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        api_key,
        categories: config.categories.clone(),
        temperature: config.temperature,
        request_timeout: config.timeout(),
    };
    Ok(Arc::new(RemoteClassifier::new(REMOTE_TIER, settings)?))
}
