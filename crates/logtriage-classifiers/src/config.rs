//! Configuration for the classification cascade
//!
//! Loaded from YAML. Every section has defaults, so an empty document yields
//! the standard cascade with the built-in pattern table:
//!
//! ```yaml
//! routing:
//!   legacy_sources: [LegacyCRM]
//!   legacy_route: [remote]
//!   default_route: [pattern, semantic]
//!   semantic_threshold: 0.5
//! semantic:
//!   artifact: models/centroids.json
//!   embedder:
//!     type: hashing
//!     dimension: 256
//! remote:
//!   base_url: https://api.groq.com/openai/v1
//!   model: deepseek-r1-distill-llama-70b
//!   api_key_env: GROQ_API_KEY
//!   categories: [Workflow Error, Deprecation Warning]
//! ```

use crate::model_loader::{DeviceType, ModelSource};
use crate::patterns::PatternRule;
use crate::router::{
    Route, RoutingPolicy, DEFAULT_LEGACY_SOURCE, DEFAULT_SEMANTIC_THRESHOLD, PATTERN_TIER,
    REMOTE_TIER, SEMANTIC_TIER,
};
use logtriage_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TriageConfig {
    pub routing: RoutingConfig,
    pub patterns: PatternsConfig,
    pub semantic: SemanticConfig,
    pub remote: RemoteConfig,
    pub batch: BatchConfig,
}

/// Which tiers each source goes through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Sources sent down `legacy_route`; matched exactly
    pub legacy_sources: Vec<String>,

    pub legacy_route: Vec<String>,

    /// Route for every other source
    pub default_route: Vec<String>,

    /// Minimum semantic score accepted
    pub semantic_threshold: f32,

    /// Per-source overrides, applied after the legacy sources
    pub source_routes: BTreeMap<String, Vec<String>>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            legacy_sources: vec![DEFAULT_LEGACY_SOURCE.to_string()],
            legacy_route: vec![REMOTE_TIER.to_string()],
            default_route: vec![PATTERN_TIER.to_string(), SEMANTIC_TIER.to_string()],
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            source_routes: BTreeMap::new(),
        }
    }
}

impl RoutingConfig {
    /// Build the routing policy object
    pub fn to_policy(&self) -> RoutingPolicy {
        let mut policy = RoutingPolicy::new(Route::new("default", self.default_route.clone()));
        for source in &self.legacy_sources {
            policy = policy.with_source_route(source, Route::new("legacy", self.legacy_route.clone()));
        }
        for (source, tiers) in &self.source_routes {
            policy = policy.with_source_route(source, Route::new(source.clone(), tiers.clone()));
        }
        policy
    }

    /// Tier names referenced by any route
    pub fn referenced_tiers(&self) -> BTreeSet<&str> {
        let mut tiers: BTreeSet<&str> = self.default_route.iter().map(String::as_str).collect();
        if !self.legacy_sources.is_empty() {
            tiers.extend(self.legacy_route.iter().map(String::as_str));
        }
        for route in self.source_routes.values() {
            tiers.extend(route.iter().map(String::as_str));
        }
        tiers
    }
}

/// Deterministic rule table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternsConfig {
    pub case_insensitive: bool,

    /// Rules in priority order
    pub rules: Vec<PatternRule>,
}

impl Default for PatternsConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            rules: default_rules(),
        }
    }
}

/// Built-in rules for high-volume system notifications and user actions
pub fn default_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::regex("User Action", r"User User\d+ logged (in|out)\."),
        PatternRule::regex("System Notification", r"Backup (started|ended) at .*"),
        PatternRule::regex("System Notification", r"Backup completed successfully\."),
        PatternRule::regex("System Notification", r"System updated to version .*"),
        PatternRule::regex("System Notification", r"File .* uploaded successfully by user .*"),
        PatternRule::regex("System Notification", r"Disk cleanup completed successfully\."),
        PatternRule::regex("System Notification", r"System reboot initiated by user .*"),
        PatternRule::regex("User Action", r"Account with ID .* created by .*"),
    ]
}

/// Embedding tier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,

    /// Centroid artifact produced by training
    pub artifact: PathBuf,

    pub embedder: EmbedderConfig,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            artifact: PathBuf::from("models/centroids.json"),
            embedder: EmbedderConfig::default(),
        }
    }
}

/// Which embedder backs the semantic tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EmbedderConfig {
    /// Model-free feature hashing
    Hashing {
        #[serde(default = "default_hashing_dimension")]
        dimension: usize,
    },

    /// candle BERT sentence encoder
    Bert {
        source: ModelSource,
        #[serde(default)]
        device: DeviceType,
        #[serde(default = "default_max_length")]
        max_length: usize,
    },
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self::Hashing {
            dimension: default_hashing_dimension(),
        }
    }
}

fn default_hashing_dimension() -> usize {
    crate::embedding::HashingEmbedder::DEFAULT_DIMENSION
}

fn default_max_length() -> usize {
    256
}

/// Remote LLM tier settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub base_url: String,
    pub model: String,

    /// Environment variable holding the API key; `None` sends no credentials
    pub api_key_env: Option<String>,

    /// Categories the model may answer with
    pub categories: Vec<String>,

    /// Per-record deadline for the remote call
    pub timeout_ms: u64,

    pub temperature: f32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "deepseek-r1-distill-llama-70b".to_string(),
            api_key_env: Some("GROQ_API_KEY".to_string()),
            categories: vec![
                "Workflow Error".to_string(),
                "Deprecation Warning".to_string(),
            ],
            timeout_ms: 30_000,
            temperature: 0.5,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Batch execution settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Records in flight; defaults to the CPU count
    pub concurrency: Option<usize>,
}

impl TriageConfig {
    /// Parse from YAML and validate
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| Error::config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config {:?}: {}", path, e)))?;
        Self::from_yaml(&content)
    }

    /// Reject anything that would make the cascade unusable
    pub fn validate(&self) -> Result<()> {
        let routing = &self.routing;

        if !(0.0..=1.0).contains(&routing.semantic_threshold) {
            return Err(Error::config(format!(
                "routing.semantic_threshold must be within [0, 1], got {}",
                routing.semantic_threshold
            )));
        }

        if routing.legacy_sources.iter().any(|s| s.trim().is_empty()) {
            return Err(Error::config("routing.legacy_sources contains a blank source name"));
        }
        if routing.source_routes.keys().any(|s| s.trim().is_empty()) {
            return Err(Error::config("routing.source_routes contains a blank source name"));
        }

        let mut routes: Vec<(&str, &[String])> = vec![("default_route", routing.default_route.as_slice())];
        if !routing.legacy_sources.is_empty() {
            routes.push(("legacy_route", routing.legacy_route.as_slice()));
        }
        for (source, tiers) in &routing.source_routes {
            routes.push((source.as_str(), tiers.as_slice()));
        }

        for (name, tiers) in routes {
            if tiers.is_empty() {
                return Err(Error::config(format!("Route '{}' has no tiers", name)));
            }
            for tier in tiers {
                if tiers.iter().filter(|t| *t == tier).count() > 1 {
                    return Err(Error::config(format!(
                        "Route '{}' lists tier '{}' more than once",
                        name, tier
                    )));
                }
                let enabled = match tier.as_str() {
                    PATTERN_TIER => true,
                    SEMANTIC_TIER => self.semantic.enabled,
                    REMOTE_TIER => self.remote.enabled,
                    other => {
                        return Err(Error::config(format!(
                            "Route '{}' references unknown tier '{}'",
                            name, other
                        )))
                    }
                };
                if !enabled {
                    return Err(Error::config(format!(
                        "Route '{}' references disabled tier '{}'",
                        name, tier
                    )));
                }
            }
        }

        let referenced = routing.referenced_tiers();

        if referenced.contains(PATTERN_TIER) {
            if let Some(rule) = self.patterns.rules.iter().find(|r| r.label.trim().is_empty()) {
                return Err(Error::config(format!(
                    "Pattern rule '{}' has an empty label",
                    rule.pattern
                )));
            }
        }

        if referenced.contains(SEMANTIC_TIER) {
            if self.semantic.artifact.as_os_str().is_empty() {
                return Err(Error::config("semantic.artifact must be set"));
            }
            match &self.semantic.embedder {
                EmbedderConfig::Hashing { dimension: 0 } => {
                    return Err(Error::config("semantic.embedder.dimension must be positive"))
                }
                EmbedderConfig::Bert { max_length: 0, .. } => {
                    return Err(Error::config("semantic.embedder.max_length must be positive"))
                }
                _ => {}
            }
        }

        if referenced.contains(REMOTE_TIER) {
            let remote = &self.remote;
            if remote.base_url.trim().is_empty() {
                return Err(Error::config("remote.base_url must be set"));
            }
            if remote.model.trim().is_empty() {
                return Err(Error::config("remote.model must be set"));
            }
            if remote.categories.is_empty() {
                return Err(Error::config("remote.categories must not be empty"));
            }
            if remote.timeout_ms == 0 {
                return Err(Error::config("remote.timeout_ms must be positive"));
            }
            if !remote.temperature.is_finite() || remote.temperature < 0.0 {
                return Err(Error::config("remote.temperature must be a non-negative number"));
            }
        }

        if self.batch.concurrency == Some(0) {
            return Err(Error::config("batch.concurrency must be positive"));
        }

        Ok(())
    }
}
