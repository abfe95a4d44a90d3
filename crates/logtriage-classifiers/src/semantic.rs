//! Semantic classifier (embedding tier)
//!
//! Scores a message against per-label centroids produced by the offline
//! training job. The centroid table is a versioned JSON artifact:
//!
//! ```json
//! {
//!   "version": "2025-05-01",
//!   "dimension": 384,
//!   "labels": [
//!     { "label": "Security Alert", "centroid": [0.012, -0.031, ...] },
//!     { "label": "Error", "centroid": [...] }
//!   ]
//! }
//! ```
//!
//! The confidence is cosine similarity clamped into `[0, 1]`. The acceptance
//! threshold is applied by the router, not here.

use crate::classifier::{ClassificationMetadata, Classifier, ClassifierTier, TierMatch};
use crate::embedding::{cosine_similarity, l2_normalize, Embedder};
use logtriage_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// One label's centroid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelCentroid {
    pub label: String,
    pub centroid: Vec<f32>,
}

/// Trained centroid table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidArtifact {
    /// Version tag of the training run
    pub version: String,

    /// Embedding dimension the centroids were computed in
    pub dimension: usize,

    /// Centroids in label priority order; ties go to the earlier entry
    pub labels: Vec<LabelCentroid>,
}

impl CentroidArtifact {
    /// Parse from JSON and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let artifact: Self = serde_json::from_str(json)
            .map_err(|e| Error::config(format!("Invalid centroid artifact: {}", e)))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Load from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read centroid artifact {:?}: {}", path, e))
        })?;
        Self::from_json(&content)
    }

    /// Check structural invariants
    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(Error::config("Centroid artifact dimension must be positive"));
        }
        if self.labels.is_empty() {
            return Err(Error::config("Centroid artifact has no labels"));
        }
        for entry in &self.labels {
            if entry.label.trim().is_empty() {
                return Err(Error::config("Centroid artifact contains an empty label"));
            }
            if entry.centroid.len() != self.dimension {
                return Err(Error::config(format!(
                    "Centroid for {:?} has dimension {}, expected {}",
                    entry.label,
                    entry.centroid.len(),
                    self.dimension
                )));
            }
            if entry.centroid.iter().any(|x| !x.is_finite()) {
                return Err(Error::config(format!(
                    "Centroid for {:?} contains non-finite values",
                    entry.label
                )));
            }
        }
        Ok(())
    }
}

/// Read-only state shared with blocking inference tasks
struct SemanticModel {
    embedder: Arc<dyn Embedder>,
    centroids: Vec<LabelCentroid>,
}

impl SemanticModel {
    /// Best label and the full score table, in artifact order
    fn score(&self, text: &str) -> Result<(usize, Vec<f32>)> {
        let embedding = self.embedder.embed(text)?;
        if embedding.len() != self.centroids[0].centroid.len() {
            return Err(Error::classifier(format!(
                "Embedder produced dimension {}, expected {}",
                embedding.len(),
                self.centroids[0].centroid.len()
            )));
        }

        let scores: Vec<f32> = self
            .centroids
            .iter()
            .map(|c| normalize_score(cosine_similarity(&embedding, &c.centroid)))
            .collect();

        Ok((best_index(&scores), scores))
    }
}

/// Clamp a similarity into `[0, 1]`; NaN collapses to 0
fn normalize_score(similarity: f32) -> f32 {
    if similarity.is_nan() {
        0.0
    } else {
        similarity.clamp(0.0, 1.0)
    }
}

/// Index of the highest score; the earliest index wins ties
fn best_index(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, score) in scores.iter().enumerate().skip(1) {
        if *score > scores[best] {
            best = i;
        }
    }
    best
}

/// Embedding similarity classifier
pub struct SemanticClassifier {
    name: String,
    version: String,
    model: Arc<SemanticModel>,
}

impl SemanticClassifier {
    /// Create a classifier from a loaded embedder and a validated artifact
    pub fn new(
        name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
        artifact: CentroidArtifact,
    ) -> Result<Self> {
        artifact.validate()?;

        if embedder.dimension() != artifact.dimension {
            return Err(Error::config(format!(
                "Embedder {} has dimension {}, centroid artifact {} expects {}",
                embedder.name(),
                embedder.dimension(),
                artifact.version,
                artifact.dimension
            )));
        }

        let mut centroids = artifact.labels;
        for entry in &mut centroids {
            l2_normalize(&mut entry.centroid);
        }

        let name = name.into();
        info!(
            classifier = %name,
            embedder = embedder.name(),
            version = %artifact.version,
            labels = centroids.len(),
            "Semantic classifier ready"
        );

        Ok(Self {
            name,
            version: artifact.version,
            model: Arc::new(SemanticModel {
                embedder,
                centroids,
            }),
        })
    }

    /// Artifact version in use
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Labels known to this classifier, in priority order
    pub fn labels(&self) -> Vec<&str> {
        self.model.centroids.iter().map(|c| c.label.as_str()).collect()
    }
}

#[async_trait::async_trait]
impl Classifier for SemanticClassifier {
    async fn classify(&self, text: &str) -> Result<Option<TierMatch>> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let start = Instant::now();
        let model = Arc::clone(&self.model);
        let text = text.to_string();

        let (best, scores) = tokio::task::spawn_blocking(move || model.score(&text))
            .await
            .map_err(|e| Error::internal(format!("Semantic inference task failed: {}", e)))??;

        let centroids = &self.model.centroids;
        let all_scores = centroids
            .iter()
            .zip(&scores)
            .map(|(c, s)| (c.label.clone(), *s))
            .collect();

        Ok(Some(TierMatch {
            label: centroids[best].label.clone(),
            score: scores[best],
            metadata: ClassificationMetadata {
                model: Some(self.version.clone()),
                all_scores: Some(all_scores),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ClassifierTier {
        ClassifierTier::Semantic
    }
}
