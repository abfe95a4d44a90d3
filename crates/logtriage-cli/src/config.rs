//! CLI configuration loading

use anyhow::{bail, Context};
use logtriage_classifiers::TriageConfig;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "logtriage.yaml";

/// Values given on the command line; they win over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub concurrency: Option<usize>,
    pub semantic_threshold: Option<f32>,
    pub remote_base_url: Option<String>,
    pub remote_model: Option<String>,
}

/// Load configuration from file and CLI overrides
///
/// An explicit path must exist. Without one, `logtriage.yaml` in the working
/// directory is used if present, otherwise built-in defaults.
pub fn load(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<TriageConfig> {
    let path: Option<PathBuf> = match path {
        Some(p) if !p.exists() => bail!("Configuration file {:?} not found", p),
        Some(p) => Some(p.to_path_buf()),
        None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    let mut config = match &path {
        Some(p) => {
            let content = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read configuration {:?}", p))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse configuration {:?}", p))?
        }
        None => TriageConfig::default(),
    };

    apply(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply(config: &mut TriageConfig, overrides: &Overrides) {
    if let Some(concurrency) = overrides.concurrency {
        config.batch.concurrency = Some(concurrency);
    }
    if let Some(threshold) = overrides.semantic_threshold {
        config.routing.semantic_threshold = threshold;
    }
    if let Some(url) = &overrides.remote_base_url {
        config.remote.base_url = url.clone();
    }
    if let Some(model) = &overrides.remote_model {
        config.remote.model = model.clone();
    }
}
