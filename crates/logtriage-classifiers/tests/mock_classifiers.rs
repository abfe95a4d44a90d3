//! Mock classifiers for testing
//!
//! Configurable implementations of the Classifier trait for exercising the
//! router's escalation, threshold, timeout, and failure paths.

use async_trait::async_trait;
use logtriage_classifiers::{Classifier, ClassifierTier, TierMatch};
use logtriage_core::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// A configurable mock tier
pub struct MockClassifier {
    name: String,
    label: String,
    score: f32,
    tier: ClassifierTier,
    trigger: Option<String>,
    simulated_latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockClassifier {
    /// A tier that answers `label` with score 1.0 for every message
    pub fn new(name: &str, tier: ClassifierTier) -> Self {
        Self {
            name: name.to_string(),
            label: "Mock Label".to_string(),
            score: 1.0,
            tier,
            trigger: None,
            simulated_latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the label this classifier will return
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Set the score this classifier will return
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    /// Only answer when the message contains `trigger`; miss otherwise
    pub fn with_trigger(mut self, trigger: &str) -> Self {
        self.trigger = Some(trigger.to_string());
        self
    }

    /// Set simulated latency for this classifier
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Get the number of times classify was called
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify(&self, text: &str) -> Result<Option<TierMatch>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(trigger) = &self.trigger {
            if !text.contains(trigger.as_str()) {
                return Ok(None);
            }
        }

        let mut m = TierMatch::new(self.label.clone(), self.score);
        m.latency_us = self
            .simulated_latency
            .map(|d| d.as_micros() as u64)
            .unwrap_or(100);
        Ok(Some(m))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ClassifierTier {
        self.tier
    }
}

/// A tier that always fails
pub struct FailingClassifier {
    name: String,
    tier: ClassifierTier,
    error_message: String,
    call_count: AtomicU32,
}

impl FailingClassifier {
    pub fn new(name: &str, tier: ClassifierTier) -> Self {
        Self {
            name: name.to_string(),
            tier,
            error_message: "Simulated classifier failure".to_string(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set a custom error message
    pub fn with_error(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for FailingClassifier {
    async fn classify(&self, _text: &str) -> Result<Option<TierMatch>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Err(Error::remote(self.error_message.clone()))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ClassifierTier {
        self.tier
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_classifier_basic() {
        let classifier = MockClassifier::new("semantic", ClassifierTier::Semantic)
            .with_label("Security Alert")
            .with_score(0.8);

        let result = classifier.classify("hello").await.unwrap().unwrap();
        assert_eq!(result.label, "Security Alert");
        assert_eq!(result.score, 0.8);
        assert_eq!(classifier.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_classifier_trigger() {
        let classifier = MockClassifier::new("pattern", ClassifierTier::Pattern).with_trigger("404");

        assert!(classifier.classify("GET / 200").await.unwrap().is_none());
        assert!(classifier.classify("GET / 404").await.unwrap().is_some());
        assert_eq!(classifier.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_classifier() {
        let classifier = FailingClassifier::new("remote", ClassifierTier::Remote).with_error("HTTP 503");

        let err = classifier.classify("test").await.unwrap_err();
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_mock_classifier_latency() {
        let classifier = MockClassifier::new("slow", ClassifierTier::Remote)
            .with_latency(Duration::from_millis(10));

        let start = std::time::Instant::now();
        let _ = classifier.classify("test").await;
        assert!(start.elapsed() >= Duration::from_millis(10));
    }
}
