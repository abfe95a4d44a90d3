//! Classification router
//!
//! Routes each record through an ordered list of tiers chosen by a
//! [`RoutingPolicy`]. Each tier either answers, misses, or fails:
//! - an answer at or above the tier's `min_confidence` is final
//! - a miss (or an answer below threshold) escalates to the next tier
//! - a failure ends routing for that record with a [`ClassificationFailure`]
//!
//! When every tier on the route misses, the record is `Unclassified` with
//! confidence 0.0. The router keeps no state between calls.

use crate::classifier::{Classifier, ClassifierTier, TierMatch};
use logtriage_core::{
    AttemptOutcome, ClassificationFailure, ClassificationResult, Error, LogRecord, RecordOutcome,
    Result, RoutingDecision, UNCLASSIFIED_LABEL,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Conventional tier names used by the standard policy
pub const PATTERN_TIER: &str = "pattern";
pub const SEMANTIC_TIER: &str = "semantic";
pub const REMOTE_TIER: &str = "remote";

/// Source routed straight to the remote tier by the standard policy
pub const DEFAULT_LEGACY_SOURCE: &str = "LegacyCRM";

/// Default acceptance threshold for the semantic tier
pub const DEFAULT_SEMANTIC_THRESHOLD: f32 = 0.5;

/// A named, ordered list of tiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub tiers: Vec<String>,
}

impl Route {
    pub fn new<S: Into<String>>(name: impl Into<String>, tiers: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            tiers: tiers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Maps a record's source to the route it takes
#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    default_route: Route,
    source_routes: HashMap<String, Route>,
}

impl RoutingPolicy {
    /// Policy sending every source down `default_route`
    pub fn new(default_route: Route) -> Self {
        Self {
            default_route,
            source_routes: HashMap::new(),
        }
    }

    /// The standard cascade: legacy sources go straight to the remote tier,
    /// everything else tries pattern then semantic and stops
    pub fn standard<S: AsRef<str>>(legacy_sources: &[S]) -> Self {
        let mut policy = Self::new(Route::new("default", [PATTERN_TIER, SEMANTIC_TIER]));
        for source in legacy_sources {
            policy = policy.with_source_route(source.as_ref(), Route::new("legacy", [REMOTE_TIER]));
        }
        policy
    }

    /// Override the route for one source (exact, case-sensitive match)
    pub fn with_source_route(mut self, source: impl Into<String>, route: Route) -> Self {
        self.source_routes.insert(source.into(), route);
        self
    }

    /// Route for `source`
    pub fn select(&self, source: &str) -> &Route {
        self.source_routes.get(source).unwrap_or(&self.default_route)
    }

    /// The default route plus every source override
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        std::iter::once(&self.default_route).chain(self.source_routes.values())
    }
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self::standard(&[DEFAULT_LEGACY_SOURCE])
    }
}

/// A classifier together with how the router treats its answers
#[derive(Clone)]
pub struct TierStage {
    pub classifier: Arc<dyn Classifier>,

    /// Answers scoring below this escalate instead of being accepted
    pub min_confidence: f32,

    /// Deadline for one invocation; expiry fails the record
    pub timeout: Option<Duration>,
}

impl TierStage {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self {
            classifier,
            min_confidence: 0.0,
            timeout: None,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn name(&self) -> &str {
        self.classifier.name()
    }

    async fn attempt(&self, message: &str) -> Result<Option<TierMatch>> {
        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.classifier.classify(message))
                .await
                .map_err(|_| Error::Timeout(limit.as_millis() as u64))?,
            None => self.classifier.classify(message).await,
        }
    }
}

/// A tier answer after applying the per-tier confidence convention
#[derive(Debug, Clone, PartialEq)]
enum Normalized {
    Label { label: String, confidence: f32 },
    Unclassified,
}

/// Apply the confidence convention for `tier`: only the semantic tier's score
/// is meaningful, pattern and remote answers are 1.0 by definition
fn normalize(tier: ClassifierTier, m: &TierMatch) -> std::result::Result<Normalized, String> {
    let label = m.label.trim();
    if label.is_empty() {
        return Err("tier returned an empty label".to_string());
    }
    if !m.score.is_finite() {
        return Err(format!("tier returned non-finite score {}", m.score));
    }
    if label == UNCLASSIFIED_LABEL {
        return Ok(Normalized::Unclassified);
    }

    let confidence = if tier.reports_score() {
        m.score.clamp(0.0, 1.0)
    } else {
        1.0
    };

    Ok(Normalized::Label {
        label: m.label.clone(),
        confidence,
    })
}

/// Builder for [`ClassificationRouter`]
#[derive(Default)]
pub struct RouterBuilder {
    stages: Vec<TierStage>,
    policy: Option<RoutingPolicy>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tier that accepts any answer
    pub fn tier(self, classifier: Arc<dyn Classifier>) -> Self {
        self.stage(TierStage::new(classifier))
    }

    /// Add a fully configured tier
    pub fn stage(mut self, stage: TierStage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Set the routing policy; defaults to [`RoutingPolicy::default`]
    pub fn policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Validate and build; every route must reference registered tiers
    pub fn build(self) -> Result<ClassificationRouter> {
        let policy = self.policy.unwrap_or_default();

        let mut stages = HashMap::with_capacity(self.stages.len());
        for stage in self.stages {
            let name = stage.name().to_string();
            if !(0.0..=1.0).contains(&stage.min_confidence) {
                return Err(Error::config(format!(
                    "Tier '{}' min_confidence {} is outside [0, 1]",
                    name, stage.min_confidence
                )));
            }
            if stage.timeout == Some(Duration::ZERO) {
                return Err(Error::config(format!("Tier '{}' has a zero timeout", name)));
            }
            if stages.insert(name.clone(), stage).is_some() {
                return Err(Error::config(format!("Tier '{}' registered twice", name)));
            }
        }

        for route in policy.routes() {
            if route.tiers.is_empty() {
                return Err(Error::config(format!("Route '{}' has no tiers", route.name)));
            }
            for tier in &route.tiers {
                if !stages.contains_key(tier) {
                    return Err(Error::config(format!(
                        "Route '{}' references unknown tier '{}'",
                        route.name, tier
                    )));
                }
            }
        }

        for name in stages.keys() {
            if !policy.routes().any(|r| r.tiers.contains(name)) {
                warn!(tier = %name, "Tier is registered but no route uses it");
            }
        }

        Ok(ClassificationRouter { stages, policy })
    }
}

/// Routes records through the tier cascade
pub struct ClassificationRouter {
    stages: HashMap<String, TierStage>,
    policy: RoutingPolicy,
}

impl ClassificationRouter {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Classify one `(source, message)` pair
    pub async fn route(&self, source: &str, message: &str) -> RecordOutcome {
        self.route_record(&LogRecord::new(source, message)).await.0
    }

    /// Classify one record and return the trace of tiers attempted
    pub async fn route_record(&self, record: &LogRecord) -> (RecordOutcome, RoutingDecision) {
        let route = self.policy.select(&record.source);
        let mut decision = RoutingDecision::new(route.name.clone());

        let outcome = self.run_route(route, record, &mut decision).await;

        match &outcome {
            Ok(result) => debug!(
                source = %record.source,
                route = %decision.route,
                tiers = ?decision.tiers_attempted(),
                resolved_by = ?decision.resolved_by,
                label = %result.label,
                confidence = result.confidence,
                "Record routed"
            ),
            Err(failure) => warn!(
                source = %record.source,
                route = %decision.route,
                tier = %failure.tier,
                cause = %failure.cause,
                "Record classification failed"
            ),
        }

        (outcome, decision)
    }

    async fn run_route(
        &self,
        route: &Route,
        record: &LogRecord,
        decision: &mut RoutingDecision,
    ) -> RecordOutcome {
        for tier_name in &route.tiers {
            // Routes are validated against registered tiers in `build`.
            let Some(stage) = self.stages.get(tier_name) else {
                return Err(ClassificationFailure::new(record, tier_name, "tier not registered"));
            };

            let start = Instant::now();
            let attempt = stage.attempt(&record.message).await;
            let latency_us = start.elapsed().as_micros() as u64;

            let tier = stage.classifier.tier();
            if latency_us > tier.latency_budget_us() {
                debug!(tier = %tier_name, latency_us, "Tier exceeded its latency budget");
            }

            let tier_match = match attempt {
                Ok(Some(m)) => m,
                Ok(None) => {
                    decision.push(tier_name, AttemptOutcome::NoMatch, latency_us);
                    continue;
                }
                Err(e) => {
                    let cause = e.to_string();
                    decision.push(tier_name, AttemptOutcome::Failed { cause: cause.clone() }, latency_us);
                    return Err(ClassificationFailure::new(record, tier_name, cause));
                }
            };

            match normalize(tier, &tier_match) {
                Err(cause) => {
                    decision.push(tier_name, AttemptOutcome::Failed { cause: cause.clone() }, latency_us);
                    return Err(ClassificationFailure::new(record, tier_name, cause));
                }
                Ok(Normalized::Unclassified) => {
                    decision.push(
                        tier_name,
                        AttemptOutcome::Accepted {
                            label: UNCLASSIFIED_LABEL.to_string(),
                            confidence: 0.0,
                        },
                        latency_us,
                    );
                    decision.resolved_by = Some(tier_name.clone());
                    return Ok(ClassificationResult::unclassified(record));
                }
                Ok(Normalized::Label { label, confidence }) => {
                    if confidence >= stage.min_confidence {
                        decision.push(
                            tier_name,
                            AttemptOutcome::Accepted {
                                label: label.clone(),
                                confidence,
                            },
                            latency_us,
                        );
                        decision.resolved_by = Some(tier_name.clone());
                        return Ok(ClassificationResult::new(record, label, confidence));
                    }
                    decision.push(
                        tier_name,
                        AttemptOutcome::BelowThreshold { label, confidence },
                        latency_us,
                    );
                }
            }
        }

        Ok(ClassificationResult::unclassified(record))
    }

    /// The active routing policy
    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    /// Registered tier names
    pub fn tier_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stages.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::{PatternClassifier, PatternRule};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FixedTier {
        name: &'static str,
        tier: ClassifierTier,
        answer: Option<(&'static str, f32)>,
        fail: bool,
        calls: AtomicU32,
    }

    impl FixedTier {
        fn new(name: &'static str, tier: ClassifierTier, answer: Option<(&'static str, f32)>) -> Arc<Self> {
            Arc::new(Self {
                name,
                tier,
                answer,
                fail: false,
                calls: AtomicU32::new(0),
            })
        }

        fn failing(name: &'static str, tier: ClassifierTier) -> Arc<Self> {
            Arc::new(Self {
                name,
                tier,
                answer: None,
                fail: true,
                calls: AtomicU32::new(0),
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl Classifier for FixedTier {
        async fn classify(&self, _text: &str) -> Result<Option<TierMatch>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(Error::remote("quota exceeded"));
            }
            Ok(self.answer.map(|(label, score)| TierMatch::new(label, score)))
        }

        fn name(&self) -> &str {
            self.name
        }

        fn tier(&self) -> ClassifierTier {
            self.tier
        }
    }

    fn router(
        pattern: Arc<dyn Classifier>,
        semantic: Arc<dyn Classifier>,
        remote: Arc<dyn Classifier>,
    ) -> ClassificationRouter {
        ClassificationRouter::builder()
            .tier(pattern)
            .stage(TierStage::new(semantic).with_min_confidence(DEFAULT_SEMANTIC_THRESHOLD))
            .tier(remote)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_pattern_hit_short_circuits() {
        let rules = vec![PatternRule::literal("ClientError", "404")];
        let pattern = Arc::new(PatternClassifier::new(PATTERN_TIER, rules).unwrap());
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Error", 0.9)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, Some(("Workflow Error", 1.0)));
        let router = router(pattern, semantic.clone(), remote.clone());

        let result = router
            .route("WebServer", "404 Not Found - /api/users")
            .await
            .unwrap();

        assert_eq!(result.source, "WebServer");
        assert_eq!(result.message, "404 Not Found - /api/users");
        assert_eq!(result.label, "ClientError");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(semantic.calls(), 0);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_legacy_source_skips_cheap_tiers() {
        let rules = vec![PatternRule::literal("Failure", "failed")];
        let pattern = Arc::new(PatternClassifier::new(PATTERN_TIER, rules).unwrap());
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Error", 0.9)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, Some(("Workflow Error", 0.3)));
        let router = router(pattern, semantic.clone(), remote.clone());

        let (outcome, decision) = router
            .route_record(&LogRecord::new("LegacyCRM", "User login attempt failed"))
            .await;
        let result = outcome.unwrap();

        assert_eq!(result.label, "Workflow Error");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(decision.tiers_attempted(), vec![REMOTE_TIER]);
        assert_eq!(decision.route, "legacy");
        assert_eq!(semantic.calls(), 0);
        assert_eq!(remote.calls(), 1);
    }

    #[tokio::test]
    async fn test_semantic_accepts_at_threshold() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Security Alert", 0.5)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, None);
        let router = router(pattern, semantic, remote.clone());

        let result = router.route("ModernHR", "Multiple bad logins").await.unwrap();
        assert_eq!(result.label, "Security Alert");
        assert_eq!(result.confidence, 0.5);
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn test_label_returned_verbatim() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some((" Security Alert ", 0.9)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, None);
        let router = router(pattern, semantic, remote);

        let result = router.route("ModernHR", "Multiple bad logins").await.unwrap();
        assert_eq!(result.label, " Security Alert ");
    }

    #[tokio::test]
    async fn test_semantic_miss_is_unclassified() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Security Alert", 0.49)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, Some(("Workflow Error", 1.0)));
        let router = router(pattern, semantic, remote.clone());

        let (outcome, decision) = router
            .route_record(&LogRecord::new("ModernHR", "Something odd"))
            .await;
        let result = outcome.unwrap();

        assert!(result.is_unclassified());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(remote.calls(), 0);
        assert!(decision.resolved_by.is_none());
        assert!(matches!(
            decision.attempts[1].outcome,
            AttemptOutcome::BelowThreshold { .. }
        ));
    }

    #[tokio::test]
    async fn test_remote_failure_is_record_failure() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, None);
        let remote = FixedTier::failing(REMOTE_TIER, ClassifierTier::Remote);
        let router = router(pattern, semantic, remote);

        let failure = router.route("LegacyCRM", "Invoice 4 failed").await.unwrap_err();
        assert_eq!(failure.tier, REMOTE_TIER);
        assert!(failure.cause.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_semantic_failure_is_not_masked() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::failing(SEMANTIC_TIER, ClassifierTier::Semantic);
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, None);
        let router = router(pattern, semantic, remote);

        let failure = router.route("ModernCRM", "anything").await.unwrap_err();
        assert_eq!(failure.tier, SEMANTIC_TIER);
    }

    #[tokio::test]
    async fn test_sentinel_label_normalized() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, None);
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, Some((UNCLASSIFIED_LABEL, 1.0)));
        let router = router(pattern, semantic, remote);

        let (outcome, decision) = router
            .route_record(&LogRecord::new("LegacyCRM", "???"))
            .await;
        let result = outcome.unwrap();
        assert!(result.is_unclassified());
        assert_eq!(result.confidence, 0.0);
        assert_eq!(decision.resolved_by.as_deref(), Some(REMOTE_TIER));
    }

    #[tokio::test]
    async fn test_non_finite_score_is_failure() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Error", f32::NAN)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, None);
        let router = router(pattern, semantic, remote);

        let failure = router.route("ModernCRM", "x").await.unwrap_err();
        assert_eq!(failure.tier, SEMANTIC_TIER);
    }

    #[tokio::test]
    async fn test_escalation_policy_is_configurable() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, Some(("Error", 0.1)));
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, Some(("Workflow Error", 1.0)));

        let policy = RoutingPolicy::new(Route::new(
            "escalating",
            [PATTERN_TIER, SEMANTIC_TIER, REMOTE_TIER],
        ));
        let router = ClassificationRouter::builder()
            .tier(pattern)
            .stage(TierStage::new(semantic).with_min_confidence(0.5))
            .tier(remote.clone())
            .policy(policy)
            .build()
            .unwrap();

        let result = router.route("ModernCRM", "Order 17 stuck").await.unwrap();
        assert_eq!(result.label, "Workflow Error");
        assert_eq!(remote.calls(), 1);
    }

    #[test]
    fn test_unknown_tier_in_route_is_config_error() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let err = ClassificationRouter::builder()
            .tier(pattern)
            .build()
            .err()
            .unwrap();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_threshold_is_config_error() {
        let pattern = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let semantic = FixedTier::new(SEMANTIC_TIER, ClassifierTier::Semantic, None);
        let remote = FixedTier::new(REMOTE_TIER, ClassifierTier::Remote, None);
        let result = ClassificationRouter::builder()
            .tier(pattern)
            .stage(TierStage::new(semantic).with_min_confidence(1.5))
            .tier(remote)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_duplicate_tier_is_config_error() {
        let a = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let b = FixedTier::new(PATTERN_TIER, ClassifierTier::Pattern, None);
        let result = ClassificationRouter::builder()
            .tier(a)
            .tier(b)
            .policy(RoutingPolicy::new(Route::new("default", [PATTERN_TIER])))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_conventions() {
        let m = TierMatch::new("ClientError", 0.2);
        assert_eq!(
            normalize(ClassifierTier::Pattern, &m).unwrap(),
            Normalized::Label {
                label: "ClientError".to_string(),
                confidence: 1.0
            }
        );
        assert_eq!(
            normalize(ClassifierTier::Semantic, &m).unwrap(),
            Normalized::Label {
                label: "ClientError".to_string(),
                confidence: 0.2
            }
        );
        assert!(normalize(ClassifierTier::Remote, &TierMatch::new("  ", 1.0)).is_err());
    }

    #[test]
    fn test_policy_select() {
        let policy = RoutingPolicy::standard(&["LegacyCRM", "MainframeOps"]);
        assert_eq!(policy.select("LegacyCRM").tiers, vec![REMOTE_TIER]);
        assert_eq!(policy.select("MainframeOps").name, "legacy");
        assert_eq!(policy.select("legacycrm").name, "default");
        assert_eq!(policy.select("WebServer").tiers, vec![PATTERN_TIER, SEMANTIC_TIER]);
    }
}
