//! Pattern-based classifier (deterministic tier)
//!
//! Rules are evaluated as a whole: regex rules compile into one `RegexSet`,
//! literal rules into one Aho-Corasick automaton. When several rules match, the
//! rule defined first wins.

use crate::classifier::{ClassificationMetadata, Classifier, ClassifierTier, TierMatch};
use aho_corasick::AhoCorasick;
use logtriage_core::{Error, Result};
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// One entry of the rule table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Label assigned when the rule fires
    pub label: String,

    /// Regular expression or literal substring
    pub pattern: String,

    /// How `pattern` is interpreted
    #[serde(default)]
    pub kind: RuleKind,
}

impl PatternRule {
    /// Create a regex rule
    pub fn regex(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            kind: RuleKind::Regex,
        }
    }

    /// Create a literal substring rule
    pub fn literal(label: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pattern: pattern.into(),
            kind: RuleKind::Literal,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    #[default]
    Regex,
    Literal,
}

/// A rule that fired
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit<'a> {
    pub label: &'a str,
    pub rule_index: usize,
    pub span: (usize, usize),
}

struct RegexRules {
    set: RegexSet,
    // Individual regexes, for span extraction of the winner
    regexes: Vec<Regex>,
    // Set index -> rule index
    rule_indices: Vec<usize>,
}

struct LiteralRules {
    automaton: AhoCorasick,
    rule_indices: Vec<usize>,
}

/// Fast pattern-based classifier
pub struct PatternClassifier {
    name: String,
    labels: Vec<String>,
    regex_rules: Option<RegexRules>,
    literal_rules: Option<LiteralRules>,
}

impl PatternClassifier {
    /// Create a new case-insensitive pattern classifier
    pub fn new(name: impl Into<String>, rules: Vec<PatternRule>) -> Result<Self> {
        Self::with_case_sensitivity(name, rules, true)
    }

    /// Create a new pattern classifier with explicit case handling
    pub fn with_case_sensitivity(
        name: impl Into<String>,
        rules: Vec<PatternRule>,
        case_insensitive: bool,
    ) -> Result<Self> {
        let mut labels = Vec::with_capacity(rules.len());
        let mut regex_patterns = Vec::new();
        let mut regex_indices = Vec::new();
        let mut literal_patterns = Vec::new();
        let mut literal_indices = Vec::new();

        for (index, rule) in rules.into_iter().enumerate() {
            if rule.pattern.is_empty() {
                return Err(Error::config(format!(
                    "Pattern rule {} ({}) has an empty pattern",
                    index, rule.label
                )));
            }
            match rule.kind {
                RuleKind::Regex => {
                    regex_patterns.push(rule.pattern);
                    regex_indices.push(index);
                }
                RuleKind::Literal => {
                    literal_patterns.push(rule.pattern);
                    literal_indices.push(index);
                }
            }
            labels.push(rule.label);
        }

        let regex_rules = if regex_patterns.is_empty() {
            None
        } else {
            let set = RegexSetBuilder::new(&regex_patterns)
                .case_insensitive(case_insensitive)
                .build()
                .map_err(|e| Error::config(format!("Failed to build rule set: {}", e)))?;

            let regexes = regex_patterns
                .iter()
                .map(|p| {
                    RegexBuilder::new(p)
                        .case_insensitive(case_insensitive)
                        .build()
                        .map_err(|e| Error::config(format!("Invalid rule pattern {:?}: {}", p, e)))
                })
                .collect::<Result<Vec<_>>>()?;

            Some(RegexRules {
                set,
                regexes,
                rule_indices: regex_indices,
            })
        };

        let literal_rules = if literal_patterns.is_empty() {
            None
        } else {
            let automaton = AhoCorasick::builder()
                .ascii_case_insensitive(case_insensitive)
                .build(&literal_patterns)
                .map_err(|e| Error::config(format!("Failed to build pattern matcher: {}", e)))?;

            Some(LiteralRules {
                automaton,
                rule_indices: literal_indices,
            })
        };

        Ok(Self {
            name: name.into(),
            labels,
            regex_rules,
            literal_rules,
        })
    }

    /// Number of rules in the table
    pub fn rule_count(&self) -> usize {
        self.labels.len()
    }

    /// Find the first-defined rule matching `text`
    ///
    /// Pure and infallible. The empty string never matches.
    pub fn find(&self, text: &str) -> Option<PatternHit<'_>> {
        if text.is_empty() {
            return None;
        }

        let regex_hit = self.regex_rules.as_ref().and_then(|rules| {
            // SetMatches iterates in ascending set order, which is definition order.
            let set_index = rules.set.matches(text).iter().next()?;
            let span = rules.regexes[set_index]
                .find(text)
                .map(|m| (m.start(), m.end()))
                .unwrap_or((0, 0));
            Some((rules.rule_indices[set_index], span))
        });

        let literal_hit = self.literal_rules.as_ref().and_then(|rules| {
            rules
                .automaton
                .find_overlapping_iter(text)
                .map(|m| (rules.rule_indices[m.pattern().as_usize()], (m.start(), m.end())))
                .min_by_key(|(rule_index, span)| (*rule_index, span.0))
        });

        let (rule_index, span) = match (regex_hit, literal_hit) {
            (Some(r), Some(l)) => {
                if r.0 < l.0 {
                    r
                } else {
                    l
                }
            }
            (Some(hit), None) | (None, Some(hit)) => hit,
            (None, None) => return None,
        };

        Some(PatternHit {
            label: &self.labels[rule_index],
            rule_index,
            span,
        })
    }
}

#[async_trait::async_trait]
impl Classifier for PatternClassifier {
    async fn classify(&self, text: &str) -> Result<Option<TierMatch>> {
        let start = Instant::now();

        let Some(hit) = self.find(text) else {
            return Ok(None);
        };

        Ok(Some(TierMatch {
            label: hit.label.to_string(),
            score: 1.0, // Pattern matches are binary
            metadata: ClassificationMetadata {
                spans: vec![hit.span],
                rule_index: Some(hit.rule_index),
                ..Default::default()
            },
            latency_us: start.elapsed().as_micros() as u64,
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> ClassifierTier {
        ClassifierTier::Pattern
    }
}
