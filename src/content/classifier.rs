//! First-match keyword classifier for free-text group messages.
//!
//! Rules are scanned in their declared order and the first category whose
//! keyword occurs in the normalized text wins. No weighting, no
//! multi-category results, no confidence score. The fixed scan order makes
//! the classifier fully deterministic.

use std::str::FromStr;
use tracing::warn;

use crate::config::CategoryRule;
use crate::content::normalize;
use crate::types::ContentCategory;

pub struct Classifier {
    rules: Vec<(ContentCategory, Vec<String>)>,
}

impl Classifier {
    /// Build a classifier from ordered config rules. Rules whose name is
    /// not a known category are dropped with a warning.
    pub fn new(rules: &[CategoryRule]) -> Self {
        let mut parsed = Vec::with_capacity(rules.len());
        for rule in rules {
            match ContentCategory::from_str(&rule.name) {
                Ok(category) => {
                    let keywords = rule.keywords.iter().map(|k| normalize(k)).collect();
                    parsed.push((category, keywords));
                }
                Err(_) => warn!(name = %rule.name, "Dropping unknown classifier category"),
            }
        }
        Self { rules: parsed }
    }

    /// Classify a message. Returns `ContentCategory::Other` when no
    /// keyword matches.
    pub fn classify(&self, text: &str) -> ContentCategory {
        let normalized = normalize(text);
        for (category, keywords) in &self.rules {
            if keywords.iter().any(|k| normalized.contains(k.as_str())) {
                return *category;
            }
        }
        ContentCategory::Other
    }
}
