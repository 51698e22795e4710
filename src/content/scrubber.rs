//! Group-message scrubbing: phone numbers, links, and banned words.
//!
//! A match means the message should be deleted from the group (when the
//! group has content-scrubbing enabled) and the sender warned.

use anyhow::{Context, Result};
use regex::Regex;

/// Default forbidden patterns: 10-digit phone numbers, http/https links,
/// and WhatsApp solicitations.
const DEFAULT_PATTERNS: &[&str] = &[
    r"\d{10}",
    r"(?i)https?://",
    r"واتساب|واتس",
];

pub struct Scrubber {
    patterns: Vec<Regex>,
}

impl Scrubber {
    /// Scrubber with the default pattern set.
    pub fn new() -> Result<Self> {
        Self::with_patterns(DEFAULT_PATTERNS.iter().copied())
    }

    /// Scrubber with custom patterns (each a regex).
    pub fn with_patterns<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Result<Self> {
        let compiled = patterns
            .into_iter()
            .map(|p| Regex::new(p).with_context(|| format!("Invalid scrub pattern: {p}")))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns: compiled })
    }

    /// Whether the message violates the content rules and should be removed.
    pub fn should_remove(&self, text: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(text))
    }
}
