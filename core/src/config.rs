//! Tunable constants for ranking and querying.
//!
//! The defaults are the empirically tuned values the engine has always used. They can be
//! overridden from a JSON file or from `CORD_*` environment variables.

use crate::error::Result;
use serde::Deserialize;
use std::path::Path;

/// Rows whose rounded score does not exceed this are never returned.
pub const MINIMUM_SEARCH_SCORE: f64 = 2.0;
/// Queries shorter than this are ignored by interactive callers.
pub const MINIMUM_QUERY_CHARS: usize = 4;
pub const DEFAULT_RESULTS: usize = 10;

/// BM25 Okapi parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
    /// Fraction of the mean idf substituted for terms whose idf would be negative.
    pub epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: 1.5, b: 0.75, epsilon: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_limit: usize,
    pub min_score: f64,
    pub min_query_chars: usize,
    pub bm25: Bm25Params,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_RESULTS,
            min_score: MINIMUM_SEARCH_SCORE,
            min_query_chars: MINIMUM_QUERY_CHARS,
            bm25: Bm25Params::default(),
        }
    }
}

impl SearchConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let buf = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Defaults overlaid with `CORD_RESULTS`, `CORD_MIN_SCORE` and `CORD_MIN_QUERY_CHARS`.
    pub fn from_env() -> Self {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup. Unparseable values are logged and skipped.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var::<usize>(&lookup, "CORD_RESULTS") {
            self.default_limit = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "CORD_MIN_SCORE") {
            self.min_score = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "CORD_MIN_QUERY_CHARS") {
            self.min_query_chars = v;
        }
        self
    }

    /// Whether an interactive query is long enough to be worth running.
    pub fn accepts_query(&self, query: &str) -> bool {
        query.trim().chars().count() >= self.min_query_chars
    }
}

fn parse_var<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparseable config value");
            None
        }
    }
}
