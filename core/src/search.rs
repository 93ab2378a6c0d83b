//! Ranked free-text search over a corpus.

use crate::config::{SearchConfig, DEFAULT_RESULTS, MINIMUM_SEARCH_SCORE};
use crate::corpus::Corpus;
use crate::text::{doi_url, summarize};
use crate::tokenizer::preprocess;
use std::time::Instant;
use time::Date;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub limit: usize,
    /// Keep only papers tagged `covid_related`.
    pub covid_related: bool,
    /// Inclusive lower bound on the publication date.
    pub start_date: Option<Date>,
    /// Exclusive upper bound on the publication date.
    pub end_date: Option<Date>,
    /// Hits must score strictly above this after rounding.
    pub min_score: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RESULTS,
            covid_related: false,
            start_date: None,
            end_date: None,
            min_score: MINIMUM_SEARCH_SCORE,
        }
    }
}

impl SearchOptions {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self { limit: config.default_limit, min_score: config.min_score, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Position within the result set, from 0.
    pub row: usize,
    /// Position of the paper in the searched corpus.
    pub source_row: usize,
    pub sha: Option<String>,
    pub title: String,
    pub abstract_text: String,
    pub summary: String,
    /// BM25 score rounded to one decimal.
    pub score: f64,
    pub url: String,
    pub published: Option<Date>,
    pub authors: String,
    pub journal: String,
    pub covid_related: bool,
}

/// Hits ordered by descending score.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    query: String,
    hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn get(&self, row: usize) -> Option<&SearchHit> {
        self.hits.get(row)
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SearchHit> {
        self.hits.iter()
    }
}

impl<'a> IntoIterator for &'a SearchResults {
    type Item = &'a SearchHit;
    type IntoIter = std::slice::Iter<'a, SearchHit>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}

fn round1(score: f64) -> f64 {
    (score * 10.0).round() / 10.0
}

impl Corpus {
    /// Score every paper against `query`, then keep the best ones that pass the tag, date
    /// and score filters. Unknown dates never pass a date bound. An empty or unmatched
    /// query gives empty results.
    pub fn search(&self, query: &str, opts: &SearchOptions) -> SearchResults {
        let start = Instant::now();
        let terms = preprocess(query);
        let scores = self.index().scores(&terms);

        let mut ranked: Vec<usize> = (0..scores.len()).collect();
        // Stable: equal scores keep corpus order.
        ranked.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let docs = self.documents();
        let hits: Vec<SearchHit> = ranked
            .into_iter()
            .map(|r| (r, round1(scores[r])))
            .filter(|&(r, _)| !opts.covid_related || docs[r].tags.covid_related)
            .filter(|&(r, _)| match opts.start_date {
                Some(s) => docs[r].published.is_some_and(|p| p >= s),
                None => true,
            })
            .filter(|&(r, _)| match opts.end_date {
                Some(e) => docs[r].published.is_some_and(|p| p < e),
                None => true,
            })
            .filter(|&(_, score)| score > opts.min_score)
            .take(opts.limit)
            .enumerate()
            .map(|(row, (source_row, score))| {
                let d = &docs[source_row];
                SearchHit {
                    row,
                    source_row,
                    sha: d.sha.clone(),
                    title: d.title_str().to_string(),
                    abstract_text: d.abstract_text.clone(),
                    summary: summarize(&d.abstract_text),
                    score,
                    url: doi_url(&d.doi),
                    published: d.published,
                    authors: d.authors.clone(),
                    journal: d.journal.clone(),
                    covid_related: d.tags.covid_related,
                }
            })
            .collect();

        tracing::debug!(
            query,
            num_terms = terms.len(),
            hits = hits.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search complete"
        );
        SearchResults { query: query.to_string(), hits }
    }
}
