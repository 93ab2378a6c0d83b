//! BM25 Okapi index over per-document token lists.
//!
//! Documents are keyed by their position in the corpus. The index is built once from a
//! snapshot of token lists and never updated; a changed corpus gets a new index.

use crate::config::Bm25Params;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::time::Instant;

pub type TermId = u32;
pub type DocId = u32;

/// Stand-in tokens used when no document has any.
pub const PLACEHOLDER_TOKENS: [&str; 2] = ["no", "tokens"];

lazy_static! {
    static ref PLACEHOLDER: Vec<String> = PLACEHOLDER_TOKENS.iter().map(|s| s.to_string()).collect();
}

#[derive(Debug, Clone, Copy)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

#[derive(Debug)]
pub struct Bm25Index {
    dictionary: HashMap<String, TermId>,
    /// Number of documents containing each term, by term id.
    df: Vec<u32>,
    idf: Vec<f64>,
    /// Postings by term id, sorted by doc id.
    postings: Vec<Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avgdl: f64,
    /// Corpus rows the index answers for. May be smaller than `doc_lengths` when a
    /// placeholder document was appended to an empty corpus.
    num_rows: usize,
    placeholder: bool,
    params: Bm25Params,
}

impl Bm25Index {
    /// Build from token lists in row order. If no row has a single token, row 0 (or an
    /// extra row, for an empty corpus) is indexed as [`PLACEHOLDER_TOKENS`] so the
    /// statistics stay well defined.
    pub fn build<'a, I>(token_lists: I, params: Bm25Params) -> Self
    where
        I: IntoIterator<Item = &'a [String]>,
    {
        let start = Instant::now();
        let mut lists: Vec<&[String]> = token_lists.into_iter().collect();
        let num_rows = lists.len();

        let placeholder = lists.iter().all(|l| l.is_empty());
        if placeholder {
            tracing::warn!(num_rows, "no indexable tokens, using placeholder document");
            match lists.first_mut() {
                Some(first) => *first = PLACEHOLDER.as_slice(),
                None => lists.push(PLACEHOLDER.as_slice()),
            }
        }

        let mut dictionary: HashMap<String, TermId> = HashMap::new();
        let mut df: Vec<u32> = Vec::new();
        let mut postings: Vec<Vec<Posting>> = Vec::new();
        let mut doc_lengths: Vec<u32> = Vec::with_capacity(lists.len());

        for (doc_id, tokens) in lists.iter().enumerate() {
            doc_lengths.push(tokens.len() as u32);
            let mut tf_counts: HashMap<TermId, u32> = HashMap::new();
            for term in tokens.iter() {
                let tid = match dictionary.get(term.as_str()) {
                    Some(&tid) => tid,
                    None => {
                        let tid = dictionary.len() as TermId;
                        dictionary.insert(term.clone(), tid);
                        df.push(0);
                        postings.push(Vec::new());
                        tid
                    }
                };
                *tf_counts.entry(tid).or_insert(0) += 1;
            }
            for (tid, tf) in tf_counts {
                df[tid as usize] += 1;
                postings[tid as usize].push(Posting { doc_id: doc_id as DocId, tf });
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| l as u64).sum();
        let avgdl = total as f64 / doc_lengths.len() as f64;
        let idf = compute_idf(&df, doc_lengths.len(), params.epsilon);

        tracing::info!(
            num_docs = doc_lengths.len(),
            num_terms = dictionary.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built BM25 index"
        );
        Self { dictionary, df, idf, postings, doc_lengths, avgdl, num_rows, placeholder, params }
    }

    /// One non-negative score per corpus row. Repeated query terms count repeatedly;
    /// terms missing from the dictionary contribute nothing.
    pub fn scores(&self, query: &[String]) -> Vec<f64> {
        let mut scores = vec![0.0; self.num_rows];
        let Bm25Params { k1, b, .. } = self.params;
        for term in query {
            let Some(&tid) = self.dictionary.get(term.as_str()) else { continue };
            let idf = self.idf[tid as usize];
            for p in &self.postings[tid as usize] {
                let row = p.doc_id as usize;
                if row >= self.num_rows {
                    continue;
                }
                let tf = p.tf as f64;
                let dl = self.doc_lengths[row] as f64;
                scores[row] += idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * dl / self.avgdl));
            }
        }
        scores
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_terms(&self) -> usize {
        self.dictionary.len()
    }

    pub fn doc_freq(&self, term: &str) -> u32 {
        self.dictionary.get(term).map_or(0, |&tid| self.df[tid as usize])
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.dictionary.get(term).map(|&tid| self.idf[tid as usize])
    }

    pub fn average_doc_length(&self) -> f64 {
        self.avgdl
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

// idf = ln(N - n + 0.5) - ln(n + 0.5). Terms in more than half the documents would go
// negative and instead get epsilon times the mean idf, never below zero.
fn compute_idf(df: &[u32], num_docs: usize, epsilon: f64) -> Vec<f64> {
    if df.is_empty() {
        return Vec::new();
    }
    let n = num_docs as f64;
    let mut idf: Vec<f64> = df
        .iter()
        .map(|&d| (n - d as f64 + 0.5).ln() - (d as f64 + 0.5).ln())
        .collect();
    let mean = idf.iter().sum::<f64>() / idf.len() as f64;
    let floor = (epsilon * mean).max(0.0);
    for v in idf.iter_mut().filter(|v| **v < 0.0) {
        *v = floor;
    }
    idf
}
