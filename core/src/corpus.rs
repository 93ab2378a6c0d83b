//! The working collection of papers and its cached ranking index.
//!
//! Every filter returns a new `Corpus` owning copies of the selected documents, in their
//! original relative order. A corpus owns at most one index; derived views start without
//! one and build their own on first search.

use crate::clean::clean_metadata;
use crate::config::Bm25Params;
use crate::document::{Document, RawRecord, Tag};
use crate::error::{CorpusError, Result};
use crate::index::Bm25Index;
use crate::tags::{apply_tags, tag_antivirals, SARS_COV_2_DATE, SARS_DATE};
use crate::tokenizer::preprocess;
use parking_lot::RwLock;
use rand::Rng;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use time::Date;

/// Columns every input row must carry, possibly as null, with accepted aliases.
const REQUIRED_COLUMNS: &[(&str, &[&str])] = &[
    ("sha", &[]),
    ("title", &[]),
    ("abstract", &[]),
    ("publish_time", &[]),
    ("has_full_text", &["has_text"]),
    ("full_text_file", &[]),
];

#[derive(Debug)]
pub struct Corpus {
    docs: Vec<Document>,
    index: RwLock<Option<Arc<Bm25Index>>>,
    params: Bm25Params,
}

/// Text columns that substring and pattern filters can look at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Sha,
    Title,
    Abstract,
    Authors,
    Journal,
    Doi,
}

impl TextField {
    pub fn text<'a>(&self, doc: &'a Document) -> &'a str {
        match self {
            TextField::Sha => doc.sha.as_deref().unwrap_or(""),
            TextField::Title => doc.title_str(),
            TextField::Abstract => &doc.abstract_text,
            TextField::Authors => &doc.authors,
            TextField::Journal => &doc.journal,
            TextField::Doi => &doc.doi,
        }
    }
}

impl FromStr for TextField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sha" => Ok(TextField::Sha),
            "title" => Ok(TextField::Title),
            "abstract" => Ok(TextField::Abstract),
            "authors" => Ok(TextField::Authors),
            "journal" => Ok(TextField::Journal),
            "doi" => Ok(TextField::Doi),
            other => Err(format!("unknown field: {other}")),
        }
    }
}

impl fmt::Display for TextField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextField::Sha => "sha",
            TextField::Title => "title",
            TextField::Abstract => "abstract",
            TextField::Authors => "authors",
            TextField::Journal => "journal",
            TextField::Doi => "doi",
        };
        f.write_str(name)
    }
}

/// Aggregate counts over a corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusSummary {
    pub papers: usize,
    pub oldest: Option<Date>,
    pub newest: Option<Date>,
    pub covid_related: usize,
    pub sars: usize,
    pub coronavirus: usize,
    pub virus: usize,
    pub antivirals: usize,
}

impl Corpus {
    /// Validate loosely typed rows, then clean, tag and tokenize them.
    ///
    /// Fails when a row is not an object or lacks one of the required columns. Null values
    /// are fine and become empty strings or unknown dates.
    pub fn from_rows(rows: Vec<Value>, params: Bm25Params) -> Result<Self> {
        let mut records = Vec::with_capacity(rows.len());
        for (row, value) in rows.into_iter().enumerate() {
            let obj = value.as_object().ok_or(CorpusError::NotARecord { row })?;
            for &(column, aliases) in REQUIRED_COLUMNS {
                let present = obj.contains_key(column) || aliases.iter().any(|a| obj.contains_key(*a));
                if !present {
                    return Err(CorpusError::MissingColumn { row, column });
                }
            }
            let record: RawRecord =
                serde_json::from_value(value).map_err(|source| CorpusError::InvalidRow { row, source })?;
            records.push(record);
        }
        Ok(Self::from_records(records, params))
    }

    /// Clean, tag and tokenize abstracts. The index is built on first search, so a corpus
    /// that is re-tokenized from full texts is only indexed once.
    pub fn from_records(records: Vec<RawRecord>, params: Bm25Params) -> Self {
        let mut docs = clean_metadata(records);
        apply_tags(&mut docs);
        tracing::info!(num_docs = docs.len(), "indexing research papers from abstracts");
        for d in docs.iter_mut() {
            d.tokens = preprocess(&d.abstract_text);
        }
        tag_antivirals(&mut docs);
        Self::from_documents(docs, params)
    }

    /// Wrap documents that are already cleaned, tagged and tokenized. The index is built
    /// on first use.
    pub fn from_documents(docs: Vec<Document>, params: Bm25Params) -> Self {
        Self { docs, index: RwLock::new(None), params }
    }

    /// A new corpus whose tokens come from full texts, keyed by paper identifier. Rows with
    /// several identifiers take the first one that has tokens; rows with none get no tokens.
    pub fn with_text_tokens(&self, texts: &HashMap<String, Vec<String>>) -> Corpus {
        tracing::info!(num_docs = self.docs.len(), num_texts = texts.len(), "indexing research papers from texts");
        let mut docs = self.docs.clone();
        for d in docs.iter_mut() {
            let tokens = d
                .ids()
                .find_map(|id| texts.get(id).filter(|t| !t.is_empty()))
                .cloned()
                .unwrap_or_default();
            d.tokens = tokens;
        }
        tag_antivirals(&mut docs);
        let corpus = Self::from_documents(docs, self.params);
        corpus.index();
        corpus
    }

    /// The ranking index, building it first if this corpus has none yet. Concurrent callers
    /// see either no index or a complete one; only one of them builds it.
    pub fn index(&self) -> Arc<Bm25Index> {
        if let Some(idx) = self.index.read().as_ref() {
            return Arc::clone(idx);
        }
        let mut slot = self.index.write();
        if let Some(idx) = slot.as_ref() {
            return Arc::clone(idx);
        }
        tracing::debug!(num_docs = self.docs.len(), "building index on demand");
        let idx = Arc::new(Bm25Index::build(self.docs.iter().map(|d| d.tokens.as_slice()), self.params));
        *slot = Some(Arc::clone(&idx));
        idx
    }

    pub fn has_index(&self) -> bool {
        self.index.read().is_some()
    }

    pub fn params(&self) -> Bm25Params {
        self.params
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn documents(&self) -> &[Document] {
        &self.docs
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Document> {
        self.docs.iter()
    }

    /// Mutable access drops the index; it is rebuilt on the next search.
    pub fn documents_mut(&mut self) -> &mut [Document] {
        *self.index.get_mut() = None;
        &mut self.docs
    }

    pub fn get(&self, row: usize) -> Option<&Document> {
        self.docs.get(row)
    }

    pub fn get_mut(&mut self, row: usize) -> Option<&mut Document> {
        *self.index.get_mut() = None;
        self.docs.get_mut(row)
    }

    /// The first paper carrying `id` among its identifiers.
    pub fn find(&self, id: &str) -> Option<&Document> {
        self.docs.iter().find(|d| d.has_id(id))
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.docs.iter().map(Document::title_str)
    }

    fn derive(&self, docs: Vec<Document>) -> Corpus {
        Corpus::from_documents(docs, self.params)
    }

    pub fn filter<F>(&self, predicate: F) -> Corpus
    where
        F: Fn(&Document) -> bool,
    {
        self.derive(self.docs.iter().filter(|d| predicate(d)).cloned().collect())
    }

    pub fn filter_by_tag(&self, tag: Tag) -> Corpus {
        self.filter(|d| d.tags.get(tag))
    }

    pub fn covid_related(&self) -> Corpus {
        self.filter_by_tag(Tag::CovidRelated)
    }

    pub fn not_covid_related(&self) -> Corpus {
        self.filter(|d| !d.tags.covid_related)
    }

    /// Papers published on or after `start` and strictly before `end`. Unknown dates are
    /// kept only when `include_unknown` is set.
    pub fn filter_by_date_range(&self, start: Option<Date>, end: Option<Date>, include_unknown: bool) -> Corpus {
        self.filter(|d| match d.published {
            Some(p) => start.map_or(true, |s| p >= s) && end.map_or(true, |e| p < e),
            None => include_unknown,
        })
    }

    pub fn after(&self, date: Date, include_unknown: bool) -> Corpus {
        self.filter_by_date_range(Some(date), None, include_unknown)
    }

    pub fn before(&self, date: Date, include_unknown: bool) -> Corpus {
        self.filter_by_date_range(None, Some(date), include_unknown)
    }

    pub fn since_sars(&self, include_unknown: bool) -> Corpus {
        self.after(SARS_DATE, include_unknown)
    }

    pub fn before_sars(&self, include_unknown: bool) -> Corpus {
        self.before(SARS_DATE, include_unknown)
    }

    pub fn since_sarscov2(&self, include_unknown: bool) -> Corpus {
        self.after(SARS_COV_2_DATE, include_unknown)
    }

    pub fn before_sarscov2(&self, include_unknown: bool) -> Corpus {
        self.before(SARS_COV_2_DATE, include_unknown)
    }

    pub fn with_text(&self) -> Corpus {
        self.filter(|d| d.has_text)
    }

    /// Papers whose full text lives in the named source catalog.
    pub fn catalog(&self, name: &str) -> Corpus {
        self.filter(|d| d.full_text_file.as_deref() == Some(name))
    }

    /// Case-sensitive substring match on a text column.
    pub fn contains(&self, needle: &str, field: TextField) -> Corpus {
        self.filter(|d| field.text(d).contains(needle))
    }

    /// Regex match anchored at the start of a text column.
    pub fn filter_by_pattern(&self, pattern: &str, field: TextField) -> Result<Corpus> {
        let re = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(self.filter(|d| re.is_match(field.text(d))))
    }

    pub fn head(&self, n: usize) -> Corpus {
        self.derive(self.docs.iter().take(n).cloned().collect())
    }

    pub fn tail(&self, n: usize) -> Corpus {
        let skip = self.docs.len().saturating_sub(n);
        self.derive(self.docs[skip..].to_vec())
    }

    /// `n` papers chosen at random, kept in corpus order.
    pub fn sample(&self, n: usize) -> Corpus {
        self.sample_with(n, &mut rand::thread_rng())
    }

    pub fn sample_with<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Corpus {
        let amount = n.min(self.docs.len());
        let mut rows = rand::seq::index::sample(rng, self.docs.len(), amount).into_vec();
        rows.sort_unstable();
        self.derive(rows.into_iter().map(|r| self.docs[r].clone()).collect())
    }

    pub fn summary(&self) -> CorpusSummary {
        let dates = self.docs.iter().filter_map(|d| d.published);
        let count = |f: fn(&Document) -> bool| self.docs.iter().filter(|d| f(d)).count();
        CorpusSummary {
            papers: self.docs.len(),
            oldest: dates.clone().min(),
            newest: dates.max(),
            covid_related: count(|d| d.tags.covid_related),
            sars: count(|d| d.tags.sars),
            coronavirus: count(|d| d.tags.coronavirus),
            virus: count(|d| d.tags.virus),
            antivirals: count(|d| !d.antivirals.is_empty()),
        }
    }
}
