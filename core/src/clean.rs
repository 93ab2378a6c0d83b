//! Normalizes raw metadata rows into documents before tagging.
//!
//! Titles that are short and unrelated to virology are blanked, abstracts fall back to the
//! title, publisher boilerplate is stripped, abstracts repeated across many rows are dropped,
//! and rows with nothing left to show are removed.

use crate::document::{parse_date, Document, RawRecord};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// Titles shorter than this must look relevant to be kept.
const SHORT_TITLE_CHARS: usize = 30;
/// An abstract shared by more rows than this is boilerplate.
const MAX_ABSTRACT_REPEATS: usize = 2;

lazy_static! {
    static ref RELEVANT_TITLE: Regex = Regex::new(
        r"(?i)^.*(vir|sars|mers|corona|ncov|immun|nosocomial|epidem|emerg|vacc|cytokine)"
    )
    .expect("valid regex");
    static ref BOILERPLATE: Regex =
        Regex::new(r"(Publisher|Abstract|Summary|BACKGROUND|INTRODUCTION)").expect("valid regex");
}

pub fn clean_metadata(records: Vec<RawRecord>) -> Vec<Document> {
    let before = records.len();
    let mut docs: Vec<Document> = records.into_iter().map(clean_record).collect();
    blank_common_abstracts(&mut docs);
    docs.retain(|d| !is_missing(d));
    tracing::info!(before, after = docs.len(), "cleaned metadata");
    docs
}

fn clean_record(rec: RawRecord) -> Document {
    let title = rec.title.map(clean_title);
    let abstract_text = rec
        .abstract_text
        .filter(|a| a != "Unknown")
        .or_else(|| title.clone())
        .map(|a| BOILERPLATE.replace_all(&a, "").into_owned())
        .unwrap_or_default();
    let published = rec.publish_time.as_deref().and_then(|raw| {
        let parsed = parse_date(raw);
        if parsed.is_none() && !raw.trim().is_empty() {
            tracing::warn!(publish_time = raw, "unparseable publish time, treating as unknown");
        }
        parsed
    });
    Document {
        sha: rec.sha.filter(|s| !s.trim().is_empty()),
        title,
        abstract_text,
        published,
        has_text: rec.has_full_text,
        full_text_file: rec.full_text_file.filter(|s| !s.trim().is_empty()),
        doi: rec.doi.unwrap_or_default(),
        authors: rec.authors.unwrap_or_default(),
        journal: rec.journal.unwrap_or_default(),
        ..Default::default()
    }
}

fn clean_title(title: String) -> String {
    let junk = title.chars().count() < SHORT_TITLE_CHARS && !RELEVANT_TITLE.is_match(&title);
    if junk {
        String::new()
    } else {
        title
    }
}

fn blank_common_abstracts(docs: &mut [Document]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for d in docs.iter().filter(|d| !d.abstract_text.is_empty()) {
        *counts.entry(d.abstract_text.clone()).or_insert(0) += 1;
    }
    for d in docs.iter_mut() {
        if counts.get(&d.abstract_text).is_some_and(|&n| n > MAX_ABSTRACT_REPEATS) {
            d.abstract_text.clear();
        }
    }
}

fn is_missing(d: &Document) -> bool {
    d.published.is_none() && d.sha.is_none() && d.title_str().is_empty() && d.abstract_text.is_empty()
}
