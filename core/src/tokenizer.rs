use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

/// Common English function words.
const ENGLISH_STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "can't", "cannot", "could", "couldn't", "did", "didn't", "do", "does",
    "doesn't", "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had",
    "hadn't", "has", "hasn't", "have", "haven't", "having", "he", "he'd", "he'll", "he's", "her",
    "here", "here's", "hers", "herself", "him", "himself", "his", "how", "how's", "i", "i'd",
    "i'll", "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself",
    "let's", "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of", "off",
    "on", "once", "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own",
    "same", "she", "she'd", "she'll", "she's", "should", "shouldn't", "so", "some", "such", "than",
    "that", "that's", "the", "their", "theirs", "them", "themselves", "then", "there", "there's",
    "these", "they", "they'd", "they'll", "they're", "they've", "this", "those", "through", "to",
    "too", "under", "until", "up", "very", "was", "wasn't", "we", "we'd", "we'll", "we're", "we've",
    "were", "weren't", "what", "what's", "when", "when's", "where", "where's", "which", "while",
    "who", "who's", "whom", "why", "why's", "with", "won't", "would", "wouldn't", "you", "you'd",
    "you'll", "you're", "you've", "your", "yours", "yourself", "yourselves",
];

/// Words that appear throughout scholarly text and say nothing about its topic.
const PAPER_STOPWORDS: &[&str] = &[
    "al", "also", "author", "authors", "copyright", "doi", "et", "fig", "figure", "funder",
    "however", "license", "preprint", "reserved", "rights", "table", "thus", "within",
];

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> =
        ENGLISH_STOPWORDS.iter().chain(PAPER_STOPWORDS).copied().collect();
}

/// True for function words and publication boilerplate. Expects a lower-cased token.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Reduce text to index terms: NFKC normalization, lowercase, stopword removal and
/// English stemming. Term order follows the text; empty input gives an empty list.
pub fn preprocess(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    WORD.find_iter(&normalized)
        .map(|m| m.as_str())
        .filter(|token| !is_stopword(token))
        .map(|token| STEMMER.stem(token).into_owned())
        .collect()
}
