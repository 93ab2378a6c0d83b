//! Presentation helpers for search hits: summaries, shortened text, links and dates.

use crate::tokenizer::preprocess;
use std::collections::HashMap;
use time::macros::format_description;
use time::Date;

pub const SUMMARY_SENTENCES: usize = 2;

/// A resolvable link for a DOI, or `#` when there is none.
pub fn doi_url(doi: &str) -> String {
    let doi = doi.trim();
    if doi.is_empty() {
        "#".to_string()
    } else if doi.starts_with("doi.org") {
        format!("http://{doi}")
    } else {
        format!("http://doi.org/{doi}")
    }
}

/// Cut `text` to at most `width` characters on a word boundary, marking the cut with `...`.
pub fn shorten(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(3)).collect();
    let trimmed = match cut.rfind(char::is_whitespace) {
        Some(pos) if pos > 0 => &cut[..pos],
        _ => cut.as_str(),
    };
    format!("{}...", trimmed.trim_end())
}

/// Split on `.`, `!` or `?` followed by whitespace.
pub fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            let at_break = chars.peek().map_or(true, |&(_, n)| n.is_whitespace());
            if at_break {
                let end = i + c.len_utf8();
                let s = text[start..end].trim();
                if !s.is_empty() {
                    out.push(s);
                }
                start = end;
            }
        }
    }
    let rest = text[start..].trim();
    if !rest.is_empty() {
        out.push(rest);
    }
    out
}

/// Extractive summary: the sentences whose terms are most frequent across the whole text,
/// in their original order.
pub fn summarize(text: &str) -> String {
    let sents = sentences(text);
    if sents.len() <= SUMMARY_SENTENCES {
        return sents.join(" ");
    }
    let mut freq: HashMap<String, usize> = HashMap::new();
    let sent_tokens: Vec<Vec<String>> = sents.iter().map(|s| preprocess(s)).collect();
    for t in sent_tokens.iter().flatten() {
        *freq.entry(t.clone()).or_insert(0) += 1;
    }
    let mut scored: Vec<(usize, f64)> = sent_tokens
        .iter()
        .enumerate()
        .map(|(i, toks)| {
            let total: usize = toks.iter().map(|t| freq[t]).sum();
            (i, total as f64 / (toks.len().max(1) as f64).sqrt())
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut keep: Vec<usize> = scored.iter().take(SUMMARY_SENTENCES).map(|&(i, _)| i).collect();
    keep.sort_unstable();
    keep.iter().map(|&i| sents[i]).collect::<Vec<_>>().join(" ")
}

pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn doi_links() {
        assert_eq!(doi_url(""), "#");
        assert_eq!(doi_url("10.1016/j.x"), "http://doi.org/10.1016/j.x");
        assert_eq!(doi_url("doi.org/10.1016/j.x"), "http://doi.org/10.1016/j.x");
    }

    #[test]
    fn shorten_breaks_on_words() {
        assert_eq!(shorten("short", 10), "short");
        assert_eq!(shorten("the quick brown fox jumps", 15), "the quick...");
    }

    #[test]
    fn sentences_ignore_decimal_points() {
        let s = sentences("R0 was 2.5 in Wuhan. Cases doubled! Why?");
        assert_eq!(s, vec!["R0 was 2.5 in Wuhan.", "Cases doubled!", "Why?"]);
    }

    #[test]
    fn summary_keeps_central_sentences_in_order() {
        let text = "Coronavirus spreads fast. The weather was mild. Coronavirus spreads in hospitals. \
                    Lunch was served.";
        assert_eq!(summarize(text), "Coronavirus spreads fast. Coronavirus spreads in hospitals.");
        assert_eq!(summarize("One sentence only."), "One sentence only.");
    }

    #[test]
    fn dates_format_iso() {
        assert_eq!(format_date(date!(2020 - 03 - 01)), "2020-03-01");
    }
}
