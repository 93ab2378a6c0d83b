//! Batch tagging of documents from abstract text and publication date.
//!
//! Tags are computed as an ordered list of passes over the whole corpus. A pass may read
//! only tags written by earlier passes: `sars` excludes anything already `covid_related`.

use crate::document::{Document, Tag};
use lazy_static::lazy_static;
use regex::Regex;
use time::macros::date;
use time::Date;

/// First SARS cases.
pub const SARS_DATE: Date = date!(2002 - 11 - 01);
/// First SARS-CoV-2 cases. Papers on or after this date may be about COVID-19.
pub const SARS_COV_2_DATE: Date = date!(2019 - 11 - 30);

pub const ANTIVIRAL_SUFFIX: &str = "vir";

const COVID_TERMS: &[&str] = &["covid", "sars-?n?cov-?2", "2019-ncov", "novel coronavirus", "sars coronavirus 2"];

/// A compiled, case-insensitive matcher anchored at the start of the lower-cased text.
/// The leading `.*` lets a term match anywhere on the first line.
pub struct PatternTag {
    name: &'static str,
    regex: Regex,
}

impl PatternTag {
    pub fn new(name: &'static str, alternatives: &[&str]) -> Self {
        let pattern = format!("(?i)^.*({})", alternatives.join("|"));
        let regex = Regex::new(&pattern).expect("valid tag pattern");
        Self { name, regex }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(&text.to_lowercase())
    }
}

lazy_static! {
    static ref COVID: PatternTag = PatternTag::new("covid", COVID_TERMS);
    static ref OUTBREAK: PatternTag = PatternTag::new("outbreak", &["wuhan", "hubei"]);
    static ref VIRUS: PatternTag = PatternTag::new("virus", &["virus", "viruses", "viral"]);
    static ref CORONA: PatternTag = PatternTag::new("coronavirus", &["corona"]);
    static ref SARS: PatternTag = PatternTag::new("sars", &["sars"]);
}

type TagPass = fn(&mut [Document]);

/// Passes in dependency order.
const TAG_PASSES: [(Tag, TagPass); 4] = [
    (Tag::CovidRelated, tag_covid),
    (Tag::Virus, tag_virus),
    (Tag::Coronavirus, tag_coronavirus),
    (Tag::Sars, tag_sars),
];

pub fn apply_tags(docs: &mut [Document]) {
    tracing::info!(num_docs = docs.len(), "applying tags");
    for (tag, pass) in TAG_PASSES {
        pass(docs);
        let tagged = docs.iter().filter(|d| d.tags.get(tag)).count();
        tracing::debug!(%tag, tagged, "tag pass complete");
    }
}

/// Unknown dates count as possibly recent.
pub fn since_sars_cov_2(published: Option<Date>) -> bool {
    published.map_or(true, |d| d >= SARS_COV_2_DATE)
}

fn tag_covid(docs: &mut [Document]) {
    for d in docs.iter_mut() {
        let text = &d.abstract_text;
        d.tags.covid_related = since_sars_cov_2(d.published) && (COVID.matches(text) || OUTBREAK.matches(text));
    }
}

fn tag_virus(docs: &mut [Document]) {
    for d in docs.iter_mut() {
        d.tags.virus = VIRUS.matches(&d.abstract_text);
    }
}

fn tag_coronavirus(docs: &mut [Document]) {
    for d in docs.iter_mut() {
        d.tags.coronavirus = CORONA.matches(&d.abstract_text);
    }
}

fn tag_sars(docs: &mut [Document]) {
    for d in docs.iter_mut() {
        d.tags.sars = !d.tags.covid_related && SARS.matches(&d.abstract_text);
    }
}

/// Tokens that look like antiviral drug names, comma-joined.
pub fn antivirals(tokens: &[String]) -> String {
    tokens
        .iter()
        .filter(|t| t.ends_with(ANTIVIRAL_SUFFIX))
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

pub fn tag_antivirals(docs: &mut [Document]) {
    for d in docs.iter_mut() {
        d.antivirals = antivirals(&d.tokens);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(abs: &str, published: Option<Date>) -> Document {
        Document { abstract_text: abs.into(), published, ..Default::default() }
    }

    #[test]
    fn matcher_sees_terms_on_the_first_line_only() {
        assert!(VIRUS.matches("Respiratory VIRAL load"));
        assert!(!VIRUS.matches("first line\nviral second line"));
        assert_eq!(CORONA.name(), "coronavirus");
    }

    #[test]
    fn covid_requires_recent_or_unknown_date() {
        let mut docs = vec![
            doc("COVID-19 in Italy", Some(date!(2020 - 03 - 01))),
            doc("COVID-19 in Italy", None),
            doc("covid like cough", Some(date!(2010 - 01 - 01))),
            doc("Outbreak in Hubei province", Some(SARS_COV_2_DATE)),
        ];
        apply_tags(&mut docs);
        let covid: Vec<bool> = docs.iter().map(|d| d.tags.covid_related).collect();
        assert_eq!(covid, vec![true, true, false, true]);
    }

    #[test]
    fn sars_excludes_covid() {
        let mut docs = vec![
            doc("SARS-CoV-2 entry receptor", Some(date!(2020 - 02 - 01))),
            doc("SARS-CoV-2 entry receptor", Some(date!(2004 - 02 - 01))),
        ];
        apply_tags(&mut docs);
        assert!(docs[0].tags.covid_related && !docs[0].tags.sars);
        assert!(!docs[1].tags.covid_related && docs[1].tags.sars);
    }

    #[test]
    fn antiviral_terms_are_joined() {
        let tokens: Vec<String> = ["lopinavir", "trial", "ritonavir"].iter().map(|s| s.to_string()).collect();
        assert_eq!(antivirals(&tokens), "lopinavir,ritonavir");
        assert_eq!(antivirals(&[]), "");
    }
}
