use cord_core::ingest::load_rows;
use cord_core::tags::SARS_COV_2_DATE;
use cord_core::{Bm25Params, Corpus, CorpusError, RawRecord, SearchOptions, Tag, TextField};
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;
use time::macros::date;

fn record(sha: &str, abs: &str, published: Option<&str>) -> RawRecord {
    RawRecord {
        sha: Some(sha.into()),
        title: Some(format!("A sufficiently long title for paper {sha}")),
        abstract_text: Some(abs.into()),
        publish_time: published.map(String::from),
        has_full_text: sha.starts_with('t'),
        full_text_file: sha.starts_with('t').then(|| "pmc_custom_license".to_string()),
        doi: Some(format!("10.1000/{sha}")),
        ..Default::default()
    }
}

fn corpus() -> Corpus {
    Corpus::from_records(
        vec![
            record("a", "Novel coronavirus outbreak in Wuhan", Some("2019-12-01")),
            record("b", "Influenza vaccine trial", Some("2015-01-01")),
            record("c", "SARS coronavirus structural study", None),
            record("t1", "Viral load and lopinavir treatment", Some("2019-11-30")),
            record("t2", "Bat coronavirus diversity", Some("2003-06-01")),
        ],
        Bm25Params::default(),
    )
}

fn shas(c: &Corpus) -> Vec<String> {
    c.iter().map(|d| d.sha.clone().unwrap_or_default()).collect()
}

#[test]
fn date_range_excludes_unknown_unless_asked() {
    let c = corpus();
    let since = c.filter_by_date_range(Some(date!(2019 - 01 - 01)), None, false);
    assert_eq!(shas(&since), vec!["a", "t1"]);
    let with_unknown = c.filter_by_date_range(Some(date!(2019 - 01 - 01)), None, true);
    assert_eq!(shas(&with_unknown), vec!["a", "c", "t1"]);
}

#[test]
fn after_is_inclusive_and_before_is_exclusive() {
    let c = corpus();
    let d = SARS_COV_2_DATE;
    assert!(c.after(d, false).find("t1").is_some());
    assert!(c.before(d, false).find("t1").is_none());
    assert!(c.after(d, false).before(d, false).is_empty());
    assert_eq!(shas(&c.after(d, false).before(d.next_day().unwrap(), false)), vec!["t1"]);
    assert_eq!(shas(&c.since_sarscov2(false)), vec!["a", "t1"]);
    assert_eq!(shas(&c.before_sarscov2(true)), vec!["b", "c", "t2"]);
    assert_eq!(shas(&c.since_sars(false)), vec!["a", "b", "t1", "t2"]);
    assert_eq!(shas(&c.before_sars(false)), Vec::<String>::new());
}

#[test]
fn tag_and_metadata_filters() {
    let c = corpus();
    assert_eq!(shas(&c.covid_related()), vec!["a"]);
    assert_eq!(c.not_covid_related().len(), 4);
    assert_eq!(shas(&c.filter_by_tag(Tag::Sars)), vec!["c"]);
    assert_eq!(shas(&c.filter_by_tag(Tag::Coronavirus)), vec!["a", "c", "t2"]);
    assert_eq!(shas(&c.with_text()), vec!["t1", "t2"]);
    assert_eq!(c.catalog("pmc_custom_license").len(), 2);
    assert!(c.catalog("biorxiv_medrxiv").is_empty());
    assert_eq!(shas(&c.filter(|d| d.tags.virus && d.published.is_some())), vec!["a", "t1", "t2"]);
    assert_eq!(shas(&c.contains("10.1000/t", TextField::Doi)), vec!["t1", "t2"]);
}

#[test]
fn filters_compose_and_keep_order() {
    let c = corpus();
    let narrowed = c.with_text().filter_by_pattern(".*coronavirus", TextField::Abstract).unwrap();
    assert_eq!(shas(&narrowed), vec!["t2"]);
    assert_eq!(shas(&c.head(3).tail(2)), vec!["b", "c"]);
}

#[test]
fn derived_views_are_copy_independent() {
    let c = corpus();
    let mut view = c.head(3);
    view.get_mut(0).unwrap().title = Some("Changed".into());
    view.documents_mut()[1].tags.covid_related = true;
    assert_eq!(c.get(0).unwrap().title_str(), "A sufficiently long title for paper a");
    assert!(!c.get(1).unwrap().tags.covid_related);
    assert_eq!(view.get(0).unwrap().title_str(), "Changed");
}

#[test]
fn summary_counts() {
    let s = corpus().summary();
    assert_eq!(s.papers, 5);
    assert_eq!(s.oldest, Some(date!(2003 - 06 - 01)));
    assert_eq!(s.newest, Some(date!(2019 - 12 - 01)));
    assert_eq!(s.covid_related, 1);
    assert_eq!(s.sars, 1);
    assert_eq!(s.coronavirus, 3);
    assert_eq!(s.antivirals, 1);
    assert_eq!(corpus().find("t1").unwrap().antivirals, "lopinavir");

    let empty = corpus().filter(|_| false).summary();
    assert_eq!(empty.papers, 0);
    assert_eq!(empty.oldest, None);
}

#[test]
fn full_text_tokens_replace_abstract_tokens() {
    let c = corpus();
    let mut texts: HashMap<String, Vec<String>> = HashMap::new();
    texts.insert("t1".into(), vec!["remdesivir".into(), "trial".into()]);
    texts.insert("t2".into(), Vec::new());
    let by_text = c.with_text_tokens(&texts);
    assert!(by_text.has_index());
    assert_eq!(by_text.find("t1").unwrap().antivirals, "remdesivir");
    assert!(by_text.find("t2").unwrap().tokens.is_empty());
    assert!(by_text.find("a").unwrap().tokens.is_empty());
    assert_eq!(by_text.index().doc_freq("remdesivir"), 1);
    // the source corpus keeps its abstract tokens
    assert!(!c.find("a").unwrap().tokens.is_empty());
}

#[test]
fn views_rank_with_their_own_statistics() {
    let c = corpus();
    let view = c.filter_by_tag(Tag::Coronavirus);
    let opts = SearchOptions { min_score: 0.0, ..Default::default() };
    let res = view.search("bat diversity", &opts);
    assert_eq!(res.len(), 1);
    assert_eq!(res.hits()[0].sha.as_deref(), Some("t2"));
    assert_eq!(res.hits()[0].source_row, 2);
}

#[test]
fn rows_loaded_from_disk_build_a_corpus() {
    let dir = tempdir().unwrap();
    let rows = r#"{"sha": "x1", "title": "Coronavirus spike glycoprotein", "abstract": null, "publish_time": "2020-02-01", "has_full_text": true, "full_text_file": "comm_use_subset", "doi": "10.1/x1"}
{"sha": null, "title": null, "abstract": "Unknown", "publish_time": null, "has_full_text": false, "full_text_file": null}
"#;
    fs::write(dir.path().join("metadata.jsonl"), rows).unwrap();
    let c = Corpus::from_rows(load_rows(dir.path()).unwrap(), Bm25Params::default()).unwrap();
    assert_eq!(c.len(), 1);
    assert_eq!(c.get(0).unwrap().published, Some(date!(2020 - 02 - 01)));

    fs::write(dir.path().join("metadata.jsonl"), r#"{"sha": "x1", "title": "t"}"#).unwrap();
    let err = Corpus::from_rows(load_rows(dir.path()).unwrap(), Bm25Params::default()).unwrap_err();
    assert!(matches!(err, CorpusError::MissingColumn { column: "abstract", .. }));
}
