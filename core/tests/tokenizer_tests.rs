use cord_core::tokenizer::{is_stopword, preprocess};

#[test]
fn it_normalizes_and_stems() {
    let words = preprocess("Running Runners RUN! The café's menu.");
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    // Unicode normalization and lowercasing
    assert!(words.iter().any(|w| w.starts_with("café")));
}

#[test]
fn it_filters_stopwords() {
    let words = preprocess("The quick brown fox and the lazy dog");
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert!(is_stopword("the"));
}

#[test]
fn it_is_deterministic_and_keeps_term_frequency() {
    let text = "Coronavirus coronavirus CORONAVIRUS spike";
    let a = preprocess(text);
    assert_eq!(a, preprocess(text));
    assert_eq!(a.iter().filter(|w| *w == "coronavirus").count(), 3);
}

#[test]
fn it_handles_empty_and_symbol_only_text() {
    assert!(preprocess("").is_empty());
    assert!(preprocess("--- 42 %%").is_empty());
}

#[test]
fn it_drops_publication_boilerplate() {
    assert!(preprocess("Copyright the authors; Fig. 2 and Table 1, et al.").is_empty());
    assert!(is_stopword("preprint"));
    assert_eq!(preprocess("However, remdesivir was also effective"), vec!["remdesivir", "effect"]);
}
