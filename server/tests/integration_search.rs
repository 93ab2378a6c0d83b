use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use cord_core::ingest::load_rows;
use cord_core::{Corpus, SearchConfig};
use http_body_util::BodyExt;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_corpus() -> Corpus {
    let dir = tempdir().unwrap();
    let mut lines = vec![
        r#"{"sha": "a", "title": "Pneumonia of unknown cause, Wuhan, China", "abstract": "Novel coronavirus outbreak in Wuhan", "publish_time": "2019-12-01", "has_full_text": false, "full_text_file": null, "doi": "10.1000/a"}"#.to_string(),
        r#"{"sha": "b", "title": "Seasonal influenza vaccination in adults", "abstract": "Influenza vaccine trial", "publish_time": "2015-01-01", "has_full_text": false, "full_text_file": null}"#.to_string(),
        r#"{"sha": "c", "title": "SARS coronavirus structural study", "abstract": null, "publish_time": null, "has_full_text": true, "full_text_file": "comm_use_subset"}"#.to_string(),
    ];
    for i in 0..20 {
        lines.push(format!(
            r#"{{"sha": "filler{i}", "title": "Filler paper number {i} on other topics", "abstract": "filler{i} alpha{i} beta{i} gamma{i}", "publish_time": null, "has_full_text": false, "full_text_file": null}}"#
        ));
    }
    let path = dir.path().join("metadata.jsonl");
    fs::write(&path, lines.join("\n")).unwrap();
    Corpus::from_rows(load_rows(&path).unwrap(), SearchConfig::default().bm25).unwrap()
}

fn app() -> Router {
    server::build_app(build_tiny_corpus(), SearchConfig::default())
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = call(app(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[..], b"ok");
}

#[tokio::test]
async fn search_returns_ranked_results() {
    let (status, body) = call(app(), "/search?q=coronavirus&k=5").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["sha"], "a");
    assert_eq!(arr[0]["row"], 0);
    assert_eq!(arr[0]["published"], "2019-12-01");
    assert_eq!(arr[0]["url"], "http://doi.org/10.1000/a");
    assert_eq!(arr[1]["sha"], "c");
    assert_eq!(arr[1]["paper"], 2);
    assert!(arr[1]["published"].is_null());
    assert_eq!(json["total_hits"], 2);
}

#[tokio::test]
async fn search_filters_by_tag_and_date() {
    let (_, body) = call(app(), "/search?q=coronavirus&covid=true").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["results"].as_array().unwrap().len(), 1);

    let (_, body) = call(app(), "/search?q=coronavirus&start=2019-01-01").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json["results"].as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["sha"], "a");
}

#[tokio::test]
async fn bad_date_is_rejected() {
    let (status, _) = call(app(), "/search?q=coronavirus&end=someday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn short_query_gives_no_results() {
    let (status, body) = call(app(), "/search?q=sar").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn summary_and_paper_lookup() {
    let (status, body) = call(app(), "/summary").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["papers"], 23);
    assert_eq!(json["covid_related"], 1);
    assert_eq!(json["sars"], 1);
    assert_eq!(json["newest"], "2019-12-01");

    let (status, body) = call(app(), "/paper/2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["abstract"], "SARS coronavirus structural study");
    let tags: Vec<&str> = json["tags"].as_array().unwrap().iter().map(|t| t.as_str().unwrap()).collect();
    assert_eq!(tags, vec!["virus", "coronavirus", "sars"]);

    let (status, _) = call(app(), "/paper/999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
