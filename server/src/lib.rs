use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use cord_core::text::format_date;
use cord_core::{parse_date, Corpus, CorpusSummary, Document, SearchConfig, SearchOptions, Tag};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::Date;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    pub k: Option<usize>,
    #[serde(default)]
    pub covid: bool,
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize)]
pub struct SearchHit {
    pub row: usize,
    pub paper: usize,
    pub sha: Option<String>,
    pub score: f64,
    pub title: String,
    pub summary: String,
    pub url: String,
    pub published: Option<String>,
    pub authors: String,
    pub journal: String,
    pub covid_related: bool,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub papers: usize,
    pub oldest: Option<String>,
    pub newest: Option<String>,
    pub covid_related: usize,
    pub sars: usize,
    pub coronavirus: usize,
    pub virus: usize,
    pub antivirals: usize,
}

impl From<CorpusSummary> for SummaryResponse {
    fn from(s: CorpusSummary) -> Self {
        Self {
            papers: s.papers,
            oldest: s.oldest.map(format_date),
            newest: s.newest.map(format_date),
            covid_related: s.covid_related,
            sars: s.sars,
            coronavirus: s.coronavirus,
            virus: s.virus,
            antivirals: s.antivirals,
        }
    }
}

#[derive(Serialize)]
pub struct PaperResponse {
    pub row: usize,
    pub sha: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub published: Option<String>,
    pub doi: String,
    pub authors: String,
    pub journal: String,
    pub has_text: bool,
    pub full_text_file: Option<String>,
    pub tags: Vec<String>,
    pub antivirals: String,
}

impl PaperResponse {
    fn new(row: usize, d: &Document) -> Self {
        let tags = Tag::ALL.into_iter().filter(|&t| d.tags.get(t)).map(|t| t.to_string()).collect();
        Self {
            row,
            sha: d.sha.clone(),
            title: d.title_str().to_string(),
            abstract_text: d.abstract_text.clone(),
            published: d.published.map(format_date),
            doi: d.doi.clone(),
            authors: d.authors.clone(),
            journal: d.journal.clone(),
            has_text: d.has_text,
            full_text_file: d.full_text_file.clone(),
            tags,
            antivirals: d.antivirals.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub corpus: Arc<Corpus>,
    pub config: Arc<SearchConfig>,
}

pub fn build_app(corpus: Corpus, config: SearchConfig) -> Router {
    // Index is built before the first request.
    let index = corpus.index();
    tracing::info!(papers = corpus.len(), terms = index.num_terms(), "corpus ready");
    let state = AppState { corpus: Arc::new(corpus), config: Arc::new(config) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val.split(',').filter_map(|s| s.trim().parse().ok()).collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler))
        .route("/summary", get(summary_handler))
        .route("/paper/:row", get(paper_handler))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn date_param(name: &str, value: Option<&str>) -> Result<Option<Date>, (StatusCode, String)> {
    match value.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("invalid {name} date: {s}"))),
    }
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = std::time::Instant::now();
    let start_date = date_param("start", params.start.as_deref())?;
    let end_date = date_param("end", params.end.as_deref())?;

    // Queries below the minimum length give no results rather than an error.
    if !state.config.accepts_query(&params.q) {
        return Ok(Json(SearchResponse {
            query: params.q,
            took_s: start.elapsed().as_secs_f64(),
            total_hits: 0,
            results: vec![],
        }));
    }

    let opts = SearchOptions {
        limit: params.k.unwrap_or(state.config.default_limit).min(100),
        covid_related: params.covid,
        start_date,
        end_date,
        ..SearchOptions::from_config(&state.config)
    };
    let found = state.corpus.search(&params.q, &opts);
    let results: Vec<SearchHit> = found
        .iter()
        .map(|h| SearchHit {
            row: h.row,
            paper: h.source_row,
            sha: h.sha.clone(),
            score: h.score,
            title: h.title.clone(),
            summary: h.summary.clone(),
            url: h.url.clone(),
            published: h.published.map(format_date),
            authors: h.authors.clone(),
            journal: h.journal.clone(),
            covid_related: h.covid_related,
        })
        .collect();

    Ok(Json(SearchResponse {
        query: params.q,
        took_s: start.elapsed().as_secs_f64(),
        total_hits: results.len(),
        results,
    }))
}

pub async fn summary_handler(State(state): State<AppState>) -> Json<SummaryResponse> {
    Json(state.corpus.summary().into())
}

pub async fn paper_handler(
    State(state): State<AppState>,
    Path(row): Path<usize>,
) -> Result<Json<PaperResponse>, (StatusCode, String)> {
    match state.corpus.get(row) {
        Some(d) => Ok(Json(PaperResponse::new(row, d))),
        None => Err((StatusCode::NOT_FOUND, format!("no paper at row {row}"))),
    }
}
