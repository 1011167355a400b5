pub mod config;
pub mod error;
pub mod tmdb;

use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use cinematch_core::{EngineHandle, Error as CoreError, Recommendation};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::tmdb::{to_cards, HomeCategory, MovieCard, MovieDetails, TmdbClient};

const MAX_HOME_LIMIT: usize = 50;
/// Each content recommendation in a bundle costs one TMDB search.
const MAX_BUNDLE_COUNT: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    pub tmdb: TmdbClient,
}

#[derive(Deserialize)]
pub struct RecommendParams {
    pub title: String,
    #[serde(default = "default_top_n")]
    pub top_n: i64,
}
fn default_top_n() -> i64 { 10 }

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: String,
    #[serde(default = "default_page")]
    pub page: u32,
}
fn default_page() -> u32 { 1 }

#[derive(Deserialize)]
pub struct HomeParams {
    #[serde(default = "default_category")]
    pub category: HomeCategory,
    #[serde(default = "default_home_limit")]
    pub limit: usize,
}
fn default_category() -> HomeCategory { HomeCategory::Popular }
fn default_home_limit() -> usize { 24 }

#[derive(Deserialize)]
pub struct LimitParams {
    #[serde(default = "default_genre_limit")]
    pub limit: usize,
}
fn default_genre_limit() -> usize { 12 }

#[derive(Deserialize)]
pub struct BundleParams {
    pub query: String,
    #[serde(default = "default_bundle_count")]
    pub tfidf_top_n: usize,
    #[serde(default = "default_bundle_count")]
    pub genre_limit: usize,
}
fn default_bundle_count() -> usize { 12 }

#[derive(Serialize, Deserialize, Debug)]
pub struct TfidfRecItem {
    pub title: String,
    pub score: f32,
    pub tmdb: Option<MovieCard>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SearchBundleResponse {
    pub query: String,
    pub movie_details: MovieDetails,
    pub tfidf_recommendations: Vec<TfidfRecItem>,
    pub genre_recommendations: Vec<MovieCard>,
}

pub fn build_app(state: AppState) -> Router {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(health))
        .route("/recommend/tfidf", get(recommend_tfidf))
        .route("/tmdb/search", get(tmdb_search))
        .route("/home", get(home))
        .route("/movie/id/:tmdb_id", get(movie_by_id))
        .route("/movie/recommend/genre/:tmdb_id", get(recommend_genre))
        .route("/movie/search", get(search_bundle))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "engine_ready": state.engine.is_ready() }))
}

pub async fn recommend_tfidf(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Vec<Recommendation>>, ApiError> {
    let engine = state.engine.get()?;
    let top_n = usize::try_from(params.top_n).unwrap_or(0);
    let recs = engine.recommend(&params.title, top_n)?;
    tracing::debug!(title = %params.title, top_n, returned = recs.len(), "tfidf recommendations");
    Ok(Json(recs))
}

async fn tmdb_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.tmdb.search_raw(&params.query, params.page).await?))
}

async fn home(State(state): State<AppState>, Query(params): Query<HomeParams>) -> Result<Json<Vec<MovieCard>>, ApiError> {
    if params.limit > MAX_HOME_LIMIT {
        return Err(ApiError::BadRequest(format!("limit must be at most {MAX_HOME_LIMIT}")));
    }
    let movies = state.tmdb.home_feed(params.category).await?;
    Ok(Json(to_cards(&movies, params.limit)))
}

async fn movie_by_id(State(state): State<AppState>, Path(tmdb_id): Path<u64>) -> Result<Json<MovieDetails>, ApiError> {
    Ok(Json(state.tmdb.movie_details(tmdb_id).await?))
}

async fn recommend_genre(
    State(state): State<AppState>,
    Path(tmdb_id): Path<u64>,
    Query(params): Query<LimitParams>,
) -> Result<Json<Vec<MovieCard>>, ApiError> {
    Ok(Json(state.tmdb.recommend_by_genre(tmdb_id, params.limit).await?))
}

/// Details for the best TMDB match of `query` plus both recommendation lists.
///
/// The content and genre sections degrade independently: an engine that is
/// still loading, a title outside the corpus or a failed genre lookup leaves
/// that section empty.
async fn search_bundle(
    State(state): State<AppState>,
    Query(params): Query<BundleParams>,
) -> Result<Json<SearchBundleResponse>, ApiError> {
    if params.tfidf_top_n > MAX_BUNDLE_COUNT || params.genre_limit > MAX_BUNDLE_COUNT {
        return Err(ApiError::BadRequest(format!(
            "tfidf_top_n and genre_limit must be at most {MAX_BUNDLE_COUNT}"
        )));
    }
    let hit = state
        .tmdb
        .search(&params.query, 1)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("No TMDB match for: {}", params.query)))?;
    let details = state.tmdb.movie_details(hit.id).await?;

    let content = async {
        match state.engine.get().and_then(|e| e.recommend(&details.title, params.tfidf_top_n)) {
            Ok(recs) => Ok(enrich(&state.tmdb, recs).await),
            Err(e @ (CoreError::NotFound(_) | CoreError::NotReady)) => {
                tracing::debug!(title = %details.title, reason = %e, "no content recommendations");
                Ok(Vec::new())
            }
            Err(e) => Err(ApiError::from(e)),
        }
    };
    let genre = async {
        state.tmdb.recommend_by_genre(details.tmdb_id, params.genre_limit).await.unwrap_or_else(|e| {
            tracing::warn!(tmdb_id = details.tmdb_id, error = %e, "genre recommendations unavailable");
            Vec::new()
        })
    };
    let (content, genre_recommendations) = tokio::join!(content, genre);

    Ok(Json(SearchBundleResponse {
        query: params.query,
        tfidf_recommendations: content?,
        genre_recommendations,
        movie_details: details,
    }))
}

/// Attaches the first TMDB search hit to each recommended title, concurrently.
async fn enrich(tmdb: &TmdbClient, recs: Vec<Recommendation>) -> Vec<TfidfRecItem> {
    let mut set = JoinSet::new();
    for (i, rec) in recs.iter().enumerate() {
        let client = tmdb.clone();
        let title = rec.title.clone();
        set.spawn(async move { (i, client.first_match(&title).await) });
    }
    let mut cards: Vec<Option<MovieCard>> = vec![None; recs.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((i, Ok(card))) => cards[i] = card,
            Ok((i, Err(e))) => tracing::warn!(title = %recs[i].title, error = %e, "tmdb enrichment failed"),
            Err(e) => tracing::warn!(error = %e, "enrichment task panicked"),
        }
    }
    recs.into_iter()
        .zip(cards)
        .map(|(r, tmdb)| TfidfRecItem { title: r.title, score: r.score, tmdb })
        .collect()
}
