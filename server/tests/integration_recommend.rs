use axum::body::{Body, Bytes};
use axum::http::{Request, StatusCode};
use axum::Router;
use cinematch_core::persist::{load_engine, save_artifacts, Artifacts, IndexPaths, MetaFile};
use cinematch_core::{CollisionPolicy, Document, EngineHandle, VectorSpace};
use cinematch_server::tmdb::TmdbClient;
use cinematch_server::{build_app, AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use std::time::Duration;
use tempfile::tempdir;
use tower::ServiceExt;

fn build_tiny_index(dir: &std::path::Path) {
    let titles = ["A", "B", "C"];
    let documents = titles
        .iter()
        .enumerate()
        .map(|(i, t)| Document { row_id: i as u32, title: t.to_string() })
        .collect();
    let raw_titles = titles.iter().enumerate().map(|(i, t)| (t.to_string(), i as u32)).collect();
    // Rows are already unit length.
    let space = VectorSpace::from_dense(&[vec![1.0, 0.0, 0.0], vec![0.8, 0.6, 0.0], vec![0.0, 0.0, 1.0]]).unwrap();
    let meta = MetaFile {
        num_docs: 3,
        num_terms: 3,
        nnz: space.nnz() as u64,
        l2_normalized: true,
        created_at: "2024-01-01T00:00:00Z".into(),
        version: 1,
    };
    save_artifacts(&IndexPaths::new(dir), &Artifacts { documents, titles: raw_titles, space, meta }).unwrap();
}

fn offline_tmdb() -> TmdbClient {
    TmdbClient::new("http://127.0.0.1:9", "unused", Duration::from_millis(200)).unwrap()
}

fn app_with(engine: EngineHandle) -> Router {
    build_app(AppState { engine, tmdb: offline_tmdb() })
}

fn loaded_app() -> Router {
    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    let engine = load_engine(&IndexPaths::new(dir.path()), CollisionPolicy::Reject).unwrap();
    app_with(EngineHandle::ready(engine))
}

async fn call(app: Router, uri: &str) -> (StatusCode, Bytes) {
    let req = Request::get(uri).body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

#[tokio::test]
async fn recommend_returns_ranked_results() {
    let (status, body) = call(loaded_app(), "/recommend/tfidf?title=A&top_n=2").await;
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_slice(&body).unwrap();
    let arr = json.as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["title"], "B");
    assert!((arr[0]["score"].as_f64().unwrap() - 0.8).abs() < 1e-6);
    assert_eq!(arr[1]["title"], "C");
    assert_eq!(arr[1]["score"].as_f64().unwrap(), 0.0);
}

#[tokio::test]
async fn recommend_normalizes_title() {
    let app = loaded_app();
    let (_, padded) = call(app.clone(), "/recommend/tfidf?title=%20%20a%20&top_n=5").await;
    let (_, plain) = call(app, "/recommend/tfidf?title=A&top_n=5").await;
    assert_eq!(padded, plain);
}

#[tokio::test]
async fn unknown_title_is_404() {
    let (status, body) = call(loaded_app(), "/recommend/tfidf?title=Nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["detail"], "Title not found: Nope");
}

#[tokio::test]
async fn non_positive_top_n_is_empty() {
    for uri in ["/recommend/tfidf?title=A&top_n=0", "/recommend/tfidf?title=A&top_n=-3"] {
        let (status, body) = call(loaded_app(), uri).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"[]");
    }
}

#[tokio::test]
async fn oversized_top_n_returns_all_candidates() {
    let (_, body) = call(loaded_app(), "/recommend/tfidf?title=C&top_n=1000").await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn not_ready_is_503_until_published() {
    let engine = EngineHandle::new();
    let app = app_with(engine.clone());

    let req = Request::get("/recommend/tfidf?title=A").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(resp.headers().contains_key("retry-after"));

    let (_, health) = call(app.clone(), "/health").await;
    let health: Value = serde_json::from_slice(&health).unwrap();
    assert_eq!(health["engine_ready"], false);

    let dir = tempdir().unwrap();
    build_tiny_index(dir.path());
    engine.publish(load_engine(&IndexPaths::new(dir.path()), CollisionPolicy::default()).unwrap());
    let (status, _) = call(app, "/recommend/tfidf?title=A").await;
    assert_eq!(status, StatusCode::OK);
}
