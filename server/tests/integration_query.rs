use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use ragcore::corpus::write_chunks;
use ragcore::{Chunk, DataPaths, RetrievalResult, Retriever};
use serde_json::{json, Value};
use server::{build_app, load_retriever, AppState, Strategy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

/// Returns `k` canned hits and records the last `k` it was asked for.
struct FakeRetriever {
    last_k: AtomicUsize,
}

impl Retriever for FakeRetriever {
    fn name(&self) -> &'static str { "fake" }

    fn retrieve(&self, _query: &str, k: usize) -> ragcore::Result<Vec<RetrievalResult>> {
        self.last_k.store(k, Ordering::SeqCst);
        Ok((0..k.min(5))
            .map(|i| RetrievalResult {
                id: format!("chunk_{i}"),
                source: "fake.txt".into(),
                text: format!("Sentence {i}. Trailing text."),
                score: 1.0 - i as f32 * 0.1,
            })
            .collect())
    }
}

struct FailingRetriever;

impl Retriever for FailingRetriever {
    fn name(&self) -> &'static str { "failing" }

    fn retrieve(&self, _query: &str, _k: usize) -> ragcore::Result<Vec<RetrievalResult>> {
        Err(ragcore::Error::Unfitted)
    }
}

async fn post_query(app: Router, body: Value) -> (StatusCode, Value) {
    post_raw(app, "application/json", body.to_string()).await
}

async fn post_raw(app: Router, content_type: &str, body: String) -> (StatusCode, Value) {
    let req = Request::post("/query")
        .header("content-type", content_type)
        .body(Body::from(body))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn query_returns_answer_and_chunks() {
    let fake = Arc::new(FakeRetriever { last_k: AtomicUsize::new(0) });
    let app = build_app(AppState::new(fake.clone()));

    let (status, json) = post_query(app, json!({ "query": "  what is this?  ", "k": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fake.last_k.load(Ordering::SeqCst), 2);
    let chunks = json["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0]["id"], "chunk_0");
    assert_eq!(chunks[1]["source"], "fake.txt");
    let answer = json["answer"].as_str().unwrap();
    assert!(answer.starts_with("Query: what is this?\n"));
    assert!(answer.contains("Sentence 0. Sentence 1."));
}

#[tokio::test]
async fn k_defaults_to_three() {
    let fake = Arc::new(FakeRetriever { last_k: AtomicUsize::new(0) });
    let (status, json) = post_query(build_app(AppState::new(fake.clone())), json!({ "query": "hello" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fake.last_k.load(Ordering::SeqCst), 3);
    assert_eq!(json["chunks"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn blank_query_is_rejected() {
    let fake = Arc::new(FakeRetriever { last_k: AtomicUsize::new(0) });
    for body in [json!({ "query": "   " }), json!({})] {
        let (status, json) = post_query(build_app(AppState::new(fake.clone())), body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Query cannot be empty" }));
    }
    assert_eq!(fake.last_k.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unreadable_bodies_get_json_errors() {
    let fake = Arc::new(FakeRetriever { last_k: AtomicUsize::new(0) });
    let cases = [
        ("application/json", "{\"query\": ", StatusCode::BAD_REQUEST),
        ("application/json", "{\"query\": 42}", StatusCode::UNPROCESSABLE_ENTITY),
        ("text/plain", "what is rust?", StatusCode::UNSUPPORTED_MEDIA_TYPE),
    ];
    for (content_type, body, expected) in cases {
        let (status, json) = post_raw(build_app(AppState::new(fake.clone())), content_type, body.to_string()).await;
        assert_eq!(status, expected, "{body}");
        assert!(!json["error"].as_str().unwrap().is_empty());
    }
    assert_eq!(fake.last_k.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_errors_become_500() {
    let (status, json) = post_query(build_app(AppState::new(Arc::new(FailingRetriever))), json!({ "query": "x" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("not fitted"));
}

#[tokio::test]
async fn lexical_index_is_built_on_demand_and_served() {
    let dir = tempdir().unwrap();
    let paths = DataPaths::new(dir.path());
    let chunks = vec![
        Chunk { id: "chunk_0".into(), source: "a.txt".into(), text: "Rust is great. Systems programming.".into() },
        Chunk { id: "chunk_1".into(), source: "a.txt".into(), text: "Learning rust takes time.".into() },
        Chunk { id: "chunk_2".into(), source: "b.txt".into(), text: "Gardens need water daily.".into() },
    ];
    write_chunks(&paths.chunks(), &chunks).unwrap();
    assert!(load_retriever(Strategy::Lexical, &paths, false).is_err());

    let retriever = load_retriever(Strategy::Lexical, &paths, true).unwrap();
    assert!(paths.lexical_index().exists());
    let app = build_app(AppState::new(retriever));
    let (status, json) = post_query(app, json!({ "query": "gardens water", "k": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    let arr = json["chunks"].as_array().unwrap();
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[0]["id"], "chunk_2");
}

#[tokio::test]
async fn health_is_ok() {
    let app = build_app(AppState::new(Arc::new(FailingRetriever)));
    let resp = app.oneshot(Request::get("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"ok");
}
