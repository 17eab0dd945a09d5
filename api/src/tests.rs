use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use ai_llm_service::{
    AiLlmError, LlmProvider,
    error_handler::{ProviderError, ProviderErrorKind},
};
use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use contextor::{
    ContextChunk, ContextorConfig, ContextorError, DependencyHealth, GenerateFuture, Generator,
    HealthFuture, RagOrchestrator, RetrieveFuture, Retriever,
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::core::app_state::AppState;
use crate::middleware_layer::request_context::{REQUEST_ID_HEADER, RESPONSE_TIME_HEADER};
use crate::router;

fn chunk(id: &str, score: f32) -> ContextChunk {
    ContextChunk {
        id: format!("{id}::0"),
        source: format!("data/{id}.md"),
        title: format!("{id}.md"),
        score,
        text: format!("text of {id}"),
    }
}

struct StubRetriever {
    hits: Vec<ContextChunk>,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl Retriever for StubRetriever {
    fn retrieve<'a>(&'a self, query: &'a str, k: usize) -> RetrieveFuture<'a> {
        Box::pin(async move {
            self.queries.lock().unwrap().push(query.to_string());
            if self.fail {
                return Err(ContextorError::Retrieval("qdrant unavailable".into()));
            }
            Ok(self.hits.iter().take(k).cloned().collect())
        })
    }

    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async move {
            vec![DependencyHealth {
                name: "qdrant".into(),
                ok: !self.fail,
                latency_ms: 1,
                detail: if self.fail { "connection refused".into() } else { "qdrant 1.15.0".into() },
            }]
        })
    }
}

struct StubGenerator {
    calls: AtomicUsize,
    fail: bool,
}

impl Generator for StubGenerator {
    fn generate<'a>(
        &'a self,
        _query: &'a str,
        contexts: &'a [ContextChunk],
        _provider: LlmProvider,
    ) -> GenerateFuture<'a> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AiLlmError::from(ProviderError::new(
                    LlmProvider::AzureOpenAI,
                    ProviderErrorKind::EmptyChoices,
                )));
            }
            Ok(format!("Answer from {} contexts [1].", contexts.len()))
        })
    }

    fn default_provider(&self) -> LlmProvider {
        LlmProvider::AzureOpenAI
    }

    fn supports(&self, provider: LlmProvider) -> bool {
        provider == LlmProvider::AzureOpenAI
    }
}

struct Harness {
    state: Arc<AppState>,
    retriever: Arc<StubRetriever>,
    generator: Arc<StubGenerator>,
}

fn harness(retrieval_fails: bool, generation_fails: bool) -> Harness {
    let retriever = Arc::new(StubRetriever {
        // deliberately unsorted
        hits: vec![
            chunk("b", 0.71),
            chunk("a", 0.93),
            chunk("c", 0.62),
            chunk("d", 0.80),
        ],
        fail: retrieval_fails,
        queries: Mutex::new(Vec::new()),
    });
    let generator = Arc::new(StubGenerator {
        calls: AtomicUsize::new(0),
        fail: generation_fails,
    });
    let orchestrator = RagOrchestrator::new(
        retriever.clone(),
        generator.clone(),
        ContextorConfig::default(),
    );
    Harness {
        state: Arc::new(AppState::new(Arc::new(orchestrator))),
        retriever,
        generator,
    }
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_str(res: &Response, name: &str) -> String {
    res.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[tokio::test]
async fn health_is_ok() {
    let h = harness(false, false);
    let res = router(h.state).oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert!(!header_str(&res, REQUEST_ID_HEADER).is_empty());
    assert!(!header_str(&res, RESPONSE_TIME_HEADER).is_empty());
    assert_eq!(json_body(res).await, json!({ "ok": true }));
}

#[tokio::test]
async fn empty_body_is_rejected_with_envelope() {
    let h = harness(false, false);
    let res = router(h.state.clone())
        .oneshot(post_json("/rag/answer", "{}"))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let request_id = header_str(&res, REQUEST_ID_HEADER);
    let body = json_body(res).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["request_id"], request_id.as_str());
    assert_eq!(h.retriever.queries.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn malformed_json_and_bad_k_are_validation_errors() {
    let h = harness(false, false);
    for body in [r#"{"query": "#, r#"{"query":"refunds","k":0}"#, r#"{"query":"refunds","k":-2}"#] {
        let res = router(h.state.clone())
            .oneshot(post_json("/rag/answer", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body: {body}");
        let json = json_body(res).await;
        assert_eq!(json["error"]["code"], "VALIDATION_ERROR");
        assert!(json["error"]["request_id"].is_string());
    }
    assert_eq!(h.state.stats.snapshot(LlmProvider::AzureOpenAI).validation_errors, 3);
}

#[tokio::test]
async fn unknown_or_unconfigured_provider_is_rejected() {
    let h = harness(false, false);
    for provider in ["gemini", "ollama"] {
        let body = json!({ "query": "refunds", "provider": provider }).to_string();
        let res = router(h.state.clone())
            .oneshot(post_json("/rag/answer", &body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "provider: {provider}");
    }
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_carries_meta_and_hides_text_by_default() {
    let h = harness(false, false);
    let res = router(h.state.clone())
        .oneshot(post_json("/rag/answer", r#"{"query":"How do refunds work?","k":3}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let request_id = header_str(&res, REQUEST_ID_HEADER);
    let body = json_body(res).await;

    assert_eq!(body["answer"], "Answer from 3 contexts [1].");
    assert_eq!(body["meta"]["k"], 3);
    assert_eq!(body["meta"]["provider"], "azure");
    assert_eq!(body["meta"]["grounded"], true);
    assert_eq!(body["meta"]["request_id"], request_id.as_str());
    assert!(body["meta"]["processing_time_ms"].is_u64());
    assert!(body["meta"]["generated_at"].as_str().unwrap().ends_with('Z'));

    let contexts = body["contexts"].as_array().unwrap();
    assert_eq!(contexts.len(), 3);
    assert!(contexts.iter().all(|c| c.get("text").is_none()));
    assert_eq!(contexts[0]["title"], "a.md");
}

#[tokio::test]
async fn request_ids_are_unique_unless_supplied() {
    let h = harness(false, false);
    let mut ids = Vec::new();
    for _ in 0..2 {
        let res = router(h.state.clone())
            .oneshot(post_json("/rag/answer", r#"{"query":"refunds"}"#))
            .await
            .unwrap();
        ids.push(json_body(res).await["meta"]["request_id"].as_str().unwrap().to_string());
    }
    assert_ne!(ids[0], ids[1]);

    let req = Request::builder()
        .method("POST")
        .uri("/rag/answer")
        .header(header::CONTENT_TYPE, "application/json")
        .header(REQUEST_ID_HEADER, "client-123")
        .body(Body::from(r#"{"query":"refunds"}"#))
        .unwrap();
    let res = router(h.state).oneshot(req).await.unwrap();
    assert_eq!(header_str(&res, REQUEST_ID_HEADER), "client-123");
    assert_eq!(json_body(res).await["meta"]["request_id"], "client-123");
}

#[tokio::test]
async fn search_returns_at_most_k_sorted() {
    let h = harness(false, false);
    let res = router(h.state.clone())
        .oneshot(post_json(
            "/rag/search",
            r#"{"query":"refunds","k":3,"include_text":true}"#,
        ))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    let hits = body.as_array().unwrap();
    assert!(hits.len() <= 3);
    let scores: Vec<f64> = hits.iter().map(|h| h["score"].as_f64().unwrap()).collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(hits[0]["text"].is_string());
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn retrieval_failure_is_503_without_generation() {
    let h = harness(true, false);
    let res = router(h.state.clone())
        .oneshot(post_json("/rag/answer", r#"{"query":"refunds"}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "RETRIEVAL_ERROR");
    assert!(body["error"]["request_id"].is_string());
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 0);

    let status = h.state.stats.snapshot(LlmProvider::AzureOpenAI);
    assert_eq!(status.retrieval_errors, 1);
    assert_eq!(status.errors_total, 1);
}

#[tokio::test]
async fn generation_failure_returns_sources_without_text() {
    let h = harness(false, true);
    let res = router(h.state.clone())
        .oneshot(post_json("/rag/answer", r#"{"query":"refunds","include_text":true}"#))
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "GENERATION_ERROR");
    let contexts = body["error"]["contexts"].as_array().unwrap();
    assert!(!contexts.is_empty());
    assert!(contexts.iter().all(|c| c.get("text").is_none()));
    assert_eq!(h.generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unknown_route_gets_envelope() {
    let h = harness(false, false);
    let res = router(h.state).oneshot(get("/nope")).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = json_body(res).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["request_id"].is_string());
}

#[tokio::test]
async fn status_and_metrics_reflect_counters() {
    let h = harness(false, false);
    router(h.state.clone())
        .oneshot(post_json("/rag/search", "{}"))
        .await
        .unwrap();

    let res = router(h.state.clone()).oneshot(get("/status")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status = json_body(res).await;
    assert_eq!(status["requests_total"], 1);
    assert_eq!(status["validation_errors"], 1);
    assert_eq!(status["default_provider"], "azure");
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(status["ready"], true);
    assert_eq!(status["dependencies"][0]["name"], "qdrant");
    assert_eq!(status["dependencies"][0]["ok"], true);

    let res = router(h.state).oneshot(get("/metrics")).await.unwrap();
    assert!(header_str(&res, "content-type").starts_with("text/plain"));
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("rag_requests_total 2\n"));
    assert!(text.contains("rag_validation_errors_total 1\n"));
}

#[tokio::test]
async fn status_reports_unreachable_store() {
    let h = harness(true, false);
    let res = router(h.state).oneshot(get("/status")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let status = json_body(res).await;
    assert_eq!(status["ready"], false);
    let deps = status["dependencies"].as_array().unwrap();
    assert_eq!(deps.len(), 1);
    assert_eq!(deps[0]["ok"], false);
    assert_eq!(deps[0]["detail"], "connection refused");
}

#[tokio::test]
async fn numeric_string_k_is_accepted() {
    let h = harness(false, false);
    let res = router(h.state.clone())
        .oneshot(post_json("/rag/search", r#"{"query":"refunds","k":"2"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await.as_array().unwrap().len(), 2);

    let res = router(h.state)
        .oneshot(post_json("/rag/search", r#"{"query":"refunds","k":"two"}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn repeated_search_is_stable() {
    let h = harness(false, false);
    let mut runs = Vec::new();
    for _ in 0..2 {
        let res = router(h.state.clone())
            .oneshot(post_json("/rag/search", r#"{"query":"refunds","k":4}"#))
            .await
            .unwrap();
        let ids: Vec<String> = json_body(res)
            .await
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap().to_string())
            .collect();
        runs.push(ids);
    }
    assert_eq!(runs[0], vec!["a::0", "d::0", "b::0", "c::0"]);
    assert_eq!(runs[0], runs[1]);
}
