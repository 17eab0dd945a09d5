//! Retrieve → guardrail → generate, with per-stage deadlines.

use std::sync::Arc;
use std::time::Instant;

use ai_llm_service::LlmProvider;
use chrono::{SecondsFormat, Utc};
use services::uuid::new_request_id;
use tracing::{info, instrument, warn};

use crate::api_types::{Answer, AnswerMeta, AnswerRequest, ContextChunk, DependencyHealth};
use crate::cfg::ContextorConfig;
use crate::error::{ContextorError, Stage};
use crate::generator::Generator;
use crate::retriever::Retriever;

/// Fixed answer when the evidence is too weak to ask the model.
pub const NO_RELIABLE_ANSWER: &str = "I couldn\u{2019}t find a reliable answer in the provided documents.";

pub struct RagOrchestrator {
    retriever: Arc<dyn Retriever>,
    generator: Arc<dyn Generator>,
    cfg: ContextorConfig,
}

impl RagOrchestrator {
    pub fn new(
        retriever: Arc<dyn Retriever>,
        generator: Arc<dyn Generator>,
        cfg: ContextorConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            cfg,
        }
    }

    pub fn config(&self) -> &ContextorConfig {
        &self.cfg
    }

    pub fn default_provider(&self) -> LlmProvider {
        self.generator.default_provider()
    }

    /// Store and model probes, run concurrently.
    pub async fn health(&self) -> Vec<DependencyHealth> {
        let (mut all, llm) = tokio::join!(self.retriever.health(), self.generator.health());
        all.extend(llm);
        all
    }

    /// Full RAG answer.
    ///
    /// Retrieval failures short-circuit before the generator is called.
    /// Generation failures and timeouts carry the retrieved contexts.
    #[instrument(skip_all, fields(request_id = tracing::field::Empty, k = tracing::field::Empty, provider = tracing::field::Empty))]
    pub async fn answer(&self, req: AnswerRequest) -> Result<Answer, ContextorError> {
        let started = Instant::now();
        let request_id = req
            .request_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(new_request_id);

        let query = self.validate_query(&req.query)?;
        let k = self.resolve_k(req.k)?;
        let provider = req.provider.unwrap_or_else(|| self.generator.default_provider());
        if !self.generator.supports(provider) {
            return Err(ContextorError::Validation(format!(
                "provider `{provider}` is not configured"
            )));
        }

        let span = tracing::Span::current();
        span.record("request_id", request_id.as_str());
        span.record("k", k);
        span.record("provider", provider.as_str());

        let contexts = self.retrieve_within_deadline(query, k).await?;

        let top = contexts.first().map(|c| c.score);
        let grounded = top.is_some_and(|s| s >= self.cfg.min_score);

        let answer = if grounded {
            self.generate_within_deadline(query, &contexts, provider).await?
        } else {
            info!(hits = contexts.len(), top_score = ?top, min_score = self.cfg.min_score, "evidence below threshold; not calling the model");
            NO_RELIABLE_ANSWER.to_string()
        };

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(hits = contexts.len(), grounded, latency_ms = processing_time_ms, "answer ready");

        Ok(Answer {
            answer,
            contexts,
            meta: AnswerMeta {
                k,
                provider,
                processing_time_ms,
                request_id,
                generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                grounded,
            },
        })
    }

    /// Validation + retrieval only.
    #[instrument(skip_all, fields(k = tracing::field::Empty))]
    pub async fn search(&self, query: &str, k: Option<usize>) -> Result<Vec<ContextChunk>, ContextorError> {
        let query = self.validate_query(query)?;
        let k = self.resolve_k(k)?;
        tracing::Span::current().record("k", k);
        self.retrieve_within_deadline(query, k).await
    }

    fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, ContextorError> {
        let q = query.trim();
        if q.is_empty() {
            return Err(ContextorError::Validation("Missing 'query'".into()));
        }
        let n = q.chars().count();
        if n > self.cfg.max_query_chars {
            return Err(ContextorError::Validation(format!(
                "query is {n} characters; the limit is {}",
                self.cfg.max_query_chars
            )));
        }
        Ok(q)
    }

    /// `None` → default, `0` → error, above max → clamped.
    fn resolve_k(&self, k: Option<usize>) -> Result<usize, ContextorError> {
        match k {
            None => Ok(self.cfg.default_k),
            Some(0) => Err(ContextorError::Validation("k must be a positive integer".into())),
            Some(k) => Ok(k.min(self.cfg.max_k)),
        }
    }

    async fn retrieve_within_deadline(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<ContextChunk>, ContextorError> {
        let started = Instant::now();
        let res = tokio::time::timeout(self.cfg.retrieval_timeout, self.retriever.retrieve(query, k)).await;

        let mut contexts = match res {
            Ok(Ok(c)) => c,
            Ok(Err(e)) => {
                warn!(error = %e, "retrieval failed");
                return Err(match e {
                    ContextorError::Retrieval(_) | ContextorError::Timeout { .. } => e,
                    other => ContextorError::Retrieval(other.to_string()),
                });
            }
            Err(_) => {
                warn!(deadline_ms = self.cfg.retrieval_timeout.as_millis() as u64, "retrieval timed out");
                return Err(ContextorError::Timeout {
                    stage: Stage::Retrieval,
                    elapsed: started.elapsed(),
                    contexts: Vec::new(),
                });
            }
        };

        // Equal scores order by id.
        contexts.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.id.cmp(&b.id)));
        contexts.truncate(k);
        Ok(contexts)
    }

    async fn generate_within_deadline(
        &self,
        query: &str,
        contexts: &[ContextChunk],
        provider: LlmProvider,
    ) -> Result<String, ContextorError> {
        let started = Instant::now();
        let res = tokio::time::timeout(
            self.cfg.generation_timeout,
            self.generator.generate(query, contexts, provider),
        )
        .await;

        match res {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) if e.is_timeout() => {
                warn!(error = %e, "generation timed out in transport");
                Err(ContextorError::Timeout {
                    stage: Stage::Generation,
                    elapsed: started.elapsed(),
                    contexts: contexts.to_vec(),
                })
            }
            Ok(Err(e)) => {
                warn!(error = %e, auth = e.is_auth(), "generation failed");
                Err(ContextorError::Generation {
                    message: e.to_string(),
                    contexts: contexts.to_vec(),
                })
            }
            Err(_) => {
                warn!(deadline_ms = self.cfg.generation_timeout.as_millis() as u64, "generation timed out");
                Err(ContextorError::Timeout {
                    stage: Stage::Generation,
                    elapsed: started.elapsed(),
                    contexts: contexts.to_vec(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::GenerateFuture;
    use crate::retriever::{HealthFuture, RetrieveFuture};
    use ai_llm_service::AiLlmError;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn chunk(id: &str, score: f32) -> ContextChunk {
        ContextChunk {
            id: id.into(),
            source: format!("data/{id}.md"),
            title: format!("{id}.md"),
            score,
            text: format!("text {id}"),
        }
    }

    #[derive(Default)]
    struct StubRetriever {
        hits: Vec<ContextChunk>,
        fail: bool,
        delay: Option<Duration>,
        /// Rotate the hit list by the call count, like an index returning ties in any order.
        rotate: bool,
        seen_k: Mutex<Vec<usize>>,
    }

    impl Retriever for StubRetriever {
        fn retrieve<'a>(&'a self, _query: &'a str, k: usize) -> RetrieveFuture<'a> {
            Box::pin(async move {
                let calls = {
                    let mut seen = self.seen_k.lock().unwrap();
                    seen.push(k);
                    seen.len()
                };
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                if self.fail {
                    return Err(ContextorError::Retrieval("qdrant unavailable".into()));
                }
                let mut hits = self.hits.clone();
                if self.rotate && !hits.is_empty() {
                    let n = hits.len();
                    hits.rotate_left(calls % n);
                }
                Ok(hits.into_iter().take(k).collect())
            })
        }

        fn health(&self) -> HealthFuture<'_> {
            Box::pin(async move {
                vec![DependencyHealth {
                    name: "qdrant".into(),
                    ok: !self.fail,
                    latency_ms: 0,
                    detail: String::new(),
                }]
            })
        }
    }

    struct StubGenerator {
        calls: AtomicUsize,
        outcome: fn() -> Result<String, AiLlmError>,
        delay: Option<Duration>,
    }

    impl StubGenerator {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                outcome: || Ok("Refunds take 5 days [1].".into()),
                delay: None,
            }
        }
    }

    impl Generator for StubGenerator {
        fn generate<'a>(
            &'a self,
            _query: &'a str,
            _contexts: &'a [ContextChunk],
            _provider: LlmProvider,
        ) -> GenerateFuture<'a> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                if let Some(d) = self.delay {
                    tokio::time::sleep(d).await;
                }
                (self.outcome)()
            })
        }

        fn default_provider(&self) -> LlmProvider {
            LlmProvider::AzureOpenAI
        }

        fn supports(&self, provider: LlmProvider) -> bool {
            provider == LlmProvider::AzureOpenAI
        }
    }

    fn orch(r: StubRetriever, g: Arc<StubGenerator>, cfg: ContextorConfig) -> RagOrchestrator {
        RagOrchestrator::new(Arc::new(r), g, cfg)
    }

    fn req(q: &str, k: Option<usize>) -> AnswerRequest {
        AnswerRequest {
            query: q.into(),
            k,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn answers_with_meta() {
        let g = Arc::new(StubGenerator::ok());
        let r = StubRetriever {
            hits: vec![chunk("a", 0.9), chunk("b", 0.7), chunk("c", 0.6)],
            ..Default::default()
        };
        let o = orch(r, g.clone(), ContextorConfig::default());

        let a = o.answer(req("  How do refunds work? ", Some(2))).await.unwrap();
        assert_eq!(a.answer, "Refunds take 5 days [1].");
        assert_eq!(a.meta.k, 2);
        assert_eq!(a.contexts.len(), 2);
        assert!(a.meta.grounded);
        assert_eq!(a.meta.provider, LlmProvider::AzureOpenAI);
        assert!(a.meta.generated_at.ends_with('Z'));
        assert_eq!(g.calls.load(Ordering::SeqCst), 1);

        let b = o.answer(req("again", Some(2))).await.unwrap();
        assert_ne!(a.meta.request_id, b.meta.request_id);
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let o = orch(
            StubRetriever {
                hits: vec![chunk("a", 0.9)],
                ..Default::default()
            },
            Arc::new(StubGenerator::ok()),
            ContextorConfig::default(),
        );
        let mut r = req("q", None);
        r.request_id = Some("req-123".into());
        let a = o.answer(r).await.unwrap();
        assert_eq!(a.meta.request_id, "req-123");
        assert_eq!(a.meta.k, 4);
    }

    #[tokio::test]
    async fn retrieval_failure_skips_generator() {
        let g = Arc::new(StubGenerator::ok());
        let o = orch(
            StubRetriever {
                fail: true,
                ..Default::default()
            },
            g.clone(),
            ContextorConfig::default(),
        );
        let err = o.answer(req("q", None)).await.unwrap_err();
        assert!(matches!(err, ContextorError::Retrieval(_)));
        assert_eq!(g.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn weak_evidence_uses_guardrail() {
        let g = Arc::new(StubGenerator::ok());
        let o = orch(
            StubRetriever {
                hits: vec![chunk("a", 0.3)],
                ..Default::default()
            },
            g.clone(),
            ContextorConfig::default(),
        );
        let a = o.answer(req("q", None)).await.unwrap();
        assert_eq!(a.answer, NO_RELIABLE_ANSWER);
        assert!(!a.meta.grounded);
        assert_eq!(a.contexts.len(), 1);
        assert_eq!(g.calls.load(Ordering::SeqCst), 0);

        let empty = orch(StubRetriever::default(), g.clone(), ContextorConfig::default());
        let a = empty.answer(req("q", None)).await.unwrap();
        assert!(a.contexts.is_empty());
        assert!(!a.meta.grounded);
        assert_eq!(g.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn generation_failure_carries_contexts() {
        let g = Arc::new(StubGenerator {
            calls: AtomicUsize::new(0),
            outcome: || Err(AiLlmError::Config(ai_llm_service::ConfigError::EmptyModel)),
            delay: None,
        });
        let o = orch(
            StubRetriever {
                hits: vec![chunk("a", 0.9), chunk("b", 0.8)],
                ..Default::default()
            },
            g,
            ContextorConfig::default(),
        );
        let err = o.answer(req("q", None)).await.unwrap_err();
        assert!(matches!(err, ContextorError::Generation { .. }));
        assert_eq!(err.contexts().len(), 2);
    }

    #[tokio::test]
    async fn deadlines_produce_timeouts() {
        let cfg = ContextorConfig {
            retrieval_timeout: Duration::from_millis(20),
            generation_timeout: Duration::from_millis(20),
            ..ContextorConfig::default()
        };

        let slow_retriever = orch(
            StubRetriever {
                hits: vec![chunk("a", 0.9)],
                delay: Some(Duration::from_millis(500)),
                ..Default::default()
            },
            Arc::new(StubGenerator::ok()),
            cfg.clone(),
        );
        let err = slow_retriever.answer(req("q", None)).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout { stage: Stage::Retrieval, .. }));

        let slow_generator = orch(
            StubRetriever {
                hits: vec![chunk("a", 0.9)],
                ..Default::default()
            },
            Arc::new(StubGenerator {
                calls: AtomicUsize::new(0),
                outcome: || Ok("late".into()),
                delay: Some(Duration::from_millis(500)),
            }),
            cfg,
        );
        let err = slow_generator.answer(req("q", None)).await.unwrap_err();
        assert!(matches!(err, ContextorError::Timeout { stage: Stage::Generation, .. }));
        assert_eq!(err.contexts().len(), 1);
    }

    #[tokio::test]
    async fn validation_rules() {
        let g = Arc::new(StubGenerator::ok());
        let r = StubRetriever {
            hits: (0..30).map(|i| chunk(&format!("c{i}"), 1.0 - i as f32 / 100.0)).collect(),
            ..Default::default()
        };
        let cfg = ContextorConfig {
            max_query_chars: 10,
            ..ContextorConfig::default()
        };
        let o = orch(r, g.clone(), cfg);

        assert!(matches!(o.answer(req("   ", None)).await, Err(ContextorError::Validation(_))));
        assert!(matches!(o.answer(req("q", Some(0))).await, Err(ContextorError::Validation(_))));
        assert!(matches!(
            o.answer(req("this query is far too long", None)).await,
            Err(ContextorError::Validation(_))
        ));

        let mut other = req("q", None);
        other.provider = Some(LlmProvider::Ollama);
        assert!(matches!(o.answer(other).await, Err(ContextorError::Validation(_))));

        let hits = o.search("q", Some(100)).await.unwrap();
        assert_eq!(hits.len(), 20);
        assert!(hits.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(g.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn search_sorts_unsorted_hits() {
        let o = orch(
            StubRetriever {
                hits: vec![chunk("low", 0.1), chunk("high", 0.9), chunk("mid", 0.5)],
                ..Default::default()
            },
            Arc::new(StubGenerator::ok()),
            ContextorConfig::default(),
        );
        let hits = o.search("q", Some(2)).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[tokio::test]
    async fn repeated_search_returns_same_order_with_ties() {
        let o = orch(
            StubRetriever {
                hits: vec![
                    chunk("c", 0.8),
                    chunk("a", 0.8),
                    chunk("top", 0.95),
                    chunk("b", 0.8),
                    chunk("low", 0.4),
                ],
                rotate: true,
                ..Default::default()
            },
            Arc::new(StubGenerator::ok()),
            ContextorConfig::default(),
        );

        let ids = |hits: Vec<ContextChunk>| hits.into_iter().map(|h| h.id).collect::<Vec<_>>();
        let first = ids(o.search("refunds", Some(5)).await.unwrap());
        let second = ids(o.search("refunds", Some(5)).await.unwrap());

        assert_eq!(first, vec!["top", "a", "b", "c", "low"]);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn health_reports_store_probe() {
        let o = orch(
            StubRetriever {
                fail: true,
                ..Default::default()
            },
            Arc::new(StubGenerator::ok()),
            ContextorConfig::default(),
        );
        let report = o.health().await;
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].name, "qdrant");
        assert!(!report[0].ok);
    }
}
