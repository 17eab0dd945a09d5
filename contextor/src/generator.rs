//! Generator seam: `(query, contexts, provider) → answer text`.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::{AiLlmError, LlmProvider, LlmServiceProfiles};
use tracing::debug;

use crate::api_types::{ContextChunk, DependencyHealth};
use crate::prompt::{build_prompt, strip_think};
use crate::retriever::HealthFuture;

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>>;

pub trait Generator: Send + Sync {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        contexts: &'a [ContextChunk],
        provider: LlmProvider,
    ) -> GenerateFuture<'a>;

    /// Provider used when a request names none.
    fn default_provider(&self) -> LlmProvider;

    /// Whether `provider` can serve requests.
    fn supports(&self, provider: LlmProvider) -> bool;

    /// Probes every configured model. Never fails.
    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async { Vec::new() })
    }
}

/// [`Generator`] backed by the shared chat profiles.
pub struct LlmGenerator {
    llm: Arc<LlmServiceProfiles>,
    max_context_chars: usize,
}

impl LlmGenerator {
    pub fn new(llm: Arc<LlmServiceProfiles>, max_context_chars: usize) -> Self {
        Self {
            llm,
            max_context_chars,
        }
    }
}

impl Generator for LlmGenerator {
    fn generate<'a>(
        &'a self,
        query: &'a str,
        contexts: &'a [ContextChunk],
        provider: LlmProvider,
    ) -> GenerateFuture<'a> {
        Box::pin(async move {
            let prompt = build_prompt(query, contexts, self.max_context_chars);
            debug!(prompt_chars = prompt.len(), contexts = contexts.len(), "prompt built");
            let raw = self.llm.generate(Some(provider), &prompt, None).await?;
            Ok(strip_think(&raw))
        })
    }

    fn default_provider(&self) -> LlmProvider {
        self.llm.default_provider()
    }

    fn supports(&self, provider: LlmProvider) -> bool {
        self.llm.supports(provider)
    }

    fn health(&self) -> HealthFuture<'_> {
        Box::pin(async move {
            self.llm
                .health_all()
                .await
                .into_iter()
                .map(|h| DependencyHealth {
                    name: format!("llm:{}:{}", h.provider, h.model),
                    ok: h.ok,
                    latency_ms: h.latency_ms as u64,
                    detail: h.message,
                })
                .collect()
        })
    }
}
