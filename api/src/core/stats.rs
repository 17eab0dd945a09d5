//! Process-wide counters behind `/status` and `/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use ai_llm_service::LlmProvider;
use serde::Serialize;

/// Failure class attached to error responses as a response extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Retrieval,
    Generation,
    Timeout,
    Internal,
}

pub struct ServerStats {
    started: Instant,
    requests_total: AtomicU64,
    errors_total: AtomicU64,
    retrieval_errors: AtomicU64,
    generation_errors: AtomicU64,
    timeouts: AtomicU64,
    validation_errors: AtomicU64,
}

/// Body of `GET /status`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub requests_total: u64,
    pub errors_total: u64,
    pub retrieval_errors: u64,
    pub generation_errors: u64,
    pub timeouts: u64,
    pub validation_errors: u64,
    pub uptime_secs: u64,
    pub default_provider: LlmProvider,
    pub version: &'static str,
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            retrieval_errors: AtomicU64::new(0),
            generation_errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
        }
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an error response; `kind` is `None` for routing errors (404/405).
    pub fn record_error(&self, kind: Option<ErrorKind>) {
        self.errors_total.fetch_add(1, Ordering::Relaxed);
        let counter = match kind {
            Some(ErrorKind::Validation) => &self.validation_errors,
            Some(ErrorKind::Retrieval) => &self.retrieval_errors,
            Some(ErrorKind::Generation) => &self.generation_errors,
            Some(ErrorKind::Timeout) => &self.timeouts,
            Some(ErrorKind::Internal) | None => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, default_provider: LlmProvider) -> StatusSnapshot {
        StatusSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            errors_total: self.errors_total.load(Ordering::Relaxed),
            retrieval_errors: self.retrieval_errors.load(Ordering::Relaxed),
            generation_errors: self.generation_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            validation_errors: self.validation_errors.load(Ordering::Relaxed),
            uptime_secs: self.started.elapsed().as_secs(),
            default_provider,
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Prometheus text exposition (format 0.0.4).
    pub fn render_prometheus(&self) -> String {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        let counters: [(&str, &str, u64); 6] = [
            ("rag_requests_total", "HTTP requests handled.", load(&self.requests_total)),
            ("rag_errors_total", "Responses with a 4xx or 5xx status.", load(&self.errors_total)),
            ("rag_retrieval_errors_total", "Failed retrievals.", load(&self.retrieval_errors)),
            ("rag_generation_errors_total", "Failed generations.", load(&self.generation_errors)),
            ("rag_timeouts_total", "Stages that exceeded their deadline.", load(&self.timeouts)),
            ("rag_validation_errors_total", "Rejected requests.", load(&self.validation_errors)),
        ];

        let mut out = String::new();
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} counter");
            let _ = writeln!(out, "{name} {value}");
        }
        let _ = writeln!(out, "# HELP rag_uptime_seconds Seconds since the server started.");
        let _ = writeln!(out, "# TYPE rag_uptime_seconds gauge");
        let _ = writeln!(out, "rag_uptime_seconds {}", self.started.elapsed().as_secs());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_counted_by_kind() {
        let stats = ServerStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_error(Some(ErrorKind::Retrieval));
        stats.record_error(Some(ErrorKind::Timeout));
        stats.record_error(None);

        let s = stats.snapshot(LlmProvider::AzureOpenAI);
        assert_eq!(s.requests_total, 2);
        assert_eq!(s.errors_total, 3);
        assert_eq!(s.retrieval_errors, 1);
        assert_eq!(s.timeouts, 1);
        assert_eq!(s.generation_errors, 0);
        assert_eq!(s.validation_errors, 0);
    }

    #[test]
    fn prometheus_text_has_help_and_type() {
        let stats = ServerStats::new();
        stats.record_error(Some(ErrorKind::Validation));
        let text = stats.render_prometheus();

        assert!(text.contains("# TYPE rag_validation_errors_total counter\n"));
        assert!(text.contains("rag_validation_errors_total 1\n"));
        assert!(text.contains("rag_errors_total 1\n"));
        assert!(text.contains("# TYPE rag_uptime_seconds gauge\n"));
    }
}
