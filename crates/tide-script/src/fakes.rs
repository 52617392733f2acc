//! In-memory evaluator fakes (testing only)
//!
//! `StaticEvaluator` claims a fixed set of mime types and URL prefixes,
//! returns canned results and counts how often it is probed and invoked.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{EvaluatorError, EvaluatorResult};
use crate::evaluator::{EvaluationResult, PreprocessOutput, ScopeHandle, ScriptEvaluator};

/// Configurable evaluator with call accounting.
#[derive(Debug, Default)]
pub struct StaticEvaluator {
    name: String,
    mime_types: Vec<String>,
    url_prefixes: Vec<String>,
    result: Option<EvaluationResult>,
    output: Option<PreprocessOutput>,
    failure: Option<String>,
    delay: Option<Duration>,
    probes: AtomicUsize,
    evaluations: AtomicUsize,
    preprocessings: AtomicUsize,
    last_scope: Mutex<Option<ScopeHandle>>,
}

impl StaticEvaluator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Claim `mime_type` for evaluation.
    pub fn evaluates(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_types.push(mime_type.into());
        self
    }

    /// Claim every URL starting with `prefix` for preprocessing.
    pub fn preprocesses(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefixes.push(prefix.into());
        self
    }

    /// Fixed evaluation result. Without one, evaluation echoes its inputs.
    pub fn returning(mut self, result: EvaluationResult) -> Self {
        self.result = Some(result);
        self
    }

    /// Fixed preprocessing output. Without one, `("text/plain", "<name>:<url>")`.
    pub fn preprocessed_as(mut self, mime_type: &str, data: impl Into<Vec<u8>>) -> Self {
        self.output = Some(PreprocessOutput::new(mime_type, data));
        self
    }

    /// Make `evaluate` and `preprocess` fail with `message`.
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Sleep before answering `evaluate` / `preprocess`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of capability checks answered.
    pub fn probe_calls(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn evaluate_calls(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    pub fn preprocess_calls(&self) -> usize {
        self.preprocessings.load(Ordering::SeqCst)
    }

    /// Scope received by the most recent `evaluate` / `preprocess`.
    pub fn last_scope(&self) -> Option<ScopeHandle> {
        self.last_scope
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn enter(&self, scope: &ScopeHandle) {
        *self.last_scope.lock().unwrap_or_else(PoisonError::into_inner) = Some(scope.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ScriptEvaluator for StaticEvaluator {
    fn name(&self) -> &str {
        &self.name
    }

    fn can_evaluate(&self, mime_type: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.mime_types.iter().any(|m| m == mime_type)
    }

    fn can_preprocess(&self, url: &str) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.url_prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }

    async fn evaluate(
        &self,
        mime_type: &str,
        name: &str,
        code: &str,
        scope: &ScopeHandle,
    ) -> EvaluatorResult<EvaluationResult> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.enter(scope).await;
        if let Some(message) = &self.failure {
            return Err(EvaluatorError::Evaluation(message.clone()));
        }
        Ok(self.result.clone().unwrap_or_else(|| {
            json!({
                "evaluator": self.name,
                "mime_type": mime_type,
                "name": name,
                "code": code,
            })
        }))
    }

    async fn preprocess(
        &self,
        url: &str,
        scope: &ScopeHandle,
    ) -> EvaluatorResult<PreprocessOutput> {
        self.preprocessings.fetch_add(1, Ordering::SeqCst);
        self.enter(scope).await;
        if let Some(message) = &self.failure {
            return Err(EvaluatorError::Preprocess(message.clone()));
        }
        Ok(self.output.clone().unwrap_or_else(|| {
            PreprocessOutput::new("text/plain", format!("{}:{}", self.name, url))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_checks_count_probes() {
        let e = StaticEvaluator::new("fake")
            .evaluates("text/a")
            .preprocesses("app://");
        assert!(e.can_evaluate("text/a"));
        assert!(!e.can_evaluate("text/b"));
        assert!(e.can_preprocess("app://index.html"));
        assert!(!e.can_preprocess("http://example.com"));
        assert_eq!(e.probe_calls(), 4);
    }

    #[tokio::test]
    async fn test_default_evaluation_echoes_inputs() {
        let e = StaticEvaluator::new("echo").evaluates("text/a");
        let out = e
            .evaluate("text/a", "main.a", "1 + 1", &ScopeHandle::empty())
            .await
            .unwrap();
        assert_eq!(out["evaluator"], "echo");
        assert_eq!(out["code"], "1 + 1");
        assert_eq!(e.evaluate_calls(), 1);
    }

    #[tokio::test]
    async fn test_failing_evaluator() {
        let e = StaticEvaluator::new("bad").failing("boom");
        let err = e.preprocess("app://x", &ScopeHandle::empty()).await.unwrap_err();
        assert!(matches!(err, EvaluatorError::Preprocess(ref m) if m == "boom"));
    }
}
