//! First-match-wins dispatch over an [`EvaluatorRegistry`].
//!
//! Every operation takes a snapshot of the registry at entry, probes the
//! evaluators in registration order and commits to the first one that
//! claims the mime type or URL. A selected evaluator that fails is not
//! retried and no later evaluator is tried in its place.

use std::sync::Arc;

use tracing::Instrument;

use crate::error::{ScriptError, ScriptResult};
use crate::evaluator::{
    EvaluationResult, EvaluatorRef, PreprocessResult, ScopeHandle, ScriptEvaluator,
};
use crate::obs;
use crate::registry::EvaluatorRegistry;

/// Answers capability questions and delegates evaluate/preprocess calls.
#[derive(Debug, Clone, Default)]
pub struct ScriptDispatcher {
    registry: Arc<EvaluatorRegistry>,
}

impl ScriptDispatcher {
    pub fn new(registry: Arc<EvaluatorRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<EvaluatorRegistry> {
        &self.registry
    }

    pub fn add_evaluator(&self, evaluator: EvaluatorRef) {
        self.registry.add(evaluator);
    }

    pub fn remove_evaluator(&self, evaluator: &EvaluatorRef) -> bool {
        self.registry.remove(evaluator)
    }

    /// Whether any registered evaluator can evaluate `mime_type`.
    pub fn can_evaluate(&self, mime_type: &str) -> bool {
        let _span = obs::DispatchSpan::enter("can_evaluate", mime_type);
        self.find_evaluator(mime_type).is_some()
    }

    /// Whether any registered evaluator can preprocess `url`.
    pub fn can_preprocess(&self, url: &str) -> bool {
        let _span = obs::DispatchSpan::enter("can_preprocess", url);
        self.find_preprocessor(url).is_some()
    }

    /// The evaluator `evaluate` would select for `mime_type`.
    pub fn find_evaluator(&self, mime_type: &str) -> Option<EvaluatorRef> {
        self.select("evaluate", mime_type, |e| e.can_evaluate(mime_type))
    }

    /// The evaluator `preprocess` would select for `url`.
    pub fn find_preprocessor(&self, url: &str) -> Option<EvaluatorRef> {
        self.select("preprocess", url, |e| e.can_preprocess(url))
    }

    /// Evaluate `code` with the first evaluator that claims `mime_type`.
    ///
    /// The evaluator's result is returned untouched.
    pub async fn evaluate(
        &self,
        mime_type: &str,
        name: &str,
        code: &str,
        scope: &ScopeHandle,
    ) -> ScriptResult<EvaluationResult> {
        async {
            let evaluator = self.find_evaluator(mime_type).ok_or_else(|| {
                ScriptError::NoEvaluatorFound {
                    mime_type: mime_type.to_string(),
                }
            })?;

            let result = evaluator
                .evaluate(mime_type, name, code, scope)
                .await
                .map_err(|err| {
                    obs::emit_evaluator_failed("evaluate", evaluator.name(), &err);
                    ScriptError::from(err)
                })?;
            Ok::<_, ScriptError>(result)
        }
        .instrument(obs::dispatch_span("evaluate", mime_type))
        .await
    }

    /// Preprocess `url` with the first evaluator that claims it.
    pub async fn preprocess(
        &self,
        url: &str,
        scope: &ScopeHandle,
    ) -> ScriptResult<PreprocessResult> {
        async {
            let evaluator = self
                .find_preprocessor(url)
                .ok_or_else(|| ScriptError::NoPreprocessorFound {
                    url: url.to_string(),
                })?;

            let output = evaluator.preprocess(url, scope).await.map_err(|err| {
                obs::emit_evaluator_failed("preprocess", evaluator.name(), &err);
                ScriptError::from(err)
            })?;
            Ok::<_, ScriptError>(PreprocessResult::from(output))
        }
        .instrument(obs::dispatch_span("preprocess", url))
        .await
    }

    // Probes run against a snapshot, outside the registry lock.
    fn select<F>(&self, operation: &str, key: &str, probe: F) -> Option<EvaluatorRef>
    where
        F: Fn(&dyn ScriptEvaluator) -> bool,
    {
        if key.is_empty() {
            obs::emit_dispatch_unmatched(operation, key, 0);
            return None;
        }

        let candidates = self.registry.snapshot();
        let total = candidates.len();
        match candidates
            .into_iter()
            .enumerate()
            .find(|(_, e)| probe(&**e))
        {
            Some((position, evaluator)) => {
                obs::emit_evaluator_selected(operation, key, evaluator.name(), position);
                Some(evaluator)
            }
            None => {
                obs::emit_dispatch_unmatched(operation, key, total);
                None
            }
        }
    }
}
