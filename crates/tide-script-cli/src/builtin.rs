//! Built-in evaluators installed by the `tide-script` host.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tide_script::{
    EvaluationResult, EvaluatorError, EvaluatorResult, EvaluatorsConfig, PreprocessOutput,
    ScopeHandle, ScriptDispatcher, ScriptEvaluator,
};

const APP_SCHEME: &str = "app://";

/// Parses code as JSON and returns the value.
#[derive(Debug, Default)]
pub struct JsonEvaluator;

#[async_trait]
impl ScriptEvaluator for JsonEvaluator {
    fn name(&self) -> &str {
        "json"
    }

    fn can_evaluate(&self, mime_type: &str) -> bool {
        matches!(mime_type, "application/json" | "text/json")
    }

    fn can_preprocess(&self, _url: &str) -> bool {
        false
    }

    async fn evaluate(
        &self,
        _mime_type: &str,
        name: &str,
        code: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<EvaluationResult> {
        serde_json::from_str(code).map_err(|e| EvaluatorError::Evaluation(format!("{name}: {e}")))
    }

    async fn preprocess(
        &self,
        url: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<PreprocessOutput> {
        Err(EvaluatorError::Unsupported {
            what: format!("preprocessing {url}"),
        })
    }
}

/// Returns plain text code as a JSON string.
#[derive(Debug, Default)]
pub struct TextEvaluator;

#[async_trait]
impl ScriptEvaluator for TextEvaluator {
    fn name(&self) -> &str {
        "text"
    }

    fn can_evaluate(&self, mime_type: &str) -> bool {
        mime_type == "text/plain"
    }

    fn can_preprocess(&self, _url: &str) -> bool {
        false
    }

    async fn evaluate(
        &self,
        _mime_type: &str,
        _name: &str,
        code: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<EvaluationResult> {
        Ok(EvaluationResult::String(code.to_string()))
    }

    async fn preprocess(
        &self,
        url: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<PreprocessOutput> {
        Err(EvaluatorError::Unsupported {
            what: format!("preprocessing {url}"),
        })
    }
}

/// Serves `app://` URLs from files under an application root.
#[derive(Debug)]
pub struct AppUrlPreprocessor {
    root: PathBuf,
}

impl AppUrlPreprocessor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// File backing `url`, refusing paths that escape the root.
    fn resolve(&self, url: &str) -> EvaluatorResult<PathBuf> {
        let rest = url.strip_prefix(APP_SCHEME).unwrap_or(url);
        let rest = rest.split(['?', '#']).next().unwrap_or_default();
        let relative = Path::new(rest);

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(EvaluatorError::Preprocess(format!(
                "{url} resolves outside the application root"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ScriptEvaluator for AppUrlPreprocessor {
    fn name(&self) -> &str {
        "app-url"
    }

    fn can_evaluate(&self, _mime_type: &str) -> bool {
        false
    }

    fn can_preprocess(&self, url: &str) -> bool {
        url.starts_with(APP_SCHEME)
    }

    async fn evaluate(
        &self,
        mime_type: &str,
        _name: &str,
        _code: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<EvaluationResult> {
        Err(EvaluatorError::Unsupported {
            what: format!("evaluating {mime_type}"),
        })
    }

    async fn preprocess(
        &self,
        url: &str,
        _scope: &ScopeHandle,
    ) -> EvaluatorResult<PreprocessOutput> {
        let path = self.resolve(url)?;
        let data = tokio::fs::read(&path)
            .await
            .map_err(|e| EvaluatorError::Preprocess(format!("{}: {e}", path.display())))?;
        Ok(PreprocessOutput::new(mime_type_for(&path), data))
    }
}

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("html") | Some("htm") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("xml") => "application/xml",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

/// Register the configured built-ins, in priority order.
pub fn install(dispatcher: &ScriptDispatcher, config: &EvaluatorsConfig) {
    if config.enable_json {
        dispatcher.add_evaluator(Arc::new(JsonEvaluator));
    }
    if config.enable_text {
        dispatcher.add_evaluator(Arc::new(TextEvaluator));
    }
    dispatcher.add_evaluator(Arc::new(AppUrlPreprocessor::new(config.app_root.clone())));
}
