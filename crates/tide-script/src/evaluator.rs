//! Evaluator contract and the values that flow through dispatch.
//!
//! - `ScriptEvaluator`: the capability interface every evaluator implements
//! - `ScopeHandle`: opaque execution scope handed through to evaluators
//! - `PreprocessResult`: mime type + content produced by preprocessing
//!
//! Evaluators are registered by shared handle (`Arc<dyn ScriptEvaluator>`),
//! so two registrations are "the same evaluator" only when they point at the
//! same allocation.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::EvaluatorResult;

/// Value produced by evaluating code. Never inspected by the dispatcher.
pub type EvaluationResult = serde_json::Value;

/// Shared handle to a registered evaluator.
pub type EvaluatorRef = Arc<dyn ScriptEvaluator>;

/// Opaque execution scope (e.g. the host's `window` object).
///
/// Cloning is cheap and preserves identity; evaluators may downcast to the
/// concrete type they expect.
#[derive(Clone)]
pub struct ScopeHandle(Arc<dyn Any + Send + Sync>);

impl ScopeHandle {
    pub fn new<T: Any + Send + Sync>(scope: T) -> Self {
        ScopeHandle(Arc::new(scope))
    }

    /// Scope for hosts that have no scope object.
    pub fn empty() -> Self {
        ScopeHandle(Arc::new(()))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles refer to the same scope object.
    pub fn same_scope(&self, other: &ScopeHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ScopeHandle {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ScopeHandle(..)")
    }
}

/// What an evaluator's `preprocess` hands back: a mime type and content.
///
/// Content is raw bytes; text producers can pass a `String` or `&str`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessOutput {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl PreprocessOutput {
    pub fn new(mime_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }
}

/// Result of `ScriptDispatcher::preprocess`.
///
/// Carries exactly what the selected evaluator produced; the mime type is not
/// validated.
///
/// Serializes as `{"mimeType", "data"}`. UTF-8 content is written as a plain
/// string; anything else is base64 with `"encoding": "base64"` alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireResult", try_from = "WireResult")]
pub struct PreprocessResult {
    mime_type: String,
    data: Vec<u8>,
}

impl PreprocessResult {
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The content as text, or `None` if it is not valid UTF-8.
    pub fn data_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }

    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.mime_type, self.data)
    }
}

impl From<PreprocessOutput> for PreprocessResult {
    fn from(output: PreprocessOutput) -> Self {
        PreprocessResult {
            mime_type: output.mime_type,
            data: output.data,
        }
    }
}

const BASE64_ENCODING: &str = "base64";

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResult {
    mime_type: String,
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
}

impl From<PreprocessResult> for WireResult {
    fn from(result: PreprocessResult) -> Self {
        match String::from_utf8(result.data) {
            Ok(text) => WireResult {
                mime_type: result.mime_type,
                data: text,
                encoding: None,
            },
            Err(e) => WireResult {
                mime_type: result.mime_type,
                data: STANDARD.encode(e.as_bytes()),
                encoding: Some(BASE64_ENCODING.to_string()),
            },
        }
    }
}

impl TryFrom<WireResult> for PreprocessResult {
    type Error = String;

    fn try_from(wire: WireResult) -> Result<Self, Self::Error> {
        let data = match wire.encoding.as_deref() {
            None => wire.data.into_bytes(),
            Some(BASE64_ENCODING) => STANDARD
                .decode(&wire.data)
                .map_err(|e| format!("invalid base64 data: {e}"))?,
            Some(other) => return Err(format!("unsupported data encoding '{other}'")),
        };
        Ok(PreprocessResult {
            mime_type: wire.mime_type,
            data,
        })
    }
}

/// A pluggable engine that evaluates embedded code and/or preprocesses URLs.
///
/// Contract:
/// - Capability checks are cheap, side-effect free and infallible. An
///   evaluator whose probing fails internally reports `false`.
/// - `evaluate` is only called after `can_evaluate` returned `true` for the
///   same mime type; likewise `preprocess` after `can_preprocess`.
/// - Evaluators run outside any registry lock and may call back into the
///   registry or dispatcher.
#[async_trait]
pub trait ScriptEvaluator: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str {
        "anonymous"
    }

    /// Can this evaluator run code of the given mime type (e.g. "text/ruby")?
    fn can_evaluate(&self, mime_type: &str) -> bool;

    /// Can this evaluator preprocess the resource behind `url`?
    fn can_preprocess(&self, url: &str) -> bool;

    /// Evaluate `code` of type `mime_type`. `name` is the code's origin,
    /// usually a file name or URL.
    async fn evaluate(
        &self,
        mime_type: &str,
        name: &str,
        code: &str,
        scope: &ScopeHandle,
    ) -> EvaluatorResult<EvaluationResult>;

    /// Produce the content that should be loaded in place of `url`.
    async fn preprocess(&self, url: &str, scope: &ScopeHandle)
        -> EvaluatorResult<PreprocessOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_downcast() {
        let scope = ScopeHandle::new(String::from("window"));
        assert_eq!(scope.downcast_ref::<String>().map(String::as_str), Some("window"));
        assert!(scope.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn test_scope_identity_survives_clone() {
        let scope = ScopeHandle::new(42u32);
        let copy = scope.clone();
        assert!(scope.same_scope(&copy));
        assert!(!scope.same_scope(&ScopeHandle::new(42u32)));
    }

    #[test]
    fn test_preprocess_result_serializes_camel_case() {
        let result = PreprocessResult::from(PreprocessOutput::new("text/html", "<p>hi</p>"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"mimeType": "text/html", "data": "<p>hi</p>"})
        );
    }

    #[test]
    fn test_binary_data_serializes_as_base64() {
        let png = vec![0x89, 0x50, 0x4e, 0x47, 0xff, 0xfe, 0x00];
        let result = PreprocessResult::from(PreprocessOutput::new("image/png", png.clone()));
        assert_eq!(result.data(), png.as_slice());
        assert!(result.data_str().is_none());

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "mimeType": "image/png",
                "data": "iVBOR//+AA==",
                "encoding": "base64"
            })
        );

        let back: PreprocessResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_unknown_data_encoding_is_rejected() {
        let err = serde_json::from_str::<PreprocessResult>(
            r#"{"mimeType": "text/plain", "data": "x", "encoding": "rot13"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("rot13"));
    }
}
