//! Structured observability hooks for registry and dispatch events.
//!
//! Registry mutations are emitted at `info!`, per-call selection at `debug!`
//! and evaluator failures at `warn!`. Filter with `RUST_LOG`, e.g.
//! `RUST_LOG=tide_script=debug`.

use tracing::{debug, info, warn};

/// Span covering one dispatch. `key` is the mime type or URL dispatched on.
///
/// Async dispatch attaches it with `Instrument`; sync callers use
/// [`DispatchSpan`].
pub fn dispatch_span(operation: &'static str, key: &str) -> tracing::Span {
    tracing::debug_span!("tide.dispatch", op = operation, key = %key)
}

/// RAII guard that enters a [`dispatch_span`] for the current scope.
pub struct DispatchSpan {
    _span: tracing::span::EnteredSpan,
}

impl DispatchSpan {
    pub fn enter(operation: &'static str, key: &str) -> Self {
        Self {
            _span: dispatch_span(operation, key).entered(),
        }
    }
}

pub fn emit_evaluator_added(name: &str, position: usize) {
    info!(event = "registry.added", evaluator = %name, position = position);
}

/// A handle that was already registered was added again and ignored.
pub fn emit_evaluator_duplicate_ignored(name: &str) {
    debug!(event = "registry.duplicate_ignored", evaluator = %name);
}

pub fn emit_evaluator_removed(name: &str, position: usize) {
    info!(event = "registry.removed", evaluator = %name, position = position);
}

/// Removal of a handle that is not registered (not an error).
pub fn emit_evaluator_remove_missed(name: &str) {
    debug!(event = "registry.remove_missed", evaluator = %name);
}

pub fn emit_evaluator_selected(operation: &str, key: &str, name: &str, position: usize) {
    debug!(
        event = "dispatch.selected",
        op = %operation,
        key = %key,
        evaluator = %name,
        position = position,
    );
}

pub fn emit_dispatch_unmatched(operation: &str, key: &str, candidates: usize) {
    debug!(
        event = "dispatch.unmatched",
        op = %operation,
        key = %key,
        candidates = candidates,
    );
}

/// The selected evaluator failed; the error goes back to the caller as-is.
pub fn emit_evaluator_failed(operation: &str, name: &str, error: &dyn std::fmt::Display) {
    warn!(event = "dispatch.evaluator_failed", op = %operation, evaluator = %name, error = %error);
}
