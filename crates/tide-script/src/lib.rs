//! tide-script: pluggable script evaluators and URL preprocessors
//!
//! Hosts register evaluators with an [`EvaluatorRegistry`] and ask a
//! [`ScriptDispatcher`] to evaluate embedded code or preprocess URLs. The
//! first registered evaluator that claims a mime type (or URL) handles it.
//!
//! ## Key Components
//!
//! - `ScriptEvaluator`: capability interface implemented by evaluators
//! - `EvaluatorRegistry`: ordered, identity-keyed, thread-safe registration
//! - `ScriptDispatcher`: `can_evaluate` / `can_preprocess` / `evaluate` / `preprocess`
//! - `PreprocessResult`: mime type + content returned by `preprocess`
//!
//! ```ignore
//! let dispatcher = ScriptDispatcher::default();
//! dispatcher.add_evaluator(Arc::new(RubyEvaluator::new()));
//! if dispatcher.can_evaluate("text/ruby") {
//!     let value = dispatcher
//!         .evaluate("text/ruby", "app://main.rb", source, &ScopeHandle::empty())
//!         .await?;
//! }
//! ```

pub mod config;
pub mod dispatcher;
mod error;
pub mod evaluator;
pub mod fakes;
pub mod obs;
pub mod registry;
pub mod telemetry;

pub use config::{EvaluatorsConfig, LoggingConfig, RegistryConfig, ScriptConfig};
pub use dispatcher::ScriptDispatcher;
pub use error::{ConfigError, EvaluatorError, EvaluatorResult, ScriptError, ScriptResult};
pub use evaluator::{
    EvaluationResult, EvaluatorRef, PreprocessOutput, PreprocessResult, ScopeHandle,
    ScriptEvaluator,
};
pub use obs::{
    dispatch_span, emit_dispatch_unmatched, emit_evaluator_added,
    emit_evaluator_duplicate_ignored, emit_evaluator_failed, emit_evaluator_remove_missed,
    emit_evaluator_removed, emit_evaluator_selected, DispatchSpan,
};
pub use registry::EvaluatorRegistry;
pub use telemetry::init_from_config;
