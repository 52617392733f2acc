//! Error types for tide-script

use thiserror::Error;

/// Errors raised by an evaluator while evaluating or preprocessing.
///
/// The dispatcher hands these back to its caller exactly as the evaluator
/// produced them.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// The evaluator ran the code and it failed
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The evaluator could not transform the resource behind a URL
    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    /// The evaluator was asked for something it claimed but cannot do
    #[error("unsupported by evaluator: {what}")]
    Unsupported { what: String },

    /// Any other failure raised inside evaluator code
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors produced by dispatch.
#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("no evaluator found for mime type '{mime_type}'")]
    NoEvaluatorFound { mime_type: String },

    #[error("no preprocessor found for url '{url}'")]
    NoPreprocessorFound { url: String },

    /// Failure of the selected evaluator, unchanged.
    #[error(transparent)]
    Evaluator(#[from] EvaluatorError),
}

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for environment variable {var}")]
    InvalidEnv { var: String, value: String },
}

/// Result type for dispatch operations.
pub type ScriptResult<T> = std::result::Result<T, ScriptError>;

/// Result type returned by evaluator implementations.
pub type EvaluatorResult<T> = std::result::Result<T, EvaluatorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_match_messages_name_the_key() {
        let err = ScriptError::NoEvaluatorFound {
            mime_type: "text/ruby".into(),
        };
        assert_eq!(err.to_string(), "no evaluator found for mime type 'text/ruby'");

        let err = ScriptError::NoPreprocessorFound {
            url: "app://index.php".into(),
        };
        assert_eq!(err.to_string(), "no preprocessor found for url 'app://index.php'");
    }

    #[test]
    fn test_evaluator_error_is_transparent() {
        let inner = EvaluatorError::Evaluation("syntax error at line 3".into());
        let expected = inner.to_string();
        let err: ScriptError = inner.into();
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_anyhow_errors_keep_their_message() {
        let err: EvaluatorError = anyhow::anyhow!("interpreter crashed").into();
        assert_eq!(err.to_string(), "interpreter crashed");
    }
}
