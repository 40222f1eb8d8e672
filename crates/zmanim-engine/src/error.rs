use zmanim_dsl::{DependencyError, EvalError, ParseError};

/// Errors that abort a whole calculation batch.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("duplicate zman key '{key}'")]
    DuplicateKey { key: String },

    #[error("formula '{key}': {source}")]
    Parse { key: String, source: ParseError },

    #[error(transparent)]
    Dependency(#[from] DependencyError),

    #[error("primitive provider unavailable while evaluating '{key}': {message}")]
    ProviderUnavailable { key: String, message: String },

    /// An evaluator invariant was broken. Not a user error.
    #[error("internal error evaluating '{key}': {source}")]
    Internal { key: String, source: EvalError },
}

impl EngineError {
    /// Key of the formula the error is attributed to.
    pub fn key(&self) -> &str {
        match self {
            Self::DuplicateKey { key }
            | Self::Parse { key, .. }
            | Self::ProviderUnavailable { key, .. }
            | Self::Internal { key, .. } => key,
            Self::Dependency(e) => e.key(),
        }
    }

    pub fn is_provider_unavailable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. })
    }
}

/// Why a single formula was rejected by [`crate::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Dependency(#[from] DependencyError),
}
