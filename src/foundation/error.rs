/// Convenience result type used across the crate.
pub type StageResult<T> = Result<T, StageError>;

/// Top-level error taxonomy for stage and export APIs.
#[derive(thiserror::Error, Debug)]
pub enum StageError {
    /// Invalid user-provided data (bad color strings, zero-sized canvases, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// An image source could not be fetched or decoded. Non-fatal: the add that
    /// triggered the load is abandoned and the stack is left untouched.
    #[error("image load error: {0}")]
    ImageLoad(String),

    /// A layering precondition was violated (removing or selecting the
    /// background fill). These are programming errors, not user-facing failures.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Errors when serializing or deserializing catalog/scene documents.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StageError {
    /// Build a [`StageError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StageError::ImageLoad`] value.
    pub fn image_load(msg: impl Into<String>) -> Self {
        Self::ImageLoad(msg.into())
    }

    /// Build a [`StageError::InvariantViolation`] value.
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Build a [`StageError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
