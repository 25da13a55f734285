/// Result alias used by fallible steps inside the drawing pipeline.
pub type DrawResult<T> = Result<T, DrawError>;

/// Errors raised by surface allocation, filter evaluation and configuration loading.
///
/// Tree operations (`update`, `render`, `pick`, ...) never surface these to callers; they log
/// and degrade instead.
#[derive(thiserror::Error, Debug)]
pub enum DrawError {
    /// Invalid caller-supplied data (bad buffer sizes, negative constants, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// A rasterization or compositing step could not run.
    #[error("render error: {0}")]
    Render(String),

    /// Configuration could not be read or parsed.
    #[error("config error: {0}")]
    Config(String),

    /// Anything else, with its source preserved.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DrawError {
    /// Build a [`DrawError::Validation`].
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DrawError::Render`].
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`DrawError::Config`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
