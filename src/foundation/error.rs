/// Convenience result type used across Slidecast.
pub type SlidecastResult<T> = Result<T, SlidecastError>;

/// Top-level error taxonomy used by pipeline APIs.
///
/// Asset-level failures (decode errors, timeouts) are recovered locally by
/// substitution and normally never reach callers; what does surface is either
/// a validation failure of the input story or a single opaque render/encode
/// failure from the export run.
#[derive(thiserror::Error, Debug)]
pub enum SlidecastError {
    /// Invalid user-provided story data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Errors while probing or decoding a media asset.
    #[error("asset error: {0}")]
    Asset(String),

    /// Errors while compositing frames or driving the render loop.
    #[error("render error: {0}")]
    Render(String),

    /// Errors while encoding or muxing the output container.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SlidecastError {
    /// Build a [`SlidecastError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`SlidecastError::Asset`] value.
    pub fn asset(msg: impl Into<String>) -> Self {
        Self::Asset(msg.into())
    }

    /// Build a [`SlidecastError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`SlidecastError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
