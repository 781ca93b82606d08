//! Error types for scene-tiler services.

use thiserror::Error;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Primary error type for tiler operations.
#[derive(Debug, Error)]
pub enum TilerError {
    // === Request validation errors ===
    #[error("{0}")]
    MissingParameters(String),

    #[error("{0}")]
    ConflictingParameters(String),

    // The message is the full client-facing text; several of them are
    // load-bearing strings older clients match on.
    #[error("{message}")]
    InvalidParameter { param: String, message: String },

    #[error("The number of bands doesn't match the number of histogram values")]
    BandCountMismatch,

    #[error("Invalid color formula: {0}")]
    InvalidColorFormula(String),

    // === Upstream errors ===
    #[error("Raster backend error: {0}")]
    UpstreamFetchFailure(String),

    // === Rendering/encoding errors ===
    #[error("Rendering failed: {0}")]
    RenderError(String),

    #[error("Image encoding failed: {0}")]
    EncodeError(String),
}

impl TilerError {
    /// Stable machine-readable code for JSON error envelopes.
    pub fn error_code(&self) -> &'static str {
        match self {
            TilerError::MissingParameters(_) => "MissingParameters",
            TilerError::ConflictingParameters(_) => "ConflictingParameters",
            TilerError::InvalidParameter { .. } => "InvalidParameter",
            TilerError::BandCountMismatch => "BandCountMismatch",
            TilerError::InvalidColorFormula(_) => "InvalidColorFormula",
            TilerError::UpstreamFetchFailure(_) => "UpstreamFetchFailure",
            TilerError::RenderError(_) => "RenderError",
            TilerError::EncodeError(_) => "EncodeError",
        }
    }

    /// HTTP status code the routing layer should emit for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            TilerError::MissingParameters(_)
            | TilerError::ConflictingParameters(_)
            | TilerError::InvalidParameter { .. }
            | TilerError::BandCountMismatch
            | TilerError::InvalidColorFormula(_) => 400,

            TilerError::UpstreamFetchFailure(_) => 502,

            TilerError::RenderError(_) | TilerError::EncodeError(_) => 500,
        }
    }

    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_param(param: &str, message: impl Into<String>) -> Self {
        TilerError::InvalidParameter {
            param: param.to_string(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for TilerError {
    fn from(err: serde_json::Error) -> Self {
        TilerError::RenderError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_client_errors() {
        assert_eq!(
            TilerError::MissingParameters("Need bands or expression".into()).http_status_code(),
            400
        );
        assert_eq!(TilerError::BandCountMismatch.http_status_code(), 400);
        assert_eq!(
            TilerError::invalid_param("dem", "Invalid 'dem' mode").http_status_code(),
            400
        );
    }

    #[test]
    fn upstream_failure_is_bad_gateway() {
        let err = TilerError::UpstreamFetchFailure("timeout".into());
        assert_eq!(err.http_status_code(), 502);
        assert_eq!(err.error_code(), "UpstreamFetchFailure");
    }

    #[test]
    fn band_count_mismatch_message_is_stable() {
        assert_eq!(
            TilerError::BandCountMismatch.to_string(),
            "The number of bands doesn't match the number of histogram values"
        );
    }

    #[test]
    fn invalid_parameter_displays_bare_message() {
        assert_eq!(
            TilerError::invalid_param("dem", "Invalid 'dem' mode").to_string(),
            "Invalid 'dem' mode"
        );
    }
}
