//! Shared handler utilities: the response envelope, error mapping, and tile
//! path-segment parsing.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::json;
use tracing::warn;

use tiler_common::error::TilerError;

/// Normalized response status reported to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStatus {
    Ok,
    Empty,
}

/// The `{status, mime_type, body}` triple handlers produce. Compression and
/// any base64 framing are the transport layer's concern; the body here is
/// always raw bytes or UTF-8 JSON.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub status: EnvelopeStatus,
    pub mime_type: &'static str,
    pub body: Bytes,
}

impl Envelope {
    pub fn ok(mime_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status: EnvelopeStatus::Ok,
            mime_type,
            body: body.into(),
        }
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::ok("application/json", value.to_string())
    }

    /// Empty body with a neutral status (favicon).
    pub fn empty() -> Self {
        Self {
            status: EnvelopeStatus::Empty,
            mime_type: "text/plain",
            body: Bytes::new(),
        }
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, self.mime_type)
            .body(Body::from(self.body))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Handler-level error: a `TilerError` marshalled into the JSON error
/// envelope (`status: NOK`) with the matching HTTP status.
#[derive(Debug)]
pub struct ApiError(pub TilerError);

impl From<TilerError> for ApiError {
    fn from(err: TilerError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        warn!(code = err.error_code(), "request failed: {}", err);
        let body = json!({
            "status": "NOK",
            "code": err.error_code(),
            "message": err.to_string(),
        });
        let status = StatusCode::from_u16(err.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}

/// Parse the final tile path segment: `94.png` or `94@2x.png` into
/// `(y, scale, extension)`.
pub fn parse_y_segment(segment: &str) -> Result<(u32, Option<i64>, &str), TilerError> {
    let (stem, ext) = segment
        .rsplit_once('.')
        .ok_or_else(|| TilerError::invalid_param("y", "Tile path is missing a file extension"))?;
    if ext.is_empty() {
        return Err(TilerError::invalid_param(
            "y",
            "Tile path is missing a file extension",
        ));
    }

    let (y_str, scale) = match stem.split_once('@') {
        Some((y, scale_spec)) => {
            let digits = scale_spec.strip_suffix('x').ok_or_else(|| {
                TilerError::invalid_param("scale", format!("Invalid scale suffix '{}'", scale_spec))
            })?;
            let scale = digits.parse::<i64>().map_err(|_| {
                TilerError::invalid_param("scale", format!("Invalid tile scale '{}'", digits))
            })?;
            (y, Some(scale))
        }
        None => (stem, None),
    };

    let y = y_str
        .parse::<u32>()
        .map_err(|_| TilerError::invalid_param("y", format!("Invalid tile row '{}'", y_str)))?;
    Ok((y, scale, ext))
}

/// GET /favicon.ico
pub async fn favicon_handler() -> Envelope {
    Envelope::empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_segment() {
        assert_eq!(parse_y_segment("94.png").unwrap(), (94, None, "png"));
    }

    #[test]
    fn scaled_segment() {
        assert_eq!(parse_y_segment("94@2x.jpg").unwrap(), (94, Some(2), "jpg"));
    }

    #[test]
    fn bad_segments_are_rejected() {
        assert!(parse_y_segment("94").is_err());
        assert!(parse_y_segment("94@2.png").is_err());
        assert!(parse_y_segment("abc.png").is_err());
        assert!(parse_y_segment("94@x.png").is_err());
    }

    #[test]
    fn negative_scale_parses_for_resolver_to_reject() {
        // the resolver owns the positivity check
        assert_eq!(
            parse_y_segment("94@-1x.png").unwrap(),
            (94, Some(-1), "png")
        );
    }
}
