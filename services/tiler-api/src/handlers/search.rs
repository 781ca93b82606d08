//! Catalog search handler.

use axum::extract::{Extension, Path};
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

use super::common::{ApiError, Envelope};
use crate::state::AppState;

/// GET /search/:path/:row — archive path/row scene search. Results come
/// from the catalog collaborator and are passed through verbatim.
#[instrument(skip(state))]
pub async fn search_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((path, row)): Path<(String, String)>,
) -> Result<Envelope, ApiError> {
    let results = state.catalog.search(&path, &row).await?;
    Ok(Envelope::json(&json!({
        "request": { "path": path, "row": row },
        "meta": { "found": results.len() },
        "results": results,
    })))
}
