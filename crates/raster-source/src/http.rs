//! HTTP clients for the raster engine and scene catalog services.
//!
//! A failed upstream call is surfaced as `UpstreamFetchFailure` and never
//! retried here; request-scoped failure semantics are owned by the caller.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use tiler_common::error::{TilerError, TilerResult};
use tiler_common::tile::{Mask, TileData};

use crate::wire::decode_tile;
use crate::{RasterSource, SceneCatalog, SceneTarget, TileFetchRequest};

/// Raster engine client speaking the `RTL1` tile payload format.
#[derive(Debug, Clone)]
pub struct HttpRasterSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRasterSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_slash(base_url.into()),
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> TilerResult<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(upstream)?;
        if !resp.status().is_success() {
            return Err(upstream_status(path, resp.status()));
        }
        resp.json().await.map_err(upstream)
    }
}

#[async_trait]
impl RasterSource for HttpRasterSource {
    async fn fetch_tile(&self, req: &TileFetchRequest) -> TilerResult<Option<(TileData, Mask)>> {
        let url = format!("{}/tile", self.base_url);
        let (target_key, target_value) = req.target.as_query();

        let mut query: Vec<(&str, String)> = vec![
            (target_key, target_value.to_string()),
            ("z", req.z.to_string()),
            ("x", req.x.to_string()),
            ("y", req.y.to_string()),
            ("tilesize", req.tile_size.to_string()),
        ];
        if let Some(bands) = &req.bands {
            query.push(("bands", bands.join(",")));
        }
        if let Some(expr) = &req.expression {
            query.push(("expr", expr.clone()));
        }
        if let Some(nodata) = req.nodata {
            query.push(("nodata", nodata.to_string()));
        }

        debug!(z = req.z, x = req.x, y = req.y, "fetching tile from raster engine");
        let resp = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(upstream)?;

        match resp.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let payload = resp.bytes().await.map_err(upstream)?;
                decode_tile(&payload).map(Some)
            }
            status => Err(upstream_status("tile", status)),
        }
    }

    async fn bounds(&self, target: &SceneTarget) -> TilerResult<Value> {
        let (key, value) = target.as_query();
        self.get_json("bounds", &[(key, value.to_string())]).await
    }

    async fn metadata(&self, target: &SceneTarget, pmin: f64, pmax: f64) -> TilerResult<Value> {
        let (key, value) = target.as_query();
        self.get_json(
            "metadata",
            &[
                (key, value.to_string()),
                ("pmin", pmin.to_string()),
                ("pmax", pmax.to_string()),
            ],
        )
        .await
    }
}

/// Catalog-search client; results are passed through verbatim.
#[derive(Debug, Clone)]
pub struct HttpSceneCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSceneCatalog {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_slash(base_url.into()),
        }
    }
}

#[async_trait]
impl SceneCatalog for HttpSceneCatalog {
    async fn search(&self, path: &str, row: &str) -> TilerResult<Vec<Value>> {
        let url = format!("{}/search", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("path", path), ("row", row)])
            .send()
            .await
            .map_err(upstream)?;
        if !resp.status().is_success() {
            return Err(upstream_status("search", resp.status()));
        }
        resp.json().await.map_err(upstream)
    }
}

fn trim_slash(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

fn upstream(err: reqwest::Error) -> TilerError {
    TilerError::UpstreamFetchFailure(err.to_string())
}

fn upstream_status(endpoint: &str, status: StatusCode) -> TilerError {
    TilerError::UpstreamFetchFailure(format!("{} request failed with status {}", endpoint, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let source = HttpRasterSource::new("http://engine:9090/");
        assert_eq!(source.base_url, "http://engine:9090");
    }

    #[test]
    fn target_query_keys() {
        assert_eq!(
            SceneTarget::Scene("LC08_L1TP".into()).as_query().0,
            "scene"
        );
        assert_eq!(
            SceneTarget::Url("s3://bucket/cog.tif".into()).as_query().0,
            "url"
        );
    }
}
