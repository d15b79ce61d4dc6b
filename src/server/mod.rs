//! HTTP polling API.
//!
//! Clients poll `/api/updates` with the digest of the snapshot they last saw in
//! the `X-Dashboard-Hash` header. An unchanged snapshot answers 304 with no
//! body; otherwise the full snapshot is returned along with the keys that
//! changed since the client's snapshot, when the server still remembers it.

pub mod cache;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result};
use crate::domain::FetchResult;
use crate::hashing;
use crate::state::StateStore;

pub use cache::TtlCache;

pub const DASHBOARD_HASH_HEADER: &str = "x-dashboard-hash";

/// Section id → latest result, restricted to configured sections.
pub type Snapshot = BTreeMap<String, FetchResult>;

#[derive(Clone)]
pub struct ApiState {
    store: StateStore,
    sections: Arc<Vec<String>>,
    snapshots: Arc<TtlCache<Snapshot>>,
}

impl ApiState {
    pub fn new(store: StateStore, sections: Vec<String>, snapshot_ttl: Duration) -> Self {
        Self {
            store,
            sections: Arc::new(sections),
            snapshots: Arc::new(TtlCache::new(snapshot_ttl)),
        }
    }

    pub fn from_context(ctx: &AppContext) -> Result<Self> {
        Ok(Self::new(
            ctx.state.clone(),
            ctx.section_ids(),
            ctx.config.server.update_interval()?,
        ))
    }

    fn snapshot(&self) -> Snapshot {
        let all = self.store.snapshot();
        self.sections
            .iter()
            .filter_map(|id| all.get(id).map(|r| (id.clone(), r.clone())))
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct UpdatesResponse {
    status: &'static str,
    hash: String,
    updates: Snapshot,
    changed: Vec<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/updates", get(updates))
        .with_state(state)
}

async fn updates(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let current = state.snapshot();

    let hash = match hashing::hash(&current) {
        Ok(hash) => hash,
        Err(e) => {
            tracing::warn!(error = %e, "failed to hash snapshot");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let client_hash = headers
        .get(DASHBOARD_HASH_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    if client_hash == Some(hash.as_str()) {
        state.snapshots.insert(hash, current);
        return StatusCode::NOT_MODIFIED.into_response();
    }

    let changed = match client_hash.and_then(|h| state.snapshots.get(h)) {
        Some(previous) => hashing::diff(&previous, &current),
        None => Ok(current.keys().cloned().collect()),
    };
    let changed = match changed {
        Ok(changed) => changed,
        Err(e) => return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    };

    state.snapshots.insert(hash.clone(), current.clone());

    Json(UpdatesResponse {
        status: "ok",
        hash,
        updates: current,
        changed,
    })
    .into_response()
}

/// Serve `router` on `listener` until `cancel` fires, then drain in-flight requests.
pub async fn serve(listener: TcpListener, router: Router, cancel: CancellationToken) -> Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "http server listening");
    }

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::TributaryError;
    use crate::domain::{Payload, WeatherData};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use tower::ServiceExt;

    fn weather(name: &str, city: &str) -> FetchResult {
        let data = WeatherData {
            city: city.to_string(),
            ..WeatherData::default()
        };
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        FetchResult::from_outcome(name, Ok(Payload::Weather(data)), at)
    }

    fn api(sections: &[&str]) -> (StateStore, Router) {
        let store = StateStore::new();
        let state = ApiState::new(
            store.clone(),
            sections.iter().map(|s| s.to_string()).collect(),
            Duration::from_secs(300),
        );
        (store, router(state))
    }

    async fn get_updates(router: &Router, hash: Option<&str>) -> (StatusCode, serde_json::Value) {
        let mut request = Request::builder().uri("/api/updates");
        if let Some(hash) = hash {
            request = request.header(DASHBOARD_HASH_HEADER, hash);
        }
        let response = router
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let (_, router) = api(&[]);
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_updates_lists_configured_sections_only() {
        let (store, router) = api(&["weather"]);
        store.insert(weather("weather", "Oslo"));
        store.insert(weather("unconfigured", "Rome"));

        let (status, json) = get_updates(&router, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["updates"]["weather"]["data"]["city"], "Oslo");
        assert!(json["updates"].get("unconfigured").is_none());
        assert_eq!(json["changed"], serde_json::json!(["weather"]));
    }

    #[tokio::test]
    async fn test_matching_hash_is_not_modified() {
        let (store, router) = api(&["weather"]);
        store.insert(weather("weather", "Oslo"));

        let (_, json) = get_updates(&router, None).await;
        let hash = json["hash"].as_str().unwrap().to_string();

        let (status, body) = get_updates(&router, Some(&hash)).await;
        assert_eq!(status, StatusCode::NOT_MODIFIED);
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn test_changed_lists_only_differing_sections() {
        let (store, router) = api(&["news", "weather"]);
        store.insert(weather("weather", "Oslo"));
        store.insert(weather("news", "n/a"));

        let (_, json) = get_updates(&router, None).await;
        let hash = json["hash"].as_str().unwrap().to_string();

        store.insert(weather("weather", "Rome"));
        let (status, json) = get_updates(&router, Some(&hash)).await;
        assert_eq!(status, StatusCode::OK);
        assert_ne!(json["hash"].as_str().unwrap(), hash);
        assert_eq!(json["changed"], serde_json::json!(["weather"]));
    }

    #[tokio::test]
    async fn test_unknown_client_hash_marks_everything_changed() {
        let (store, router) = api(&["news", "weather"]);
        store.insert(weather("weather", "Oslo"));
        store.insert(weather("news", "n/a"));

        let (_, json) = get_updates(&router, Some("stale")).await;
        assert_eq!(json["changed"], serde_json::json!(["news", "weather"]));
    }

    #[tokio::test]
    async fn test_failed_results_are_reported() {
        let (store, router) = api(&["weather"]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store.insert(FetchResult::from_outcome(
            "weather",
            Err(TributaryError::Status(502)),
            at,
        ));

        let (_, json) = get_updates(&router, None).await;
        let entry = &json["updates"]["weather"];
        assert!(entry["data"].is_null());
        assert_eq!(entry["status"]["is_healthy"], false);
        assert_eq!(entry["status"]["error"], "unexpected status code: 502");
    }

    #[tokio::test]
    async fn test_empty_state_hash_is_stable() {
        let (_, router) = api(&["weather"]);
        let (_, first) = get_updates(&router, None).await;
        let (_, second) = get_updates(&router, None).await;
        assert_eq!(first["hash"], second["hash"]);
        assert_eq!(first["updates"], serde_json::json!({}));
    }
}
