use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, ETAG, IF_NONE_MATCH},
        HeaderMap, Method, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::api::{ApiClient, EventSource};
use crate::cache::{self, CachedPage, PageCache};
use crate::config::AppConfig;
use crate::coordinator;
use crate::engine::{self, GridSummary};
use crate::error::AppError;
use crate::filters::FilterState;
use crate::models::Event;
use crate::render;
use crate::session::{GridPhase, GridSession};
use crate::store::EventStore;

pub struct AppState {
    pub source: Arc<dyn EventSource>,
    pub config: AppConfig,
    pub cache: PageCache,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Arc<Self>> {
        let client = ApiClient::new(&config.api_base_url, config.http_timeout())
            .with_context(|| format!("invalid festival API url {}", config.api_base_url))?;
        Ok(Self::with_source(config, Arc::new(client)))
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn EventSource>) -> Arc<Self> {
        Arc::new(Self {
            cache: PageCache::new(config.page_ttl()),
            source,
            config,
        })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(home_handler))
        .route("/events/{slug}", get(event_handler))
        .route("/api/events", get(events_handler))
        .route(
            "/api/revalidate",
            get(revalidate_handler).post(revalidate_batch_handler),
        )
        .fallback(not_found_handler)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn home_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let filters = FilterState::decode(query.as_deref().unwrap_or_default());
    let key = filters.href();
    if let Some(page) = state.cache.get(&key) {
        return page_response(page, &headers, true);
    }

    let (stats, categories) = tokio::join!(state.source.stats(), state.source.categories());
    // A page rendered without stats or categories is served but not cached.
    let mut degraded = false;
    let stats = stats
        .map_err(|err| {
            warn!("failed to load festival stats: {err}");
            degraded = true;
        })
        .ok();
    let categories = categories.unwrap_or_else(|err| {
        warn!("failed to load event types: {err}");
        degraded = true;
        Vec::new()
    });

    let session = GridSession::with_store(
        Arc::clone(&state.source),
        state.config.session_options(),
        EventStore::new(Vec::new(), categories),
    );
    session.navigate(&filters.encode()).await;
    let snapshot = session.snapshot();

    let body = render::home_page(&snapshot, stats.as_ref()).into_string();
    if degraded || matches!(snapshot.phase(), GridPhase::Failed(_)) {
        let page = CachedPage {
            etag: cache::etag_for(&body),
            body,
        };
        return page_response(page, &headers, false);
    }
    let page = state.cache.insert(key, body);
    page_response(page, &headers, true)
}

pub async fn event_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let key = format!("/events/{}", urlencoding::encode(&slug));
    if let Some(page) = state.cache.get(&key) {
        return Ok(page_response(page, &headers, true));
    }

    let event = state.source.event(&slug).await?;
    let body = render::detail_page(&event, Utc::now()).into_string();
    let page = state.cache.insert(key, body);
    Ok(page_response(page, &headers, true))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub query: String,
    pub filters: FilterState,
    pub summary: GridSummary,
    pub count: usize,
    pub data: Vec<Event>,
}

/// Filtered and sorted records for a query string, as JSON.
pub async fn events_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<Json<EventsResponse>, AppError> {
    let filters = FilterState::decode(query.as_deref().unwrap_or_default());
    let plan = state.config.policy().plan(&filters);
    let records = coordinator::execute(state.source.as_ref(), &plan).await?;

    let store = EventStore::new(records, Vec::new());
    let visible = engine::apply(store.current(), &filters);
    let summary = engine::summarize(&visible);
    let data: Vec<Event> = visible.into_iter().cloned().collect();

    Ok(Json(EventsResponse {
        query: filters.encode(),
        count: data.len(),
        summary,
        filters,
        data,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RevalidateParams {
    pub secret: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RevalidateBody {
    #[serde(default)]
    paths: Vec<String>,
}

pub async fn revalidate_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RevalidateParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_secret(&state.config, params.secret.as_deref())?;

    match params.path.filter(|path| !path.trim().is_empty()) {
        Some(path) => {
            let removed = state.cache.revalidate(&path);
            info!(path = %path, removed, "revalidated path");
            Ok(Json(json!({
                "revalidated": true,
                "type": "path",
                "path": path,
                "timestamp": timestamp(),
            })))
        }
        None => {
            let removed = state.cache.revalidate_all();
            info!(removed, "revalidated all pages");
            Ok(Json(json!({
                "revalidated": true,
                "type": "all",
                "message": "Full site cache cleared",
                "timestamp": timestamp(),
            })))
        }
    }
}

/// Webhook flavour: `{ "paths": [...] }`; a missing or empty list clears everything.
pub async fn revalidate_batch_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RevalidateParams>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    check_secret(&state.config, params.secret.as_deref())?;

    let request: RevalidateBody = serde_json::from_slice(&body).unwrap_or_default();
    let mut paths: Vec<String> = request
        .paths
        .into_iter()
        .filter(|path| !path.trim().is_empty())
        .collect();

    if paths.is_empty() {
        state.cache.revalidate_all();
        paths.push("/".to_string());
    } else {
        for path in &paths {
            state.cache.revalidate(path);
        }
    }
    info!(count = paths.len(), "revalidated paths from webhook");

    Ok(Json(json!({
        "revalidated": true,
        "paths": paths,
        "timestamp": timestamp(),
    })))
}

async fn not_found_handler() -> AppError {
    AppError::NotFound
}

fn check_secret(config: &AppConfig, provided: Option<&str>) -> Result<(), AppError> {
    match config.revalidate_secret.as_deref() {
        Some(expected) if provided != Some(expected) => Err(AppError::Unauthorized),
        _ => Ok(()),
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn page_response(page: CachedPage, headers: &HeaderMap, cacheable: bool) -> Response {
    let cache_control = if cacheable {
        "public, max-age=0, must-revalidate"
    } else {
        "no-store"
    };
    let not_modified = cacheable
        && headers
            .get(IF_NONE_MATCH)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| cache::etag_matches(value, &page.etag));

    if not_modified {
        return (
            StatusCode::NOT_MODIFIED,
            [(ETAG, page.etag), (CACHE_CONTROL, cache_control.to_string())],
        )
            .into_response();
    }
    (
        StatusCode::OK,
        [(ETAG, page.etag), (CACHE_CONTROL, cache_control.to_string())],
        Html(page.body),
    )
        .into_response()
}
