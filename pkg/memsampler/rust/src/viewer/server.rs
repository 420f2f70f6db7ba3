// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! HTTP server for the chart viewer.
//!
//! - GET `<uri>` (default `/`) - chart page of the latest dump
//! - GET /api/samples - chart data of the latest dump as JSON
//! - GET /api/dumps - every dump found in the directory
//! - GET /api/health - health check
//!
//! The dump directory is rescanned on every request.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::locate::{self, DumpFile, LocateError};
use crate::naming::DumpPattern;
use crate::reader::{self, ReadError};
use crate::record::SampleRecord;
use crate::units::Unit;
use crate::viewer::chart::{render_page, Chart};

/// Viewer configuration.
#[derive(Debug, Clone)]
pub struct ViewerConfig {
    /// Directory holding the dump files
    pub dir: PathBuf,
    /// Service name the dumps were written with
    pub service_name: String,
    /// Unit used when a request does not ask for one
    pub unit: Unit,
    /// Path serving the chart page
    pub uri: String,
    pub port: u16,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(crate::config::DEFAULT_DUMP_DIR),
            service_name: crate::config::DEFAULT_SERVICE_NAME.to_string(),
            unit: Unit::default(),
            uri: "/".to_string(),
            port: 8050,
        }
    }
}

/// Application state shared across handlers.
#[derive(Debug)]
pub struct AppState {
    pub dir: PathBuf,
    pub pattern: DumpPattern,
    pub title: String,
    pub default_unit: Unit,
}

impl AppState {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            pattern: DumpPattern::for_service(&config.service_name),
            title: config.service_name.clone(),
            default_unit: config.unit,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Locate(#[from] LocateError),

    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("dump loading task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ViewerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ViewerError::Locate(LocateError::NotFound { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self, "Failed to serve chart");
        } else {
            tracing::debug!(error = %self, "No dump to chart");
        }
        (status, self.to_string()).into_response()
    }
}

/// Build the router serving `state`.
pub fn router(state: Arc<AppState>, uri: &str) -> Router {
    Router::new()
        .route(uri, get(chart_handler))
        .route("/api/samples", get(samples_handler))
        .route("/api/dumps", get(dumps_handler))
        .route("/api/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the HTTP server and serve until the process exits.
pub async fn run_server(config: ViewerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(&config));
    let app = router(state, &config.uri);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %addr,
        uri = %config.uri,
        dir = %config.dir.display(),
        service = %config.service_name,
        unit = %config.unit,
        "Viewer listening"
    );

    axum::serve(listener, app).await.context("viewer server failed")?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ChartQuery {
    #[serde(default)]
    unit: Option<Unit>,
}

/// Locate the newest dump and parse it off the async workers.
async fn load_latest(state: &Arc<AppState>) -> Result<(DumpFile, Vec<SampleRecord>), ViewerError> {
    let state = state.clone();
    tokio::task::spawn_blocking(move || {
        let dump = locate::find_latest(&state.dir, &state.pattern)?;
        let records = reader::read_dump(&dump.path)?;
        tracing::debug!(
            path = %dump.path.display(),
            records = records.len(),
            "Loaded latest dump"
        );
        Ok::<_, ViewerError>((dump, records))
    })
    .await?
}

async fn chart_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Html<String>, ViewerError> {
    let unit = query.unit.unwrap_or(state.default_unit);
    let (_, records) = load_latest(&state).await?;
    let chart = Chart::from_records(&records, unit);
    Ok(Html(render_page(&chart, &state.title)))
}

#[derive(Serialize)]
struct SamplesResponse {
    file: String,
    pid: u32,
    #[serde(flatten)]
    chart: Chart,
}

async fn samples_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<Json<SamplesResponse>, ViewerError> {
    let unit = query.unit.unwrap_or(state.default_unit);
    let (dump, records) = load_latest(&state).await?;
    Ok(Json(SamplesResponse {
        file: dump.path.display().to_string(),
        pid: dump.pid,
        chart: Chart::from_records(&records, unit),
    }))
}

#[derive(Serialize)]
struct DumpEntry {
    file: String,
    pid: u32,
    started: String,
}

#[derive(Serialize)]
struct DumpsResponse {
    dumps: Vec<DumpEntry>,
}

async fn dumps_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DumpsResponse>, ViewerError> {
    let mut dumps =
        tokio::task::spawn_blocking(move || locate::scan_dumps(&state.dir, &state.pattern))
            .await??;

    // Newest run first
    dumps.sort_by(|a, b| b.started.cmp(&a.started));

    Ok(Json(DumpsResponse {
        dumps: dumps
            .into_iter()
            .map(|d| DumpEntry {
                file: d.path.display().to_string(),
                pid: d.pid,
                started: d.started.format("%Y-%m-%d %H:%M:%S").to_string(),
            })
            .collect(),
    }))
}

/// GET /api/health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
