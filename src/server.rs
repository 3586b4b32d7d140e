/// HTTP endpoints serving the latest BMS snapshot
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use log::{error, info};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::{ServeDir, ServeFile};

use crate::models::MeasurementSnapshot;
use crate::state::MonitorState;

// Shown for every field while the BMS is unreachable
const PLACEHOLDER: &str = "-";

pub fn router(state: MonitorState, static_dir: &Path) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/connection_status", get(connection_status))
        .route("/data", get(data))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

/// Serve the HTTP API until `shutdown` flips to true
pub async fn serve(
    addr: SocketAddr,
    static_dir: PathBuf,
    state: MonitorState,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state, &static_dir))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
}

/// Latest snapshot while connected, placeholders otherwise
async fn status(State(state): State<MonitorState>) -> Json<Value> {
    if !state.is_connected() {
        return Json(placeholder_status());
    }
    Json(snapshot_json(state.snapshot().as_deref()))
}

async fn connection_status(State(state): State<MonitorState>) -> Json<Value> {
    Json(json!({ "connected": state.is_connected() }))
}

/// Latest retained snapshot regardless of the link state
async fn data(State(state): State<MonitorState>) -> Json<Value> {
    Json(snapshot_json(state.snapshot().as_deref()))
}

fn snapshot_json(snapshot: Option<&MeasurementSnapshot>) -> Value {
    let Some(snapshot) = snapshot else {
        return Value::Object(Map::new());
    };

    serde_json::to_value(snapshot).unwrap_or_else(|e| {
        error!("Failed to serialize snapshot: {}", e);
        Value::Object(Map::new())
    })
}

fn placeholder_status() -> Value {
    match snapshot_json(Some(&MeasurementSnapshot::default())) {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(name, _)| (name, Value::from(PLACEHOLDER)))
                .collect(),
        ),
        other => other,
    }
}
