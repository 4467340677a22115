//! API request handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use crate::storage::{CountFilter, MailStore};

/// Shared application state
pub struct AppState {
    pub storage: Arc<MailStore>,
}

/// POST /clear - Drop every stored message
pub async fn clear(State(state): State<Arc<AppState>>) -> StatusCode {
    state.storage.clear();
    info!("Mail store cleared via API");
    StatusCode::OK
}

/// GET /count?from=&to= - Number of stored messages, as plain text
pub async fn count(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CountFilter>,
) -> String {
    format!("{}\n", state.storage.count(&filter))
}
