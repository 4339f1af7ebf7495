//! Transport discovery.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::transport::{Endpoint, TransportKind};

use super::super::state::AppState;

/// Handle GET /api/transports/:kind/discover - list candidate printers.
pub async fn discover(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<TransportKind>,
) -> Json<Vec<Endpoint>> {
    let router = state.router.lock().await;
    Json(router.discover(kind).await)
}
