//! Dispatch and batch printing.

use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use crate::batch::{BatchController, BatchOptions, BatchReport};
use crate::dispatch::Delivery;
use crate::document::LabelDocument;
use crate::item::LabelItem;
use crate::payload;
use crate::transport::TransportKind;

use super::super::state::AppState;
use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub document: String,
    pub transport: Option<TransportKind>,
    pub copies: Option<u32>,
    pub allow_dangerous: Option<bool>,
}

/// Handle POST /api/dispatch - send one document through the router.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DispatchRequest>,
) -> Result<Json<Delivery>, ApiError> {
    let kind = req.transport.unwrap_or(state.config.default_transport);
    let allow_dangerous = req.allow_dangerous.unwrap_or(state.config.allow_dangerous);
    let document = LabelDocument::new(req.document);

    let mut router = state.router.lock().await;
    let delivery = router
        .dispatch(&document, kind, req.copies.unwrap_or(1), allow_dangerous)
        .await?;
    Ok(Json(delivery))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub items: Vec<LabelItem>,
    pub transport: Option<TransportKind>,
    pub target_length: Option<usize>,
    pub allow_dangerous: Option<bool>,
}

/// Handle POST /api/batch - print every copy of every item.
pub async fn batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchReport>, ApiError> {
    let defaults = BatchOptions::from_config(&state.config);
    let options = BatchOptions {
        target_length: req.target_length.unwrap_or(defaults.target_length),
        transport: req.transport.unwrap_or(defaults.transport),
        allow_dangerous: req.allow_dangerous.unwrap_or(defaults.allow_dangerous),
        ..defaults
    };
    payload::check_target_length(options.target_length)?;
    info!(items = req.items.len(), transport = %options.transport, "batch requested");

    let controller = BatchController::new(state.compositor.clone(), options);
    let mut router = state.router.lock().await;
    Ok(Json(controller.print_batch(&mut router, &req.items).await))
}
