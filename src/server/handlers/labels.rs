//! Document inspection and payload encoding. Nothing here touches a printer.

use axum::Json;
use serde::{Deserialize, Serialize};

use crate::payload::{RfidPayload, DEFAULT_TARGET_LENGTH};
use crate::safety::{Inspection, SafetyGate};

use super::ApiError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    pub document: String,
    #[serde(default)]
    pub allow_dangerous: bool,
}

/// Handle POST /api/validate - run the safety gate and report what it found.
pub async fn validate(Json(req): Json<ValidateRequest>) -> Json<Inspection> {
    Json(SafetyGate::new().inspect(&req.document, req.allow_dangerous))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeRequest {
    pub barcode: String,
    #[serde(default)]
    pub po: String,
    #[serde(default = "first_sequence")]
    pub sequence: u32,
    #[serde(default = "default_target_length")]
    pub target_length: usize,
}

fn first_sequence() -> u32 {
    1
}

fn default_target_length() -> usize {
    DEFAULT_TARGET_LENGTH
}

#[derive(Debug, Serialize)]
pub struct EncodeResponse {
    pub payload: String,
}

/// Handle POST /api/encode - build and validate an RFID payload.
pub async fn encode(Json(req): Json<EncodeRequest>) -> Result<Json<EncodeResponse>, ApiError> {
    let payload =
        RfidPayload::encode_checked(&req.barcode, &req.po, req.sequence, req.target_length)?;
    Ok(Json(EncodeResponse {
        payload: payload.as_str().to_string(),
    }))
}
