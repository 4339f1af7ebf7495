//! # Batch Controller
//!
//! Prints every copy of every item, one document per copy. Each copy gets its
//! own sequence number (1..=quantity), so its RFID payload and printed barcode
//! are unique.
//!
//! A failing copy is recorded and the batch moves on. Copies are spaced by a
//! fixed pacing delay because the printer runs one job at a time. An item
//! asking for more than [`MAX_COPIES_PER_ITEM`](crate::item::MAX_COPIES_PER_ITEM) copies is recorded once as
//! `InvalidQuantity` and nothing is printed for it.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::dispatch::{Delivery, Router};
use crate::document::compose::{sequential_barcode, Compositor};
use crate::error::EtiquetaError;
use crate::item::LabelItem;
use crate::payload::{RfidPayload, DEFAULT_TARGET_LENGTH};
use crate::transport::TransportKind;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub target_length: usize,
    pub transport: TransportKind,
    pub pacing: Duration,
    pub allow_dangerous: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            target_length: DEFAULT_TARGET_LENGTH,
            transport: TransportKind::ProcessBridge,
            pacing: Duration::from_secs(2),
            allow_dangerous: false,
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_length: config.payload_target_length,
            transport: config.default_transport,
            pacing: config.pacing(),
            allow_dangerous: config.allow_dangerous,
        }
    }
}

/// Outcome of one physical copy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyResult {
    /// Display name, e.g. `"JASMINE (2/3)"`.
    pub item: String,
    pub item_index: usize,
    pub copy_index: u32,
    pub quantity: u32,
    pub barcode: String,
    pub payload: String,
    pub success: bool,
    /// Kind that printed the copy, absent on failure.
    pub transport: Option<TransportKind>,
    pub fallback_used: bool,
    pub error: Option<String>,
    pub error_code: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total_items: usize,
    /// Copies asked for across all items, rejected ones included.
    pub requested_copies: u64,
    /// Entries in `results`.
    pub total_copies: usize,
    pub success_count: usize,
    pub results: Vec<CopyResult>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.total_copies - self.success_count
    }

    pub fn all_succeeded(&self) -> bool {
        self.success_count == self.total_copies
    }
}

pub struct BatchController {
    compositor: Compositor,
    options: BatchOptions,
}

impl BatchController {
    pub fn new(compositor: Compositor, options: BatchOptions) -> Self {
        Self {
            compositor,
            options,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Print all copies of `items` through `router`.
    pub async fn print_batch(&self, router: &mut Router, items: &[LabelItem]) -> BatchReport {
        let started_at = Utc::now();
        let requested_copies = items
            .iter()
            .fold(0u64, |sum, item| sum.saturating_add(u64::from(item.copies())));
        info!(items = items.len(), copies = requested_copies, transport = %self.options.transport, "starting batch");

        let mut results = Vec::new();
        let mut dispatched = 0usize;
        for (item_index, item) in items.iter().enumerate() {
            let copies = match item.checked_copies() {
                Ok(copies) => copies,
                Err(e) => {
                    warn!(item = %item.variant_code, error = %e, "item rejected");
                    let mut result = self.blank_result(item, item_index, 1);
                    result.error = Some(e.to_string());
                    result.error_code = Some(e.code());
                    results.push(result);
                    continue;
                }
            };
            for copy_index in 1..=copies {
                if dispatched > 0 && !self.options.pacing.is_zero() {
                    tokio::time::sleep(self.options.pacing).await;
                }
                let result = self.print_copy(router, item, item_index, copy_index).await;
                results.push(result);
                dispatched += 1;
            }
        }

        let success_count = results.iter().filter(|r| r.success).count();
        info!(
            success = success_count,
            failed = results.len() - success_count,
            "batch finished"
        );

        BatchReport {
            total_items: items.len(),
            requested_copies,
            total_copies: results.len(),
            success_count,
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }

    async fn print_copy(
        &self,
        router: &mut Router,
        item: &LabelItem,
        item_index: usize,
        copy_index: u32,
    ) -> CopyResult {
        let payload = self.payload(item, copy_index);
        let mut result = self.blank_result(item, item_index, copy_index);

        match self.deliver(router, item, &payload, copy_index).await {
            Ok(delivery) => {
                result.success = true;
                result.transport = Some(delivery.transport);
                result.fallback_used = delivery.fallback_used;
            }
            Err(e) => {
                warn!(item = %result.item, error = %e, "copy failed");
                result.error = Some(e.to_string());
                result.error_code = Some(e.code());
            }
        }
        result
    }

    fn payload(&self, item: &LabelItem, copy_index: u32) -> RfidPayload {
        RfidPayload::encode(
            &item.barcode,
            &item.po_fragment(),
            copy_index,
            self.options.target_length,
        )
    }

    /// A not-yet-successful entry for one copy.
    fn blank_result(&self, item: &LabelItem, item_index: usize, copy_index: u32) -> CopyResult {
        CopyResult {
            item: item.display_name(copy_index),
            item_index,
            copy_index,
            quantity: item.copies(),
            barcode: sequential_barcode(item, copy_index),
            payload: self.payload(item, copy_index).as_str().to_string(),
            success: false,
            transport: None,
            fallback_used: false,
            error: None,
            error_code: None,
            timestamp: Utc::now(),
        }
    }

    async fn deliver(
        &self,
        router: &mut Router,
        item: &LabelItem,
        payload: &RfidPayload,
        sequence: u32,
    ) -> Result<Delivery, EtiquetaError> {
        RfidPayload::validate(payload.as_str())?;
        let document = self.compositor.compose(item, payload, sequence)?;
        router
            .dispatch(
                &document,
                self.options.transport,
                1,
                self.options.allow_dangerous,
            )
            .await
    }
}
