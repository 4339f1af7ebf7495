//! # RFID Payload Encoder
//!
//! Builds the fixed-format numeric payload written into a tag's memory.
//!
//! ## Layout
//!
//! ```text
//! ┌──────────── 12 ───────────┬── PO ──┬─ seq ─┬── zero padding ──┐
//! │ 7 8 9 6 4 3 6 1 0 0 6 4   │ 0 4 6 4│ 1     │ 0 0 0 0 0 0 0    │
//! └───────────────────────────┴────────┴───────┴──────────────────┘
//!                                     target length (default 24)
//! ```
//!
//! - **Barcode segment**: first 12 characters of the barcode source, left-padded
//!   with `0` when shorter.
//! - **PO segment**: the purchase-order fragment with every non-digit removed,
//!   `"0000"` when nothing is left.
//! - **Sequence segment**: decimal copy number, unpadded.
//! - **Padding**: `0` up to the target length.
//!
//! A base longer than the target length is emitted as-is. Padding never runs
//! past one digit beyond [`MAX_PAYLOAD_LEN`], since nothing longer can validate.

use std::fmt;

use tracing::warn;

use crate::error::EtiquetaError;

/// Default payload length in digits.
pub const DEFAULT_TARGET_LENGTH: usize = 24;

/// Hard upper bound enforced by [`RfidPayload::validate`].
pub const MAX_PAYLOAD_LEN: usize = 50;

/// Width of the barcode segment.
pub const BARCODE_SEGMENT_LEN: usize = 12;

/// PO segment used when the fragment has no digits.
pub const DEFAULT_PO_SEGMENT: &str = "0000";

/// Positions of the segments inside an encoded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub po_len: usize,
    pub sequence_len: usize,
}

/// A validated payload of decimal digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RfidPayload {
    digits: String,
    layout: SegmentLayout,
}

impl RfidPayload {
    /// Encode a payload from its three sources.
    ///
    /// `sequence` values below 1 are treated as 1. The result is not validated;
    /// call [`RfidPayload::validate`] (or use [`RfidPayload::encode_checked`])
    /// before handing it on.
    ///
    /// ## Example
    ///
    /// ```
    /// use etiqueta::payload::RfidPayload;
    ///
    /// let payload = RfidPayload::encode("789643610064", "0464", 1, 24);
    /// assert_eq!(payload.as_str(), "789643610064046410000000");
    /// ```
    pub fn encode(
        barcode_source: &str,
        po_fragment: &str,
        sequence: u32,
        target_length: usize,
    ) -> Self {
        let barcode = barcode_segment(barcode_source);
        let po = po_segment(po_fragment);
        let seq = sequence.max(1).to_string();

        let layout = SegmentLayout {
            po_len: po.len(),
            sequence_len: seq.len(),
        };

        let base = format!("{}{}{}", barcode, po, seq);
        if base.chars().count() > target_length {
            warn!(
                payload = %base,
                target_length,
                "encoded payload exceeds target length"
            );
        }

        let width = target_length.min(MAX_PAYLOAD_LEN + 1);
        let digits = format!("{:0<width$}", base, width = width);
        Self { digits, layout }
    }

    /// Encode and validate in one step.
    pub fn encode_checked(
        barcode_source: &str,
        po_fragment: &str,
        sequence: u32,
        target_length: usize,
    ) -> Result<Self, EtiquetaError> {
        check_target_length(target_length)?;
        let payload = Self::encode(barcode_source, po_fragment, sequence, target_length);
        Self::validate(payload.as_str())?;
        Ok(payload)
    }

    /// Check that a payload is non-empty, at most 50 characters and digits only.
    pub fn validate(payload: &str) -> Result<(), EtiquetaError> {
        if payload.is_empty() {
            return Err(EtiquetaError::InvalidPayload(
                "payload cannot be empty".to_string(),
            ));
        }
        let len = payload.chars().count();
        if len > MAX_PAYLOAD_LEN {
            return Err(EtiquetaError::InvalidPayload(format!(
                "payload too long: {} characters (max {})",
                len, MAX_PAYLOAD_LEN
            )));
        }
        if let Some(bad) = payload.chars().find(|c| !c.is_ascii_digit()) {
            return Err(EtiquetaError::InvalidPayload(format!(
                "payload must contain digits only, found {:?}",
                bad
            )));
        }
        Ok(())
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn layout(&self) -> SegmentLayout {
        self.layout
    }

    /// The 12-digit barcode segment.
    pub fn barcode_segment(&self) -> &str {
        self.slice(0, BARCODE_SEGMENT_LEN)
    }

    /// The digits-only purchase-order segment.
    pub fn po_segment(&self) -> &str {
        self.slice(BARCODE_SEGMENT_LEN, self.layout.po_len)
    }

    /// The sequence segment.
    pub fn sequence_segment(&self) -> &str {
        self.slice(BARCODE_SEGMENT_LEN + self.layout.po_len, self.layout.sequence_len)
    }

    /// Trailing zero padding (empty when the base filled the target).
    pub fn padding(&self) -> &str {
        let start = BARCODE_SEGMENT_LEN + self.layout.po_len + self.layout.sequence_len;
        self.digits.get(start..).unwrap_or("")
    }

    fn slice(&self, start: usize, len: usize) -> &str {
        self.digits.get(start..start + len).unwrap_or("")
    }
}

impl fmt::Display for RfidPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Reject target lengths no payload could satisfy.
pub fn check_target_length(target_length: usize) -> Result<(), EtiquetaError> {
    if target_length > MAX_PAYLOAD_LEN {
        return Err(EtiquetaError::InvalidPayload(format!(
            "target length {} exceeds {} characters",
            target_length, MAX_PAYLOAD_LEN
        )));
    }
    Ok(())
}

/// First 12 characters, left-padded with `0`.
fn barcode_segment(source: &str) -> String {
    let head: String = source.trim().chars().take(BARCODE_SEGMENT_LEN).collect();
    let missing = BARCODE_SEGMENT_LEN - head.chars().count();
    let mut segment = "0".repeat(missing);
    segment.push_str(&head);
    segment
}

/// Digits of the PO fragment, or `"0000"`.
fn po_segment(fragment: &str) -> String {
    let digits: String = fragment.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        DEFAULT_PO_SEGMENT.to_string()
    } else {
        digits
    }
}
