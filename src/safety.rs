//! # Safety Gate
//!
//! Inspects an outbound document for commands that touch tag memory. A
//! malformed write can leave a tag unreadable ("void"), so these commands are
//! blocked unless the caller passes an explicit override.
//!
//! The router runs [`SafetyGate::check`] before any transport is touched.

use serde::Serialize;
use tracing::warn;

use crate::error::EtiquetaError;
use crate::protocol::zpl;

/// Commands that read, write, or probe tag memory.
///
/// | Command | Operation |
/// |---------|-----------|
/// | `^RFW` | write tag |
/// | `^RFR` | read tag |
/// | `^RFI` | tag info |
/// | `^RFT` | tag test |
/// | `^RFU` | read/write user memory |
pub const DANGEROUS_COMMANDS: &[&str] = &["^RFW", "^RFR", "^RFI", "^RFT", "^RFU"];

/// Overall risk of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyLevel {
    Safe,
    Dangerous,
}

/// Result of inspecting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub is_valid: bool,
    pub has_start: bool,
    pub has_end: bool,
    pub length: usize,
    pub commands: Vec<String>,
    pub dangerous_commands_found: Vec<String>,
    pub safety_level: SafetyLevel,
    pub errors: Vec<String>,
}

/// Stateless document inspector.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGate;

impl SafetyGate {
    pub fn new() -> Self {
        Self
    }

    /// Inspect a document and report what was found.
    ///
    /// `is_valid` is false when a marker is missing, or when dangerous
    /// commands are present and `allow_dangerous` is false.
    pub fn inspect(&self, document: &str, allow_dangerous: bool) -> Inspection {
        let has_start = zpl::has_start_marker(document);
        let has_end = zpl::has_end_marker(document);
        let dangerous = dangerous_tokens(document);

        let mut errors = Vec::new();
        if !has_start {
            errors.push(format!("document must start a format with {}", zpl::START_MARKER));
        }
        if !has_end {
            errors.push(format!("document must end a format with {}", zpl::END_MARKER));
        }
        if !dangerous.is_empty() && !allow_dangerous {
            errors.push(format!(
                "tag memory commands detected ({}), pass the override to allow them",
                dangerous.join(", ")
            ));
        }

        let safety_level = if dangerous.is_empty() {
            SafetyLevel::Safe
        } else {
            SafetyLevel::Dangerous
        };

        Inspection {
            is_valid: errors.is_empty(),
            has_start,
            has_end,
            length: document.len(),
            commands: zpl::commands(document),
            dangerous_commands_found: dangerous,
            safety_level,
            errors,
        }
    }

    /// Accept or reject a document.
    ///
    /// Missing markers fail with `MalformedDocument` before dangerous commands
    /// are considered.
    pub fn check(&self, document: &str, allow_dangerous: bool) -> Result<(), EtiquetaError> {
        if !zpl::has_start_marker(document) || !zpl::has_end_marker(document) {
            return Err(EtiquetaError::MalformedDocument(format!(
                "expected {} ... {} markers",
                zpl::START_MARKER,
                zpl::END_MARKER
            )));
        }

        let dangerous = dangerous_tokens(document);
        if !dangerous.is_empty() && !allow_dangerous {
            warn!(commands = ?dangerous, "blocked document with tag memory commands");
            return Err(EtiquetaError::DangerousCommandBlocked(dangerous));
        }

        Ok(())
    }
}

/// Dangerous tokens present in the document, in table order.
fn dangerous_tokens(document: &str) -> Vec<String> {
    DANGEROUS_COMMANDS
        .iter()
        .filter(|token| document.contains(*token))
        .map(|token| token.to_string())
        .collect()
}
