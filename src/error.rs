//! # Error Types
//!
//! This module defines the error type used throughout the etiqueta library.
//!
//! Every boundary (encoder, safety gate, transports, router) returns either a
//! success value or one of these variants. The batch controller turns them into
//! per-copy report entries, so nothing escapes past a batch run.

use std::fmt;

use thiserror::Error;

use crate::transport::TransportKind;

/// Main error type for etiqueta operations
#[derive(Debug, Error)]
pub enum EtiquetaError {
    /// Payload is empty, too long, or contains non-digit characters
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Document lacks the start/end markers
    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    /// Document carries tag-memory commands and no override was given
    #[error("Dangerous commands blocked: {}", .0.join(", "))]
    DangerousCommandBlocked(Vec<String>),

    /// Could not open a session to any endpoint
    #[error("Connection error: {0}")]
    Connection(String),

    /// Write failed, timed out, or the interpreter exited non-zero
    #[error("Send error: {0}")]
    Send(String),

    /// Interpreter output did not carry exactly one well-formed status line
    #[error("Interpreter protocol error: {0}")]
    InterpreterProtocol(String),

    /// Item asks for more copies than one batch entry may print
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),

    /// Primary transport and fallback both failed, in attempt order
    #[error("Delivery failed: {}", AttemptList(.0))]
    Delivery(Vec<DeliveryAttempt>),

    /// Template could not be parsed or rendered
    #[error("Template error: {0}")]
    Template(String),

    /// Invalid configuration
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtiquetaError {
    /// Stable machine-readable name of the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::MalformedDocument(_) => "MalformedDocument",
            Self::DangerousCommandBlocked(_) => "DangerousCommandBlocked",
            Self::Connection(_) => "ConnectionError",
            Self::Send(_) => "SendError",
            Self::InterpreterProtocol(_) => "InterpreterProtocolError",
            Self::InvalidQuantity(_) => "InvalidQuantity",
            Self::Delivery(attempts) => attempts
                .last()
                .map(|attempt| attempt.error.code())
                .unwrap_or("DeliveryFailed"),
            Self::Template(_) => "TemplateError",
            Self::Config(_) => "ConfigError",
            Self::Io(_) => "IoError",
        }
    }

    /// True for errors raised by the safety gate. These are never retried.
    pub fn is_gate_rejection(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument(_) | Self::DangerousCommandBlocked(_)
        )
    }
}

/// One failed try at delivering a document.
#[derive(Debug)]
pub struct DeliveryAttempt {
    pub transport: TransportKind,
    pub error: EtiquetaError,
}

impl DeliveryAttempt {
    pub fn new(transport: TransportKind, error: EtiquetaError) -> Self {
        Self { transport, error }
    }
}

impl fmt::Display for DeliveryAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.transport, self.error)
    }
}

struct AttemptList<'a>(&'a [DeliveryAttempt]);

impl fmt::Display for AttemptList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, attempt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", attempt)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocked_message_lists_commands() {
        let err = EtiquetaError::DangerousCommandBlocked(vec!["^RFW".into(), "^RFR".into()]);
        assert_eq!(err.to_string(), "Dangerous commands blocked: ^RFW, ^RFR");
        assert!(err.is_gate_rejection());
    }

    #[test]
    fn test_delivery_message_carries_both_attempts() {
        let err = EtiquetaError::Delivery(vec![
            DeliveryAttempt::new(
                TransportKind::Serial,
                EtiquetaError::Connection("no device".into()),
            ),
            DeliveryAttempt::new(TransportKind::ProcessBridge, EtiquetaError::Send("exit 1".into())),
        ]);
        assert_eq!(
            err.to_string(),
            "Delivery failed: serial: Connection error: no device; process-bridge: Send error: exit 1"
        );
        assert!(!err.is_gate_rejection());
    }

    #[test]
    fn test_delivery_code_is_last_attempt_code() {
        let err = EtiquetaError::Delivery(vec![
            DeliveryAttempt::new(TransportKind::Network, EtiquetaError::Connection("refused".into())),
            DeliveryAttempt::new(
                TransportKind::ProcessBridge,
                EtiquetaError::InterpreterProtocol("no status line".into()),
            ),
        ]);
        assert_eq!(err.code(), "InterpreterProtocolError");
        assert_eq!(EtiquetaError::Delivery(Vec::new()).code(), "DeliveryFailed");
    }
}
