//! # Interpreter Reply Decoder
//!
//! The process-bridge interpreter reports its outcome on stdout with exactly
//! one status line:
//!
//! ```text
//! SUCCESS:printer=ZDesigner ZD621R-203dpi ZPL;bytes=412;job=17
//! ERROR:printer offline
//! ```
//!
//! Any other lines (progress chatter, warnings) are ignored. The decoder fails
//! closed: zero status lines, more than one, or a malformed success body is an
//! [`EtiquetaError::InterpreterProtocol`].

use std::collections::BTreeMap;

use crate::error::EtiquetaError;

pub const SUCCESS_MARKER: &str = "SUCCESS:";
pub const ERROR_MARKER: &str = "ERROR:";

const PAIR_SEPARATOR: char = ';';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeReply {
    Success(BTreeMap<String, String>),
    Error(String),
}

/// Decode interpreter stdout into its single status reply.
pub fn decode(stdout: &str) -> Result<BridgeReply, EtiquetaError> {
    let status: Vec<&str> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with(SUCCESS_MARKER) || line.starts_with(ERROR_MARKER))
        .collect();

    let line = match status.as_slice() {
        [line] => *line,
        [] => {
            return Err(EtiquetaError::InterpreterProtocol(
                "no status line in interpreter output".to_string(),
            ));
        }
        lines => {
            return Err(EtiquetaError::InterpreterProtocol(format!(
                "expected one status line, found {}",
                lines.len()
            )));
        }
    };

    if let Some(body) = line.strip_prefix(SUCCESS_MARKER) {
        return decode_pairs(body).map(BridgeReply::Success);
    }

    let text = line.strip_prefix(ERROR_MARKER).unwrap_or_default().trim();
    if text.is_empty() {
        return Err(EtiquetaError::InterpreterProtocol(
            "error line carries no message".to_string(),
        ));
    }
    Ok(BridgeReply::Error(text.to_string()))
}

fn decode_pairs(body: &str) -> Result<BTreeMap<String, String>, EtiquetaError> {
    let mut fields = BTreeMap::new();
    let body = body.trim();
    if body.is_empty() {
        return Ok(fields);
    }

    for pair in body.split(PAIR_SEPARATOR) {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(EtiquetaError::InterpreterProtocol(format!(
                "malformed pair {:?}",
                pair
            )));
        };
        let key = key.trim();
        if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(EtiquetaError::InterpreterProtocol(format!(
                "invalid key {:?}",
                key
            )));
        }
        if fields
            .insert(key.to_string(), value.trim().to_string())
            .is_some()
        {
            return Err(EtiquetaError::InterpreterProtocol(format!(
                "duplicate key {:?}",
                key
            )));
        }
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_success_with_pairs() {
        let reply = decode("opening spooler\nSUCCESS:printer=ZD621R;bytes=412\n").unwrap();
        let BridgeReply::Success(fields) = reply else {
            panic!("expected success");
        };
        assert_eq!(fields.get("printer").map(String::as_str), Some("ZD621R"));
        assert_eq!(fields.get("bytes").map(String::as_str), Some("412"));
    }

    #[test]
    fn test_success_without_pairs() {
        assert_eq!(decode("SUCCESS:").unwrap(), BridgeReply::Success(BTreeMap::new()));
    }

    #[test]
    fn test_error_line() {
        assert_eq!(
            decode("ERROR: printer offline\r\n").unwrap(),
            BridgeReply::Error("printer offline".to_string())
        );
    }

    #[test]
    fn test_no_status_line() {
        let err = decode("{'success': True}\n").unwrap_err();
        assert_eq!(err.code(), "InterpreterProtocolError");
    }

    #[test]
    fn test_two_status_lines() {
        assert!(decode("SUCCESS:a=1\nERROR:boom\n").is_err());
    }

    #[test]
    fn test_malformed_pairs() {
        assert!(decode("SUCCESS:printer").is_err());
        assert!(decode("SUCCESS:bad key=1").is_err());
        assert!(decode("SUCCESS:a=1;a=2").is_err());
        assert!(decode("SUCCESS:a=1;").is_err());
    }

    #[test]
    fn test_empty_error_text() {
        assert!(decode("ERROR:   ").is_err());
    }
}
