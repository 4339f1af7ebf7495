//! # Printer Transport Layer
//!
//! This module provides communication backends for sending label documents
//! to printers. Every backend implements the [`Transport`] trait.
//!
//! ## Available Transports
//!
//! | Kind | Module | Copies |
//! |------|--------|--------|
//! | `process-bridge` | [`bridge`]: external interpreter per send | `^PQ` injected |
//! | `serial` | [`serial`]: raw TTY writes | one write per copy |
//! | `network` | [`network`]: TCP raw-print port 9100 | `^PQ` injected |
//! | `os-copy` | [`os_copy`]: OS copy command to a device | one copy per copy |
//!
//! ## Sessions
//!
//! `connect` returns a [`Session`] owned by the caller. Each transport holds at
//! most one open session at a time; connecting again before `disconnect`
//! fails with a connection error.

pub mod bridge;
pub mod network;
pub mod os_copy;
pub mod reply;
pub mod serial;

use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::document::LabelDocument;
use crate::error::EtiquetaError;
use crate::protocol::zpl;
use crate::safety::SafetyGate;

pub use bridge::BridgeTransport;
pub use network::NetworkTransport;
pub use os_copy::OsCopyTransport;
pub use serial::SerialTransport;

/// The four transport variants.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    ProcessBridge,
    Serial,
    Network,
    OsCopy,
}

impl TransportKind {
    pub const ALL: [TransportKind; 4] = [
        TransportKind::ProcessBridge,
        TransportKind::Serial,
        TransportKind::Network,
        TransportKind::OsCopy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::ProcessBridge => "process-bridge",
            TransportKind::Serial => "serial",
            TransportKind::Network => "network",
            TransportKind::OsCopy => "os-copy",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = EtiquetaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TransportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| EtiquetaError::Config(format!("unknown transport kind: {}", s)))
    }
}

/// A candidate printer found by discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    pub kind: TransportKind,
    /// Value accepted by `connect` (device path, address, printer name).
    pub id: String,
    pub description: String,
}

impl Endpoint {
    pub fn new(kind: TransportKind, id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    Closed,
}

/// OS resource held by an open session.
#[derive(Debug)]
pub enum SessionHandle {
    /// Transports that acquire nothing until send time.
    None,
    Tcp(TcpStream),
    Serial(fs::File),
}

/// An open connection to one endpoint.
#[derive(Debug)]
pub struct Session {
    kind: TransportKind,
    endpoint: String,
    state: SessionState,
    pub(crate) handle: SessionHandle,
}

impl Session {
    pub fn open(kind: TransportKind, endpoint: impl Into<String>, handle: SessionHandle) -> Self {
        Self {
            kind,
            endpoint: endpoint.into(),
            state: SessionState::Open,
            handle,
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Drop the handle and mark the session closed. Safe to call repeatedly.
    pub fn close(&mut self) {
        self.handle = SessionHandle::None;
        self.state = SessionState::Closed;
    }

    pub(crate) fn ensure_open(&self) -> Result<(), EtiquetaError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(EtiquetaError::Send(format!(
                "{} session to {} is closed",
                self.kind, self.endpoint
            )))
        }
    }
}

/// Outcome of one accepted send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportResult {
    pub success: bool,
    pub detail: String,
    /// Key/value detail reported by the interpreter, empty for other kinds.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl TransportResult {
    pub fn ok(detail: impl Into<String>) -> Self {
        Self {
            success: true,
            detail: detail.into(),
            fields: BTreeMap::new(),
        }
    }
}

/// Tracks the single open session a transport may hold.
#[derive(Debug, Default)]
pub struct SessionSlot {
    endpoint: Option<String>,
}

impl SessionSlot {
    pub fn acquire(&mut self, kind: TransportKind, endpoint: &str) -> Result<(), EtiquetaError> {
        if let Some(open) = &self.endpoint {
            return Err(EtiquetaError::Connection(format!(
                "{} already has an open session to {}",
                kind, open
            )));
        }
        self.endpoint = Some(endpoint.to_string());
        Ok(())
    }

    pub fn release(&mut self) {
        self.endpoint = None;
    }

    pub fn is_occupied(&self) -> bool {
        self.endpoint.is_some()
    }
}

/// # Transport
///
/// Common contract for every printer backend.
///
/// - `discover` never fails; it returns an empty list when nothing is found.
/// - `connect` with no endpoint tries the discovered candidates in order.
/// - `disconnect` always releases the handle, even for a closed session.
#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Whether `send` injects a copy-count instruction instead of repeating writes.
    fn supports_copy_count(&self) -> bool;

    async fn discover(&self) -> Vec<Endpoint>;

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError>;

    async fn send(
        &mut self,
        session: &mut Session,
        document: &LabelDocument,
        copies: u32,
    ) -> Result<TransportResult, EtiquetaError>;

    async fn disconnect(&mut self, session: &mut Session);

    /// Send the benign test label and report whether it was accepted.
    async fn test(&mut self, session: &mut Session) -> bool {
        let document = LabelDocument::new(zpl::test_label());
        if let Err(e) = SafetyGate::new().check(document.as_str(), false) {
            warn!(error = %e, "test label rejected by safety gate");
            return false;
        }
        match self.send(session, &document, 1).await {
            Ok(result) => result.success,
            Err(e) => {
                warn!(transport = %self.kind(), error = %e, "test label failed");
                false
            }
        }
    }
}

/// Build the transport for `kind` from runtime settings.
pub fn from_config(kind: TransportKind, config: &Config) -> Box<dyn Transport> {
    match kind {
        TransportKind::ProcessBridge => Box::new(BridgeTransport::from_config(config)),
        TransportKind::Serial => Box::new(SerialTransport::from_config(config)),
        TransportKind::Network => Box::new(NetworkTransport::from_config(config)),
        TransportKind::OsCopy => Box::new(OsCopyTransport::from_config(config)),
    }
}

/// Bytes to write and how many times to write them.
///
/// Transports with native copy support get one write with `^PQ` set to
/// `copies`; the others get the document unchanged, once per copy.
pub(crate) fn copy_plan(document: &LabelDocument, copies: u32, native: bool) -> (Vec<u8>, u32) {
    let copies = copies.max(1);
    if native {
        let body = zpl::inject_copy_count(document.as_str(), copies);
        (body.into_bytes(), 1)
    } else {
        (document.as_bytes().to_vec(), copies)
    }
}

/// Await `operation`, failing with `on_timeout` once `limit` elapses.
pub(crate) async fn bounded<T, F>(
    limit: Duration,
    operation: F,
    on_timeout: impl FnOnce() -> EtiquetaError,
) -> Result<T, EtiquetaError>
where
    F: Future<Output = Result<T, EtiquetaError>>,
{
    match tokio::time::timeout(limit, operation).await {
        Ok(result) => result,
        Err(_) => Err(on_timeout()),
    }
}

/// Candidate endpoint ids: the explicit one, else every discovered id.
pub(crate) async fn candidates<T: Transport + ?Sized>(
    transport: &T,
    endpoint: Option<&str>,
) -> Vec<String> {
    match endpoint {
        Some(endpoint) => vec![endpoint.to_string()],
        None => transport
            .discover()
            .await
            .into_iter()
            .map(|e| e.id)
            .collect(),
    }
}

/// Resolve an executable name against `PATH`.
pub fn locate_program(program: &str) -> Option<PathBuf> {
    let direct = Path::new(program);
    if direct.components().count() > 1 {
        return direct.is_file().then(|| direct.to_path_buf());
    }

    let path = env::var_os("PATH")?;
    env::split_paths(&path).find_map(|dir| {
        let candidate = dir.join(program);
        if candidate.is_file() {
            return Some(candidate);
        }
        if cfg!(windows) {
            let exe = dir.join(format!("{}.exe", program));
            if exe.is_file() {
                return Some(exe);
            }
        }
        None
    })
}

/// Document written to a uniquely named temp file, removed on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn create(contents: &[u8]) -> Result<Self, EtiquetaError> {
        let path = env::temp_dir().join(format!("etiqueta-{}.zpl", Uuid::new_v4()));
        fs::write(&path, contents).map_err(|e| {
            EtiquetaError::Send(format!("Failed to write {}: {}", path.display(), e))
        })?;
        debug!(path = %path.display(), bytes = contents.len(), "wrote temp artifact");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove temp artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in TransportKind::ALL {
            assert_eq!(kind.as_str().parse::<TransportKind>().unwrap(), kind);
        }
        assert!("bluetooth".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_kind_serde_is_kebab_case() {
        assert_eq!(
            serde_json::to_string(&TransportKind::OsCopy).unwrap(),
            "\"os-copy\""
        );
        let kind: TransportKind = serde_json::from_str("\"process-bridge\"").unwrap();
        assert_eq!(kind, TransportKind::ProcessBridge);
    }

    #[test]
    fn test_copy_plan_native_injects_quantity() {
        let doc = LabelDocument::new("^XA^FDx^FS^PQ1,0,1,Y^XZ");
        let (bytes, writes) = copy_plan(&doc, 3, true);
        assert_eq!(writes, 1);
        assert_eq!(String::from_utf8(bytes).unwrap(), "^XA^FDx^FS^PQ3,0,1,Y^XZ");
    }

    #[test]
    fn test_copy_plan_repeated_writes() {
        let doc = LabelDocument::new("^XA^FDx^FS^XZ");
        let (bytes, writes) = copy_plan(&doc, 3, false);
        assert_eq!(writes, 3);
        assert_eq!(bytes, doc.as_bytes());
        assert_eq!(copy_plan(&doc, 0, false).1, 1);
    }

    #[test]
    fn test_session_close_is_idempotent() {
        let mut session = Session::open(TransportKind::Network, "10.0.0.7", SessionHandle::None);
        assert!(session.ensure_open().is_ok());
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Closed);
        assert_eq!(session.ensure_open().unwrap_err().code(), "SendError");
    }

    #[test]
    fn test_slot_holds_one_session() {
        let mut slot = SessionSlot::default();
        slot.acquire(TransportKind::Serial, "/dev/ttyUSB0").unwrap();
        let err = slot.acquire(TransportKind::Serial, "/dev/ttyUSB1").unwrap_err();
        assert_eq!(err.code(), "ConnectionError");
        slot.release();
        assert!(slot.acquire(TransportKind::Serial, "/dev/ttyUSB1").is_ok());
    }

    #[test]
    fn test_temp_artifact_removed_on_drop() {
        let artifact = TempArtifact::create(b"^XA^XZ").unwrap();
        let path = artifact.path().to_path_buf();
        assert_eq!(fs::read(&path).unwrap(), b"^XA^XZ");
        drop(artifact);
        assert!(!path.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_locate_program() {
        assert!(locate_program("sh").is_some());
        assert!(locate_program("/bin/sh").is_some());
        assert!(locate_program("etiqueta-no-such-program").is_none());
    }
}
