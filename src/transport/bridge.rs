//! # Process-Bridge Transport
//!
//! Delegates printer I/O to an external interpreter, one process per send.
//!
//! ## Send Sequence
//!
//! 1. Inject the copy count (`^PQ`) into the document
//! 2. Write it to a uniquely named temp artifact
//! 3. Run `<program> <args...> <artifact> <printer-name>` under the send timeout
//! 4. Decode the single status line from stdout (see [`reply`](super::reply))
//! 5. Remove the artifact, whatever happened
//!
//! A reference interpreter ships in `bridge/print_zpl.py`.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::reply::{self, BridgeReply};
use super::{
    bounded, copy_plan, locate_program, Endpoint, Session, SessionHandle, SessionSlot,
    TempArtifact, Transport, TransportKind, TransportResult,
};
use crate::config::{Config, TimeoutConfig};
use crate::document::LabelDocument;
use crate::error::EtiquetaError;

pub struct BridgeTransport {
    program: String,
    args: Vec<String>,
    printer_name: String,
    timeouts: TimeoutConfig,
    slot: SessionSlot,
}

impl BridgeTransport {
    pub fn new(program: impl Into<String>, args: Vec<String>, printer_name: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            printer_name: printer_name.into(),
            timeouts: TimeoutConfig::default(),
            slot: SessionSlot::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.bridge.program.clone(),
            config.bridge.args.clone(),
            config.printer_name.clone(),
        )
        .with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    async fn run_interpreter(
        &self,
        artifact: &TempArtifact,
        printer: &str,
    ) -> Result<std::process::Output, EtiquetaError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .arg(artifact.path())
            .arg(printer)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let limit = self.timeouts.send();
        bounded(
            limit,
            async {
                command.output().await.map_err(|e| {
                    EtiquetaError::Send(format!("Failed to run {}: {}", self.program, e))
                })
            },
            || EtiquetaError::Send(format!("interpreter timed out after {:?}", limit)),
        )
        .await
    }
}

#[async_trait]
impl Transport for BridgeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::ProcessBridge
    }

    fn supports_copy_count(&self) -> bool {
        true
    }

    async fn discover(&self) -> Vec<Endpoint> {
        match locate_program(&self.program) {
            Some(path) => vec![Endpoint::new(
                self.kind(),
                self.printer_name.clone(),
                format!("{} via {}", self.printer_name, path.display()),
            )],
            None => {
                debug!(program = %self.program, "interpreter not found on PATH");
                Vec::new()
            }
        }
    }

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError> {
        if locate_program(&self.program).is_none() {
            return Err(EtiquetaError::Connection(format!(
                "interpreter {} not found",
                self.program
            )));
        }
        let printer = endpoint.unwrap_or(&self.printer_name).to_string();
        self.slot.acquire(self.kind(), &printer)?;
        info!(printer = %printer, program = %self.program, "process bridge ready");
        Ok(Session::open(self.kind(), printer, SessionHandle::None))
    }

    async fn send(
        &mut self,
        session: &mut Session,
        document: &LabelDocument,
        copies: u32,
    ) -> Result<TransportResult, EtiquetaError> {
        session.ensure_open()?;
        let (bytes, _) = copy_plan(document, copies, self.supports_copy_count());
        let artifact = TempArtifact::create(&bytes)?;

        let output = self.run_interpreter(&artifact, session.endpoint()).await?;
        drop(artifact);

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = match reply::decode(&stdout) {
                Ok(BridgeReply::Error(text)) => text,
                _ => stderr.trim().to_string(),
            };
            return Err(EtiquetaError::Send(format!(
                "interpreter exited with {}: {}",
                output.status, reason
            )));
        }

        match reply::decode(&stdout)? {
            BridgeReply::Success(fields) => {
                debug!(?fields, "interpreter accepted document");
                Ok(TransportResult {
                    success: true,
                    detail: format!("printed via {}", session.endpoint()),
                    fields,
                })
            }
            BridgeReply::Error(text) => {
                warn!(error = %text, "interpreter reported failure");
                Err(EtiquetaError::Send(text))
            }
        }
    }

    async fn disconnect(&mut self, session: &mut Session) {
        session.close();
        self.slot.release();
    }
}
