//! # OS-Copy Transport
//!
//! Hands the document to the operating system's copy command, which writes
//! it to a printer device or shared printer:
//!
//! | Platform | Command | Target |
//! |----------|---------|--------|
//! | Unix | `cp <artifact> <device>` | `/dev/usb/lp0` |
//! | Windows | `cmd /C copy /B <artifact> <target>` | `\\localhost\ZD621R` |
//!
//! The copy is repeated once per requested copy.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use super::serial::scan_dir;
use super::{
    bounded, candidates, copy_plan, Endpoint, Session, SessionHandle, SessionSlot, TempArtifact,
    Transport, TransportKind, TransportResult,
};
use crate::config::{Config, OsCopyConfig, TimeoutConfig};
use crate::document::LabelDocument;
use crate::error::EtiquetaError;

/// Line-printer class devices.
const USB_LP_DIR: &str = "/dev/usb";
const USB_LP_PREFIX: &str = "lp";

pub struct OsCopyTransport {
    settings: OsCopyConfig,
    timeouts: TimeoutConfig,
    slot: SessionSlot,
}

impl OsCopyTransport {
    pub fn new(settings: OsCopyConfig) -> Self {
        Self {
            settings,
            timeouts: TimeoutConfig::default(),
            slot: SessionSlot::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.os_copy.clone()).with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    async fn copy_once(&self, artifact: &Path, target: &str) -> Result<(), EtiquetaError> {
        let mut command = copy_command(artifact, target);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let limit = self.timeouts.send();
        let output = bounded(
            limit,
            async {
                command
                    .output()
                    .await
                    .map_err(|e| EtiquetaError::Send(format!("Failed to run copy: {}", e)))
            },
            || EtiquetaError::Send(format!("copy to {} timed out after {:?}", target, limit)),
        )
        .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EtiquetaError::Send(format!(
                "copy to {} exited with {}: {}",
                target,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

#[cfg(windows)]
fn copy_command(artifact: &Path, target: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "copy", "/B"]).arg(artifact).arg(target);
    command
}

#[cfg(not(windows))]
fn copy_command(artifact: &Path, target: &str) -> Command {
    let mut command = Command::new("cp");
    command.arg(artifact).arg(target);
    command
}

/// Device paths must exist; share names (`\\host\printer`) are left to the OS.
fn target_reachable(target: &str) -> bool {
    target.starts_with(r"\\") || Path::new(target).exists()
}

#[async_trait]
impl Transport for OsCopyTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::OsCopy
    }

    fn supports_copy_count(&self) -> bool {
        false
    }

    async fn discover(&self) -> Vec<Endpoint> {
        let mut found = Vec::new();
        if let Some(device) = &self.settings.device {
            found.push(Endpoint::new(self.kind(), device.clone(), "configured device"));
        }
        for path in scan_dir(Path::new(USB_LP_DIR), &[USB_LP_PREFIX]) {
            if !found.iter().any(|e| e.id == path) {
                found.push(Endpoint::new(self.kind(), path, "USB line printer"));
            }
        }
        debug!(count = found.len(), "os-copy discovery finished");
        found
    }

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError> {
        let target = candidates(&*self, endpoint)
            .await
            .into_iter()
            .find(|target| target_reachable(target))
            .ok_or_else(|| {
                EtiquetaError::Connection(match endpoint {
                    Some(target) => format!("{} does not exist", target),
                    None => "no printer device found".to_string(),
                })
            })?;

        self.slot.acquire(self.kind(), &target)?;
        info!(target = %target, "os-copy target ready");
        Ok(Session::open(self.kind(), target, SessionHandle::None))
    }

    async fn send(
        &mut self,
        session: &mut Session,
        document: &LabelDocument,
        copies: u32,
    ) -> Result<TransportResult, EtiquetaError> {
        session.ensure_open()?;
        let (bytes, writes) = copy_plan(document, copies, self.supports_copy_count());
        let artifact = TempArtifact::create(&bytes)?;

        for copy in 1..=writes {
            debug!(copy, target = %session.endpoint(), "copying document");
            self.copy_once(artifact.path(), session.endpoint()).await?;
        }

        Ok(TransportResult::ok(format!(
            "copied {} time(s) to {}",
            writes,
            session.endpoint()
        )))
    }

    async fn disconnect(&mut self, session: &mut Session) {
        session.close();
        self.slot.release();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{env, fs};

    fn temp_target() -> String {
        let path = env::temp_dir().join(format!("etiqueta-lp-{}", uuid::Uuid::new_v4()));
        fs::write(&path, b"").unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_copy_writes_document_to_target() {
        let target = temp_target();
        let mut transport = OsCopyTransport::new(OsCopyConfig {
            device: Some(target.clone()),
        });

        let mut session = transport.connect(None).await.unwrap();
        assert_eq!(session.endpoint(), target);
        let doc = LabelDocument::new("^XA^FDcopy^FS^XZ");
        let result = transport.send(&mut session, &doc, 2).await.unwrap();
        assert_eq!(result.detail, format!("copied 2 time(s) to {}", target));
        transport.disconnect(&mut session).await;

        let written = fs::read_to_string(&target).unwrap();
        fs::remove_file(&target).unwrap();
        assert_eq!(written, doc.as_str());
    }

    #[tokio::test]
    async fn test_missing_target_is_connection_error() {
        let mut transport = OsCopyTransport::new(OsCopyConfig::default());
        let err = transport
            .connect(Some("/nonexistent/etiqueta-lp0"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "ConnectionError");
    }

    #[tokio::test]
    async fn test_failed_copy_is_send_error() {
        let dir = env::temp_dir().join(format!("etiqueta-gone-{}", uuid::Uuid::new_v4()));
        fs::create_dir(&dir).unwrap();
        let target = dir.join("lp0");
        fs::write(&target, b"").unwrap();
        let target = target.to_string_lossy().into_owned();

        let mut transport = OsCopyTransport::new(OsCopyConfig::default());
        let mut session = transport.connect(Some(&target)).await.unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let err = transport
            .send(&mut session, &LabelDocument::new("^XA^XZ"), 1)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SendError");
    }

    #[test]
    fn test_share_names_are_left_to_the_os() {
        assert!(target_reachable(r"\\localhost\ZD621R"));
        assert!(!target_reachable("/nonexistent/etiqueta-lp0"));
    }
}
