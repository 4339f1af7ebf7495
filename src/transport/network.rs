//! # Network-Socket Transport
//!
//! Raw ZPL over TCP to the printer's raw-print port (9100).
//!
//! ## Discovery
//!
//! A `~HS` host-status query is broadcast over UDP to each configured
//! broadcast address. Replies that mention a vendor marker (`Zebra`,
//! `ZD621R`) within the discovery window become candidates. A configured
//! host is always listed first.

use std::collections::HashSet;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::{
    bounded, candidates, copy_plan, Endpoint, Session, SessionHandle, SessionSlot, Transport,
    TransportKind, TransportResult,
};
use crate::config::{Config, NetworkConfig, TimeoutConfig};
use crate::document::LabelDocument;
use crate::error::EtiquetaError;
use crate::protocol::zpl;

/// Discovery reply buffer size.
const REPLY_BUFFER: usize = 1024;

/// Characters of a discovery reply kept as the endpoint description.
const DESCRIPTION_LEN: usize = 60;

/// Pause after a failed discovery receive.
const RECV_ERROR_BACKOFF: std::time::Duration = std::time::Duration::from_millis(50);

pub struct NetworkTransport {
    settings: NetworkConfig,
    timeouts: TimeoutConfig,
    slot: SessionSlot,
}

impl NetworkTransport {
    pub fn new(settings: NetworkConfig) -> Self {
        Self {
            settings,
            timeouts: TimeoutConfig::default(),
            slot: SessionSlot::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.network.clone()).with_timeouts(config.timeouts)
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// `host` or `host:port`; the configured port fills in a bare host.
    fn address(&self, endpoint: &str) -> String {
        let has_port = endpoint
            .rsplit_once(':')
            .is_some_and(|(_, port)| port.parse::<u16>().is_ok());
        if has_port || endpoint.parse::<SocketAddr>().is_ok() {
            endpoint.to_string()
        } else {
            format!("{}:{}", endpoint, self.settings.port)
        }
    }

    async fn broadcast_probe(&self) -> Result<Vec<Endpoint>, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;

        let probe = zpl::host_status_probe();
        for target in &self.settings.broadcast_targets {
            let addr = format!("{}:{}", target, self.settings.port);
            if let Err(e) = socket.send_to(&probe, &addr).await {
                debug!(target = %addr, error = %e, "discovery probe not sent");
            }
        }

        let deadline = Instant::now() + self.timeouts.discovery();
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        let mut buf = [0u8; REPLY_BUFFER];

        while let Ok(received) = tokio::time::timeout_at(deadline, socket.recv_from(&mut buf)).await {
            let (len, from) = match received {
                Ok(reply) => reply,
                Err(e) => {
                    debug!(error = %e, "discovery receive failed");
                    pause_after_receive_error(deadline).await;
                    continue;
                }
            };
            let text = String::from_utf8_lossy(&buf[..len]);
            if !self.is_printer_reply(&text) || !seen.insert(from.ip()) {
                continue;
            }
            let description: String = text.trim().chars().take(DESCRIPTION_LEN).collect();
            debug!(address = %from.ip(), "printer answered discovery probe");
            found.push(Endpoint::new(
                self.kind(),
                format!("{}:{}", from.ip(), self.settings.port),
                description,
            ));
        }

        Ok(found)
    }

    fn is_printer_reply(&self, text: &str) -> bool {
        self.settings
            .vendor_markers
            .iter()
            .any(|marker| text.contains(marker.as_str()))
    }
}

#[async_trait]
impl Transport for NetworkTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Network
    }

    fn supports_copy_count(&self) -> bool {
        true
    }

    async fn discover(&self) -> Vec<Endpoint> {
        let mut found = Vec::new();
        if let Some(host) = &self.settings.host {
            found.push(Endpoint::new(self.kind(), self.address(host), "configured printer"));
        }

        match self.broadcast_probe().await {
            Ok(replies) => {
                for endpoint in replies {
                    if !found.iter().any(|e| e.id == endpoint.id) {
                        found.push(endpoint);
                    }
                }
            }
            Err(e) => warn!(error = %e, "network discovery failed"),
        }

        debug!(count = found.len(), "network discovery finished");
        found
    }

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError> {
        if self.slot.is_occupied() {
            return Err(EtiquetaError::Connection(
                "network already has an open session".to_string(),
            ));
        }

        let limit = self.timeouts.connect();
        let mut last_error = None;
        for candidate in candidates(&*self, endpoint).await {
            let addr = self.address(&candidate);
            let attempt = bounded(
                limit,
                async {
                    TcpStream::connect(&addr).await.map_err(|e| {
                        EtiquetaError::Connection(format!("Failed to connect to {}: {}", addr, e))
                    })
                },
                || EtiquetaError::Connection(format!("connecting to {} timed out after {:?}", addr, limit)),
            )
            .await;

            match attempt {
                Ok(stream) => {
                    self.slot.acquire(self.kind(), &addr)?;
                    info!(address = %addr, "connected to printer");
                    return Ok(Session::open(self.kind(), addr, SessionHandle::Tcp(stream)));
                }
                Err(e) => {
                    debug!(address = %addr, error = %e, "network candidate unreachable");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            EtiquetaError::Connection("no network printer found".to_string())
        }))
    }

    async fn send(
        &mut self,
        session: &mut Session,
        document: &LabelDocument,
        copies: u32,
    ) -> Result<TransportResult, EtiquetaError> {
        session.ensure_open()?;
        let (bytes, _) = copy_plan(document, copies, self.supports_copy_count());
        let SessionHandle::Tcp(stream) = &mut session.handle else {
            return Err(EtiquetaError::Send(
                "network session has no open socket".to_string(),
            ));
        };

        let limit = self.timeouts.send();
        bounded(
            limit,
            async {
                stream
                    .write_all(&bytes)
                    .await
                    .map_err(|e| EtiquetaError::Send(format!("Write failed: {}", e)))?;
                stream
                    .flush()
                    .await
                    .map_err(|e| EtiquetaError::Send(format!("Flush failed: {}", e)))
            },
            || EtiquetaError::Send(format!("network write timed out after {:?}", limit)),
        )
        .await?;

        Ok(TransportResult::ok(format!(
            "sent {} bytes to {}",
            bytes.len(),
            session.endpoint
        )))
    }

    async fn disconnect(&mut self, session: &mut Session) {
        if let SessionHandle::Tcp(stream) = &mut session.handle {
            if let Err(e) = stream.shutdown().await {
                debug!(address = %session.endpoint, error = %e, "socket shutdown failed");
            }
        }
        session.close();
        self.slot.release();
    }
}

/// Sleep for the receive-error backoff, never past `deadline`.
async fn pause_after_receive_error(deadline: Instant) {
    tokio::time::sleep_until(deadline.min(Instant::now() + RECV_ERROR_BACKOFF)).await;
}
