//! # Dispatch Router
//!
//! Moves one label document through the safety gate and onto a transport:
//!
//! ```text
//! Validating ──▶ Connecting ──▶ Sending ──▶ Done
//!     │              │             │
//!     └──────────────┴─────────────┴──▶ Failed
//! ```
//!
//! A gate rejection ends in `Failed` before any transport is touched. A
//! transport failure is retried once on the default kind, unless the
//! requested kind already was the default.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::document::LabelDocument;
use crate::error::{DeliveryAttempt, EtiquetaError};
use crate::safety::SafetyGate;
use crate::transport::{self, Endpoint, Transport, TransportKind, TransportResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchState {
    Validating,
    Connecting,
    Sending,
    Done,
    Failed,
}

/// A document that reached a printer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    /// Kind that actually printed the document.
    pub transport: TransportKind,
    pub requested: TransportKind,
    pub fallback_used: bool,
    pub endpoint: String,
    pub copies: u32,
    pub result: TransportResult,
}

pub struct Router {
    transports: HashMap<TransportKind, Box<dyn Transport>>,
    endpoints: HashMap<TransportKind, String>,
    default_kind: TransportKind,
    gate: SafetyGate,
    state: Option<DispatchState>,
}

impl Router {
    pub fn new(default_kind: TransportKind) -> Self {
        Self {
            transports: HashMap::new(),
            endpoints: HashMap::new(),
            default_kind,
            gate: SafetyGate::new(),
            state: None,
        }
    }

    /// Router with every transport kind built from `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::new(config.default_transport);
        for kind in TransportKind::ALL {
            router.register(transport::from_config(kind, config));
        }
        if let Some(host) = &config.network.host {
            router.set_endpoint(TransportKind::Network, host.clone());
        }
        if let Some(device) = &config.serial.device {
            router.set_endpoint(TransportKind::Serial, device.clone());
        }
        if let Some(device) = &config.os_copy.device {
            router.set_endpoint(TransportKind::OsCopy, device.clone());
        }
        router
    }

    /// Add or replace the transport for its kind.
    pub fn register(&mut self, transport: Box<dyn Transport>) {
        self.transports.insert(transport.kind(), transport);
    }

    /// Pin the endpoint `connect` is given for `kind`.
    pub fn set_endpoint(&mut self, kind: TransportKind, endpoint: impl Into<String>) {
        self.endpoints.insert(kind, endpoint.into());
    }

    pub fn default_kind(&self) -> TransportKind {
        self.default_kind
    }

    /// Terminal state of the last dispatch.
    pub fn state(&self) -> Option<DispatchState> {
        self.state
    }

    pub async fn discover(&self, kind: TransportKind) -> Vec<Endpoint> {
        match self.transports.get(&kind) {
            Some(transport) => transport.discover().await,
            None => Vec::new(),
        }
    }

    /// Gate-check `document` and print `copies` of it on `kind`.
    pub async fn dispatch(
        &mut self,
        document: &LabelDocument,
        kind: TransportKind,
        copies: u32,
        allow_dangerous: bool,
    ) -> Result<Delivery, EtiquetaError> {
        self.enter(DispatchState::Validating);
        if let Err(e) = self.gate.check(document.as_str(), allow_dangerous) {
            self.enter(DispatchState::Failed);
            return Err(e);
        }

        let first = match self.attempt(document, kind, copies).await {
            Ok((endpoint, result)) => {
                return Ok(self.delivered(kind, kind, endpoint, copies, result));
            }
            Err(e) => e,
        };

        if kind == self.default_kind {
            self.enter(DispatchState::Failed);
            return Err(first);
        }

        let fallback = self.default_kind;
        warn!(requested = %kind, fallback = %fallback, error = %first, "retrying on default transport");
        match self.attempt(document, fallback, copies).await {
            Ok((endpoint, result)) => Ok(self.delivered(fallback, kind, endpoint, copies, result)),
            Err(second) => {
                self.enter(DispatchState::Failed);
                Err(EtiquetaError::Delivery(vec![
                    DeliveryAttempt::new(kind, first),
                    DeliveryAttempt::new(fallback, second),
                ]))
            }
        }
    }

    /// Connect, send, and always disconnect.
    async fn attempt(
        &mut self,
        document: &LabelDocument,
        kind: TransportKind,
        copies: u32,
    ) -> Result<(String, TransportResult), EtiquetaError> {
        self.enter(DispatchState::Connecting);
        let endpoint = self.endpoints.get(&kind).cloned();
        let transport = self.transports.get_mut(&kind).ok_or_else(|| {
            EtiquetaError::Connection(format!("no {} transport registered", kind))
        })?;

        let mut session = transport.connect(endpoint.as_deref()).await?;
        self.state = Some(DispatchState::Sending);
        debug!(transport = %kind, endpoint = %session.endpoint(), "sending");
        let sent = transport.send(&mut session, document, copies).await;
        transport.disconnect(&mut session).await;

        sent.map(|result| (session.endpoint().to_string(), result))
    }

    fn delivered(
        &mut self,
        transport: TransportKind,
        requested: TransportKind,
        endpoint: String,
        copies: u32,
        result: TransportResult,
    ) -> Delivery {
        self.enter(DispatchState::Done);
        info!(transport = %transport, endpoint = %endpoint, copies, "document delivered");
        Delivery {
            transport,
            requested,
            fallback_used: transport != requested,
            endpoint,
            copies: copies.max(1),
            result,
        }
    }

    fn enter(&mut self, state: DispatchState) {
        debug!(?state, "dispatch state");
        self.state = Some(state);
    }
}
