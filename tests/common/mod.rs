//! Spy transport shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use etiqueta::document::LabelDocument;
use etiqueta::transport::{
    Endpoint, Session, SessionHandle, Transport, TransportKind, TransportResult,
};
use etiqueta::EtiquetaError;

/// Call counters, shared with the test after the spy is boxed into a router.
#[derive(Debug, Default)]
pub struct Calls {
    pub connect: AtomicUsize,
    pub send: AtomicUsize,
    pub disconnect: AtomicUsize,
    /// Documents received by `send`, in order.
    pub documents: Mutex<Vec<String>>,
}

impl Calls {
    pub fn connects(&self) -> usize {
        self.connect.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> usize {
        self.send.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> usize {
        self.disconnect.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.connects() + self.sends() + self.disconnects()
    }

    pub fn documents(&self) -> Vec<String> {
        self.documents.lock().unwrap().clone()
    }
}

/// How the spy behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    FailConnect,
    FailSend,
    /// Fail only the send with this 1-based number.
    FailSendNumber(usize),
}

pub struct SpyTransport {
    kind: TransportKind,
    behavior: Behavior,
    calls: Arc<Calls>,
}

impl SpyTransport {
    pub fn new(kind: TransportKind, behavior: Behavior) -> (Box<dyn Transport>, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let spy = Self {
            kind,
            behavior,
            calls: calls.clone(),
        };
        (Box::new(spy), calls)
    }
}

#[async_trait]
impl Transport for SpyTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    fn supports_copy_count(&self) -> bool {
        true
    }

    async fn discover(&self) -> Vec<Endpoint> {
        vec![Endpoint::new(self.kind, "spy", "spy printer")]
    }

    async fn connect(&mut self, endpoint: Option<&str>) -> Result<Session, EtiquetaError> {
        self.calls.connect.fetch_add(1, Ordering::SeqCst);
        if self.behavior == Behavior::FailConnect {
            return Err(EtiquetaError::Connection(format!("{} unreachable", self.kind)));
        }
        Ok(Session::open(
            self.kind,
            endpoint.unwrap_or("spy"),
            SessionHandle::None,
        ))
    }

    async fn send(
        &mut self,
        _session: &mut Session,
        document: &LabelDocument,
        _copies: u32,
    ) -> Result<TransportResult, EtiquetaError> {
        let number = self.calls.send.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls
            .documents
            .lock()
            .unwrap()
            .push(document.as_str().to_string());
        match self.behavior {
            Behavior::FailSend => Err(EtiquetaError::Send(format!("{} write failed", self.kind))),
            Behavior::FailSendNumber(n) if n == number => {
                Err(EtiquetaError::Send(format!("send {} failed", number)))
            }
            _ => Ok(TransportResult::ok("spy printed")),
        }
    }

    async fn disconnect(&mut self, session: &mut Session) {
        self.calls.disconnect.fetch_add(1, Ordering::SeqCst);
        session.close();
    }
}
