//! # Dispatch Router Tests
//!
//! Drives the router with spy transports and checks the gate ordering, the
//! single fallback, and session cleanup.

mod common;

use pretty_assertions::assert_eq;

use common::{Behavior, SpyTransport};
use etiqueta::config::Config;
use etiqueta::dispatch::{DispatchState, Router};
use etiqueta::document::LabelDocument;
use etiqueta::protocol::zpl;
use etiqueta::transport::TransportKind;
use etiqueta::EtiquetaError;

fn plain() -> LabelDocument {
    LabelDocument::new("^XA\n^FO50,50^A0N,30,30^FDplain^FS\n^XZ")
}

fn rfid() -> LabelDocument {
    LabelDocument::new("^XA\n^RFW,H,2,12,1^FD789643610064046410000000^FS\n^XZ")
}

#[tokio::test]
async fn dangerous_document_never_reaches_a_transport() {
    let (primary, primary_calls) = SpyTransport::new(TransportKind::Network, Behavior::Succeed);
    let (fallback, fallback_calls) =
        SpyTransport::new(TransportKind::ProcessBridge, Behavior::Succeed);
    let mut router = Router::new(TransportKind::ProcessBridge);
    router.register(primary);
    router.register(fallback);

    let err = router
        .dispatch(&rfid(), TransportKind::Network, 1, false)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "DangerousCommandBlocked");
    assert_eq!(err.to_string(), "Dangerous commands blocked: ^RFW");
    assert_eq!(primary_calls.total(), 0);
    assert_eq!(fallback_calls.total(), 0);
    assert_eq!(router.state(), Some(DispatchState::Failed));
}

#[tokio::test]
async fn override_lets_dangerous_document_through() {
    let (primary, calls) = SpyTransport::new(TransportKind::Network, Behavior::Succeed);
    let mut router = Router::new(TransportKind::Network);
    router.register(primary);

    let delivery = router
        .dispatch(&rfid(), TransportKind::Network, 1, true)
        .await
        .unwrap();

    assert!(delivery.result.success);
    assert_eq!(calls.sends(), 1);
    assert_eq!(calls.documents(), vec![rfid().into_string()]);
}

#[tokio::test]
async fn failing_primary_falls_back_to_default_once() {
    let (primary, primary_calls) = SpyTransport::new(TransportKind::Serial, Behavior::FailSend);
    let (fallback, fallback_calls) =
        SpyTransport::new(TransportKind::ProcessBridge, Behavior::Succeed);
    let mut router = Router::new(TransportKind::ProcessBridge);
    router.register(primary);
    router.register(fallback);

    let delivery = router
        .dispatch(&plain(), TransportKind::Serial, 2, false)
        .await
        .unwrap();

    assert_eq!(delivery.transport, TransportKind::ProcessBridge);
    assert_eq!(delivery.requested, TransportKind::Serial);
    assert!(delivery.fallback_used);
    assert_eq!(primary_calls.sends(), 1);
    assert_eq!(fallback_calls.connects(), 1);
    assert_eq!(fallback_calls.sends(), 1);
    assert_eq!(router.state(), Some(DispatchState::Done));
}

#[tokio::test]
async fn both_failing_reports_both_errors() {
    let (primary, primary_calls) = SpyTransport::new(TransportKind::Network, Behavior::FailConnect);
    let (fallback, fallback_calls) =
        SpyTransport::new(TransportKind::ProcessBridge, Behavior::FailSend);
    let mut router = Router::new(TransportKind::ProcessBridge);
    router.register(primary);
    router.register(fallback);

    let err = router
        .dispatch(&plain(), TransportKind::Network, 1, false)
        .await
        .unwrap_err();

    // The last attempt's kind is what callers see.
    assert_eq!(err.code(), "SendError");
    assert!(matches!(&err, EtiquetaError::Delivery(attempts) if attempts.len() == 2));
    let message = err.to_string();
    assert!(message.contains("network: Connection error: network unreachable"));
    assert!(message.contains("process-bridge: Send error: process-bridge write failed"));
    assert_eq!(primary_calls.connects(), 1);
    assert_eq!(fallback_calls.sends(), 1);
    assert_eq!(router.state(), Some(DispatchState::Failed));
}

#[tokio::test]
async fn default_kind_failure_is_not_retried() {
    let (primary, calls) = SpyTransport::new(TransportKind::ProcessBridge, Behavior::FailSend);
    let mut router = Router::new(TransportKind::ProcessBridge);
    router.register(primary);

    let err = router
        .dispatch(&plain(), TransportKind::ProcessBridge, 1, false)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "SendError");
    assert_eq!(calls.connects(), 1);
    assert_eq!(calls.sends(), 1);
}

#[tokio::test]
async fn session_is_closed_after_failed_send() {
    let (primary, calls) = SpyTransport::new(TransportKind::Network, Behavior::FailSend);
    let mut router = Router::new(TransportKind::Network);
    router.register(primary);

    let _ = router.dispatch(&plain(), TransportKind::Network, 1, false).await;

    assert_eq!(calls.connects(), 1);
    assert_eq!(calls.disconnects(), 1);
}

#[tokio::test]
async fn failed_connect_skips_send_and_disconnect() {
    let (primary, calls) = SpyTransport::new(TransportKind::Network, Behavior::FailConnect);
    let mut router = Router::new(TransportKind::Network);
    router.register(primary);

    let err = router
        .dispatch(&plain(), TransportKind::Network, 1, false)
        .await
        .unwrap_err();

    assert_eq!(err.code(), "ConnectionError");
    assert_eq!(calls.sends(), 0);
    assert_eq!(calls.disconnects(), 0);
}

#[tokio::test]
async fn cancel_all_is_a_safe_document() {
    let (primary, calls) = SpyTransport::new(TransportKind::Network, Behavior::Succeed);
    let mut router = Router::new(TransportKind::Network);
    router.register(primary);

    let cancel = LabelDocument::new(zpl::cancel_all());
    router
        .dispatch(&cancel, TransportKind::Network, 1, false)
        .await
        .unwrap();

    assert_eq!(calls.documents(), vec!["^XA\n~JA\n^XZ".to_string()]);
}

#[tokio::test]
async fn test_label_passes_through_transport_default() {
    let (mut spy, calls) = SpyTransport::new(TransportKind::Network, Behavior::Succeed);
    let mut session = spy.connect(None).await.unwrap();

    assert!(spy.test(&mut session).await);
    assert!(calls.documents()[0].contains("etiqueta test"));
}

#[tokio::test]
async fn requested_kind_falls_back_to_configured_default() {
    let config = Config {
        default_transport: TransportKind::ProcessBridge,
        ..Config::default()
    };
    let mut router = Router::from_config(&config);
    let (requested, requested_calls) =
        SpyTransport::new(TransportKind::Network, Behavior::FailConnect);
    let (default, default_calls) =
        SpyTransport::new(TransportKind::ProcessBridge, Behavior::Succeed);
    router.register(requested);
    router.register(default);

    // A per-call kind must not replace the configured fallback.
    let delivery = router
        .dispatch(&plain(), TransportKind::Network, 1, false)
        .await
        .unwrap();

    assert_eq!(router.default_kind(), TransportKind::ProcessBridge);
    assert!(delivery.fallback_used);
    assert_eq!(delivery.transport, TransportKind::ProcessBridge);
    assert_eq!(requested_calls.connects(), 1);
    assert_eq!(default_calls.sends(), 1);
}
