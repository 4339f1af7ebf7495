//! # Etiqueta - RFID Label Printing Library
//!
//! Etiqueta encodes RFID tag payloads, composes ZPL label documents and sends
//! them to Zebra printers (ZD621R) over several transports. It provides:
//!
//! - **Payload encoding**: fixed-layout numeric tag data
//! - **Document composition**: typed placeholder templates
//! - **Safety gate**: blocks tag-memory commands unless explicitly allowed
//! - **Transports**: process bridge, serial line, network socket, OS copy
//! - **Batch printing**: per-copy sequencing, pacing and failure isolation
//!
//! ## Quick Start
//!
//! ```no_run
//! use etiqueta::{
//!     config::Config,
//!     dispatch::Router,
//!     document::Compositor,
//!     item::LabelItem,
//!     payload::RfidPayload,
//!     transport::TransportKind,
//! };
//!
//! # async fn example() -> Result<(), etiqueta::EtiquetaError> {
//! let item = LabelItem::new("L458-JASM-11.0-SILV-1885", "789643610064")
//!     .style("JASMINE")
//!     .po("0464");
//!
//! // Encode the tag payload for copy 1
//! let payload = RfidPayload::encode_checked(&item.barcode, &item.po_fragment(), 1, 24)?;
//!
//! // Fill the built-in template
//! let document = Compositor::builtin().compose(&item, &payload, 1)?;
//!
//! // Gate-check and send, falling back to the default transport on failure
//! let mut router = Router::from_config(&Config::default());
//! router.dispatch(&document, TransportKind::Network, 1, true).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`payload`] | RFID payload encoder and validator |
//! | [`item`] | Label item records and variant codes |
//! | [`document`] | Templates and the document compositor |
//! | [`safety`] | Safety gate and inspection report |
//! | [`transport`] | Printer transports |
//! | [`dispatch`] | Router with single fallback |
//! | [`batch`] | Batch controller and report |
//! | [`server`] | JSON HTTP API |
//! | [`protocol`] | ZPL helpers |
//! | [`printer`] | Printer configurations |
//! | [`config`] | Runtime configuration |
//! | [`error`] | Error types |

pub mod batch;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod item;
pub mod payload;
pub mod printer;
pub mod protocol;
pub mod safety;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use error::EtiquetaError;
pub use printer::PrinterConfig;
pub use transport::{Transport, TransportKind};
