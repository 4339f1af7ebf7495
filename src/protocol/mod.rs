//! # Printer Protocol
//!
//! Helpers for the ZPL II page-description language spoken by Zebra label
//! printers.
//!
//! ## Module Structure
//!
//! - [`zpl`]: markers, copy-count injection, command listing, control documents
//!
//! ## Usage Example
//!
//! ```
//! use etiqueta::protocol::zpl;
//!
//! let label = "^XA\n^FO50,50^A0N,30,30^FDHello^FS\n^XZ";
//! let three = zpl::inject_copy_count(label, 3);
//!
//! assert!(three.contains("^PQ3,0,1,Y"));
//! assert_eq!(zpl::commands(label), vec!["^XA", "^FO50,50", "^A0N,30,30", "^FDHello", "^FS", "^XZ"]);
//! ```

pub mod zpl;
