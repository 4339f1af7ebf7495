//! # ZPL Document Helpers
//!
//! Label documents are ZPL (Zebra Programming Language) text. Commands start
//! with a caret (`^`, format commands) or a tilde (`~`, control commands)
//! followed by a two-letter mnemonic and optional comma-separated parameters.
//!
//! ## Structure
//!
//! ```text
//! ^XA                         start of label format
//! ^FO50,50^A0N,30,30^FD...^FS field origin / font / field data / separator
//! ^RFW,H,2,12,1^FD...^FS      RFID write (tag memory)
//! ^PQ1,0,1,Y                  print quantity
//! ^XZ                         end of label format
//! ```

use crate::printer::PrinterConfig;

/// Start of a label format.
pub const START_MARKER: &str = "^XA";

/// End of a label format.
pub const END_MARKER: &str = "^XZ";

/// Print quantity command prefix.
pub const PRINT_QUANTITY: &str = "^PQ";

/// Host status query, also used as the network discovery probe.
pub const HOST_STATUS: &str = "~HS";

/// Cancel all queued formats.
pub const CANCEL_ALL: &str = "~JA";

/// Maximum characters kept per command in [`commands`] output.
const COMMAND_PREVIEW_LEN: usize = 10;

/// # Print Quantity (^PQ)
///
/// Tells the printer to produce `copies` labels from one format.
///
/// | Parameter | Value | Meaning |
/// |-----------|-------|---------|
/// | q | copies | total quantity |
/// | p | 0 | no pause between groups |
/// | r | 1 | replicates of each serial number |
/// | o | Y | override pause count |
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::zpl;
///
/// assert_eq!(zpl::print_quantity(3), "^PQ3,0,1,Y");
/// ```
pub fn print_quantity(copies: u32) -> String {
    format!("{}{},0,1,Y", PRINT_QUANTITY, copies.max(1))
}

/// Set the copy count of a document.
///
/// If the document already has a `^PQ` command its quantity digits are
/// replaced. Otherwise a `^PQ` command is inserted before the last `^XZ`.
/// Documents without an end marker are returned unchanged.
pub fn inject_copy_count(document: &str, copies: u32) -> String {
    let copies = copies.max(1);

    if let Some(pos) = document.find(PRINT_QUANTITY) {
        let digits_start = pos + PRINT_QUANTITY.len();
        let digits_len = document[digits_start..]
            .bytes()
            .take_while(|b| b.is_ascii_digit())
            .count();
        let mut out = String::with_capacity(document.len() + 4);
        out.push_str(&document[..digits_start]);
        out.push_str(&copies.to_string());
        out.push_str(&document[digits_start + digits_len..]);
        return out;
    }

    match document.rfind(END_MARKER) {
        Some(end) => {
            let mut out = String::with_capacity(document.len() + 16);
            out.push_str(&document[..end]);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&print_quantity(copies));
            out.push('\n');
            out.push_str(&document[end..]);
            out
        }
        None => document.to_string(),
    }
}

/// True if the document opens a format.
pub fn has_start_marker(document: &str) -> bool {
    document.contains(START_MARKER)
}

/// True if the document closes a format.
pub fn has_end_marker(document: &str) -> bool {
    document.contains(END_MARKER)
}

/// Extract the commands of a document.
///
/// Each command is the prefix character, up to three uppercase letters and the
/// parameters that follow, truncated to 10 characters. Field data between
/// `^FD` and `^FS` is included in the `^FD` entry.
///
/// ## Example
///
/// ```
/// use etiqueta::protocol::zpl;
///
/// let cmds = zpl::commands("^XA^FO50,50^FDHello^FS^XZ");
/// assert_eq!(cmds, vec!["^XA", "^FO50,50", "^FDHello", "^FS", "^XZ"]);
/// ```
pub fn commands(document: &str) -> Vec<String> {
    let chars: Vec<char> = document.chars().collect();
    let mut out = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c != '^' && c != '~' {
            i += 1;
            continue;
        }

        let start = i;
        i += 1;
        let mut letters = 0;
        while i < chars.len() && letters < 3 && chars[i].is_ascii_uppercase() {
            i += 1;
            letters += 1;
        }
        if letters == 0 {
            continue;
        }
        while i < chars.len() && chars[i] != '^' && chars[i] != '~' {
            i += 1;
        }

        let cmd: String = chars[start..i]
            .iter()
            .filter(|c| !c.is_whitespace())
            .take(COMMAND_PREVIEW_LEN)
            .collect();
        out.push(cmd);
    }

    out
}

/// Minimal benign label used to probe a session.
pub fn test_label() -> String {
    [
        START_MARKER,
        &PrinterConfig::ZD621R.label_setup(),
        "^FO50,50^A0N,40,40^FDetiqueta test^FS",
        "^FO50,100^A0N,25,25^FDtransport check^FS",
        END_MARKER,
    ]
    .join("\n")
}

/// Emergency stop: cancel every queued format.
pub fn cancel_all() -> String {
    [START_MARKER, CANCEL_ALL, END_MARKER].join("\n")
}

/// Network status probe (`~HS` + CRLF).
pub fn host_status_probe() -> Vec<u8> {
    format!("{}\r\n", HOST_STATUS).into_bytes()
}
