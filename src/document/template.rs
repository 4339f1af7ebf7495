//! # Label Templates
//!
//! A template is ZPL text with `{NAME}` placeholders. Parsing splits it into
//! literal and field segments once, so rendering is a single pass: values are
//! never scanned for placeholders again.
//!
//! ## Placeholders
//!
//! | Token | Value |
//! |-------|-------|
//! | `{STYLE_NAME}` | style name, `N/A` when missing |
//! | `{VPM}` | variant code |
//! | `{COLOR}` | color, `N/A` when missing |
//! | `{SIZE}` | size, `N/A` when missing |
//! | `{BARCODE}` | sequential barcode |
//! | `{PO_INFO}` | `PO<fragment>` |
//! | `{LOCAL_INFO}` | `Local.<locale>` |
//! | `{RFID_DATA}` | encoded payload |

use std::collections::BTreeMap;
use std::fmt;

use crate::error::EtiquetaError;

/// Named template fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placeholder {
    StyleName,
    VariantCode,
    Color,
    Size,
    Barcode,
    PoInfo,
    LocalInfo,
    RfidData,
}

impl Placeholder {
    pub const ALL: [Placeholder; 8] = [
        Placeholder::StyleName,
        Placeholder::VariantCode,
        Placeholder::Color,
        Placeholder::Size,
        Placeholder::Barcode,
        Placeholder::PoInfo,
        Placeholder::LocalInfo,
        Placeholder::RfidData,
    ];

    /// Name between the braces.
    pub fn name(self) -> &'static str {
        match self {
            Self::StyleName => "STYLE_NAME",
            Self::VariantCode => "VPM",
            Self::Color => "COLOR",
            Self::Size => "SIZE",
            Self::Barcode => "BARCODE",
            Self::PoInfo => "PO_INFO",
            Self::LocalInfo => "LOCAL_INFO",
            Self::RfidData => "RFID_DATA",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Barcode and payload must come from real data, never a default.
    pub fn is_mandatory(self) -> bool {
        matches!(self, Self::Barcode | Self::RfidData)
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

/// Values for every placeholder of one label.
pub type FieldValues = BTreeMap<Placeholder, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text.
    ///
    /// A brace group whose content looks like a placeholder name
    /// (`[A-Z0-9_]+`) must be a known placeholder. Other braces are literal.
    pub fn parse(body: &str) -> Result<Self, EtiquetaError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = body;

        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let close = match after.find('}') {
                Some(close) => close,
                None => break,
            };
            let name = &after[..close];

            if !looks_like_placeholder(name) {
                literal.push_str(&rest[..open + 1]);
                rest = after;
                continue;
            }

            let field = Placeholder::from_name(name).ok_or_else(|| {
                EtiquetaError::Template(format!("unknown placeholder {{{}}}", name))
            })?;

            literal.push_str(&rest[..open]);
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(field));
            rest = &after[close + 1..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// The built-in minimal template.
    pub fn builtin() -> Self {
        // BUILTIN_TEMPLATE only uses known placeholders.
        Self::parse(BUILTIN_TEMPLATE).unwrap_or_else(|_| Self {
            segments: vec![Segment::Literal(BUILTIN_TEMPLATE.to_string())],
        })
    }

    /// Placeholders referenced by this template, in first-use order.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if let Segment::Field(p) = segment {
                if !seen.contains(p) {
                    seen.push(*p);
                }
            }
        }
        seen
    }

    /// Substitute every field in one pass.
    ///
    /// Fails if a referenced placeholder has no value, or if a mandatory one
    /// is empty.
    pub fn render(&self, values: &FieldValues) -> Result<String, EtiquetaError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => {
                    let value = values.get(p).ok_or_else(|| {
                        EtiquetaError::Template(format!("no value supplied for {}", p))
                    })?;
                    if p.is_mandatory() && value.trim().is_empty() {
                        return Err(EtiquetaError::Template(format!("{} cannot be empty", p)));
                    }
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn looks_like_placeholder(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Minimal label used when the primary template cannot be read.
pub const BUILTIN_TEMPLATE: &str = "^XA
^CI28
^PW831
^LL320
^FO50,50^A0N,35,35^FD{STYLE_NAME}^FS
^FO50,100^A0N,28,28^FDVPM: {VPM}^FS
^FO50,140^A0N,28,28^FDCOLOR: {COLOR}^FS
^FO50,180^A0N,28,28^FDSIZE: {SIZE}^FS
^FO50,240^BY2,3,40^BCN,40,Y,N,N^FD{BARCODE}^FS
^FO600,200^A0N,20,20^FD{PO_INFO}^FS
^FO600,230^A0N,16,16^FD{LOCAL_INFO}^FS
^RFW,H,2,12,1^FD{RFID_DATA}^FS
^PQ1,0,1,Y
^XZ";
