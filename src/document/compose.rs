//! # Document Compositor
//!
//! Merges a [`LabelItem`] and its encoded payload into a label document.
//!
//! The primary template is read once when the compositor is built. If it
//! cannot be read (or does not parse) the built-in template is used instead;
//! this is a local recovery and is only logged.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::document::template::{FieldValues, Placeholder, Template};
use crate::document::LabelDocument;
use crate::error::EtiquetaError;
use crate::item::LabelItem;
use crate::payload::RfidPayload;

/// Value used for missing optional fields.
pub const NOT_AVAILABLE: &str = "N/A";

/// Characters of the barcode source kept in the sequential barcode.
const SEQUENTIAL_BARCODE_PREFIX: usize = 8;

/// Where the active template came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    File(PathBuf),
    Builtin,
}

#[derive(Debug, Clone)]
pub struct Compositor {
    template: Template,
    source: TemplateSource,
}

impl Compositor {
    /// Load the primary template from `path`, falling back to the built-in one.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            debug!("no template path configured, using built-in template");
            return Self::builtin();
        };

        let body = match fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "template unreadable, using built-in template");
                return Self::builtin();
            }
        };

        match Template::parse(&body) {
            Ok(template) => {
                debug!(path = %path.display(), "loaded label template");
                Self {
                    template,
                    source: TemplateSource::File(path.to_path_buf()),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "template invalid, using built-in template");
                Self::builtin()
            }
        }
    }

    pub fn builtin() -> Self {
        Self {
            template: Template::builtin(),
            source: TemplateSource::Builtin,
        }
    }

    pub fn with_template(template: Template) -> Self {
        Self {
            template,
            source: TemplateSource::Builtin,
        }
    }

    pub fn source(&self) -> &TemplateSource {
        &self.source
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Build the document for one copy of `item`.
    ///
    /// Composing twice with the same inputs yields identical bytes.
    pub fn compose(
        &self,
        item: &LabelItem,
        payload: &RfidPayload,
        sequence: u32,
    ) -> Result<LabelDocument, EtiquetaError> {
        let values = field_values(item, payload, sequence)?;
        let body = self.template.render(&values)?;
        Ok(LabelDocument::new(body))
    }
}

/// Barcode printed on copy `sequence`: first 8 characters of the source,
/// then the PO fragment, then the sequence number.
pub fn sequential_barcode(item: &LabelItem, sequence: u32) -> String {
    let head: String = item
        .barcode
        .trim()
        .chars()
        .take(SEQUENTIAL_BARCODE_PREFIX)
        .collect();
    format!("{}{}{}", head, item.po_fragment(), sequence.max(1))
}

fn field_values(
    item: &LabelItem,
    payload: &RfidPayload,
    sequence: u32,
) -> Result<FieldValues, EtiquetaError> {
    if item.barcode.trim().is_empty() {
        return Err(EtiquetaError::Template(format!(
            "item {:?} has no barcode",
            item.variant_code
        )));
    }
    RfidPayload::validate(payload.as_str())?;

    let variant = item.variant();
    let mut values = FieldValues::new();
    values.insert(Placeholder::StyleName, or_na(item.style_name.as_deref()));
    values.insert(Placeholder::VariantCode, or_na(Some(&item.variant_code)));
    values.insert(Placeholder::Color, or_na(item.color.as_deref()));
    values.insert(Placeholder::Size, or_na(item.size.as_deref()));
    values.insert(Placeholder::Barcode, sequential_barcode(item, sequence));
    values.insert(Placeholder::PoInfo, format!("PO{}", item.po_fragment()));
    values.insert(
        Placeholder::LocalInfo,
        format!("Local.{}", variant.locale_code()),
    );
    values.insert(Placeholder::RfidData, payload.as_str().to_string());
    Ok(values)
}

fn or_na(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn item() -> LabelItem {
        LabelItem::new("L458-JASM-11.0-SILV-1885", "789643610064")
            .style("JASMINE")
            .color("SILVER")
            .size("11.0")
            .po("0464")
    }

    fn payload(seq: u32) -> RfidPayload {
        RfidPayload::encode("789643610064", "0464", seq, 24)
    }

    #[test]
    fn test_compose_fills_builtin_template() {
        let doc = Compositor::builtin().compose(&item(), &payload(1), 1).unwrap();
        let text = doc.as_str();
        assert!(text.starts_with("^XA"));
        assert!(text.contains("^FDJASMINE^FS"));
        assert!(text.contains("^FDVPM: L458-JASM-11.0-SILV-1885^FS"));
        assert!(text.contains("^FD7896436104641^FS"));
        assert!(text.contains("^FDPO0464^FS"));
        assert!(text.contains("^FDLocal.188^FS"));
        assert!(text.contains("^RFW,H,2,12,1^FD789643610064046410000000^FS"));
        assert!(!text.contains('{'));
    }

    #[test]
    fn test_compose_is_idempotent() {
        let compositor = Compositor::builtin();
        let a = compositor.compose(&item(), &payload(2), 2).unwrap();
        let b = compositor.compose(&item(), &payload(2), 2).unwrap();
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn test_missing_optional_fields_are_na() {
        let bare = LabelItem::new("L458-JASM", "789643610064");
        let doc = Compositor::builtin().compose(&bare, &payload(1), 1).unwrap();
        assert!(doc.as_str().contains("^FDN/A^FS"));
        assert!(doc.as_str().contains("COLOR: N/A"));
        assert!(doc.as_str().contains("SIZE: N/A"));
        assert!(doc.as_str().contains("Local.000"));
        assert!(doc.as_str().contains("PO458"));
    }

    #[test]
    fn test_missing_barcode_is_error() {
        let bare = LabelItem::new("L458-JASM", "");
        assert!(Compositor::builtin().compose(&bare, &payload(1), 1).is_err());
    }

    #[test]
    fn test_invalid_payload_rejected() {
        let bad = RfidPayload::encode("ABCDEFGHIJKL", "0464", 1, 24);
        let err = Compositor::builtin().compose(&item(), &bad, 1).unwrap_err();
        assert_eq!(err.code(), "InvalidPayload");
    }

    #[test]
    fn test_sequential_barcode_differs_per_copy() {
        assert_eq!(sequential_barcode(&item(), 1), "7896436104641");
        assert_eq!(sequential_barcode(&item(), 2), "7896436104642");
    }

    #[test]
    fn test_unreadable_template_falls_back() {
        let path = std::env::temp_dir().join(format!("etiqueta-missing-{}.zpl", uuid::Uuid::new_v4()));
        let compositor = Compositor::load(Some(&path));
        assert_eq!(compositor.source(), &TemplateSource::Builtin);
        assert!(compositor.compose(&item(), &payload(1), 1).is_ok());
    }

    #[test]
    fn test_shipped_template_uses_every_placeholder() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/label.zpl");
        let compositor = Compositor::load(Some(&path));
        assert_eq!(compositor.source(), &TemplateSource::File(path.clone()));

        let mut used = compositor.template().placeholders();
        used.sort();
        assert_eq!(used, Placeholder::ALL.to_vec());
        let doc = compositor.compose(&item(), &payload(1), 1).unwrap();
        assert!(doc.as_str().contains("^FDQA,789643610064046410000000^FS"));
    }

    #[test]
    fn test_primary_template_loaded() {
        let path = std::env::temp_dir().join(format!("etiqueta-template-{}.zpl", uuid::Uuid::new_v4()));
        fs::write(&path, "^XA^FD{BARCODE}^FS^FD{RFID_DATA}^FS^XZ").unwrap();
        let compositor = Compositor::load(Some(&path));
        fs::remove_file(&path).unwrap();

        assert_eq!(compositor.source(), &TemplateSource::File(path.clone()));
        let doc = compositor.compose(&item(), &payload(1), 1).unwrap();
        assert_eq!(
            doc.as_str(),
            "^XA^FD7896436104641^FS^FD789643610064046410000000^FS^XZ"
        );
    }
}
