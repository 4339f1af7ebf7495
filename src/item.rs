//! Label item records and variant-code parsing.

use serde::{Deserialize, Serialize};

use crate::error::EtiquetaError;
use crate::payload::DEFAULT_PO_SEGMENT;

/// Most copies a single item may request in one batch.
pub const MAX_COPIES_PER_ITEM: u32 = 10_000;

fn default_quantity() -> u32 {
    1
}

/// One product row to be printed.
///
/// Records come from an upstream spreadsheet/CSV importer; field names accept
/// both the importer's column headers and snake_case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelItem {
    #[serde(default, alias = "STYLE_NAME")]
    pub style_name: Option<String>,
    /// `<lot>-<name>-<size>-<colorCode>-<locale>`, e.g. `L458-JASM-11.0-SILV-1885`.
    #[serde(default, alias = "VPM")]
    pub variant_code: String,
    #[serde(default, alias = "COLOR")]
    pub color: Option<String>,
    #[serde(default, alias = "SIZE")]
    pub size: Option<String>,
    #[serde(default, alias = "BARCODE")]
    pub barcode: String,
    /// Purchase-order fragment. Derived from the variant lot when absent.
    #[serde(default, alias = "PO")]
    pub po: Option<String>,
    #[serde(default = "default_quantity", alias = "QTY")]
    pub quantity: u32,
}

impl LabelItem {
    pub fn new(variant_code: impl Into<String>, barcode: impl Into<String>) -> Self {
        Self {
            variant_code: variant_code.into(),
            barcode: barcode.into(),
            quantity: 1,
            ..Default::default()
        }
    }

    pub fn style(mut self, style_name: impl Into<String>) -> Self {
        self.style_name = Some(style_name.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }

    pub fn po(mut self, po: impl Into<String>) -> Self {
        self.po = Some(po.into());
        self
    }

    pub fn quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Copies to print; zero counts as one.
    pub fn copies(&self) -> u32 {
        self.quantity.max(1)
    }

    /// [`copies`](Self::copies), or `InvalidQuantity` above [`MAX_COPIES_PER_ITEM`].
    pub fn checked_copies(&self) -> Result<u32, EtiquetaError> {
        let copies = self.copies();
        if copies > MAX_COPIES_PER_ITEM {
            return Err(EtiquetaError::InvalidQuantity(format!(
                "{} copies requested, at most {} per item",
                copies, MAX_COPIES_PER_ITEM
            )));
        }
        Ok(copies)
    }

    pub fn variant(&self) -> VariantCode {
        VariantCode::parse(&self.variant_code)
    }

    /// The explicit PO fragment, else the variant lot without its `L` prefix,
    /// else `"0000"`.
    pub fn po_fragment(&self) -> String {
        if let Some(po) = self.po.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
            return po.to_string();
        }
        let lot = self.variant().lot.replace('L', "");
        if lot.is_empty() {
            DEFAULT_PO_SEGMENT.to_string()
        } else {
            lot
        }
    }

    /// Short human label used in reports, e.g. `"JASMINE (2/3)"`.
    pub fn display_name(&self, copy: u32) -> String {
        let name = self
            .style_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(&self.variant_code);
        format!("{} ({}/{})", name, copy, self.copies())
    }
}

/// Dash-separated segments of a variant code. Missing segments are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantCode {
    pub lot: String,
    pub name: String,
    pub size: String,
    pub color_code: String,
    pub locale: String,
}

/// Locale label used when the variant has no locale segment.
pub const DEFAULT_LOCALE: &str = "000";

impl VariantCode {
    pub fn parse(code: &str) -> Self {
        let mut parts = code.trim().split('-').map(|s| s.trim().to_string());
        Self {
            lot: parts.next().unwrap_or_default(),
            name: parts.next().unwrap_or_default(),
            size: parts.next().unwrap_or_default(),
            color_code: parts.next().unwrap_or_default(),
            locale: parts.next().unwrap_or_default(),
        }
    }

    /// First three characters of the locale segment, or `"000"`.
    pub fn locale_code(&self) -> String {
        if self.locale.is_empty() {
            DEFAULT_LOCALE.to_string()
        } else {
            self.locale.chars().take(3).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_full_variant() {
        let v = VariantCode::parse("L458-JASM-11.0-SILV-1885");
        assert_eq!(v.lot, "L458");
        assert_eq!(v.name, "JASM");
        assert_eq!(v.size, "11.0");
        assert_eq!(v.color_code, "SILV");
        assert_eq!(v.locale, "1885");
        assert_eq!(v.locale_code(), "188");
    }

    #[test]
    fn test_short_variant_defaults_locale() {
        let v = VariantCode::parse("L458-JASM");
        assert_eq!(v.locale_code(), "000");
        assert_eq!(v.size, "");
    }

    #[test]
    fn test_po_fragment_prefers_explicit() {
        let item = LabelItem::new("L458-JASM-11.0-SILV-1885", "789643610064").po("0464");
        assert_eq!(item.po_fragment(), "0464");
    }

    #[test]
    fn test_po_fragment_from_lot() {
        let item = LabelItem::new("L458-JASM-11.0-SILV-1885", "789643610064");
        assert_eq!(item.po_fragment(), "458");
        assert_eq!(LabelItem::new("", "1").po_fragment(), "0000");
    }

    #[test]
    fn test_deserialize_importer_columns() {
        let json = r#"{"STYLE_NAME":"JASMINE","VPM":"L458-JASM-11.0-SILV-1885","BARCODE":"789643610064","QTY":3}"#;
        let item: LabelItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.style_name.as_deref(), Some("JASMINE"));
        assert_eq!(item.quantity, 3);
        assert_eq!(item.color, None);
    }

    #[test]
    fn test_checked_copies_bounds_quantity() {
        let item = LabelItem::new("L458-JASM", "789643610064");
        assert_eq!(item.clone().quantity(MAX_COPIES_PER_ITEM).checked_copies().unwrap(), MAX_COPIES_PER_ITEM);
        let err = item.quantity(3_000_000_000).checked_copies().unwrap_err();
        assert_eq!(err.code(), "InvalidQuantity");
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let item: LabelItem = serde_json::from_str(r#"{"barcode":"1"}"#).unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.quantity(0).copies(), 1);
    }
}
