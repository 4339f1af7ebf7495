//! # Printer Configuration
//!
//! This module defines hardware specifications for supported label printers.
//!
//! ## Supported Printers
//!
//! | Model | Label (dots) | Resolution | RFID |
//! |-------|--------------|------------|------|
//! | ZD621R | 831 x 320 | 203 DPI | UHF encoder |
//!
//! ## Usage
//!
//! ```
//! use etiqueta::printer::PrinterConfig;
//!
//! let config = PrinterConfig::ZD621R;
//! assert_eq!(config.label_setup(), "^PW831\n^LL320");
//! ```

/// # Printer Configuration
///
/// Defines the label geometry and spooler name of a label printer.
#[derive(Debug, Clone, Copy)]
pub struct PrinterConfig {
    /// Name the OS print spooler knows the printer by
    pub driver_name: &'static str,

    /// Print width in dots (`^PW`)
    pub width_dots: u16,

    /// Label length in dots (`^LL`)
    pub length_dots: u16,
}

impl PrinterConfig {
    /// # Zebra ZD621R Configuration
    ///
    /// 4-inch desktop thermal transfer printer with UHF RFID encoder.
    ///
    /// | Property | Value |
    /// |----------|-------|
    /// | Resolution | 203 DPI |
    /// | Label | 831 x 320 dots (about 104 x 40 mm) |
    /// | Interfaces | USB / Serial / Ethernet |
    /// | Language | ZPL II |
    pub const ZD621R: Self = Self {
        driver_name: "ZDesigner ZD621R-203dpi ZPL",
        width_dots: 831,
        length_dots: 320,
    };

    /// `^PW` / `^LL` commands sizing a format to this label.
    pub fn label_setup(&self) -> String {
        format!("^PW{}\n^LL{}", self.width_dots, self.length_dots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zd621r_dimensions() {
        let config = PrinterConfig::ZD621R;
        assert_eq!(config.width_dots, 831);
        assert_eq!(config.length_dots, 320);
    }

    #[test]
    fn test_label_setup() {
        assert_eq!(PrinterConfig::ZD621R.label_setup(), "^PW831\n^LL320");
    }

    #[test]
    fn test_driver_name() {
        assert_eq!(PrinterConfig::ZD621R.driver_name, "ZDesigner ZD621R-203dpi ZPL");
    }
}
