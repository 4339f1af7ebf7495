//! # Label Documents
//!
//! A [`LabelDocument`] is the printer-markup text for one physical copy.
//!
//! ## Module Structure
//!
//! - [`template`]: placeholder parsing and single-pass rendering
//! - [`compose`]: the compositor that fills a template from an item and payload

pub mod compose;
pub mod template;

use std::fmt;

pub use compose::{Compositor, TemplateSource};
pub use template::{Placeholder, Template};

/// Markup for one label. Never re-rendered once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDocument(String);

impl LabelDocument {
    pub fn new(body: impl Into<String>) -> Self {
        Self(body.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for LabelDocument {
    fn from(body: String) -> Self {
        Self(body)
    }
}

impl From<&str> for LabelDocument {
    fn from(body: &str) -> Self {
        Self(body.to_string())
    }
}

impl fmt::Display for LabelDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
