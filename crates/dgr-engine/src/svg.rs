//! SVG artifact type and output cleanup.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{RenderError, RenderErrorKind};

static GOOGLE_FONTS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@import\s+url\([^)]*fonts\.googleapis\.com[^)]*\)\s*;?").unwrap()
});

/// A rendered SVG document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Svg(String);

impl Svg {
    /// Validate and clean raw engine output.
    ///
    /// Strips remote font imports and surrounding whitespace, and rejects
    /// output that contains no `<svg` element.
    ///
    /// # Errors
    ///
    /// Returns [`RenderErrorKind::InvalidOutput`] if `raw` is not an SVG document.
    pub fn parse(raw: &str) -> Result<Self, RenderError> {
        let cleaned = strip_google_fonts_import(raw.trim());
        if !cleaned.contains("<svg") {
            let preview: String = cleaned.chars().take(80).collect();
            return Err(RenderError::new(RenderErrorKind::InvalidOutput(format!(
                "expected <svg> document, got: {preview}"
            ))));
        }
        Ok(Self(cleaned))
    }

    /// SVG markup.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the SVG markup.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Svg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remove Google Fonts `@import` rules from SVG content.
///
/// Some engines embed remote font imports that block offline viewing.
#[must_use]
pub fn strip_google_fonts_import(svg: &str) -> String {
    GOOGLE_FONTS_RE.replace_all(svg, "").into_owned()
}
