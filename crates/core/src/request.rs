use std::fmt;

use serde::{Deserialize, Serialize};

/// A query for a font family served by a named font provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FontRequest {
    pub provider_authority: String,
    pub provider_package: String,
    pub query: String,
    /// Signing certificates the provider is expected to present.
    #[serde(default)]
    pub certificates: Vec<Vec<u8>>,
}

impl FontRequest {
    pub fn new(
        provider_authority: impl Into<String>,
        provider_package: impl Into<String>,
        query: impl Into<String>,
    ) -> Self {
        Self {
            provider_authority: provider_authority.into(),
            provider_package: provider_package.into(),
            query: query.into(),
            certificates: Vec::new(),
        }
    }

    pub fn with_certificates(mut self, certificates: Vec<Vec<u8>>) -> Self {
        self.certificates = certificates;
        self
    }

    /// Identifier of the request without style: `{authority}-{package}-{query}`.
    ///
    /// `-` and `\` inside a field are backslash-escaped, so distinct requests
    /// never share an identifier.
    pub fn identifier(&self) -> String {
        format!(
            "{}-{}-{}",
            escape_field(&self.provider_authority),
            escape_field(&self.provider_package),
            escape_field(&self.query)
        )
    }
}

fn escape_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for c in field.chars() {
        if c == '-' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Style variant a typeface is materialized with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontStyle {
    #[default]
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub fn code(self) -> u8 {
        match self {
            FontStyle::Normal => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::BoldItalic => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(FontStyle::Normal),
            1 => Some(FontStyle::Bold),
            2 => Some(FontStyle::Italic),
            3 => Some(FontStyle::BoldItalic),
            _ => None,
        }
    }

    pub fn is_bold(self) -> bool {
        matches!(self, FontStyle::Bold | FontStyle::BoldItalic)
    }

    pub fn is_italic(self) -> bool {
        matches!(self, FontStyle::Italic | FontStyle::BoldItalic)
    }
}

impl std::str::FromStr for FontStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" | "regular" => Ok(FontStyle::Normal),
            "bold" => Ok(FontStyle::Bold),
            "italic" => Ok(FontStyle::Italic),
            "bold_italic" => Ok(FontStyle::BoldItalic),
            other => Err(format!("unknown font style: {other}")),
        }
    }
}

/// Cache and coalescing identity of a `(request, style)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestKey(String);

impl RequestKey {
    pub fn new(request: &FontRequest, style: FontStyle) -> Self {
        Self(format!("{}-{}", request.identifier(), style.code()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
