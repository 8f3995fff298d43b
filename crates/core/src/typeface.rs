use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::request::FontStyle;

/// Per-font result codes reported by a provider.
pub mod result_code {
    pub const OK: i32 = 0;
    pub const FONT_NOT_FOUND: i32 = 1;
    pub const FONT_UNAVAILABLE: i32 = 2;
    pub const MALFORMED_QUERY: i32 = 3;
}

/// One font file a provider returned for a family query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontInfo {
    pub uri: String,
    #[serde(default)]
    pub ttc_index: u32,
    #[serde(default = "default_weight")]
    pub weight: u16,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub result_code: i32,
}

fn default_weight() -> u16 {
    400
}

impl FontInfo {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ttc_index: 0,
            weight: default_weight(),
            italic: false,
            result_code: result_code::OK,
        }
    }

    pub fn with_result_code(mut self, code: i32) -> Self {
        self.result_code = code;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.result_code == result_code::OK
    }
}

/// Overall status of a provider query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FamilyStatus {
    Ok,
    WrongCertificates,
    UnexpectedDataProvided,
    Other(i32),
}

/// What a provider returned for a family query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontFamilyResult {
    pub status: FamilyStatus,
    pub fonts: Vec<FontInfo>,
}

impl FontFamilyResult {
    pub fn ok(fonts: Vec<FontInfo>) -> Self {
        Self {
            status: FamilyStatus::Ok,
            fonts,
        }
    }

    pub fn failed(status: FamilyStatus) -> Self {
        Self {
            status,
            fonts: Vec::new(),
        }
    }
}

/// A materialized, renderable font. Cheap to clone; clones share storage.
#[derive(Clone)]
pub struct Typeface {
    inner: Arc<TypefaceInner>,
}

struct TypefaceInner {
    family: String,
    style: FontStyle,
    sources: Vec<FontInfo>,
    data: Bytes,
}

impl Typeface {
    pub fn new(family: impl Into<String>, style: FontStyle, sources: Vec<FontInfo>, data: Bytes) -> Self {
        Self {
            inner: Arc::new(TypefaceInner {
                family: family.into(),
                style,
                sources,
                data,
            }),
        }
    }

    pub fn family(&self) -> &str {
        &self.inner.family
    }

    pub fn style(&self) -> FontStyle {
        self.inner.style
    }

    pub fn sources(&self) -> &[FontInfo] {
        &self.inner.sources
    }

    pub fn data(&self) -> &Bytes {
        &self.inner.data
    }

    /// True when both handles refer to the same materialized typeface.
    pub fn ptr_eq(&self, other: &Typeface) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Typeface")
            .field("family", &self.inner.family)
            .field("style", &self.inner.style)
            .field("sources", &self.inner.sources.len())
            .field("bytes", &self.inner.data.len())
            .finish()
    }
}
