use crate::error::ProviderError;
use crate::request::{FontRequest, FontStyle};
use crate::typeface::{FontFamilyResult, FontInfo, Typeface};

/// The external font backend.
///
/// Both calls may be slow (I/O or IPC bound) and are always invoked without
/// any loader lock held. Implementations report outcomes through their return
/// values; the loader classifies them into [`crate::LoadError`].
pub trait FontProvider: Send + Sync {
    /// Query the provider for the fonts of a family.
    fn fetch_fonts(&self, request: &FontRequest) -> Result<FontFamilyResult, ProviderError>;

    /// Materialize a typeface from fonts previously returned by `fetch_fonts`.
    /// `None` means the font data could not be read or parsed.
    fn create_typeface(&self, request: &FontRequest, fonts: &[FontInfo], style: FontStyle) -> Option<Typeface>;
}
