//! Runs a provider and maps its outcome onto [`LoadError`].

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, warn};

use fontreq_core::typeface::result_code;
use fontreq_core::{
    FamilyStatus, FontFamilyResult, FontProvider, FontRequest, FontStyle, LoadError, ProviderError,
};

use crate::loader::LoadResult;

/// Resolve `request` through `provider`. Never panics: a panicking provider
/// is reported as [`LoadError::LoadFailed`].
pub fn resolve(provider: &dyn FontProvider, request: &FontRequest, style: FontStyle) -> LoadResult {
    match panic::catch_unwind(AssertUnwindSafe(|| resolve_inner(provider, request, style))) {
        Ok(result) => result,
        Err(_) => {
            warn!(query = %request.query, "font provider panicked");
            Err(LoadError::LoadFailed)
        }
    }
}

fn resolve_inner(provider: &dyn FontProvider, request: &FontRequest, style: FontStyle) -> LoadResult {
    let family = provider.fetch_fonts(request).map_err(classify_provider_error)?;
    check_family(&family)?;

    provider
        .create_typeface(request, &family.fonts, style)
        .ok_or_else(|| {
            debug!(query = %request.query, "provider returned fonts that could not be materialized");
            LoadError::LoadFailed
        })
}

fn classify_provider_error(e: ProviderError) -> LoadError {
    match e {
        ProviderError::NotFound(name) => {
            debug!(provider = %name, "font provider not found");
            LoadError::ProviderUnavailable
        }
        other => {
            debug!(error = %other, "font provider failed");
            LoadError::LoadFailed
        }
    }
}

/// Validate a provider response before any typeface is built.
pub fn check_family(family: &FontFamilyResult) -> Result<(), LoadError> {
    match family.status {
        FamilyStatus::Ok => {}
        FamilyStatus::WrongCertificates => return Err(LoadError::CertificateMismatch),
        FamilyStatus::UnexpectedDataProvided | FamilyStatus::Other(_) => {
            return Err(LoadError::LoadFailed)
        }
    }

    if family.fonts.is_empty() {
        return Err(LoadError::ResourceNotFound);
    }

    // Every entry must be usable; the first failure decides.
    match family.fonts.iter().find(|font| !font.is_ok()) {
        None => Ok(()),
        Some(font) => Err(classify_result_code(font.result_code)),
    }
}

/// Map a per-font result code. Negative codes are reserved for internal
/// provider errors.
pub fn classify_result_code(code: i32) -> LoadError {
    match code {
        result_code::FONT_NOT_FOUND => LoadError::ResourceNotFound,
        result_code::FONT_UNAVAILABLE => LoadError::FontUnavailable,
        result_code::MALFORMED_QUERY => LoadError::MalformedQuery,
        _ => LoadError::LoadFailed,
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use fontreq_core::{FontInfo, Typeface};

    use super::*;

    struct Canned {
        family: fn() -> Result<FontFamilyResult, ProviderError>,
        builds: bool,
    }

    impl FontProvider for Canned {
        fn fetch_fonts(&self, _request: &FontRequest) -> Result<FontFamilyResult, ProviderError> {
            (self.family)()
        }

        fn create_typeface(&self, request: &FontRequest, fonts: &[FontInfo], style: FontStyle) -> Option<Typeface> {
            self.builds
                .then(|| Typeface::new(request.query.clone(), style, fonts.to_vec(), Bytes::new()))
        }
    }

    fn run(family: fn() -> Result<FontFamilyResult, ProviderError>, builds: bool) -> LoadResult {
        let request = FontRequest::new("auth", "pkg", "Roboto");
        resolve(&Canned { family, builds }, &request, FontStyle::Bold)
    }

    fn one_font(code: i32) -> Result<FontFamilyResult, ProviderError> {
        Ok(FontFamilyResult::ok(vec![FontInfo::new("a.ttf").with_result_code(code)]))
    }

    #[test]
    fn success_builds_typeface() {
        let typeface = run(|| one_font(0), true).unwrap();
        assert_eq!(typeface.family(), "Roboto");
        assert_eq!(typeface.style(), FontStyle::Bold);
        assert_eq!(typeface.sources().len(), 1);
    }

    #[test]
    fn missing_provider_is_unavailable() {
        let err = run(|| Err(ProviderError::NotFound("pkg".into())), true).unwrap_err();
        assert_eq!(err, LoadError::ProviderUnavailable);
    }

    #[test]
    fn other_provider_errors_are_load_failures() {
        let err = run(|| Err(ProviderError::Other("ipc".into())), true).unwrap_err();
        assert_eq!(err, LoadError::LoadFailed);
    }

    #[test]
    fn family_status_mapping() {
        assert_eq!(
            run(|| Ok(FontFamilyResult::failed(FamilyStatus::WrongCertificates)), true).unwrap_err(),
            LoadError::CertificateMismatch
        );
        assert_eq!(
            run(|| Ok(FontFamilyResult::failed(FamilyStatus::UnexpectedDataProvided)), true).unwrap_err(),
            LoadError::LoadFailed
        );
        assert_eq!(
            run(|| Ok(FontFamilyResult::failed(FamilyStatus::Other(99))), true).unwrap_err(),
            LoadError::LoadFailed
        );
    }

    #[test]
    fn empty_font_list_is_not_found() {
        let err = run(|| Ok(FontFamilyResult::ok(vec![])), true).unwrap_err();
        assert_eq!(err, LoadError::ResourceNotFound);
    }

    #[test]
    fn per_font_result_codes() {
        assert_eq!(run(|| one_font(1), true).unwrap_err(), LoadError::ResourceNotFound);
        assert_eq!(run(|| one_font(2), true).unwrap_err(), LoadError::FontUnavailable);
        assert_eq!(run(|| one_font(3), true).unwrap_err(), LoadError::MalformedQuery);
        assert_eq!(run(|| one_font(-7), true).unwrap_err(), LoadError::LoadFailed);
        assert_eq!(run(|| one_font(42), true).unwrap_err(), LoadError::LoadFailed);
    }

    #[test]
    fn first_failing_font_decides() {
        let err = run(
            || {
                Ok(FontFamilyResult::ok(vec![
                    FontInfo::new("ok.ttf"),
                    FontInfo::new("gone.ttf").with_result_code(2),
                    FontInfo::new("bad.ttf").with_result_code(-1),
                ]))
            },
            true,
        )
        .unwrap_err();
        assert_eq!(err, LoadError::FontUnavailable);
    }

    #[test]
    fn unmaterializable_fonts_fail_to_load() {
        assert_eq!(run(|| one_font(0), false).unwrap_err(), LoadError::LoadFailed);
    }

    #[test]
    fn panicking_provider_is_contained() {
        let err = run(|| panic!("provider bug"), true).unwrap_err();
        assert_eq!(err, LoadError::LoadFailed);
    }
}
