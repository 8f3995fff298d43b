//! A [`FontProvider`] backed by font files in a local directory.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, warn};

use fontreq_core::{FontFamilyResult, FontInfo, FontProvider, FontRequest, FontStyle, ProviderError, Typeface};

const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc"];

/// Serves families from font files whose stem starts with the query.
pub struct DirectoryProvider {
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn matching_files(&self, query: &str) -> Vec<PathBuf> {
        let needle = query.to_lowercase();
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|path| path.is_file() && is_font_file(path))
            .filter(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .map(|stem| stem.to_lowercase().starts_with(&needle))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        files
    }
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| FONT_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Guess weight and slant from conventional file name suffixes.
fn describe(path: &Path) -> FontInfo {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let mut info = FontInfo::new(path.display().to_string());
    info.weight = if stem.contains("bold") { 700 } else { 400 };
    info.italic = stem.contains("italic");
    info
}

impl FontProvider for DirectoryProvider {
    fn fetch_fonts(&self, request: &FontRequest) -> Result<FontFamilyResult, ProviderError> {
        if !self.root.is_dir() {
            return Err(ProviderError::NotFound(self.root.display().to_string()));
        }
        let files = self.matching_files(&request.query);
        debug!(query = %request.query, matches = files.len(), "scanned font directory");
        Ok(FontFamilyResult::ok(files.iter().map(|p| describe(p)).collect()))
    }

    fn create_typeface(&self, request: &FontRequest, fonts: &[FontInfo], style: FontStyle) -> Option<Typeface> {
        // Prefer the file closest to the requested style.
        let best = fonts.iter().min_by_key(|font| {
            let weight_miss = (font.weight >= 700) != style.is_bold();
            let slant_miss = font.italic != style.is_italic();
            weight_miss as u8 + slant_miss as u8
        })?;

        match fs::read(&best.uri) {
            Ok(data) if !data.is_empty() => Some(Typeface::new(
                request.query.clone(),
                style,
                vec![best.clone()],
                Bytes::from(data),
            )),
            Ok(_) => {
                warn!(file = %best.uri, "font file is empty");
                None
            }
            Err(e) => {
                warn!(file = %best.uri, error = %e, "failed to read font file");
                None
            }
        }
    }
}
