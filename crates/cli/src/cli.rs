use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use fontreq_core::FontStyle;

/// Resolve font requests against a local font directory.
///
/// Every query goes through the caching, coalescing loader so repeated
/// queries show cache hits in the final stats line.
#[derive(Parser, Debug)]
#[command(name = "fontreq", version, about)]
pub struct CliArgs {
    /// Directory scanned for .ttf/.otf/.ttc files
    #[arg(long, env = "FONTS_DIR", default_value = "fonts")]
    pub font_dir: PathBuf,

    /// Family query; repeat to load several families
    #[arg(long = "query", short = 'q', required = true)]
    pub queries: Vec<String>,

    /// Style variant: normal, bold, italic, bold-italic
    #[arg(long, default_value = "normal")]
    pub style: FontStyle,

    /// Load mode
    #[arg(long, value_enum, default_value_t = LoadMode::Blocking)]
    pub mode: LoadMode,

    /// Blocking timeout in milliseconds; 0 waits forever on the calling thread
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Issue every query this many times
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,

    /// Provider authority recorded in the request identity
    #[arg(long, default_value = "local.fonts")]
    pub authority: String,

    /// Provider package recorded in the request identity
    #[arg(long, default_value = "local.fonts.directory")]
    pub package: String,

    /// Optional TOML file with loader settings (overrides FONTS_* env vars)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LoadMode {
    Blocking,
    Async,
}
