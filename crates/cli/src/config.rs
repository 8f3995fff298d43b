use std::path::Path;

use anyhow::{Context, Result};
use fontreq_core::config::load_dotenv;
use fontreq_core::LoaderConfig;
use tracing::debug;

/// Loader settings: a TOML file when given, otherwise `.env` + `FONTS_*` vars.
pub fn load(path: Option<&Path>) -> Result<LoaderConfig> {
    match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            let config: LoaderConfig = toml::from_str(&content)
                .with_context(|| format!("failed to parse config file: {}", path.display()))?;
            debug!(path = %path.display(), "loaded loader config from file");
            Ok(config.normalized())
        }
        None => {
            load_dotenv();
            Ok(LoaderConfig::from_env())
        }
    }
}
