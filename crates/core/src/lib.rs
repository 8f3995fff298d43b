pub mod config;
pub mod error;
pub mod provider;
pub mod request;
pub mod typeface;

pub use config::LoaderConfig;
pub use error::*;
pub use provider::FontProvider;
pub use request::*;
pub use typeface::*;
