//! Unified configuration layer.
//!
//! All environment-variable reads funnel through this module; callers access
//! structured config rather than calling `std::env::var` directly.
//!
//! - `loader`: `env_or`/`env_optional`/`env_bool` helpers
//! - `schema`: `PathsConfig`, `ObservabilityConfig`, `BashConfig`, `WebSearchConfig`
//! - `env_keys`: the env-var name constants

pub mod env_keys;
pub mod loader;
pub mod schema;

pub use loader::{env_bool, env_optional, env_or, load_dotenv};
pub use schema::{BashConfig, ObservabilityConfig, PathsConfig, WebSearchConfig};
