//! Domain-grouped configuration structs, loaded from the environment.

use super::env_keys::{bash, observability as obv_keys, paths, web};
use super::loader::{env_bool, env_optional, env_or};

/// Workspace and output-directory configuration.
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub workspace: String,
    pub output_dir: Option<String>,
    /// Additional sandbox roots beyond `workspace`, from `SKILLLITE_SANDBOX_ROOTS` (`:`-separated).
    pub extra_sandbox_roots: Vec<String>,
}

impl PathsConfig {
    pub fn from_env() -> Self {
        super::loader::load_dotenv();
        let workspace = env_optional(paths::SKILLLITE_WORKSPACE, &[]).unwrap_or_else(|| {
            std::env::current_dir()
                .unwrap_or_else(|_| std::path::PathBuf::from("."))
                .to_string_lossy()
                .to_string()
        });
        let output_dir = env_optional(paths::SKILLLITE_OUTPUT_DIR, &[]);
        let extra_sandbox_roots = env_optional(paths::SKILLLITE_SANDBOX_ROOTS, &[])
            .map(|s| s.split(':').filter(|p| !p.is_empty()).map(str::to_string).collect())
            .unwrap_or_default();
        Self {
            workspace,
            output_dir,
            extra_sandbox_roots,
        }
    }
}

/// Observability configuration: quiet, log level, log format, audit log path.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
    pub security_events_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            super::loader::load_dotenv();
            Self {
                quiet: env_bool(obv_keys::SKILLLITE_QUIET, obv_keys::QUIET_ALIASES, false),
                log_level: env_or(obv_keys::SKILLLITE_LOG_LEVEL, obv_keys::LOG_LEVEL_ALIASES, || {
                    "skilllite=info".to_string()
                }),
                log_json: env_bool(obv_keys::SKILLLITE_LOG_JSON, obv_keys::LOG_JSON_ALIASES, false),
                audit_log: env_optional(obv_keys::SKILLLITE_AUDIT_LOG, obv_keys::AUDIT_LOG_ALIASES),
                security_events_log: env_optional(obv_keys::SKILLLITE_SECURITY_EVENTS_LOG, &[]),
            }
        })
    }
}

/// Bash Policy Engine execution parameters (§4.3 Execution).
#[derive(Debug, Clone, Copy)]
pub struct BashConfig {
    pub timeout_ms: u64,
    pub max_memory_mb: u64,
}

impl Default for BashConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl BashConfig {
    pub const DEFAULT_TIMEOUT_MS: u64 = 120_000;
    pub const DEFAULT_MAX_MEMORY_MB: u64 = 512;

    pub fn from_env() -> Self {
        let timeout_ms = env_optional(bash::SKILLLITE_BASH_TIMEOUT_MS, &[])
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_TIMEOUT_MS);
        let max_memory_mb = env_optional(bash::SKILLLITE_BASH_MAX_MEMORY_MB, &[])
            .and_then(|s| s.parse().ok())
            .unwrap_or(Self::DEFAULT_MAX_MEMORY_MB);
        Self {
            timeout_ms,
            max_memory_mb,
        }
    }
}

/// Web-search credential configuration.
#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    pub api_key: Option<String>,
}

impl WebSearchConfig {
    pub fn from_env() -> Self {
        Self {
            api_key: env_optional(web::SKILLLITE_WEBSEARCH_API_KEY, &[]),
        }
    }
}
