//! Environment variable key constants and alias chains.
//!
//! `SKILLLITE_*` is always the primary name; aliases exist only where a
//! sibling tool in the ecosystem uses a different convention (e.g. ripgrep's
//! own env vars are never shadowed here — just the names this crate reads).

/// Paths: workspace, output dir, sandbox roots.
pub mod paths {
    pub const SKILLLITE_WORKSPACE: &str = "SKILLLITE_WORKSPACE";
    pub const SKILLLITE_OUTPUT_DIR: &str = "SKILLLITE_OUTPUT_DIR";
    /// Colon-separated list of additional sandbox roots beyond the workspace.
    pub const SKILLLITE_SANDBOX_ROOTS: &str = "SKILLLITE_SANDBOX_ROOTS";
}

/// Observability and logging.
pub mod observability {
    pub const SKILLLITE_QUIET: &str = "SKILLLITE_QUIET";
    pub const QUIET_ALIASES: &[&str] = &[];

    pub const SKILLLITE_LOG_LEVEL: &str = "SKILLLITE_LOG_LEVEL";
    pub const LOG_LEVEL_ALIASES: &[&str] = &[];

    pub const SKILLLITE_LOG_JSON: &str = "SKILLLITE_LOG_JSON";
    pub const LOG_JSON_ALIASES: &[&str] = &[];

    pub const SKILLLITE_AUDIT_LOG: &str = "SKILLLITE_AUDIT_LOG";
    pub const AUDIT_LOG_ALIASES: &[&str] = &[];

    pub const SKILLLITE_SECURITY_EVENTS_LOG: &str = "SKILLLITE_SECURITY_EVENTS_LOG";
}

/// Bash policy engine execution parameters.
pub mod bash {
    pub const SKILLLITE_BASH_TIMEOUT_MS: &str = "SKILLLITE_BASH_TIMEOUT_MS";
    pub const SKILLLITE_BASH_MAX_MEMORY_MB: &str = "SKILLLITE_BASH_MAX_MEMORY_MB";
}

/// Web tools.
pub mod web {
    pub const SKILLLITE_WEBSEARCH_API_KEY: &str = "SKILLLITE_WEBSEARCH_API_KEY";
}
