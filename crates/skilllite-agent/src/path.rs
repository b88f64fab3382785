//! Shared path-resolution and directory-walking helpers used by the tools in
//! [`crate::tools`].
//!
//! Grounded on `skilllite-agent::extensions::builtin::helpers` (directory
//! listing, size formatting) with path resolution itself delegated to
//! `skilllite_core::resolver` and containment to `skilllite_core::Sandbox`.

use anyhow::{bail, Result};
use skilllite_core::{resolver, Sandbox};
use std::path::{Path, PathBuf};

/// Conventional build/vendor directories skipped by directory-walking tools
/// (find, find_references, search_definitions, dependency_graph).
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "vendor",
    "node_modules",
    "__pycache__",
    ".venv",
    ".tox",
    "dist",
    "build",
];

pub fn should_skip_dir(name: &str) -> bool {
    SKIP_DIRS.contains(&name)
}

/// Resolve `path_str` for reading relative to `cwd`, then validate against `sandbox`.
pub fn resolve_read(path_str: &str, cwd: &Path, sandbox: &Sandbox) -> Result<PathBuf> {
    let resolved = resolver::resolve_read(path_str, cwd);
    sandbox.validate_path(&resolved)?;
    Ok(resolved)
}

/// Resolve `path_str` for writing relative to `cwd`, then validate against `sandbox`.
pub fn resolve_write(path_str: &str, cwd: &Path, sandbox: &Sandbox) -> Result<PathBuf> {
    let resolved = resolver::resolve_write(path_str, cwd);
    sandbox.validate_path(&resolved)?;
    Ok(resolved)
}

pub fn require_regular_file(path: &Path, original: &str) -> Result<()> {
    if !path.exists() {
        bail!("file not found: {original}");
    }
    if path.is_dir() {
        bail!("path is a directory, not a file: {original}");
    }
    Ok(())
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a modification time as `YYYY-MM-DD HH:MM:SS`, `-` if unavailable.
pub fn format_mtime(meta: &std::fs::Metadata) -> String {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .and_then(|d| chrono::DateTime::<chrono::Utc>::from_timestamp(d.as_secs() as i64, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Walk `current` relative to `base`, collecting entries formatted as
/// `[d]? SIZE  YYYY-MM-DD HH:MM:SS  NAME`. Hidden top-level dotfiles are
/// listed but not descended into unless `recursive`.
pub fn list_dir(
    base: &Path,
    current: &Path,
    recursive: bool,
    entries: &mut Vec<String>,
) -> Result<()> {
    let mut items: Vec<_> = std::fs::read_dir(current)?.filter_map(|e| e.ok()).collect();
    items.sort_by_key(|e| e.file_name());

    for entry in items {
        let name = entry.file_name().to_string_lossy().to_string();
        let rel = entry
            .path()
            .strip_prefix(base)
            .unwrap_or(&entry.path())
            .to_string_lossy()
            .to_string();
        let is_dir = entry.path().is_dir();
        let meta = entry.metadata().ok();
        let size = meta.as_ref().map(|m| m.len()).unwrap_or(0);
        let modified = meta.as_ref().map(format_mtime).unwrap_or_else(|| "-".to_string());
        let flag = if is_dir { "d" } else { " " };
        entries.push(format!("{flag} {size:>10}  {modified}  {rel}"));

        if is_dir && recursive && !should_skip_dir(&name) {
            list_dir(base, &entry.path(), true, entries)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_dirs_matches_spec_set() {
        assert!(should_skip_dir(".git"));
        assert!(should_skip_dir("vendor"));
        assert!(should_skip_dir("node_modules"));
        assert!(!should_skip_dir("src"));
        assert!(!should_skip_dir("target"));
    }

    #[test]
    fn resolve_read_rejects_path_outside_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let err = resolve_read("/etc/passwd", dir.path(), &sandbox).unwrap_err();
        assert!(err.to_string().contains("outside allowed sandbox roots"));
    }
}
