//! Sandbox: a directory-rooted allow-list with canonicalization-safe
//! containment checks.
//!
//! Grounded on the teacher's single-root `path_validation::validate_path_under_root`,
//! generalized to a root *set* per the spec's `{allowed-roots, allow-network, workdir}`
//! data model.

use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// A capability-restricted root set. Immutable after construction — safe to
/// share behind `Arc`.
#[derive(Debug, Clone)]
pub struct Sandbox {
    /// Canonicalized absolute roots. Empty means unrestricted (explicit opt-out).
    allowed_roots: Vec<PathBuf>,
    allow_network: bool,
    workdir: Option<PathBuf>,
    profile: OnceLock<String>,
}

impl Sandbox {
    /// Build a sandbox from a set of root paths. Roots that don't exist on
    /// disk are dropped with a warning rather than rejected outright — a
    /// sandbox root is allowed to name a directory that gets created later
    /// is an edge case we intentionally don't support; canonicalization
    /// requires existence.
    pub fn new<I, P>(roots: I, allow_network: bool, workdir: Option<PathBuf>) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let allowed_roots = roots
            .into_iter()
            .filter_map(|p| {
                let p = p.as_ref();
                match p.canonicalize() {
                    Ok(c) => Some(c),
                    Err(e) => {
                        tracing::warn!(path = %p.display(), error = %e, "sandbox root does not exist, skipping");
                        None
                    }
                }
            })
            .collect();
        Self {
            allowed_roots,
            allow_network,
            workdir,
            profile: OnceLock::new(),
        }
    }

    /// An unrestricted sandbox (opt-out). `validate_path` always succeeds.
    pub fn unrestricted() -> Self {
        Self {
            allowed_roots: Vec::new(),
            allow_network: true,
            workdir: None,
            profile: OnceLock::new(),
        }
    }

    pub fn allowed_roots(&self) -> &[PathBuf] {
        &self.allowed_roots
    }

    pub fn allow_network(&self) -> bool {
        self.allow_network
    }

    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    /// True iff `path`'s canonical form equals, or is a path-component
    /// descendant of, some allowed root. Component-wise, not string-prefix —
    /// `/foo/bar` must not match an allowed root `/foo/bar-evil`.
    pub fn is_path_allowed(&self, path: &Path) -> bool {
        if self.allowed_roots.is_empty() {
            return true;
        }
        let canonical = match Self::canonicalize_uncreated(path) {
            Some(c) => c,
            None => return false,
        };
        self.allowed_roots
            .iter()
            .any(|root| canonical.starts_with(root))
    }

    /// Canonicalize a path that may not exist yet (e.g. a write target nested
    /// under directories still to be created): walk up to the nearest
    /// existing ancestor, canonicalize it, then re-attach the remaining
    /// components lexically.
    fn canonicalize_uncreated(path: &Path) -> Option<PathBuf> {
        if let Ok(c) = path.canonicalize() {
            return Some(c);
        }
        let mut remainder = Vec::new();
        let mut current = path;
        loop {
            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    if let Some(name) = current.file_name() {
                        remainder.push(name.to_owned());
                    }
                    if let Ok(canonical_parent) = parent.canonicalize() {
                        let mut result = canonical_parent;
                        for component in remainder.iter().rev() {
                            result.push(component);
                        }
                        return Some(result);
                    }
                    current = parent;
                }
                _ => return None,
            }
        }
    }

    /// Validate a path against the sandbox, producing a human-readable
    /// rejection naming the attempted path and the allowed roots (§7 user-visible behavior).
    pub fn validate_path(&self, path: &Path) -> Result<()> {
        if self.is_path_allowed(path) {
            return Ok(());
        }
        let roots: Vec<String> = self
            .allowed_roots
            .iter()
            .map(|r| r.display().to_string())
            .collect();
        bail!(
            "path outside allowed sandbox roots: {} (allowed: [{}])",
            path.display(),
            roots.join(", ")
        );
    }

    /// Render (and memoize) a per-OS sandbox profile document. On macOS this
    /// is a Seatbelt SBPL string naming each allowed root for
    /// `file-read*`/`file-write*` and conditionally permitting `network*`.
    /// This profile is advisory output only — in-process `validate_path` is
    /// the authoritative enforcement (see spec Non-goals).
    pub fn render_profile(&self) -> &str {
        self.profile.get_or_init(|| self.render_seatbelt_profile())
    }

    fn render_seatbelt_profile(&self) -> String {
        let mut out = String::from("(version 1)\n(deny default)\n");
        for root in &self.allowed_roots {
            out.push_str(&format!(
                "(allow file-read* file-write* (subpath \"{}\"))\n",
                root.display()
            ));
        }
        if self.allow_network {
            out.push_str("(allow network*)\n");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrestricted_allows_anything() {
        let sb = Sandbox::unrestricted();
        assert!(sb.is_path_allowed(Path::new("/etc/passwd")));
    }

    #[test]
    fn descendant_path_is_allowed_but_sibling_with_similar_prefix_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::create_dir(root.join("bar")).unwrap();
        std::fs::create_dir(root.join("bar-evil")).unwrap();
        let sb = Sandbox::new([root.join("bar")], false, None);
        assert!(sb.is_path_allowed(&root.join("bar").join("file.txt")));
        assert!(!sb.is_path_allowed(&root.join("bar-evil").join("file.txt")));
    }

    #[test]
    fn write_target_under_not_yet_created_nested_dirs_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::new([dir.path()], false, None);
        let target = dir.path().join("a").join("b").join("c.txt");
        assert!(sb.is_path_allowed(&target));
    }

    #[test]
    fn validate_path_names_attempted_path_and_roots_on_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::new([dir.path()], false, None);
        let err = sb.validate_path(Path::new("/etc/passwd")).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("/etc/passwd"));
        assert!(msg.contains("allowed"));
    }

    #[test]
    fn seatbelt_profile_names_each_root() {
        let dir = tempfile::tempdir().unwrap();
        let sb = Sandbox::new([dir.path()], false, None);
        let profile = sb.render_profile();
        assert!(profile.contains("deny default"));
        assert!(profile.contains(&dir.path().canonicalize().unwrap().display().to_string()));
    }
}
