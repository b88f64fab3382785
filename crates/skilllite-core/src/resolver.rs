//! Path Resolver: Unicode-normalized path resolution with on-disk existence
//! probing across a handful of candidate encodings.
//!
//! Models tend to produce typographic spaces and smart quotes; macOS APFS
//! stores filenames NFD-normalized while Linux ext4 stores exactly what was
//! written. Probing a few cheap variants is cheaper than round-tripping
//! through a directory listing to find the real name.

use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Unicode codepoints that render as whitespace but aren't ASCII space.
/// NBSP, the general punctuation space run, narrow no-break space,
/// medium mathematical space, and ideographic space.
const UNICODE_SPACES: &[char] = &[
    '\u{00A0}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}', '\u{2004}', '\u{2005}',
    '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}', '\u{202F}', '\u{205F}',
    '\u{3000}',
];

const RIGHT_SINGLE_QUOTE: char = '\u{2019}';
const NARROW_NBSP: char = '\u{202F}';

/// Strip a leading `@` sigil, expand a leading `~`, and fold Unicode space
/// variants to ASCII space. Idempotent: `expand(expand(p)) == expand(p)`.
pub fn expand(input: &str) -> String {
    let stripped = input.strip_prefix('@').unwrap_or(input);
    let home_expanded = if let Some(rest) = stripped.strip_prefix('~') {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        if rest.is_empty() {
            home.to_string_lossy().to_string()
        } else if let Some(rest) = rest.strip_prefix('/') {
            home.join(rest).to_string_lossy().to_string()
        } else {
            // `~foo` (other-user home) — leave untouched, not ours to expand.
            stripped.to_string()
        }
    } else {
        stripped.to_string()
    };
    home_expanded.replace(|c| UNICODE_SPACES.contains(&c), " ")
}

/// Lexically clean a path: resolve `.`/`..` components without touching the
/// filesystem (no symlink resolution, no existence check).
fn clean(path: &Path) -> PathBuf {
    use std::path::Component;
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if !matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.push("..");
                } else {
                    out.pop();
                }
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn join_if_relative(expanded: &str, cwd: &Path) -> PathBuf {
    let p = Path::new(expanded);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        cwd.join(p)
    }
}

/// Resolve a path for reading: try up to five candidate encodings in order
/// and return the first that exists on disk. If none exist, return
/// candidate #1 (the direct resolution) — never fail eagerly, let the
/// eventual open() surface "not found".
pub fn resolve_read(input: &str, cwd: &Path) -> PathBuf {
    let candidate1 = clean(&join_if_relative(&expand(input), cwd));
    if candidate1.exists() {
        return candidate1;
    }

    let narrow_swapped = input.replace(NARROW_NBSP, " ");
    let candidate2 = clean(&join_if_relative(&expand(&narrow_swapped), cwd));
    if candidate2.exists() {
        return candidate2;
    }

    let nfd: String = expand(input).nfd().collect();
    let candidate3 = clean(&join_if_relative(&nfd, cwd));
    if candidate3.exists() {
        return candidate3;
    }

    let quote_swapped = input.replace(RIGHT_SINGLE_QUOTE, "'");
    let candidate4 = clean(&join_if_relative(&expand(&quote_swapped), cwd));
    if candidate4.exists() {
        return candidate4;
    }

    let candidate5: String = expand(&quote_swapped).nfd().collect();
    let candidate5 = clean(&join_if_relative(&candidate5, cwd));
    if candidate5.exists() {
        return candidate5;
    }

    candidate1
}

/// Resolve a path for writing: expand, join-if-relative, clean. No
/// existence probing — a write path must be taken literally.
pub fn resolve_write(input: &str, cwd: &Path) -> PathBuf {
    clean(&join_if_relative(&expand(input), cwd))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_is_idempotent() {
        let p = "@foo\u{00A0}bar";
        assert_eq!(expand(&expand(p)), expand(p));
    }

    #[test]
    fn expand_strips_at_sigil_and_folds_spaces() {
        assert_eq!(expand("@a\u{3000}b"), "a b");
    }

    #[test]
    fn resolve_read_falls_back_to_candidate_one_when_nothing_exists() {
        let cwd = Path::new("/nonexistent-root-xyz");
        let resolved = resolve_read("missing.txt", cwd);
        assert_eq!(resolved, cwd.join("missing.txt"));
    }

    #[test]
    fn resolve_read_finds_existing_file_via_narrow_nbsp_variant() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("10 AM.txt"), b"hi").unwrap();
        let resolved = resolve_read("10\u{202F}AM.txt", dir.path());
        assert_eq!(resolved, dir.path().join("10 AM.txt"));
    }

    #[test]
    fn resolve_write_cleans_dot_dot_without_touching_disk() {
        let cwd = Path::new("/a/b");
        let resolved = resolve_write("../c/d.txt", cwd);
        assert_eq!(resolved, PathBuf::from("/a/c/d.txt"));
    }
}
