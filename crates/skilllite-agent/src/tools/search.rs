//! grep, find, find_references, search_definitions, dependency_graph.
//!
//! Grounded on `skilllite-agent::extensions::builtin::file_ops::execute_grep_files`
//! (glob/walk shape) and `skilllite-agent::extensions::builtin::helpers::list_dir_impl`
//! (skip-dir walk), generalized to the richer multi-mode grep and the
//! language-keyed definition regexes the spec calls for.

use crate::path::{self, should_skip_dir};
use crate::registry::ToolRegistry;
use crate::types::ToolResult;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Value};
use skilllite_core::params;
use skilllite_core::Sandbox;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MAX_GREP_MATCHES: usize = 10_000;
const MAX_FIND_RESULTS: usize = 200;

fn walk_files(root: &Path, out: &mut Vec<PathBuf>) {
    let Ok(read_dir) = std::fs::read_dir(root) else {
        return;
    };
    let mut entries: Vec<_> = read_dir.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let p = entry.path();
        let name = entry.file_name().to_string_lossy().to_string();
        if p.is_dir() {
            if !should_skip_dir(&name) {
                walk_files(&p, out);
            }
        } else {
            out.push(p);
        }
    }
}

fn glob_to_regex(glob: &str) -> Regex {
    let mut pattern = String::from("^");
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            '.' | '(' | ')' | '+' | '|' | '^' | '$' | '[' | ']' | '{' | '}' | '\\' => {
                pattern.push('\\');
                pattern.push(c);
            }
            other => pattern.push(other),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).unwrap_or_else(|_| Regex::new("^$").unwrap())
}

const TYPE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("go", &["go"]),
    ("py", &["py"]),
    ("js", &["js", "jsx", "mjs"]),
    ("ts", &["ts", "tsx"]),
    ("rust", &["rs"]),
    ("java", &["java"]),
    ("rb", &["rb"]),
    ("c", &["c", "h"]),
    ("cpp", &["cpp", "cc", "cxx", "hpp", "hxx", "h"]),
    ("css", &["css"]),
    ("html", &["html", "htm"]),
    ("json", &["json"]),
    ("yaml", &["yaml", "yml"]),
    ("toml", &["toml"]),
    ("md", &["md", "markdown"]),
    ("sh", &["sh", "bash"]),
    ("sql", &["sql"]),
    ("xml", &["xml"]),
    ("tf", &["tf"]),
    ("swift", &["swift"]),
    ("kotlin", &["kt", "kts"]),
];

fn type_matches(path: &Path, type_filter: &str) -> bool {
    let Some(exts) = TYPE_EXTENSIONS.iter().find(|(k, _)| *k == type_filter).map(|(_, v)| *v) else {
        return true;
    };
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    exts.contains(&ext)
}

fn grep_file(path: &Path, re: &Regex, context_before: usize, context_after: usize) -> Vec<(usize, Vec<String>)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let mut groups = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        if re.is_match(lines[i]) {
            let start = i.saturating_sub(context_before);
            let end = (i + context_after + 1).min(lines.len());
            let group: Vec<String> = (start..end)
                .map(|idx| {
                    let sep = if idx == i { ':' } else { '-' };
                    format!("{}{sep}{}", idx + 1, lines[idx])
                })
                .collect();
            groups.push((i + 1, group));
            i = end;
        } else {
            i += 1;
        }
    }
    groups
}

/// Strip a leading `N:` or `N-` line-number prefix (as produced by
/// [`grep_file`]), leaving the bare line content.
fn strip_line_number_prefix(line: &str) -> &str {
    match line.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => &line[pos + 1..],
        None => line,
    }
}

fn do_grep(params: &Value, cwd: &Path, sandbox: &Sandbox, has_rg: bool) -> anyhow::Result<ToolResult> {
    let pattern = params::require_string(params, "pattern").map_err(anyhow::Error::msg)?;
    let path_str = params::string_optional(params, "path", ".");
    let multiline = params::bool_opt(params, "multiline", false);
    let ignore_case = params::bool_opt(params, "-i", false);
    let output_mode = params::string_optional(params, "output_mode", "content");
    let show_line_numbers = params::bool_opt(params, "-n", true);
    let context_a = params::int(params, "-A", 0).max(0) as usize;
    let context_b = params::int(params, "-B", 0).max(0) as usize;
    let context_c = params::int(params, "-C", 0).max(0) as usize;
    let (before, after) = if context_c > 0 { (context_c, context_c) } else { (context_b, context_a) };
    let type_filter = params::string_optional(params, "type", "");
    let glob_filter = params::string_optional(params, "glob", "");
    let offset = params::int(params, "offset", 0).max(0) as usize;
    let head_limit = params::int(params, "head_limit", 0).max(0) as usize;

    let root = path::resolve_read(&path_str, cwd, sandbox)?;
    let _ = has_rg; // external rg invocation is an optional fast path; the walker below is always correct.

    let re = RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .dot_matches_new_line(multiline)
        .build()?;

    let mut files = Vec::new();
    if root.is_dir() {
        walk_files(&root, &mut files);
    } else {
        files.push(root.clone());
    }
    if !type_filter.is_empty() {
        files.retain(|f| type_matches(f, &type_filter));
    }
    if !glob_filter.is_empty() {
        let glob_re = glob_to_regex(&glob_filter);
        files.retain(|f| {
            f.file_name()
                .map(|n| glob_re.is_match(&n.to_string_lossy()))
                .unwrap_or(false)
        });
    }

    let mut total_matches = 0usize;
    let mut truncated = false;

    match output_mode.as_str() {
        "count" => {
            let mut lines = Vec::new();
            for f in &files {
                let Ok(content) = std::fs::read_to_string(f) else { continue };
                let count = content.lines().filter(|l| re.is_match(l)).count();
                if count > 0 {
                    lines.push(format!("{}: {count}", f.display()));
                }
            }
            Ok(ToolResult::ok(lines.join("\n")))
        }
        "files_with_matches" => {
            let mut matches = Vec::new();
            for f in &files {
                let Ok(content) = std::fs::read_to_string(f) else { continue };
                if content.lines().any(|l| re.is_match(l)) {
                    matches.push(f.display().to_string());
                }
            }
            let paged: Vec<_> = matches.into_iter().skip(offset).take(if head_limit > 0 { head_limit } else { usize::MAX }).collect();
            Ok(ToolResult::ok(paged.join("\n")))
        }
        _ => {
            let mut entries: Vec<String> = Vec::new();
            'outer: for f in &files {
                for (line_no, group) in grep_file(f, &re, before, after) {
                    total_matches += 1;
                    if total_matches > MAX_GREP_MATCHES {
                        truncated = true;
                        break 'outer;
                    }
                    let body = if show_line_numbers {
                        group.join("\n")
                    } else {
                        group.iter().map(|l| strip_line_number_prefix(l).to_string()).collect::<Vec<_>>().join("\n")
                    };
                    entries.push(format!("{}:{line_no}\n{body}", f.display()));
                }
            }
            let paged: Vec<_> = entries.into_iter().skip(offset).take(if head_limit > 0 { head_limit } else { usize::MAX }).collect();
            let mut out = paged.join("\n--\n");
            if truncated {
                out.push_str(&format!("\n... [truncated: {MAX_GREP_MATCHES} matches shown, limit reached]\n"));
            }
            Ok(ToolResult::ok(out))
        }
    }
}

fn doublestar_match(rel: &str, pattern: &str) -> bool {
    if let Some((prefix, suffix)) = pattern.split_once("**") {
        let prefix = prefix.trim_end_matches('/');
        let suffix = suffix.trim_start_matches('/');
        let prefix_ok = prefix.is_empty() || rel.starts_with(prefix);
        let suffix_ok = if suffix.contains('/') {
            rel.ends_with(suffix)
        } else if suffix.is_empty() {
            true
        } else {
            Path::new(rel).file_name().map(|n| n.to_string_lossy() == suffix).unwrap_or(false)
        };
        prefix_ok && suffix_ok
    } else {
        false
    }
}

fn do_find(params: &Value, cwd: &Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let pattern = params::require_string(params, "pattern").map_err(anyhow::Error::msg)?;
    let path_str = params::string_optional(params, "path", ".");
    let head_limit = params::int(params, "head_limit", 0).max(0) as usize;

    let root = path::resolve_read(&path_str, cwd, sandbox)?;
    let mut files = Vec::new();
    walk_files(&root, &mut files);

    let matches: Vec<PathBuf> = if pattern.contains("**") {
        files
            .into_iter()
            .filter(|f| {
                let rel = f.strip_prefix(&root).unwrap_or(f).to_string_lossy().to_string();
                doublestar_match(&rel, &pattern)
            })
            .collect()
    } else {
        let glob_re = glob_to_regex(&pattern);
        files
            .into_iter()
            .filter(|f| f.file_name().map(|n| glob_re.is_match(&n.to_string_lossy())).unwrap_or(false))
            .collect()
    };

    let mut with_mtime: Vec<(PathBuf, std::time::SystemTime)> = matches
        .into_iter()
        .filter_map(|p| std::fs::metadata(&p).ok().and_then(|m| m.modified().ok()).map(|t| (p, t)))
        .collect();
    with_mtime.sort_by_key(|b| std::cmp::Reverse(b.1));

    let limit = if head_limit > 0 { head_limit } else { with_mtime.len() };
    let out: Vec<String> = with_mtime.into_iter().take(limit).map(|(p, _)| p.display().to_string()).collect();
    Ok(ToolResult::ok(out.join("\n")))
}

fn do_find_references(params: &Value, cwd: &Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let symbol = params::require_string(params, "symbol").map_err(anyhow::Error::msg)?;
    let path_str = params::string_optional(params, "path", ".");
    let glob_filter = params::string_optional(params, "glob", "");

    let root = path::resolve_read(&path_str, cwd, sandbox)?;
    let re = Regex::new(&format!(r"\b{}\b", regex::escape(&symbol)))?;
    let mut files = Vec::new();
    walk_files(&root, &mut files);
    if !glob_filter.is_empty() {
        let glob_re = glob_to_regex(&glob_filter);
        files.retain(|f| f.file_name().map(|n| glob_re.is_match(&n.to_string_lossy())).unwrap_or(false));
    }

    let mut out = Vec::new();
    'outer: for f in &files {
        let Ok(content) = std::fs::read_to_string(f) else { continue };
        for (i, line) in content.lines().enumerate() {
            if re.is_match(line) {
                out.push(format!("{}:{}:{}", f.display(), i + 1, line.trim()));
                if out.len() >= MAX_FIND_RESULTS {
                    break 'outer;
                }
            }
        }
    }
    Ok(ToolResult::ok(out.join("\n")))
}

const DEFINITION_PATTERNS: &[(&str, &str)] = &[
    ("python", r"^\s*(def|class)\s+(\w+)"),
    (
        "javascript",
        r"^\s*(?:export\s+)?(?:async\s+)?(?:function|class|const|let|var)\s+(\w+)",
    ),
    (
        "typescript",
        r"^\s*(?:export\s+)?(?:async\s+)?(?:function|class|interface|type|enum|const|let|var)\s+(\w+)",
    ),
    ("rust", r"^\s*(?:pub\s+)?(?:fn|struct|enum|trait|type|impl|mod)\s+(\w+)"),
    ("ruby", r"^\s*(?:def|class|module)\s+(\w+)"),
    (
        "java",
        r"^\s*(?:public|private|protected|static|final|abstract)?\s*(?:class|interface|enum|record)\s+(\w+)",
    ),
    ("go", r"^\s*func\s+(?:\([^)]*\)\s*)?(\w+)|^\s*type\s+(\w+)\s+(?:struct|interface)"),
];

pub(crate) fn language_for_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "py" => Some("python"),
        "js" | "jsx" | "mjs" => Some("javascript"),
        "ts" | "tsx" => Some("typescript"),
        "rs" => Some("rust"),
        "rb" => Some("ruby"),
        "java" => Some("java"),
        "go" => Some("go"),
        _ => None,
    }
}

fn do_search_definitions(params: &Value, cwd: &Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::string_optional(params, "path", ".");
    let root = path::resolve_read(&path_str, cwd, sandbox)?;
    let mut files = Vec::new();
    walk_files(&root, &mut files);

    let mut results: Vec<(PathBuf, usize, String)> = Vec::new();
    for f in &files {
        let Some(ext) = f.extension().and_then(|e| e.to_str()) else { continue };
        let Some(lang) = language_for_ext(ext) else { continue };
        let Some((_, pattern)) = DEFINITION_PATTERNS.iter().find(|(l, _)| *l == lang) else { continue };
        let re = Regex::new(pattern)?;
        let Ok(content) = std::fs::read_to_string(f) else { continue };
        for (i, line) in content.lines().enumerate() {
            if re.is_match(line) {
                results.push((f.clone(), i + 1, line.trim().to_string()));
                if results.len() >= MAX_FIND_RESULTS {
                    break;
                }
            }
        }
        if results.len() >= MAX_FIND_RESULTS {
            break;
        }
    }
    results.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    let out: Vec<String> = results.into_iter().map(|(f, l, text)| format!("{}:{l}: {text}", f.display())).collect();
    Ok(ToolResult::ok(out.join("\n")))
}

fn do_dependency_graph(params: &Value, cwd: &Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::string_optional(params, "path", ".");
    let filter = params::string_optional(params, "filter", "");
    let root = path::resolve_read(&path_str, cwd, sandbox)?;

    let mut files = Vec::new();
    walk_files(&root, &mut files);
    files.retain(|f| f.extension().and_then(|e| e.to_str()) == Some("go"));

    let import_re = Regex::new(r#"(?s)import\s*\((.*?)\)"#)?;
    let single_import_re = Regex::new(r#"import\s+"([^"]+)""#)?;
    let quoted_re = Regex::new(r#""([^"]+)""#)?;

    let mut by_dir: std::collections::BTreeMap<String, Vec<String>> = std::collections::BTreeMap::new();
    for f in &files {
        let Ok(content) = std::fs::read_to_string(f) else { continue };
        let dir = f
            .parent()
            .and_then(|p| p.strip_prefix(&root).ok())
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();
        let mut imports = Vec::new();
        if let Some(caps) = import_re.captures(&content) {
            for m in quoted_re.captures_iter(caps.get(1).unwrap().as_str()) {
                imports.push(m.get(1).unwrap().as_str().to_string());
            }
        }
        for m in single_import_re.captures_iter(&content) {
            imports.push(m.get(1).unwrap().as_str().to_string());
        }
        if !filter.is_empty() {
            imports.retain(|i| i.contains(&filter));
        }
        if !imports.is_empty() {
            by_dir.entry(dir).or_default().extend(imports);
        }
    }

    let mut out = String::new();
    for (dir, imports) in by_dir {
        out.push_str(&format!("package ./{dir}\n"));
        let mut imports = imports;
        imports.sort();
        imports.dedup();
        for i in imports {
            out.push_str(&format!("  -> {i}\n"));
        }
    }
    Ok(ToolResult::ok(out))
}

pub fn register(registry: &mut ToolRegistry, sandbox: Option<Arc<Sandbox>>, has_rg: bool) {
    let cwd = super::cwd_for(&sandbox);
    let sb = sandbox.unwrap_or_else(|| Arc::new(Sandbox::unrestricted()));

    let (c, s) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "grep",
        "Search text",
        "Search file contents by regex, with content/files_with_matches/count modes.",
        json!({
            "type": "object",
            "properties": {
                "pattern": {"type": "string"},
                "path": {"type": "string"},
                "glob": {"type": "string"},
                "type": {"type": "string"},
                "output_mode": {"type": "string", "enum": ["content", "files_with_matches", "count"]},
                "-A": {"type": "integer"}, "-B": {"type": "integer"}, "-C": {"type": "integer"},
                "-i": {"type": "boolean"}, "-n": {"type": "boolean"},
                "head_limit": {"type": "integer"}, "offset": {"type": "integer"},
                "multiline": {"type": "boolean"}
            },
            "required": ["pattern"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (c.clone(), s.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_grep(&params, &cwd, &sb, has_rg)).await? })
        },
    ));

    let (c, s) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "find",
        "Find files",
        "Find files by glob/doublestar pattern, sorted by mtime descending.",
        json!({
            "type": "object",
            "properties": {"pattern": {"type": "string"}, "path": {"type": "string"}, "head_limit": {"type": "integer"}},
            "required": ["pattern"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (c.clone(), s.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_find(&params, &cwd, &sb)).await? })
        },
    ));

    let (c, s) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "find_references",
        "Find references",
        "Word-boundary search for a symbol across files.",
        json!({
            "type": "object",
            "properties": {"symbol": {"type": "string"}, "path": {"type": "string"}, "glob": {"type": "string"}},
            "required": ["symbol"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (c.clone(), s.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_find_references(&params, &cwd, &sb)).await? })
        },
    ));

    let (c, s) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "search_definitions",
        "Search definitions",
        "Find function/type/method definitions by language-keyed regex.",
        json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": []}),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (c.clone(), s.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_search_definitions(&params, &cwd, &sb)).await? })
        },
    ));

    registry.register(super::descriptor(
        "dependency_graph",
        "Go import graph",
        "Parse Go import clauses under a root, grouped by directory.",
        json!({"type": "object", "properties": {"path": {"type": "string"}, "filter": {"type": "string"}}, "required": []}),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (cwd.clone(), sb.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_dependency_graph(&params, &cwd, &sb)).await? })
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grep_content_mode_joins_groups_with_separator() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "foo\nbar\nfoo\n").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"pattern": "foo", "path": "."});
        let result = do_grep(&params, dir.path(), &sandbox, false).unwrap();
        assert!(result.content.contains("--"));
    }

    #[test]
    fn grep_context_lines_use_dash_and_matched_line_uses_colon() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "one\ntwo\nfoo\nfour\n").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"pattern": "foo", "path": ".", "-C": 1});
        let result = do_grep(&params, dir.path(), &sandbox, false).unwrap();
        assert!(result.content.contains("2-two"));
        assert!(result.content.contains("3:foo"));
        assert!(result.content.contains("4-four"));
    }

    #[test]
    fn find_sorts_by_mtime_descending() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.txt"), "x").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(dir.path().join("new.txt"), "x").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"pattern": "*.txt", "path": "."});
        let result = do_find(&params, dir.path(), &sandbox).unwrap();
        let lines: Vec<&str> = result.content.lines().collect();
        assert!(lines[0].contains("new.txt"));
    }

    #[test]
    fn find_references_reports_line_and_symbol() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "fn foo() {}\nfn bar() { foo(); }\n").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"symbol": "foo", "path": "."});
        let result = do_find_references(&params, dir.path(), &sandbox).unwrap();
        assert_eq!(result.content.lines().count(), 2);
    }

    #[test]
    fn search_definitions_finds_rust_fn() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.rs"), "pub fn hello() {}\n").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"path": "."});
        let result = do_search_definitions(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.contains("hello"));
    }
}
