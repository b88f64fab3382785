//! ls, file_info, validate_paths: thin metadata wrappers.

use crate::path;
use crate::registry::ToolRegistry;
use crate::types::ToolResult;
use serde_json::{json, Value};
use skilllite_core::params;
use skilllite_core::Sandbox;
use std::sync::Arc;

fn do_ls(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::string_optional(params, "path", ".");
    let recursive = params::bool_opt(params, "recursive", false);
    let resolved = path::resolve_read(&path_str, cwd, sandbox)?;
    if !resolved.is_dir() {
        return Ok(ToolResult::error(format!("not a directory: {path_str}")));
    }
    let mut entries = Vec::new();
    path::list_dir(&resolved, &resolved, recursive, &mut entries)?;
    Ok(ToolResult::ok(entries.join("\n")))
}

/// True if the first 512 bytes of `path` contain a NUL byte.
fn looks_binary(path: &std::path::Path) -> bool {
    use std::io::Read;
    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut head = vec![0u8; 512];
    let Ok(n) = file.read(&mut head) else {
        return false;
    };
    head[..n].contains(&0u8)
}

fn do_file_info(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let resolved = path::resolve_read(&path_str, cwd, sandbox)?;
    if !resolved.exists() {
        return Ok(ToolResult::error(format!("not found: {path_str}")));
    }
    let meta = std::fs::metadata(&resolved)?;
    let is_dir = meta.is_dir();
    let kind = if is_dir { "directory" } else { "file" };
    let modified = path::format_mtime(&meta);

    let binary = !is_dir && looks_binary(&resolved);
    let (lines, language) = if is_dir {
        (0, "-".to_string())
    } else {
        let lines = if binary {
            0
        } else {
            std::fs::read_to_string(&resolved)
                .map(|s| s.lines().count())
                .unwrap_or(0)
        };
        let language = resolved
            .extension()
            .and_then(|e| e.to_str())
            .and_then(super::search::language_for_ext)
            .unwrap_or("unknown")
            .to_string();
        (lines, language)
    };

    #[cfg(unix)]
    let permissions = {
        use std::os::unix::fs::PermissionsExt;
        format!("{:o}", meta.permissions().mode() & 0o777)
    };
    #[cfg(not(unix))]
    let permissions = if meta.permissions().readonly() {
        "r--r--r--".to_string()
    } else {
        "rw-rw-rw-".to_string()
    };

    Ok(ToolResult::ok(format!(
        "path: {}\nsize: {} ({})\ntype: {kind}\nlines: {lines}\nlanguage: {language}\nmodified: {modified}\npermissions: {permissions}\nbinary: {binary}",
        resolved.display(),
        meta.len(),
        path::format_size(meta.len())
    )))
}

fn do_validate_paths(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let paths = params::require_string_array(params, "paths").map_err(anyhow::Error::msg)?;
    let mut lines = Vec::new();
    let mut existing = 0;
    for p in &paths {
        let resolved = skilllite_core::resolver::resolve_read(p, cwd);
        if !sandbox.is_path_allowed(&resolved) {
            lines.push(format!("{p}: not found"));
            continue;
        }
        match std::fs::metadata(&resolved) {
            Ok(meta) if meta.is_dir() => {
                existing += 1;
                lines.push(format!("{p}: dir ({} bytes)", meta.len()));
            }
            Ok(meta) => {
                existing += 1;
                lines.push(format!("{p}: file ({} bytes)", meta.len()));
            }
            Err(_) => lines.push(format!("{p}: not found")),
        }
    }
    lines.push(format!("{existing}/{} paths exist", paths.len()));
    Ok(ToolResult::ok(lines.join("\n")))
}

pub fn register(registry: &mut ToolRegistry, sandbox: Option<Arc<Sandbox>>) {
    let cwd = super::cwd_for(&sandbox);
    let sb = sandbox.unwrap_or_else(|| Arc::new(Sandbox::unrestricted()));

    let (cwd1, sb1) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "ls",
        "List directory",
        "List files and directories under a path.",
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}, "recursive": {"type": "boolean"}},
            "required": []
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (cwd1.clone(), sb1.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_ls(&params, &cwd, &sb)).await? })
        },
    ));

    let (cwd2, sb2) = (cwd.clone(), sb.clone());
    registry.register(super::descriptor(
        "file_info",
        "File info",
        "Return type, size, and modification time for a path.",
        json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (cwd2.clone(), sb2.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_file_info(&params, &cwd, &sb)).await? })
        },
    ));

    registry.register(super::descriptor(
        "validate_paths",
        "Validate paths",
        "Report existence and sandbox-allowed status for a list of paths.",
        json!({
            "type": "object",
            "properties": {"paths": {"type": "array", "items": {"type": "string"}}},
            "required": ["paths"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let (cwd, sb) = (cwd.clone(), sb.clone());
            Box::pin(async move { tokio::task::spawn_blocking(move || do_validate_paths(&params, &cwd, &sb)).await? })
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_info_reports_kind_and_size() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let params = json!({"path": "a.txt"});
        let result = do_file_info(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.contains("type: file"));
        assert!(result.content.contains("size: 5"));
    }

    #[test]
    fn validate_paths_reports_kind_size_and_summary() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        std::fs::write(dir.path().join("a.txt"), "hello").unwrap();
        let params = json!({"paths": ["a.txt", "missing.txt"]});
        let result = do_validate_paths(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.contains("a.txt: file (5 bytes)"));
        assert!(result.content.contains("missing.txt: not found"));
        assert!(result.content.contains("1/2 paths exist"));
    }

    #[test]
    fn validate_paths_reports_not_found_for_paths_outside_sandbox() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"paths": ["/etc/passwd"]});
        let result = do_validate_paths(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.contains("/etc/passwd: not found"));
        assert!(result.content.contains("0/1 paths exist"));
    }

    #[test]
    fn file_info_reports_lines_language_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        std::fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
        let params = json!({"path": "a.rs"});
        let result = do_file_info(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.contains("lines: 1"));
        assert!(result.content.contains("language: rust"));
        assert!(result.content.contains("binary: false"));
        assert!(result.content.contains("permissions:"));
    }
}
