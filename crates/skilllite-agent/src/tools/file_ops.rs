//! read, read_image, write, edit, notebook_edit.
//!
//! Grounded on `skilllite-agent::extensions::builtin::file_ops` (read/write
//! shape, sensitive-path awareness) and `run_command::truncate_command_output`
//! for the head-truncation idiom, reworked onto `skilllite_core::{resolver,
//! sandbox, limiter, params}`.

use crate::path;
use crate::registry::ToolRegistry;
use crate::types::{ImageBlock, ToolResult};
use serde_json::{json, Value};
use skilllite_core::limiter::truncate_output;
use skilllite_core::params;
use skilllite_core::Sandbox;
use std::sync::Arc;

const MAX_READ_BYTES: usize = 10 * 1024 * 1024;
const MAX_READ_OUTPUT_BYTES: usize = 100 * 1024;
const MAX_IMAGE_BYTES: usize = 4 * 1024 * 1024 + 512 * 1024;
const MAX_EDIT_FILE_BYTES: u64 = 10 * 1024 * 1024;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
];

fn image_mime_for(path: &std::path::Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
}

fn read_image_block(resolved: &std::path::Path) -> anyhow::Result<ImageBlock> {
    let bytes = std::fs::read(resolved)?;
    if bytes.len() > MAX_IMAGE_BYTES {
        anyhow::bail!("image exceeds {MAX_IMAGE_BYTES} byte limit");
    }
    let mime_type = image_mime_for(resolved)
        .ok_or_else(|| anyhow::anyhow!("not a known image extension"))?
        .to_string();
    let filename = resolved
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(ImageBlock {
        bytes,
        mime_type,
        filename,
    })
}

fn do_read(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let resolved = path::resolve_read(&path_str, cwd, sandbox)?;
    path::require_regular_file(&resolved, &path_str)?;

    let mut file = std::fs::File::open(&resolved)?;
    use std::io::Read;
    let mut head = vec![0u8; 512];
    let n = file.read(&mut head)?;
    let is_binary = head[..n].contains(&0u8);

    if is_binary {
        if let Some(mime) = image_mime_for(&resolved) {
            let block = read_image_block(&resolved)?;
            let size = block.bytes.len();
            let mut result = ToolResult::ok(format!(
                "[Image: {} {} ({} bytes)]",
                block.filename, mime, size
            ));
            result.images.push(block);
            return Ok(result);
        }
        return Ok(ToolResult::error("binary file detected"));
    }

    let mut rest = Vec::new();
    file.read_to_end(&mut rest)?;
    let mut bytes = head[..n].to_vec();
    bytes.extend(rest);
    if bytes.len() > MAX_READ_BYTES {
        bytes.truncate(MAX_READ_BYTES);
    }
    let content = String::from_utf8_lossy(&bytes).to_string();

    let offset = params::int(params, "offset", 0).max(0) as usize;
    let limit = params::int(params, "limit", 0).max(0) as usize;

    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let selected: String = if offset > 0 || limit > 0 {
        let start = offset.min(lines.len());
        let end = if limit > 0 {
            (start + limit).min(lines.len())
        } else {
            lines.len()
        };
        lines[start..end].concat()
    } else {
        content
    };

    Ok(ToolResult::ok(truncate_output(&selected, MAX_READ_OUTPUT_BYTES)))
}

fn do_read_image(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let resolved = path::resolve_read(&path_str, cwd, sandbox)?;
    path::require_regular_file(&resolved, &path_str)?;
    if image_mime_for(&resolved).is_none() {
        return Ok(ToolResult::error("not a known image extension"));
    }
    let block = read_image_block(&resolved)?;
    let size = block.bytes.len();
    let mut result = ToolResult::ok(format!(
        "[Image: {} {} ({} bytes)]",
        block.filename, block.mime_type, size
    ));
    result.images.push(block);
    Ok(result)
}

fn do_write(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let content = params::require_string(params, "content").map_err(anyhow::Error::msg)?;
    let resolved = path::resolve_write(&path_str, cwd, sandbox)?;

    if let Some(parent) = resolved.parent() {
        let mut builder = std::fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder.create(parent)?;
    }
    std::fs::write(&resolved, &content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&resolved, std::fs::Permissions::from_mode(0o644))?;
    }
    Ok(ToolResult::ok(format!(
        "wrote {} bytes to {}",
        content.len(),
        resolved.display()
    )))
}

fn unified_diff(old: &str, new: &str, path_str: &str) -> String {
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .header(&format!("a/{path_str}"), &format!("b/{path_str}"))
        .to_string()
}

fn do_edit(params: &Value, cwd: &std::path::Path, sandbox: &Sandbox) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let old_string = params::require_string(params, "old_string").map_err(anyhow::Error::msg)?;
    let new_string = params::require_string(params, "new_string").map_err(anyhow::Error::msg)?;
    let replace_all = params::bool_opt(params, "replace_all", false);

    let resolved = path::resolve_write(&path_str, cwd, sandbox)?;
    path::require_regular_file(&resolved, &path_str)?;

    let meta = std::fs::metadata(&resolved)?;
    if meta.len() > MAX_EDIT_FILE_BYTES {
        anyhow::bail!("file exceeds {MAX_EDIT_FILE_BYTES} byte edit cap");
    }

    let content = std::fs::read_to_string(&resolved)?;

    if old_string == new_string {
        return Ok(ToolResult::ok(String::new()));
    }

    let occurrences = content.matches(&old_string).count();
    if occurrences == 0 {
        return Ok(ToolResult::error("old_string not found"));
    }
    if occurrences > 1 && !replace_all {
        return Ok(ToolResult::error(format!(
            "old_string found {occurrences} times; set replace_all=true"
        )));
    }

    let updated = if replace_all {
        content.replace(&old_string, &new_string)
    } else {
        content.replacen(&old_string, &new_string, 1)
    };

    std::fs::write(&resolved, &updated)?;
    Ok(ToolResult::ok(unified_diff(&content, &updated, &path_str)))
}

// ─── notebook_edit ──────────────────────────────────────────────────────────

fn source_lines(text: &str) -> Vec<Value> {
    let mut lines: Vec<&str> = text.split('\n').collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    let n = lines.len();
    lines
        .into_iter()
        .enumerate()
        .map(|(i, l)| {
            let is_final = i + 1 == n;
            Value::String(if is_final {
                l.to_string()
            } else {
                format!("{l}\n")
            })
        })
        .collect()
}

fn do_notebook_edit(
    params: &Value,
    cwd: &std::path::Path,
    sandbox: &Sandbox,
) -> anyhow::Result<ToolResult> {
    let path_str = params::require_string(params, "path").map_err(anyhow::Error::msg)?;
    let operation = params::string_optional(params, "operation", "replace");
    let cell_index = params::int(params, "cell_index", -1);

    let resolved = path::resolve_write(&path_str, cwd, sandbox)?;
    path::require_regular_file(&resolved, &path_str)?;

    let text = std::fs::read_to_string(&resolved)?;
    let mut notebook: Value = serde_json::from_str(&text)?;
    let cells = notebook
        .get_mut("cells")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| anyhow::anyhow!("notebook has no 'cells' array"))?;

    match operation.as_str() {
        "delete" => {
            if cell_index < 0 || cell_index as usize >= cells.len() {
                anyhow::bail!("cell_index {cell_index} out of bounds ({} cells)", cells.len());
            }
            cells.remove(cell_index as usize);
        }
        "insert" => {
            let cell_type = params::string_optional(params, "cell_type", "code");
            let new_source = params::require_string(params, "new_source").map_err(anyhow::Error::msg)?;
            let new_cell = json!({
                "cell_type": cell_type,
                "metadata": {},
                "source": source_lines(&new_source),
                "outputs": if cell_type == "code" { json!([]) } else { Value::Null },
                "execution_count": Value::Null,
            });
            let at = if cell_index < 0 { 0 } else { (cell_index as usize + 1).min(cells.len()) };
            cells.insert(at, new_cell);
        }
        _ => {
            if cell_index < 0 || cell_index as usize >= cells.len() {
                anyhow::bail!("cell_index {cell_index} out of bounds ({} cells)", cells.len());
            }
            let new_source = params::require_string(params, "new_source").map_err(anyhow::Error::msg)?;
            cells[cell_index as usize]["source"] = Value::Array(source_lines(&new_source));
        }
    }

    let rendered = serde_json::to_string_pretty(&notebook)?;
    std::fs::write(&resolved, rendered)?;
    Ok(ToolResult::ok(format!("notebook updated: {path_str}")))
}

pub fn register(registry: &mut ToolRegistry, sandbox: Option<Arc<Sandbox>>) {
    let cwd = super::cwd_for(&sandbox);
    let sb = sandbox.clone().unwrap_or_else(|| Arc::new(Sandbox::unrestricted()));
    let cwd2 = cwd.clone();
    let sb2 = sb.clone();
    registry.register(super::descriptor(
        "read",
        "Read file",
        "Read a text or image file, returning UTF-8 text or an image block.",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer"},
                "limit": {"type": "integer"}
            },
            "required": ["path"]
        }),
        true,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd2.clone();
            let sb = sb2.clone();
            Box::pin(async move {
                tokio::task::spawn_blocking(move || do_read(&params, &cwd, &sb)).await?
            })
        },
    ));

    let cwd3 = cwd.clone();
    let sb3 = sb.clone();
    registry.register(super::descriptor(
        "read_image",
        "Read image",
        "Read an image file as an image block.",
        json!({"type": "object", "properties": {"path": {"type": "string"}}, "required": ["path"]}),
        true,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd3.clone();
            let sb = sb3.clone();
            Box::pin(async move {
                tokio::task::spawn_blocking(move || do_read_image(&params, &cwd, &sb)).await?
            })
        },
    ));

    let cwd4 = cwd.clone();
    let sb4 = sb.clone();
    registry.register(super::descriptor(
        "write",
        "Write file",
        "Write content to a file, creating parent directories as needed.",
        json!({
            "type": "object",
            "properties": {"path": {"type": "string"}, "content": {"type": "string"}},
            "required": ["path", "content"]
        }),
        false,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd4.clone();
            let sb = sb4.clone();
            Box::pin(async move {
                tokio::task::spawn_blocking(move || do_write(&params, &cwd, &sb)).await?
            })
        },
    ));

    let cwd5 = cwd.clone();
    let sb5 = sb.clone();
    registry.register(super::descriptor(
        "edit",
        "Edit file",
        "Replace an exact string occurrence in a file, returning a unified diff.",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "old_string": {"type": "string"},
                "new_string": {"type": "string"},
                "replace_all": {"type": "boolean"}
            },
            "required": ["path", "old_string", "new_string"]
        }),
        false,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd5.clone();
            let sb = sb5.clone();
            Box::pin(async move {
                tokio::task::spawn_blocking(move || do_edit(&params, &cwd, &sb)).await?
            })
        },
    ));

    registry.register(super::descriptor(
        "notebook_edit",
        "Edit notebook",
        "Replace, insert, or delete a Jupyter notebook cell.",
        json!({
            "type": "object",
            "properties": {
                "path": {"type": "string"},
                "operation": {"type": "string", "enum": ["replace", "insert", "delete"]},
                "cell_index": {"type": "integer"},
                "new_source": {"type": "string"},
                "cell_type": {"type": "string"}
            },
            "required": ["path", "operation"]
        }),
        false,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd.clone();
            let sb = sb.clone();
            Box::pin(async move {
                tokio::task::spawn_blocking(move || do_notebook_edit(&params, &cwd, &sb)).await?
            })
        },
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edit_identical_strings_is_a_no_op_diff() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "hello world").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"path": file.to_str().unwrap(), "old_string": "hello", "new_string": "hello"});
        let result = do_edit(&params, dir.path(), &sandbox).unwrap();
        assert!(!result.is_error);
        assert!(result.content.is_empty());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "hello world");
    }

    #[test]
    fn edit_reports_multiple_occurrences_without_replace_all() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "foo foo foo").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"path": file.to_str().unwrap(), "old_string": "foo", "new_string": "bar"});
        let result = do_edit(&params, dir.path(), &sandbox).unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("3 times"));
    }

    #[test]
    fn read_truncates_over_limit_content_with_trailing_marker() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let file = dir.path().join("big.txt");
        let content = "x".repeat(MAX_READ_OUTPUT_BYTES + 1024);
        std::fs::write(&file, &content).unwrap();
        let params = json!({"path": file.to_str().unwrap()});
        let result = do_read(&params, dir.path(), &sandbox).unwrap();
        assert!(result.content.len() <= MAX_READ_OUTPUT_BYTES + "\n... [output truncated]".len());
        assert!(result.content.ends_with("\n... [output truncated]"));
    }

    #[test]
    fn edit_emits_standard_unified_diff_with_hunk_header() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        std::fs::write(&file, "one\ntwo\nthree\n").unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let params = json!({"path": file.to_str().unwrap(), "old_string": "two", "new_string": "TWO"});
        let result = do_edit(&params, dir.path(), &sandbox).unwrap();
        assert!(!result.is_error);
        assert!(result.content.contains("--- a/"));
        assert!(result.content.contains("+++ b/"));
        assert!(result.content.contains("@@"));
        assert!(result.content.contains("-two"));
        assert!(result.content.contains("+TWO"));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let file = dir.path().join("nested").join("b.txt");
        let params = json!({"path": file.to_str().unwrap(), "content": "hi there"});
        do_write(&params, dir.path(), &sandbox).unwrap();
        let params = json!({"path": file.to_str().unwrap()});
        let result = do_read(&params, dir.path(), &sandbox).unwrap();
        assert_eq!(result.content, "hi there");
    }

    #[test]
    fn read_rejects_binary_non_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = Sandbox::new([dir.path()], false, None);
        let file = dir.path().join("a.bin");
        std::fs::write(&file, [0u8, 1, 2, 0, 3]).unwrap();
        let params = json!({"path": file.to_str().unwrap()});
        let result = do_read(&params, dir.path(), &sandbox).unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("binary"));
    }
}
