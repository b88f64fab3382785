//! The `bash` tool: policy-checked, resource-bounded shell execution.

use crate::registry::ToolRegistry;
use crate::types::ToolResult;
use serde_json::json;
use skilllite_core::config::schema::BashConfig;
use skilllite_core::params;
use skilllite_core::Sandbox;
use std::sync::Arc;

pub fn register(registry: &mut ToolRegistry, sandbox: Option<Arc<Sandbox>>) {
    let cwd = super::cwd_for(&sandbox);
    registry.register(super::descriptor(
        "bash",
        "Run shell command",
        "Execute a shell command under the policy engine with a timeout and merged stdout/stderr.",
        json!({
            "type": "object",
            "properties": {
                "command": {"type": "string"},
                "timeout_ms": {"type": "integer", "description": "default 120000"}
            },
            "required": ["command"]
        }),
        false,
        move |_cancel, _id, params, _updates| {
            let cwd = cwd.clone();
            Box::pin(async move {
                let command = params::require_string(&params, "command").map_err(anyhow::Error::msg)?;
                let default_cfg = BashConfig::default();
                let timeout_ms = params::int(&params, "timeout_ms", default_cfg.timeout_ms as i64).max(1) as u64;
                let max_memory_mb = default_cfg.max_memory_mb;

                let outcome = tokio::task::spawn_blocking(move || {
                    skilllite_sandbox::run_bash(&command, &cwd, timeout_ms, max_memory_mb)
                })
                .await?;

                match outcome {
                    Ok(outcome) => {
                        if outcome.killed {
                            let reason = outcome.kill_reason.unwrap_or_default();
                            let suffix = if reason == "timeout" { " (timed out)" } else { "" };
                            Ok(ToolResult::error(format!("{}{}", outcome.output.content, suffix)))
                        } else if outcome.exit_code != 0 {
                            Ok(ToolResult::ok(format!(
                                "{}\n[exit status {}]",
                                outcome.output.content, outcome.exit_code
                            )))
                        } else {
                            Ok(ToolResult::ok(outcome.output.content))
                        }
                    }
                    Err(e) => Ok(ToolResult::error(e.to_string())),
                }
            })
        },
    ));
}
