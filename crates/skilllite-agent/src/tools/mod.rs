//! Built-in tool implementations, grouped by category and registered into a
//! [`crate::registry::ToolRegistry`] at construction time.

pub mod bash;
pub mod file_ops;
pub mod meta;
pub mod search;
pub mod web;

use crate::registry::ToolRegistry;
use crate::types::{ExecuteFuture, ToolDescriptor, UpdateSink};
use serde_json::Value;
use skilllite_core::Sandbox;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) fn descriptor<F>(
    name: &str,
    label: &str,
    description: &str,
    parameter_schema: Value,
    read_only: bool,
    execute: F,
) -> ToolDescriptor
where
    F: Fn(CancellationToken, String, Value, UpdateSink) -> ExecuteFuture + Send + Sync + 'static,
{
    ToolDescriptor {
        name: name.to_string(),
        label: label.to_string(),
        description: description.to_string(),
        parameter_schema,
        read_only,
        execute: Box::new(execute),
    }
}

/// Every tool resolves relative paths against the sandbox's configured
/// workdir, falling back to the process cwd when the sandbox is unrestricted.
pub(crate) fn cwd_for(sandbox: &Option<Arc<Sandbox>>) -> PathBuf {
    sandbox
        .as_ref()
        .and_then(|s| s.workdir().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

use std::path::Path;

pub fn register_all(registry: &mut ToolRegistry) {
    let sandbox = registry.sandbox().cloned();
    let has_ext_search = registry.has_external_search_binary();
    file_ops::register(registry, sandbox.clone());
    bash::register(registry, sandbox.clone());
    search::register(registry, sandbox.clone(), has_ext_search);
    meta::register(registry, sandbox.clone());
    web::register(registry);
}
