//! Shared data model: tool results, descriptors, and progress updates.
//!
//! Grounded on the teacher's `types::{ToolResult, ToolDefinition}` shape,
//! extended with `images`/`duration` and a cancellation-aware execute
//! signature the teacher's synchronous dispatch never needed.

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One image produced by a tool (e.g. `read` on a binary image file).
#[derive(Debug, Clone)]
pub struct ImageBlock {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub filename: String,
}

/// Result of executing a tool. `is_error` is semantic: a tool that fails its
/// own precondition (bad path, pattern not found) still returns a
/// well-formed `ToolResult` with `is_error=true`; only host/infrastructure
/// failures propagate as a separate `anyhow::Error`.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    pub content: String,
    pub is_error: bool,
    pub images: Vec<ImageBlock>,
    pub duration: Duration,
}

impl ToolResult {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            images: Vec::new(),
            duration: Duration::default(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            images: Vec::new(),
            duration: Duration::default(),
        }
    }
}

/// Incremental output emitted during a long-running tool call. Delivery is
/// best-effort and MUST NOT block the tool's own progress.
#[derive(Debug, Clone)]
pub struct ToolUpdate {
    pub output: String,
}

/// Sink for `ToolUpdate`s; dropping updates on a full channel is acceptable.
pub type UpdateSink = tokio::sync::mpsc::UnboundedSender<ToolUpdate>;

pub type ExecuteFuture = Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send>>;
pub type ExecuteFn = dyn Fn(CancellationToken, String, Value, UpdateSink) -> ExecuteFuture + Send + Sync;

/// A named, polymorphic operation. Immutable after registration.
pub struct ToolDescriptor {
    pub name: String,
    pub label: String,
    pub description: String,
    pub parameter_schema: Value,
    pub read_only: bool,
    pub execute: Box<ExecuteFn>,
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("read_only", &self.read_only)
            .finish()
    }
}

/// UTF-8 safe prefix at most `max_bytes` bytes, never splitting a rune.
pub fn safe_truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
