//! Tool registry and built-in tool implementations for the tool-execution
//! substrate: path-resolving file tools, the sandboxed bash tool, search
//! tools, and network-facing web tools, behind one flat descriptor table.

pub mod html_md;
pub mod path;
pub mod registry;
pub mod tools;
pub mod types;

pub use registry::ToolRegistry;
pub use types::{ExecuteFuture, ImageBlock, ToolDescriptor, ToolResult, ToolUpdate, UpdateSink};
