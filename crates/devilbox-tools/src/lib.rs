//! devilbox-tools: a JSON-RPC 2.0 tool server for driving Devilbox.
//!
//! Clients (editor assistants, scripts) send one request per line on stdin
//! and read one response per line on stdout:
//!
//! - `initialize`: server name, version, and capabilities
//! - `tools/list`: JSON Schema definitions from [`tools::tool_definitions`]
//! - `tools/call`: dispatch to a handler in [`ToolContext`]
//!
//! Orchestration tools shell out to `docker-compose` and `docker` through a
//! [`CommandRunner`]; `devilbox_health` also runs a native probe pass.

pub mod error;
pub mod handlers;
pub mod runner;
pub mod server;
pub mod tools;

pub use error::{ToolError, ToolResult};
pub use handlers::ToolContext;
pub use runner::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use server::ToolServer;
