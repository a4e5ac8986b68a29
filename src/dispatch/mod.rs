//! # Dispatch Module
//!
//! The request-handling surface: the dispatcher (lifecycle, admission,
//! routing) and the tool handler seam domain code plugs into.

pub mod dispatcher;
pub mod handlers;

pub use dispatcher::{Dispatcher, DispatcherStats};
pub use handlers::{HandlerContext, LookupTool, ToolHandler};
