//! MCP protocol core: codec, dispatcher, sessions and HTTP transport.
//!
//! # Architecture
//!
//! - [`protocol`] - tagged classification of inbound bodies and envelope
//!   builders
//! - [`tools`] - tool descriptors and the ordered registry
//! - [`service::McpService`] - pure dispatcher from message to envelope
//! - [`session`] - per-connection stream sessions and the shared store
//! - [`transport`] - axum handlers wiring both delivery paths together

pub mod protocol;
pub mod service;
pub mod session;
pub mod tools;
pub mod transport;

pub use service::{Dispatch, McpService};
pub use session::{SessionStore, StreamSession};
pub use tools::{builtin_tools, Tool, ToolRegistry};
pub use transport::app;
