//! Crate-level error surface.
//!
//! Protocol-facing failures are part of the codec ([`crate::mcp::protocol`])
//! because they must become well-formed JSON-RPC envelopes, never raw
//! faults. What lives here is the boundary taxonomy: errors that map to
//! plain HTTP responses before a protocol message is ever in play.

pub use crate::mcp::protocol::DecodeError;
pub use crate::middleware::api_key::ApiKeyError;
