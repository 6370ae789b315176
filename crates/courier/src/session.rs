//! Client side of the tool host's session protocol.
//!
//! A query acquires one fresh session, lists the tool catalog, invokes tools
//! as the model asks for them, and releases the session when the query ends.
//! Sessions are never pooled or shared between queries.
use async_trait::async_trait;
use serde_json::Value;

use crate::errors::RelayResult;
use crate::models::content::Content;
use crate::models::tool::Tool;

pub mod sse;

#[cfg(test)]
pub mod mock;

/// An open session with the tool host.
///
/// Dropping the session closes the underlying channel, so holding it in a
/// scope gives release on every exit path.
#[async_trait]
pub trait ToolSession: Send {
    /// Fetch the tool catalog offered by this session
    async fn list_tools(&mut self) -> RelayResult<Vec<Tool>>;

    /// Invoke a named tool with the given arguments.
    ///
    /// Names are forwarded as-is; the host reports its own failure for an
    /// unknown tool.
    async fn call_tool(&mut self, name: &str, arguments: Value) -> RelayResult<Vec<Content>>;
}

impl std::fmt::Debug for dyn ToolSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ToolSession")
    }
}

/// A tool host that sessions can be opened against
#[async_trait]
pub trait ToolHost: Send + Sync {
    /// Open a new session, performing the protocol handshake
    async fn connect(&self) -> RelayResult<Box<dyn ToolSession>>;
}
