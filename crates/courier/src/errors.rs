use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, Deserialize, Serialize)]
pub enum RelayError {
    /// The model API or the tool host is unreachable, refused the
    /// handshake, or returned data we could not interpret.
    #[error("Upstream failure: {0}")]
    Upstream(String),

    /// A named tool invocation failed on the remote side.
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
