//! Error types for the RPC endpoint

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError {
    #[error("Endpoint has been terminated")]
    Terminated,

    #[error("Remote call `{method}` failed: {message}")]
    Remote { method: String, message: String },

    #[error("Transport closed before `{method}` was answered")]
    Disconnected { method: String },
}
