use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope exchanged between two endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Message {
    /// Invoke an exposed method on the peer
    Call {
        id: u64,
        method: String,
        args: Vec<Value>,
    },

    /// Successful answer to a call
    Reply { id: u64, value: Value },

    /// Failed answer to a call (handler error or unexposed method)
    Failure { id: u64, error: String },
}

impl Message {
    /// Correlation id shared by a call and its answer
    pub fn id(&self) -> u64 {
        match self {
            Message::Call { id, .. } | Message::Reply { id, .. } | Message::Failure { id, .. } => {
                *id
            }
        }
    }
}
