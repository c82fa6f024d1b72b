//! Error types for tree mutations

use crate::channel::ChannelError;
use crate::node::NodeId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeError {
    #[error("Node {child} is not a child of {container}")]
    NotAChild { container: NodeId, child: NodeId },

    #[error("Node {0} belongs to a different tree")]
    ForeignNode(NodeId),

    #[error("Attaching {child} under {container} would create a cycle")]
    Cycle { container: NodeId, child: NodeId },

    #[error("Root delivers strictly; connected mutations must go through Root::commit")]
    StrictRequiresCommit,

    /// The removal half of a move went through, the insertion did not.
    /// The node is left detached on both sides.
    #[error("Moving {child} out of {from} was interrupted: {source}")]
    MoveInterrupted {
        child: NodeId,
        from: NodeId,
        source: ChannelError,
    },

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),
}
