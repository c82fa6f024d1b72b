//! # Remote Channel
//!
//! The commands a tree forwards to its remote peer, and the [`RemoteChannel`]
//! seam they travel through.
//!
//! A channel must start delivery inside `send`. The returned [`Delivery`]
//! only observes completion, so dropping it never cancels a command.

use crate::node::{NodeId, PropMap};
use crate::serializer::SerializedNode;
use futures::future::{BoxFuture, FutureExt};
use remote_tree_rpc::{Endpoint, RpcError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;

/// Completion of one forwarded command
pub type Delivery = BoxFuture<'static, Result<(), ChannelError>>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChannelError {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Command rejected: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    #[error("Wrong number of arguments for `{method}`")]
    Arity { method: String },

    #[error("Malformed argument for `{method}`: {source}")]
    Malformed {
        method: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Structural and content commands understood by the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RemoteCommand {
    /// Full snapshot of the root's children
    Mount { children: Vec<SerializedNode> },

    InsertChild {
        container_id: NodeId,
        index: usize,
        child: SerializedNode,
    },

    RemoveChild { container_id: NodeId, index: usize },

    /// Shallow patch, merged into the existing props remotely
    UpdateProps { component_id: NodeId, patch: PropMap },

    UpdateText { text_id: NodeId, text: String },
}

impl RemoteCommand {
    /// Every RPC method a receiver has to expose
    pub const METHODS: [&'static str; 5] = [
        "mount",
        "insertChild",
        "removeChild",
        "updateProps",
        "updateText",
    ];

    /// RPC method name carrying this command
    pub fn method(&self) -> &'static str {
        match self {
            RemoteCommand::Mount { .. } => "mount",
            RemoteCommand::InsertChild { .. } => "insertChild",
            RemoteCommand::RemoveChild { .. } => "removeChild",
            RemoteCommand::UpdateProps { .. } => "updateProps",
            RemoteCommand::UpdateText { .. } => "updateText",
        }
    }

    /// Positional RPC arguments, in wire order
    pub fn into_args(self) -> Vec<Value> {
        match self {
            RemoteCommand::Mount { children } => vec![json!(children)],
            RemoteCommand::InsertChild {
                container_id,
                index,
                child,
            } => vec![json!(container_id), json!(index), json!(child)],
            RemoteCommand::RemoveChild {
                container_id,
                index,
            } => vec![json!(container_id), json!(index)],
            RemoteCommand::UpdateProps {
                component_id,
                patch,
            } => vec![json!(component_id), Value::Object(patch)],
            RemoteCommand::UpdateText { text_id, text } => vec![json!(text_id), json!(text)],
        }
    }

    /// Decode a command from an RPC method name and its arguments
    pub fn from_call(method: &str, args: Vec<Value>) -> Result<Self, CommandError> {
        let mut args = args.into_iter();

        let command = match method {
            "mount" => RemoteCommand::Mount {
                children: next_arg(&mut args, method)?,
            },
            "insertChild" => RemoteCommand::InsertChild {
                container_id: next_arg(&mut args, method)?,
                index: next_arg(&mut args, method)?,
                child: next_arg(&mut args, method)?,
            },
            "removeChild" => RemoteCommand::RemoveChild {
                container_id: next_arg(&mut args, method)?,
                index: next_arg(&mut args, method)?,
            },
            "updateProps" => RemoteCommand::UpdateProps {
                component_id: next_arg(&mut args, method)?,
                patch: next_arg(&mut args, method)?,
            },
            "updateText" => RemoteCommand::UpdateText {
                text_id: next_arg(&mut args, method)?,
                text: next_arg(&mut args, method)?,
            },
            other => return Err(CommandError::UnknownMethod(other.to_string())),
        };

        if args.next().is_some() {
            return Err(CommandError::Arity {
                method: method.to_string(),
            });
        }

        Ok(command)
    }
}

fn next_arg<T: DeserializeOwned>(
    args: &mut impl Iterator<Item = Value>,
    method: &str,
) -> Result<T, CommandError> {
    let value = args.next().ok_or_else(|| CommandError::Arity {
        method: method.to_string(),
    })?;

    serde_json::from_value(value).map_err(|source| CommandError::Malformed {
        method: method.to_string(),
        source,
    })
}

/// Where a tree sends its commands
pub trait RemoteChannel {
    /// Start delivering `command`. A synchronous error means nothing was sent.
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError>;
}

impl<T: RemoteChannel + ?Sized> RemoteChannel for Rc<T> {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        (**self).send(command)
    }
}

impl<T: RemoteChannel + ?Sized> RemoteChannel for Arc<T> {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        (**self).send(command)
    }
}

impl<T: RemoteChannel + ?Sized> RemoteChannel for Box<T> {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        (**self).send(command)
    }
}

impl RemoteChannel for Endpoint {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        let method = command.method();
        let call = self.call(method, command.into_args())?;

        Ok(async move { call.await.map(|_| ()).map_err(ChannelError::from) }.boxed())
    }
}

/// Channel backed by a closure
pub struct FnChannel<F>(F);

impl<F> RemoteChannel for FnChannel<F>
where
    F: Fn(RemoteCommand) -> Result<Delivery, ChannelError>,
{
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        (self.0)(command)
    }
}

/// Wrap a closure as a [`RemoteChannel`]
pub fn channel_fn<F>(f: F) -> FnChannel<F>
where
    F: Fn(RemoteCommand) -> Result<Delivery, ChannelError>,
{
    FnChannel(f)
}
