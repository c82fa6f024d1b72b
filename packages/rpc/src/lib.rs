//! # Remote Tree RPC
//!
//! A small peer-to-peer RPC endpoint. Each side of a [`Transport`] pair
//! wraps it in an [`Endpoint`], exposes named async handlers, and calls the
//! handlers exposed by its peer.
//!
//! ```rust,ignore
//! use remote_tree_rpc::{handler, Endpoint, Transport};
//!
//! let (left, right) = Transport::pair();
//! let local = Endpoint::new(left);
//! let remote = Endpoint::new(right);
//!
//! remote.expose([("ping", Some(handler(|_args| async { Ok(json!("pong")) })))]);
//!
//! let reply = local.call("ping", vec![])?.await?;
//! ```
//!
//! Calls are posted eagerly: dropping the returned future does not cancel
//! the message, it only stops observing the reply.

mod endpoint;
mod error;
mod message;
mod transport;

pub use endpoint::{handler, CallFuture, Endpoint, Handler};
pub use error::RpcError;
pub use message::Message;
pub use transport::Transport;
