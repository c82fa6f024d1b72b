//! # Remote Tree Core
//!
//! A tree of components and text nodes that is built and queried locally
//! and mirrored into a remote peer over an asynchronous channel.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ root: Root + node factory                   │
//! │  - create components / text                 │
//! │  - owns the top-level children              │
//! │  - mount() sends the full snapshot          │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ dispatcher: every mutation                  │
//! │  - forward a command if target connected    │
//! │  - always apply locally                     │
//! └─────────────────────────────────────────────┘
//!           ↓                       ↓
//! ┌───────────────────┐   ┌─────────────────────┐
//! │ topology          │   │ serializer          │
//! │  parent / top     │   │  node → record      │
//! └───────────────────┘   └─────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ channel: RemoteCommand → RPC endpoint       │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use remote_tree_core::{create_root, RootOptions, RemoteReceiver};
//!
//! let receiver = RemoteReceiver::new();
//! let root = create_root(receiver.clone(), RootOptions::default());
//!
//! let button = root.create_component("Button", props);
//! button.append_child("Go")?;
//! root.append_child(&button)?;
//! root.mount()?;
//!
//! // Connected mutations are forwarded as they happen
//! button.update_props(patch)?;
//! ```
//!
//! Local state is updated synchronously. Remote delivery is started but
//! not awaited unless the root was created with [`DeliveryMode::Strict`]
//! and the mutation goes through [`Root::commit`].

mod channel;
mod dispatcher;
mod errors;
mod handles;
mod id_generator;
mod node;
mod options;
mod receiver;
mod root;
mod serializer;
mod topology;

pub use channel::{
    channel_fn, ChannelError, CommandError, Delivery, FnChannel, RemoteChannel, RemoteCommand,
};
pub use dispatcher::{Dispatch, Operation};
pub use errors::TreeError;
pub use handles::{Child, Component, Container, Node, Text, Top};
pub use node::{NodeId, PropMap, ROOT_ID};
pub use options::{DeliveryMode, RootOptions};
pub use receiver::{ReceiveError, RemoteReceiver};
pub use root::{create_root, Root};
pub use serializer::SerializedNode;

// Re-export the endpoint so callers can wire a channel without a direct dependency
pub use remote_tree_rpc::{Endpoint, RpcError, Transport};
