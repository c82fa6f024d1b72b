//! # Remote Receiver
//!
//! The remote half of the protocol: a mirror of the serialized tree that
//! applies commands in the order they arrive. Indices are trusted as sent,
//! so commands that arrive out of order surface here as range errors or as
//! a mirror that no longer matches the local tree.

use crate::channel::{ChannelError, CommandError, Delivery, RemoteChannel, RemoteCommand};
use crate::node::{NodeId, ROOT_ID};
use crate::serializer::SerializedNode;
use futures::future::{self, FutureExt};
use remote_tree_rpc::{handler, Endpoint};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ReceiveError {
    #[error("Unknown node: {0}")]
    UnknownNode(NodeId),

    #[error("Index {index} out of range for {container} ({len} children)")]
    IndexOutOfRange {
        container: NodeId,
        index: usize,
        len: usize,
    },

    #[error("Node {0} is not a component")]
    NotAComponent(NodeId),

    #[error("Node {0} is not text")]
    NotText(NodeId),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),
}

#[derive(Default)]
struct Mirror {
    children: Vec<SerializedNode>,
    mounts: usize,
    applied: usize,
}

/// Mirrored remote tree, shareable across tasks
#[derive(Clone, Default)]
pub struct RemoteReceiver {
    mirror: Arc<Mutex<Mirror>>,
}

impl RemoteReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Mirror> {
        self.mirror.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one command to the mirror
    pub fn receive(&self, command: RemoteCommand) -> Result<(), ReceiveError> {
        debug!(method = command.method(), "receiving command");
        let mut mirror = self.lock();

        match command {
            RemoteCommand::Mount { children } => {
                mirror.children = children;
                mirror.mounts += 1;
            }

            RemoteCommand::InsertChild {
                container_id,
                index,
                child,
            } => {
                let children = children_mut(&mut mirror.children, &container_id)?;
                if index > children.len() {
                    return Err(ReceiveError::IndexOutOfRange {
                        container: container_id,
                        index,
                        len: children.len(),
                    });
                }
                children.insert(index, child);
            }

            RemoteCommand::RemoveChild { container_id, index } => {
                let children = children_mut(&mut mirror.children, &container_id)?;
                if index >= children.len() {
                    return Err(ReceiveError::IndexOutOfRange {
                        container: container_id,
                        index,
                        len: children.len(),
                    });
                }
                children.remove(index);
            }

            RemoteCommand::UpdateProps { component_id, patch } => {
                match find_mut(&mut mirror.children, &component_id) {
                    Some(SerializedNode::Component { props, .. }) => props.extend(patch),
                    Some(_) => return Err(ReceiveError::NotAComponent(component_id)),
                    None => return Err(ReceiveError::UnknownNode(component_id)),
                }
            }

            RemoteCommand::UpdateText { text_id, text } => {
                match find_mut(&mut mirror.children, &text_id) {
                    Some(SerializedNode::Text { text: current, .. }) => *current = text,
                    Some(_) => return Err(ReceiveError::NotText(text_id)),
                    None => return Err(ReceiveError::UnknownNode(text_id)),
                }
            }
        }

        mirror.applied += 1;
        Ok(())
    }

    /// Mirrored top-level children
    pub fn snapshot(&self) -> Vec<SerializedNode> {
        self.lock().children.clone()
    }

    /// Mirrored copy of one node, if the remote side knows about it
    pub fn find(&self, id: &NodeId) -> Option<SerializedNode> {
        find_mut(&mut self.lock().children, id).cloned()
    }

    pub fn mount_count(&self) -> usize {
        self.lock().mounts
    }

    /// Number of commands applied successfully
    pub fn applied_count(&self) -> usize {
        self.lock().applied
    }

    /// Expose the receiving methods on `endpoint`
    pub fn expose_on(&self, endpoint: &Endpoint) {
        endpoint.expose(RemoteCommand::METHODS.iter().map(|&method| {
            let receiver = self.clone();
            let method_handler = handler(move |args: Vec<Value>| {
                let outcome = RemoteCommand::from_call(method, args)
                    .map_err(ReceiveError::from)
                    .and_then(|command| receiver.receive(command));

                async move { outcome.map(|()| Value::Null).map_err(|err| err.to_string()) }
            });
            (method, Some(method_handler))
        }));
    }
}

/// Loopback channel: commands are applied to the mirror as they are sent
impl RemoteChannel for RemoteReceiver {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        let outcome = self
            .receive(command)
            .map_err(|err| ChannelError::Rejected(err.to_string()));

        Ok(future::ready(outcome).boxed())
    }
}

fn find_mut<'a>(nodes: &'a mut [SerializedNode], id: &NodeId) -> Option<&'a mut SerializedNode> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let SerializedNode::Component { children, .. } = node {
            if let Some(found) = find_mut(children, id) {
                return Some(found);
            }
        }
    }
    None
}

fn children_mut<'a>(
    roots: &'a mut Vec<SerializedNode>,
    container: &NodeId,
) -> Result<&'a mut Vec<SerializedNode>, ReceiveError> {
    if container.as_str() == ROOT_ID {
        return Ok(roots);
    }

    match find_mut(roots, container) {
        Some(SerializedNode::Component { children, .. }) => Ok(children),
        Some(_) => Err(ReceiveError::NotAComponent(container.clone())),
        None => Err(ReceiveError::UnknownNode(container.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(id: &str, text: &str) -> SerializedNode {
        SerializedNode::Text {
            id: NodeId::from(id),
            text: text.to_string(),
        }
    }

    fn stack(id: &str, children: Vec<SerializedNode>) -> SerializedNode {
        SerializedNode::Component {
            id: NodeId::from(id),
            kind: "Stack".to_string(),
            props: Default::default(),
            children,
        }
    }

    #[test]
    fn test_mount_replaces_mirror() {
        let receiver = RemoteReceiver::new();
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![text("0", "a")],
            })
            .unwrap();
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![text("1", "b")],
            })
            .unwrap();

        assert_eq!(receiver.snapshot(), vec![text("1", "b")]);
        assert_eq!(receiver.mount_count(), 2);
    }

    #[test]
    fn test_insert_into_nested_container() {
        let receiver = RemoteReceiver::new();
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![stack("0", vec![])],
            })
            .unwrap();

        receiver
            .receive(RemoteCommand::InsertChild {
                container_id: NodeId::from("0"),
                index: 0,
                child: text("1", "hi"),
            })
            .unwrap();

        assert_eq!(receiver.find(&NodeId::from("1")), Some(text("1", "hi")));
    }

    #[test]
    fn test_remove_out_of_range_is_reported() {
        let receiver = RemoteReceiver::new();
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![text("0", "a")],
            })
            .unwrap();

        let err = receiver
            .receive(RemoteCommand::RemoveChild {
                container_id: NodeId::root(),
                index: 1,
            })
            .unwrap_err();

        assert!(matches!(err, ReceiveError::IndexOutOfRange { index: 1, len: 1, .. }));
        assert_eq!(receiver.applied_count(), 1);
    }

    #[test]
    fn test_updates_merge_props_and_replace_text() {
        let receiver = RemoteReceiver::new();
        let mut props = crate::PropMap::new();
        props.insert("a".to_string(), json!(1));
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![
                    SerializedNode::Component {
                        id: NodeId::from("0"),
                        kind: "Button".to_string(),
                        props,
                        children: vec![],
                    },
                    text("1", "old"),
                ],
            })
            .unwrap();

        let mut patch = crate::PropMap::new();
        patch.insert("b".to_string(), json!(2));
        receiver
            .receive(RemoteCommand::UpdateProps {
                component_id: NodeId::from("0"),
                patch,
            })
            .unwrap();
        receiver
            .receive(RemoteCommand::UpdateText {
                text_id: NodeId::from("1"),
                text: "new".to_string(),
            })
            .unwrap();

        let value = serde_json::to_value(receiver.snapshot()).unwrap();
        assert_eq!(
            value,
            json!([
                { "id": "0", "type": "Button", "props": { "a": 1, "b": 2 }, "children": [] },
                { "id": "1", "text": "new" }
            ])
        );
    }

    #[test]
    fn test_update_text_on_component_is_rejected() {
        let receiver = RemoteReceiver::new();
        receiver
            .receive(RemoteCommand::Mount {
                children: vec![stack("0", vec![])],
            })
            .unwrap();

        let err = receiver
            .receive(RemoteCommand::UpdateText {
                text_id: NodeId::from("0"),
                text: "x".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, ReceiveError::NotText(_)));
    }
}
