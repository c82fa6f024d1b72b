//! # Mutation Dispatcher
//!
//! Every mutation runs through one protocol:
//!
//! 1. If the target container/node is the root or connected to it, build
//!    the remote command from the state *before* the mutation and send it.
//! 2. Apply the local effect, whether or not anything was sent.
//!
//! In detached mode (the default) step 2 does not wait for step 1 to be
//! delivered. Two back-to-back mutations may therefore reach the remote
//! side in a different order than they were applied locally, and a
//! `RemoveChild` index computed locally can point at the wrong node once
//! the remote side has seen the commands in another order. Strict mode
//! awaits each delivery before applying locally.
//!
//! A synchronous channel failure aborts the mutation before its local
//! effect runs. A move is a removal followed by an insertion; when only
//! the insertion fails, the removal stays applied on both sides and the
//! error is `TreeError::MoveInterrupted`.
//!
//! A strict root refuses connected mutations outside `Root::commit`, since
//! only `commit` can await their delivery.

use crate::channel::{ChannelError, Delivery, RemoteCommand};
use crate::errors::TreeError;
use crate::handles::{Child, Component, Container, Node, Text};
use crate::node::{Link, NodeData, NodeId, PropMap, TreeState};
use crate::options::DeliveryMode;
use crate::root::Tree;
use crate::serializer::{serialize, serialize_children};
use futures::future::join_all;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// A mutation request, as accepted by `Root::commit`
#[derive(Debug, Clone)]
pub enum Operation {
    UpdateText {
        text: Text,
        content: String,
    },

    UpdateProps {
        component: Component,
        patch: PropMap,
    },

    AppendChild {
        container: Container,
        child: Child,
    },

    InsertChildBefore {
        container: Container,
        child: Child,
        before: Node,
    },

    RemoveChild {
        container: Container,
        child: Node,
    },
}

/// Deliveries started by one mutation.
///
/// Empty when the target was not connected. Dropping it does not cancel
/// anything.
#[derive(Default)]
pub struct Dispatch {
    deliveries: Vec<Delivery>,
}

impl Dispatch {
    /// Whether any command was sent
    pub fn is_forwarded(&self) -> bool {
        !self.deliveries.is_empty()
    }

    /// Number of commands sent (two for a move between connected containers)
    pub fn len(&self) -> usize {
        self.deliveries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deliveries.is_empty()
    }

    /// Wait for every delivery; the first failure is returned
    pub async fn settled(self) -> Result<(), ChannelError> {
        join_all(self.deliveries).await.into_iter().collect()
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("deliveries", &self.deliveries.len())
            .finish()
    }
}

/// A validated mutation against arena ids
#[derive(Debug)]
enum Mutation {
    SetText {
        id: NodeId,
        text: String,
    },
    MergeProps {
        id: NodeId,
        patch: PropMap,
    },
    Insert {
        container: Link,
        child: NodeId,
        before: Option<NodeId>,
    },
    Remove {
        container: Link,
        child: NodeId,
    },
}

impl Mutation {
    /// The node whose connectivity decides whether the mutation is forwarded
    fn target(&self) -> Link {
        match self {
            Mutation::SetText { id, .. } | Mutation::MergeProps { id, .. } => {
                Link::Node(id.clone())
            }
            Mutation::Insert { container, .. } | Mutation::Remove { container, .. } => {
                container.clone()
            }
        }
    }

    /// The node a removal detaches, if this is one
    fn detaches(&self) -> Option<(Link, NodeId)> {
        match self {
            Mutation::Remove { container, child } => Some((container.clone(), child.clone())),
            _ => None,
        }
    }
}

struct Plan {
    forward: Option<RemoteCommand>,
    local: Mutation,
}

/// Wrap a channel failure, naming the removal that already went through
fn interrupted(detached: &Option<(Link, NodeId)>, error: ChannelError) -> TreeError {
    match detached {
        Some((from, child)) => TreeError::MoveInterrupted {
            child: child.clone(),
            from: from.wire_id(),
            source: error,
        },
        None => TreeError::Channel(error),
    }
}

fn index_in(state: &TreeState, container: &Link, child: &NodeId) -> Result<usize, TreeError> {
    state
        .index_of(container, child)
        .ok_or_else(|| TreeError::NotAChild {
            container: container.wire_id(),
            child: child.clone(),
        })
}

impl Tree {
    pub(crate) fn dispatch(&self, operation: Operation) -> Result<Dispatch, TreeError> {
        let mutations = self.resolve(operation)?;
        if self.options.delivery == DeliveryMode::Strict
            && mutations.iter().any(|mutation| self.is_forwarded(mutation))
        {
            return Err(TreeError::StrictRequiresCommit);
        }

        let mut dispatch = Dispatch::default();
        let mut detached = None;

        for mutation in mutations {
            let plan = self.plan(mutation)?;

            if let Some(command) = plan.forward {
                debug!(method = command.method(), "forwarding command");
                let delivery = self
                    .channel
                    .send(command)
                    .map_err(|err| interrupted(&detached, err))?;
                dispatch.deliveries.push(delivery);
            }

            detached = plan.local.detaches();
            self.apply(plan.local)?;
        }

        Ok(dispatch)
    }

    pub(crate) async fn dispatch_strict(&self, operation: Operation) -> Result<(), TreeError> {
        let mut detached = None;

        for mutation in self.resolve(operation)? {
            let plan = self.plan(mutation)?;

            if let Some(command) = plan.forward {
                debug!(method = command.method(), "forwarding command, awaiting delivery");
                let delivery = self
                    .channel
                    .send(command)
                    .map_err(|err| interrupted(&detached, err))?;
                delivery.await.map_err(|err| interrupted(&detached, err))?;
            }

            detached = plan.local.detaches();
            self.apply(plan.local)?;
        }

        Ok(())
    }

    pub(crate) fn mount(&self) -> Result<Dispatch, TreeError> {
        let children = serialize_children(&self.state.borrow(), &Link::Root);
        debug!(children = children.len(), "mounting tree");

        let delivery = self.channel.send(RemoteCommand::Mount { children })?;
        Ok(Dispatch {
            deliveries: vec![delivery],
        })
    }

    /// Validate an operation and turn it into arena mutations.
    ///
    /// Content children become new text nodes here. Attaching a node that
    /// already has a parent yields a removal from that parent first.
    fn resolve(&self, operation: Operation) -> Result<Vec<Mutation>, TreeError> {
        match operation {
            Operation::UpdateText { text, content } => {
                self.check_owned(&text.tree, &text.id)?;
                Ok(vec![Mutation::SetText {
                    id: text.id,
                    text: content,
                }])
            }

            Operation::UpdateProps { component, patch } => {
                self.check_owned(&component.tree, &component.id)?;
                Ok(vec![Mutation::MergeProps {
                    id: component.id,
                    patch,
                }])
            }

            Operation::AppendChild { container, child } => {
                self.resolve_insert(&container, child, None)
            }

            Operation::InsertChildBefore {
                container,
                child,
                before,
            } => self.resolve_insert(&container, child, Some(before)),

            Operation::RemoveChild { container, child } => {
                let container = self.container_link(&container)?;
                self.check_owned(child.tree(), child.id())?;

                let child = child.id().clone();
                index_in(&self.state.borrow(), &container, &child)?;

                Ok(vec![Mutation::Remove { container, child }])
            }
        }
    }

    fn resolve_insert(
        &self,
        container: &Container,
        child: Child,
        before: Option<Node>,
    ) -> Result<Vec<Mutation>, TreeError> {
        let container = self.container_link(container)?;

        let before = match before {
            Some(before) => {
                self.check_owned(before.tree(), before.id())?;
                let before = before.id().clone();
                index_in(&self.state.borrow(), &container, &before)?;
                Some(before)
            }
            None => None,
        };

        let child = match child {
            Child::Content(content) => {
                let id = self.state.borrow_mut().insert_text(content);
                trace!(%id, "created text from content");
                id
            }
            Child::Node(node) => {
                self.check_owned(node.tree(), node.id())?;
                node.id().clone()
            }
        };

        if before.as_ref() == Some(&child) {
            return Err(TreeError::NotAChild {
                container: container.wire_id(),
                child,
            });
        }

        let previous = {
            let state = self.state.borrow();
            if state.would_create_cycle(&container, &child) {
                return Err(TreeError::Cycle {
                    container: container.wire_id(),
                    child,
                });
            }
            state.parent(&child)
        };

        let mut mutations = Vec::with_capacity(2);
        if let Some(previous) = previous {
            mutations.push(Mutation::Remove {
                container: previous,
                child: child.clone(),
            });
        }
        mutations.push(Mutation::Insert {
            container,
            child,
            before,
        });

        Ok(mutations)
    }

    /// Decide what, if anything, to forward. Indices and serialized
    /// subtrees are taken from the state before the local effect.
    fn plan(&self, mutation: Mutation) -> Result<Plan, TreeError> {
        if !self.is_forwarded(&mutation) {
            return Ok(Plan {
                forward: None,
                local: mutation,
            });
        }
        let state = self.state.borrow();

        let command = match &mutation {
            Mutation::SetText { id, text } => RemoteCommand::UpdateText {
                text_id: id.clone(),
                text: text.clone(),
            },
            Mutation::MergeProps { id, patch } => RemoteCommand::UpdateProps {
                component_id: id.clone(),
                patch: patch.clone(),
            },
            Mutation::Insert {
                container,
                child,
                before,
            } => {
                let index = match before {
                    Some(before) => index_in(&state, container, before)?,
                    None => state.children(container).map_or(0, Vec::len),
                };
                let child = serialize(&state, child)
                    .ok_or_else(|| TreeError::ForeignNode(child.clone()))?;

                RemoteCommand::InsertChild {
                    container_id: container.wire_id(),
                    index,
                    child,
                }
            }
            Mutation::Remove { container, child } => RemoteCommand::RemoveChild {
                container_id: container.wire_id(),
                index: index_in(&state, container, child)?,
            },
        };

        Ok(Plan {
            forward: Some(command),
            local: mutation,
        })
    }

    fn apply(&self, mutation: Mutation) -> Result<(), TreeError> {
        trace!(?mutation, "applying locally");
        let mut state = self.state.borrow_mut();

        match mutation {
            Mutation::SetText { id, text } => {
                let data = state.nodes.get_mut(&id).map(|record| &mut record.data);
                if let Some(NodeData::Text { text: current }) = data {
                    *current = text;
                }
            }

            Mutation::MergeProps { id, patch } => {
                let data = state.nodes.get_mut(&id).map(|record| &mut record.data);
                if let Some(NodeData::Component { props, .. }) = data {
                    let mut merged = (**props).clone();
                    merged.extend(patch);
                    *props = Rc::new(merged);
                }
            }

            Mutation::Insert {
                container,
                child,
                before,
            } => {
                let index = match &before {
                    Some(before) => index_in(&state, &container, before)?,
                    None => state.children(&container).map_or(0, Vec::len),
                };
                let top = state.top_of(&container);

                if let Some(children) = state.children_mut(&container) {
                    children.insert(index, child.clone());
                }
                if let Some(record) = state.nodes.get_mut(&child) {
                    record.parent = Some(container);
                }
                state.propagate_top(&child, &top);
            }

            Mutation::Remove { container, child } => {
                let index = index_in(&state, &container, &child)?;

                if let Some(children) = state.children_mut(&container) {
                    children.remove(index);
                }
                if let Some(record) = state.nodes.get_mut(&child) {
                    record.parent = None;
                }
                let top = Link::Node(child.clone());
                state.propagate_top(&child, &top);
            }
        }

        Ok(())
    }

    /// Whether the mutation's target is the root or connected to it
    fn is_forwarded(&self, mutation: &Mutation) -> bool {
        match mutation.target() {
            Link::Root => true,
            Link::Node(id) => self.state.borrow().is_connected(&id),
        }
    }

    fn container_link(&self, container: &Container) -> Result<Link, TreeError> {
        match container {
            Container::Root(root) if self.owns(&root.tree) => Ok(Link::Root),
            Container::Root(_) => Err(TreeError::ForeignNode(NodeId::root())),
            Container::Component(component) => {
                self.check_owned(&component.tree, &component.id)?;
                Ok(Link::Node(component.id.clone()))
            }
        }
    }

    fn check_owned(&self, tree: &Rc<Tree>, id: &NodeId) -> Result<(), TreeError> {
        if self.owns(tree) {
            Ok(())
        } else {
            Err(TreeError::ForeignNode(id.clone()))
        }
    }
}
