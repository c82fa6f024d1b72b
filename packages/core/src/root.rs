//! # Root & Node Factory
//!
//! A [`Root`] owns the arena shared by every handle it creates and the
//! channel that connected mutations are forwarded through.

use crate::channel::RemoteChannel;
use crate::dispatcher::{Dispatch, Operation};
use crate::errors::TreeError;
use crate::handles::{Child, Component, Container, Node, Text, Top};
use crate::node::{Link, NodeData, NodeId, PropMap, TreeState};
use crate::options::{DeliveryMode, RootOptions};
use crate::serializer::{serialize_children, SerializedNode};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::trace;

/// Shared state behind a root and all of its handles
pub(crate) struct Tree {
    pub(crate) state: RefCell<TreeState>,
    pub(crate) channel: Box<dyn RemoteChannel>,
    pub(crate) options: RootOptions,
}

impl Tree {
    pub(crate) fn owns(&self, other: &Rc<Tree>) -> bool {
        std::ptr::eq(self, Rc::as_ptr(other))
    }

    pub(crate) fn node(self: &Rc<Self>, id: &NodeId) -> Option<Node> {
        let state = self.state.borrow();
        let record = state.nodes.get(id)?;

        let node = match &record.data {
            NodeData::Component { kind, .. } => Node::Component(Component {
                id: id.clone(),
                kind: kind.clone(),
                tree: self.clone(),
            }),
            NodeData::Text { .. } => Node::Text(Text {
                id: id.clone(),
                tree: self.clone(),
            }),
        };
        Some(node)
    }

    pub(crate) fn children(self: &Rc<Self>, container: &Link) -> Vec<Node> {
        let ids = self.state.borrow().children(container).cloned().unwrap_or_default();
        ids.iter().filter_map(|id| self.node(id)).collect()
    }

    pub(crate) fn container(self: &Rc<Self>, link: Link) -> Option<Container> {
        match link {
            Link::Root => Some(Container::Root(Root { tree: self.clone() })),
            Link::Node(id) => match self.node(&id)? {
                Node::Component(component) => Some(Container::Component(component)),
                Node::Text(_) => None,
            },
        }
    }

    pub(crate) fn parent(self: &Rc<Self>, id: &NodeId) -> Option<Container> {
        let parent = self.state.borrow().parent(id)?;
        self.container(parent)
    }

    pub(crate) fn top(self: &Rc<Self>, id: &NodeId) -> Top {
        let top = self.state.borrow().top(id);
        match top {
            Link::Root => Top::Root(Root { tree: self.clone() }),
            Link::Node(top_id) => match self.node(&top_id) {
                Some(node) => Top::Node(node),
                None => Top::Root(Root { tree: self.clone() }),
            },
        }
    }
}

/// Build a root that forwards connected mutations through `channel`
pub fn create_root<C>(channel: C, options: RootOptions) -> Root
where
    C: RemoteChannel + 'static,
{
    Root::new(channel, options)
}

/// Entry point and top-level container of a tree
#[derive(Clone)]
pub struct Root {
    pub(crate) tree: Rc<Tree>,
}

impl Root {
    pub fn new<C>(channel: C, options: RootOptions) -> Self
    where
        C: RemoteChannel + 'static,
    {
        Self {
            tree: Rc::new(Tree {
                state: RefCell::new(TreeState::new()),
                channel: Box::new(channel),
                options,
            }),
        }
    }

    /// Wire id of the root
    pub fn id(&self) -> NodeId {
        NodeId::root()
    }

    pub fn options(&self) -> &RootOptions {
        &self.tree.options
    }

    /// Current top-level children, in order
    pub fn children(&self) -> Vec<Node> {
        self.tree.children(&Link::Root)
    }

    /// Look up a handle for any node created by this root
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.tree.node(id)
    }

    /// Create a detached component. `None` starts it with no props.
    pub fn create_component(
        &self,
        kind: impl Into<String>,
        props: impl Into<Option<PropMap>>,
    ) -> Component {
        let kind: Rc<str> = Rc::from(kind.into());
        let props = props.into().unwrap_or_default();
        let id = self.tree.state.borrow_mut().insert_component(kind.clone(), props);
        trace!(%id, kind = %kind, "created component");

        Component {
            id,
            kind,
            tree: self.tree.clone(),
        }
    }

    pub fn create_text(&self, content: impl Into<String>) -> Text {
        let id = self.tree.state.borrow_mut().insert_text(content.into());
        trace!(%id, "created text");

        Text {
            id,
            tree: self.tree.clone(),
        }
    }

    pub fn append_child(&self, child: impl Into<Child>) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::AppendChild {
            container: Container::Root(self.clone()),
            child: child.into(),
        })
    }

    pub fn insert_child_before(
        &self,
        child: impl Into<Child>,
        before: impl Into<Node>,
    ) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::InsertChildBefore {
            container: Container::Root(self.clone()),
            child: child.into(),
            before: before.into(),
        })
    }

    pub fn remove_child(&self, child: impl Into<Node>) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::RemoveChild {
            container: Container::Root(self.clone()),
            child: child.into(),
        })
    }

    /// Send the whole current tree to the remote side.
    ///
    /// Every call re-serializes and resends; there is no guard against
    /// mounting twice.
    pub fn mount(&self) -> Result<Dispatch, TreeError> {
        self.tree.mount()
    }

    /// Apply `operation` honouring the configured [`DeliveryMode`].
    ///
    /// In strict mode the returned dispatch is already settled and empty.
    /// This is the only way to mutate connected nodes of a strict root; the
    /// direct methods fail with [`TreeError::StrictRequiresCommit`].
    pub async fn commit(&self, operation: Operation) -> Result<Dispatch, TreeError> {
        match self.tree.options.delivery {
            DeliveryMode::Detached => self.tree.dispatch(operation),
            DeliveryMode::Strict => {
                self.tree.dispatch_strict(operation).await?;
                Ok(Dispatch::default())
            }
        }
    }

    /// Serialized top-level children, as `mount` would send them
    pub fn serialize(&self) -> Vec<SerializedNode> {
        serialize_children(&self.tree.state.borrow(), &Link::Root)
    }
}

impl PartialEq for Root {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.tree, &other.tree)
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.tree.state.borrow();
        f.debug_struct("Root")
            .field("children", &state.root_children)
            .field("nodes", &state.nodes.len())
            .field("issued_ids", &state.ids.issued())
            .finish()
    }
}
