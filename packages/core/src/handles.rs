//! Handles to nodes of a tree.
//!
//! Handles are cheap to clone and compare by identity: two handles are equal
//! when they point at the same node of the same tree.
//!
//! The mutating methods forward immediately. On a strict root they fail
//! with `TreeError::StrictRequiresCommit` for connected nodes.

use crate::dispatcher::{Dispatch, Operation};
use crate::errors::TreeError;
use crate::node::{Link, NodeId, NodeRecord, PropMap};
use crate::root::{Root, Tree};
use crate::serializer::{serialize, SerializedNode};
use std::fmt;
use std::rc::Rc;

#[derive(Clone)]
pub struct Component {
    pub(crate) id: NodeId,
    pub(crate) kind: Rc<str>,
    pub(crate) tree: Rc<Tree>,
}

impl Component {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Component type, fixed at creation
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Current props snapshot. Later updates never change a returned snapshot.
    pub fn props(&self) -> Rc<PropMap> {
        self.tree
            .state
            .borrow()
            .nodes
            .get(&self.id)
            .and_then(NodeRecord::props)
            .cloned()
            .unwrap_or_default()
    }

    pub fn children(&self) -> Vec<Node> {
        self.tree.children(&Link::Node(self.id.clone()))
    }

    pub fn parent(&self) -> Option<Container> {
        self.tree.parent(&self.id)
    }

    pub fn top(&self) -> Top {
        self.tree.top(&self.id)
    }

    pub fn is_connected(&self) -> bool {
        self.tree.state.borrow().is_connected(&self.id)
    }

    pub fn serialize(&self) -> SerializedNode {
        serialize(&self.tree.state.borrow(), &self.id).unwrap_or_else(|| SerializedNode::Component {
            id: self.id.clone(),
            kind: self.kind.to_string(),
            props: PropMap::new(),
            children: Vec::new(),
        })
    }

    /// Shallow-merge `patch` over the current props
    pub fn update_props(&self, patch: PropMap) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::UpdateProps {
            component: self.clone(),
            patch,
        })
    }

    pub fn append_child(&self, child: impl Into<Child>) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::AppendChild {
            container: Container::Component(self.clone()),
            child: child.into(),
        })
    }

    pub fn insert_child_before(
        &self,
        child: impl Into<Child>,
        before: impl Into<Node>,
    ) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::InsertChildBefore {
            container: Container::Component(self.clone()),
            child: child.into(),
            before: before.into(),
        })
    }

    pub fn remove_child(&self, child: impl Into<Node>) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::RemoveChild {
            container: Container::Component(self.clone()),
            child: child.into(),
        })
    }
}

#[derive(Clone)]
pub struct Text {
    pub(crate) id: NodeId,
    pub(crate) tree: Rc<Tree>,
}

impl Text {
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn text(&self) -> String {
        self.tree
            .state
            .borrow()
            .nodes
            .get(&self.id)
            .and_then(NodeRecord::text)
            .map(str::to_string)
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<Container> {
        self.tree.parent(&self.id)
    }

    pub fn top(&self) -> Top {
        self.tree.top(&self.id)
    }

    pub fn is_connected(&self) -> bool {
        self.tree.state.borrow().is_connected(&self.id)
    }

    pub fn serialize(&self) -> SerializedNode {
        serialize(&self.tree.state.borrow(), &self.id).unwrap_or_else(|| SerializedNode::Text {
            id: self.id.clone(),
            text: String::new(),
        })
    }

    pub fn update_text(&self, text: impl Into<String>) -> Result<Dispatch, TreeError> {
        self.tree.dispatch(Operation::UpdateText {
            text: self.clone(),
            content: text.into(),
        })
    }
}

/// Any node that can be a child
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Component(Component),
    Text(Text),
}

impl Node {
    pub fn id(&self) -> &NodeId {
        match self {
            Node::Component(component) => component.id(),
            Node::Text(text) => text.id(),
        }
    }

    pub fn parent(&self) -> Option<Container> {
        match self {
            Node::Component(component) => component.parent(),
            Node::Text(text) => text.parent(),
        }
    }

    pub fn top(&self) -> Top {
        match self {
            Node::Component(component) => component.top(),
            Node::Text(text) => text.top(),
        }
    }

    pub fn is_connected(&self) -> bool {
        match self {
            Node::Component(component) => component.is_connected(),
            Node::Text(text) => text.is_connected(),
        }
    }

    pub fn serialize(&self) -> SerializedNode {
        match self {
            Node::Component(component) => component.serialize(),
            Node::Text(text) => text.serialize(),
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Node::Component(component) => Some(component),
            Node::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            Node::Component(_) => None,
        }
    }

    pub(crate) fn tree(&self) -> &Rc<Tree> {
        match self {
            Node::Component(component) => &component.tree,
            Node::Text(text) => &text.tree,
        }
    }
}

/// Anything that holds children
#[derive(Clone, Debug, PartialEq)]
pub enum Container {
    Root(Root),
    Component(Component),
}

impl Container {
    pub fn id(&self) -> NodeId {
        match self {
            Container::Root(root) => root.id(),
            Container::Component(component) => component.id().clone(),
        }
    }

    pub fn children(&self) -> Vec<Node> {
        match self {
            Container::Root(root) => root.children(),
            Container::Component(component) => component.children(),
        }
    }
}

/// Reachability anchor of a node: the root when connected, otherwise the
/// root node of the detached subtree it belongs to
#[derive(Clone, Debug, PartialEq)]
pub enum Top {
    Root(Root),
    Node(Node),
}

impl Top {
    pub fn is_root(&self) -> bool {
        matches!(self, Top::Root(_))
    }
}

/// Argument of `append_child` / `insert_child_before`: an existing node, or
/// content for a new text node
#[derive(Clone, Debug)]
pub enum Child {
    Node(Node),
    Content(String),
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.tree, &other.tree)
    }
}

impl PartialEq for Text {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && Rc::ptr_eq(&self.tree, &other.tree)
    }
}

impl PartialEq<Component> for Node {
    fn eq(&self, other: &Component) -> bool {
        self.as_component() == Some(other)
    }
}

impl PartialEq<Text> for Node {
    fn eq(&self, other: &Text) -> bool {
        self.as_text() == Some(other)
    }
}

impl PartialEq<Component> for Top {
    fn eq(&self, other: &Component) -> bool {
        matches!(self, Top::Node(node) if node == other)
    }
}

impl PartialEq<Root> for Top {
    fn eq(&self, other: &Root) -> bool {
        matches!(self, Top::Root(root) if root == other)
    }
}

impl PartialEq<Component> for Container {
    fn eq(&self, other: &Component) -> bool {
        matches!(self, Container::Component(component) if component == other)
    }
}

impl PartialEq<Root> for Container {
    fn eq(&self, other: &Root) -> bool {
        matches!(self, Container::Root(root) if root == other)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

impl fmt::Debug for Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Text").field("id", &self.id).finish()
    }
}

impl From<Component> for Node {
    fn from(component: Component) -> Self {
        Node::Component(component)
    }
}

impl From<&Component> for Node {
    fn from(component: &Component) -> Self {
        Node::Component(component.clone())
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

impl From<&Text> for Node {
    fn from(text: &Text) -> Self {
        Node::Text(text.clone())
    }
}

impl From<&Node> for Node {
    fn from(node: &Node) -> Self {
        node.clone()
    }
}

impl From<Node> for Child {
    fn from(node: Node) -> Self {
        Child::Node(node)
    }
}

impl From<&Node> for Child {
    fn from(node: &Node) -> Self {
        Child::Node(node.clone())
    }
}

impl From<Component> for Child {
    fn from(component: Component) -> Self {
        Child::Node(Node::Component(component))
    }
}

impl From<&Component> for Child {
    fn from(component: &Component) -> Self {
        Child::Node(Node::Component(component.clone()))
    }
}

impl From<Text> for Child {
    fn from(text: Text) -> Self {
        Child::Node(Node::Text(text))
    }
}

impl From<&Text> for Child {
    fn from(text: &Text) -> Self {
        Child::Node(Node::Text(text.clone()))
    }
}

impl From<String> for Child {
    fn from(content: String) -> Self {
        Child::Content(content)
    }
}

impl From<&str> for Child {
    fn from(content: &str) -> Self {
        Child::Content(content.to_string())
    }
}
