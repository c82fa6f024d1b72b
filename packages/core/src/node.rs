//! Arena records backing every handle of one tree

use crate::id_generator::IDGenerator;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Component props: an immutable snapshot, replaced wholesale on update
pub type PropMap = Map<String, Value>;

/// Wire id addressing the root container
pub const ROOT_ID: &str = "~";

/// Opaque node identifier, unique within one tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn root() -> Self {
        NodeId(ROOT_ID.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to either the root or a node, used for `parent` and `top`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Link {
    Root,
    Node(NodeId),
}

impl Link {
    pub(crate) fn wire_id(&self) -> NodeId {
        match self {
            Link::Root => NodeId::root(),
            Link::Node(id) => id.clone(),
        }
    }
}

pub(crate) enum NodeData {
    Component {
        kind: Rc<str>,
        props: Rc<PropMap>,
        children: Vec<NodeId>,
    },
    Text {
        text: String,
    },
}

pub(crate) struct NodeRecord {
    pub(crate) parent: Option<Link>,
    pub(crate) top: Link,
    pub(crate) data: NodeData,
}

impl NodeRecord {
    pub(crate) fn children(&self) -> Option<&Vec<NodeId>> {
        match &self.data {
            NodeData::Component { children, .. } => Some(children),
            NodeData::Text { .. } => None,
        }
    }

    pub(crate) fn props(&self) -> Option<&Rc<PropMap>> {
        match &self.data {
            NodeData::Component { props, .. } => Some(props),
            NodeData::Text { .. } => None,
        }
    }

    pub(crate) fn text(&self) -> Option<&str> {
        match &self.data {
            NodeData::Text { text } => Some(text),
            NodeData::Component { .. } => None,
        }
    }
}

/// All mutable state of one tree
pub(crate) struct TreeState {
    pub(crate) ids: IDGenerator,
    pub(crate) nodes: HashMap<NodeId, NodeRecord>,
    pub(crate) root_children: Vec<NodeId>,
}

impl TreeState {
    pub(crate) fn new() -> Self {
        Self {
            ids: IDGenerator::new(),
            nodes: HashMap::new(),
            root_children: Vec::new(),
        }
    }

    pub(crate) fn insert_component(&mut self, kind: Rc<str>, props: PropMap) -> NodeId {
        self.insert(NodeData::Component {
            kind,
            props: Rc::new(props),
            children: Vec::new(),
        })
    }

    pub(crate) fn insert_text(&mut self, text: String) -> NodeId {
        self.insert(NodeData::Text { text })
    }

    fn insert(&mut self, data: NodeData) -> NodeId {
        let id = self.ids.new_id();
        self.nodes.insert(
            id.clone(),
            NodeRecord {
                parent: None,
                top: Link::Node(id.clone()),
                data,
            },
        );
        id
    }

    pub(crate) fn children(&self, container: &Link) -> Option<&Vec<NodeId>> {
        match container {
            Link::Root => Some(&self.root_children),
            Link::Node(id) => self.nodes.get(id).and_then(NodeRecord::children),
        }
    }

    pub(crate) fn children_mut(&mut self, container: &Link) -> Option<&mut Vec<NodeId>> {
        match container {
            Link::Root => Some(&mut self.root_children),
            Link::Node(id) => match self.nodes.get_mut(id).map(|record| &mut record.data) {
                Some(NodeData::Component { children, .. }) => Some(children),
                _ => None,
            },
        }
    }

    /// Position of `child` among `container`'s children, matched by identity
    pub(crate) fn index_of(&self, container: &Link, child: &NodeId) -> Option<usize> {
        self.children(container)?.iter().position(|id| id == child)
    }
}
