//! Transferable encoding of nodes and subtrees.
//!
//! Serialization always reads current state; nothing is cached between calls.

use crate::node::{Link, NodeData, NodeId, PropMap, TreeState};
use serde::{Deserialize, Serialize};

/// Serialized node as sent to the remote side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerializedNode {
    Component {
        id: NodeId,
        #[serde(rename = "type")]
        kind: String,
        props: PropMap,
        children: Vec<SerializedNode>,
    },

    Text {
        id: NodeId,
        text: String,
    },
}

impl SerializedNode {
    pub fn id(&self) -> &NodeId {
        match self {
            SerializedNode::Component { id, .. } | SerializedNode::Text { id, .. } => id,
        }
    }

    pub fn children(&self) -> &[SerializedNode] {
        match self {
            SerializedNode::Component { children, .. } => children,
            SerializedNode::Text { .. } => &[],
        }
    }
}

/// Serialize `id` and its whole subtree, or `None` if the tree has no such node
pub(crate) fn serialize(state: &TreeState, id: &NodeId) -> Option<SerializedNode> {
    let record = state.nodes.get(id)?;

    let node = match &record.data {
        NodeData::Text { text } => SerializedNode::Text {
            id: id.clone(),
            text: text.clone(),
        },
        NodeData::Component {
            kind,
            props,
            children,
        } => SerializedNode::Component {
            id: id.clone(),
            kind: kind.to_string(),
            props: (**props).clone(),
            children: children
                .iter()
                .filter_map(|child| serialize(state, child))
                .collect(),
        },
    };

    Some(node)
}

/// Serialize every child of `container`, in order
pub(crate) fn serialize_children(state: &TreeState, container: &Link) -> Vec<SerializedNode> {
    state
        .children(container)
        .map(|children| {
            children
                .iter()
                .filter_map(|child| serialize(state, child))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_serializes_to_id_and_text_only() {
        let mut state = TreeState::new();
        let id = state.insert_text("hello".to_string());

        let value = serde_json::to_value(serialize(&state, &id).unwrap()).unwrap();
        assert_eq!(value, json!({ "id": "0", "text": "hello" }));
    }

    #[test]
    fn test_component_serializes_children_in_order() {
        let mut state = TreeState::new();
        let mut props = PropMap::new();
        props.insert("label".to_string(), json!("Go"));
        let parent = state.insert_component("Button".into(), props);
        let first = state.insert_text("a".to_string());
        let second = state.insert_text("b".to_string());

        let link = Link::Node(parent.clone());
        state.children_mut(&link).unwrap().extend([second.clone(), first.clone()]);

        let value = serde_json::to_value(serialize(&state, &parent).unwrap()).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "0",
                "type": "Button",
                "props": { "label": "Go" },
                "children": [
                    { "id": "2", "text": "b" },
                    { "id": "1", "text": "a" }
                ]
            })
        );
    }

    #[test]
    fn test_deserialize_distinguishes_variants() {
        let text: SerializedNode =
            serde_json::from_value(json!({ "id": "4", "text": "x" })).unwrap();
        assert!(matches!(text, SerializedNode::Text { .. }));

        let component: SerializedNode = serde_json::from_value(json!({
            "id": "5", "type": "Stack", "props": {}, "children": [{ "id": "6", "text": "y" }]
        }))
        .unwrap();
        assert_eq!(component.children().len(), 1);
        assert_eq!(component.id().as_str(), "5");
    }
}
