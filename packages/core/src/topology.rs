//! # Topology
//!
//! `parent` and `top` are stored on every record and updated eagerly.
//! `top` is the root for every node reachable from it; for a detached
//! subtree it is the detached subtree's own root node.
//!
//! `propagate_top` is the only place `top` changes after creation.

use crate::node::{Link, NodeData, NodeId, TreeState};

impl TreeState {
    pub(crate) fn parent(&self, id: &NodeId) -> Option<Link> {
        self.nodes.get(id).and_then(|record| record.parent.clone())
    }

    pub(crate) fn top(&self, id: &NodeId) -> Link {
        self.nodes
            .get(id)
            .map(|record| record.top.clone())
            .unwrap_or_else(|| Link::Node(id.clone()))
    }

    /// `top` of a container; the root anchors itself
    pub(crate) fn top_of(&self, container: &Link) -> Link {
        match container {
            Link::Root => Link::Root,
            Link::Node(id) => self.top(id),
        }
    }

    pub(crate) fn is_connected(&self, id: &NodeId) -> bool {
        self.top(id) == Link::Root
    }

    /// Pre-order walk of `id`'s subtree setting `top` on every node
    pub(crate) fn propagate_top(&mut self, id: &NodeId, top: &Link) {
        let mut stack = vec![id.clone()];

        while let Some(current) = stack.pop() {
            let Some(record) = self.nodes.get_mut(&current) else {
                continue;
            };
            record.top = top.clone();

            if let NodeData::Component { children, .. } = &record.data {
                stack.extend(children.iter().rev().cloned());
            }
        }
    }

    /// True if attaching `child` under `container` would make `child` its own ancestor
    pub(crate) fn would_create_cycle(&self, container: &Link, child: &NodeId) -> bool {
        let mut cursor = Some(container.clone());

        while let Some(Link::Node(id)) = cursor {
            if &id == child {
                return true;
            }
            cursor = self.parent(&id);
        }

        false
    }
}
