//! Shared helpers for core integration tests

#![allow(dead_code)]

use futures::future::{self, FutureExt};
use remote_tree_core::{
    ChannelError, Delivery, PropMap, RemoteChannel, RemoteCommand, Root, SerializedNode,
};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

/// Records every command and reports immediate success
#[derive(Default)]
pub struct Recorder {
    commands: RefCell<Vec<RemoteCommand>>,
}

impl Recorder {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn commands(&self) -> Vec<RemoteCommand> {
        self.commands.borrow().clone()
    }

    pub fn take(&self) -> Vec<RemoteCommand> {
        std::mem::take(&mut *self.commands.borrow_mut())
    }

    pub fn methods(&self) -> Vec<&'static str> {
        self.commands.borrow().iter().map(RemoteCommand::method).collect()
    }
}

impl RemoteChannel for Recorder {
    fn send(&self, command: RemoteCommand) -> Result<Delivery, ChannelError> {
        self.commands.borrow_mut().push(command);
        Ok(future::ready(Ok(())).boxed())
    }
}

pub fn props(value: Value) -> PropMap {
    match value {
        Value::Object(map) => map,
        _ => PropMap::new(),
    }
}

/// Every node id reachable from the root by walking children
pub fn reachable_ids(root: &Root) -> Vec<String> {
    fn walk(node: &SerializedNode, out: &mut Vec<String>) {
        out.push(node.id().to_string());
        for child in node.children() {
            walk(child, out);
        }
    }

    let mut out = Vec::new();
    for node in root.serialize() {
        walk(&node, &mut out);
    }
    out
}
