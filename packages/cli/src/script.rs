//! Mutation scripts: a JSON array of steps run against one root.
//!
//! Nodes are bound to names when created and referred to by name in later
//! steps. `root` always names the tree root.

use remote_tree_core::{
    Child, Component, Container, Dispatch, Node, Operation, PropMap, Root, RootOptions, Text,
    TreeError,
};
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub const ROOT_NAME: &str = "root";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    CreateComponent {
        name: String,
        #[serde(rename = "type")]
        kind: String,
        #[serde(default)]
        props: PropMap,
    },

    CreateText {
        name: String,
        text: String,
    },

    /// Append a named node (`child`) or new text content (`text`)
    AppendChild {
        parent: String,
        child: Option<String>,
        text: Option<String>,
    },

    InsertChildBefore {
        parent: String,
        child: Option<String>,
        text: Option<String>,
        before: String,
    },

    RemoveChild {
        parent: String,
        child: String,
    },

    UpdateProps {
        target: String,
        patch: PropMap,
    },

    UpdateText {
        target: String,
        text: String,
    },

    Mount,
}

impl Step {
    /// Wire-style name of the step, as written in scripts
    pub fn op(&self) -> &'static str {
        match self {
            Step::CreateComponent { .. } => "createComponent",
            Step::CreateText { .. } => "createText",
            Step::AppendChild { .. } => "appendChild",
            Step::InsertChildBefore { .. } => "insertChildBefore",
            Step::RemoveChild { .. } => "removeChild",
            Step::UpdateProps { .. } => "updateProps",
            Step::UpdateText { .. } => "updateText",
            Step::Mount => "mount",
        }
    }
}

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Step {step}: component type `{kind}` is not allowed by the config")]
    DisallowedComponent { step: usize, kind: String },

    #[error("Step {step}: `{name}` is reserved")]
    ReservedName { step: usize, name: String },

    #[error("Step {step}: `{name}` is already bound")]
    DuplicateName { step: usize, name: String },

    #[error("Step {step}: unknown node `{name}`")]
    UnknownName { step: usize, name: String },

    #[error("Step {step}: `{name}` is not a component")]
    NotAComponent { step: usize, name: String },

    #[error("Step {step}: `{name}` is not a text node")]
    NotText { step: usize, name: String },

    #[error("Step {step}: give exactly one of `child` or `text`")]
    AmbiguousChild { step: usize },

    #[error("Step {step} ({op}) failed: {source}")]
    Tree {
        step: usize,
        op: &'static str,
        #[source]
        source: TreeError,
    },
}

pub fn parse_script(source: &str) -> Result<Vec<Step>, ScriptError> {
    Ok(serde_json::from_str(source)?)
}

/// Reject component types the options do not allow, before anything runs
pub fn validate(steps: &[Step], options: &RootOptions) -> Result<(), ScriptError> {
    for (index, step) in steps.iter().enumerate() {
        if let Step::CreateComponent { kind, .. } = step {
            if !options.allows(kind) {
                return Err(ScriptError::DisallowedComponent {
                    step: index + 1,
                    kind: kind.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Runs steps against a root, keeping track of named nodes
pub struct Session {
    root: Root,
    bindings: HashMap<String, Node>,
}

impl Session {
    pub fn new(root: Root) -> Self {
        Self {
            root,
            bindings: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    /// Run one step; `step` is 1-based and only used for error reporting.
    ///
    /// Mutations go through `Root::commit`, so strict delivery is honoured.
    pub async fn run(
        &mut self,
        step: usize,
        action: Step,
    ) -> Result<Option<Dispatch>, ScriptError> {
        let op = action.op();
        debug!(step, op, "running step");

        let operation = match action {
            Step::CreateComponent { name, kind, props } => {
                self.check_free(step, &name)?;
                let component = self.root.create_component(kind, props);
                self.bindings.insert(name, component.into());
                return Ok(None);
            }

            Step::CreateText { name, text } => {
                self.check_free(step, &name)?;
                let text = self.root.create_text(text);
                self.bindings.insert(name, text.into());
                return Ok(None);
            }

            Step::Mount => {
                let dispatch = self
                    .root
                    .mount()
                    .map_err(|source| ScriptError::Tree { step, op, source })?;
                return Ok(Some(dispatch));
            }

            Step::AppendChild { parent, child, text } => Operation::AppendChild {
                container: self.container(step, &parent)?,
                child: self.child(step, child, text)?,
            },

            Step::InsertChildBefore {
                parent,
                child,
                text,
                before,
            } => Operation::InsertChildBefore {
                container: self.container(step, &parent)?,
                child: self.child(step, child, text)?,
                before: self.node(step, &before)?,
            },

            Step::RemoveChild { parent, child } => Operation::RemoveChild {
                container: self.container(step, &parent)?,
                child: self.node(step, &child)?,
            },

            Step::UpdateProps { target, patch } => Operation::UpdateProps {
                component: self.component(step, &target)?,
                patch,
            },

            Step::UpdateText { target, text } => Operation::UpdateText {
                text: self.text(step, &target)?,
                content: text,
            },
        };

        let dispatch = self
            .root
            .commit(operation)
            .await
            .map_err(|source| ScriptError::Tree { step, op, source })?;
        Ok(Some(dispatch))
    }

    fn check_free(&self, step: usize, name: &str) -> Result<(), ScriptError> {
        if name == ROOT_NAME {
            return Err(ScriptError::ReservedName {
                step,
                name: name.to_string(),
            });
        }
        if self.bindings.contains_key(name) {
            return Err(ScriptError::DuplicateName {
                step,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn node(&self, step: usize, name: &str) -> Result<Node, ScriptError> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownName {
                step,
                name: name.to_string(),
            })
    }

    fn component(&self, step: usize, name: &str) -> Result<Component, ScriptError> {
        match self.node(step, name)? {
            Node::Component(component) => Ok(component),
            Node::Text(_) => Err(ScriptError::NotAComponent {
                step,
                name: name.to_string(),
            }),
        }
    }

    fn text(&self, step: usize, name: &str) -> Result<Text, ScriptError> {
        match self.node(step, name)? {
            Node::Text(text) => Ok(text),
            Node::Component(_) => Err(ScriptError::NotText {
                step,
                name: name.to_string(),
            }),
        }
    }

    fn container(&self, step: usize, name: &str) -> Result<Container, ScriptError> {
        if name == ROOT_NAME {
            return Ok(Container::Root(self.root.clone()));
        }
        self.component(step, name).map(Container::Component)
    }

    fn child(
        &self,
        step: usize,
        child: Option<String>,
        text: Option<String>,
    ) -> Result<Child, ScriptError> {
        match (child, text) {
            (Some(name), None) => self.node(step, &name).map(Child::from),
            (None, Some(content)) => Ok(Child::from(content)),
            _ => Err(ScriptError::AmbiguousChild { step }),
        }
    }
}
