use serde::{Deserialize, Serialize};

/// How `Root::commit` orders the remote and local halves of a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryMode {
    /// Send without waiting, apply locally at once. Remote delivery may be
    /// observed in a different order than the local mutations.
    #[default]
    Detached,

    /// Await the remote delivery, then apply locally. A failed delivery
    /// skips the local effect. Connected mutations must go through
    /// `Root::commit`; the direct handle methods refuse them.
    Strict,
}

/// Options fixed when a root is created
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootOptions {
    /// Component types the tree is meant to contain. Empty means any.
    /// Not enforced by the tree itself.
    #[serde(default)]
    pub components: Vec<String>,

    #[serde(default)]
    pub delivery: DeliveryMode,
}

impl RootOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_components<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components = components.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryMode) -> Self {
        self.delivery = delivery;
        self
    }

    /// Whether `kind` is in the allowed component list
    pub fn allows(&self, kind: &str) -> bool {
        self.components.is_empty() || self.components.iter().any(|allowed| allowed == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_options() {
        let json = r#"{ "components": ["Button", "Stack"], "delivery": "strict" }"#;

        let options: RootOptions = serde_json::from_str(json).unwrap();
        assert_eq!(options.components, vec!["Button", "Stack"]);
        assert_eq!(options.delivery, DeliveryMode::Strict);
        assert!(options.allows("Button"));
        assert!(!options.allows("Image"));
    }

    #[test]
    fn test_default_options_allow_everything() {
        let options: RootOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, RootOptions::default());
        assert_eq!(options.delivery, DeliveryMode::Detached);
        assert!(options.allows("Anything"));
    }
}
