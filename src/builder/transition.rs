//! Declarative transitions.

use crate::builder::serde_util::one_or_many;
use crate::core::{ActionObject, Event, Guard, GuardRef};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One candidate transition as written in a definition.
///
/// Targets are strings: a sibling key (`"b"`), a path (`"b.c"`), a child of
/// the declaring state (`".c"`), or an absolute id (`"#payment"`). No
/// target makes the transition targetless.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct TransitionConfig {
    #[serde(default, deserialize_with = "one_or_many")]
    pub target: Vec<String>,

    #[serde(default, alias = "cond")]
    pub guard: Option<GuardRef>,

    #[serde(default, deserialize_with = "one_or_many")]
    pub actions: Vec<ActionObject>,

    #[serde(default)]
    pub internal: Option<bool>,
}

impl TransitionConfig {
    /// A targetless transition.
    pub fn new() -> Self {
        Self::default()
    }

    /// A transition to `target`.
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            target: vec![target.into()],
            ..Self::default()
        }
    }

    /// Add another target (one per parallel region).
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target.push(target.into());
        self
    }

    /// Guard by registry name or with a prebuilt [`Guard`].
    pub fn guard(mut self, guard: impl Into<GuardRef>) -> Self {
        self.guard = Some(guard.into());
        self
    }

    /// Guard with a closure.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Value, &Event) -> bool + Send + Sync + 'static,
    {
        self.guard = Some(GuardRef::Inline(Guard::new(predicate)));
        self
    }

    pub fn action(mut self, action: impl Into<ActionObject>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Override the internal/external default.
    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = Some(internal);
        self
    }
}

/// The ordered candidate list for one event.
///
/// Deserializes from a target string, a transition object, a list of
/// either, or `null` (a forbidden transition that swallows the event).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransitionsConfig(pub Vec<TransitionConfig>);

impl From<&str> for TransitionsConfig {
    fn from(target: &str) -> Self {
        TransitionsConfig(vec![TransitionConfig::to(target)])
    }
}

impl From<String> for TransitionsConfig {
    fn from(target: String) -> Self {
        TransitionsConfig(vec![TransitionConfig::to(target)])
    }
}

impl From<TransitionConfig> for TransitionsConfig {
    fn from(transition: TransitionConfig) -> Self {
        TransitionsConfig(vec![transition])
    }
}

impl From<Vec<TransitionConfig>> for TransitionsConfig {
    fn from(transitions: Vec<TransitionConfig>) -> Self {
        TransitionsConfig(transitions)
    }
}

impl<'de> Deserialize<'de> for TransitionsConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Item {
            Target(String),
            Full(TransitionConfig),
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(Item),
            Many(Vec<Item>),
        }

        let normalize = |item: Item| match item {
            Item::Target(target) => TransitionConfig::to(target),
            Item::Full(config) => config,
        };

        Ok(TransitionsConfig(match Option::<Raw>::deserialize(deserializer)? {
            None => vec![TransitionConfig::new()],
            Some(Raw::One(item)) => vec![normalize(item)],
            Some(Raw::Many(items)) => items.into_iter().map(normalize).collect(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> TransitionsConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn target_strings_become_single_candidates() {
        assert_eq!(parse(r#""b""#), TransitionsConfig::from("b"));
    }

    #[test]
    fn objects_carry_guard_actions_and_internal_flag() {
        let config = parse(r#"{ "target": ".child", "cond": "ready", "actions": "log", "internal": false }"#);

        let expected = TransitionConfig::to(".child")
            .guard("ready")
            .action("log")
            .internal(false);
        assert_eq!(config, TransitionsConfig::from(expected));
    }

    #[test]
    fn candidate_lists_keep_order() {
        let config = parse(r#"[{ "target": "a", "guard": "first" }, "b"]"#);

        assert_eq!(config.0.len(), 2);
        assert_eq!(config.0[0].target, vec!["a"]);
        assert_eq!(config.0[0].guard, Some(GuardRef::Named("first".to_string())));
        assert_eq!(config.0[1], TransitionConfig::to("b"));
    }

    #[test]
    fn null_is_a_forbidden_transition() {
        let config = parse("null");
        assert_eq!(config.0, vec![TransitionConfig::new()]);
    }

    #[test]
    fn multiple_targets_are_accepted() {
        let config = parse(r##"{ "target": ["#x.x2", "#y.y2"] }"##);
        assert_eq!(config.0[0].target, vec!["#x.x2", "#y.y2"]);

        let built = TransitionConfig::to("#x.x2").target("#y.y2");
        assert_eq!(config.0[0], built);
    }

    #[test]
    fn closures_become_inline_guards() {
        let transition = TransitionConfig::to("b").when(|context, _| context.is_null());
        assert!(matches!(transition.guard, Some(GuardRef::Inline(_))));
    }
}
