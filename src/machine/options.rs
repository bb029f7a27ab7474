//! Implementation registries.
//!
//! Definitions refer to actions, guards, services, activities and delays by
//! name. `MachineOptions` maps those names to implementations. Only guards
//! are consulted while computing transitions; the other categories are for
//! whatever interpreter executes the emitted descriptors.

use crate::core::{ActionFn, ActionObject, Delay, Event, Guard};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Invoked service body: resolves with a result or fails with a message.
pub type ServiceFn = Arc<dyn Fn(&Value, &Event) -> Result<Value, String> + Send + Sync>;

/// Long-running activity body.
pub type ActivityFn = Arc<dyn Fn(&Value, &Event) + Send + Sync>;

/// Computes a named delay from the context and event.
pub type DelayFn = Arc<dyn Fn(&Value, &Event) -> Duration + Send + Sync>;

/// Name → implementation registries, one per category.
///
/// # Example
///
/// ```rust
/// use harel::MachineOptions;
/// use serde_json::json;
///
/// let options = MachineOptions::new()
///     .guard("hasFunds", |context, _| context["balance"].as_i64() > Some(0))
///     .action("notify", |_, _| {});
///
/// assert!(options.guards.contains_key("hasFunds"));
/// assert!(options.actions.contains_key("notify"));
/// ```
#[derive(Clone, Default)]
pub struct MachineOptions {
    pub actions: HashMap<String, ActionFn>,
    pub guards: HashMap<String, Guard>,
    pub services: HashMap<String, ServiceFn>,
    pub activities: HashMap<String, ActivityFn>,
    pub delays: HashMap<String, DelayFn>,
}

impl MachineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action<F>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&Value, &Event) + Send + Sync + 'static,
    {
        self.actions.insert(name.into(), Arc::new(action));
        self
    }

    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Value, &Event) -> bool + Send + Sync + 'static,
    {
        self.guards.insert(name.into(), Guard::new(predicate));
        self
    }

    pub fn service<F>(mut self, name: impl Into<String>, service: F) -> Self
    where
        F: Fn(&Value, &Event) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    pub fn activity<F>(mut self, name: impl Into<String>, activity: F) -> Self
    where
        F: Fn(&Value, &Event) + Send + Sync + 'static,
    {
        self.activities.insert(name.into(), Arc::new(activity));
        self
    }

    pub fn delay<F>(mut self, name: impl Into<String>, delay: F) -> Self
    where
        F: Fn(&Value, &Event) -> Duration + Send + Sync + 'static,
    {
        self.delays.insert(name.into(), Arc::new(delay));
        self
    }

    /// Merge `overrides` into these options, category by category.
    ///
    /// Keys present in `overrides` replace existing ones; every other key is
    /// kept.
    pub fn merge(mut self, overrides: MachineOptions) -> Self {
        self.actions.extend(overrides.actions);
        self.guards.extend(overrides.guards);
        self.services.extend(overrides.services);
        self.activities.extend(overrides.activities);
        self.delays.extend(overrides.delays);
        self
    }

    /// Implementation of an emitted action descriptor, if it has one.
    ///
    /// Inline actions carry their own; named actions are looked up in the
    /// `actions` registry. Built-in descriptors (send, cancel, start, stop)
    /// have no implementation here.
    pub fn resolve_action(&self, action: &ActionObject) -> Option<ActionFn> {
        match action {
            ActionObject::Named(name) => self.actions.get(name).cloned(),
            ActionObject::Inline { exec, .. } => Some(Arc::clone(exec)),
            _ => None,
        }
    }

    /// Concrete duration of a delay: literal milliseconds, or a named delay
    /// evaluated against the context and event.
    pub fn resolve_delay(&self, delay: &Delay, context: &Value, event: &Event) -> Option<Duration> {
        match delay {
            Delay::Millis(_) => delay.as_duration(),
            Delay::Named(name) => self.delays.get(name).map(|resolve| resolve(context, event)),
        }
    }
}

impl fmt::Debug for MachineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn names<V>(registry: &HashMap<String, V>) -> Vec<&str> {
            let mut names: Vec<&str> = registry.keys().map(String::as_str).collect();
            names.sort_unstable();
            names
        }

        f.debug_struct("MachineOptions")
            .field("actions", &names(&self.actions))
            .field("guards", &names(&self.guards))
            .field("services", &names(&self.services))
            .field("activities", &names(&self.activities))
            .field("delays", &names(&self.delays))
            .finish()
    }
}
