//! Macrosteps: one external microstep followed by eventless and internally
//! raised microsteps until nothing more is enabled.

use crate::core::{ActionObject, Event};
use crate::engine::microstep::{Snapshot, Step};
use crate::engine::Engine;
use crate::error::{StatechartError, StatechartResult};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// Upper bound on microsteps in one macrostep.
pub(crate) const MAX_MICROSTEPS: usize = 1024;

/// Outcome of a macrostep.
#[derive(Clone, Debug)]
pub(crate) struct Settled {
    pub(crate) snapshot: Snapshot,
    pub(crate) actions: Vec<ActionObject>,
    /// Follow-up microsteps taken after the triggering one.
    pub(crate) microsteps: usize,
}

impl Engine<'_> {
    /// Dispatch `event` against `from` and settle.
    pub(crate) fn macrostep(&self, from: Snapshot, event: &Event) -> StatechartResult<Settled> {
        let selected = self.select(&from.configuration, &from.context, event, false)?;
        let step = if selected.is_empty() {
            Step {
                snapshot: from,
                actions: Vec::new(),
                raised: Vec::new(),
            }
        } else {
            trace!(
                event = %event.name,
                transitions = selected.len(),
                "statechart_microstep"
            );
            self.microstep(&from, &selected, event)?
        };
        self.settle(step, event)
    }

    /// Enter the initial configuration and settle.
    pub(crate) fn initial_macrostep(&self, context: serde_json::Value, event: &Event) -> StatechartResult<Settled> {
        let step = self.enter_initial(context, event)?;
        self.settle(step, event)
    }

    /// Chain eventless microsteps, then internal events, until stable.
    ///
    /// Reproducing a (configuration, context) pair already seen since the
    /// last internal event means the eventless transitions cycle. The context
    /// is part of the key on purpose: a guarded eventless loop that counts
    /// in context revisits the same configuration without cycling, and only
    /// the microstep ceiling bounds it.
    fn settle(&self, first: Step, trigger: &Event) -> StatechartResult<Settled> {
        let Step {
            mut snapshot,
            mut actions,
            raised,
        } = first;
        let mut queue: VecDeque<Event> = raised.into();
        let mut current = trigger.clone();
        let mut seen = vec![(snapshot.configuration.clone(), snapshot.context.clone())];
        let mut microsteps = 0;

        loop {
            let eventless = self.select(&snapshot.configuration, &snapshot.context, &current, true)?;
            let step = if !eventless.is_empty() {
                self.microstep(&snapshot, &eventless, &current)?
            } else if let Some(internal) = queue.pop_front() {
                current = internal;
                seen.clear();
                seen.push((snapshot.configuration.clone(), snapshot.context.clone()));
                let selected = self.select(&snapshot.configuration, &snapshot.context, &current, false)?;
                if selected.is_empty() {
                    continue;
                }
                self.microstep(&snapshot, &selected, &current)?
            } else {
                break;
            };

            microsteps += 1;
            trace!(
                event = %current.name,
                microstep = microsteps,
                raised = step.raised.len(),
                "statechart_microstep"
            );

            let key = (step.snapshot.configuration.clone(), step.snapshot.context.clone());
            if microsteps >= MAX_MICROSTEPS || seen.contains(&key) {
                debug!(
                    machine = %self.definition.id(),
                    event = %trigger.name,
                    microsteps,
                    "statechart_infinite_microstep"
                );
                return Err(StatechartError::InfiniteMicrostep {
                    machine: self.definition.id().to_string(),
                    steps: microsteps,
                    configuration: self.definition.node_ids(&step.snapshot.configuration),
                });
            }
            seen.push(key);

            actions.extend(step.actions);
            queue.extend(step.raised);
            snapshot = step.snapshot;
        }

        trace!(event = %trigger.name, microsteps, "statechart_settled");
        Ok(Settled {
            snapshot,
            actions,
            microsteps,
        })
    }
}
