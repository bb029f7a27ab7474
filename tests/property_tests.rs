//! Property-based tests for the statechart engine.
//!
//! These tests use proptest to drive one hierarchical, parallel machine with
//! history through random event sequences and check that the laws every
//! reachable state must satisfy hold across many generated inputs.

use harel::builder::{StateNodeConfig, TransitionConfig};
use harel::definition::{HistoryKind, NodeKind};
use harel::{ActionObject, Machine, MachineState};
use proptest::prelude::*;
use serde_json::json;

const EVENTS: [&str; 9] = [
    "POWER", "PLAY", "PAUSE", "STOP", "UP", "DOWN", "RESUME", "TICK", "NOPE",
];

fn player() -> Machine {
    let playback = StateNodeConfig::new()
        .initial("stopped")
        .state("stopped", StateNodeConfig::new().on("PLAY", "playing"))
        .state(
            "playing",
            StateNodeConfig::new()
                .on("PAUSE", "paused")
                .on("STOP", "stopped")
                .on(
                    "TICK",
                    TransitionConfig::new().action(ActionObject::assign(|context, _| {
                        json!({ "ticks": (context["ticks"].as_u64().unwrap_or(0) + 1) % 4 })
                    })),
                ),
        )
        .state(
            "paused",
            StateNodeConfig::new().on("PLAY", "playing").on("STOP", "stopped"),
        )
        .state("hist", StateNodeConfig::new().history(HistoryKind::Deep));

    let volume = StateNodeConfig::new()
        .initial("normal")
        .state(
            "normal",
            StateNodeConfig::new().on("UP", "loud").on("DOWN", "muted"),
        )
        .state("loud", StateNodeConfig::new().on("DOWN", "normal"))
        .state(
            "muted",
            StateNodeConfig::new().on("UP", "normal").always(
                TransitionConfig::to("normal").when(|context, _| context["ticks"] == json!(3)),
            ),
        );

    Machine::new(
        StateNodeConfig::machine("player")
            .context(json!({ "ticks": 0 }))
            .initial("off")
            .state(
                "off",
                StateNodeConfig::new()
                    .on("POWER", "on")
                    .on("RESUME", "on.playback.hist"),
            )
            .state(
                "on",
                StateNodeConfig::new()
                    .parallel()
                    .on("POWER", "off")
                    .state("playback", playback)
                    .state("volume", volume),
            ),
    )
    .unwrap()
}

fn run(machine: &Machine, events: &[&'static str]) -> Vec<MachineState> {
    let mut states = vec![machine.initial_state().unwrap()];
    for event in events {
        let next = machine.transition(states.last().unwrap(), *event).unwrap();
        states.push(next);
    }
    states
}

/// Ancestors present, one active child per compound, every region of a
/// parallel node active.
fn is_legal(machine: &Machine, state: &MachineState) -> bool {
    let definition = machine.definition();
    state.configuration.iter().all(|index| {
        let node = definition.node(index);
        let parent_active = node
            .parent
            .map_or(true, |parent| state.configuration.contains(parent));
        let active_children = node
            .children
            .iter()
            .filter(|child| state.configuration.contains(**child))
            .count();
        let children_ok = match node.kind {
            NodeKind::Compound => active_children == 1,
            NodeKind::Parallel => definition
                .regions(index)
                .all(|region| state.configuration.contains(region)),
            _ => active_children == 0,
        };
        parent_active && children_ok && node.kind != NodeKind::History
    })
}

prop_compose! {
    fn arbitrary_events()(events in prop::collection::vec(prop::sample::select(EVENTS.to_vec()), 0..24)) -> Vec<&'static str> {
        events
    }
}

proptest! {
    #[test]
    fn reachable_configurations_are_legal(events in arbitrary_events()) {
        let machine = player();
        for state in run(&machine, &events) {
            prop_assert!(is_legal(&machine, &state), "illegal configuration {:?}", machine.active_ids(&state));
        }
    }

    #[test]
    fn transitions_are_deterministic(events in arbitrary_events()) {
        let machine = player();
        let first = run(&machine, &events);
        let second = run(&machine, &events);

        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.value, &b.value);
            prop_assert_eq!(&a.context, &b.context);
            prop_assert_eq!(a.action_kinds(), b.action_kinds());
            prop_assert_eq!(&a.history, &b.history);
        }
    }

    #[test]
    fn transition_never_mutates_its_input(events in arbitrary_events(), last in prop::sample::select(EVENTS.to_vec())) {
        let machine = player();
        let states = run(&machine, &events);
        let state = states.last().unwrap();
        let before = state.clone();

        let _ = machine.transition(state, last).unwrap();
        prop_assert_eq!(state, &before);
    }

    #[test]
    fn values_resolve_back_to_their_configuration(events in arbitrary_events()) {
        let machine = player();
        for state in run(&machine, &events) {
            let resolved = machine.resolve_state(state.value.clone()).unwrap();
            prop_assert_eq!(&resolved.configuration, &state.configuration);
        }
    }

    #[test]
    fn unmatched_events_are_no_ops(events in arbitrary_events()) {
        let machine = player();
        let states = run(&machine, &events);
        let state = states.last().unwrap();

        let next = machine.transition(state, "NOPE").unwrap();
        prop_assert_eq!(&next.configuration, &state.configuration);
        prop_assert_eq!(&next.context, &state.context);
        prop_assert!(next.actions.is_empty());
        prop_assert!(!next.changed);
    }

    #[test]
    fn next_events_are_declared_by_active_nodes(events in arbitrary_events()) {
        let machine = player();
        for state in run(&machine, &events) {
            let declared: Vec<String> = state
                .configuration
                .iter()
                .flat_map(|index| machine.definition().node(index).events())
                .map(str::to_string)
                .collect();
            for event in &state.next_events {
                prop_assert!(declared.contains(event));
            }
        }
    }

    #[test]
    fn checkpoints_restore_the_same_value(events in arbitrary_events()) {
        let machine = player();
        let states = run(&machine, &events);
        let state = states.last().unwrap();

        let bytes = machine.checkpoint(state).unwrap().to_binary().unwrap();
        let restored = machine
            .restore(&harel::Checkpoint::from_binary(&bytes).unwrap())
            .unwrap();

        prop_assert_eq!(&restored.value, &state.value);
        prop_assert_eq!(&restored.context, &state.context);
        prop_assert_eq!(&restored.history, &state.history);
    }
}
