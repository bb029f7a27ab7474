//! Traffic Light Statechart
//!
//! This example demonstrates a cyclic statechart with a nested state and
//! delayed transitions.
//!
//! Key concepts:
//! - Cyclic state transitions (states repeat)
//! - A compound `red` state with its own pedestrian sub-states
//! - Delayed transitions compiled into send/cancel descriptors
//! - The engine computes; the caller decides when timers fire
//!
//! Run with: cargo run --example traffic_light

use harel::builder::StateNodeConfig;
use harel::{ActionObject, Machine, MachineState};

fn describe(state: &MachineState) {
    println!("  State:   {}", state.value);
    for action in &state.actions {
        match action {
            ActionObject::Send { event, delay, .. } => {
                println!("  Action:  schedule {event} after {delay:?}")
            }
            ActionObject::Cancel { send_id } => println!("  Action:  cancel {send_id}"),
            other => println!("  Action:  {}", other.kind()),
        }
    }
    println!();
}

fn main() {
    println!("=== Traffic Light Statechart ===\n");

    let pedestrian = StateNodeConfig::new()
        .initial("walk")
        .state("walk", StateNodeConfig::new().on("PED_TIMER", "wait"))
        .state("wait", StateNodeConfig::new().on("PED_TIMER", "stop"))
        .state("stop", StateNodeConfig::new().final_state());

    let machine = Machine::new(
        StateNodeConfig::machine("light")
            .initial("green")
            .state(
                "green",
                StateNodeConfig::new()
                    .entry("turnGreen")
                    .after(5000u64, "yellow"),
            )
            .state(
                "yellow",
                StateNodeConfig::new()
                    .entry("turnYellow")
                    .after(1000u64, "red"),
            )
            .state(
                "red",
                pedestrian
                    .entry("turnRed")
                    .on("done.state.light.red", "green"),
            ),
    )
    .expect("traffic light definition is valid");

    println!("Initial state:");
    let mut state = machine.initial_state().expect("light has an initial state");
    describe(&state);

    // A real interpreter would wait for each scheduled send; here we deliver
    // the timer events ourselves.
    let events = [
        "xstate.after(5000)#light.green",
        "xstate.after(1000)#light.yellow",
        "PED_TIMER",
        "PED_TIMER",
    ];
    for event in events {
        println!("Event: {event}");
        state = machine
            .transition(&state, event)
            .expect("light accepts its own events");
        describe(&state);
    }

    println!("The final pedestrian state raised done.state.light.red,");
    println!("which took the light back to green within the same step.\n");

    println!("Key Characteristics:");
    println!("- Pure transitions: the same state and event always give the same result");
    println!("- Timers are descriptors, never scheduled by the engine");
    println!("- No final state at the top level (cycles indefinitely)");

    println!("\n=== Example Complete ===");
}
