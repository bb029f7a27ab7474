//! Media Player Statechart
//!
//! This example demonstrates parallel regions, history, guards and
//! checkpoints.
//!
//! Key concepts:
//! - A parallel `on` state with independent playback and volume regions
//! - Deep history restoring playback after a power cycle
//! - Named guards supplied through `MachineOptions`
//! - Context updates with `assign`
//! - Checkpointing a state to JSON and restoring it
//!
//! Run with: cargo run --example media_player

use harel::builder::{StateNodeConfig, TransitionConfig};
use harel::definition::HistoryKind;
use harel::{ActionObject, Checkpoint, Machine, MachineOptions, MachineState};
use serde_json::json;

fn show(label: &str, state: &MachineState) {
    println!("{label}");
    println!("  Value:   {}", state.value);
    println!("  Context: {}", state.context);
    if !state.actions.is_empty() {
        println!("  Actions: {:?}", state.action_kinds());
    }
    println!();
}

fn definition() -> StateNodeConfig {
    let playback = StateNodeConfig::new()
        .initial("stopped")
        .state(
            "stopped",
            StateNodeConfig::new().on("PLAY", TransitionConfig::to("playing").guard("hasTrack")),
        )
        .state(
            "playing",
            StateNodeConfig::new()
                .entry("startAudio")
                .exit("stopAudio")
                .on("PAUSE", "paused")
                .on("STOP", "stopped"),
        )
        .state(
            "paused",
            StateNodeConfig::new().on("PLAY", "playing").on("STOP", "stopped"),
        )
        .state("hist", StateNodeConfig::new().history(HistoryKind::Deep));

    let volume = StateNodeConfig::new()
        .initial("normal")
        .on(
            "VOLUME",
            TransitionConfig::new().action(ActionObject::assign(|context, event| {
                let mut context = context.clone();
                context["level"] = event.payload["level"].clone();
                context
            })),
        )
        .state("normal", StateNodeConfig::new().on("MUTE", "muted"))
        .state("muted", StateNodeConfig::new().on("MUTE", "normal"));

    StateNodeConfig::machine("player")
        .context(json!({ "track": "intro.ogg", "level": 5 }))
        .initial("off")
        .state("off", StateNodeConfig::new().on("POWER", "on.playback.hist"))
        .state(
            "on",
            StateNodeConfig::new()
                .parallel()
                .on("POWER", "off")
                .state("playback", playback)
                .state("volume", volume),
        )
}

fn main() {
    println!("=== Media Player Statechart ===\n");

    let options = MachineOptions::new()
        .guard("hasTrack", |context, _| context["track"].is_string())
        .action("startAudio", |context, _| println!("  [audio] start {}", context["track"]))
        .action("stopAudio", |_, _| println!("  [audio] stop"));
    let machine = Machine::with_options(definition(), options).expect("player definition is valid");

    let state = machine.initial_state().expect("player has an initial state");
    show("Initial state:", &state);

    let state = machine.transition(&state, "POWER").expect("POWER is accepted");
    show("After POWER (no history yet, defaults apply):", &state);

    let state = machine.transition(&state, "PLAY").expect("PLAY is accepted");
    show("After PLAY:", &state);

    // The interpreter executes what the engine describes.
    for action in &state.actions {
        if let Some(run) = machine.options().resolve_action(action) {
            run(&state.context, &state.event);
        }
    }
    println!();

    let state = machine.transition(&state, "MUTE").expect("MUTE is accepted");
    let state = machine
        .transition(&state, harel::Event::new("VOLUME").with_payload(json!({ "level": 9 })))
        .expect("VOLUME is accepted");
    show("After MUTE and VOLUME (the regions move independently):", &state);

    let state = machine.transition(&state, "POWER").expect("POWER is accepted");
    show("After POWER off:", &state);

    let checkpoint = machine.checkpoint(&state).expect("state can be captured");
    let json = checkpoint.to_json().expect("checkpoint encodes to JSON");
    println!("Checkpoint ({} bytes of JSON)\n", json.len());

    let restored = machine
        .restore(&Checkpoint::from_json(&json).expect("checkpoint decodes"))
        .expect("checkpoint belongs to this machine");
    let state = machine.transition(&restored, "POWER").expect("POWER is accepted");
    show("After restoring and POWER (deep history resumes playback):", &state);

    println!("Key Characteristics:");
    println!("- Regions in a parallel state transition independently");
    println!("- History is recorded on exit and survives checkpoints");
    println!("- Guards and actions are resolved by name through options");

    println!("\n=== Example Complete ===");
}
