//! Orthogonal regions, history recall, and done events.

use pretty_assertions::assert_eq;
use serde_json::json;
use statechart::{
    HistoryKind, Machine, MachineConfig, StateKind, StateNodeConfig, StateValue, TransitionConfig,
};

fn word() -> Machine<()> {
    Machine::new(
        MachineConfig::new("word", ())
            .with_kind(StateKind::Parallel)
            .state(
                StateNodeConfig::new("A")
                    .with_initial("a1")
                    .child(StateNodeConfig::new("a1").on("X", "a2"))
                    .child(StateNodeConfig::new("a2")),
            )
            .state(
                StateNodeConfig::new("B")
                    .with_initial("b1")
                    .child(StateNodeConfig::new("b1").on("Y", "b2"))
                    .child(StateNodeConfig::new("b2")),
            ),
    )
    .unwrap()
}

#[test]
fn parallel_machines_start_with_every_region() {
    let machine = word();
    let state = machine.initial_state().unwrap();
    assert_eq!(
        state.value,
        StateValue::branch([
            ("A".to_string(), StateValue::simple("a1")),
            ("B".to_string(), StateValue::simple("b1")),
        ])
    );
}

#[test]
fn regions_transition_independently() {
    let machine = word();
    let initial = machine.initial_state().unwrap();

    let after_x = machine.transition(&initial, "X").unwrap();
    assert_eq!(
        after_x.value,
        StateValue::branch([
            ("A".to_string(), StateValue::simple("a2")),
            ("B".to_string(), StateValue::simple("b1")),
        ])
    );

    let after_y = machine.transition(&after_x, "Y").unwrap();
    assert_eq!(
        after_y.value,
        StateValue::branch([
            ("A".to_string(), StateValue::simple("a2")),
            ("B".to_string(), StateValue::simple("b2")),
        ])
    );
}

#[test]
fn parallel_configuration_contains_every_region() {
    let machine = word();
    let state = machine.initial_state().unwrap();
    for id in ["word", "word.A", "word.A.a1", "word.B", "word.B.b1"] {
        assert!(state.is_active(id), "expected {id} to be active");
    }
}

#[test]
fn partial_parallel_values_resolve_missing_regions() {
    let machine = word();
    let state = machine
        .resolve_state(StateValue::compound("A", StateValue::simple("a2")))
        .unwrap();
    assert_eq!(
        state.value,
        StateValue::branch([
            ("A".to_string(), StateValue::simple("a2")),
            ("B".to_string(), StateValue::simple("b1")),
        ])
    );
}

fn shallow_history_machine() -> Machine<()> {
    Machine::new(
        MachineConfig::new("m", ())
            .with_initial("A")
            .state(
                StateNodeConfig::new("A")
                    .with_initial("B")
                    .child(StateNodeConfig::new("B").on("ONE", "C"))
                    .child(StateNodeConfig::new("C").on("TWO", "D"))
                    .child(StateNodeConfig::new("D"))
                    .on("OUT", "F"),
            )
            .state(StateNodeConfig::new("F").on("BACK", "A.$history")),
    )
    .unwrap()
}

#[test]
fn shallow_history_recalls_the_last_child() {
    let machine = shallow_history_machine();
    let initial = machine.initial_state().unwrap();
    let at_c = machine.transition(&initial, "ONE").unwrap();
    let outside = machine.transition(&at_c, "OUT").unwrap();
    assert_eq!(outside.value, StateValue::simple("F"));

    let back = machine.transition(&outside, "BACK").unwrap();
    assert_eq!(back.value, StateValue::from("A.C"));
}

#[test]
fn history_without_a_record_falls_back_to_initial() {
    let machine = shallow_history_machine();
    let initial = machine.initial_state().unwrap();
    let outside = machine.transition(&initial, "OUT").unwrap();
    // A was exited while sitting in its initial child, so that is what
    // history recalls.
    let back = machine.transition(&outside, "BACK").unwrap();
    assert_eq!(back.value, StateValue::from("A.B"));
}

fn deep_history_machine(kind: HistoryKind) -> Machine<()> {
    Machine::new(
        MachineConfig::new("m", ())
            .with_initial("A")
            .state(
                StateNodeConfig::new("A")
                    .with_initial("B")
                    .child(StateNodeConfig::history("hist", kind))
                    .child(
                        StateNodeConfig::new("B")
                            .with_initial("B1")
                            .child(StateNodeConfig::new("B1").on("NEXT", "B2"))
                            .child(StateNodeConfig::new("B2")),
                    )
                    .on("OUT", "F"),
            )
            .state(StateNodeConfig::new("F").on("BACK", "A.hist")),
    )
    .unwrap()
}

#[test]
fn deep_history_recalls_the_exact_descendant() {
    let machine = deep_history_machine(HistoryKind::Deep);
    let initial = machine.initial_state().unwrap();
    let nested = machine.transition(&initial, "NEXT").unwrap();
    assert_eq!(nested.value, StateValue::from("A.B.B2"));

    let outside = machine.transition(&nested, "OUT").unwrap();
    let back = machine.transition(&outside, "BACK").unwrap();
    assert_eq!(back.value, StateValue::from("A.B.B2"));
}

#[test]
fn shallow_history_descends_through_initials_below_the_recalled_child() {
    let machine = deep_history_machine(HistoryKind::Shallow);
    let initial = machine.initial_state().unwrap();
    let nested = machine.transition(&initial, "NEXT").unwrap();
    let outside = machine.transition(&nested, "OUT").unwrap();
    let back = machine.transition(&outside, "BACK").unwrap();
    assert_eq!(back.value, StateValue::from("A.B.B1"));
}

#[test]
fn history_default_target_is_used_when_nothing_was_recorded() {
    let machine = Machine::new(
        MachineConfig::new("m", ())
            .with_initial("F")
            .state(
                StateNodeConfig::new("A")
                    .with_initial("B")
                    .child(
                        StateNodeConfig::history("hist", HistoryKind::Shallow)
                            .with_history_target("C"),
                    )
                    .child(StateNodeConfig::new("B"))
                    .child(StateNodeConfig::new("C")),
            )
            .state(StateNodeConfig::new("F").on("GO", "A.hist")),
    )
    .unwrap();

    let state = machine
        .transition(&machine.initial_state().unwrap(), "GO")
        .unwrap();
    assert_eq!(state.value, StateValue::from("A.C"));
}

#[test]
fn entering_a_final_child_raises_the_parent_done_event() {
    let machine = Machine::new(
        MachineConfig::new("wizard", ())
            .with_initial("steps")
            .state(
                StateNodeConfig::new("steps")
                    .with_initial("one")
                    .child(StateNodeConfig::new("one").on("NEXT", "two"))
                    .child(StateNodeConfig::final_state("two").with_data(json!({ "ok": true })))
                    .on_done(TransitionConfig::new("", "summary")),
            )
            .state(StateNodeConfig::new("summary")),
    )
    .unwrap();

    let state = machine
        .transition(&machine.initial_state().unwrap(), "NEXT")
        .unwrap();
    assert_eq!(state.value, StateValue::simple("summary"));
    assert!(!state.done);
}

#[test]
fn parallel_done_fires_when_every_region_is_done() {
    let machine = Machine::new(
        MachineConfig::new("m", ())
            .with_initial("work")
            .state(
                StateNodeConfig::parallel("work")
                    .child(
                        StateNodeConfig::new("left")
                            .with_initial("busy")
                            .child(StateNodeConfig::new("busy").on("L", "done"))
                            .child(StateNodeConfig::final_state("done")),
                    )
                    .child(
                        StateNodeConfig::new("right")
                            .with_initial("busy")
                            .child(StateNodeConfig::new("busy").on("R", "done"))
                            .child(StateNodeConfig::final_state("done")),
                    )
                    .on_done(TransitionConfig::new("", "celebrate")),
            )
            .state(StateNodeConfig::new("celebrate")),
    )
    .unwrap();

    let initial = machine.initial_state().unwrap();
    let half = machine.transition(&initial, "L").unwrap();
    assert!(half.matches("work"), "one done region is not enough");

    let full = machine.transition(&half, "R").unwrap();
    assert_eq!(full.value, StateValue::simple("celebrate"));
}

#[test]
fn the_machine_completes_when_the_root_reaches_a_final_state() {
    let machine = Machine::new(
        MachineConfig::new("m", ())
            .with_initial("running")
            .state(StateNodeConfig::new("running").on("END", "stopped"))
            .state(StateNodeConfig::final_state("stopped")),
    )
    .unwrap();

    let state = machine
        .transition(&machine.initial_state().unwrap(), "END")
        .unwrap();
    assert!(state.done);
}

#[test]
fn meta_values_of_active_nodes_are_collected() {
    let machine = Machine::new(
        MachineConfig::new("m", ())
            .with_initial("a")
            .state(StateNodeConfig::new("a").with_meta(json!({ "page": 1 })))
            .state(StateNodeConfig::new("b")),
    )
    .unwrap();

    let state = machine.initial_state().unwrap();
    assert_eq!(state.meta.get("m.a"), Some(&json!({ "page": 1 })));
}
