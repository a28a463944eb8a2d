use voicegraph::node::SignalParameter::{Constant, Input, MidiInput};
use voicegraph::{update_many, NodeGraph, NodeId, NoteInstance, SignalNode, Waveform};

fn envelope_only() -> (NodeGraph, NodeId) {
    let mut graph = NodeGraph::new();
    let env = graph.add_node(SignalNode::envelope(1.0, 1.0, 0.5, 1.0)).unwrap();
    (graph, env)
}

#[test]
fn adsr_shape_through_a_note() {
    let (graph, env) = envelope_only();
    let mut note = NoteInstance::new(0, 440.0, &graph);
    let mut held = Vec::new();
    for _ in 0..5 {
        note.update(env, 0.5).unwrap();
        held.push(note.sample(env).unwrap());
    }
    let expected = [0.5, 1.0, 0.75, 0.5, 0.5];
    for (got, want) in held.iter().zip(expected) {
        assert!((got - want).abs() < 1e-12, "got {} want {}", got, want);
    }
    assert_eq!(note.time, 2.5);

    note.release();
    assert!((note.sample(env).unwrap() - 0.5).abs() < 1e-12);
    note.update(env, 0.5).unwrap();
    assert!((note.sample(env).unwrap() - 0.25).abs() < 1e-12);
    note.update(env, 0.5).unwrap();
    assert!(note.sample(env).unwrap().abs() < 1e-12);
}

#[test]
fn release_during_attack_starts_from_current_level() {
    let (graph, env) = envelope_only();
    let mut note = NoteInstance::new(0, 440.0, &graph);
    for _ in 0..4 {
        note.update(env, 0.1).unwrap();
    }
    // release_from was captured at t = 0.3, the last pre-tick time.
    note.release();
    assert!((note.sample(env).unwrap() - 0.3).abs() < 1e-9);
    note.update(env, 0.5).unwrap();
    assert!((note.sample(env).unwrap() - 0.15).abs() < 1e-9);
}

#[test]
fn notes_from_one_template_evolve_independently() {
    let mut graph = NodeGraph::new();
    let env = graph.add_node(SignalNode::envelope(0.0, 0.0, 1.0, 0.5)).unwrap();
    let out = graph
        .add_node(SignalNode::generator(Waveform::Sawtooth, MidiInput, Input(env), Constant(0.0)))
        .unwrap();
    let mut low = NoteInstance::new(0, 100.0, &graph);
    let mut high = NoteInstance::new(1, 200.0, &graph);
    low.update(out, 0.001).unwrap();
    high.update(out, 0.001).unwrap();
    // Sawtooth at phase 0.1 and 0.2.
    assert!((low.sample(out).unwrap() + 0.8).abs() < 1e-9);
    assert!((high.sample(out).unwrap() + 0.6).abs() < 1e-9);
}

#[test]
fn culling_follows_longest_envelope() {
    let mut graph = NodeGraph::new();
    let short = graph.add_node(SignalNode::envelope(0.0, 0.0, 1.0, 0.5)).unwrap();
    let long = graph.add_node(SignalNode::envelope(0.0, 0.0, 1.0, 1.0)).unwrap();
    let out = graph
        .add_node(SignalNode::mixer(Constant(1.0), vec![(Input(short), Input(long))]))
        .unwrap();

    let mut notes = vec![
        NoteInstance::new(0, 110.0, &graph),
        NoteInstance::new(1, 220.0, &graph),
        NoteInstance::new(2, 330.0, &graph),
    ];
    notes[0].release();
    notes[2].release();
    for _ in 0..3 {
        update_many(out, 0.25, &mut notes).unwrap();
    }
    assert_eq!(notes.len(), 3);
    update_many(out, 0.25, &mut notes).unwrap();
    assert_eq!(notes.iter().map(|n| n.id).collect::<Vec<_>>(), vec![1]);

    for _ in 0..100 {
        update_many(out, 1.0, &mut notes).unwrap();
    }
    assert_eq!(notes.len(), 1, "held notes are never culled");
}
