// demos/offline_chord.rs
use voicegraph::control::ControlMsg;
use voicegraph::node::SignalParameter::{Constant, Input, MidiInput};
use voicegraph::rt::render_offline;
use voicegraph::{Engine, EngineConfig, NodeGraph, Pitch, SignalNode, Waveform};

fn main() {
    // Sawtooth through an ADSR, scaled down so a chord does not clip
    let mut graph = NodeGraph::new();
    let env = graph.add_node(SignalNode::envelope(0.02, 0.3, 0.6, 0.5)).unwrap();
    let osc = graph
        .add_node(SignalNode::generator(Waveform::Sawtooth, MidiInput, Input(env), Constant(0.0)))
        .unwrap();
    let out = graph
        .add_node(SignalNode::mixer(Constant(0.25), vec![(Input(osc), Constant(1.0))]))
        .unwrap();

    let mut engine = Engine::new(graph, EngineConfig::default().with_output(out)).unwrap();
    for name in ["C4", "E4", "G4"] {
        let pitch: Pitch = name.parse().unwrap();
        engine.handle(ControlMsg::NoteOn { pitch });
    }

    // One second held, then one second of release tail
    let mut samples = render_offline(&mut engine, 44100);
    engine.handle(ControlMsg::AllNotesOff);
    samples.extend(render_offline(&mut engine, 44100));

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create("chord.wav", spec).unwrap();
    for &sample in &samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * 32767.0) as i16).unwrap();
    }
    writer.finalize().unwrap();

    println!("Generated chord.wav - a C major chord that fades out after one second");
}
