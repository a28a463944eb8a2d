// demos/patch_builder.rs
use voicegraph::dsl::PatchBuilder;
use voicegraph::node::SignalParameter::{Constant, MidiInput};
use voicegraph::rt::render_offline;
use voicegraph::{Engine, EngineConfig, KeyIndex, Waveform};

fn main() {
    // Vibrato: a 5 Hz sine nudges the note frequency by +/- 4 Hz
    let mut patch = PatchBuilder::new();
    let env = patch.envelope("env", 0.05, 0.1, 0.8, 0.2).unwrap();
    let lfo = patch
        .oscillator("lfo", Waveform::Sine, Constant(5.0), Constant(4.0), Constant(0.0))
        .unwrap();
    patch
        .mixer(
            "pitch",
            Constant(1.0),
            vec![(MidiInput, Constant(1.0)), (lfo.into(), Constant(1.0))],
        )
        .unwrap();
    let pitch = patch.input("pitch").unwrap();
    patch
        .oscillator("voice", Waveform::Triangle, pitch, env.into(), Constant(0.0))
        .unwrap();
    let (graph, output) = patch.build("voice").unwrap();

    let mut engine = Engine::new(graph, EngineConfig::default().with_output(output)).unwrap();
    let key = KeyIndex::from_midi_note(69);
    println!("Playing {} ({} Hz)", key.pitch(), key.frequency());
    engine.trigger(key.frequency());

    let samples = render_offline(&mut engine, 4410);
    let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    println!("Rendered {} samples, peak {:.3}", samples.len(), peak);
}
