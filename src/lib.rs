pub mod control;
pub mod dsl;
pub mod graph;
#[doc(hidden)]
pub mod invariant_ppt;
pub mod node;
pub mod oscillator;
pub mod pitch;
pub mod plan;
pub mod rt;
pub mod voice;

pub use graph::{GraphError, NodeGraph, NodeId};
pub use node::{SignalNode, SignalParameter};
pub use oscillator::{OscillatorState, Waveform};
pub use pitch::{KeyIndex, Pitch, PitchClass};
pub use rt::Engine;
pub use voice::{sample_many, update_many, NoteInstance};

/// Engine parameters supplied by the audio driver.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ticks per second; each tick advances notes by `1 / sample_rate`.
    pub sample_rate: f64,
    /// Frames per `process_block` call when rendering offline.
    pub block_size: usize,
    /// Graph node whose value is the audible signal.
    pub output_node: NodeId,
    /// Active note limit; 0 (the default) disables the limit.
    ///
    /// With a limit set, triggering past it steals a note: the oldest
    /// releasing note, else the oldest held one. Stolen notes end without
    /// finishing their release.
    pub max_notes: usize,
}

impl EngineConfig {
    pub fn with_output(mut self, output_node: NodeId) -> Self {
        self.output_node = output_node;
        self
    }

    pub fn with_max_notes(mut self, max_notes: usize) -> Self {
        self.max_notes = max_notes;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100.0,
            block_size: 64,
            output_node: NodeId(0),
            max_notes: 0,
        }
    }
}
