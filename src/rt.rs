//! RT module: the tick driver that owns the active notes.

// IMPORTANT: Do not call assert_invariant or log from tick/process_block except
// on note failure; both may lock or allocate.

use crate::control::ControlMsg;
use crate::graph::{GraphError, NodeGraph};
use crate::invariant_ppt::{assert_invariant, NOTE_TRIGGERED, VOICE_LIMIT_BOUND};
use crate::pitch::Pitch;
use crate::plan::Plan;
use crate::voice::{NoteId, NoteInstance};
use crate::EngineConfig;
use log::{debug, error, warn};

/// Polyphonic engine: one template graph, many independent notes.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    plan: Plan,
    template: NodeGraph,
    notes: Vec<NoteInstance>,
    next_note: NoteId,
    failed: Vec<NoteId>,
}

impl Engine {
    /// Check the template against the configured output node.
    pub fn new(template: NodeGraph, config: EngineConfig) -> Result<Self, GraphError> {
        let plan = Plan::compile(&template, config.output_node)?;
        Ok(Self {
            notes: Vec::with_capacity(config.max_notes),
            failed: Vec::with_capacity(config.max_notes),
            config,
            plan,
            template,
            next_note: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    /// Active notes in trigger order.
    pub fn notes(&self) -> &[NoteInstance] {
        &self.notes
    }

    /// Apply a control message. Returns the new note's id for note-ons.
    pub fn handle(&mut self, msg: ControlMsg) -> Option<NoteId> {
        match msg {
            ControlMsg::NoteOn { pitch } => Some(self.trigger_pitch(pitch)),
            ControlMsg::NoteOnFrequency { frequency } => Some(self.trigger(frequency)),
            ControlMsg::NoteOff { pitch } => {
                self.release_pitch(pitch);
                None
            }
            ControlMsg::Release { note } => {
                self.release(note);
                None
            }
            ControlMsg::AllNotesOff => {
                self.release_all();
                None
            }
        }
    }

    /// Start a note at `frequency` Hz. Steals a note first when a
    /// `max_notes` limit is configured and reached.
    pub fn trigger(&mut self, frequency: f64) -> NoteId {
        if self.config.max_notes > 0 && self.notes.len() >= self.config.max_notes {
            self.steal_note();
        }
        let id = self.next_note;
        self.next_note += 1;
        self.notes.push(NoteInstance::new(id, frequency, &self.template));
        assert_invariant(
            VOICE_LIMIT_BOUND,
            self.config.max_notes == 0 || self.notes.len() <= self.config.max_notes,
            "Active notes stay within max_notes",
            Some("trigger"),
        );
        assert_invariant(NOTE_TRIGGERED, true, "Note triggered from template", Some("trigger"));
        debug!("note {} on at {:.3} Hz", id, frequency);
        id
    }

    pub fn trigger_pitch(&mut self, pitch: Pitch) -> NoteId {
        self.trigger(pitch.frequency())
    }

    /// Release a held note. Returns `false` if it is unknown or already released.
    pub fn release(&mut self, note: NoteId) -> bool {
        let released = self
            .notes
            .iter_mut()
            .find(|n| n.id == note)
            .is_some_and(|n| n.release());
        if released {
            debug!("note {} off", note);
        }
        released
    }

    /// Release every held note at this pitch. Returns how many were released.
    pub fn release_pitch(&mut self, pitch: Pitch) -> usize {
        let frequency = pitch.frequency();
        let mut count = 0;
        for note in &mut self.notes {
            if (note.frequency - frequency).abs() < 1e-9 && note.release() {
                count += 1;
            }
        }
        debug!("{} off ({} notes)", pitch, count);
        count
    }

    pub fn release_all(&mut self) {
        for note in &mut self.notes {
            note.release();
        }
    }

    // Oldest releasing note first, otherwise the oldest note.
    fn steal_note(&mut self) {
        let idx = self
            .notes
            .iter()
            .position(|n| !n.is_held())
            .unwrap_or(0);
        if idx < self.notes.len() {
            let stolen = self.notes.remove(idx);
            warn!(
                "note limit {} reached, dropping note {}",
                self.config.max_notes, stolen.id
            );
        }
    }

    /// One tick: advance and cull every note, then mix their outputs.
    /// Notes whose graphs fail to evaluate are dropped.
    pub fn tick(&mut self, dt: f64) -> f32 {
        let output = self.config.output_node;

        self.notes.retain_mut(|note| match note.update(output, dt) {
            Ok(()) => !note.is_finished(),
            Err(e) => {
                error!("dropping note {}: {}", note.id, e);
                false
            }
        });

        let mut sum = 0.0;
        self.failed.clear();
        for note in &self.notes {
            match note.sample(output) {
                Ok(value) => sum += value,
                Err(e) => {
                    error!("dropping note {}: {}", note.id, e);
                    self.failed.push(note.id);
                }
            }
        }
        if !self.failed.is_empty() {
            let failed = &self.failed;
            self.notes.retain(|n| !failed.contains(&n.id));
        }

        sum as f32
    }

    /// Fill `out` with one tick per frame at the configured sample rate.
    pub fn process_block(&mut self, out: &mut [f32]) {
        let dt = 1.0 / self.config.sample_rate;
        for sample in out.iter_mut() {
            *sample = self.tick(dt);
        }
    }
}

/// Render offline to a buffer.
pub fn render_offline(engine: &mut Engine, frames: usize) -> Vec<f32> {
    let mut output = vec![0.0; frames];
    let block_size = engine.config.block_size.max(1);
    for block in output.chunks_mut(block_size) {
        engine.process_block(block);
    }
    output
}

/// Run process_block with panic containment.
pub fn process_block_safe(engine: &mut Engine, out: &mut [f32]) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        engine.process_block(out);
    }));
    if result.is_err() {
        // Fail closed: silence output
        out.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeId;
    use crate::node::SignalNode;
    use crate::node::SignalParameter::{Constant, Input, MidiInput};
    use crate::oscillator::Waveform;
    use crate::pitch::PitchClass;

    fn template() -> NodeGraph {
        let mut graph = NodeGraph::new();
        let env = graph.add_node(SignalNode::envelope(0.01, 0.01, 0.5, 0.05)).unwrap();
        graph
            .insert(
                NodeId(1),
                SignalNode::generator(Waveform::Sine, MidiInput, Input(env), Constant(0.0)),
            )
            .unwrap();
        graph
    }

    fn config() -> EngineConfig {
        EngineConfig {
            output_node: NodeId(1),
            ..EngineConfig::default()
        }
    }

    #[test]
    fn engine_rejects_missing_output() {
        let err = Engine::new(template(), EngineConfig::default().with_output(NodeId(7)));
        assert_eq!(err.err(), Some(GraphError::NodeNotFound(NodeId(7))));
    }

    #[test]
    fn empty_engine_is_silent() {
        let mut engine = Engine::new(template(), config()).unwrap();
        let out = render_offline(&mut engine, 256);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn note_lifecycle() {
        let mut engine = Engine::new(template(), config()).unwrap();
        let id = engine.handle(ControlMsg::NoteOn {
            pitch: Pitch::new(PitchClass::A, 4),
        });
        assert_eq!(id, Some(0));
        assert_eq!(engine.notes()[0].frequency, 440.0);

        let out = render_offline(&mut engine, 441);
        assert!(out.iter().any(|&s| s.abs() > 0.1));
        assert_eq!(engine.notes().len(), 1);

        engine.handle(ControlMsg::NoteOff {
            pitch: Pitch::new(PitchClass::A, 4),
        });
        // 0.05 s release at 44.1 kHz is about 2205 ticks.
        render_offline(&mut engine, 2300);
        assert!(engine.notes().is_empty());
    }

    #[test]
    fn release_by_id_and_all() {
        let mut engine = Engine::new(template(), config()).unwrap();
        let a = engine.trigger(220.0);
        let b = engine.trigger(330.0);
        assert!(engine.release(a));
        assert!(!engine.release(a));
        assert!(!engine.release(99));
        engine.handle(ControlMsg::AllNotesOff);
        assert!(engine.notes().iter().all(|n| !n.is_held()));
        assert_eq!(engine.notes()[1].id, b);
    }

    #[test]
    fn default_config_keeps_every_held_note() {
        let mut engine = Engine::new(template(), config()).unwrap();
        for i in 0..33 {
            engine.trigger(100.0 + i as f64);
        }
        render_offline(&mut engine, 64);
        let ids: Vec<_> = engine.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, (0..33).collect::<Vec<_>>());
        assert!(engine.notes().iter().all(|n| n.is_held()));
    }

    #[test]
    fn steals_releasing_note_first() {
        let cfg = config().with_max_notes(2);
        let mut engine = Engine::new(template(), cfg).unwrap();
        let a = engine.trigger(100.0);
        let b = engine.trigger(200.0);
        engine.release(b);
        let c = engine.trigger(300.0);
        let ids: Vec<_> = engine.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![a, c]);
        let d = engine.trigger(400.0);
        let ids: Vec<_> = engine.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![c, d]);
    }

    #[test]
    fn process_block_safe_fills_block() {
        let mut engine = Engine::new(template(), config()).unwrap();
        engine.trigger(440.0);
        let mut out = vec![0.0; 64];
        process_block_safe(&mut engine, &mut out);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
