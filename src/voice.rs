//! Note instances: one sounding note with a private copy of the signal graph.

use crate::graph::{GraphError, NodeGraph, NodeId};
use crate::node::{EvalContext, PendingUpdate};
use crate::pitch::Pitch;

/// Identifier of a triggered note, unique within an engine.
pub type NoteId = u64;

/// One held or releasing note.
///
/// The graph is owned by the note, so oscillator phases and envelope levels
/// evolve independently of every other note built from the same template.
#[derive(Debug, Clone)]
pub struct NoteInstance {
    pub id: NoteId,
    /// Fundamental frequency in Hz, read by `MidiInput` parameters.
    pub frequency: f64,
    /// Seconds since trigger.
    pub time: f64,
    /// Seconds since release; `None` while the key is held.
    pub time_since_release: Option<f64>,
    nodes: NodeGraph,
    longest_release: f64,
    pending: Vec<PendingUpdate>,
}

impl NoteInstance {
    /// Trigger a note at `frequency` with a fresh copy of `template`.
    pub fn new(id: NoteId, frequency: f64, template: &NodeGraph) -> Self {
        Self {
            id,
            frequency,
            time: 0.0,
            time_since_release: None,
            nodes: template.clone(),
            longest_release: template.longest_release(),
            pending: Vec::with_capacity(template.slot_count()),
        }
    }

    pub fn from_pitch(id: NoteId, pitch: Pitch, template: &NodeGraph) -> Self {
        Self::new(id, pitch.frequency(), template)
    }

    pub fn nodes(&self) -> &NodeGraph {
        &self.nodes
    }

    pub fn is_held(&self) -> bool {
        self.time_since_release.is_none()
    }

    /// Start the release phase. Returns `false` if already releasing.
    pub fn release(&mut self) -> bool {
        if self.is_held() {
            self.time_since_release = Some(0.0);
            true
        } else {
            false
        }
    }

    /// Longest envelope release in this note's graph (0 without envelopes).
    pub fn longest_release(&self) -> f64 {
        self.longest_release
    }

    /// Released for at least the longest release time; held notes never finish.
    pub fn is_finished(&self) -> bool {
        matches!(self.time_since_release, Some(t) if t >= self.longest_release)
    }

    pub fn context(&self) -> EvalContext<'_> {
        EvalContext {
            frequency: self.frequency,
            time: self.time,
            time_since_release: self.time_since_release,
            graph: &self.nodes,
        }
    }

    /// Value of the output node for the note's current state.
    pub fn sample(&self, output: NodeId) -> Result<f64, GraphError> {
        self.context().sample_node(output)
    }

    /// Advance every node, then the note's clocks, by `dt` seconds.
    ///
    /// All pending changes are resolved against the pre-tick graph before any
    /// node is touched, so nodes never observe each other's updates within a
    /// tick. On error the note is left unchanged.
    pub fn update(&mut self, output: NodeId, dt: f64) -> Result<(), GraphError> {
        if !self.nodes.contains(output) {
            return Err(GraphError::NodeNotFound(output));
        }

        let ctx = EvalContext {
            frequency: self.frequency,
            time: self.time,
            time_since_release: self.time_since_release,
            graph: &self.nodes,
        };
        self.pending.clear();
        for slot in self.nodes.slots() {
            let pending = match slot {
                Some(node) => node.pending_update(&ctx)?,
                None => PendingUpdate::Unchanged,
            };
            self.pending.push(pending);
        }

        for (slot, pending) in self.nodes.slots_mut().zip(&self.pending) {
            if let Some(node) = slot {
                node.apply_update(dt, *pending);
            }
        }

        self.time += dt;
        if let Some(t) = self.time_since_release.as_mut() {
            *t += dt;
        }
        Ok(())
    }
}

/// Polyphonic mixdown: the sum of every note's output. Empty input sums to 0.
pub fn sample_many(output: NodeId, notes: &[NoteInstance]) -> Result<f64, GraphError> {
    notes.iter().map(|note| note.sample(output)).sum()
}

/// Update every note, then drop the ones whose release has run out.
/// Survivors keep their order.
///
/// A note that fails to update is left unchanged and kept, while every other
/// note still advances and culling still runs. The first error is returned.
pub fn update_many(
    output: NodeId,
    dt: f64,
    notes: &mut Vec<NoteInstance>,
) -> Result<(), GraphError> {
    let mut first_error = None;
    for note in notes.iter_mut() {
        if let Err(e) = note.update(output, dt) {
            first_error.get_or_insert(e);
        }
    }
    notes.retain(|note| !note.is_finished());
    first_error.map_or(Ok(()), Err)
}
