//! Signal nodes and their sample/update algorithms.
//!
//! Evaluation is recursive over `Input` references. A node never owns the
//! nodes it reads from; it names them by [`NodeId`] and resolves them through
//! an [`EvalContext`] that carries the playing note's state.

#![forbid(unsafe_code)]

use crate::graph::{GraphError, NodeGraph, NodeId};
use crate::oscillator::{OscillatorState, Waveform};

/// Where a node's control input comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalParameter {
    /// A fixed value.
    Constant(f64),
    /// The output of another node.
    Input(NodeId),
    /// The fundamental frequency of the playing note.
    MidiInput,
}

impl SignalParameter {
    /// The node this parameter reads from, if any.
    pub fn input(&self) -> Option<NodeId> {
        match self {
            SignalParameter::Input(id) => Some(*id),
            _ => None,
        }
    }
}

impl From<f64> for SignalParameter {
    fn from(value: f64) -> Self {
        SignalParameter::Constant(value)
    }
}

impl From<NodeId> for SignalParameter {
    fn from(id: NodeId) -> Self {
        SignalParameter::Input(id)
    }
}

/// A node in a note's signal graph.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalNode {
    /// Periodic oscillator. `frequency` is only read when advancing phase.
    Generator {
        state: OscillatorState,
        frequency: SignalParameter,
        amplitude: SignalParameter,
        bias: SignalParameter,
    },
    /// Weighted sum of `(signal, gain)` pairs scaled by `master_amplitude`.
    Mixer {
        master_amplitude: SignalParameter,
        inputs: Vec<(SignalParameter, SignalParameter)>,
    },
    /// Linear ADSR envelope. `release_from` holds the level release starts at.
    Envelope {
        attack: f64,
        decay: f64,
        sustain: f64,
        release: f64,
        release_from: f64,
    },
}

impl SignalNode {
    /// Generator starting at phase 0.
    pub fn generator(
        waveform: Waveform,
        frequency: SignalParameter,
        amplitude: SignalParameter,
        bias: SignalParameter,
    ) -> Self {
        SignalNode::Generator {
            state: OscillatorState::new(waveform),
            frequency,
            amplitude,
            bias,
        }
    }

    pub fn mixer(
        master_amplitude: SignalParameter,
        inputs: Vec<(SignalParameter, SignalParameter)>,
    ) -> Self {
        SignalNode::Mixer {
            master_amplitude,
            inputs,
        }
    }

    pub fn envelope(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        SignalNode::Envelope {
            attack,
            decay,
            sustain,
            release,
            release_from: 0.0,
        }
    }

    /// Nodes this node reads from, in parameter order.
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        match self {
            SignalNode::Generator {
                frequency,
                amplitude,
                bias,
                ..
            } => [frequency, amplitude, bias]
                .iter()
                .filter_map(|p| p.input())
                .collect(),
            SignalNode::Mixer {
                master_amplitude,
                inputs,
            } => std::iter::once(master_amplitude)
                .chain(inputs.iter().flat_map(|(signal, gain)| [signal, gain]))
                .filter_map(|p| p.input())
                .collect(),
            SignalNode::Envelope { .. } => Vec::new(),
        }
    }

    /// Release duration, for envelopes.
    pub fn release_time(&self) -> Option<f64> {
        match self {
            SignalNode::Envelope { release, .. } => Some(*release),
            _ => None,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), GraphError> {
        match self {
            SignalNode::Envelope {
                attack,
                decay,
                sustain,
                release,
                release_from,
            } => {
                check_non_negative(*attack, "envelope attack must be finite and >= 0")?;
                check_non_negative(*decay, "envelope decay must be finite and >= 0")?;
                check_non_negative(*sustain, "envelope sustain must be finite and >= 0")?;
                check_non_negative(*release, "envelope release must be finite and >= 0")?;
                if !release_from.is_finite() {
                    return Err(GraphError::InvalidParameter(
                        "envelope release level must be finite",
                    ));
                }
                Ok(())
            }
            SignalNode::Generator { state, .. } => {
                if (0.0..1.0).contains(&state.phase) {
                    Ok(())
                } else {
                    Err(GraphError::InvalidParameter("oscillator phase must be in [0, 1)"))
                }
            }
            SignalNode::Mixer { .. } => Ok(()),
        }
    }

    /// Resolve this node's state change for the coming tick against the
    /// unmodified graph in `ctx`.
    pub fn pending_update(&self, ctx: &EvalContext<'_>) -> Result<PendingUpdate, GraphError> {
        match self {
            SignalNode::Generator { frequency, .. } => Ok(PendingUpdate::Advance {
                frequency: ctx.sample_parameter(frequency)?,
            }),
            SignalNode::Mixer { .. } => Ok(PendingUpdate::Unchanged),
            SignalNode::Envelope {
                attack,
                decay,
                sustain,
                release,
                release_from,
            } => match ctx.time_since_release {
                // Frozen at the level it held the instant release began.
                Some(_) => Ok(PendingUpdate::Unchanged),
                None => Ok(PendingUpdate::Capture {
                    release_from: sample_adsr(
                        ctx.time,
                        None,
                        *attack,
                        *decay,
                        *sustain,
                        *release,
                        *release_from,
                    ),
                }),
            },
        }
    }

    /// Apply a change produced by [`SignalNode::pending_update`].
    pub fn apply_update(&mut self, dt: f64, pending: PendingUpdate) {
        match (self, pending) {
            (SignalNode::Generator { state, .. }, PendingUpdate::Advance { frequency }) => {
                state.advance(dt, frequency);
            }
            (
                SignalNode::Envelope { release_from, .. },
                PendingUpdate::Capture {
                    release_from: level,
                },
            ) => {
                *release_from = level;
            }
            _ => {}
        }
    }

    /// The node as it will be after `dt` seconds.
    pub fn updated(&self, dt: f64, ctx: &EvalContext<'_>) -> Result<SignalNode, GraphError> {
        let pending = self.pending_update(ctx)?;
        let mut next = self.clone();
        next.apply_update(dt, pending);
        Ok(next)
    }
}

fn check_non_negative(value: f64, what: &'static str) -> Result<(), GraphError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GraphError::InvalidParameter(what))
    }
}

/// A node's state change for one tick, resolved before any node is mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingUpdate {
    /// Advance oscillator phase at this frequency.
    Advance { frequency: f64 },
    /// Store the envelope's current held level as its release level.
    Capture { release_from: f64 },
    Unchanged,
}

/// State of the playing note that graph evaluation reads.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Fundamental frequency, returned for `MidiInput`.
    pub frequency: f64,
    /// Seconds since the note was triggered.
    pub time: f64,
    /// Seconds since release, `None` while held.
    pub time_since_release: Option<f64>,
    pub graph: &'a NodeGraph,
}

impl<'a> EvalContext<'a> {
    pub fn sample_parameter(&self, param: &SignalParameter) -> Result<f64, GraphError> {
        match param {
            SignalParameter::Constant(value) => Ok(*value),
            SignalParameter::Input(id) => self.sample_node(*id),
            SignalParameter::MidiInput => Ok(self.frequency),
        }
    }

    /// Sample the node stored at `id`.
    pub fn sample_node(&self, id: NodeId) -> Result<f64, GraphError> {
        let node = self.graph.get(id).ok_or(GraphError::NodeNotFound(id))?;
        self.sample(node)
    }

    pub fn sample(&self, node: &SignalNode) -> Result<f64, GraphError> {
        match node {
            SignalNode::Generator {
                state,
                amplitude,
                bias,
                ..
            } => {
                let amplitude = self.sample_parameter(amplitude)?;
                let bias = self.sample_parameter(bias)?;
                Ok(state.sample() * amplitude + bias)
            }
            SignalNode::Mixer {
                master_amplitude,
                inputs,
            } => {
                let mut sum = 0.0;
                for (signal, gain) in inputs {
                    sum += self.sample_parameter(signal)? * self.sample_parameter(gain)?;
                }
                Ok(sum * self.sample_parameter(master_amplitude)?)
            }
            SignalNode::Envelope {
                attack,
                decay,
                sustain,
                release,
                release_from,
            } => Ok(sample_adsr(
                self.time,
                self.time_since_release,
                *attack,
                *decay,
                *sustain,
                *release,
                *release_from,
            )),
        }
    }
}

#[inline]
fn lerp(from: f64, to: f64, x: f64) -> f64 {
    from + x * (to - from)
}

/// Piecewise-linear ADSR level.
///
/// While held the envelope ramps 0→1 over `attack`, 1→`sustain` over `decay`,
/// then holds `sustain`. Zero-length segments are skipped. Once released it
/// ramps `release_from`→0 over `release` and stays at 0; a zero `release`
/// drops to 0 immediately.
pub fn sample_adsr(
    time: f64,
    time_since_release: Option<f64>,
    attack: f64,
    decay: f64,
    sustain: f64,
    release: f64,
    release_from: f64,
) -> f64 {
    match time_since_release {
        None if time < attack => lerp(0.0, 1.0, time / attack),
        None if time < attack + decay => lerp(1.0, sustain, (time - attack) / decay),
        None => sustain,
        Some(_) if release <= 0.0 => 0.0,
        Some(t) => lerp(release_from, 0.0, (t / release).clamp(0.0, 1.0)),
    }
}
