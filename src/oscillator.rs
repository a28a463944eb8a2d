//! Oscillator state: waveform shape plus a normalized phase accumulator.

use std::f64::consts::TAU;

/// Periodic waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Sawtooth,
    Square,
    Triangle,
}

impl Waveform {
    /// Evaluate one cycle of the waveform at `phase` (period 1).
    pub fn eval(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Sawtooth => sawtooth(phase),
            Waveform::Square => sign(sawtooth(phase)),
            Waveform::Triangle => (sawtooth(phase) * 2.0).abs() - 1.0,
        }
    }
}

fn sawtooth(phase: f64) -> f64 {
    phase.rem_euclid(1.0) * 2.0 - 1.0
}

// sign(0) is 0, matching the signum of an exact zero crossing.
fn sign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Generator state owned by a single oscillator node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorState {
    /// Shape of the generated wave.
    pub waveform: Waveform,
    /// Position within the current cycle, in `[0, 1)`.
    pub phase: f64,
}

impl OscillatorState {
    pub fn new(waveform: Waveform) -> Self {
        Self {
            waveform,
            phase: 0.0,
        }
    }

    pub fn with_phase(waveform: Waveform, phase: f64) -> Self {
        Self {
            waveform,
            phase: wrap_phase(phase),
        }
    }

    /// Current output value of the waveform.
    #[inline]
    pub fn sample(&self) -> f64 {
        self.waveform.eval(self.phase)
    }

    /// State after `dt` seconds at `frequency` Hz.
    #[inline]
    pub fn update(self, dt: f64, frequency: f64) -> Self {
        Self {
            waveform: self.waveform,
            phase: wrap_phase(self.phase + frequency * dt),
        }
    }

    /// In-place form of [`OscillatorState::update`].
    #[inline]
    pub fn advance(&mut self, dt: f64, frequency: f64) {
        *self = self.update(dt, frequency);
    }
}

/// Wrap into `[0, 1)`. `rem_euclid` can round up to exactly 1.0 for tiny
/// negative inputs, so that case folds back to 0.
#[inline]
fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(1.0);
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
