//! Control messages from note sources (keyboard, MIDI, sequencer) to the engine.
//!
//! Messages are plain `Copy` values. The engine applies them between ticks;
//! it never decides on its own when a note is released.

use crate::pitch::{midi_note_to_frequency, Pitch};
use crate::voice::NoteId;

/// Note lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlMsg {
    /// Trigger a note at a pitch.
    NoteOn { pitch: Pitch },

    /// Trigger a note at an already-resolved frequency in Hz.
    NoteOnFrequency { frequency: f64 },

    /// Release every held note playing this pitch.
    NoteOff { pitch: Pitch },

    /// Release one note by id.
    Release { note: NoteId },

    /// Release all held notes.
    AllNotesOff,
}

impl ControlMsg {
    /// Note-on for a MIDI note number.
    pub fn midi_note_on(note: u8) -> Self {
        ControlMsg::NoteOnFrequency {
            frequency: midi_note_to_frequency(note),
        }
    }
}
