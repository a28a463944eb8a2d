//! Pitch module: pitch classes, piano key indices and equal-temperament frequencies.
//!
//! Key index 1 is the lowest key of an 88-key piano (A0) and key index 49 is
//! A4 (440 Hz). All conversions are total; none of them allocate.

use std::fmt;
use std::str::FromStr;

/// Tuning reference for key index 49 (A4).
pub const A4_FREQUENCY: f64 = 440.0;

/// Key index of the tuning reference.
pub const A4_KEY_INDEX: i32 = 49;

/// Offset between a key index and the chromatic position `octave * 12 + class`.
const KEY_OFFSET: i32 = 8;

/// Offset between a key index and a MIDI note number.
const MIDI_OFFSET: i32 = 20;

/// One of the twelve notes within an octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    /// All pitch classes in chromatic order, starting from C.
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    /// Semitones above C.
    pub fn index(self) -> i32 {
        self as i32
    }

    /// Pitch class for a semitone offset, wrapping cyclically.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(12) as usize]
    }

    /// Pitch class `semitones` above this one, wrapping around the octave.
    pub fn transpose(self, semitones: i32) -> Self {
        Self::from_index(self.index() + semitones)
    }

    fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }
}

/// A pitch class in a given octave (scientific pitch notation, C4 = middle C).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub class: PitchClass,
    pub octave: i32,
}

impl Pitch {
    pub fn new(class: PitchClass, octave: i32) -> Self {
        Self { class, octave }
    }

    pub fn key_index(self) -> KeyIndex {
        pitch_to_key_index(self)
    }

    pub fn frequency(self) -> f64 {
        pitch_to_frequency(self)
    }
}

/// Position of a piano key across all octaves; 1 is A0, 49 is A4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyIndex(pub i32);

impl KeyIndex {
    /// Key index for a MIDI note number (MIDI 69 = key 49).
    pub fn from_midi_note(note: u8) -> Self {
        KeyIndex(note as i32 - MIDI_OFFSET)
    }

    /// MIDI note number, if this key lies in the MIDI range 0..=127.
    pub fn to_midi_note(self) -> Option<u8> {
        u8::try_from(self.0 + MIDI_OFFSET).ok().filter(|n| *n <= 127)
    }

    pub fn frequency(self) -> f64 {
        key_index_to_frequency(self)
    }

    pub fn pitch(self) -> Pitch {
        key_index_to_pitch(self)
    }
}

pub fn pitch_to_key_index(pitch: Pitch) -> KeyIndex {
    KeyIndex(pitch.octave * 12 + pitch.class.index() - KEY_OFFSET)
}

pub fn key_index_to_pitch(key: KeyIndex) -> Pitch {
    let chromatic = key.0 + KEY_OFFSET;
    Pitch {
        class: PitchClass::from_index(chromatic),
        octave: chromatic.div_euclid(12),
    }
}

/// Equal-temperament frequency: `440 * 2^((k - 49) / 12)`.
pub fn key_index_to_frequency(key: KeyIndex) -> f64 {
    A4_FREQUENCY * 2f64.powf((key.0 - A4_KEY_INDEX) as f64 / 12.0)
}

/// Inverse of [`key_index_to_frequency`]. Fractional for off-grid frequencies;
/// no rounding is applied.
pub fn frequency_to_key_index(frequency: f64) -> f64 {
    A4_KEY_INDEX as f64 + 12.0 * (frequency / A4_FREQUENCY).log2()
}

pub fn pitch_to_frequency(pitch: Pitch) -> f64 {
    key_index_to_frequency(pitch_to_key_index(pitch))
}

/// Frequency of a MIDI note number.
pub fn midi_note_to_frequency(note: u8) -> f64 {
    key_index_to_frequency(KeyIndex::from_midi_note(note))
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.class, self.octave)
    }
}

/// Errors from parsing a pitch name such as `"C#4"` or `"Bb3"`.
#[derive(Debug, Clone, PartialEq)]
pub enum PitchParseError {
    /// Input was empty.
    Empty,
    /// Letter was not one of A-G.
    InvalidLetter(char),
    /// Octave number missing or not an integer.
    InvalidOctave(String),
}

impl fmt::Display for PitchParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PitchParseError::Empty => write!(f, "empty pitch name"),
            PitchParseError::InvalidLetter(c) => write!(f, "invalid pitch letter '{}'", c),
            PitchParseError::InvalidOctave(s) => write!(f, "invalid octave '{}'", s),
        }
    }
}

impl std::error::Error for PitchParseError {}

impl FromStr for Pitch {
    type Err = PitchParseError;

    /// Parses `<letter>[#|b]<octave>`. Accidentals may carry the pitch across
    /// an octave boundary (`Cb4` is `B3`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let letter = chars.next().ok_or(PitchParseError::Empty)?;
        let natural = match letter.to_ascii_uppercase() {
            'C' => PitchClass::C,
            'D' => PitchClass::D,
            'E' => PitchClass::E,
            'F' => PitchClass::F,
            'G' => PitchClass::G,
            'A' => PitchClass::A,
            'B' => PitchClass::B,
            other => return Err(PitchParseError::InvalidLetter(other)),
        };
        let rest = chars.as_str();
        let (shift, octave_str) = if let Some(r) = rest.strip_prefix('#') {
            (1, r)
        } else if let Some(r) = rest.strip_prefix('b') {
            (-1, r)
        } else {
            (0, rest)
        };
        let octave: i32 = octave_str
            .parse()
            .map_err(|_| PitchParseError::InvalidOctave(octave_str.to_string()))?;
        let chromatic = octave * 12 + natural.index() + shift;
        Ok(Pitch {
            class: PitchClass::from_index(chromatic),
            octave: chromatic.div_euclid(12),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn a4_is_key_49_at_440() {
        let a4 = Pitch::new(PitchClass::A, 4);
        assert_eq!(pitch_to_key_index(a4), KeyIndex(49));
        assert_eq!(key_index_to_frequency(KeyIndex(49)), 440.0);
    }

    #[test]
    fn lowest_key_is_a0() {
        assert_eq!(key_index_to_pitch(KeyIndex(1)), Pitch::new(PitchClass::A, 0));
        assert_eq!(key_index_to_pitch(KeyIndex(88)), Pitch::new(PitchClass::C, 8));
    }

    #[test]
    fn middle_c() {
        let c4 = Pitch::new(PitchClass::C, 4);
        assert_eq!(c4.key_index(), KeyIndex(40));
        assert!((c4.frequency() - 261.6256).abs() < 1e-3);
    }

    #[test]
    fn frequency_to_key_index_is_fractional() {
        assert!((frequency_to_key_index(440.0) - 49.0).abs() < 1e-12);
        let between = frequency_to_key_index(450.0);
        assert!(between > 49.0 && between < 50.0);
    }

    #[test]
    fn midi_bridge() {
        assert_eq!(KeyIndex::from_midi_note(69), KeyIndex(49));
        assert_eq!(KeyIndex(49).to_midi_note(), Some(69));
        assert_eq!(KeyIndex(-30).to_midi_note(), None);
        assert_eq!(midi_note_to_frequency(69), 440.0);
    }

    #[test]
    fn pitch_class_wraps() {
        assert_eq!(PitchClass::B.transpose(1), PitchClass::C);
        assert_eq!(PitchClass::C.transpose(-1), PitchClass::B);
        assert_eq!(PitchClass::from_index(24 + 9), PitchClass::A);
    }

    #[test]
    fn parse_and_display() {
        assert_eq!("C#4".parse::<Pitch>(), Ok(Pitch::new(PitchClass::Cs, 4)));
        assert_eq!("Db4".parse::<Pitch>(), Ok(Pitch::new(PitchClass::Cs, 4)));
        assert_eq!("Cb4".parse::<Pitch>(), Ok(Pitch::new(PitchClass::B, 3)));
        assert_eq!("a0".parse::<Pitch>(), Ok(Pitch::new(PitchClass::A, 0)));
        assert_eq!(Pitch::new(PitchClass::Fs, 2).to_string(), "F#2");
        assert_eq!("".parse::<Pitch>(), Err(PitchParseError::Empty));
        assert_eq!("H4".parse::<Pitch>(), Err(PitchParseError::InvalidLetter('H')));
        assert!(matches!(
            "C".parse::<Pitch>(),
            Err(PitchParseError::InvalidOctave(_))
        ));
    }

    proptest! {
        #[test]
        fn key_index_round_trips(k in 1..=108i32) {
            let key = KeyIndex(k);
            prop_assert_eq!(pitch_to_key_index(key_index_to_pitch(key)), key);
        }

        #[test]
        fn frequency_round_trips(k in 1..=108i32) {
            let f = key_index_to_frequency(KeyIndex(k));
            prop_assert!((frequency_to_key_index(f) - k as f64).abs() < 1e-9);
        }

        #[test]
        fn octave_doubles_frequency(k in 1..=96i32) {
            let lo = key_index_to_frequency(KeyIndex(k));
            let hi = key_index_to_frequency(KeyIndex(k + 12));
            prop_assert!((hi - 2.0 * lo).abs() < 1e-9 * hi);
            prop_assert!(key_index_to_frequency(KeyIndex(k + 1)) > lo);
        }

        #[test]
        fn display_parse_round_trips(k in 1..=108i32) {
            let pitch = key_index_to_pitch(KeyIndex(k));
            prop_assert_eq!(pitch.to_string().parse::<Pitch>(), Ok(pitch));
        }
    }
}
