// Note names to frequencies, and the drum-kit mapping.

// A4, also what any unreadable name plays at.
pub const DEFAULT_FREQ: f32 = 440.0;

const NOTE_NAMES: [&str; 12] = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];

// Finds the first `[A-G]#?[0-9]` in `name` and returns (semitone, octave).
// The match can start anywhere in the string; flats and lowercase letters
// never match. E# and B# have no slot in the sharp-only table and land on
// semitone -1, one below the octave's C (E#4 plays as B3).
pub fn parse_note(name: &str) -> Option<(i32, u8)> {
    let bytes = name.as_bytes();
    for i in 0..bytes.len() {
        if !(b'A'..=b'G').contains(&bytes[i]) {
            continue;
        }
        let sharp = bytes.get(i + 1) == Some(&b'#');
        let digit_at = if sharp { i + 2 } else { i + 1 };
        let Some(d) = bytes.get(digit_at).filter(|b| b.is_ascii_digit()) else {
            continue;
        };
        let pitch_class = &name[i..digit_at];
        let semitone = NOTE_NAMES
            .iter()
            .position(|n| *n == pitch_class)
            .map_or(-1, |p| p as i32);
        return Some((semitone, d - b'0'));
    }
    None
}

pub fn midi_number(semitone: i32, octave: u8) -> i32 {
    (octave as i32 + 1) * 12 + semitone
}

pub fn midi_to_freq(midi: i32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69) as f32 / 12.0)
}

// Equal-tempered frequency for a name like "F#4"; 440 Hz when unreadable.
pub fn note_frequency(name: &str) -> f32 {
    match parse_note(name) {
        Some((semitone, octave)) => midi_to_freq(midi_number(semitone, octave)),
        None => DEFAULT_FREQ,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrumKind {
    Kick,
    Snare,
    HiHat,
}

impl DrumKind {
    // C-class → kick, D-class → snare, anything else → hi-hat.
    //
    // Matching is a case-insensitive "contains", so stray letters elsewhere in
    // the name count too. Generated drum parts only ever use C3/D3/F#3.
    pub fn from_pitch(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains('c') {
            DrumKind::Kick
        } else if lower.contains('d') {
            DrumKind::Snare
        } else {
            DrumKind::HiHat
        }
    }
}
