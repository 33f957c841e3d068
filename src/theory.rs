//! Pure music theory routines for note names and expected realizations.
//!
//! The realization of a bass note is resolved through a fixed, finite lookup table instead of a
//! harmonic-analysis computation. The table covers the small set of bass notes the lesson
//! generator draws from; everything else resolves to an empty realization, which turns the step
//! into a pass-through with no chord validation. This is a deliberate MVP simplification.

use std::{collections::BTreeMap, sync::LazyLock};

/// The upper voices of a root-position major triad for each bass note the generator can emit.
/// The entries are ordered third then fifth, one octave placement each.
pub static TRIAD_REALIZATIONS: LazyLock<BTreeMap<&'static str, [&'static str; 2]>> =
    LazyLock::new(|| {
        BTreeMap::from([
            ("C3", ["E3", "G3"]),
            ("C4", ["E4", "G4"]),
            ("G3", ["B3", "D4"]),
            ("G2", ["B2", "D3"]),
            ("F3", ["A3", "C4"]),
            ("F2", ["A2", "C3"]),
            ("D3", ["F#3", "A3"]),
            ("A3", ["C#4", "E4"]),
            ("E3", ["G#3", "B3"]),
        ])
    });

/// Returns the expected upper voices for the given bass note, or an empty realization if the note
/// is not covered by the table.
pub fn triad_realization(bass: &str) -> Vec<String> {
    TRIAD_REALIZATIONS
        .get(bass)
        .map(|notes| notes.iter().map(|n| (*n).to_string()).collect())
        .unwrap_or_default()
}

/// Parses a note name (letter, optional `#` or `b` accidental, octave) into its pitch class and
/// octave. Returns `None` for anything that does not look like a note name.
fn parse_note(name: &str) -> Option<(u8, i32)> {
    let mut chars = name.chars();
    let base: i32 = match chars.next()?.to_ascii_uppercase() {
        'C' => 0,
        'D' => 2,
        'E' => 4,
        'F' => 5,
        'G' => 7,
        'A' => 9,
        'B' => 11,
        _ => return None,
    };

    let rest = chars.as_str();
    let (accidental, octave_str) = if let Some(stripped) = rest.strip_prefix('#') {
        (1, stripped)
    } else if let Some(stripped) = rest.strip_prefix('b') {
        (-1, stripped)
    } else {
        (0, rest)
    };

    let octave: i32 = octave_str.parse().ok()?;
    let pitch_class = (base + accidental).rem_euclid(12) as u8;
    Some((pitch_class, octave))
}

/// Returns the pitch class (0 to 11, C equals 0) of the given note name.
pub fn note_pitch_class(name: &str) -> Option<u8> {
    parse_note(name).map(|(pitch_class, _)| pitch_class)
}

/// Returns the MIDI number of the given note name (`C4` equals 60).
pub fn note_midi(name: &str) -> Option<i32> {
    parse_note(name).map(|(pitch_class, octave)| (octave + 1) * 12 + i32::from(pitch_class))
}

/// Returns whether the played chord matches the expected realization. The comparison is by pitch
/// class, so the student may voice the chord in any octave. An empty expected realization always
/// matches since such steps carry no chord validation.
pub fn matches_realization(played: &[String], expected: &[String]) -> bool {
    if expected.is_empty() {
        return true;
    }
    if played.is_empty() {
        return false;
    }

    let expected_classes: Vec<u8> = expected.iter().filter_map(|n| note_pitch_class(n)).collect();
    played.iter().all(|note| {
        note_pitch_class(note).is_some_and(|pitch_class| expected_classes.contains(&pitch_class))
    })
}
