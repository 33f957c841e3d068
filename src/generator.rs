//! Contains the logic to synthesize a targeted practice lesson from a user's weak notes.
//!
//! The generator interleaves a fixed anchor note with drill steps on the notes the user most
//! often missed, so every repetition returns to familiar ground before the next challenge. It is
//! a pure function over its inputs: the only nondeterminism is the random draw of the target for
//! each repetition, and the randomness source is injected so generation is deterministic under a
//! seeded generator. The function never fails, whatever the input.

use rand::Rng;
use ustr::Ustr;
use uuid::Uuid;

use crate::{
    data::{LessonDefinition, Step},
    theory::triad_realization,
};

/// The prefix distinguishing generated lesson IDs from system-authored ones.
pub const GENERATED_ID_PREFIX: &str = "gen-";

/// The bass note every drill returns to between target steps.
pub const ANCHOR_NOTE: &str = "C3";

/// The number of anchor/target pairs in a generated lesson.
pub const TARGET_REPETITIONS: usize = 4;

/// The maximum number of distinct notes a drill is built around.
pub const MAX_TARGET_NOTES: usize = 3;

/// The targets used when the analysis found no weak notes.
pub const DEFAULT_TARGET_NOTES: [&str; 4] = ["C3", "G3", "F3", "D3"];

/// The tempo of generated lessons in beats per minute.
pub const GENERATED_LESSON_TEMPO: u16 = 100;

/// The name given to every generated lesson.
const GENERATED_LESSON_NAME: &str = "Targeted Practice";

/// The description used when there are no weak notes to drill.
const FALLBACK_DESCRIPTION: &str = "A drill of common bass notes to build a baseline.";

/// The figure label marking the drill steps.
const TARGET_FIGURE: &str = "Target";

/// The duration in beats of the anchor and target steps.
const DRILL_STEP_BEATS: f32 = 2.0;

/// The duration in beats of the closing step.
const CLOSING_STEP_BEATS: f32 = 1.0;

/// Returns the up to [`MAX_TARGET_NOTES`] most frequent notes in the input. Ties are broken by
/// first occurrence, so the counting order is stable across calls.
pub fn select_targets(weak_notes: &[String]) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for note in weak_notes {
        match counts.iter_mut().find(|(name, _)| *name == note) {
            Some((_, count)) => *count += 1,
            None => counts.push((note, 1)),
        }
    }

    // A stable sort preserves the first-seen order among notes with equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(MAX_TARGET_NOTES);
    counts.iter().map(|(name, _)| (*name).to_string()).collect()
}

/// Builds one step of the drill with the expected realization for its bass note.
fn drill_step(bass: &str, figure: &str) -> Step {
    Step {
        bass: bass.to_string(),
        figure: figure.to_string(),
        duration: DRILL_STEP_BEATS,
        correct_answer: triad_realization(bass),
    }
}

/// Synthesizes a new lesson biased toward the given weak notes. An empty input produces a general
/// drill over [`DEFAULT_TARGET_NOTES`]. Each repetition draws its target independently, with
/// replacement, so the same target may appear more than once and coverage of the targets across
/// the repetitions is not guaranteed to be even.
pub fn generate_targeted_lesson(weak_notes: &[String], rng: &mut impl Rng) -> LessonDefinition {
    let (targets, description) = if weak_notes.is_empty() {
        let targets: Vec<String> = DEFAULT_TARGET_NOTES.iter().map(|n| n.to_string()).collect();
        (targets, FALLBACK_DESCRIPTION.to_string())
    } else {
        let targets = select_targets(weak_notes);
        let description = format!("Drills your weakest bass notes: {}.", targets.join(", "));
        (targets, description)
    };

    // Alternate the anchor with a randomly drawn target, then close on a bare anchor step with no
    // expected realization.
    let mut sequence = Vec::with_capacity(2 * TARGET_REPETITIONS + 1);
    for _ in 0..TARGET_REPETITIONS {
        sequence.push(drill_step(ANCHOR_NOTE, ""));
        let target = &targets[rng.random_range(0..targets.len())];
        sequence.push(drill_step(target, TARGET_FIGURE));
    }
    sequence.push(Step {
        bass: ANCHOR_NOTE.to_string(),
        figure: String::new(),
        duration: CLOSING_STEP_BEATS,
        correct_answer: vec![],
    });

    LessonDefinition {
        id: Ustr::from(&format!("{GENERATED_ID_PREFIX}{}", Uuid::new_v4())),
        name: GENERATED_LESSON_NAME.to_string(),
        description,
        default_key: 0,
        time_signature: (4, 4),
        anacrusis_beats: 0.0,
        tempo: GENERATED_LESSON_TEMPO,
        sequence,
    }
}
