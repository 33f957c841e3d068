//! Contains the logic to extract the bass notes a user struggles with from their practice logs.
//!
//! The analyzer is a single pass over a bounded page of session logs. It is deliberately
//! best-effort: a log with an unparseable event payload, a reference to a lesson that has since
//! been deleted, or a step index outside the lesson's sequence contributes no signal but never
//! fails the analysis. One corrupt historical log must never block generating a new lesson.

use ustr::UstrMap;

use crate::data::{LessonDefinition, SessionEvent, SessionLog};

/// Submissions scoring at or below this value are treated as a struggle.
pub const WEAK_SCORE_THRESHOLD: i64 = 5;

/// The maximum number of session logs considered by one analysis. Bounding the page keeps the
/// scan independent of the total history size; it is not a correctness requirement.
pub const MAX_ANALYZED_LOGS: usize = 50;

/// Returns the bass notes associated with low-scoring submissions in the given logs. Duplicates
/// are retained so that callers can rank notes by frequency; the order follows the log order and
/// then the event order within each log.
///
/// The logs are expected to be ordered most-recent-first and bounded to [`MAX_ANALYZED_LOGS`]
/// entries, and `lessons` is expected to hold the definitions for the lesson IDs the logs
/// reference. Missing entries are skipped, not errors.
pub fn analyze_weaknesses(
    logs: &[SessionLog],
    lessons: &UstrMap<LessonDefinition>,
) -> Vec<String> {
    let mut weak_notes = Vec::new();
    for log in logs {
        // A payload that fails to parse as a JSON array yields no signal from this log.
        let Ok(values) = serde_json::from_str::<Vec<serde_json::Value>>(&log.event_data) else {
            continue;
        };
        let Some(lesson) = lessons.get(&log.lesson_id) else {
            continue;
        };

        // Events are parsed one at a time so that a single malformed event, such as a negative
        // step index written by an older client, does not discard the signal from its siblings.
        for value in values {
            let Ok(event) = serde_json::from_value::<SessionEvent>(value) else {
                continue;
            };
            let SessionEvent::Submit {
                step_index,
                score_delta,
            } = event
            else {
                continue;
            };
            if score_delta > WEAK_SCORE_THRESHOLD {
                continue;
            }

            // Out-of-range indices come from lessons that were edited after the log was recorded
            // or from malformed events written by older clients. Skip them.
            let Some(step) = step_index.and_then(|index| lesson.sequence.get(index)) else {
                continue;
            };
            if !step.bass.is_empty() {
                weak_notes.push(step.bass.clone());
            }
        }
    }
    weak_notes
}
