//! Defines the basic data structures used by Continuo to describe lessons, the steps within them,
//! and the practice-session logs submitted by clients after a session is finished.
//!
//! Lessons and events are serialized as camelCase JSON because the records are exchanged with the
//! web client in that shape. The event payload of a session log is kept as the raw JSON string it
//! arrived in, so event kinds and fields this crate does not interpret pass through persistence
//! untouched.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use ustr::Ustr;

/// One bass note event within a lesson.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// The name of the bass note (pitch class plus octave, e.g. `"C3"`). An empty value means the
    /// step carries no bass note and is never reported by the weakness analyzer.
    #[serde(default)]
    pub bass: String,

    /// The figured-bass annotation for this step. Display only.
    #[serde(default)]
    pub figure: String,

    /// The duration of the step in beats.
    pub duration: f32,

    /// The upper-voice notes the student is expected to play above the bass. An empty list means
    /// no input is checked for this step.
    #[serde(default)]
    pub correct_answer: Vec<String>,
}

/// A named, ordered sequence of steps, plus the display metadata the client needs to render it.
///
/// Lessons have two provenances: system-authored lessons are embedded in the binary and loaded
/// once at startup, while generated lessons are produced by the lesson generator and persisted so
/// that later session logs can still resolve them.
#[derive(Builder, Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDefinition {
    /// The ID assigned to this lesson. For example, `l1` for a system lesson or
    /// `gen-06f8d6f4-…` for a generated one.
    #[builder(setter(into))]
    pub id: Ustr,

    /// The name of the lesson to be presented to the user.
    pub name: String,

    /// A description of the lesson.
    #[builder(default)]
    pub description: String,

    /// The key signature as a signed count of sharps (positive) or flats (negative).
    #[builder(default)]
    pub default_key: i8,

    /// The time signature as a (beats per bar, beat value) pair.
    #[builder(default = "(4, 4)")]
    pub time_signature: (u8, u8),

    /// The length of the lead-in before the first full bar, in beats.
    #[builder(default)]
    pub anacrusis_beats: f32,

    /// The tempo of the lesson in beats per minute.
    #[builder(default = "100")]
    pub tempo: u16,

    /// The ordered steps of the lesson.
    #[builder(default)]
    pub sequence: Vec<Step>,
}

/// A single scored interaction within a practice session.
///
/// Only `submit` events are interpreted by this crate. Every other kind deserializes to the
/// opaque variant and is carried along without further inspection.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// The student submitted a chord for the step at `step_index` and the client's scoring logic
    /// awarded `score_delta` points for it.
    #[serde(rename = "submit", rename_all = "camelCase")]
    Submit {
        /// The position of the step within the lesson's sequence. Missing in events recorded by
        /// some older clients.
        #[serde(default)]
        step_index: Option<usize>,

        /// The signed point adjustment for the submission. Missing values default to zero, which
        /// counts as a struggle.
        #[serde(default)]
        score_delta: i64,
    },

    /// Any event kind this crate does not interpret.
    #[serde(other)]
    Other,
}

/// One completed practice session. Created when a client submits a finished session and immutable
/// once persisted.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionLog {
    /// The ID of the user who practiced.
    pub user_id: Ustr,

    /// The ID of the lesson that was practiced. May reference a lesson that has since been
    /// deleted; consumers must not assume the ID resolves.
    pub lesson_id: Ustr,

    /// The timestamp at which the session was recorded.
    pub timestamp: i64,

    /// The duration of the session in milliseconds.
    pub duration_ms: i64,

    /// The final score of the session.
    pub score: i64,

    /// The raw JSON array of session events, stored verbatim.
    pub event_data: String,
}
