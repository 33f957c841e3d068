//! Contains the errors returned by Continuo.

use thiserror::Error;
use ustr::Ustr;

/// An error returned when dealing with the lesson library.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum LessonLibraryError {
    #[error("cannot add lesson {0} to the library: {1}")]
    AddLesson(Ustr, #[source] anyhow::Error),

    #[error("a lesson with ID {0} already exists in the library")]
    DuplicateLesson(Ustr),

    #[error("the embedded system lessons are invalid: {0}")]
    InvalidSystemLessons(#[source] anyhow::Error),

    #[error("lesson ID {0} is missing the generated lesson prefix")]
    MissingGeneratedPrefix(Ustr),
}

/// An error returned when dealing with the practice logs.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum PracticeLogError {
    #[error("cannot get practice logs for user {0}: {1}")]
    GetLogs(Ustr, #[source] anyhow::Error),

    #[error("cannot open user {0}: {1}")]
    OpenUser(Ustr, #[source] anyhow::Error),

    #[error("cannot record practice session for user {0}: {1}")]
    RecordSession(Ustr, #[source] anyhow::Error),
}

/// An error returned when generating a targeted lesson for a user. The generator itself never
/// fails, so every variant wraps a failure from one of the stores it collaborates with.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum GenerateLessonError {
    #[error("cannot retrieve practice logs to analyze: {0}")]
    GetLogs(#[source] PracticeLogError),

    #[error("cannot save the generated lesson: {0}")]
    SaveLesson(#[source] LessonLibraryError),
}
