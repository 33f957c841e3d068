//! Continuo is a practice engine for figured-bass realization. A student is shown a sequence of
//! bass notes with figured-bass annotations and plays the expected upper voices; the client
//! scores each submission and reports the finished session back as a log of events.
//!
//! Given those logs, Continuo finds the bass notes a user keeps getting wrong and synthesizes new
//! drill lessons biased toward them. The analysis and the generation are pure, synchronous
//! functions over already-materialized inputs; this crate additionally provides the stores that
//! materialize them: a SQLite-backed log of practice sessions and a lesson library combining
//! embedded system lessons with persisted generated ones.
//!
//! Continuo is named after basso continuo, the baroque practice of improvising chords above a
//! notated bass line, which is exactly the skill it is meant to train.

pub mod analysis;
pub mod data;
pub mod error;
pub mod generator;
pub mod lesson_library;
pub mod practice_log;
pub mod theory;

use anyhow::{Result, anyhow};
use parking_lot::RwLock;
use std::{fs::create_dir, path::Path, sync::Arc};
use ustr::{Ustr, UstrMap};

use analysis::{MAX_ANALYZED_LOGS, analyze_weaknesses};
use data::{LessonDefinition, SessionLog};
use error::{GenerateLessonError, LessonLibraryError, PracticeLogError};
use generator::generate_targeted_lesson;
use lesson_library::{LessonLibrary, LocalLessonLibrary};
use practice_log::{PracticeLog, PracticeLogDB};

/// The path to the folder inside the practice root containing the user data.
const CONTINUO_CONFIG_DIR_PATH: &str = ".continuo";

/// The path to the SQLite database containing the users and their session logs.
const PRACTICE_LOGS_PATH: &str = "practice_logs.db";

/// The path to the SQLite database containing the generated lessons.
const GENERATED_LESSONS_PATH: &str = "generated_lessons.db";

/// Continuo ties the lesson library and the practice logs together and exposes the high-level
/// operation built on top of them: generating a new targeted lesson for a user from their recent
/// practice history. The serving layer (HTTP, desktop client) sits outside this crate and talks
/// to it only through plain data records.
pub struct Continuo {
    /// The path to the root of the practice directory.
    root: String,

    /// The library of system-authored and generated lessons.
    lesson_library: Arc<RwLock<dyn LessonLibrary + Send + Sync>>,

    /// The store of users and their practice-session logs.
    practice_log: Arc<RwLock<dyn PracticeLog + Send + Sync>>,
}

impl Continuo {
    /// Initializes the config directory at path .continuo inside the practice root.
    fn init_config_directory(root: &str) -> Result<()> {
        let root_path = Path::new(root);
        if !root_path.is_dir() {
            return Err(anyhow!("root must be the path to a directory"));
        }

        // Create the config folder inside the root if it does not exist already.
        let config_path = root_path.join(CONTINUO_CONFIG_DIR_PATH);
        if !config_path.exists() {
            create_dir(config_path.clone()).map_err(|e| {
                anyhow!(
                    "failed to create config directory at {}: {}",
                    config_path.display(),
                    e
                )
            })?;
        } else if !config_path.is_dir() {
            return Err(anyhow!(
                "config path .continuo inside the root must be a directory"
            ));
        }
        Ok(())
    }

    /// Creates a new instance of Continuo given the path to the root of the practice directory.
    /// The user data will be stored in a directory named .continuo inside the root.
    pub fn new(root: &str) -> Result<Continuo> {
        Self::init_config_directory(root)?;
        let config_path = Path::new(root).join(Path::new(CONTINUO_CONFIG_DIR_PATH));

        let lesson_library = Arc::new(RwLock::new(LocalLessonLibrary::new_from_disk(
            config_path
                .join(GENERATED_LESSONS_PATH)
                .to_str()
                .ok_or_else(|| anyhow!("invalid lessons database path"))?,
        )?));
        let practice_log = Arc::new(RwLock::new(PracticeLogDB::new_from_disk(
            config_path
                .join(PRACTICE_LOGS_PATH)
                .to_str()
                .ok_or_else(|| anyhow!("invalid practice logs database path"))?,
        )?));

        Ok(Continuo {
            root: root.to_string(),
            lesson_library,
            practice_log,
        })
    }

    /// Returns the path to the root of the practice directory.
    pub fn root(&self) -> String {
        self.root.clone()
    }

    /// Generates, persists, and returns a new targeted lesson for the given user.
    ///
    /// The user's most recent session logs are analyzed for weak bass notes and the resulting
    /// lesson drills the most frequent ones. A user with no history, or whose history yields no
    /// signal (corrupt payloads, deleted lessons), gets the default drill; bad historical data
    /// never blocks generation.
    pub fn generate_lesson(
        &mut self,
        user_id: &Ustr,
    ) -> Result<LessonDefinition, GenerateLessonError> {
        let logs = self
            .practice_log
            .read()
            .get_recent_logs(user_id, MAX_ANALYZED_LOGS)
            .map_err(GenerateLessonError::GetLogs)?;

        // Resolve the lessons referenced by the logs. IDs that no longer resolve are simply
        // absent from the lookup, and the analyzer skips the logs that reference them.
        let mut lessons = UstrMap::default();
        {
            let library = self.lesson_library.read();
            for log in &logs {
                if let Some(lesson) = library.get_lesson(&log.lesson_id) {
                    lessons.insert(log.lesson_id, lesson);
                }
            }
        }

        let weak_notes = analyze_weaknesses(&logs, &lessons);
        let lesson = generate_targeted_lesson(&weak_notes, &mut rand::rng());
        self.lesson_library
            .write()
            .add_generated_lesson(lesson.clone())
            .map_err(GenerateLessonError::SaveLesson)?;
        Ok(lesson)
    }
}

impl LessonLibrary for Continuo {
    fn get_lesson(&self, lesson_id: &Ustr) -> Option<LessonDefinition> {
        self.lesson_library.read().get_lesson(lesson_id)
    }

    fn get_lesson_ids(&self) -> Vec<Ustr> {
        self.lesson_library.read().get_lesson_ids()
    }

    fn add_generated_lesson(
        &mut self,
        lesson: LessonDefinition,
    ) -> Result<(), LessonLibraryError> {
        self.lesson_library.write().add_generated_lesson(lesson)
    }
}

impl PracticeLog for Continuo {
    fn open_user(&mut self, user_id: &Ustr, timestamp: i64) -> Result<bool, PracticeLogError> {
        self.practice_log.write().open_user(user_id, timestamp)
    }

    fn record_session(&mut self, log: &SessionLog) -> Result<(), PracticeLogError> {
        self.practice_log.write().record_session(log)
    }

    fn get_recent_logs(
        &self,
        user_id: &Ustr,
        num_logs: usize,
    ) -> Result<Vec<SessionLog>, PracticeLogError> {
        self.practice_log.read().get_recent_logs(user_id, num_logs)
    }
}
