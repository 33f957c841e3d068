//! Defines the library of lessons known to Continuo.
//!
//! Lessons come from two places. System-authored lessons are embedded in the binary as JSON and
//! parsed once when the library is opened. Generated lessons are produced by the lesson generator
//! at runtime and persisted to their own database so that session logs referencing them can still
//! be resolved after a restart. All lessons are served from an in-memory cache; the database is
//! only touched when a generated lesson is added or when the library is opened.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use rusqlite_migration::{M, Migrations};
use ustr::{Ustr, UstrMap};

use crate::{data::LessonDefinition, error::LessonLibraryError, generator::GENERATED_ID_PREFIX};

/// The embedded definitions of the system-authored lessons.
const SYSTEM_LESSONS_JSON: &str = include_str!("lesson_library/system_lessons.json");

/// An interface to retrieve lessons and store generated ones.
pub trait LessonLibrary {
    /// Returns the lesson with the given ID, if it exists.
    fn get_lesson(&self, lesson_id: &Ustr) -> Option<LessonDefinition>;

    /// Returns the IDs of all lessons in the library, sorted for stable output.
    fn get_lesson_ids(&self) -> Vec<Ustr>;

    /// Adds a generated lesson to the library and persists it. The lesson ID must carry the
    /// generated prefix and must not collide with an existing lesson.
    fn add_generated_lesson(
        &mut self,
        lesson: LessonDefinition,
    ) -> Result<(), LessonLibraryError>;
}

/// An implementation of [`LessonLibrary`] combining embedded system lessons with a SQLite store
/// of generated lessons.
pub struct LocalLessonLibrary {
    /// A cache of all known lessons, system and generated.
    cache: RwLock<UstrMap<LessonDefinition>>,

    /// A pool of connections to the database storing the generated lessons.
    pool: Pool<SqliteConnectionManager>,
}

impl LocalLessonLibrary {
    /// Returns all the migrations needed to set up the database.
    fn migrations() -> Migrations<'static> {
        Migrations::new(vec![
            // Generated lessons are stored as JSON blobs keyed by their ID. They are few and are
            // read only once at startup, so no richer schema is needed.
            M::up(
                "CREATE TABLE generated_lessons(
                lesson_id TEXT NOT NULL UNIQUE,
                lesson_json TEXT NOT NULL);",
            )
            .down("DROP TABLE generated_lessons;"),
            M::up("CREATE INDEX lesson_ids ON generated_lessons (lesson_id);")
                .down("DROP INDEX lesson_ids;"),
        ])
    }

    /// Initializes the database by running the migrations. If the migrations have been applied
    /// already, they will have no effect on the database.
    fn init(&mut self) -> Result<()> {
        let mut connection = self.pool.get()?;
        let migrations = Self::migrations();
        migrations
            .to_latest(&mut connection)
            .with_context(|| "failed to initialize generated lessons DB")
    }

    /// Parses the embedded system lessons into the cache.
    fn load_system_lessons(&mut self) -> Result<(), LessonLibraryError> {
        let lessons: Vec<LessonDefinition> = serde_json::from_str(SYSTEM_LESSONS_JSON)
            .with_context(|| "cannot parse embedded system lessons")
            .map_err(LessonLibraryError::InvalidSystemLessons)?;
        let mut cache = self.cache.write();
        for lesson in lessons {
            cache.insert(lesson.id, lesson);
        }
        Ok(())
    }

    /// Loads all previously generated lessons from the database into the cache.
    fn load_generated_lessons(&mut self) -> Result<()> {
        let connection = self.pool.get()?;
        let mut stmt = connection.prepare_cached("SELECT lesson_json FROM generated_lessons;")?;
        let mut rows = stmt.query(params![])?;

        let mut cache = self.cache.write();
        while let Some(row) = rows.next()? {
            let lesson_json: String = row.get(0)?;
            let lesson: LessonDefinition = serde_json::from_str(&lesson_json)
                .with_context(|| "cannot parse stored generated lesson")?;
            cache.insert(lesson.id, lesson);
        }
        Ok(())
    }

    /// A constructor taking a SQLite connection manager.
    pub(crate) fn new(connection_manager: SqliteConnectionManager) -> Result<LocalLessonLibrary> {
        let pool = Pool::new(connection_manager)?;
        let mut library = LocalLessonLibrary {
            cache: RwLock::new(UstrMap::default()),
            pool,
        };
        library.init()?;
        library.load_system_lessons()?;
        library.load_generated_lessons()?;
        Ok(library)
    }

    /// A constructor taking the path to a database file.
    pub fn new_from_disk(db_path: &str) -> Result<LocalLessonLibrary> {
        let connection_manager = SqliteConnectionManager::file(db_path).with_init(
            |connection: &mut Connection| -> Result<(), rusqlite::Error> {
                connection.pragma_update(None, "journal_mode", "WAL")?;
                connection.pragma_update(None, "synchronous", "NORMAL")
            },
        );
        Self::new(connection_manager)
    }

    /// Helper function to persist a generated lesson and update the cache.
    fn add_generated_lesson_helper(&mut self, lesson: LessonDefinition) -> Result<()> {
        let connection = self.pool.get()?;
        let mut stmt = connection.prepare_cached(
            "INSERT INTO generated_lessons (lesson_id, lesson_json) VALUES (?1, ?2);",
        )?;
        stmt.execute(params![
            lesson.id.as_str(),
            serde_json::to_string(&lesson)?
        ])?;

        self.cache.write().insert(lesson.id, lesson);
        Ok(())
    }
}

impl LessonLibrary for LocalLessonLibrary {
    fn get_lesson(&self, lesson_id: &Ustr) -> Option<LessonDefinition> {
        self.cache.read().get(lesson_id).cloned()
    }

    fn get_lesson_ids(&self) -> Vec<Ustr> {
        let mut ids: Vec<Ustr> = self.cache.read().keys().copied().collect();
        ids.sort();
        ids
    }

    fn add_generated_lesson(
        &mut self,
        lesson: LessonDefinition,
    ) -> Result<(), LessonLibraryError> {
        if !lesson.id.starts_with(GENERATED_ID_PREFIX) {
            return Err(LessonLibraryError::MissingGeneratedPrefix(lesson.id));
        }
        if self.cache.read().contains_key(&lesson.id) {
            return Err(LessonLibraryError::DuplicateLesson(lesson.id));
        }

        let lesson_id = lesson.id;
        self.add_generated_lesson_helper(lesson)
            .map_err(|e| LessonLibraryError::AddLesson(lesson_id, e))
    }
}
