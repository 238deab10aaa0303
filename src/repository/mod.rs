use crate::models::{Folder, NewNote, NewUser, Note, NotePatch, NoteQuery, Tag, UserRecord};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures surfaced by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// A unique constraint (username, folder/tag name, note title) was violated.
    #[error("unique constraint violated")]
    Conflict,

    /// A write pointed at a row that no longer exists, e.g. a folder deleted between
    /// the ownership check and the insert.
    #[error("referenced {0:?} does not exist")]
    MissingReference(Reference),

    #[error(transparent)]
    Database(sqlx::Error),
}

/// The kind of row a failed reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Folder,
    Tag,
    Note,
    Other,
}

// Foreign key names declared in the migrations.
const NOTES_FOLDER_FKEY: &str = "notes_folder_id_fkey";
const NOTE_TAGS_TAG_FKEY: &str = "note_tags_tag_id_fkey";
const NOTE_TAGS_NOTE_FKEY: &str = "note_tags_note_id_fkey";

impl From<sqlx::Error> for RepositoryError {
    fn from(error: sqlx::Error) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => RepositoryError::Conflict,
            sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                let reference = match db.constraint() {
                    Some(NOTES_FOLDER_FKEY) => Reference::Folder,
                    Some(NOTE_TAGS_TAG_FKEY) => Reference::Tag,
                    Some(NOTE_TAGS_NOTE_FKEY) => Reference::Note,
                    _ => Reference::Other,
                };
                RepositoryError::MissingReference(reference)
            }
            _ => RepositoryError::Database(error),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// The abstract contract for all persistence operations. Handlers and services only
/// see this trait, so the Postgres backend and the in-memory backend are
/// interchangeable.
///
/// Methods taking a `user_id` are scoped to that owner: a row owned by someone else
/// behaves exactly like a missing row. `get_folder` and `get_tag` are unscoped; the
/// ownership validator compares owners itself.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> RepoResult<UserRecord>;
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>>;
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<UserRecord>>;

    // --- Folders ---
    // Sorted by name.
    async fn list_folders(&self, user_id: Uuid) -> RepoResult<Vec<Folder>>;
    async fn get_folder(&self, id: Uuid) -> RepoResult<Option<Folder>>;
    async fn create_folder(&self, user_id: Uuid, name: String) -> RepoResult<Folder>;
    async fn rename_folder(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Folder>>;
    // Notes in the folder keep existing with no folder.
    async fn delete_folder(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;

    // --- Tags ---
    // Sorted by name.
    async fn list_tags(&self, user_id: Uuid) -> RepoResult<Vec<Tag>>;
    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>>;
    async fn create_tag(&self, user_id: Uuid, name: String) -> RepoResult<Tag>;
    async fn rename_tag(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Tag>>;
    // The tag is pulled from every note that carried it.
    async fn delete_tag(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;

    // --- Notes ---
    // Most recently updated first.
    async fn list_notes(&self, user_id: Uuid, query: &NoteQuery) -> RepoResult<Vec<Note>>;
    async fn get_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<Option<Note>>;
    async fn create_note(&self, user_id: Uuid, note: NewNote) -> RepoResult<Note>;
    async fn update_note(&self, id: Uuid, user_id: Uuid, patch: NotePatch) -> RepoResult<Option<Note>>;
    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in the application state.
pub type RepositoryState = Arc<dyn Repository>;
