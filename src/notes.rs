use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{CreateNoteRequest, Note, NoteFilter, NoteQuery, UpdateNoteRequest},
    ownership::OwnershipValidator,
    repository::{Reference, RepositoryError, RepositoryState},
    validation::{self, INVALID_FOLDER_ID, INVALID_TAG_ID, parse_id, parse_path_id},
};

pub const DUPLICATE_TITLE: &str = "A note with this title already exists";

/// NoteService
///
/// Reads and writes notes on behalf of one authenticated user. Every mutation runs
/// the same pipeline: shape validation, then ownership validation, then the write.
/// A failure at any stage returns before storage is touched.
#[derive(Clone)]
pub struct NoteService {
    repo: RepositoryState,
    ownership: OwnershipValidator,
}

impl NoteService {
    pub fn new(repo: RepositoryState) -> Self {
        Self {
            ownership: OwnershipValidator::new(repo.clone()),
            repo,
        }
    }

    /// list
    ///
    /// All of the user's notes matching every supplied filter, newest update first.
    /// A filter id that is not a valid identifier cannot match anything.
    pub async fn list(&self, user_id: Uuid, filter: NoteFilter) -> Result<Vec<Note>> {
        let folder_id = match filter.folder_id.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => match parse_id(raw) {
                Some(id) => Some(id),
                None => return Ok(vec![]),
            },
            None => None,
        };
        let tag_id = match filter.tag_id.as_deref().filter(|s| !s.is_empty()) {
            Some(raw) => match parse_id(raw) {
                Some(id) => Some(id),
                None => return Ok(vec![]),
            },
            None => None,
        };

        let query = NoteQuery {
            search_term: filter.search_term.filter(|s| !s.is_empty()),
            folder_id,
            tag_id,
        };
        Ok(self.repo.list_notes(user_id, &query).await?)
    }

    /// get
    ///
    /// A note the user does not own is reported as not found.
    pub async fn get(&self, user_id: Uuid, id: &str) -> Result<Note> {
        let id = parse_path_id(id)?;
        self.repo.get_note(id, user_id).await?.ok_or(ApiError::NotFound)
    }

    pub async fn create(&self, user_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let new_note = validation::validate_new_note(req)?;
        self.ownership
            .check(user_id, new_note.folder_id, &new_note.tags)
            .await?;

        let note = self
            .repo
            .create_note(user_id, new_note)
            .await
            .map_err(note_write_error)?;
        tracing::info!(note_id = %note.id, %user_id, "note created");
        Ok(note)
    }

    /// update
    ///
    /// Applies only the supplied fields. Concurrent updates are not versioned; the
    /// last write wins.
    pub async fn update(&self, user_id: Uuid, id: &str, req: UpdateNoteRequest) -> Result<Note> {
        let id = parse_path_id(id)?;
        let patch = validation::validate_note_patch(req)?;
        self.ownership
            .check(user_id, patch.folder.target(), patch.tags.as_deref().unwrap_or_default())
            .await?;

        self.repo
            .update_note(id, user_id, patch)
            .await
            .map_err(note_write_error)?
            .ok_or(ApiError::NotFound)
    }

    /// delete
    ///
    /// Deleting an id that does not exist (or is not owned) is not found, not a no-op.
    pub async fn delete(&self, user_id: Uuid, id: &str) -> Result<()> {
        let id = parse_path_id(id)?;
        if self.repo.delete_note(id, user_id).await? {
            tracing::info!(note_id = %id, %user_id, "note deleted");
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }
}

/// Maps a failed note write. The ownership check and the write are separate steps,
/// so a folder or tag deleted in between surfaces here as a missing reference and is
/// reported like any other invalid reference.
fn note_write_error(error: RepositoryError) -> ApiError {
    match error {
        RepositoryError::MissingReference(Reference::Folder) => ApiError::validation(INVALID_FOLDER_ID),
        RepositoryError::MissingReference(Reference::Tag) => ApiError::validation(INVALID_TAG_ID),
        RepositoryError::MissingReference(Reference::Note) => ApiError::NotFound,
        other => conflict_as(DUPLICATE_TITLE)(other),
    }
}

/// Maps a unique-key violation to a 400 with `message`; other storage errors pass through.
pub fn conflict_as(message: &'static str) -> impl Fn(RepositoryError) -> ApiError {
    move |e| match e {
        RepositoryError::Conflict => ApiError::Conflict(message.to_string()),
        other => ApiError::Storage(other),
    }
}
