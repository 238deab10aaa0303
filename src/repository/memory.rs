use super::{Reference, RepoResult, Repository, RepositoryError};
use crate::models::{Folder, FolderChange, NewNote, NewUser, Note, NotePatch, NoteQuery, Tag, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// A note as stored: tags are kept as ordered ids and resolved on read.
#[derive(Debug, Clone)]
struct StoredNote {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: Option<String>,
    folder_id: Option<Uuid>,
    tag_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, UserRecord>,
    folders: HashMap<Uuid, Folder>,
    tags: HashMap<Uuid, Tag>,
    notes: HashMap<Uuid, StoredNote>,
}

impl Store {
    fn resolve(&self, note: &StoredNote) -> Note {
        Note {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            folder_id: note.folder_id,
            tags: note
                .tag_ids
                .iter()
                .filter_map(|id| self.tags.get(id).cloned())
                .collect(),
            user_id: note.user_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
        }
    }

    fn folder_name_taken(&self, user_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.folders
            .values()
            .any(|f| f.user_id == user_id && f.name == name && Some(f.id) != except)
    }

    fn tag_name_taken(&self, user_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        self.tags
            .values()
            .any(|t| t.user_id == user_id && t.name == name && Some(t.id) != except)
    }

    fn note_title_taken(&self, user_id: Uuid, title: &str, except: Option<Uuid>) -> bool {
        self.notes
            .values()
            .any(|n| n.user_id == user_id && n.title == title && Some(n.id) != except)
    }

    /// The first folder or tag reference with no row behind it, as the schema's
    /// foreign keys would report it.
    fn missing_reference(&self, folder_id: Option<Uuid>, tag_ids: &[Uuid]) -> Option<Reference> {
        if folder_id.is_some_and(|id| !self.folders.contains_key(&id)) {
            return Some(Reference::Folder);
        }
        if tag_ids.iter().any(|id| !self.tags.contains_key(id)) {
            return Some(Reference::Tag);
        }
        None
    }

    fn matches(note: &StoredNote, query: &NoteQuery, needle: Option<&str>) -> bool {
        if let Some(needle) = needle {
            let in_title = note.title.to_lowercase().contains(needle);
            let in_content = note
                .content
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(needle));
            if !in_title && !in_content {
                return false;
            }
        }
        if query.folder_id.is_some() && note.folder_id != query.folder_id {
            return false;
        }
        if let Some(tag_id) = query.tag_id {
            if !note.tag_ids.contains(&tag_id) {
                return false;
            }
        }
        true
    }
}

/// InMemoryRepository
///
/// A `Repository` that keeps everything in process memory. Used by the test suites
/// and by local runs without `DATABASE_URL`. It enforces the same unique keys, foreign
/// keys and delete behaviour as the Postgres schema.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn create_user(&self, user: NewUser) -> RepoResult<UserRecord> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.username == user.username) {
            return Err(RepositoryError::Conflict);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            username: user.username,
            password_digest: user.password_digest,
            fullname: user.fullname,
            created_at: Utc::now(),
        };
        store.users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<UserRecord>> {
        let store = self.store.read().await;
        Ok(store.users.values().find(|u| u.username == username).cloned())
    }

    async fn list_folders(&self, user_id: Uuid) -> RepoResult<Vec<Folder>> {
        let store = self.store.read().await;
        let mut folders: Vec<Folder> = store
            .folders
            .values()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(folders)
    }

    async fn get_folder(&self, id: Uuid) -> RepoResult<Option<Folder>> {
        Ok(self.store.read().await.folders.get(&id).cloned())
    }

    async fn create_folder(&self, user_id: Uuid, name: String) -> RepoResult<Folder> {
        let mut store = self.store.write().await;
        if store.folder_name_taken(user_id, &name, None) {
            return Err(RepositoryError::Conflict);
        }
        let now = Utc::now();
        let folder = Folder {
            id: Uuid::new_v4(),
            name,
            user_id,
            created_at: now,
            updated_at: now,
        };
        store.folders.insert(folder.id, folder.clone());
        Ok(folder)
    }

    async fn rename_folder(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Folder>> {
        let mut store = self.store.write().await;
        if !store.folders.get(&id).is_some_and(|f| f.user_id == user_id) {
            return Ok(None);
        }
        if store.folder_name_taken(user_id, &name, Some(id)) {
            return Err(RepositoryError::Conflict);
        }
        let folder = store.folders.get_mut(&id).map(|folder| {
            folder.name = name;
            folder.updated_at = Utc::now();
            folder.clone()
        });
        Ok(folder)
    }

    async fn delete_folder(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        if !store.folders.get(&id).is_some_and(|f| f.user_id == user_id) {
            return Ok(false);
        }
        store.folders.remove(&id);
        for note in store.notes.values_mut() {
            if note.folder_id == Some(id) {
                note.folder_id = None;
            }
        }
        Ok(true)
    }

    async fn list_tags(&self, user_id: Uuid) -> RepoResult<Vec<Tag>> {
        let store = self.store.read().await;
        let mut tags: Vec<Tag> = store
            .tags
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>> {
        Ok(self.store.read().await.tags.get(&id).cloned())
    }

    async fn create_tag(&self, user_id: Uuid, name: String) -> RepoResult<Tag> {
        let mut store = self.store.write().await;
        if store.tag_name_taken(user_id, &name, None) {
            return Err(RepositoryError::Conflict);
        }
        let now = Utc::now();
        let tag = Tag {
            id: Uuid::new_v4(),
            name,
            user_id,
            created_at: now,
            updated_at: now,
        };
        store.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn rename_tag(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Tag>> {
        let mut store = self.store.write().await;
        if !store.tags.get(&id).is_some_and(|t| t.user_id == user_id) {
            return Ok(None);
        }
        if store.tag_name_taken(user_id, &name, Some(id)) {
            return Err(RepositoryError::Conflict);
        }
        let tag = store.tags.get_mut(&id).map(|tag| {
            tag.name = name;
            tag.updated_at = Utc::now();
            tag.clone()
        });
        Ok(tag)
    }

    async fn delete_tag(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        if !store.tags.get(&id).is_some_and(|t| t.user_id == user_id) {
            return Ok(false);
        }
        store.tags.remove(&id);
        for note in store.notes.values_mut() {
            note.tag_ids.retain(|tag_id| *tag_id != id);
        }
        Ok(true)
    }

    async fn list_notes(&self, user_id: Uuid, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        let store = self.store.read().await;
        let needle = query.search_term.as_ref().map(|term| term.to_lowercase());

        let mut notes: Vec<&StoredNote> = store
            .notes
            .values()
            .filter(|n| n.user_id == user_id)
            .filter(|n| Store::matches(n, query, needle.as_deref()))
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(notes.into_iter().map(|n| store.resolve(n)).collect())
    }

    async fn get_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<Option<Note>> {
        let store = self.store.read().await;
        Ok(store
            .notes
            .get(&id)
            .filter(|n| n.user_id == user_id)
            .map(|n| store.resolve(n)))
    }

    async fn create_note(&self, user_id: Uuid, note: NewNote) -> RepoResult<Note> {
        let mut store = self.store.write().await;
        if store.note_title_taken(user_id, &note.title, None) {
            return Err(RepositoryError::Conflict);
        }
        if let Some(reference) = store.missing_reference(note.folder_id, &note.tags) {
            return Err(RepositoryError::MissingReference(reference));
        }
        let now = Utc::now();
        let stored = StoredNote {
            id: Uuid::new_v4(),
            user_id,
            title: note.title,
            content: note.content,
            folder_id: note.folder_id,
            tag_ids: note.tags,
            created_at: now,
            updated_at: now,
        };
        let created = store.resolve(&stored);
        store.notes.insert(stored.id, stored);
        Ok(created)
    }

    async fn update_note(&self, id: Uuid, user_id: Uuid, patch: NotePatch) -> RepoResult<Option<Note>> {
        let mut store = self.store.write().await;
        if !store.notes.get(&id).is_some_and(|n| n.user_id == user_id) {
            return Ok(None);
        }
        if let Some(title) = &patch.title {
            if store.note_title_taken(user_id, title, Some(id)) {
                return Err(RepositoryError::Conflict);
            }
        }
        let tag_ids = patch.tags.as_deref().unwrap_or_default();
        if let Some(reference) = store.missing_reference(patch.folder.target(), tag_ids) {
            return Err(RepositoryError::MissingReference(reference));
        }

        let Some(note) = store.notes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(title) = patch.title {
            note.title = title;
        }
        if let Some(content) = patch.content {
            note.content = Some(content);
        }
        match patch.folder {
            FolderChange::Keep => {}
            FolderChange::Clear => note.folder_id = None,
            FolderChange::Set(folder_id) => note.folder_id = Some(folder_id),
        }
        if let Some(tags) = patch.tags {
            note.tag_ids = tags;
        }
        note.updated_at = Utc::now();

        let updated = note.clone();
        Ok(Some(store.resolve(&updated)))
    }

    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        if !store.notes.get(&id).is_some_and(|n| n.user_id == user_id) {
            return Ok(false);
        }
        store.notes.remove(&id);
        Ok(true)
    }
}
