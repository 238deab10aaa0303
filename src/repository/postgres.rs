use super::{RepoResult, Repository};
use crate::models::{Folder, FolderChange, NewNote, NewUser, Note, NotePatch, NoteQuery, Tag, UserRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction, query_builder::QueryBuilder};
use std::collections::HashMap;
use uuid::Uuid;

const NOTE_COLUMNS: &str = "n.id, n.user_id, n.title, n.content, n.folder_id, n.created_at, n.updated_at";

/// A `notes` row before its tags are resolved.
#[derive(Debug, FromRow)]
struct NoteRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    content: Option<String>,
    folder_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl NoteRow {
    fn into_note(self, tags: Vec<Tag>) -> Note {
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
            folder_id: self.folder_id,
            tags,
            user_id: self.user_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// A tag joined through `note_tags`, remembering which note it belongs to.
#[derive(Debug, FromRow)]
struct NoteTagRow {
    note_id: Uuid,
    #[sqlx(flatten)]
    tag: Tag,
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Tag order on a note is kept
/// in `note_tags.position`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolves the tags of every row in one query and assembles the notes,
    /// preserving the row order.
    async fn attach_tags(&self, rows: Vec<NoteRow>) -> RepoResult<Vec<Note>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let tag_rows = sqlx::query_as::<_, NoteTagRow>(
            r#"
            SELECT nt.note_id, t.id, t.name, t.user_id, t.created_at, t.updated_at
            FROM note_tags nt
            JOIN tags t ON t.id = nt.tag_id
            WHERE nt.note_id = ANY($1)
            ORDER BY nt.note_id, nt.position
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut by_note: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            by_note.entry(row.note_id).or_default().push(row.tag);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let tags = by_note.remove(&row.id).unwrap_or_default();
                row.into_note(tags)
            })
            .collect())
    }

    async fn fetch_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes n WHERE n.id = $1 AND n.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.attach_tags(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Replaces the tag list of a note inside an open transaction.
async fn write_note_tags(
    tx: &mut Transaction<'_, Postgres>,
    note_id: Uuid,
    tags: &[Uuid],
) -> RepoResult<()> {
    sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await?;

    for (position, tag_id) in tags.iter().enumerate() {
        sqlx::query("INSERT INTO note_tags (note_id, tag_id, position) VALUES ($1, $2, $3)")
            .bind(note_id)
            .bind(tag_id)
            .bind(position as i32)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Escapes `%`, `_` and `\` so a search term matches literally under ILIKE.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- USERS ---

    async fn create_user(&self, user: NewUser) -> RepoResult<UserRecord> {
        let record = sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, username, password, fullname)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, password, fullname, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user.username)
        .bind(user.password_digest)
        .bind(user.fullname)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    async fn get_user(&self, id: Uuid) -> RepoResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password, fullname, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT id, username, password, fullname, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    // --- FOLDERS ---

    async fn list_folders(&self, user_id: Uuid) -> RepoResult<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT id, name, user_id, created_at, updated_at FROM folders WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(folders)
    }

    async fn get_folder(&self, id: Uuid) -> RepoResult<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            "SELECT id, name, user_id, created_at, updated_at FROM folders WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(folder)
    }

    async fn create_folder(&self, user_id: Uuid, name: String) -> RepoResult<Folder> {
        let folder = sqlx::query_as::<_, Folder>(
            r#"
            INSERT INTO folders (id, user_id, name) VALUES ($1, $2, $3)
            RETURNING id, name, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(folder)
    }

    async fn rename_folder(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(
            r#"
            UPDATE folders SET name = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, name, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(folder)
    }

    /// `notes.folder_id` is `ON DELETE SET NULL`, so referencing notes are detached.
    async fn delete_folder(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- TAGS ---

    async fn list_tags(&self, user_id: Uuid) -> RepoResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            "SELECT id, name, user_id, created_at, updated_at FROM tags WHERE user_id = $1 ORDER BY name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn get_tag(&self, id: Uuid) -> RepoResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            "SELECT id, name, user_id, created_at, updated_at FROM tags WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn create_tag(&self, user_id: Uuid, name: String) -> RepoResult<Tag> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (id, user_id, name) VALUES ($1, $2, $3)
            RETURNING id, name, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(tag)
    }

    async fn rename_tag(&self, id: Uuid, user_id: Uuid, name: String) -> RepoResult<Option<Tag>> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags SET name = $3, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, name, user_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(tag)
    }

    /// `note_tags.tag_id` is `ON DELETE CASCADE`, so the tag disappears from every note.
    async fn delete_tag(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // --- NOTES ---

    /// list_notes
    ///
    /// Builds the filter with `QueryBuilder` so every user-supplied value is bound,
    /// never interpolated.
    async fn list_notes(&self, user_id: Uuid, query: &NoteQuery) -> RepoResult<Vec<Note>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {NOTE_COLUMNS} FROM notes n WHERE n.user_id = "));
        builder.push_bind(user_id);

        if let Some(term) = &query.search_term {
            let pattern = like_pattern(term);
            builder.push(" AND (n.title ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR COALESCE(n.content, '') ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }

        if let Some(folder_id) = query.folder_id {
            builder.push(" AND n.folder_id = ");
            builder.push_bind(folder_id);
        }

        if let Some(tag_id) = query.tag_id {
            builder.push(" AND EXISTS (SELECT 1 FROM note_tags nt WHERE nt.note_id = n.id AND nt.tag_id = ");
            builder.push_bind(tag_id);
            builder.push(")");
        }

        builder.push(" ORDER BY n.updated_at DESC");

        let rows = builder
            .build_query_as::<NoteRow>()
            .fetch_all(&self.pool)
            .await?;
        self.attach_tags(rows).await
    }

    async fn get_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<Option<Note>> {
        self.fetch_note(id, user_id).await
    }

    /// create_note
    ///
    /// Inserts the note and its ordered tag references in one transaction.
    async fn create_note(&self, user_id: Uuid, note: NewNote) -> RepoResult<Note> {
        let id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, NoteRow>(
            r#"
            INSERT INTO notes (id, user_id, title, content, folder_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, title, content, folder_id, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(note.title)
        .bind(note.content)
        .bind(note.folder_id)
        .fetch_one(&mut *tx)
        .await?;

        write_note_tags(&mut tx, id, &note.tags).await?;
        tx.commit().await?;

        Ok(self.attach_tags(vec![row]).await?.pop().unwrap_or_default())
    }

    /// update_note
    ///
    /// `COALESCE` keeps columns whose field was not supplied. The folder column is
    /// driven by an explicit flag because `NULL` is a legitimate new value there.
    async fn update_note(&self, id: Uuid, user_id: Uuid, patch: NotePatch) -> RepoResult<Option<Note>> {
        let (change_folder, folder_id) = match patch.folder {
            FolderChange::Keep => (false, None),
            FolderChange::Clear => (true, None),
            FolderChange::Set(folder_id) => (true, Some(folder_id)),
        };

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE notes
            SET title = COALESCE($3, title),
                content = COALESCE($4, content),
                folder_id = CASE WHEN $5 THEN $6 ELSE folder_id END,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.title)
        .bind(patch.content)
        .bind(change_folder)
        .bind(folder_id)
        .fetch_optional(&mut *tx)
        .await?;

        if updated.is_none() {
            tx.rollback().await?;
            return Ok(None);
        }

        if let Some(tags) = &patch.tags {
            write_note_tags(&mut tx, id, tags).await?;
        }
        tx.commit().await?;

        self.fetch_note(id, user_id).await
    }

    async fn delete_note(&self, id: Uuid, user_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
        assert_eq!(like_pattern("plain"), "%plain%");
    }
}
