use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Storage) ---

/// User
///
/// Public view of an account. The password digest lives only on `UserRecord` and is
/// never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub fullname: Option<String>,
}

/// UserRecord
///
/// The stored account row, including the bcrypt digest. Internal to the server.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    // bcrypt digest, column `password`.
    #[sqlx(rename = "password")]
    pub password_digest: String,
    pub fullname: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            fullname: record.fullname,
        }
    }
}

/// Folder
///
/// A named container of notes, owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Tag
///
/// A named label, owned by exactly one user and attachable to many notes.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Note
///
/// A user's text entry. `tags` is resolved to full `Tag` objects, in the order the
/// client supplied them.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<Tag>,
    pub user_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// CreateNoteRequest
///
/// Input payload for POST /api/notes. Identifiers arrive as raw text whatever their
/// JSON type, so a malformed one is reported as a field error rather than a body
/// rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "id_text")]
    pub folder_id: Option<String>,
    #[serde(default, deserialize_with = "id_list_text")]
    pub tags: Option<Vec<String>>,
}

/// UpdateNoteRequest
///
/// Sparse update payload for PUT /api/notes/{id}. Absent fields are left untouched;
/// `folderId: ""` removes the folder reference.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UpdateNoteRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(
        default,
        deserialize_with = "id_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub folder_id: Option<String>,

    #[serde(
        default,
        deserialize_with = "id_list_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub tags: Option<Vec<String>>,
}

/// Renders any non-string JSON value as its JSON text. The result never parses as an
/// identifier, so a wrong-typed id fails with its field's own message.
fn raw_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Reads an identifier field of any JSON type. `null` counts as absent.
fn id_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(raw_text))
}

/// Reads an identifier list of any JSON type. A value that is not an array is kept
/// as a single entry that cannot parse as an identifier.
fn id_list_text<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.map(|value| match value {
        Value::Array(entries) => entries.into_iter().map(raw_text).collect(),
        other => vec![other.to_string()],
    }))
}

/// FolderRequest
///
/// Input payload for creating or renaming a folder.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FolderRequest {
    pub name: Option<String>,
}

/// TagRequest
///
/// Input payload for creating or renaming a tag.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TagRequest {
    pub name: Option<String>,
}

/// RegisterUserRequest
///
/// Input payload for POST /api/users. Fields are loosely typed: a number
/// where a string is expected is a 422 naming the field, not a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct RegisterUserRequest {
    #[schema(value_type = Option<String>)]
    pub username: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub password: Option<serde_json::Value>,
    #[schema(value_type = Option<String>)]
    pub fullname: Option<serde_json::Value>,
}

/// LoginRequest
///
/// Credentials exchanged for a bearer token at POST /api/auth/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// AuthTokenResponse
///
/// A freshly signed bearer token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AuthTokenResponse {
    pub auth_token: String,
}

/// NoteFilter
///
/// Query parameters accepted by GET /api/notes. Every supplied filter must match.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NoteFilter {
    /// Case-insensitive substring matched against title or content.
    pub search_term: Option<String>,
    /// Only notes in this folder.
    pub folder_id: Option<String>,
    /// Only notes carrying this tag.
    pub tag_id: Option<String>,
}

// --- Validated Inputs (Repository Contracts) ---

/// NewUser
///
/// A registration that passed validation, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_digest: String,
    pub fullname: Option<String>,
}

/// NewNote
///
/// A create request after shape validation: typed identifiers, no empty folder.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNote {
    pub title: String,
    pub content: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tags: Vec<Uuid>,
}

/// FolderChange
///
/// What an update does to a note's folder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderChange {
    /// `folderId` absent: leave the reference as it is.
    #[default]
    Keep,
    /// `folderId: ""`: remove the reference.
    Clear,
    Set(Uuid),
}

impl FolderChange {
    /// The folder this change points at, if any.
    pub fn target(&self) -> Option<Uuid> {
        match self {
            FolderChange::Set(id) => Some(*id),
            _ => None,
        }
    }
}

/// NotePatch
///
/// A sparse update after shape validation. `None` means "leave unchanged".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub folder: FolderChange,
    pub tags: Option<Vec<Uuid>>,
}

/// NoteQuery
///
/// Typed list filters handed to the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteQuery {
    pub search_term: Option<String>,
    pub folder_id: Option<Uuid>,
    pub tag_id: Option<Uuid>,
}
