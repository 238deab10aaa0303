//! Input shape validation.
//!
//! Pure checks that run before any storage access: required fields, identifier
//! syntax, registration field rules. Every function either returns the typed,
//! validated payload or an `ApiError` naming the offending field.

use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::{ApiError, Result},
    models::{CreateNoteRequest, FolderChange, NewNote, NotePatch, RegisterUserRequest, UpdateNoteRequest},
};

pub const MISSING_TITLE: &str = "Missing `title` in request body";
pub const MISSING_NAME: &str = "Missing `name` in request body";
pub const INVALID_ID: &str = "The `id` is not valid";
pub const INVALID_FOLDER_ID: &str = "The `folderId` is not valid";
pub const INVALID_TAG_ID: &str = "The `tags` array contains an invalid `id`";

pub const USERNAME_MIN_LEN: usize = 1;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 72;
// bcrypt silently drops everything past 72 bytes of input.
pub const PASSWORD_MAX_BYTES: usize = 72;

/// A validated registration, password still in clear text.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub fullname: Option<String>,
}

/// Parses an opaque identifier: a UUID in its 32-digit simple or 36-char hyphenated
/// form. Braced and URN forms are rejected.
pub fn parse_id(raw: &str) -> Option<Uuid> {
    match raw.len() {
        32 | 36 => Uuid::try_parse(raw).ok(),
        _ => None,
    }
}

/// Parses a path parameter, failing with the generic `id` message.
pub fn parse_path_id(raw: &str) -> Result<Uuid> {
    parse_id(raw).ok_or_else(|| ApiError::validation(INVALID_ID))
}

fn parse_folder(raw: &str) -> Result<Uuid> {
    parse_id(raw).ok_or_else(|| ApiError::validation(INVALID_FOLDER_ID))
}

/// Parses every tag id and drops repeats, keeping the first occurrence.
fn parse_tags(raw: &[String]) -> Result<Vec<Uuid>> {
    let mut tags = Vec::with_capacity(raw.len());
    for entry in raw {
        let id = parse_id(entry).ok_or_else(|| ApiError::validation(INVALID_TAG_ID))?;
        if !tags.contains(&id) {
            tags.push(id);
        }
    }
    Ok(tags)
}

/// validate_new_note
///
/// `title` is required and non-empty. An empty `folderId` means "no folder".
pub fn validate_new_note(req: CreateNoteRequest) -> Result<NewNote> {
    let title = match req.title {
        Some(title) if !title.is_empty() => title,
        _ => return Err(ApiError::validation(MISSING_TITLE)),
    };

    let folder_id = match req.folder_id.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(parse_folder(raw)?),
    };

    let tags = match &req.tags {
        Some(raw) => parse_tags(raw)?,
        None => vec![],
    };

    Ok(NewNote {
        title,
        content: req.content,
        folder_id,
        tags,
    })
}

/// validate_note_patch
///
/// Only supplied fields are checked. A supplied `title` must be non-empty; an empty
/// `folderId` is a removal, not an error.
pub fn validate_note_patch(req: UpdateNoteRequest) -> Result<NotePatch> {
    if req.title.as_deref() == Some("") {
        return Err(ApiError::validation(MISSING_TITLE));
    }

    let folder = match req.folder_id.as_deref() {
        None => FolderChange::Keep,
        Some("") => FolderChange::Clear,
        Some(raw) => FolderChange::Set(parse_folder(raw)?),
    };

    let tags = match &req.tags {
        Some(raw) => Some(parse_tags(raw)?),
        None => None,
    };

    Ok(NotePatch {
        title: req.title,
        content: req.content,
        folder,
        tags,
    })
}

/// Folder and tag names: required, surrounding whitespace trimmed, non-empty.
pub fn validate_name(name: Option<String>) -> Result<String> {
    match name.as_deref().map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ApiError::validation(MISSING_NAME)),
    }
}

/// validate_registration
///
/// Checks run in a fixed order and the first failure wins: presence, string type,
/// surrounding whitespace, then length bounds. `fullname` is optional and trimmed.
pub fn validate_registration(req: RegisterUserRequest) -> Result<Registration> {
    let RegisterUserRequest {
        username,
        password,
        fullname,
    } = req;

    let username = required("username", username)?;
    let password = required("password", password)?;

    let username = string_field("username", username)?;
    let password = string_field("password", password)?;
    let fullname = match fullname {
        None | Some(Value::Null) => None,
        Some(value) => Some(string_field("fullname", value)?),
    };

    for (field, value) in [("username", &username), ("password", &password)] {
        if value.trim() != value {
            return Err(ApiError::unprocessable(
                "Cannot start or end with whitespace",
                field,
            ));
        }
    }

    check_length("username", &username, USERNAME_MIN_LEN, None)?;
    check_length("password", &password, PASSWORD_MIN_LEN, Some(PASSWORD_MAX_LEN))?;
    if password.len() > PASSWORD_MAX_BYTES {
        return Err(ApiError::unprocessable(
            format!("Must be at most {PASSWORD_MAX_BYTES} bytes long"),
            "password",
        ));
    }

    let fullname = fullname
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());

    Ok(Registration {
        username,
        password,
        fullname,
    })
}

fn required(field: &str, value: Option<Value>) -> Result<Value> {
    match value {
        None | Some(Value::Null) => Err(ApiError::unprocessable("Missing field", field)),
        Some(value) => Ok(value),
    }
}

fn string_field(field: &str, value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(ApiError::unprocessable(
            "Incorrect field type: expected string",
            field,
        )),
    }
}

fn check_length(field: &str, value: &str, min: usize, max: Option<usize>) -> Result<()> {
    let len = value.chars().count();
    if len < min {
        return Err(ApiError::unprocessable(
            format!("Must be at least {min} characters long"),
            field,
        ));
    }
    if let Some(max) = max {
        if len > max {
            return Err(ApiError::unprocessable(
                format!("Must be at most {max} characters long"),
                field,
            ));
        }
    }
    Ok(())
}
