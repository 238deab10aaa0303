use crate::{
    AppState,
    auth::{self, AuthUser},
    error::{ApiError, ErrorBody, Result, ValidationErrorBody},
    extract::JsonBody,
    models::{
        AuthTokenResponse, CreateNoteRequest, Folder, FolderRequest, LoginRequest, NewUser, Note,
        NoteFilter, RegisterUserRequest, Tag, TagRequest, UpdateNoteRequest, User,
    },
    notes::{NoteService, conflict_as},
    validation::{self, parse_path_id},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};

pub const DUPLICATE_USERNAME: &str = "The username already exists";
pub const DUPLICATE_FOLDER: &str = "Folder name already exists";
pub const DUPLICATE_TAG: &str = "Tag name already exists";

/// A 201 response carrying a `Location` header and the created body.
fn created<T: serde::Serialize>(location: String, body: T) -> impl IntoResponse {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(body))
}

// --- Notes ---

/// list_notes
///
/// [Authenticated Route] Lists the caller's notes, filtered by search term, folder
/// and tag. Tags are returned as full objects.
#[utoipa::path(
    get,
    path = "/api/notes",
    params(NoteFilter),
    responses(
        (status = 200, description = "Matching notes, newest update first", body = [Note]),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn list_notes(
    AuthUser { id, .. }: AuthUser,
    State(notes): State<NoteService>,
    Query(filter): Query<NoteFilter>,
) -> Result<Json<Vec<Note>>> {
    Ok(Json(notes.list(id, filter).await?))
}

/// get_note
///
/// [Authenticated Route] A single note. Someone else's note is a 404, same as a
/// missing one.
#[utoipa::path(
    get,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Note ID")),
    responses(
        (status = 200, description = "Found", body = Note),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_note(
    AuthUser { id: user_id, .. }: AuthUser,
    State(notes): State<NoteService>,
    Path(id): Path<String>,
) -> Result<Json<Note>> {
    Ok(Json(notes.get(user_id, &id).await?))
}

/// create_note
///
/// [Authenticated Route] Validates shape and ownership of the referenced folder and
/// tags, then stores the note.
#[utoipa::path(
    post,
    path = "/api/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Created", body = Note),
        (status = 400, description = "Validation failed", body = ErrorBody)
    )
)]
pub async fn create_note(
    AuthUser { id: user_id, .. }: AuthUser,
    State(notes): State<NoteService>,
    JsonBody(payload): JsonBody<CreateNoteRequest>,
) -> Result<impl IntoResponse> {
    let note = notes.create(user_id, payload).await?;
    Ok(created(format!("/api/notes/{}", note.id), note))
}

/// update_note
///
/// [Authenticated Route] Sparse update. `folderId: ""` removes the folder.
#[utoipa::path(
    put,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Note ID")),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Updated", body = Note),
        (status = 400, description = "Validation failed", body = ErrorBody),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_note(
    AuthUser { id: user_id, .. }: AuthUser,
    State(notes): State<NoteService>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<UpdateNoteRequest>,
) -> Result<Json<Note>> {
    Ok(Json(notes.update(user_id, &id, payload).await?))
}

/// delete_note
#[utoipa::path(
    delete,
    path = "/api/notes/{id}",
    params(("id" = String, Path, description = "Note ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_note(
    AuthUser { id: user_id, .. }: AuthUser,
    State(notes): State<NoteService>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    notes.delete(user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Folders ---

/// list_folders
#[utoipa::path(
    get,
    path = "/api/folders",
    responses((status = 200, description = "The caller's folders, by name", body = [Folder]))
)]
pub async fn list_folders(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Folder>>> {
    Ok(Json(state.repo.list_folders(id).await?))
}

/// get_folder
#[utoipa::path(
    get,
    path = "/api/folders/{id}",
    params(("id" = String, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Found", body = Folder),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_folder(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Folder>> {
    let id = parse_path_id(&id)?;
    state
        .repo
        .get_folder(id)
        .await?
        .filter(|folder| folder.user_id == user_id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_folder
#[utoipa::path(
    post,
    path = "/api/folders",
    request_body = FolderRequest,
    responses(
        (status = 201, description = "Created", body = Folder),
        (status = 400, description = "Missing name or duplicate", body = ErrorBody)
    )
)]
pub async fn create_folder(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<FolderRequest>,
) -> Result<impl IntoResponse> {
    let name = validation::validate_name(payload.name)?;
    let folder = state
        .repo
        .create_folder(user_id, name)
        .await
        .map_err(conflict_as(DUPLICATE_FOLDER))?;
    Ok(created(format!("/api/folders/{}", folder.id), folder))
}

/// update_folder
#[utoipa::path(
    put,
    path = "/api/folders/{id}",
    params(("id" = String, Path, description = "Folder ID")),
    request_body = FolderRequest,
    responses(
        (status = 200, description = "Renamed", body = Folder),
        (status = 400, description = "Missing name or duplicate", body = ErrorBody),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_folder(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<FolderRequest>,
) -> Result<Json<Folder>> {
    let id = parse_path_id(&id)?;
    let name = validation::validate_name(payload.name)?;
    state
        .repo
        .rename_folder(id, user_id, name)
        .await
        .map_err(conflict_as(DUPLICATE_FOLDER))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_folder
///
/// [Authenticated Route] Notes in the folder are kept and lose their folder reference.
#[utoipa::path(
    delete,
    path = "/api/folders/{id}",
    params(("id" = String, Path, description = "Folder ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_folder(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_path_id(&id)?;
    if state.repo.delete_folder(id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Tags ---

/// list_tags
#[utoipa::path(
    get,
    path = "/api/tags",
    responses((status = 200, description = "The caller's tags, by name", body = [Tag]))
)]
pub async fn list_tags(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>> {
    Ok(Json(state.repo.list_tags(id).await?))
}

/// get_tag
#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    params(("id" = String, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Found", body = Tag),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_tag(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Tag>> {
    let id = parse_path_id(&id)?;
    state
        .repo
        .get_tag(id)
        .await?
        .filter(|tag| tag.user_id == user_id)
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// create_tag
#[utoipa::path(
    post,
    path = "/api/tags",
    request_body = TagRequest,
    responses(
        (status = 201, description = "Created", body = Tag),
        (status = 400, description = "Missing name or duplicate", body = ErrorBody)
    )
)]
pub async fn create_tag(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TagRequest>,
) -> Result<impl IntoResponse> {
    let name = validation::validate_name(payload.name)?;
    let tag = state
        .repo
        .create_tag(user_id, name)
        .await
        .map_err(conflict_as(DUPLICATE_TAG))?;
    Ok(created(format!("/api/tags/{}", tag.id), tag))
}

/// update_tag
#[utoipa::path(
    put,
    path = "/api/tags/{id}",
    params(("id" = String, Path, description = "Tag ID")),
    request_body = TagRequest,
    responses(
        (status = 200, description = "Renamed", body = Tag),
        (status = 400, description = "Missing name or duplicate", body = ErrorBody),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_tag(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(payload): JsonBody<TagRequest>,
) -> Result<Json<Tag>> {
    let id = parse_path_id(&id)?;
    let name = validation::validate_name(payload.name)?;
    state
        .repo
        .rename_tag(id, user_id, name)
        .await
        .map_err(conflict_as(DUPLICATE_TAG))?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// delete_tag
///
/// [Authenticated Route] The tag is removed from every note that carried it.
#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    params(("id" = String, Path, description = "Tag ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_tag(
    AuthUser { id: user_id, .. }: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let id = parse_path_id(&id)?;
    if state.repo.delete_tag(id, user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

// --- Users & Auth ---

/// register_user
///
/// [Public Route] Creates an account. The password is hashed before it reaches
/// storage and the digest never appears in a response.
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Username taken or malformed body", body = ErrorBody),
        (status = 422, description = "Validation failed", body = ValidationErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterUserRequest>,
) -> Result<impl IntoResponse> {
    let registration = validation::validate_registration(payload)?;
    let password_digest = auth::hash_password(registration.password).await?;

    let record = state
        .repo
        .create_user(NewUser {
            username: registration.username,
            password_digest,
            fullname: registration.fullname,
        })
        .await
        .map_err(conflict_as(DUPLICATE_USERNAME))?;

    tracing::info!(user_id = %record.id, "user registered");
    let user = User::from(record);
    Ok(created(format!("/api/users/{}", user.id), user))
}

/// login
///
/// [Public Route] Exchanges username and password for a bearer token. Unknown users
/// and wrong passwords are indistinguishable.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = AuthTokenResponse),
        (status = 400, description = "Missing credentials", body = ErrorBody),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<AuthTokenResponse>> {
    let record = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::Unauthorized)?;

    if !auth::verify_password(payload.password, record.password_digest).await? {
        return Err(ApiError::Unauthorized);
    }

    let user = AuthUser {
        id: record.id,
        username: record.username,
    };
    let auth_token = auth::issue_token(&user, &state.config)?;
    Ok(Json(AuthTokenResponse { auth_token }))
}

/// refresh_token
///
/// [Authenticated Route] Issues a new token with a fresh expiry for the caller.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Token issued", body = AuthTokenResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn refresh_token(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AuthTokenResponse>> {
    let auth_token = auth::issue_token(&auth_user, &state.config)?;
    Ok(Json(AuthTokenResponse { auth_token }))
}
