use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Every route here sits behind the auth middleware, so handlers always receive a
/// resolved `AuthUser`. All data access is scoped to that user: another user's note,
/// folder or tag behaves exactly like a missing one. Mounted under `/api`.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- Notes ---
        // GET /api/notes?searchTerm=&folderId=&tagId=
        // POST /api/notes
        // Mutations pass shape validation, then ownership validation, then the write.
        .route(
            "/notes",
            get(handlers::list_notes).post(handlers::create_note),
        )
        .route(
            "/notes/{id}",
            get(handlers::get_note)
                .put(handlers::update_note)
                .delete(handlers::delete_note),
        )
        // --- Folders ---
        .route(
            "/folders",
            get(handlers::list_folders).post(handlers::create_folder),
        )
        .route(
            "/folders/{id}",
            get(handlers::get_folder)
                .put(handlers::update_folder)
                .delete(handlers::delete_folder),
        )
        // --- Tags ---
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route(
            "/tags/{id}",
            get(handlers::get_tag)
                .put(handlers::update_tag)
                .delete(handlers::delete_tag),
        )
        // POST /api/auth/refresh
        // Re-issues the caller's token with a fresh expiry.
        .route("/auth/refresh", post(handlers::refresh_token))
}
