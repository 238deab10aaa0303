use noteful_api::{
    ApiError,
    models::{
        CreateNoteRequest, FolderChange, Note, RegisterUserRequest, Tag, UpdateNoteRequest, User,
        UserRecord,
    },
    validation::{
        self, INVALID_FOLDER_ID, INVALID_ID, INVALID_TAG_ID, MISSING_NAME, MISSING_TITLE,
    },
};
use serde_json::{Value, json};
use uuid::Uuid;

// --- Test Utilities ---

fn validation_message(err: ApiError) -> String {
    match err {
        ApiError::Validation(message) => message,
        other => panic!("expected a validation error, got {:?}", other),
    }
}

/// (message, location) of a 422 registration failure.
fn unprocessable(err: ApiError) -> (String, String) {
    match err {
        ApiError::Unprocessable { message, location } => (message, location),
        other => panic!("expected an unprocessable error, got {:?}", other),
    }
}

fn registration(username: Value, password: Value) -> RegisterUserRequest {
    RegisterUserRequest {
        username: Some(username),
        password: Some(password),
        fullname: None,
    }
}

// --- Wire Format ---

#[test]
fn test_note_serializes_camel_case_with_full_tags() {
    let tag = Tag {
        id: Uuid::new_v4(),
        name: "urgent".to_string(),
        ..Tag::default()
    };
    let note = Note {
        id: Uuid::new_v4(),
        title: "Groceries".to_string(),
        folder_id: Some(Uuid::new_v4()),
        tags: vec![tag.clone()],
        ..Note::default()
    };

    let json = serde_json::to_value(&note).unwrap();

    assert!(json.get("folderId").is_some());
    assert!(json.get("userId").is_some());
    assert!(json.get("createdAt").is_some());
    assert!(json.get("folder_id").is_none());
    assert_eq!(json["tags"][0]["name"], "urgent");
    assert_eq!(json["tags"][0]["id"], tag.id.to_string());
}

#[test]
fn test_user_record_conversion_drops_digest() {
    let record = UserRecord {
        id: Uuid::new_v4(),
        username: "bobuser".to_string(),
        password_digest: "$2b$10$secret".to_string(),
        fullname: Some("Bob User".to_string()),
        created_at: chrono::Utc::now(),
    };

    let json = serde_json::to_value(User::from(record)).unwrap();

    assert_eq!(json["username"], "bobuser");
    assert!(json.get("password").is_none());
    assert!(json.get("passwordDigest").is_none());
}

#[test]
fn test_update_request_omits_absent_fields() {
    let req = UpdateNoteRequest {
        content: Some("new body".to_string()),
        ..UpdateNoteRequest::default()
    };

    let json = serde_json::to_value(&req).unwrap();

    assert_eq!(json, json!({ "content": "new body" }));
}

#[test]
fn test_create_request_reads_camel_case() {
    let req: CreateNoteRequest = serde_json::from_value(json!({
        "title": "t",
        "folderId": "",
        "tags": []
    }))
    .unwrap();

    assert_eq!(req.folder_id.as_deref(), Some(""));
    assert_eq!(req.tags, Some(vec![]));
}

#[test]
fn test_wrong_typed_ids_reach_validation() {
    let req: CreateNoteRequest = serde_json::from_value(json!({
        "title": "t",
        "folderId": 7,
        "tags": [1, null]
    }))
    .unwrap();
    assert_eq!(req.folder_id.as_deref(), Some("7"));
    assert_eq!(req.tags, Some(vec!["1".to_string(), "null".to_string()]));

    let err = validation::validate_new_note(req).unwrap_err();
    assert_eq!(validation_message(err), INVALID_FOLDER_ID);

    let req: CreateNoteRequest = serde_json::from_value(json!({ "title": "t", "tags": [1] })).unwrap();
    let err = validation::validate_new_note(req).unwrap_err();
    assert_eq!(validation_message(err), INVALID_TAG_ID);
}

#[test]
fn test_tags_that_are_not_an_array_are_invalid() {
    // A lone id string is still not a list of ids.
    let id = Uuid::new_v4().to_string();
    let req: UpdateNoteRequest = serde_json::from_value(json!({ "tags": id })).unwrap();

    let err = validation::validate_note_patch(req).unwrap_err();
    assert_eq!(validation_message(err), INVALID_TAG_ID);
}

#[test]
fn test_null_ids_count_as_absent() {
    let req: UpdateNoteRequest = serde_json::from_value(json!({ "folderId": null, "tags": null })).unwrap();

    assert_eq!(req.folder_id, None);
    assert_eq!(req.tags, None);
    let patch = validation::validate_note_patch(req).unwrap();
    assert_eq!(patch.folder, FolderChange::Keep);
}

// --- Identifiers ---

#[test]
fn test_parse_id_accepts_canonical_forms_only() {
    let id = Uuid::new_v4();

    assert_eq!(validation::parse_id(&id.to_string()), Some(id));
    assert_eq!(validation::parse_id(&id.simple().to_string()), Some(id));
    assert_eq!(validation::parse_id(&id.braced().to_string()), None);
    assert_eq!(validation::parse_id(&id.urn().to_string()), None);
    assert_eq!(validation::parse_id("1"), None);
    assert_eq!(validation::parse_id(""), None);
}

#[test]
fn test_parse_path_id_message() {
    let err = validation::parse_path_id("abc").unwrap_err();
    assert_eq!(validation_message(err), INVALID_ID);
}

// --- Note Shape Validation ---

#[test]
fn test_new_note_requires_title() {
    let missing = validation::validate_new_note(CreateNoteRequest::default()).unwrap_err();
    assert_eq!(validation_message(missing), MISSING_TITLE);

    let empty = validation::validate_new_note(CreateNoteRequest {
        title: Some(String::new()),
        ..CreateNoteRequest::default()
    })
    .unwrap_err();
    assert_eq!(validation_message(empty), MISSING_TITLE);
}

#[test]
fn test_new_note_empty_folder_means_none() {
    let note = validation::validate_new_note(CreateNoteRequest {
        title: Some("t".to_string()),
        folder_id: Some(String::new()),
        ..CreateNoteRequest::default()
    })
    .unwrap();

    assert_eq!(note.folder_id, None);
    assert!(note.tags.is_empty());
}

#[test]
fn test_new_note_rejects_bad_ids() {
    let bad_folder = validation::validate_new_note(CreateNoteRequest {
        title: Some("t".to_string()),
        folder_id: Some("folder-1".to_string()),
        ..CreateNoteRequest::default()
    })
    .unwrap_err();
    assert_eq!(validation_message(bad_folder), INVALID_FOLDER_ID);

    let bad_tag = validation::validate_new_note(CreateNoteRequest {
        title: Some("t".to_string()),
        tags: Some(vec![Uuid::new_v4().to_string(), "nope".to_string()]),
        ..CreateNoteRequest::default()
    })
    .unwrap_err();
    assert_eq!(validation_message(bad_tag), INVALID_TAG_ID);
}

#[test]
fn test_new_note_dedupes_tags_in_order() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let note = validation::validate_new_note(CreateNoteRequest {
        title: Some("t".to_string()),
        tags: Some(vec![b.to_string(), a.to_string(), b.to_string()]),
        ..CreateNoteRequest::default()
    })
    .unwrap();

    assert_eq!(note.tags, vec![b, a]);
}

#[test]
fn test_note_patch_folder_changes() {
    let keep = validation::validate_note_patch(UpdateNoteRequest::default()).unwrap();
    assert_eq!(keep.folder, FolderChange::Keep);
    assert_eq!(keep.tags, None);

    let clear = validation::validate_note_patch(UpdateNoteRequest {
        folder_id: Some(String::new()),
        ..UpdateNoteRequest::default()
    })
    .unwrap();
    assert_eq!(clear.folder, FolderChange::Clear);
    assert_eq!(clear.folder.target(), None);

    let id = Uuid::new_v4();
    let set = validation::validate_note_patch(UpdateNoteRequest {
        folder_id: Some(id.to_string()),
        tags: Some(vec![]),
        ..UpdateNoteRequest::default()
    })
    .unwrap();
    assert_eq!(set.folder.target(), Some(id));
    assert_eq!(set.tags, Some(vec![]));
}

#[test]
fn test_note_patch_rejects_empty_title() {
    let err = validation::validate_note_patch(UpdateNoteRequest {
        title: Some(String::new()),
        ..UpdateNoteRequest::default()
    })
    .unwrap_err();
    assert_eq!(validation_message(err), MISSING_TITLE);
}

#[test]
fn test_validate_name() {
    assert_eq!(validation::validate_name(Some(" Work ".to_string())).unwrap(), "Work");
    assert_eq!(validation_message(validation::validate_name(None).unwrap_err()), MISSING_NAME);
    assert_eq!(
        validation_message(validation::validate_name(Some("  ".to_string())).unwrap_err()),
        MISSING_NAME
    );
}

// --- Registration ---

#[test]
fn test_registration_missing_field() {
    let err = validation::validate_registration(RegisterUserRequest {
        username: Some(json!("bobuser")),
        ..RegisterUserRequest::default()
    })
    .unwrap_err();

    assert_eq!(unprocessable(err), ("Missing field".to_string(), "password".to_string()));
}

#[test]
fn test_registration_wrong_type() {
    let err = validation::validate_registration(registration(json!(42), json!("password123"))).unwrap_err();

    assert_eq!(
        unprocessable(err),
        ("Incorrect field type: expected string".to_string(), "username".to_string())
    );
}

#[test]
fn test_registration_surrounding_whitespace() {
    let err = validation::validate_registration(registration(json!(" bobuser"), json!("password123")))
        .unwrap_err();

    assert_eq!(
        unprocessable(err),
        ("Cannot start or end with whitespace".to_string(), "username".to_string())
    );
}

#[test]
fn test_registration_password_length_bounds() {
    let too_short = validation::validate_registration(registration(json!("bobuser"), json!("1234567")))
        .unwrap_err();
    assert_eq!(
        unprocessable(too_short),
        ("Must be at least 8 characters long".to_string(), "password".to_string())
    );

    let too_long = validation::validate_registration(registration(json!("bobuser"), json!("x".repeat(73))))
        .unwrap_err();
    assert_eq!(
        unprocessable(too_long),
        ("Must be at most 72 characters long".to_string(), "password".to_string())
    );

    let ok = validation::validate_registration(registration(json!("bobuser"), json!("12345678"))).unwrap();
    assert_eq!(ok.username, "bobuser");
    assert_eq!(ok.fullname, None);
}

#[test]
fn test_registration_password_byte_bound() {
    // 40 characters, 80 bytes: within the character bound, past bcrypt's input limit.
    let err = validation::validate_registration(registration(json!("bobuser"), json!("é".repeat(40))))
        .unwrap_err();
    assert_eq!(
        unprocessable(err),
        ("Must be at most 72 bytes long".to_string(), "password".to_string())
    );

    let ok = validation::validate_registration(registration(json!("bobuser"), json!("é".repeat(36))));
    assert!(ok.is_ok());
}

#[test]
fn test_registration_empty_username() {
    let err = validation::validate_registration(registration(json!(""), json!("password123"))).unwrap_err();

    assert_eq!(
        unprocessable(err),
        ("Must be at least 1 characters long".to_string(), "username".to_string())
    );
}
