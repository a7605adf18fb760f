use axum::extract::State;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::Deserialize;

use super::extract::{Json, Path};
use crate::{
    auth::{
        role::{Capability, require},
        user::AuthSession,
    },
    entities::sea_orm_active_enums::PersonType,
    error::{ActionError, ActionResult, ok},
    router::AppState,
    services::{
        extraction::Extraction,
        storage::{ALLOWED_TYPES, FOLDERS, MAX_UPLOAD_BYTES, StoredObject},
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequest {
    pub image_base64: String,
    pub mime_type: String,
    pub person_type: PersonType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    pub file_name: String,
    pub mime_type: String,
    /// Raw base64 or a `data:` URL.
    pub data: String,
}

/// Reads attendees off a photographed form. Always answers; a `fallback`
/// result means the president types the names in by hand.
pub async fn extract(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Json(request): Json<ExtractRequest>,
) -> ActionResult<Extraction> {
    let actor = require(&auth_session, Capability::UseExtraction)?;
    if !request.mime_type.starts_with("image/") {
        return Err(ActionError::field("mimeType", "Only images can be scanned"));
    }
    let image = decode_file(&request.image_base64, "imageBase64")?;
    state
        .limiter
        .check("extract", actor.user_id, unix_now())
        .await?;

    let extraction = state
        .vision
        .extract(&STANDARD.encode(image), &request.mime_type, request.person_type)
        .await;
    Ok(ok(extraction))
}

/// Stores a receipt (presidents) or an event banner (admins).
pub async fn upload(
    State(state): State<AppState>,
    auth_session: AuthSession,
    Path(folder): Path<String>,
    Json(request): Json<UploadRequest>,
) -> ActionResult<StoredObject> {
    let capability = match folder.as_str() {
        "banners" => Capability::ManageDirectory,
        _ => Capability::UploadFiles,
    };
    let actor = require(&auth_session, capability)?;
    if !FOLDERS.contains(&folder.as_str()) {
        return Err(ActionError::NotFound("Upload folder"));
    }
    if !ALLOWED_TYPES.contains(&request.mime_type.as_str()) {
        return Err(ActionError::field(
            "mimeType",
            "Upload a JPEG, PNG, WebP image or a PDF",
        ));
    }
    let bytes = decode_file(&request.data, "data")?;
    state
        .limiter
        .check("upload", actor.user_id, unix_now())
        .await?;

    let stored = state
        .storage
        .upload(bytes, &folder, &request.file_name, &request.mime_type)
        .await?;
    Ok(ok(stored))
}

/// Decodes base64 (optionally inside a `data:` URL) and enforces the size limit.
fn decode_file(data: &str, field: &str) -> Result<Vec<u8>, ActionError> {
    let encoded = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|_| ActionError::field(field, "File is not valid base64"))?;
    if bytes.is_empty() {
        return Err(ActionError::field(field, "File is empty"));
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ActionError::field(field, "File is larger than 5 MB"));
    }
    Ok(bytes)
}

fn unix_now() -> u64 {
    chrono::Utc::now().timestamp().max(0) as u64
}
