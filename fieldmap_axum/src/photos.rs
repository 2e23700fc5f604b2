use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use fieldmap::{
    AnnotationOutcome, AppContext, CoordinationError, ExportRow, Photo, StorageError, decode_image,
    encode_png,
};

use super::error::IntoResponseError;
use super::state::{AppState, ensure_storage};

pub(super) fn router() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{session}/select", post(select_session))
        .route(
            "/sessions/{session}/photos",
            get(list_photos).post(upload_photo),
        )
        .route(
            "/sessions/{session}/photos/{id}",
            get(get_photo).patch(update_comment).delete(delete_photo),
        )
        .route("/sessions/{session}/photos/{id}/image", get(photo_image))
        .route("/sessions/{session}/photos/{id}/move", post(move_photo))
        .route(
            "/sessions/{session}/photos/{id}/annotations",
            post(save_annotation),
        )
        .route("/sessions/{session}/photos/{id}/reset", post(reset_annotations))
        .route("/export", get(export))
}

#[derive(Debug, Serialize)]
struct SessionSummary {
    name: String,
    photo_count: usize,
}

#[derive(Debug, Serialize)]
struct SessionList {
    current_session: String,
    sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize)]
struct PhotoSummary {
    id: u64,
    session: String,
    comment: String,
    timestamp: String,
    has_annotations: bool,
    variant: &'static str,
    source_photo_id: Option<u64>,
    storage_uri: Option<String>,
    thumb_data_url: Option<String>,
    hydrated: bool,
}

impl PhotoSummary {
    fn new(photo: &Photo, session: &str) -> Self {
        Self {
            id: photo.id(),
            session: session.to_string(),
            comment: photo.comment().to_string(),
            timestamp: photo.timestamp_string(),
            has_annotations: photo.has_annotations(),
            variant: photo.variant().as_str(),
            source_photo_id: photo.source_photo_id(),
            storage_uri: photo.storage_uri().map(str::to_string),
            thumb_data_url: photo.thumb_data_url().map(str::to_string),
            hydrated: photo.is_hydrated(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateSession {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct CommentParams {
    comment: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateComment {
    comment: String,
}

#[derive(Debug, Deserialize)]
struct MoveRequest {
    to: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ImageKind {
    #[default]
    Current,
    Original,
    Thumbnail,
}

#[derive(Debug, Default, Deserialize)]
struct ImageParams {
    #[serde(default)]
    kind: ImageKind,
}

fn summary_of(
    context: &AppContext,
    photo_id: u64,
    session: &str,
) -> Result<PhotoSummary, CoordinationError> {
    context
        .photos()
        .find_photo(photo_id, session)
        .map(|photo| PhotoSummary::new(photo, session))
        .ok_or_else(|| CoordinationError::photo_not_found(photo_id))
}

fn decode_body(body: &Bytes) -> Result<image::DynamicImage, CoordinationError> {
    decode_image(body).map_err(|e| CoordinationError::BadRequest(format!("Invalid image: {e}")))
}

async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<SessionList>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let photos = context.photos();
    let sessions = photos
        .session_names()
        .into_iter()
        .map(|name| SessionSummary {
            name: name.to_string(),
            photo_count: photos.photos(name).map_or(0, <[Photo]>::len),
        })
        .collect();

    Ok(Json(SessionList {
        current_session: photos.current_session().to_string(),
        sessions,
    }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSession>,
) -> Result<(StatusCode, Json<SessionSummary>), (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(CoordinationError::BadRequest("Session name is empty".to_string()).log())
            .into_response_error();
    }
    if !context.photos_mut().create_session(&name).await {
        return Err(CoordinationError::Conflict(format!("Session {name:?} already exists")).log())
            .into_response_error();
    }

    Ok((
        StatusCode::CREATED,
        Json(SessionSummary {
            name,
            photo_count: 0,
        }),
    ))
}

async fn select_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut context = state.lock().await;
    if !context.photos_mut().select_session(&session) {
        return Err(CoordinationError::session_not_found(&session)).into_response_error();
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_photos(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<Vec<PhotoSummary>>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let photos = context
        .photos()
        .photos(&session)
        .ok_or_else(|| CoordinationError::session_not_found(&session))
        .into_response_error()?;

    Ok(Json(
        photos
            .iter()
            .map(|photo| PhotoSummary::new(photo, &session))
            .collect(),
    ))
}

async fn upload_photo(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Query(params): Query<CommentParams>,
    body: Bytes,
) -> Result<(StatusCode, Json<PhotoSummary>), (StatusCode, String)> {
    let image = decode_body(&body).into_response_error()?;

    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let comment = params.comment.unwrap_or_default();
    let photo_id = context
        .photos_mut()
        .add_photo(image, &session, &comment)
        .await
        .map_err(CoordinationError::from)
        .into_response_error()?;

    let summary = summary_of(&context, photo_id, &session).into_response_error()?;
    Ok((StatusCode::CREATED, Json(summary)))
}

async fn get_photo(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
) -> Result<Json<PhotoSummary>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;
    Ok(Json(
        summary_of(&context, photo_id, &session).into_response_error()?,
    ))
}

async fn update_comment(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
    Json(request): Json<UpdateComment>,
) -> Result<Json<PhotoSummary>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    if !context
        .photos_mut()
        .update_photo_comment(photo_id, &session, &request.comment)
        .await
    {
        return Err(CoordinationError::photo_not_found(photo_id)).into_response_error();
    }
    Ok(Json(
        summary_of(&context, photo_id, &session).into_response_error()?,
    ))
}

async fn delete_photo(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
) -> Result<StatusCode, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    if !context.photos_mut().delete_photo(photo_id, &session).await {
        return Err(CoordinationError::photo_not_found(photo_id)).into_response_error();
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn photo_image(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
    Query(params): Query<ImageParams>,
) -> Result<Response, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let photo = context
        .photos_mut()
        .get_photo(photo_id, &session)
        .await
        .ok_or_else(|| CoordinationError::photo_not_found(photo_id))
        .into_response_error()?;

    let image = match params.kind {
        ImageKind::Current => photo.current_image(),
        ImageKind::Original => photo.original_image(),
        ImageKind::Thumbnail => photo.thumbnail(),
    }
    .ok_or_else(|| CoordinationError::ResourceNotFound {
        resource_type: "image".to_string(),
        resource_id: photo_id.to_string(),
    })
    .into_response_error()?;

    let png = encode_png(image)
        .map_err(CoordinationError::from)
        .into_response_error()?;

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "image/png")
        .body(png.into())
        .into_response_error()
}

async fn move_photo(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<PhotoSummary>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    if !context.photos().has_session(&request.to) {
        return Err(CoordinationError::session_not_found(&request.to)).into_response_error();
    }
    if !context
        .photos_mut()
        .move_photo(photo_id, &session, &request.to)
        .await
    {
        return Err(CoordinationError::photo_not_found(photo_id)).into_response_error();
    }
    Ok(Json(
        summary_of(&context, photo_id, &request.to).into_response_error()?,
    ))
}

/// An empty body is a cancelled edit and adds nothing.
async fn save_annotation(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
    Query(params): Query<CommentParams>,
    body: Bytes,
) -> Result<Response, (StatusCode, String)> {
    let outcome = if body.is_empty() {
        AnnotationOutcome::Cancelled
    } else {
        AnnotationOutcome::Saved(decode_body(&body).into_response_error()?)
    };

    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    let derived = context
        .photos_mut()
        .save_annotation(photo_id, &session, outcome, params.comment.as_deref())
        .await
        .map_err(CoordinationError::from)
        .into_response_error()?;

    match derived {
        Some(derived_id) => {
            let summary = summary_of(&context, derived_id, &session).into_response_error()?;
            Ok((StatusCode::CREATED, Json(summary)).into_response())
        }
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

async fn reset_annotations(
    State(state): State<AppState>,
    Path((session, photo_id)): Path<(String, u64)>,
) -> Result<Json<PhotoSummary>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;

    // Images must be loaded for the reset to restore anything
    let photo = context
        .photos_mut()
        .get_photo(photo_id, &session)
        .await
        .ok_or_else(|| CoordinationError::photo_not_found(photo_id))
        .into_response_error()?;
    if !photo.is_hydrated() {
        let uri = photo.storage_uri().unwrap_or_default().to_string();
        return Err(CoordinationError::from(StorageError::NotFound(uri))).into_response_error();
    }

    if !context
        .photos_mut()
        .reset_photo_annotations(photo_id, &session)
        .await
    {
        return Err(CoordinationError::Conflict(format!(
            "Photo {photo_id} is an annotated copy and cannot be reset"
        ))
        .log())
        .into_response_error();
    }
    Ok(Json(
        summary_of(&context, photo_id, &session).into_response_error()?,
    ))
}

async fn export(
    State(state): State<AppState>,
) -> Result<Json<Vec<ExportRow>>, (StatusCode, String)> {
    let mut context = state.lock().await;
    ensure_storage(&mut context).await.into_response_error()?;
    Ok(Json(context.photos().export_rows()))
}
