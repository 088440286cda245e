//! API handlers for the appraisal server

use appraisal_core::{
    AppraisalForm, AppraisalRecord, AppraisalSession, FormUploads, RawUpload, UserProfile,
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Handler: GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "appraisal-server",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    pub login: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AnalogView {
    pub slot_id: u32,
    pub index: usize,
    pub title: String,
    pub source: String,
    pub photos: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub id: String,
    pub profile: Option<UserProfile>,
    pub analogs: Vec<AnalogView>,
}

fn analog_view(session: &AppraisalSession, slot_id: u32) -> Option<AnalogView> {
    let analogs = &session.analogs;
    Some(AnalogView {
        slot_id,
        index: analogs.display_index(slot_id)?,
        title: analogs.title(slot_id).unwrap_or_default().to_string(),
        source: analogs.source(slot_id).unwrap_or_default().to_string(),
        photos: analogs
            .uploads(slot_id)
            .iter()
            .map(|u| u.name.clone().unwrap_or_default())
            .collect(),
    })
}

fn session_response(id: &str, session: &AppraisalSession) -> SessionResponse {
    SessionResponse {
        id: id.to_string(),
        profile: session.profile.clone(),
        analogs: session
            .analogs
            .slot_ids()
            .iter()
            .filter_map(|&slot_id| analog_view(session, slot_id))
            .collect(),
    }
}

/// Handler: POST /api/session
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let mut session = AppraisalSession::new();
    session.sign_in(&req.name, &req.login)?;

    let id = Uuid::new_v4().to_string();
    let response = session_response(&id, &session);
    state.sessions.lock().await.insert(id.clone(), session);
    info!("Created session {}", id);

    Ok((StatusCode::CREATED, Json(response)))
}

/// Handler: GET /api/session/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    state
        .with_session(&id, |session| Ok(Json(session_response(&id, session))))
        .await
}

/// Handler: DELETE /api/session/:id (sign out)
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    match state.sessions.lock().await.remove(&id) {
        Some(mut session) => {
            session.sign_out();
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(ApiError::SessionNotFound(id)),
    }
}

/// Handler: POST /api/session/:id/analogs
pub async fn add_analog(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AnalogView>), ApiError> {
    state
        .with_session(&id, |session| {
            let slot_id = session.analogs.add().ok_or(ApiError::AnalogLimit)?;
            let view = analog_view(session, slot_id).ok_or(ApiError::SlotNotFound(slot_id))?;
            Ok((StatusCode::CREATED, Json(view)))
        })
        .await
}

#[derive(Deserialize)]
pub struct UpdateAnalogRequest {
    pub title: Option<String>,
    pub source: Option<String>,
}

/// Handler: PUT /api/session/:id/analogs/:slot_id
pub async fn update_analog(
    State(state): State<AppState>,
    Path((id, slot_id)): Path<(String, u32)>,
    Json(req): Json<UpdateAnalogRequest>,
) -> Result<Json<AnalogView>, ApiError> {
    state
        .with_session(&id, |session| {
            if session.analogs.display_index(slot_id).is_none() {
                return Err(ApiError::SlotNotFound(slot_id));
            }
            if let Some(title) = req.title {
                session.analogs.set_title(slot_id, title);
            }
            if let Some(source) = req.source {
                session.analogs.set_source(slot_id, source);
            }
            analog_view(session, slot_id)
                .map(Json)
                .ok_or(ApiError::SlotNotFound(slot_id))
        })
        .await
}

/// Handler: DELETE /api/session/:id/analogs/:slot_id
pub async fn remove_analog(
    State(state): State<AppState>,
    Path((id, slot_id)): Path<(String, u32)>,
) -> Result<StatusCode, ApiError> {
    state
        .with_session(&id, |session| {
            if session.analogs.remove(slot_id) {
                Ok(StatusCode::NO_CONTENT)
            } else {
                Err(ApiError::SlotNotFound(slot_id))
            }
        })
        .await
}

/// A file field whose payload failed to arrive becomes an unreadable
/// upload, so it shows up as a warning rather than failing the request.
async fn read_upload(field: axum::extract::multipart::Field<'_>) -> RawUpload {
    let name = field.file_name().map(str::to_string);
    match field.bytes().await {
        Ok(bytes) => RawUpload {
            name,
            content: appraisal_core::UploadContent::Bytes(bytes.to_vec()),
        },
        Err(e) => {
            warn!("Upload {:?} could not be read: {}", name, e);
            RawUpload::unreadable(name, e.to_string())
        }
    }
}

/// Handler: POST /api/session/:id/analogs/:slot_id/photos
///
/// Replaces the slot's photos with every file field of the request.
pub async fn upload_analog_photos(
    State(state): State<AppState>,
    Path((id, slot_id)): Path<(String, u32)>,
    mut multipart: Multipart,
) -> Result<Json<AnalogView>, ApiError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        uploads.push(read_upload(field).await);
    }

    state
        .with_session(&id, |session| {
            if !session.analogs.set_uploads(slot_id, uploads) {
                return Err(ApiError::SlotNotFound(slot_id));
            }
            analog_view(session, slot_id)
                .map(Json)
                .ok_or(ApiError::SlotNotFound(slot_id))
        })
        .await
}

/// Report response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportResponse {
    pub success: bool,
    pub file_name: String,
    /// Base64-encoded DOCX
    pub data: String,
    pub warnings: Vec<String>,
    pub removed_page_blocks: usize,
    pub record: AppraisalRecord,
}

/// Handler: POST /api/session/:id/report
///
/// Multipart body: a `form` field with the form as JSON, plus any number
/// of `object_photos`, `appendix_1`, `appendix_2` and `rights_documents`
/// file fields.
pub async fn generate_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<ReportResponse>, ApiError> {
    let mut form: Option<AppraisalForm> = None;
    let mut uploads = FormUploads::<RawUpload>::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        let group = match field_name.as_str() {
            "form" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidRequest(format!("Cannot read form: {}", e)))?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::InvalidRequest(format!("Invalid form: {}", e)))?;
                form = Some(parsed);
                continue;
            }
            "object_photos" => &mut uploads.object_photos,
            "appendix_1" => &mut uploads.appendix_1,
            "appendix_2" => &mut uploads.appendix_2,
            "rights_documents" => &mut uploads.rights_documents,
            other => {
                warn!("Ignoring unknown multipart field '{}'", other);
                continue;
            }
        };
        group.push(read_upload(field).await);
    }

    let form = form.ok_or_else(|| ApiError::InvalidRequest("Missing 'form' field".into()))?;
    let session = state
        .with_session(&id, |session| Ok(session.clone()))
        .await?;

    let generator = state.generator.clone();
    let report = tokio::task::spawn_blocking(move || generator.generate(&session, &form, &uploads))
        .await
        .map_err(|e| ApiError::Internal(format!("Render task failed: {}", e)))??;

    info!(
        "Report {} ready with {} warnings",
        report.file_name,
        report.warnings.len()
    );

    Ok(Json(ReportResponse {
        success: true,
        data: BASE64.encode(&report.bytes),
        file_name: report.file_name,
        warnings: report.warnings,
        removed_page_blocks: report.removed_page_blocks,
        record: report.record,
    }))
}
