use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
};
use utoipa::ToSchema;

use crate::AppState;
use crate::api::error::{AppError, ErrorResponse, NO_VIDEO_UPLOADED};
use crate::services::aggregator::Verdict;
use crate::services::staging::StagedUpload;

/// Name of the multipart field carrying the video
pub const VIDEO_FIELD: &str = "video";

/// Multipart form accepted by `/analyze`
#[derive(ToSchema)]
pub struct AnalyzeForm {
    #[schema(value_type = String, format = Binary)]
    pub video: Vec<u8>,
}

#[utoipa::path(
    post,
    path = "/analyze",
    request_body(content = AnalyzeForm, content_type = "multipart/form-data", description = "Video to analyze"),
    responses(
        (status = 200, description = "Video analyzed", body = Verdict),
        (status = 400, description = "No video uploaded", body = ErrorResponse),
        (status = 413, description = "Upload exceeds the size limit", body = ErrorResponse),
        (status = 500, description = "No frames could be processed", body = ErrorResponse)
    ),
    tag = "analysis"
)]
pub async fn analyze_video(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Verdict>, AppError> {
    // Anything that is not a multipart form cannot carry the video field
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!("Rejected non-multipart body: {}", rejection);
        AppError::BadRequest(NO_VIDEO_UPLOADED.to_string())
    })?;
    let mut staged: Option<StagedUpload> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if staged.is_some() || field.name() != Some(VIDEO_FIELD) {
            continue;
        }

        // A part without a filename is not a file upload
        let original_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let mut upload = StagedUpload::create(&state.config.upload_dir, &original_name)
            .map_err(|e| AppError::Internal(e.to_string()))?;

        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            upload
                .write_chunk(&chunk)
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
        }
        upload
            .finish()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;

        tracing::info!(
            request_id = %upload.request_id(),
            filename = %original_name,
            bytes = upload.bytes_written(),
            "Staged upload"
        );
        staged = Some(upload);
    }

    let upload = staged.ok_or_else(|| AppError::BadRequest(NO_VIDEO_UPLOADED.to_string()))?;

    let verdict = state.analyzer.analyze(upload.path()).await?;

    // `upload` drops here and removes the staged file
    Ok(Json(verdict))
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}
