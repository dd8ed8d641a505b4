use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use recall_service::{AnswerResponse, IngestRequest, IngestResponse, MemorySummary, ServiceError};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/memory/ingest", post(ingest))
		.route("/v1/memory/answer", post(answer))
		.route("/v1/memory/list", post(list))
		.route("/v1/memory/forget/preview", post(forget_preview))
		.route("/v1/memory/forget/confirm", post(forget_confirm))
		.route("/v1/memory/forget_all", post(forget_all))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ApiIngestRequest {
	owner_id: String,
	declared_type: String,
	source_name: Option<String>,
	content: Option<String>,
	content_base64: Option<String>,
}

async fn ingest(
	State(state): State<AppState>,
	Json(payload): Json<ApiIngestRequest>,
) -> Result<Json<IngestResponse>, ApiError> {
	let content = decode_content(payload.content, payload.content_base64)?;
	let response = state
		.service
		.ingest(IngestRequest {
			owner_id: payload.owner_id,
			content,
			declared_type: payload.declared_type,
			source_name: payload.source_name,
		})
		.await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ApiAnswerRequest {
	owner_id: String,
	message: String,
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<ApiAnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer(&payload.owner_id, &payload.message).await?;

	Ok(Json(response))
}

#[derive(Debug, Deserialize)]
struct ApiListRequest {
	owner_id: String,
	query: Option<String>,
}
#[derive(Debug, Serialize)]
struct ApiListResponse {
	items: Vec<MemorySummary>,
}

async fn list(
	State(state): State<AppState>,
	Json(payload): Json<ApiListRequest>,
) -> Result<Json<ApiListResponse>, ApiError> {
	let items = state.service.list(&payload.owner_id, payload.query.as_deref()).await?;

	Ok(Json(ApiListResponse { items }))
}

#[derive(Debug, Deserialize)]
struct ApiForgetPreviewRequest {
	owner_id: String,
	terms: String,
}
#[derive(Debug, Serialize)]
struct ApiForgetPreviewResponse {
	matches: Vec<MemorySummary>,
}

async fn forget_preview(
	State(state): State<AppState>,
	Json(payload): Json<ApiForgetPreviewRequest>,
) -> Result<Json<ApiForgetPreviewResponse>, ApiError> {
	let matches = state.service.preview_forget(&payload.owner_id, &payload.terms).await?;

	Ok(Json(ApiForgetPreviewResponse { matches }))
}

#[derive(Debug, Deserialize)]
struct ApiForgetConfirmRequest {
	owner_id: String,
	ids: Vec<Uuid>,
}
#[derive(Debug, Serialize)]
struct ApiForgetConfirmResponse {
	deleted: u64,
}

async fn forget_confirm(
	State(state): State<AppState>,
	Json(payload): Json<ApiForgetConfirmRequest>,
) -> Result<Json<ApiForgetConfirmResponse>, ApiError> {
	let deleted = state.service.confirm_forget(&payload.owner_id, &payload.ids).await?;

	Ok(Json(ApiForgetConfirmResponse { deleted }))
}

#[derive(Debug, Deserialize)]
struct ApiForgetAllRequest {
	owner_id: String,
	#[serde(default)]
	confirm: bool,
}
#[derive(Debug, Serialize)]
struct ApiForgetAllResponse {
	confirmed: bool,
	count: u64,
}

/// Destructive wipes are two-phase: `confirm: false` only reports how
/// many memories would go, `confirm: true` actually deletes them.
async fn forget_all(
	State(state): State<AppState>,
	Json(payload): Json<ApiForgetAllRequest>,
) -> Result<Json<ApiForgetAllResponse>, ApiError> {
	let count = if payload.confirm {
		state.service.forget_all(&payload.owner_id).await?
	} else {
		state.service.preview_forget_all(&payload.owner_id).await?
	};

	Ok(Json(ApiForgetAllResponse { confirmed: payload.confirm, count }))
}

fn decode_content(
	content: Option<String>,
	content_base64: Option<String>,
) -> Result<Vec<u8>, ApiError> {
	match (content, content_base64) {
		(Some(text), None) => Ok(text.into_bytes()),
		(None, Some(encoded)) => {
			base64::engine::general_purpose::STANDARD.decode(encoded.as_bytes()).map_err(|_| {
				json_error(
					StatusCode::BAD_REQUEST,
					"invalid_request",
					"content_base64 is not valid base64.",
					Some(vec!["content_base64".to_string()]),
				)
			})
		},
		_ => Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"Provide exactly one of content or content_base64.",
			Some(vec!["content".to_string(), "content_base64".to_string()]),
		)),
	}
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.to_string();
		let (status, code) = match err {
			ServiceError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::UnsupportedFormat { .. } => {
				(StatusCode::UNSUPPORTED_MEDIA_TYPE, "unsupported_format")
			},
			ServiceError::ContentTooLarge { .. } => {
				(StatusCode::PAYLOAD_TOO_LARGE, "content_too_large")
			},
			ServiceError::ExtractionFailed { .. } => {
				(StatusCode::UNPROCESSABLE_ENTITY, "extraction_failed")
			},
			ServiceError::EmbeddingProvider { .. } => (StatusCode::BAD_GATEWAY, "embedding_provider"),
			ServiceError::LanguageModel { .. } => (StatusCode::BAD_GATEWAY, "language_model"),
			ServiceError::StoreUnavailable { .. } => {
				(StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
			},
			ServiceError::CacheInconsistency { .. } => {
				(StatusCode::INTERNAL_SERVER_ERROR, "cache_inconsistency")
			},
		};

		json_error(status, code, message, None)
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody {
			error_code: self.error_code,
			message: self.message,
			fields: self.fields,
		};

		(self.status, Json(body)).into_response()
	}
}
