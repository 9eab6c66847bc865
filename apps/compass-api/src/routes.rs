use std::convert::Infallible;

use axum::{
	Json, Router,
	extract::State,
	http::{HeaderMap, StatusCode},
	response::{
		IntoResponse, Response,
		sse::{Event, Sse},
	},
	routing::{get, post},
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::state::AppState;
use compass_service::{
	ChatMessage, ChatRequest, CreateNoteRequest, CreateNoteResponse, DeleteNoteRequest,
	DeleteNoteResponse, Error as ServiceError, ListNotesRequest, ListNotesResponse,
	RebuildReport, RecommendRequest, RecommendResponse, UpdateNoteRequest, UpdateNoteResponse,
};

/// Identity is delegated to the fronting identity proxy, which injects the
/// authenticated user id into this header.
const USER_ID_HEADER: &str = "x-user-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/notes", get(list_notes).post(create_note).put(update_note).delete(delete_note))
		.route("/v1/chat", post(chat))
		.route("/v1/courses", get(courses))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/rebuild_qdrant", post(rebuild_qdrant)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct CreateNotePayload {
	title: String,
	content: Option<String>,
	color: String,
}

#[derive(Debug, Deserialize)]
struct UpdateNotePayload {
	id: Uuid,
	title: String,
	content: Option<String>,
	color: String,
}

#[derive(Debug, Deserialize)]
struct DeleteNotePayload {
	id: Uuid,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
	messages: Vec<ChatMessage>,
}

async fn list_notes(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<ListNotesResponse>, ApiError> {
	let user_id = require_user_id(&headers)?;
	let response = state.service.list_notes(ListNotesRequest { user_id }).await?;
	Ok(Json(response))
}

async fn create_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<CreateNotePayload>,
) -> Result<(StatusCode, Json<CreateNoteResponse>), ApiError> {
	let user_id = require_user_id(&headers)?;
	let response = state
		.service
		.create_note(CreateNoteRequest {
			user_id,
			title: payload.title,
			content: payload.content,
			color: payload.color,
		})
		.await?;
	Ok((StatusCode::CREATED, Json(response)))
}

async fn update_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<UpdateNotePayload>,
) -> Result<Json<UpdateNoteResponse>, ApiError> {
	let user_id = require_user_id(&headers)?;
	let response = state
		.service
		.update_note(UpdateNoteRequest {
			user_id,
			note_id: payload.id,
			title: payload.title,
			content: payload.content,
			color: payload.color,
		})
		.await?;
	Ok(Json(response))
}

async fn delete_note(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<DeleteNotePayload>,
) -> Result<Json<DeleteNoteResponse>, ApiError> {
	let user_id = require_user_id(&headers)?;
	let response =
		state.service.delete_note(DeleteNoteRequest { user_id, note_id: payload.id }).await?;
	Ok(Json(response))
}

async fn chat(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<ChatPayload>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
	let user_id = require_user_id(&headers)?;
	let stream =
		state.service.chat(ChatRequest { user_id, messages: payload.messages }).await?;
	let events = ReceiverStream::new(stream).map(|chunk| {
		Ok::<Event, Infallible>(match chunk {
			Ok(text) => Event::default().data(text),
			Err(err) => {
				tracing::error!(error = %err, "Chat stream failed mid-transmission.");

				// A distinct event type lets clients tell a failed stream
				// from one that simply ended.
				Event::default().event("error").data("Chat stream failed.")
			},
		})
	});

	Ok(Sse::new(events))
}

async fn courses(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<RecommendResponse>, ApiError> {
	let user_id = require_user_id(&headers)?;
	let response = state.service.recommend_courses(RecommendRequest { user_id }).await?;
	Ok(Json(response))
}

async fn rebuild_qdrant(State(state): State<AppState>) -> Result<Json<RebuildReport>, ApiError> {
	let response = state.service.rebuild_qdrant().await?;
	Ok(Json(response))
}

fn require_user_id(headers: &HeaderMap) -> Result<String, ApiError> {
	headers
		.get(USER_ID_HEADER)
		.and_then(|value| value.to_str().ok())
		.map(str::trim)
		.filter(|value| !value.is_empty())
		.map(str::to_string)
		.ok_or_else(|| {
			ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", "Missing user identity.", None)
		})
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

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				ApiError::new(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			ServiceError::Unauthorized { message } =>
				ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message, None),
			ServiceError::NotFound { message } =>
				ApiError::new(StatusCode::NOT_FOUND, "not_found", message, None),
			ServiceError::Provider { message } => {
				tracing::error!(error = %message, "Upstream provider failed.");

				ApiError::new(
					StatusCode::BAD_GATEWAY,
					"upstream_error",
					"Upstream provider failed.",
					None,
				)
			},
			ServiceError::Storage { message } | ServiceError::Qdrant { message } => {
				tracing::error!(error = %message, "Storage operation failed.");

				ApiError::new(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"Internal server error.",
					None,
				)
			},
		}
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
