use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use hybrec_domain::query::Query;
use hybrec_service::{Error, RecommendOptions, RecommendResponse};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendRequest {
	pub query: Query,
	#[serde(default)]
	pub options: RecommendOptions,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
	pub rows: usize,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/recommend", post(recommend))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/keywords/reload", post(reload_keywords)).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn recommend(
	State(state): State<AppState>,
	Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendResponse>, ApiError> {
	let response = state.service.recommend(&payload.query, &payload.options).await?;

	Ok(Json(response))
}

async fn reload_keywords(State(state): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
	let rows = state.service.reload_keywords().await?;

	Ok(Json(ReloadResponse { rows }))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::Configuration { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_configuration", message),
			Error::InvalidRequest { message } =>
				Self::new(StatusCode::BAD_REQUEST, "invalid_request", message),
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage failure.");

				Self::new(StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable", message)
			},
			Error::Provider { message } =>
				Self::new(StatusCode::BAD_GATEWAY, "provider_error", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
