use std::convert::Infallible;

use axum::{
	Json, Router,
	extract::{Query, State},
	http::StatusCode,
	response::{
		IntoResponse, Response,
		sse::{Event, KeepAlive, Sse},
	},
	routing::get,
};
use futures::{Stream, stream};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle};

use costar_domain::{ParticipantSummary, QueryConfig, RoleFilter};
use costar_service::{Error as ServiceError, Progress, QueryRequest, QueryResponse};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/participants", get(participants))
		.route("/v1/participants/stream", get(participants_stream))
		.with_state(state)
}

/// Query-string form of a ranking request.
#[derive(Debug, Default, Deserialize)]
pub struct ParticipantsParams {
	pub username: Option<String>,
	pub sort: Option<String>,
	/// Item cutoff; anything that is not a non-negative integer means unbounded.
	pub top_n: Option<String>,
	/// Comma-separated role filter names.
	pub role_filters: Option<String>,
}
impl ParticipantsParams {
	pub fn into_request(self) -> QueryRequest {
		let mut config = QueryConfig::default();

		if let Some(sort) = self.sort {
			config.sort = sort;
		}

		config.max_items = self.top_n.and_then(|raw| raw.trim().parse::<usize>().ok());
		config.role_filters = self
			.role_filters
			.as_deref()
			.map(|raw| RoleFilter::parse_list(raw.split(',').map(str::trim)))
			.unwrap_or_default();

		QueryRequest { user: self.username.unwrap_or_default(), config }
	}
}

#[derive(Debug, Serialize)]
struct FinalEvent<'a> {
	participants: &'a [ParticipantSummary],
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn participants(
	State(state): State<AppState>,
	Query(params): Query<ParticipantsParams>,
) -> Result<Json<QueryResponse>, ApiError> {
	let response = state.service.query(params.into_request(), None).await?;

	Ok(Json(response))
}

async fn participants_stream(
	State(state): State<AppState>,
	Query(params): Query<ParticipantsParams>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
	let request = params.into_request();

	if request.user.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"username must be non-empty.",
		));
	}

	let (tx, rx) = mpsc::unbounded_channel::<Progress>();
	let service = state.service.clone();
	let handle = tokio::spawn(async move { service.query(request, Some(&tx)).await });

	Ok(Sse::new(progress_events(rx, handle)).keep_alive(KeepAlive::default()))
}

type QueryTask = JoinHandle<costar_service::Result<QueryResponse>>;

/// Relays progress until the query task drops its sender, then emits the result as the last event.
fn progress_events(
	rx: mpsc::UnboundedReceiver<Progress>,
	handle: QueryTask,
) -> impl Stream<Item = Result<Event, Infallible>> {
	stream::unfold(Some((rx, handle)), |state| async move {
		let (mut rx, handle) = state?;

		match rx.recv().await {
			Some(progress) => Some((Ok(json_event(None, &progress)), Some((rx, handle)))),
			None => Some((Ok(final_event(handle.await)), None)),
		}
	})
}

fn final_event(
	joined: Result<costar_service::Result<QueryResponse>, tokio::task::JoinError>,
) -> Event {
	match joined {
		Ok(Ok(response)) =>
			json_event(None, &FinalEvent { participants: &response.participants }),
		Ok(Err(err)) => {
			let err = ApiError::from(err);

			json_event(Some("error"), &err.body())
		},
		Err(err) => {
			tracing::error!(error = %err, "Streaming query task failed.");

			json_event(
				Some("error"),
				&ErrorBody {
					error_code: "internal_error".to_string(),
					message: "Query task failed.".to_string(),
				},
			)
		},
	}
}

fn json_event<T>(name: Option<&str>, payload: &T) -> Event
where
	T: Serialize,
{
	let data = serde_json::to_string(payload).unwrap_or_else(|err| {
		tracing::error!(error = %err, "Failed to encode event payload.");

		"{}".to_string()
	});
	let event = Event::default().data(data);

	match name {
		Some(name) => event.event(name),
		None => event,
	}
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

	fn body(&self) -> ErrorBody {
		ErrorBody { error_code: self.error_code.clone(), message: self.message.clone() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match err {
			ServiceError::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message),
			ServiceError::Provider { message } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", message),
			ServiceError::Cache { message } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "cache_error", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		(self.status, Json(self.body())).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
