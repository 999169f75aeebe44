//! Route handlers

use super::auth::AuthUser;
use super::responses::{
    ApiError, AsyncMessageResponse, AsyncSessionStartResponse, JobStatusResponse,
    MessageCreateRequest, MessageOut, Pagination, SessionCreateRequest, SessionListResponse,
    SessionStartResponse, SessionUpdateRequest, SessionUpdateResponse,
};
use super::AppState;
use crate::error::SeoAssistantError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

type Handled<T> = Result<T, ApiError>;

#[derive(Serialize)]
pub(super) struct Info {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
pub(super) struct Health {
    status: &'static str,
}

pub(super) async fn info() -> Json<Info> {
    Json(Info {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(super) async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Handled<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| SeoAssistantError::Validation(rejection.body_text()).into())
}

fn query(params: Result<Query<Pagination>, QueryRejection>) -> Handled<Pagination> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| SeoAssistantError::Validation(rejection.body_text()).into())
}

pub(super) async fn create_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SessionCreateRequest>, JsonRejection>,
) -> Handled<(StatusCode, Json<SessionStartResponse>)> {
    let request = body(payload)?;
    let start = state
        .service
        .start_session_sync(&user.id, &request.message, request.title.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(SessionStartResponse::from(&start))))
}

pub(super) async fn create_session_async(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SessionCreateRequest>, JsonRejection>,
) -> Handled<(StatusCode, Json<AsyncSessionStartResponse>)> {
    let request = body(payload)?;
    let start = state
        .service
        .start_session_async(&user.id, &request.message, request.title.as_deref())
        .await?;

    Ok((StatusCode::CREATED, Json(AsyncSessionStartResponse::from(&start))))
}

pub(super) async fn list_sessions(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    params: Result<Query<Pagination>, QueryRejection>,
) -> Handled<Json<Vec<SessionListResponse>>> {
    let page = query(params)?;
    let sessions = state
        .service
        .list_sessions(&user.id, page.limit, page.offset)?;

    Ok(Json(sessions.iter().map(SessionListResponse::from).collect()))
}

pub(super) async fn update_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    payload: Result<Json<SessionUpdateRequest>, JsonRejection>,
) -> Handled<Json<SessionUpdateResponse>> {
    let request = body(payload)?;
    let session = state
        .service
        .update_session(&user.id, &session_id, request.title.as_deref())?;

    Ok(Json(SessionUpdateResponse::from(&session)))
}

pub(super) async fn delete_session(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
) -> Handled<StatusCode> {
    state.service.delete_session(&user.id, &session_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn list_messages(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    params: Result<Query<Pagination>, QueryRejection>,
) -> Handled<Json<Vec<MessageOut>>> {
    let page = query(params)?;
    let messages = state
        .service
        .list_messages(&user.id, &session_id, page.limit, page.offset)?;

    Ok(Json(messages.iter().map(MessageOut::from).collect()))
}

pub(super) async fn add_message(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    payload: Result<Json<MessageCreateRequest>, JsonRejection>,
) -> Handled<(StatusCode, Json<MessageOut>)> {
    let request = body(payload)?;
    let agent_message = state
        .service
        .add_message_sync(&user.id, &session_id, &request.message)
        .await?;

    Ok((StatusCode::CREATED, Json(MessageOut::from(&agent_message))))
}

pub(super) async fn add_message_async(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(session_id): Path<String>,
    payload: Result<Json<MessageCreateRequest>, JsonRejection>,
) -> Handled<(StatusCode, Json<AsyncMessageResponse>)> {
    let request = body(payload)?;
    let posted = state
        .service
        .add_message_async(&user.id, &session_id, &request.message)
        .await?;

    Ok((StatusCode::CREATED, Json(AsyncMessageResponse::from(&posted))))
}

pub(super) async fn job_status(
    State(state): State<Arc<AppState>>,
    AuthUser(user): AuthUser,
    Path(job_id): Path<String>,
) -> Handled<Json<JobStatusResponse>> {
    let view = state.service.job_status(&user.id, &job_id)?;
    Ok(Json(JobStatusResponse::from(&view)))
}
