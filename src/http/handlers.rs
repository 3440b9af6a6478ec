//! Resource CRUD handlers.
//!
//! Handlers only run after admission; they validate input, issue one
//! [`Statement`] and shape the reply.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::http::validation::{parse_id, sanitize_text};
use crate::store::{QueryOutcome, Resource, Statement, StoreError};

#[derive(Debug, Deserialize)]
pub struct ResourcePayload {
    pub text: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Ack {
    pub msg: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
}

impl Ack {
    fn message(msg: &'static str) -> Self {
        Self { msg, id: None }
    }
}

fn payload_text(payload: Result<Json<ResourcePayload>, JsonRejection>) -> Result<String, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected request body");
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::Validation("body must be JSON with a string `text` field".into())
        }
    })?;
    sanitize_text(&payload.text)
}

fn affected_or_not_found(outcome: QueryOutcome, statement: &'static str) -> Result<(), ApiError> {
    match outcome {
        QueryOutcome::Affected(0) => Err(ApiError::NotFound),
        QueryOutcome::Affected(_) => Ok(()),
        _ => Err(StoreError::UnexpectedOutcome(statement).into()),
    }
}

/// `POST /resource`
pub async fn create_resource(
    State(state): State<AppState>,
    payload: Result<Json<ResourcePayload>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let text = payload_text(payload)?;

    match state.store.execute(Statement::Insert { text }).await? {
        QueryOutcome::Inserted { id } => Ok(Json(Ack {
            msg: "created",
            id: Some(id),
        })),
        _ => Err(StoreError::UnexpectedOutcome("insert").into()),
    }
}

/// `GET /resource`
pub async fn list_resources(State(state): State<AppState>) -> Result<Json<Vec<Resource>>, ApiError> {
    match state.store.execute(Statement::SelectAll).await? {
        QueryOutcome::Rows(rows) => Ok(Json(rows)),
        _ => Err(StoreError::UnexpectedOutcome("select").into()),
    }
}

/// `PUT /resource/{id}`
pub async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ResourcePayload>, JsonRejection>,
) -> Result<Json<Ack>, ApiError> {
    let id = parse_id(&id)?;
    let text = payload_text(payload)?;

    let outcome = state.store.execute(Statement::Update { id, text }).await?;
    affected_or_not_found(outcome, "update")?;
    Ok(Json(Ack::message("updated")))
}

/// `DELETE /resource/{id}`
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Ack>, ApiError> {
    let id = parse_id(&id)?;

    let outcome = state.store.execute(Statement::Delete { id }).await?;
    affected_or_not_found(outcome, "delete")?;
    Ok(Json(Ack::message("deleted")))
}
