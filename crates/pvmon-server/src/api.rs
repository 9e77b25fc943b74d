// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of PVMon.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! JSON endpoints: dashboard selection, refresh, scheduler control and health.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pvmon_client::{ClientError, ClientResult};
use pvmon_core::DashboardEvent;
use pvmon_types::{NewJob, SchedulerStatus};
use serde_json::json;
use tracing::{error, info, warn};

use crate::state::AppState;

/// JSON error body `{ "error": message }` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Status code a page or endpoint answers with when the data source fails.
pub(crate) fn status_for(err: &ClientError) -> StatusCode {
    match err {
        ClientError::NotFound(_) => StatusCode::NOT_FOUND,
        ClientError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ClientError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        ClientError::Http(_)
        | ClientError::Api { .. }
        | ClientError::AuthenticationFailed
        | ClientError::MalformedResponse(_)
        | ClientError::Json(_)
        | ClientError::Cache(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Runs a scheduler action by name and returns its past-tense label.
pub(crate) async fn run_job_action(
    state: &AppState,
    id: &str,
    action: &str,
) -> ClientResult<&'static str> {
    let source = &state.source;
    let done = match action {
        "pause" => {
            source.pause_job(id).await?;
            "paused"
        }
        "resume" => {
            source.resume_job(id).await?;
            "resumed"
        }
        "run-now" | "run_now" => {
            source.run_job_now(id).await?;
            "triggered"
        }
        "delete" => {
            source.delete_job(id).await?;
            "deleted"
        }
        other => {
            return Err(ClientError::InvalidRequest(format!(
                "unknown job action '{other}'"
            )));
        }
    };
    info!(job_id = %id, action, "Scheduler job {done}");
    Ok(done)
}

/// `POST /api/select/plant/{id}`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn select_plant(
    State(state): State<AppState>,
    Path(plant_id): Path<String>,
) -> Json<serde_json::Value> {
    let receivers = state.events.publish(DashboardEvent::PlantSelected {
        plant_id: plant_id.clone(),
    });
    Json(json!({ "selected": plant_id, "receivers": receivers }))
}

/// `POST /api/select/region/{region}`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn select_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> Json<serde_json::Value> {
    let receivers = state.events.publish(DashboardEvent::RegionSelected {
        region: region.clone(),
    });
    Json(json!({ "selected": region, "receivers": receivers }))
}

/// `POST /api/refresh`: reloads the device list and tells every browser.
pub async fn refresh(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state.refresh().await.map_err(|e| {
        error!(source = state.source.name(), error = %e, "Refresh failed");
        ApiError::from(e)
    })?;
    Ok(Json(json!({ "source": state.source.name(), "count": count })))
}

/// `GET /api/scheduler/status`
pub async fn scheduler_status(
    State(state): State<AppState>,
) -> Result<Json<SchedulerStatus>, ApiError> {
    Ok(Json(state.source.scheduler_status().await?))
}

/// `POST /api/scheduler/jobs`
pub async fn create_job(
    State(state): State<AppState>,
    Json(job): Json<NewJob>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if let Err(e) = job.validate() {
        return Err(ApiError::unprocessable(e.to_string()));
    }
    let name = job.name.clone();
    state.source.create_job(job).await.inspect_err(|e| {
        warn!(job = %name, error = %e, "Failed to create job");
    })?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "created", "name": name })),
    ))
}

/// `DELETE /api/scheduler/jobs/{id}`
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let done = run_job_action(&state, &id, "delete").await?;
    Ok(Json(json!({ "job_id": id, "status": done })))
}

/// `POST /api/scheduler/jobs/{id}/{pause|resume|run-now}`
pub async fn job_action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let done = run_job_action(&state, &id, &action).await?;
    Ok(Json(json!({ "job_id": id, "status": done })))
}

/// `GET /health`
#[expect(clippy::unused_async, reason = "axum handler must be async")]
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "source": state.source.name(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&ClientError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&ClientError::InvalidRequest("x".to_owned())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&ClientError::Api {
                status: 500,
                message: "boom".to_owned()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&ClientError::AuthenticationFailed),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_api_error_carries_status() {
        let response = ApiError::unprocessable("bad input").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
