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

//! CSV downloads of the filtered and sorted table views (all pages).

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use pvmon_client::ClientResult;
use pvmon_core::{export_csv, export_filename};
use pvmon_types::{Alert, Device, MaintenanceTask, Plant};
use tracing::{debug, error};

use crate::api::ApiError;
use crate::state::AppState;
use crate::table::{TableQuery, TableRecord};

async fn export<T, F>(state: &AppState, query: &TableQuery, fetch: F) -> Result<Response, ApiError>
where
    T: TableRecord,
    F: Future<Output = ClientResult<Vec<T>>>,
{
    let items = fetch.await.inspect_err(|e| {
        error!(table = T::TITLE, error = %e, "Failed to load data for export");
    })?;
    let view = query.build_view(items, state.page_size());
    let rows = view.filtered();
    let body = export_csv(&rows).map_err(|e| {
        error!(table = T::TITLE, error = %e, "CSV export failed");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let filename = export_filename(T::EXPORT_PREFIX, Utc::now());
    debug!(file = %filename, rows = rows.len(), "Exporting CSV");
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/csv; charset=utf-8"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

/// `/devices/export.csv`
pub async fn devices(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
) -> Result<Response, ApiError> {
    export::<Device, _>(&state, &query, state.source.devices()).await
}

/// `/alerts/export.csv`
pub async fn alerts(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
) -> Result<Response, ApiError> {
    export::<Alert, _>(&state, &query, state.source.alerts()).await
}

/// `/maintenance/export.csv`
pub async fn maintenance(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
) -> Result<Response, ApiError> {
    export::<MaintenanceTask, _>(&state, &query, state.source.maintenance_tasks()).await
}

/// `/plants/export.csv`
pub async fn plants(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
) -> Result<Response, ApiError> {
    export::<Plant, _>(&state, &query, state.source.plants()).await
}
