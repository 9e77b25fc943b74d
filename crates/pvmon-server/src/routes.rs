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

use axum::Router;
use axum::routing::{delete, get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{api, export, iv, pages, sse};

/// Every page, export and API route of the dashboard.
pub fn router(state: AppState) -> Router {
    let html = Router::new()
        .route("/", get(pages::overview))
        .route("/plants", get(pages::plants))
        .route("/plants/export.csv", get(export::plants))
        .route("/plants/{id}", get(pages::plant_detail))
        .route("/devices", get(pages::devices))
        .route("/devices/export.csv", get(export::devices))
        .route("/alerts", get(pages::alerts))
        .route("/alerts/export.csv", get(export::alerts))
        .route("/maintenance", get(pages::maintenance))
        .route("/maintenance/export.csv", get(export::maintenance))
        .route("/scheduler", get(pages::scheduler))
        .route("/scheduler/jobs", post(pages::create_job_form))
        .route("/scheduler/jobs/{id}/{action}", post(pages::job_action_form))
        .route("/diagnostics/iv-curve", get(iv::page));

    let api = Router::new()
        .route("/api/iv-curve/simulate", post(iv::simulate_api))
        .route("/api/iv-curve/diagnose", post(iv::diagnose_api))
        .route("/api/iv-curve/chart.svg", get(iv::chart_svg))
        .route("/api/select/plant/{id}", post(api::select_plant))
        .route("/api/select/region/{region}", post(api::select_region))
        .route("/api/refresh", post(api::refresh))
        .route("/api/scheduler/status", get(api::scheduler_status))
        .route("/api/scheduler/jobs", post(api::create_job))
        .route("/api/scheduler/jobs/{id}", delete(api::delete_job))
        .route("/api/scheduler/jobs/{id}/{action}", post(api::job_action))
        .route("/events", get(sse::events))
        .route("/health", get(api::health));

    html.merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::ServerConfig;
    use crate::fixture::{FixtureData, FixtureSource};

    fn app() -> Router {
        let state = AppState::new(
            ServerConfig::with_fixtures("unused.json"),
            Arc::new(FixtureSource::new(FixtureData::default())),
        );
        router(state)
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["source"], "fixture");
    }

    #[tokio::test]
    async fn test_export_path_is_not_a_plant_id() {
        let response = app()
            .oneshot(
                Request::get("/plants/export.csv")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/csv; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_unknown_plant_is_404() {
        let response = app()
            .oneshot(Request::get("/plants/nope").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_source_renders_empty_tables() {
        let response = app()
            .oneshot(Request::get("/devices").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("No matching records"));
    }
}
