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

//! HTML page handlers.

use askama::Template;
use axum::extract::{Form, Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::Utc;
use pvmon_client::{ClientError, ClientResult};
use pvmon_core::{ListFilter, ListView, Listable, SortDirection};
use pvmon_types::{Alert, Device, DeviceStatus, MaintenanceTask, NewJob, Plant, SchedulerJob};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::api::{run_job_action, status_for};
use crate::state::AppState;
use crate::table::{BodyCell, TableModel, TableQuery, TableRecord, body_cell, build_table};

/// Rows of the "latest alerts" block on the overview.
const OVERVIEW_ALERT_ROWS: usize = 5;

/// Common page chrome rendered by `base.html`.
#[derive(Debug, Clone)]
pub struct Layout {
    pub title: String,
    /// Key of the active navigation entry.
    pub nav: &'static str,
    pub generated_at: String,
}

impl Layout {
    pub(crate) fn new(title: impl Into<String>, nav: &'static str) -> Self {
        Self {
            title: title.into(),
            nav,
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Card {
    pub label: &'static str,
    pub value: String,
    pub detail: String,
    /// `warn`, `crit` or empty.
    pub class: &'static str,
}

/// Small read-only table without filters or paging.
#[derive(Debug, Clone)]
pub struct MiniTable {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<BodyCell>>,
    pub empty_text: &'static str,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub title: String,
    pub table: MiniTable,
    /// Empty when there is no full listing to link to.
    pub more_href: String,
}

#[derive(Debug, Clone)]
pub struct Fact {
    pub label: &'static str,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct JobRow {
    pub id: String,
    pub name: String,
    pub job_type: String,
    pub cron: String,
    pub state: &'static str,
    pub next_run: String,
    pub last_run: String,
    pub paused: bool,
    /// `/scheduler/jobs/{id}`; actions are appended by the template.
    pub action_base: String,
}

impl From<&SchedulerJob> for JobRow {
    fn from(job: &SchedulerJob) -> Self {
        let when = |t: Option<chrono::DateTime<Utc>>| {
            t.map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "-".to_owned())
        };
        Self {
            id: job.id.clone(),
            name: job.name.clone().unwrap_or_else(|| job.id.clone()),
            job_type: job.job_type.clone().unwrap_or_default(),
            cron: job.cron.clone().unwrap_or_default(),
            state: job.state.as_str(),
            next_run: when(job.next_run_time),
            last_run: when(job.last_run_time),
            paused: job.state == pvmon_types::JobState::Paused,
            action_base: format!("/scheduler/jobs/{}", urlencoding::encode(&job.id)),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate {
    layout: Layout,
    errors: Vec<String>,
    retry_href: String,
}

#[derive(Template)]
#[template(path = "overview.html")]
struct OverviewTemplate {
    layout: Layout,
    errors: Vec<String>,
    retry_href: String,
    cards: Vec<Card>,
    sections: Vec<Section>,
}

#[derive(Template)]
#[template(path = "table.html")]
struct TableTemplate {
    layout: Layout,
    errors: Vec<String>,
    retry_href: String,
    table: TableModel,
}

#[derive(Template)]
#[template(path = "plant.html")]
struct PlantTemplate {
    layout: Layout,
    errors: Vec<String>,
    retry_href: String,
    plant_id: String,
    plant_name: String,
    facts: Vec<Fact>,
    sections: Vec<Section>,
}

#[derive(Template)]
#[template(path = "scheduler.html")]
struct SchedulerTemplate {
    layout: Layout,
    errors: Vec<String>,
    retry_href: String,
    running: bool,
    jobs: Vec<JobRow>,
    message: String,
    form_error: String,
}

/// Renders a template, logging and answering 500 if rendering fails.
pub(crate) fn render<T: Template>(template: &T, status: StatusCode) -> Response {
    match template.render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "Template render error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("<h1>Error rendering page</h1><p>{e}</p>")),
            )
                .into_response()
        }
    }
}

fn error_page(title: &str, nav: &'static str, uri: &Uri, err: &ClientError) -> Response {
    let template = ErrorTemplate {
        layout: Layout::new(title, nav),
        errors: vec![format!("Failed to load {}: {err}", title.to_lowercase())],
        retry_href: uri.to_string(),
    };
    render(&template, status_for(err))
}

/// Unwraps a fetch result, recording the failure for the error banner.
fn collect<T>(result: ClientResult<Vec<T>>, what: &str, errors: &mut Vec<String>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        error!(error = %e, what, "Failed to load data");
        errors.push(format!("Failed to load {what}: {e}"));
        Vec::new()
    })
}

/// 200 when everything loaded, 502 when a banner is shown.
fn page_status(errors: &[String]) -> StatusCode {
    if errors.is_empty() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    }
}

/// Picks `keys` out of the record's columns, in the given order.
fn mini_table<T: TableRecord>(records: &[&T], keys: &[&str], empty_text: &'static str) -> MiniTable {
    let columns: Vec<_> = keys
        .iter()
        .filter_map(|key| T::columns().iter().find(|c| c.key == *key))
        .collect();
    MiniTable {
        headers: columns.iter().map(|c| c.label).collect(),
        rows: records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|c| body_cell(*record, c.key, c.kind))
                    .collect()
            })
            .collect(),
        empty_text,
    }
}

fn format_kw(value: f64) -> String {
    if value >= 1000.0 {
        format!("{:.2} MW", value / 1000.0)
    } else {
        format!("{value:.1} kW")
    }
}

fn overview_cards(
    plants: &[Plant],
    devices: &[Device],
    alerts: &[Alert],
    tasks: &[MaintenanceTask],
) -> Vec<Card> {
    let today = Utc::now().date_naive();
    let capacity: f64 = plants.iter().filter_map(|p| p.capacity_kw).sum();
    let energy: f64 = plants.iter().filter_map(|p| p.today_energy_kwh).sum();
    let online = devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Online)
        .count();
    let troubled = devices.len() - online;
    let active: Vec<&Alert> = alerts.iter().filter(|a| !a.acknowledged).collect();
    let critical = active
        .iter()
        .filter(|a| a.severity == pvmon_types::AlertSeverity::Critical)
        .count();
    let open = tasks.iter().filter(|t| t.is_open()).count();
    let overdue = tasks.iter().filter(|t| t.is_overdue(today)).count();

    vec![
        Card {
            label: "Plants",
            value: plants.len().to_string(),
            detail: format!("{} installed", format_kw(capacity)),
            class: "",
        },
        Card {
            label: "Energy today",
            value: format!("{energy:.1} kWh"),
            detail: "Sum over all plants".to_owned(),
            class: "",
        },
        Card {
            label: "Devices online",
            value: format!("{online}/{}", devices.len()),
            detail: format!("{troubled} offline or faulted"),
            class: if troubled > 0 { "warn" } else { "" },
        },
        Card {
            label: "Active alerts",
            value: active.len().to_string(),
            detail: format!("{critical} critical"),
            class: if critical > 0 { "crit" } else { "" },
        },
        Card {
            label: "Open tasks",
            value: open.to_string(),
            detail: format!("{overdue} overdue"),
            class: if overdue > 0 { "warn" } else { "" },
        },
    ]
}

/// `/`
pub async fn overview(State(state): State<AppState>, uri: Uri) -> Response {
    let source = &state.source;
    let (plants, devices, alerts, tasks) = tokio::join!(
        source.plants(),
        source.devices(),
        source.alerts(),
        source.maintenance_tasks()
    );

    let mut errors = Vec::new();
    let plants = collect(plants, "plants", &mut errors);
    let devices = collect(devices, "devices", &mut errors);
    let alerts = collect(alerts, "alerts", &mut errors);
    let tasks = collect(tasks, "maintenance tasks", &mut errors);

    let cards = overview_cards(&plants, &devices, &alerts, &tasks);

    let mut latest = ListView::new(alerts).with_page_size(OVERVIEW_ALERT_ROWS);
    latest.set_filter(ListFilter {
        status: Some("active".to_owned()),
        ..ListFilter::default()
    });
    latest.set_sort("raised_at", SortDirection::Desc);
    let latest_page = latest.page();

    let plant_refs: Vec<&Plant> = plants.iter().collect();
    let sections = vec![
        Section {
            title: "Plants".to_owned(),
            table: mini_table(
                &plant_refs,
                &["name", "location", "status", "capacity_kw", "today_energy_kwh"],
                "No plants",
            ),
            more_href: Plant::PATH.to_owned(),
        },
        Section {
            title: "Latest active alerts".to_owned(),
            table: mini_table(
                &latest_page.items,
                &["severity", "plant_id", "message", "raised_at"],
                "No active alerts",
            ),
            more_href: format!("{}?status=active&sort=raised_at&dir=desc", Alert::PATH),
        },
    ];

    let template = OverviewTemplate {
        layout: Layout::new("Overview", "overview"),
        retry_href: uri.to_string(),
        cards,
        sections,
        errors,
    };
    render(&template, page_status(&template.errors))
}

/// Shared body of every table page.
async fn render_table<T, F>(
    state: &AppState,
    query: &TableQuery,
    uri: &Uri,
    nav: &'static str,
    fetch: F,
) -> Response
where
    T: TableRecord,
    F: Future<Output = ClientResult<Vec<T>>>,
{
    let mut errors = Vec::new();
    let items = collect(fetch.await, &T::TITLE.to_lowercase(), &mut errors);
    let view = query.build_view(items, state.page_size());
    let table = build_table(&view, state.page_size());

    let template = TableTemplate {
        layout: Layout::new(T::TITLE, nav),
        retry_href: uri.to_string(),
        table,
        errors,
    };
    render(&template, page_status(&template.errors))
}

/// `/plants`
pub async fn plants(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
    uri: Uri,
) -> Response {
    render_table(&state, &query, &uri, "plants", state.source.plants()).await
}

/// `/devices`
pub async fn devices(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
    uri: Uri,
) -> Response {
    render_table(&state, &query, &uri, "devices", state.source.devices()).await
}

/// `/alerts`
pub async fn alerts(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
    uri: Uri,
) -> Response {
    render_table(&state, &query, &uri, "alerts", state.source.alerts()).await
}

/// `/maintenance`
pub async fn maintenance(
    State(state): State<AppState>,
    Query(query): Query<TableQuery>,
    uri: Uri,
) -> Response {
    render_table(
        &state,
        &query,
        &uri,
        "maintenance",
        state.source.maintenance_tasks(),
    )
    .await
}

fn plant_facts(plant: &Plant, devices: &[&Device]) -> Vec<Fact> {
    let text = |value: Option<&String>| value.cloned().unwrap_or_else(|| "-".to_owned());
    let number = |value: Option<f64>, unit: &str| {
        value.map_or_else(|| "-".to_owned(), |v| format!("{v:.1} {unit}"))
    };
    let online = devices
        .iter()
        .filter(|d| d.status == DeviceStatus::Online)
        .count();
    let coordinates = match (plant.latitude, plant.longitude) {
        (Some(lat), Some(lon)) => format!("{lat:.4}, {lon:.4}"),
        _ => "-".to_owned(),
    };

    vec![
        Fact {
            label: "ID",
            value: plant.id.clone(),
        },
        Fact {
            label: "Location",
            value: text(plant.location.as_ref()),
        },
        Fact {
            label: "Coordinates",
            value: coordinates,
        },
        Fact {
            label: "Status",
            value: plant.status.as_str().to_owned(),
        },
        Fact {
            label: "Capacity",
            value: number(plant.capacity_kw, "kW"),
        },
        Fact {
            label: "Energy today",
            value: number(plant.today_energy_kwh, "kWh"),
        },
        Fact {
            label: "Specific yield",
            value: number(plant.specific_yield(), "kWh/kWp"),
        },
        Fact {
            label: "Devices online",
            value: format!("{online}/{}", devices.len()),
        },
    ]
}

/// `/plants/{id}`
pub async fn plant_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
    uri: Uri,
) -> Response {
    let plant = match state.source.plant(&id).await {
        Ok(plant) => plant,
        Err(e) => {
            warn!(plant_id = %id, error = %e, "Failed to load plant");
            return error_page("Plant", "plants", &uri, &e);
        }
    };

    let source = &state.source;
    let (devices, alerts, tasks) = tokio::join!(
        source.devices(),
        source.alerts(),
        source.maintenance_tasks()
    );
    let mut errors = Vec::new();
    let devices = collect(devices, "devices", &mut errors);
    let alerts = collect(alerts, "alerts", &mut errors);
    let tasks = collect(tasks, "maintenance tasks", &mut errors);

    let in_plant = |plant_key: Option<&str>| plant_key == Some(plant.id.as_str());
    let devices: Vec<&Device> = devices.iter().filter(|d| in_plant(d.plant_key())).collect();
    let alerts: Vec<&Alert> = alerts
        .iter()
        .filter(|a| in_plant(a.plant_key()) && !a.acknowledged)
        .collect();
    let tasks: Vec<&MaintenanceTask> = tasks
        .iter()
        .filter(|t| in_plant(t.plant_key()) && t.is_open())
        .collect();

    let plant_query = format!("?plant={}", urlencoding::encode(&plant.id));
    let sections = vec![
        Section {
            title: format!("Devices ({})", devices.len()),
            table: mini_table(
                &devices,
                &["name", "kind", "status", "current_power_kw", "last_seen"],
                "No devices registered",
            ),
            more_href: format!("{}{plant_query}", Device::PATH),
        },
        Section {
            title: format!("Active alerts ({})", alerts.len()),
            table: mini_table(
                &alerts,
                &["severity", "device_id", "message", "raised_at"],
                "No active alerts",
            ),
            more_href: format!("{}{plant_query}&status=active", Alert::PATH),
        },
        Section {
            title: format!("Open maintenance ({})", tasks.len()),
            table: mini_table(
                &tasks,
                &["title", "priority", "status", "assignee", "due_date"],
                "No open tasks",
            ),
            more_href: format!("{}{plant_query}", MaintenanceTask::PATH),
        },
    ];

    let template = PlantTemplate {
        layout: Layout::new(plant.display_name(), "plants"),
        retry_href: uri.to_string(),
        plant_id: plant.id.clone(),
        plant_name: plant.display_name().to_owned(),
        facts: plant_facts(&plant, &devices),
        sections,
        errors,
    };
    render(&template, page_status(&template.errors))
}

/// Outcome of a scheduler form post, carried back through the redirect.
#[derive(Debug, Default, Deserialize)]
pub struct SchedulerQuery {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `/scheduler`
pub async fn scheduler(
    State(state): State<AppState>,
    Query(query): Query<SchedulerQuery>,
    uri: Uri,
) -> Response {
    let (running, jobs, errors) = match state.source.scheduler_status().await {
        Ok(status) => (
            status.running,
            status.jobs.iter().map(JobRow::from).collect(),
            Vec::new(),
        ),
        Err(e) => {
            error!(error = %e, "Failed to load scheduler status");
            (false, Vec::new(), vec![format!("Failed to load scheduler status: {e}")])
        }
    };

    let template = SchedulerTemplate {
        layout: Layout::new("Scheduler", "scheduler"),
        retry_href: uri.path().to_owned(),
        running,
        jobs,
        message: query.msg.unwrap_or_default(),
        form_error: query.error.unwrap_or_default(),
        errors,
    };
    render(&template, page_status(&template.errors))
}

fn back_to_scheduler(key: &str, text: &str) -> Redirect {
    Redirect::to(&format!("/scheduler?{key}={}", urlencoding::encode(text)))
}

/// Fields of the "new job" form. An empty plant field means no plant.
#[derive(Debug, Deserialize)]
pub struct JobForm {
    pub name: String,
    pub job_type: String,
    pub cron: String,
    #[serde(default)]
    pub plant_id: Option<String>,
}

impl From<JobForm> for NewJob {
    fn from(form: JobForm) -> Self {
        Self {
            name: form.name.trim().to_owned(),
            job_type: form.job_type.trim().to_owned(),
            cron: form.cron.trim().to_owned(),
            plant_id: form
                .plant_id
                .map(|p| p.trim().to_owned())
                .filter(|p| !p.is_empty()),
        }
    }
}

/// `POST /scheduler/jobs`
pub async fn create_job_form(State(state): State<AppState>, Form(form): Form<JobForm>) -> Redirect {
    let job = NewJob::from(form);
    let name = job.name.clone();
    match state.source.create_job(job).await {
        Ok(()) => {
            info!(job = %name, "Job created");
            back_to_scheduler("msg", &format!("Job '{name}' created"))
        }
        Err(e) => {
            warn!(job = %name, error = %e, "Failed to create job");
            back_to_scheduler("error", &e.to_string())
        }
    }
}

/// `POST /scheduler/jobs/{id}/{action}`
pub async fn job_action_form(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Redirect {
    match run_job_action(&state, &id, &action).await {
        Ok(done) => back_to_scheduler("msg", &format!("Job '{id}' {done}")),
        Err(e) => back_to_scheduler("error", &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_form_blank_plant_becomes_none() {
        let job = NewJob::from(JobForm {
            name: " nightly ".to_owned(),
            job_type: "report".to_owned(),
            cron: "0 2 * * *".to_owned(),
            plant_id: Some("  ".to_owned()),
        });
        assert_eq!(job.name, "nightly");
        assert_eq!(job.plant_id, None);
    }

    #[test]
    fn test_overview_cards_count_troubled_devices() {
        let devices: Vec<Device> = serde_json::from_value(json!([
            {"id": "a", "name": "A", "status": "online"},
            {"id": "b", "name": "B", "status": "offline"},
            {"id": "c", "name": "C", "status": "fault"}
        ]))
        .expect("devices");
        let cards = overview_cards(&[], &devices, &[], &[]);
        let online = cards
            .iter()
            .find(|c| c.label == "Devices online")
            .expect("card");
        assert_eq!(online.value, "1/3");
        assert_eq!(online.detail, "2 offline or faulted");
        assert_eq!(online.class, "warn");
    }

    #[test]
    fn test_format_kw_switches_to_megawatts() {
        assert_eq!(format_kw(250.0), "250.0 kW");
        assert_eq!(format_kw(1500.0), "1.50 MW");
    }
}
