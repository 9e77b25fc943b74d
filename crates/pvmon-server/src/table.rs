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

//! View model shared by every filterable table page and its CSV export.

use std::collections::BTreeMap;

use pvmon_core::{ColumnKind, ListFilter, ListView, Listable, SortDirection};
use pvmon_types::{
    Alert, AlertSeverity, Device, DeviceKind, DeviceStatus, MaintenanceTask, Plant, PlantStatus,
    TaskPriority, TaskStatus,
};
use serde::Deserialize;

/// Upper bound for a user-supplied page size.
pub const MAX_PAGE_SIZE: usize = 200;

/// Page links shown on either side of the current page.
const PAGER_WINDOW: usize = 2;

/// Columns rendered as coloured badges.
const BADGE_COLUMNS: [&str; 4] = ["status", "severity", "priority", "state"];

/// Per-record-type metadata for table pages.
pub trait TableRecord: Listable + Send + Sync + 'static {
    const TITLE: &'static str;
    /// Route of the HTML table; the CSV export lives at `{PATH}/export.csv`.
    const PATH: &'static str;
    const EXPORT_PREFIX: &'static str;
    /// Label of the kind facet, `None` when the record has none.
    const KIND_LABEL: Option<&'static str>;
    const HAS_PLANT_FILTER: bool = true;

    fn status_options() -> Vec<&'static str>;

    fn kind_options() -> Vec<&'static str> {
        Vec::new()
    }

    /// `(id, label)` of the plant this record belongs to.
    fn plant_option(&self) -> Option<(String, String)>;

    /// Link target for a cell, if the column should link somewhere.
    fn link(&self, _column: &str) -> Option<String> {
        None
    }
}

impl TableRecord for Device {
    const TITLE: &'static str = "Devices";
    const PATH: &'static str = "/devices";
    const EXPORT_PREFIX: &'static str = "devices";
    const KIND_LABEL: Option<&'static str> = Some("Type");

    fn status_options() -> Vec<&'static str> {
        DeviceStatus::ALL.iter().map(|s| s.as_str()).collect()
    }

    fn kind_options() -> Vec<&'static str> {
        DeviceKind::ALL.iter().map(|k| k.as_str()).collect()
    }

    fn plant_option(&self) -> Option<(String, String)> {
        let id = self.plant_id.clone()?;
        let label = self.plant_name.clone().unwrap_or_else(|| id.clone());
        Some((id, label))
    }

    fn link(&self, column: &str) -> Option<String> {
        match column {
            "plant" => self.plant_id.as_deref().map(plant_href),
            _ => None,
        }
    }
}

impl TableRecord for Alert {
    const TITLE: &'static str = "Alerts";
    const PATH: &'static str = "/alerts";
    const EXPORT_PREFIX: &'static str = "alerts";
    const KIND_LABEL: Option<&'static str> = Some("Severity");

    fn status_options() -> Vec<&'static str> {
        vec!["active", "acknowledged"]
    }

    fn kind_options() -> Vec<&'static str> {
        AlertSeverity::ALL.iter().map(|s| s.as_str()).collect()
    }

    fn plant_option(&self) -> Option<(String, String)> {
        self.plant_id.clone().map(|id| (id.clone(), id))
    }

    fn link(&self, column: &str) -> Option<String> {
        match column {
            "plant_id" => self.plant_id.as_deref().map(plant_href),
            _ => None,
        }
    }
}

impl TableRecord for MaintenanceTask {
    const TITLE: &'static str = "Maintenance";
    const PATH: &'static str = "/maintenance";
    const EXPORT_PREFIX: &'static str = "maintenance-tasks";
    const KIND_LABEL: Option<&'static str> = Some("Priority");

    fn status_options() -> Vec<&'static str> {
        TaskStatus::ALL.iter().map(|s| s.as_str()).collect()
    }

    fn kind_options() -> Vec<&'static str> {
        TaskPriority::ALL.iter().map(|p| p.as_str()).collect()
    }

    fn plant_option(&self) -> Option<(String, String)> {
        self.plant_id.clone().map(|id| (id.clone(), id))
    }

    fn link(&self, column: &str) -> Option<String> {
        match column {
            "plant_id" => self.plant_id.as_deref().map(plant_href),
            _ => None,
        }
    }
}

impl TableRecord for Plant {
    const TITLE: &'static str = "Plants";
    const PATH: &'static str = "/plants";
    const EXPORT_PREFIX: &'static str = "plants";
    const KIND_LABEL: Option<&'static str> = None;
    const HAS_PLANT_FILTER: bool = false;

    fn status_options() -> Vec<&'static str> {
        PlantStatus::ALL.iter().map(|s| s.as_str()).collect()
    }

    fn plant_option(&self) -> Option<(String, String)> {
        None
    }

    fn link(&self, column: &str) -> Option<String> {
        match column {
            "id" | "name" => Some(plant_href(&self.id)),
            _ => None,
        }
    }
}

#[must_use]
pub fn plant_href(id: &str) -> String {
    format!("/plants/{}", urlencoding::encode(id))
}

/// `in_progress` -> `In progress`
#[must_use]
pub fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

/// Query parameters accepted by table pages and CSV exports.
///
/// Numbers arrive as strings so that an empty form field never turns into a
/// 400 response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TableQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub plant: Option<String>,
    #[serde(default, alias = "search")]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub page_size: Option<String>,
    /// Header click: toggles direction on the current column, or starts a
    /// new ascending sort.
    #[serde(default)]
    pub toggle: Option<String>,
}

impl TableQuery {
    #[must_use]
    pub fn filter(&self) -> ListFilter {
        ListFilter {
            status: non_blank(self.status.as_ref()).map(ToOwned::to_owned),
            kind: non_blank(self.kind.as_ref()).map(ToOwned::to_owned),
            plant: non_blank(self.plant.as_ref()).map(ToOwned::to_owned),
            search: non_blank(self.q.as_ref()).map(ToOwned::to_owned),
        }
    }

    fn direction(&self) -> SortDirection {
        match non_blank(self.dir.as_ref()).map(str::to_ascii_lowercase).as_deref() {
            Some("desc" | "descending") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    fn page(&self) -> usize {
        non_blank(self.page.as_ref())
            .and_then(|p| p.parse().ok())
            .unwrap_or(1)
    }

    fn page_size(&self) -> Option<usize> {
        non_blank(self.page_size.as_ref())
            .and_then(|p| p.parse::<usize>().ok())
            .map(|p| p.clamp(1, MAX_PAGE_SIZE))
    }

    /// Applies filter, sort, page size and page, in that order, to a fresh
    /// view over `items`.
    #[must_use]
    pub fn build_view<T: Listable>(&self, items: Vec<T>, default_page_size: usize) -> ListView<T> {
        let mut view = ListView::new(items).with_page_size(default_page_size);
        view.set_filter(self.filter());
        if let Some(size) = self.page_size() {
            view.set_page_size(size);
        }
        if let Some(sort) = non_blank(self.sort.as_ref()) {
            view.set_sort(sort, self.direction());
        }
        if let Some(column) = non_blank(self.toggle.as_ref()) {
            view.sort_by(column);
        }
        view.set_page(self.page());
        view
    }
}

/// Builds `path?k=v&...` with encoded values.
#[derive(Debug, Default)]
struct QueryBuilder {
    pairs: Vec<(&'static str, String)>,
}

impl QueryBuilder {
    fn push(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.pairs.push((key, value.into()));
        self
    }

    fn href(&self, path: &str) -> String {
        if self.pairs.is_empty() {
            return path.to_owned();
        }
        let query: Vec<String> = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect();
        format!("{path}?{}", query.join("&"))
    }
}

#[derive(Debug, Clone)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone)]
pub struct HeaderCell {
    pub label: &'static str,
    pub href: String,
    /// Arrow for the sorted column, empty otherwise.
    pub indicator: &'static str,
    pub numeric: bool,
}

#[derive(Debug, Clone)]
pub struct BodyCell {
    pub text: String,
    /// Empty when the cell is not a link.
    pub href: String,
    pub class: String,
}

#[derive(Debug, Clone)]
pub struct PageLink {
    pub label: String,
    pub href: String,
    pub current: bool,
    /// Placeholder for skipped pages.
    pub gap: bool,
}

/// Rendered state of one table page.
#[derive(Debug, Clone)]
pub struct TableModel {
    pub title: &'static str,
    pub path: &'static str,
    pub export_href: String,
    pub headers: Vec<HeaderCell>,
    pub rows: Vec<Vec<BodyCell>>,
    pub status_options: Vec<FilterOption>,
    pub kind_label: &'static str,
    pub kind_options: Vec<FilterOption>,
    pub plant_options: Vec<FilterOption>,
    pub search: String,
    pub sort: String,
    pub dir: String,
    pub page_size: usize,
    pub summary: String,
    pub pages: Vec<PageLink>,
    pub prev_href: String,
    pub next_href: String,
}

fn options(values: Vec<&'static str>, selected: Option<&str>) -> Vec<FilterOption> {
    values
        .into_iter()
        .map(|value| FilterOption {
            value: value.to_owned(),
            label: humanize(value),
            selected: selected.is_some_and(|s| s.eq_ignore_ascii_case(value)),
        })
        .collect()
}

/// One cell, with badge class and link applied.
pub fn body_cell<T: TableRecord>(record: &T, key: &str, kind: ColumnKind) -> BodyCell {
    let value = record.value(key);
    let text = value.display();
    let class = if BADGE_COLUMNS.contains(&key) && !text.is_empty() {
        format!("badge badge-{text}")
    } else if matches!(kind, ColumnKind::Number) {
        "num".to_owned()
    } else {
        String::new()
    };
    BodyCell {
        href: record.link(key).unwrap_or_default(),
        text,
        class,
    }
}

/// Page numbers to show: all of them when few, otherwise first, last and a
/// window around the current page. `None` marks a gap.
fn pager_numbers(current: usize, total: usize) -> Vec<Option<usize>> {
    if total <= 2 * PAGER_WINDOW + 5 {
        return (1..=total).map(Some).collect();
    }
    let start = current.saturating_sub(PAGER_WINDOW).max(2);
    let end = (current + PAGER_WINDOW).min(total - 1);

    let mut numbers = vec![Some(1)];
    if start > 2 {
        numbers.push(None);
    }
    numbers.extend((start..=end).map(Some));
    if end < total - 1 {
        numbers.push(None);
    }
    numbers.push(Some(total));
    numbers
}

#[must_use]
pub fn build_table<T: TableRecord>(view: &ListView<T>, default_page_size: usize) -> TableModel {
    let filter = view.filter();
    let sort = view.sort();

    // Parameters that survive every link on the page
    let mut base = QueryBuilder::default();
    for (key, value) in [
        ("status", &filter.status),
        ("kind", &filter.kind),
        ("plant", &filter.plant),
        ("q", &filter.search),
    ] {
        if let Some(value) = value {
            base.push(key, value.clone());
        }
    }
    if view.page_size() != default_page_size {
        base.push("page_size", view.page_size().to_string());
    }

    let mut sorted = QueryBuilder {
        pairs: base.pairs.clone(),
    };
    if let Some(state) = sort {
        sorted
            .push("sort", state.column.key)
            .push("dir", state.direction.as_str());
    }

    let headers = T::columns()
        .iter()
        .map(|column| {
            let mut link = QueryBuilder {
                pairs: sorted.pairs.clone(),
            };
            link.push("toggle", column.key);
            let indicator = match sort {
                Some(s) if s.column.key == column.key => match s.direction {
                    SortDirection::Asc => "▲",
                    SortDirection::Desc => "▼",
                },
                _ => "",
            };
            HeaderCell {
                label: column.label,
                href: link.href(T::PATH),
                indicator,
                numeric: matches!(column.kind, ColumnKind::Number),
            }
        })
        .collect();

    let page = view.page();
    let rows = page
        .items
        .iter()
        .map(|record| {
            T::columns()
                .iter()
                .map(|column| body_cell(*record, column.key, column.kind))
                .collect()
        })
        .collect();

    let page_href = |number: usize| {
        let mut link = QueryBuilder {
            pairs: sorted.pairs.clone(),
        };
        if number > 1 {
            link.push("page", number.to_string());
        }
        link.href(T::PATH)
    };

    let pages = pager_numbers(page.number, page.total_pages)
        .into_iter()
        .map(|number| match number {
            Some(n) => PageLink {
                label: n.to_string(),
                href: page_href(n),
                current: n == page.number,
                gap: false,
            },
            None => PageLink {
                label: "…".to_owned(),
                href: String::new(),
                current: false,
                gap: true,
            },
        })
        .collect();

    let mut plants: BTreeMap<String, String> = BTreeMap::new();
    if T::HAS_PLANT_FILTER {
        for (id, label) in view.items().iter().filter_map(T::plant_option) {
            plants.entry(id).or_insert(label);
        }
    }
    let plant_options = plants
        .into_iter()
        .map(|(id, label)| FilterOption {
            selected: filter.plant.as_deref() == Some(id.as_str()),
            value: id,
            label,
        })
        .collect();

    let summary = if page.total_items == 0 {
        "No matching records".to_owned()
    } else {
        format!(
            "Showing {}–{} of {} (page {} of {})",
            page.first_row(),
            page.last_row(),
            page.total_items,
            page.number,
            page.total_pages
        )
    };

    TableModel {
        title: T::TITLE,
        path: T::PATH,
        export_href: sorted.href(&format!("{}/export.csv", T::PATH)),
        headers,
        rows,
        status_options: options(T::status_options(), filter.status.as_deref()),
        kind_label: T::KIND_LABEL.unwrap_or_default(),
        kind_options: options(T::kind_options(), filter.kind.as_deref()),
        plant_options,
        search: filter.search.clone().unwrap_or_default(),
        sort: sort.map(|s| s.column.key.to_owned()).unwrap_or_default(),
        dir: sort.map(|s| s.direction.as_str().to_owned()).unwrap_or_default(),
        page_size: view.page_size(),
        summary,
        prev_href: if page.has_previous() {
            page_href(page.number - 1)
        } else {
            String::new()
        },
        next_href: if page.has_next() {
            page_href(page.number + 1)
        } else {
            String::new()
        },
        pages,
    }
}
