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

//! Filter, sort and paginate in-memory record collections.
//!
//! [`ListView`] is the state behind every table in the dashboard. It owns the
//! fetched collection and derives the visible page on demand, so the page
//! always equals the current filter and sort applied to the full set.

mod records;

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    /// Enumerations with a natural order (severity, priority).
    Ordinal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    #[must_use]
    pub const fn new(key: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self { key, label, kind }
    }
}

/// A single cell value, typed so sorting can compare it properly.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Missing,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Ordinal { rank: u8, label: &'static str },
}

impl FieldValue {
    #[must_use]
    pub fn text(value: Option<&str>) -> Self {
        value.map_or(Self::Missing, |v| Self::Text(v.to_owned()))
    }

    #[must_use]
    pub fn number(value: Option<f64>) -> Self {
        value.map_or(Self::Missing, Self::Number)
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Rendering shared by HTML tables and CSV export.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Missing => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => format_number(*n),
            Self::Date(d) => d.format("%Y-%m-%d").to_string(),
            Self::Timestamp(t) => t.format("%Y-%m-%d %H:%M").to_string(),
            Self::Ordinal { label, .. } => (*label).to_owned(),
        }
    }

    fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            (Self::Date(a), Self::Timestamp(b)) => a.cmp(&b.date_naive()),
            (Self::Timestamp(a), Self::Date(b)) => a.date_naive().cmp(b),
            (Self::Ordinal { rank: a, .. }, Self::Ordinal { rank: b, .. }) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            _ => self.display().to_lowercase().cmp(&other.display().to_lowercase()),
        }
    }
}

/// Up to two decimals, without trailing zeros.
fn format_number(n: f64) -> String {
    let s = format!("{n:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

/// A record that can be shown in a dashboard table.
pub trait Listable {
    /// Table columns, in display order.
    fn columns() -> &'static [Column];

    fn value(&self, key: &str) -> FieldValue;

    /// Value matched by the `status` filter.
    fn status_key(&self) -> Option<&str>;

    /// Value matched by the `type` filter.
    fn kind_key(&self) -> Option<&str>;

    /// Plant the record belongs to, matched by the `plant` filter.
    fn plant_key(&self) -> Option<&str>;

    /// Free-text fields searched by the search box.
    fn search_fields(&self) -> Vec<&str>;

    /// Stable identifier, used for row links and actions.
    fn row_id(&self) -> &str;
}

fn normalize_criterion(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

/// Filter criteria. Empty strings are treated like `None`, which is what an
/// untouched `<select>` submits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, alias = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub plant: Option<String>,
    #[serde(default, alias = "q")]
    pub search: Option<String>,
}

impl ListFilter {
    fn criterion(value: Option<&String>) -> Option<&str> {
        value.map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Self::criterion(self.status.as_ref()).is_none()
            && Self::criterion(self.kind.as_ref()).is_none()
            && Self::criterion(self.plant.as_ref()).is_none()
            && Self::criterion(self.search.as_ref()).is_none()
    }

    pub fn matches<T: Listable>(&self, item: &T) -> bool {
        let enum_match = |wanted: Option<&String>, actual: Option<&str>| {
            Self::criterion(wanted).is_none_or(|w| {
                actual.is_some_and(|a| normalize_criterion(a) == normalize_criterion(w))
            })
        };

        if !enum_match(self.status.as_ref(), item.status_key()) {
            return false;
        }
        if !enum_match(self.kind.as_ref(), item.kind_key()) {
            return false;
        }
        if let Some(plant) = Self::criterion(self.plant.as_ref())
            && item.plant_key() != Some(plant)
        {
            return false;
        }
        if let Some(needle) = Self::criterion(self.search.as_ref()) {
            let needle = needle.to_lowercase();
            return item
                .search_fields()
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ascending")]
    Asc,
    #[serde(alias = "descending")]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortState {
    pub column: Column,
    pub direction: SortDirection,
}

/// One page of a [`ListView`].
#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: Vec<&'a T>,
    /// 1-based, clamped into `1..=total_pages` (1 when there are no pages).
    pub number: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

impl<T> Page<'_, T> {
    #[must_use]
    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    /// 1-based index of the first row on this page, 0 for an empty page.
    #[must_use]
    pub fn first_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.number - 1) * self.page_size + 1
        }
    }

    #[must_use]
    pub fn last_row(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            self.first_row() + self.items.len() - 1
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListView<T> {
    items: Vec<T>,
    filter: ListFilter,
    sort: Option<SortState>,
    page: usize,
    page_size: usize,
}

impl<T: Listable> ListView<T> {
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            filter: ListFilter::default(),
            sort: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.set_page_size(page_size);
        self
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: ListFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    #[must_use]
    pub fn sort(&self) -> Option<SortState> {
        self.sort
    }

    /// Header-click behaviour: the current column toggles direction, a new
    /// column starts ascending. Returns `false` for unknown columns.
    pub fn sort_by(&mut self, key: &str) -> bool {
        let Some(column) = Self::column(key) else {
            return false;
        };
        let direction = match self.sort {
            Some(current) if current.column.key == column.key => current.direction.toggled(),
            _ => SortDirection::Asc,
        };
        self.sort = Some(SortState { column, direction });
        true
    }

    pub fn set_sort(&mut self, key: &str, direction: SortDirection) -> bool {
        let Some(column) = Self::column(key) else {
            return false;
        };
        self.sort = Some(SortState { column, direction });
        true
    }

    #[must_use]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
        self.page = 1;
    }

    pub fn set_page(&mut self, page: usize) {
        self.page = page.max(1);
    }

    fn column(key: &str) -> Option<Column> {
        T::columns().iter().copied().find(|c| c.key == key)
    }

    /// Every record passing the filter, in sort order.
    #[must_use]
    pub fn filtered(&self) -> Vec<&T> {
        let mut rows: Vec<&T> = self
            .items
            .iter()
            .filter(|item| self.filter.matches(*item))
            .collect();

        if let Some(SortState { column, direction }) = self.sort {
            // Stable: ties keep the order they were fetched in
            rows.sort_by(|a, b| {
                let (va, vb) = (a.value(column.key), b.value(column.key));
                match (va.is_missing(), vb.is_missing()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Greater,
                    (false, true) => Ordering::Less,
                    (false, false) => {
                        let ord = va.sort_cmp(&vb);
                        match direction {
                            SortDirection::Asc => ord,
                            SortDirection::Desc => ord.reverse(),
                        }
                    }
                }
            });
        }
        rows
    }

    #[must_use]
    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size)
    }

    #[must_use]
    pub fn page(&self) -> Page<'_, T> {
        let rows = self.filtered();
        let total_items = rows.len();
        let total_pages = total_items.div_ceil(self.page_size);
        let number = self.page.clamp(1, total_pages.max(1));
        let items = rows
            .into_iter()
            .skip((number - 1) * self.page_size)
            .take(self.page_size)
            .collect();

        Page {
            items,
            number,
            total_pages,
            total_items,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        id: String,
        status: &'static str,
        kind: &'static str,
        plant: &'static str,
        power: Option<f64>,
        name: String,
    }

    const COLUMNS: &[Column] = &[
        Column::new("id", "ID", ColumnKind::Text),
        Column::new("name", "Name", ColumnKind::Text),
        Column::new("power", "Power", ColumnKind::Number),
    ];

    impl Listable for Row {
        fn columns() -> &'static [Column] {
            COLUMNS
        }

        fn value(&self, key: &str) -> FieldValue {
            match key {
                "id" => FieldValue::Text(self.id.clone()),
                "name" => FieldValue::Text(self.name.clone()),
                "power" => FieldValue::number(self.power),
                _ => FieldValue::Missing,
            }
        }

        fn status_key(&self) -> Option<&str> {
            Some(self.status)
        }

        fn kind_key(&self) -> Option<&str> {
            Some(self.kind)
        }

        fn plant_key(&self) -> Option<&str> {
            Some(self.plant)
        }

        fn search_fields(&self) -> Vec<&str> {
            vec![self.id.as_str(), self.name.as_str()]
        }

        fn row_id(&self) -> &str {
            &self.id
        }
    }

    fn fleet(n: usize) -> Vec<Row> {
        (0..n)
            .map(|i| Row {
                id: format!("dev-{i:02}"),
                status: if i % 3 == 0 { "offline" } else { "online" },
                kind: if i % 2 == 0 { "inverter" } else { "meter" },
                plant: if i < 10 { "p1" } else { "p2" },
                power: (i != 4).then(|| f64::from(u8::try_from(i % 7).unwrap())),
                name: format!("Device {i}"),
            })
            .collect()
    }

    #[test]
    fn test_filter_then_paginate_keeps_relative_order() {
        let rows = fleet(25);
        let offline_ids: Vec<String> = rows
            .iter()
            .filter(|r| r.status == "offline")
            .map(|r| r.id.clone())
            .collect();

        let mut view = ListView::new(rows).with_page_size(10);
        view.set_filter(ListFilter {
            status: Some("offline".to_owned()),
            ..ListFilter::default()
        });

        let page = view.page();
        assert_eq!(page.total_items, offline_ids.len());
        assert_eq!(page.total_pages, offline_ids.len().div_ceil(10));
        let shown: Vec<&str> = page.items.iter().map(|r| r.id.as_str()).collect();
        let expected: Vec<&str> = offline_ids.iter().take(10).map(String::as_str).collect();
        assert_eq!(shown, expected);
    }

    #[test]
    fn test_sort_toggles_direction() {
        let mut view = ListView::new(fleet(5));
        assert!(view.sort_by("id"));
        assert_eq!(view.sort().map(|s| s.direction), Some(SortDirection::Asc));
        assert!(view.sort_by("id"));
        assert_eq!(view.sort().map(|s| s.direction), Some(SortDirection::Desc));
        assert!(view.sort_by("id"));
        assert_eq!(view.sort().map(|s| s.direction), Some(SortDirection::Asc));

        assert!(view.sort_by("power"));
        assert_eq!(view.sort().map(|s| s.direction), Some(SortDirection::Asc));
        assert!(!view.sort_by("nope"));
    }

    #[test]
    fn test_numeric_sort_is_type_aware_and_missing_last() {
        let mut view = ListView::new(fleet(12));
        view.set_sort("power", SortDirection::Desc);
        let rows = view.filtered();
        assert_eq!(rows.last().map(|r| r.id.as_str()), Some("dev-04"));
        let powers: Vec<f64> = rows.iter().filter_map(|r| r.power).collect();
        assert!(powers.windows(2).all(|w| w[0] >= w[1]));

        view.set_sort("power", SortDirection::Asc);
        assert_eq!(
            view.filtered().last().map(|r| r.id.as_str()),
            Some("dev-04")
        );
    }

    #[test]
    fn test_numeric_sort_does_not_compare_as_text() {
        let mut rows = fleet(3);
        rows[0].power = Some(10.0);
        rows[1].power = Some(9.0);
        rows[2].power = Some(100.0);
        let mut view = ListView::new(rows);
        view.set_sort("power", SortDirection::Asc);
        let order: Vec<f64> = view.filtered().iter().filter_map(|r| r.power).collect();
        assert_eq!(order, vec![9.0, 10.0, 100.0]);
    }

    #[test]
    fn test_stable_sort_keeps_fetch_order_for_ties() {
        let mut view = ListView::new(fleet(14));
        view.set_sort("power", SortDirection::Asc);
        let zeros: Vec<&str> = view
            .filtered()
            .iter()
            .filter(|r| r.power == Some(0.0))
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(zeros, vec!["dev-00", "dev-07"]);
    }

    #[test]
    fn test_search_and_combined_filters() {
        let mut view = ListView::new(fleet(25));
        view.set_filter(ListFilter {
            search: Some("DEVICE 2".to_owned()),
            ..ListFilter::default()
        });
        // "Device 2", "Device 20".."Device 24"
        assert_eq!(view.filtered().len(), 6);

        view.set_filter(ListFilter {
            kind: Some("meter".to_owned()),
            plant: Some("p2".to_owned()),
            ..ListFilter::default()
        });
        assert!(
            view.filtered()
                .iter()
                .all(|r| r.kind == "meter" && r.plant == "p2")
        );
    }

    #[test]
    fn test_blank_criteria_match_everything() {
        let filter = ListFilter {
            status: Some(String::new()),
            kind: Some("  ".to_owned()),
            ..ListFilter::default()
        };
        assert!(filter.is_empty());
        let mut view = ListView::new(fleet(7));
        view.set_filter(filter);
        assert_eq!(view.filtered().len(), 7);
    }

    #[test]
    fn test_page_clamping_and_bounds() {
        let mut view = ListView::new(fleet(25)).with_page_size(10);
        view.set_page(99);
        let page = view.page();
        assert_eq!(page.number, 3);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.first_row(), 21);
        assert_eq!(page.last_row(), 25);
        assert!(page.has_previous());
        assert!(!page.has_next());

        view.set_filter(ListFilter {
            status: Some("fault".to_owned()),
            ..ListFilter::default()
        });
        let empty = view.page();
        assert_eq!(empty.total_pages, 0);
        assert_eq!(empty.number, 1);
        assert_eq!(empty.first_row(), 0);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut view = ListView::new(fleet(25)).with_page_size(5);
        view.set_page(3);
        view.set_filter(ListFilter {
            status: Some("online".to_owned()),
            ..ListFilter::default()
        });
        assert_eq!(view.page().number, 1);
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(FieldValue::Number(4.5).display(), "4.5");
        assert_eq!(FieldValue::Number(10.0).display(), "10");
        assert_eq!(FieldValue::Number(1.234).display(), "1.23");
        assert_eq!(FieldValue::Number(-0.001).display(), "0");
    }
}
