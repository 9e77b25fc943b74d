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

//! PVMon dashboard server: HTML pages, CSV exports and a JSON API over a
//! remote monitoring backend or a fixture file.

pub mod api;
pub mod config;
pub mod export;
pub mod fixture;
pub mod iv;
pub mod pages;
pub mod routes;
pub mod source;
pub mod sse;
pub mod state;
pub mod table;

pub use config::ServerConfig;
pub use routes::router;
pub use state::AppState;
