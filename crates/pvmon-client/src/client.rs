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

use crate::cache::DeviceCache;
use crate::errors::{ClientError, ClientResult};
use chrono::Utc;
use pvmon_core::parse_lenient_list;
use pvmon_types::{Alert, Device, MaintenanceTask, NewJob, Plant, SchedulerStatus};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Plant monitoring backend REST API client
#[derive(Debug, Clone)]
pub struct PvmonClient {
    base_url: String,
    token: Option<String>,
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
    cache: Option<DeviceCache>,
}

impl PvmonClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> ClientResult<Self> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let base_url: String = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ClientError::Config("backend base URL is empty".to_owned()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.filter(|t| !t.is_empty()),
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cache: None,
        })
    }

    /// Set custom retry configuration
    #[must_use]
    pub fn with_retry_config(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries.max(1);
        self.retry_delay = retry_delay;
        self
    }

    /// Serve `devices()` from this cache while it is fresh.
    #[must_use]
    pub fn with_cache(mut self, cache: DeviceCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Device list, from the cache when it is younger than its TTL.
    pub async fn devices(&self) -> ClientResult<Vec<Device>> {
        if let Some(cache) = &self.cache {
            match cache.load_fresh(Utc::now()).await {
                Ok(Some(devices)) => return Ok(devices),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to read device cache"),
            }
        }

        let devices = self.fetch_devices().await?;
        self.store_devices(&devices).await;
        Ok(devices)
    }

    /// Overwrites the cached device list, if a cache is configured. Write
    /// failures are logged and otherwise ignored.
    pub async fn store_devices(&self, devices: &[Device]) {
        if let Some(cache) = &self.cache
            && let Err(e) = cache.store(devices, Utc::now()).await
        {
            warn!(error = %e, "Failed to write device cache");
        }
    }

    /// Device list straight from the backend, bypassing the cache.
    pub async fn fetch_devices(&self) -> ClientResult<Vec<Device>> {
        self.get_list("/api/devices").await
    }

    pub async fn maintenance_tasks(&self) -> ClientResult<Vec<MaintenanceTask>> {
        self.get_list("/api/operations/maintenance-tasks").await
    }

    pub async fn alerts(&self) -> ClientResult<Vec<Alert>> {
        self.get_list("/api/alerts").await
    }

    pub async fn plants(&self) -> ClientResult<Vec<Plant>> {
        self.get_list("/api/plants").await
    }

    pub async fn plant(&self, id: &str) -> ClientResult<Plant> {
        let path = format!("/api/plants/{}", urlencoding::encode(id));
        let response = self.send(Method::GET, &path, None).await?;
        Ok(response.json::<Plant>().await?)
    }

    pub async fn scheduler_status(&self) -> ClientResult<SchedulerStatus> {
        let response = self
            .send(Method::GET, "/api/scheduler/status", None)
            .await?;
        Ok(response.json::<SchedulerStatus>().await?)
    }

    pub async fn create_job(&self, job: &NewJob) -> ClientResult<()> {
        job.validate()
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let body = serde_json::to_value(job)?;
        self.send(Method::POST, "/api/scheduler/jobs", Some(&body))
            .await?;
        info!(name = %job.name, job_type = %job.job_type, "Created scheduler job");
        Ok(())
    }

    pub async fn pause_job(&self, id: &str) -> ClientResult<()> {
        self.job_action(Method::POST, "/api/scheduler/jobs/{id}/pause", id)
            .await
    }

    pub async fn resume_job(&self, id: &str) -> ClientResult<()> {
        self.job_action(Method::POST, "/api/scheduler/jobs/{id}/resume", id)
            .await
    }

    pub async fn delete_job(&self, id: &str) -> ClientResult<()> {
        self.job_action(Method::DELETE, "/api/scheduler/jobs/{id}", id)
            .await
    }

    pub async fn run_job_now(&self, id: &str) -> ClientResult<()> {
        self.job_action(Method::POST, "/api/scheduler/run-now/{id}", id)
            .await
    }

    async fn job_action(&self, method: Method, template: &str, id: &str) -> ClientResult<()> {
        if id.trim().is_empty() {
            return Err(ClientError::InvalidRequest("job id is empty".to_owned()));
        }
        let path = template.replace("{id}", &urlencoding::encode(id));
        self.send(method, &path, None).await?;
        info!(job = id, path = %path, "Scheduler job action succeeded");
        Ok(())
    }

    /// GETs a list endpoint and parses it leniently. Bodies that are not
    /// valid JSON get a repair pass before giving up.
    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> ClientResult<Vec<T>> {
        let response = self.send(Method::GET, path, None).await?;
        let body = response.text().await?;

        let list = parse_lenient_list::<T>(&body).map_err(|e| {
            error!(path, error = %e, "Unrecoverable list response");
            ClientError::MalformedResponse(e.to_string())
        })?;

        if list.skipped > 0 {
            warn!(path, skipped = list.skipped, "Dropped unparseable records");
        }
        debug!(path, count = list.items.len(), repaired = list.repaired, "Fetched list");
        Ok(list.items)
    }

    /// Sends a request and maps error statuses. Only `GET` is retried;
    /// scheduler mutations go out exactly once.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> ClientResult<Response> {
        debug!(%method, path, "Backend request");
        let attempt = || async {
            let mut builder = self.request(method.clone(), path);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            let response = builder.send().await?;
            check_status(response, path).await
        };

        if method == Method::GET {
            self.retry_request(attempt).await
        } else {
            attempt().await.inspect_err(|e| {
                error!(%method, path, error = %e, "Backend request failed");
            })
        }
    }

    /// Retry a request with doubling delay. Only transport failures and 5xx
    /// responses are retried.
    async fn retry_request<F, Fut>(&self, mut request_fn: F) -> ClientResult<Response>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ClientResult<Response>>,
    {
        let mut attempts = 0;
        let mut delay = self.retry_delay;

        loop {
            attempts += 1;
            match request_fn().await {
                Ok(response) => return Ok(response),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempts >= self.max_retries => {
                    error!("Request failed after {} attempts: {}", attempts, e);
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                        attempts, self.max_retries, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
}

async fn check_status(response: Response, path: &str) -> ClientResult<Response> {
    match response.status() {
        status if status.is_success() => Ok(response),
        StatusCode::NOT_FOUND => Err(ClientError::NotFound(path.to_owned())),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            error!(path, "Backend rejected credentials");
            Err(ClientError::AuthenticationFailed)
        }
        status => {
            let message = response.text().await.unwrap_or_default();
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
