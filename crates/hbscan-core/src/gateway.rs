//! Fetch gateway: the remote directory service as seen by the navigator.

use crate::error::FetchError;
use crate::models::{City, District, Facility, Province, SearchQuery, Task, TaskFilter};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

/// Calls the navigator needs from the directory service.
#[async_trait]
pub trait FetchGateway: Send + Sync {
    async fn list_provinces(&self) -> Result<Vec<Province>, FetchError>;

    async fn list_cities(&self, province_name: &str) -> Result<Vec<City>, FetchError>;

    async fn list_districts(&self, city_name: &str) -> Result<Vec<District>, FetchError>;

    async fn list_facilities(&self, district_name: &str) -> Result<Vec<Facility>, FetchError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Facility>, FetchError>;

    /// Remove a facility record from the directory.
    async fn delete_facility(&self, id: i64) -> Result<(), FetchError>;

    /// First page of crawl tasks for a status tab.
    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, FetchError>;

    /// Start a nationwide rescan. Returns the new task id.
    async fn refresh_all(&self) -> Result<String, FetchError>;
}

/// Tasks requested per page.
const TASK_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Facility>,
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct DeleteResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskPage {
    #[serde(default)]
    items: Option<Vec<Task>>,
}

/// The task service wraps its page in `data` on some deployments.
#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    data: Option<TaskPage>,
    #[serde(default)]
    items: Option<Vec<Task>>,
}

impl TaskListResponse {
    fn into_items(self) -> Vec<Task> {
        self.data
            .and_then(|page| page.items)
            .or(self.items)
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    task_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Gateway over the directory service's HTTP API.
pub struct HttpGateway {
    client: reqwest::Client,
    base: Url,
    list_page_size: u32,
    search_limit: Option<u32>,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url` (e.g. `http://localhost:8000/api`).
    pub fn new(base_url: &str, list_page_size: u32, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .with_context(|| format!("Invalid API base URL: {}", base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry a path: {}", base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base,
            list_page_size,
            search_limit: None,
        })
    }

    /// Cap the number of results the service returns per search.
    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = Some(limit);
        self
    }

    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(path.split('/'));
        }
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url
    }

    fn list_url(&self, path: &str, filter: Option<(&str, &str)>) -> Url {
        let mut params = Vec::with_capacity(3);
        if let Some((key, value)) = filter {
            params.push((key, value.to_string()));
        }
        params.push(("page", "1".to_string()));
        params.push(("page_size", self.list_page_size.to_string()));
        self.endpoint(path, &params)
    }

    fn search_url(&self, query: &SearchQuery) -> Url {
        let mut params = Vec::new();
        let text = query.text.trim();
        if !text.is_empty() {
            params.push(("q", text.to_string()));
        }
        if !query.filters.levels.is_empty() {
            let levels: Vec<&str> = query.filters.levels.iter().map(String::as_str).collect();
            params.push(("levels", levels.join(",")));
        }
        if let Some(status) = query.filters.procurement_status.as_param() {
            params.push(("procurement_status", status.to_string()));
        }
        if let Some(limit) = self.search_limit {
            params.push(("limit", limit.to_string()));
        }
        self.endpoint("hospitals/search", &params)
    }

    fn tasks_url(&self, filter: TaskFilter) -> Url {
        self.endpoint(
            "tasks",
            &[
                ("status", filter.as_param().to_string()),
                ("page", "1".to_string()),
                ("page_size", TASK_PAGE_SIZE.to_string()),
            ],
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, operation: &str, url: Url) -> Result<T, FetchError> {
        tracing::debug!("GET {} ({})", url, operation);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::new(operation, e.to_string()))?;
        decode(operation, response).await
    }
}

async fn decode<T: DeserializeOwned>(
    operation: &str,
    response: reqwest::Response,
) -> Result<T, FetchError> {
    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.detail,
            Err(_) => format!("HTTP error! status: {}", status),
        };
        return Err(FetchError::new(operation, message));
    }
    response
        .json::<T>()
        .await
        .map_err(|e| FetchError::new(operation, format!("invalid response body: {}", e)))
}

#[async_trait]
impl FetchGateway for HttpGateway {
    async fn list_provinces(&self) -> Result<Vec<Province>, FetchError> {
        let url = self.list_url("provinces", None);
        let body: ListResponse<Province> = self.get_json("list provinces", url).await?;
        Ok(body.items)
    }

    async fn list_cities(&self, province_name: &str) -> Result<Vec<City>, FetchError> {
        let url = self.list_url("cities", Some(("province", province_name)));
        let body: ListResponse<City> = self.get_json("list cities", url).await?;
        Ok(body.items)
    }

    async fn list_districts(&self, city_name: &str) -> Result<Vec<District>, FetchError> {
        let url = self.list_url("districts", Some(("city", city_name)));
        let body: ListResponse<District> = self.get_json("list districts", url).await?;
        Ok(body.items)
    }

    async fn list_facilities(&self, district_name: &str) -> Result<Vec<Facility>, FetchError> {
        let url = self.list_url("hospitals", Some(("district", district_name)));
        let body: ListResponse<Facility> = self.get_json("list hospitals", url).await?;
        Ok(body.items)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Facility>, FetchError> {
        let url = self.search_url(query);
        let body: SearchResponse = self.get_json("search", url).await?;
        if let Some(count) = body.count {
            if count != body.results.len() {
                tracing::debug!(
                    "Search reported {} matches, returned {}",
                    count,
                    body.results.len()
                );
            }
        }
        Ok(body.results)
    }

    async fn delete_facility(&self, id: i64) -> Result<(), FetchError> {
        let operation = "delete hospital";
        let url = self.endpoint(&format!("hospital/{}", id), &[]);
        tracing::debug!("DELETE {}", url);
        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| FetchError::new(operation, e.to_string()))?;
        let body: DeleteResponse = decode(operation, response).await?;
        if body.success {
            Ok(())
        } else {
            Err(FetchError::new(
                operation,
                body.message.unwrap_or_else(|| "delete was rejected".to_string()),
            ))
        }
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, FetchError> {
        let url = self.tasks_url(filter);
        let body: TaskListResponse = self.get_json("list tasks", url).await?;
        Ok(body.into_items())
    }

    async fn refresh_all(&self) -> Result<String, FetchError> {
        let operation = "start nationwide scan";
        let url = self.endpoint("refresh/all", &[]);
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .send()
            .await
            .map_err(|e| FetchError::new(operation, e.to_string()))?;
        let body: RefreshResponse = decode(operation, response).await?;
        Ok(body.task_id)
    }
}
