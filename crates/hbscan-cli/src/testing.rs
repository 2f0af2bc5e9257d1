//! Fixed in-memory gateway for app and rendering tests.

use async_trait::async_trait;
use hbscan_core::{
    City, District, Facility, FetchError, FetchGateway, MemoryStore, Navigator, Province,
    SearchQuery, Task, TaskFilter, TaskKind, TaskStatus,
};
use std::sync::Arc;

use crate::app::App;

/// One province, one city, one district holding 25 hospitals.
pub struct FakeGateway;

fn hospitals() -> Vec<Facility> {
    (1..=25)
        .map(|n| Facility {
            id: n,
            name: format!("第{}人民医院", n),
            grade: "三甲".to_string(),
            address: format!("天河路 {} 号", n),
            district_id: 100,
            ..Facility::default()
        })
        .collect()
}

#[async_trait]
impl FetchGateway for FakeGateway {
    async fn list_provinces(&self) -> Result<Vec<Province>, FetchError> {
        Ok(vec![Province {
            id: 1,
            name: "广东省".to_string(),
            code: "44".to_string(),
        }])
    }

    async fn list_cities(&self, _province_name: &str) -> Result<Vec<City>, FetchError> {
        Ok(vec![City {
            id: 10,
            name: "广州市".to_string(),
            province_id: 1,
        }])
    }

    async fn list_districts(&self, _city_name: &str) -> Result<Vec<District>, FetchError> {
        Ok(vec![District {
            id: 100,
            name: "天河区".to_string(),
            city_id: 10,
        }])
    }

    async fn list_facilities(&self, _district_name: &str) -> Result<Vec<Facility>, FetchError> {
        Ok(hospitals())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Facility>, FetchError> {
        let text = query.text.trim().to_string();
        Ok(hospitals()
            .into_iter()
            .filter(|f| f.name.contains(&text))
            .collect())
    }

    async fn delete_facility(&self, _id: i64) -> Result<(), FetchError> {
        Err(FetchError::new("delete hospital", "read-only fixture"))
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, FetchError> {
        let tasks = vec![
            Task {
                task_id: "t-1".to_string(),
                kind: TaskKind::Province,
                status: TaskStatus::Running,
                progress: "12/40".to_string(),
                created_at: "2024-05-01T08:00:00".to_string(),
                updated_at: "2024-05-01T08:30:00+08:00".to_string(),
                error: None,
            },
            Task {
                task_id: "t-2".to_string(),
                kind: TaskKind::Hospital,
                status: TaskStatus::Failed,
                progress: String::new(),
                created_at: String::new(),
                updated_at: String::new(),
                error: Some("timeout".to_string()),
            },
        ];
        Ok(tasks.into_iter().filter(|t| filter.matches(t.status)).collect())
    }

    async fn refresh_all(&self) -> Result<String, FetchError> {
        Ok("scan-1".to_string())
    }
}

/// App started against the fake gateway, showing the province list.
pub async fn started_app() -> App {
    let navigator = Navigator::mount(Arc::new(FakeGateway), Arc::new(MemoryStore::new()));
    let mut app = App::new(navigator);
    app.start().await;
    app
}
