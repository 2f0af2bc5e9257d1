//! In-memory gateway shared by unit tests.

use crate::error::FetchError;
use crate::gateway::FetchGateway;
use crate::models::{
    City, District, Facility, Province, SearchQuery, Task, TaskFilter, TaskKind, TaskStatus,
};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) fn province(id: i64, name: &str) -> Province {
    Province {
        id,
        name: name.to_string(),
        code: format!("{:02}", id),
    }
}

pub(crate) fn city(id: i64, name: &str, province_id: i64) -> City {
    City {
        id,
        name: name.to_string(),
        province_id,
    }
}

pub(crate) fn district(id: i64, name: &str, city_id: i64) -> District {
    District {
        id,
        name: name.to_string(),
        city_id,
    }
}

pub(crate) fn facility(id: i64, name: &str, address: &str, district_id: i64) -> Facility {
    Facility {
        id,
        name: name.to_string(),
        grade: "三甲".to_string(),
        address: address.to_string(),
        phone: "020-00000000".to_string(),
        district_id,
        ..Facility::default()
    }
}

pub(crate) fn task(task_id: &str, kind: TaskKind, status: TaskStatus) -> Task {
    Task {
        task_id: task_id.to_string(),
        kind,
        status,
        progress: String::new(),
        created_at: "2024-05-01T08:00:00".to_string(),
        updated_at: "2024-05-01T08:30:00".to_string(),
        error: None,
    }
}

/// Small fixed directory: two provinces, three cities, two districts.
pub(crate) struct ScriptedGateway {
    provinces: Vec<Province>,
    cities: Vec<City>,
    districts: Vec<District>,
    facilities: Mutex<Vec<Facility>>,
    tasks: Mutex<Vec<Task>>,
    failing: Mutex<HashSet<&'static str>>,
    calls: AtomicUsize,
}

impl ScriptedGateway {
    pub(crate) fn new() -> Self {
        Self {
            provinces: vec![province(1, "广东省"), province(2, "浙江省")],
            cities: vec![
                city(10, "广州市", 1),
                city(11, "深圳市", 1),
                city(20, "杭州市", 2),
            ],
            districts: vec![district(100, "天河区", 10), district(101, "越秀区", 10)],
            facilities: Mutex::new(vec![
                facility(1001, "天河区人民医院", "天河路 1 号", 100),
                facility(1002, "广州胸科医院", "横枝岗路 62 号", 100),
                facility(1003, "越秀区中医院", "人民北路 8 号", 101),
            ]),
            tasks: Mutex::new(vec![
                task("t-running", TaskKind::Province, TaskStatus::Running),
                task("t-done", TaskKind::Hospital, TaskStatus::Completed),
                task("t-failed", TaskKind::Nationwide, TaskStatus::Failed),
            ]),
            failing: Mutex::new(HashSet::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Make every later call to `operation` fail.
    pub(crate) fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub(crate) fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    /// Number of calls issued so far.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self, operation: &'static str) -> Result<(), FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(operation) {
            Err(FetchError::new(operation, "connection refused"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FetchGateway for ScriptedGateway {
    async fn list_provinces(&self) -> Result<Vec<Province>, FetchError> {
        self.enter("list provinces")?;
        Ok(self.provinces.clone())
    }

    async fn list_cities(&self, province_name: &str) -> Result<Vec<City>, FetchError> {
        self.enter("list cities")?;
        let Some(parent) = self.provinces.iter().find(|p| p.name == province_name) else {
            return Ok(Vec::new());
        };
        Ok(self
            .cities
            .iter()
            .filter(|c| c.province_id == parent.id)
            .cloned()
            .collect())
    }

    async fn list_districts(&self, city_name: &str) -> Result<Vec<District>, FetchError> {
        self.enter("list districts")?;
        let Some(parent) = self.cities.iter().find(|c| c.name == city_name) else {
            return Ok(Vec::new());
        };
        Ok(self
            .districts
            .iter()
            .filter(|d| d.city_id == parent.id)
            .cloned()
            .collect())
    }

    async fn list_facilities(&self, district_name: &str) -> Result<Vec<Facility>, FetchError> {
        self.enter("list hospitals")?;
        let Some(parent) = self.districts.iter().find(|d| d.name == district_name) else {
            return Ok(Vec::new());
        };
        Ok(self
            .facilities
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.district_id == parent.id)
            .cloned()
            .collect())
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Facility>, FetchError> {
        self.enter("search")?;
        let text = query.text.trim();
        Ok(self
            .facilities
            .lock()
            .unwrap()
            .iter()
            .filter(|f| text.is_empty() || f.name.contains(text))
            .filter(|f| query.filters.levels.is_empty() || query.filters.levels.contains(&f.grade))
            .cloned()
            .collect())
    }

    async fn delete_facility(&self, id: i64) -> Result<(), FetchError> {
        self.enter("delete hospital")?;
        let mut facilities = self.facilities.lock().unwrap();
        let before = facilities.len();
        facilities.retain(|f| f.id != id);
        if facilities.len() == before {
            return Err(FetchError::new("delete hospital", "医院不存在"));
        }
        Ok(())
    }

    async fn list_tasks(&self, filter: TaskFilter) -> Result<Vec<Task>, FetchError> {
        self.enter("list tasks")?;
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| filter.matches(t.status))
            .cloned()
            .collect())
    }

    async fn refresh_all(&self) -> Result<String, FetchError> {
        self.enter("start nationwide scan")?;
        let mut tasks = self.tasks.lock().unwrap();
        let task_id = format!("scan-{}", tasks.len() + 1);
        tasks.insert(0, task(&task_id, TaskKind::Nationwide, TaskStatus::Pending));
        Ok(task_id)
    }
}
