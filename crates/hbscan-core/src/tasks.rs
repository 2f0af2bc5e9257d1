//! Crawl task board: the task list beside the directory, and nationwide rescans.

use crate::error::{FetchError, NavError, Resolution};
use crate::gateway::FetchGateway;
use crate::models::{Task, TaskFilter, TaskKind, TaskStatus};

/// Permission to load one page of tasks.
#[derive(Debug)]
#[must_use = "a task refresh does nothing until it is fetched and applied"]
pub struct TaskTicket {
    token: u64,
    filter: TaskFilter,
}

#[derive(Debug)]
pub struct TaskResponse {
    token: u64,
    result: Result<Vec<Task>, FetchError>,
}

impl TaskTicket {
    pub async fn fetch(self, gateway: &dyn FetchGateway) -> TaskResponse {
        TaskResponse {
            token: self.token,
            result: gateway.list_tasks(self.filter).await,
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskBoard {
    filter: TaskFilter,
    tasks: Vec<Task>,
    last_error: Option<FetchError>,
    issued: u64,
    pending: Option<u64>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> TaskFilter {
        self.filter
    }

    /// Loaded tasks that belong on the current tab.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.filter.matches(task.status))
            .collect()
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Switch tabs. The task list is stale until the next refresh.
    pub fn set_filter(&mut self, filter: TaskFilter) {
        if self.filter != filter {
            self.filter = filter;
            self.pending = None;
        }
    }

    pub fn begin_refresh(&mut self) -> TaskTicket {
        self.issued += 1;
        self.pending = Some(self.issued);
        TaskTicket {
            token: self.issued,
            filter: self.filter,
        }
    }

    pub fn apply(&mut self, response: TaskResponse) -> Resolution {
        if self.pending != Some(response.token) {
            tracing::debug!("Dropping stale task list {}", response.token);
            return Resolution::Superseded;
        }
        self.pending = None;
        match response.result {
            Ok(tasks) => {
                tracing::debug!("Loaded {} {} tasks", tasks.len(), self.filter.as_param());
                self.tasks = tasks;
                self.last_error = None;
                Resolution::Applied
            }
            Err(e) => {
                tracing::warn!("{}", e);
                self.last_error = Some(e);
                Resolution::Failed
            }
        }
    }

    pub async fn refresh(&mut self, gateway: &dyn FetchGateway) -> Resolution {
        let ticket = self.begin_refresh();
        let response = ticket.fetch(gateway).await;
        self.apply(response)
    }

    /// Ask the service for a nationwide rescan and list it as pending right away.
    pub async fn start_nationwide_scan(
        &mut self,
        gateway: &dyn FetchGateway,
    ) -> Result<String, NavError> {
        let task_id = gateway.refresh_all().await?;
        tracing::info!("Started nationwide scan {}", task_id);

        let now = chrono::Utc::now().to_rfc3339();
        self.tasks.insert(
            0,
            Task {
                task_id: task_id.clone(),
                kind: TaskKind::Nationwide,
                status: TaskStatus::Pending,
                progress: "queued".to_string(),
                created_at: now.clone(),
                updated_at: now,
                error: None,
            },
        );
        self.set_filter(TaskFilter::Running);
        Ok(task_id)
    }
}
