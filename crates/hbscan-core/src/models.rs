//! Shared data types for the directory.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Facility grades known to the directory service, as `(value, label)`.
pub const FACILITY_LEVELS: &[(&str, &str)] = &[
    ("三甲", "三级甲等"),
    ("三乙", "三级乙等"),
    ("二甲", "二级甲等"),
    ("二乙", "二级乙等"),
    ("未定级", "未定级"),
    ("无", "无等级"),
];

/// Marker the service uses for "checked, and there is none".
const CONFIRMED_NONE: &str = "无";

/// A province (root level of the hierarchy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Province {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub code: String,
}

/// A city inside a province.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: i64,
    pub name: String,
    pub province_id: i64,
}

/// A district inside a city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: i64,
    pub name: String,
    pub city_id: i64,
}

/// A facility (hospital), the leaf of the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Facility {
    pub id: i64,
    pub name: String,
    /// Facility grade, e.g. `三甲`.
    #[serde(rename = "level", default, deserialize_with = "null_as_default")]
    pub grade: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub phone: String,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub base_procurement_link: Option<String>,
    #[serde(default)]
    pub beds_count: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_departments")]
    pub departments: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub district_id: i64,
}

/// Verification state of a facility link (website or procurement page).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// A link is recorded.
    Available,
    /// Nothing recorded yet.
    Unverified,
    /// Somebody checked and the facility has no such link.
    ConfirmedNone,
}

impl LinkStatus {
    fn of(link: Option<&str>) -> Self {
        match link.map(str::trim) {
            Some(CONFIRMED_NONE) => Self::ConfirmedNone,
            None | Some("") => Self::Unverified,
            Some(_) => Self::Available,
        }
    }
}

impl Facility {
    /// Status of the official website link.
    pub fn website_status(&self) -> LinkStatus {
        LinkStatus::of(self.website.as_deref())
    }

    /// Status of the base procurement link.
    pub fn procurement_status(&self) -> LinkStatus {
        LinkStatus::of(self.base_procurement_link.as_deref())
    }

    /// Case-insensitive substring match against name or address.
    pub fn matches_text(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.name.to_lowercase().contains(&needle) || self.address.to_lowercase().contains(&needle)
    }
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The service sends departments as an array, a comma separated string or null.
fn deserialize_departments<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(list)) => list,
        Some(Raw::Joined(joined)) => joined
            .split([',', '，'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        None => Vec::new(),
    })
}

/// A level of the hierarchy, in containment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level {
    #[default]
    Provinces,
    Cities,
    Districts,
    Facilities,
}

impl Level {
    pub fn label(self) -> &'static str {
        match self {
            Self::Provinces => "provinces",
            Self::Cities => "cities",
            Self::Districts => "districts",
            Self::Facilities => "facilities",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "provinces" => Some(Self::Provinces),
            "cities" => Some(Self::Cities),
            "districts" => Some(Self::Districts),
            "facilities" => Some(Self::Facilities),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Procurement link filter for searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcurementStatus {
    Verified,
    Unconfirmed,
    None,
    #[default]
    Unset,
}

impl ProcurementStatus {
    /// Query parameter value, `None` when the filter is not set.
    pub fn as_param(self) -> Option<&'static str> {
        match self {
            Self::Verified => Some("verified"),
            Self::Unconfirmed => Some("unconfirmed"),
            Self::None => Some("none"),
            Self::Unset => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "verified" => Some(Self::Verified),
            "unconfirmed" => Some(Self::Unconfirmed),
            "none" => Some(Self::None),
            "" => Some(Self::Unset),
            _ => None,
        }
    }
}

/// Filters applied on top of the search text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchFilters {
    /// Facility grades to include; empty means all grades.
    pub levels: BTreeSet<String>,
    pub procurement_status: ProcurementStatus,
}

impl SearchFilters {
    /// Number of filter groups that are active.
    pub fn active_count(&self) -> usize {
        usize::from(!self.levels.is_empty())
            + usize::from(self.procurement_status != ProcurementStatus::Unset)
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }
}

/// Search text plus filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchQuery {
    pub text: String,
    pub filters: SearchFilters,
}

impl SearchQuery {
    /// A plain text query without filters.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filters: SearchFilters::default(),
        }
    }

    /// Neither text nor filters: the service treats this as "match all".
    pub fn is_unscoped(&self) -> bool {
        self.text.trim().is_empty() && self.filters.is_empty()
    }
}

/// Full, unpaged result of one search call.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResultSet {
    pub query: SearchQuery,
    pub facilities: Vec<Facility>,
}

impl SearchResultSet {
    pub fn len(&self) -> usize {
        self.facilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facilities.is_empty()
    }

    pub fn find(&self, id: i64) -> Option<&Facility> {
        self.facilities.iter().find(|f| f.id == id)
    }
}

/// Kind of background crawl task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskKind {
    Hospital,
    Province,
    Nationwide,
}

impl TaskKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Hospital => "hospital scan",
            Self::Province => "province refresh",
            Self::Nationwide => "nationwide scan",
        }
    }
}

/// Lifecycle state of a crawl task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A crawl task as reported by the task service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress: String,
    /// Timestamps are passed through as the service formats them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub updated_at: String,
    #[serde(default)]
    pub error: Option<String>,
}

/// Status tab of the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskFilter {
    All,
    /// Pending and running tasks.
    #[default]
    Running,
    Completed,
    Failed,
}

impl TaskFilter {
    /// Value of the `status` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn matches(self, status: TaskStatus) -> bool {
        match self {
            Self::All => true,
            Self::Running => matches!(status, TaskStatus::Pending | TaskStatus::Running),
            Self::Completed => status == TaskStatus::Completed,
            Self::Failed => status == TaskStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_status_rules() {
        let mut facility = Facility::default();
        assert_eq!(facility.website_status(), LinkStatus::Unverified);

        facility.website = Some("  ".to_string());
        assert_eq!(facility.website_status(), LinkStatus::Unverified);

        facility.website = Some("无".to_string());
        assert_eq!(facility.website_status(), LinkStatus::ConfirmedNone);

        facility.base_procurement_link = Some("https://example.org/cg".to_string());
        assert_eq!(facility.procurement_status(), LinkStatus::Available);
    }

    #[test]
    fn test_departments_accept_all_shapes() {
        let list: Facility =
            serde_json::from_str(r#"{"id":1,"name":"A","departments":["内科","外科"]}"#).unwrap();
        assert_eq!(list.departments, vec!["内科", "外科"]);

        let joined: Facility =
            serde_json::from_str(r#"{"id":2,"name":"B","departments":"内科, 外科,"}"#).unwrap();
        assert_eq!(joined.departments, vec!["内科", "外科"]);

        let null: Facility =
            serde_json::from_str(r#"{"id":3,"name":"C","departments":null}"#).unwrap();
        assert!(null.departments.is_empty());
    }

    #[test]
    fn test_null_text_fields_accepted() {
        let facility: Facility = serde_json::from_str(
            r#"{"id":4,"name":"D","level":null,"address":null,"phone":null,"district_id":null}"#,
        )
        .unwrap();
        assert_eq!(facility.id, 4);
        assert!(facility.grade.is_empty());
        assert!(facility.address.is_empty());
        assert!(facility.phone.is_empty());
        assert_eq!(facility.district_id, 0);
    }

    #[test]
    fn test_matches_text_is_case_insensitive() {
        let facility = Facility {
            name: "People's Hospital".to_string(),
            address: "1 Zhongshan Road".to_string(),
            ..Facility::default()
        };
        assert!(facility.matches_text("PEOPLE"));
        assert!(facility.matches_text("zhongshan"));
        assert!(!facility.matches_text("clinic"));
    }

    #[test]
    fn test_task_decoding() {
        let task: Task = serde_json::from_str(
            r#"{"task_id":"t-1","type":"NATIONWIDE","status":"running","progress":null,"created_at":"2025-03-01T08:00:00"}"#,
        )
        .unwrap();
        assert_eq!(task.kind, TaskKind::Nationwide);
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.progress.is_empty());
        assert!(task.updated_at.is_empty());
        assert!(task.error.is_none());
    }

    #[test]
    fn test_running_tab_includes_pending() {
        assert!(TaskFilter::Running.matches(TaskStatus::Pending));
        assert!(TaskFilter::Running.matches(TaskStatus::Running));
        assert!(!TaskFilter::Running.matches(TaskStatus::Failed));
        assert!(TaskFilter::All.matches(TaskStatus::Completed));
        assert_eq!(TaskFilter::parse("failed"), Some(TaskFilter::Failed));
        assert_eq!(TaskFilter::parse("done"), None);
    }

    #[test]
    fn test_level_names() {
        assert_eq!(Level::parse("districts"), Some(Level::Districts));
        assert_eq!(Level::parse(Level::Facilities.label()), Some(Level::Facilities));
        assert_eq!(Level::parse("towns"), None);
    }

    #[test]
    fn test_unscoped_query() {
        assert!(SearchQuery::default().is_unscoped());
        assert!(!SearchQuery::text("a").is_unscoped());

        let mut filtered = SearchQuery::default();
        filtered.filters.procurement_status = ProcurementStatus::Verified;
        assert!(!filtered.is_unscoped());
        assert_eq!(filtered.filters.active_count(), 1);
    }
}
