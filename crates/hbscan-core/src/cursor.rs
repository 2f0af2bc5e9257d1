//! Hierarchy cursor: drill-down through province, city, district and facility lists.
//!
//! Descents are split into a ticket ([`HierarchyCursor::begin_descend`]), the
//! fetch ([`DescentTicket::fetch`]) and the apply step
//! ([`HierarchyCursor::apply`]). Only the most recently issued ticket may
//! change state; responses for older tickets are dropped when they arrive.
//! Selection and active level change only when a fetch succeeds.

use crate::error::{FetchError, NavError, Resolution};
use crate::gateway::FetchGateway;
use crate::models::{City, District, Facility, Level, Province};

/// Label of the breadcrumb root.
pub const ROOT_CRUMB_LABEL: &str = "National";

/// Currently selected node at each level.
///
/// Always prefix-consistent: a city is only set while a province is, a
/// district only while a city is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub province: Option<Province>,
    pub city: Option<City>,
    pub district: Option<District>,
}

impl Selection {
    /// Deepest list reachable with this selection.
    pub fn deepest_level(&self) -> Level {
        if self.district.is_some() {
            Level::Facilities
        } else if self.city.is_some() {
            Level::Districts
        } else if self.province.is_some() {
            Level::Cities
        } else {
            Level::Provinces
        }
    }

    /// Whether the list at `level` has its parent selected.
    pub fn can_show(&self, level: Level) -> bool {
        level <= self.deepest_level()
    }

    /// Unset every selection whose list is at or below `level`.
    fn clear_below(&mut self, level: Level) {
        if level <= Level::Provinces {
            self.province = None;
        }
        if level <= Level::Cities {
            self.city = None;
        }
        if level <= Level::Districts {
            self.district = None;
        }
    }

    pub(crate) fn is_prefix_consistent(&self) -> bool {
        (self.city.is_none() || self.province.is_some())
            && (self.district.is_none() || self.city.is_some())
    }
}

/// One breadcrumb entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crumb {
    pub label: String,
    /// List shown when the crumb is clicked; `None` for the innermost crumb.
    pub target: Option<Level>,
}

/// What a descent fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum DescendTarget {
    Provinces,
    Cities(Province),
    Districts(City),
    Facilities(District),
}

impl DescendTarget {
    pub fn level(&self) -> Level {
        match self {
            Self::Provinces => Level::Provinces,
            Self::Cities(_) => Level::Cities,
            Self::Districts(_) => Level::Districts,
            Self::Facilities(_) => Level::Facilities,
        }
    }
}

/// A fetched list together with the node it was fetched for.
#[derive(Debug, Clone)]
enum Listing {
    Provinces(Vec<Province>),
    Cities(Province, Vec<City>),
    Districts(City, Vec<District>),
    Facilities(District, Vec<Facility>),
}

/// Permission to fetch one level; see [`HierarchyCursor::begin_descend`].
#[derive(Debug)]
#[must_use = "a descent does nothing until it is fetched and applied"]
pub struct DescentTicket {
    token: u64,
    target: DescendTarget,
}

/// Result of a ticket's fetch, ready to be applied.
#[derive(Debug)]
pub struct DescentResponse {
    token: u64,
    result: Result<Listing, FetchError>,
}

impl DescentTicket {
    /// Issue the list call for this ticket.
    pub async fn fetch(self, gateway: &dyn FetchGateway) -> DescentResponse {
        let result = match self.target {
            DescendTarget::Provinces => gateway.list_provinces().await.map(Listing::Provinces),
            DescendTarget::Cities(province) => gateway
                .list_cities(&province.name)
                .await
                .map(|items| Listing::Cities(province, items)),
            DescendTarget::Districts(city) => gateway
                .list_districts(&city.name)
                .await
                .map(|items| Listing::Districts(city, items)),
            DescendTarget::Facilities(district) => gateway
                .list_facilities(&district.name)
                .await
                .map(|items| Listing::Facilities(district, items)),
        };
        DescentResponse {
            token: self.token,
            result,
        }
    }
}

/// Operations the navigator needs from the cursor around a detail view.
pub trait BrowseCapability {
    /// Show the deepest list the current selection reaches. No fetch.
    fn resume_last_list(&mut self) -> Level;

    /// Find a facility in the last fetched facility list.
    fn lookup_cached_facility(&self, id: i64) -> Result<&Facility, NavError>;
}

/// Selection, active level and the per-level list caches.
#[derive(Debug, Default)]
pub struct HierarchyCursor {
    selection: Selection,
    active: Level,
    provinces: Vec<Province>,
    cities: Vec<City>,
    districts: Vec<District>,
    facilities: Vec<Facility>,
    facility_filter: String,
    last_error: Option<FetchError>,
    issued: u64,
    pending: Option<u64>,
}

impl HierarchyCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn active_level(&self) -> Level {
        self.active
    }

    pub fn provinces(&self) -> &[Province] {
        &self.provinces
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn districts(&self) -> &[District] {
        &self.districts
    }

    /// Last fetched facility list, unfiltered.
    pub fn facilities(&self) -> &[Facility] {
        &self.facilities
    }

    /// Facility list with the name/address filter applied.
    pub fn visible_facilities(&self) -> Vec<&Facility> {
        let filter = self.facility_filter.trim();
        self.facilities
            .iter()
            .filter(|f| filter.is_empty() || f.matches_text(filter))
            .collect()
    }

    pub fn facility_filter(&self) -> &str {
        &self.facility_filter
    }

    /// Set the client-side facility filter. Never fetches.
    pub fn set_facility_filter(&mut self, filter: impl Into<String>) {
        self.facility_filter = filter.into();
    }

    /// Error from the last failed fetch, cleared by the next success.
    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Breadcrumb trail for the current selection.
    pub fn breadcrumb(&self) -> Vec<Crumb> {
        let mut crumbs = vec![Crumb {
            label: ROOT_CRUMB_LABEL.to_string(),
            target: Some(Level::Provinces),
        }];
        if let Some(province) = &self.selection.province {
            crumbs.push(Crumb {
                label: province.name.clone(),
                target: Some(Level::Cities),
            });
        }
        if let Some(city) = &self.selection.city {
            crumbs.push(Crumb {
                label: city.name.clone(),
                target: Some(Level::Districts),
            });
        }
        if let Some(district) = &self.selection.district {
            crumbs.push(Crumb {
                label: district.name.clone(),
                target: None,
            });
        }
        crumbs
    }

    /// Start a descent. Supersedes any descent still in flight.
    pub fn begin_descend(&mut self, target: DescendTarget) -> Result<DescentTicket, NavError> {
        let parent_selected = match &target {
            DescendTarget::Provinces | DescendTarget::Cities(_) => true,
            DescendTarget::Districts(city) => self
                .selection
                .province
                .as_ref()
                .is_some_and(|p| p.id == city.province_id),
            DescendTarget::Facilities(district) => self
                .selection
                .city
                .as_ref()
                .is_some_and(|c| c.id == district.city_id),
        };
        if !parent_selected {
            return Err(NavError::LevelSkipped {
                level: target.level(),
            });
        }

        self.issued += 1;
        if let Some(stale) = self.pending.replace(self.issued) {
            tracing::debug!("Descent {} superseded by {}", stale, self.issued);
        }
        tracing::debug!("Descent {} to {} started", self.issued, target.level());
        Ok(DescentTicket {
            token: self.issued,
            target,
        })
    }

    /// Apply a fetched list if its ticket is still the latest one.
    pub fn apply(&mut self, response: DescentResponse) -> Resolution {
        if self.pending != Some(response.token) {
            tracing::warn!("Dropping stale descent response {}", response.token);
            return Resolution::Superseded;
        }
        self.pending = None;

        let listing = match response.result {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("{}", e);
                self.last_error = Some(e);
                return Resolution::Failed;
            }
        };

        match listing {
            Listing::Provinces(items) => {
                self.provinces = items;
                self.selection.clear_below(Level::Provinces);
                self.active = Level::Provinces;
            }
            Listing::Cities(province, items) => {
                self.cities = items;
                self.selection.clear_below(Level::Cities);
                self.selection.province = Some(province);
                self.active = Level::Cities;
            }
            Listing::Districts(city, items) => {
                self.districts = items;
                self.selection.clear_below(Level::Districts);
                self.selection.city = Some(city);
                self.active = Level::Districts;
            }
            Listing::Facilities(district, items) => {
                self.facilities = items;
                self.facility_filter.clear();
                self.selection.district = Some(district);
                self.active = Level::Facilities;
            }
        }
        self.last_error = None;
        debug_assert!(self.selection.is_prefix_consistent());
        tracing::debug!("Showing {}", self.active);
        Resolution::Applied
    }

    async fn run(
        &mut self,
        gateway: &dyn FetchGateway,
        target: DescendTarget,
    ) -> Result<Resolution, NavError> {
        let ticket = self.begin_descend(target)?;
        let response = ticket.fetch(gateway).await;
        Ok(self.apply(response))
    }

    /// Fetch the root list.
    pub async fn load_provinces(&mut self, gateway: &dyn FetchGateway) -> Resolution {
        match self.run(gateway, DescendTarget::Provinces).await {
            Ok(resolution) => resolution,
            // The root has no parent to check.
            Err(_) => Resolution::Failed,
        }
    }

    pub async fn descend_to_city(
        &mut self,
        gateway: &dyn FetchGateway,
        province: Province,
    ) -> Result<Resolution, NavError> {
        self.run(gateway, DescendTarget::Cities(province)).await
    }

    pub async fn descend_to_district(
        &mut self,
        gateway: &dyn FetchGateway,
        city: City,
    ) -> Result<Resolution, NavError> {
        self.run(gateway, DescendTarget::Districts(city)).await
    }

    pub async fn descend_to_facilities(
        &mut self,
        gateway: &dyn FetchGateway,
        district: District,
    ) -> Result<Resolution, NavError> {
        self.run(gateway, DescendTarget::Facilities(district)).await
    }

    /// Re-fetch the facility list of the selected district.
    pub async fn refresh_current_level_list(
        &mut self,
        gateway: &dyn FetchGateway,
    ) -> Result<Resolution, NavError> {
        let Some(district) = self.selection.district.clone() else {
            return Err(NavError::LevelSkipped {
                level: Level::Facilities,
            });
        };
        self.run(gateway, DescendTarget::Facilities(district)).await
    }

    /// Breadcrumb click: show `level`, unsetting every selection inside it.
    pub fn ascend_to(&mut self, level: Level) -> Result<(), NavError> {
        if !self.selection.can_show(level) {
            return Err(NavError::LevelSkipped { level });
        }
        self.selection.clear_below(level);
        self.active = level;
        self.last_error = None;
        if let Some(stale) = self.pending.take() {
            tracing::debug!("Descent {} abandoned by ascent to {}", stale, level);
        }
        Ok(())
    }

    /// Switch the visible list without touching the selection.
    pub fn show_level(&mut self, level: Level) -> Result<(), NavError> {
        if !self.selection.can_show(level) {
            return Err(NavError::LevelSkipped { level });
        }
        self.active = level;
        Ok(())
    }
}

impl BrowseCapability for HierarchyCursor {
    fn resume_last_list(&mut self) -> Level {
        self.active = self.selection.deepest_level();
        self.active
    }

    fn lookup_cached_facility(&self, id: i64) -> Result<&Facility, NavError> {
        if self.active != Level::Facilities {
            return Err(NavError::NotFound { id });
        }
        self.facilities
            .iter()
            .find(|f| f.id == id)
            .ok_or(NavError::NotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{city, district, province, ScriptedGateway};

    async fn at_facilities(gateway: &ScriptedGateway) -> HierarchyCursor {
        let mut cursor = HierarchyCursor::new();
        assert_eq!(cursor.load_provinces(gateway).await, Resolution::Applied);
        let guangdong = cursor.provinces()[0].clone();
        cursor.descend_to_city(gateway, guangdong).await.unwrap();
        let guangzhou = cursor.cities()[0].clone();
        cursor.descend_to_district(gateway, guangzhou).await.unwrap();
        let tianhe = cursor.districts()[0].clone();
        cursor.descend_to_facilities(gateway, tianhe).await.unwrap();
        cursor
    }

    fn assert_consistent(cursor: &HierarchyCursor) {
        assert!(cursor.selection().is_prefix_consistent());
        assert!(cursor.selection().can_show(cursor.active_level()));
    }

    #[tokio::test]
    async fn test_full_descent() {
        let gateway = ScriptedGateway::new();
        let cursor = at_facilities(&gateway).await;

        assert_eq!(cursor.active_level(), Level::Facilities);
        assert_eq!(cursor.facilities().len(), 2);
        let trail = cursor.breadcrumb();
        let labels: Vec<&str> = trail.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec![ROOT_CRUMB_LABEL, "广东省", "广州市", "天河区"]);
        assert_eq!(cursor.breadcrumb().last().unwrap().target, None);
        assert_consistent(&cursor);
    }

    #[tokio::test]
    async fn test_descent_clears_inner_levels() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;

        let zhejiang = cursor.provinces()[1].clone();
        cursor.descend_to_city(&gateway, zhejiang).await.unwrap();
        assert_eq!(cursor.selection().province.as_ref().unwrap().name, "浙江省");
        assert!(cursor.selection().city.is_none());
        assert!(cursor.selection().district.is_none());
        assert_eq!(cursor.active_level(), Level::Cities);
        assert_eq!(cursor.cities().len(), 1);
        assert_consistent(&cursor);
    }

    #[tokio::test]
    async fn test_skipping_a_level_is_rejected() {
        let gateway = ScriptedGateway::new();
        let mut cursor = HierarchyCursor::new();
        cursor.load_provinces(&gateway).await;

        let result = cursor
            .descend_to_district(&gateway, city(10, "广州市", 1))
            .await;
        assert!(matches!(
            result,
            Err(NavError::LevelSkipped {
                level: Level::Districts
            })
        ));

        // A city of another province is not under the selected one.
        cursor
            .descend_to_city(&gateway, province(2, "浙江省"))
            .await
            .unwrap();
        let result = cursor
            .descend_to_district(&gateway, city(10, "广州市", 1))
            .await;
        assert!(result.is_err());
        assert_eq!(cursor.active_level(), Level::Cities);
    }

    #[tokio::test]
    async fn test_failed_descent_keeps_previous_list() {
        let gateway = ScriptedGateway::new();
        let mut cursor = HierarchyCursor::new();
        cursor.load_provinces(&gateway).await;

        gateway.fail("list cities");
        let resolution = cursor
            .descend_to_city(&gateway, province(1, "广东省"))
            .await
            .unwrap();

        assert_eq!(resolution, Resolution::Failed);
        assert_eq!(cursor.active_level(), Level::Provinces);
        assert!(cursor.selection().province.is_none());
        assert_eq!(cursor.provinces().len(), 2);
        assert_eq!(cursor.last_error().unwrap().operation, "list cities");
        assert!(!cursor.is_loading());

        gateway.recover("list cities");
        cursor
            .descend_to_city(&gateway, province(1, "广东省"))
            .await
            .unwrap();
        assert!(cursor.last_error().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_facilities_visible() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;

        gateway.fail("list hospitals");
        let resolution = cursor.refresh_current_level_list(&gateway).await.unwrap();
        assert_eq!(resolution, Resolution::Failed);
        assert_eq!(cursor.facilities().len(), 2);
        assert!(cursor.last_error().is_some());
    }

    #[tokio::test]
    async fn test_empty_list_is_not_an_error() {
        let gateway = ScriptedGateway::new();
        let mut cursor = HierarchyCursor::new();
        cursor.load_provinces(&gateway).await;
        cursor
            .descend_to_city(&gateway, province(1, "广东省"))
            .await
            .unwrap();

        let shenzhen = cursor.cities()[1].clone();
        let resolution = cursor.descend_to_district(&gateway, shenzhen).await.unwrap();
        assert_eq!(resolution, Resolution::Applied);
        assert!(cursor.districts().is_empty());
        assert!(cursor.last_error().is_none());
        assert_eq!(cursor.active_level(), Level::Districts);
    }

    #[tokio::test]
    async fn test_newer_descent_wins() {
        let gateway = ScriptedGateway::new();
        let mut cursor = HierarchyCursor::new();
        cursor.load_provinces(&gateway).await;

        let first = cursor
            .begin_descend(DescendTarget::Cities(province(1, "广东省")))
            .unwrap();
        let second = cursor
            .begin_descend(DescendTarget::Cities(province(2, "浙江省")))
            .unwrap();

        let second = second.fetch(&gateway).await;
        let first = first.fetch(&gateway).await;

        assert_eq!(cursor.apply(second), Resolution::Applied);
        assert_eq!(cursor.apply(first), Resolution::Superseded);
        assert_eq!(cursor.selection().province.as_ref().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_ascend_clears_only_inner_levels() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;

        cursor.ascend_to(Level::Districts).unwrap();
        assert!(cursor.selection().province.is_some());
        assert!(cursor.selection().city.is_some());
        assert!(cursor.selection().district.is_none());
        assert_eq!(cursor.active_level(), Level::Districts);
        assert_consistent(&cursor);

        cursor.ascend_to(Level::Cities).unwrap();
        assert!(cursor.selection().province.is_some());
        assert!(cursor.selection().city.is_none());

        cursor.ascend_to(Level::Provinces).unwrap();
        assert_eq!(cursor.selection(), &Selection::default());
        assert_consistent(&cursor);
    }

    #[tokio::test]
    async fn test_ascend_does_not_fetch() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;
        let calls = gateway.calls();

        cursor.ascend_to(Level::Cities).unwrap();
        assert_eq!(cursor.cities().len(), 2);
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test]
    async fn test_ascend_abandons_pending_descent() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;

        let ticket = cursor
            .begin_descend(DescendTarget::Facilities(district(101, "越秀区", 10)))
            .unwrap();
        cursor.ascend_to(Level::Cities).unwrap();
        let response = ticket.fetch(&gateway).await;

        assert_eq!(cursor.apply(response), Resolution::Superseded);
        assert_eq!(cursor.active_level(), Level::Cities);
        assert!(cursor.selection().district.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_levels_rejected() {
        let mut cursor = HierarchyCursor::new();
        assert!(cursor.ascend_to(Level::Cities).is_err());
        assert!(cursor.show_level(Level::Facilities).is_err());
        assert!(cursor.refresh_current_level_list(&ScriptedGateway::new()).await.is_err());
        assert_eq!(cursor.active_level(), Level::Provinces);
    }

    #[tokio::test]
    async fn test_resume_last_list_snaps_to_deepest() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;
        let calls = gateway.calls();

        cursor.show_level(Level::Provinces).unwrap();
        assert_eq!(cursor.resume_last_list(), Level::Facilities);
        assert!(cursor.selection().district.is_some());
        assert_eq!(gateway.calls(), calls);
    }

    #[tokio::test]
    async fn test_facility_filter_and_lookup() {
        let gateway = ScriptedGateway::new();
        let mut cursor = at_facilities(&gateway).await;

        cursor.set_facility_filter("人民");
        let names: Vec<&str> = cursor
            .visible_facilities()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["天河区人民医院"]);

        cursor.set_facility_filter("横枝岗");
        assert_eq!(cursor.visible_facilities()[0].id, 1002);

        assert_eq!(cursor.lookup_cached_facility(1002).unwrap().id, 1002);
        assert!(matches!(
            cursor.lookup_cached_facility(1003),
            Err(NavError::NotFound { id: 1003 })
        ));

        cursor.refresh_current_level_list(&gateway).await.unwrap();
        assert_eq!(cursor.facility_filter(), "");
        assert_eq!(cursor.visible_facilities().len(), 2);
    }
}
