//! Views over a list of releases: filter, sort, group, paginate, summarise.
//!
//! Pure functions on slices. Storage order is never assumed; each view
//! establishes the order it documents.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::constants::{PAGE_SIZE_DEFAULT, PAGE_SIZE_MAX};
use crate::release::{Release, ReleaseStatus};
use crate::storage::newest_first;

/// Filter value meaning "no filter", as sent by dashboard selects.
const FILTER_ALL: &str = "All";

// =============================================================================
// Filter
// =============================================================================

/// Exact-match filters plus a free-text search. Empty or `All` means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseFilter {
    pub organization: Option<String>,
    pub platform: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    /// Case-insensitive substring of app name or version
    pub search: Option<String>,
}

impl ReleaseFilter {
    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = Some(status.as_str().to_string());
        self
    }

    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// True when no criterion is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.organization,
            &self.platform,
            &self.status,
            &self.tag,
            &self.search,
        ]
        .into_iter()
        .all(|v| active(v).is_none())
    }

    #[must_use]
    pub fn matches(&self, release: &Release) -> bool {
        let exact = |criterion: &Option<String>, value: &str| {
            active(criterion).map_or(true, |want| want == value)
        };

        let search_ok = active(&self.search).map_or(true, |term| {
            let term = term.to_lowercase();
            release.app_name.to_lowercase().contains(&term)
                || release.version.to_lowercase().contains(&term)
        });

        exact(&self.organization, &release.organization)
            && exact(&self.platform, &release.platform)
            && exact(&self.status, release.status.as_str())
            && exact(&self.tag, &release.tag)
            && search_ok
    }

    /// Matching releases, order preserved.
    #[must_use]
    pub fn apply(&self, releases: &[Release]) -> Vec<Release> {
        releases.iter().filter(|r| self.matches(r)).cloned().collect()
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != FILTER_ALL)
}

// =============================================================================
// Sort
// =============================================================================

/// Column to sort by. Names match the JSON field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    Id,
    Organization,
    AppName,
    Platform,
    Version,
    Branch,
    Status,
    Tag,
    #[default]
    UploadDate,
    ForceUpdate,
}

impl SortField {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "id" => Some(Self::Id),
            "organization" => Some(Self::Organization),
            "appName" => Some(Self::AppName),
            "platform" => Some(Self::Platform),
            "version" => Some(Self::Version),
            "branch" => Some(Self::Branch),
            "status" => Some(Self::Status),
            "tag" => Some(Self::Tag),
            "uploadDate" => Some(Self::UploadDate),
            "forceUpdate" => Some(Self::ForceUpdate),
            _ => None,
        }
    }

    fn compare(self, a: &Release, b: &Release) -> Ordering {
        match self {
            Self::Id => a.id.cmp(&b.id),
            Self::Organization => a.organization.cmp(&b.organization),
            Self::AppName => a.app_name.cmp(&b.app_name),
            Self::Platform => a.platform.cmp(&b.platform),
            Self::Version => a.version.cmp(&b.version),
            Self::Branch => a.branch.cmp(&b.branch),
            Self::Status => a.status.as_str().cmp(b.status.as_str()),
            Self::Tag => a.tag.cmp(&b.tag),
            Self::UploadDate => a.upload_date.cmp(&b.upload_date),
            Self::ForceUpdate => a.force_update.cmp(&b.force_update),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// Stable sort; equal keys keep their incoming order.
pub fn sort_releases(releases: &mut [Release], field: SortField, direction: SortDirection) {
    releases.sort_by(|a, b| {
        let ord = field.compare(a, b);
        match direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}

// =============================================================================
// Group
// =============================================================================

/// Releases sharing one tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagGroup {
    pub tag: String,
    pub latest_upload_date: String,
    /// Newest first
    pub releases: Vec<Release>,
}

/// Group by tag. Groups are ordered by their newest upload, newest first.
#[must_use]
pub fn group_by_tag(releases: &[Release]) -> Vec<TagGroup> {
    let mut by_tag: BTreeMap<&str, Vec<Release>> = BTreeMap::new();
    for release in releases {
        by_tag
            .entry(release.tag.as_str())
            .or_default()
            .push(release.clone());
    }

    let mut groups: Vec<TagGroup> = by_tag
        .into_iter()
        .map(|(tag, mut members)| {
            members.sort_by(newest_first);
            let latest_upload_date = members
                .first()
                .map(|r| r.upload_date.clone())
                .unwrap_or_default();
            TagGroup {
                tag: tag.to_string(),
                latest_upload_date,
                releases: members,
            }
        })
        .collect();

    groups.sort_by(|a, b| {
        b.latest_upload_date
            .cmp(&a.latest_upload_date)
            .then_with(|| a.tag.cmp(&b.tag))
    });

    // Postcondition
    debug_assert_eq!(
        groups.iter().map(|g| g.releases.len()).sum::<usize>(),
        releases.len()
    );
    groups
}

// =============================================================================
// Paginate
// =============================================================================

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped to `1..=total_pages`
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    /// At least 1, even for an empty list
    pub total_pages: usize,
}

/// Slice out one page. A zero page size means the default; oversized pages
/// are capped.
#[must_use]
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = match page_size {
        0 => PAGE_SIZE_DEFAULT,
        n => n.min(PAGE_SIZE_MAX),
    };
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);

    let start = (page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let slice = items.get(start..end).unwrap_or_default();

    // Postconditions
    assert!(slice.len() <= page_size, "page cannot exceed its size");
    assert!(page <= total_pages, "page must be in range");

    Page {
        items: slice.to_vec(),
        page,
        page_size,
        total_items,
        total_pages,
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Dashboard header statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub total: usize,
    /// Distinct app names
    pub apps: usize,
    /// Sorted, distinct
    pub organizations: Vec<String>,
    /// Sorted, distinct
    pub platforms: Vec<String>,
    /// Sorted, distinct
    pub tags: Vec<String>,
    /// Every status present, zero when unused
    pub by_status: BTreeMap<String, usize>,
}

impl ReleaseSummary {
    #[must_use]
    pub fn of(releases: &[Release]) -> Self {
        let distinct = |f: fn(&Release) -> &str| -> Vec<String> {
            releases
                .iter()
                .map(f)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .map(str::to_string)
                .collect()
        };

        let mut by_status: BTreeMap<String, usize> = ReleaseStatus::all()
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for release in releases {
            *by_status
                .entry(release.status.as_str().to_string())
                .or_default() += 1;
        }

        Self {
            total: releases.len(),
            apps: distinct(|r| r.app_name.as_str()).len(),
            organizations: distinct(|r| r.organization.as_str()),
            platforms: distinct(|r| r.platform.as_str()),
            tags: distinct(|r| r.tag.as_str()),
            by_status,
        }
    }
}
