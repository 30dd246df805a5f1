//! Release - the record every backend stores.
//!
//! TigerStyle: explicit types, validated inputs, builder for creation.
//!
//! Three shapes flow through the crate:
//! - [`ReleaseCreate`] / [`ReleaseUpdate`]: loose wire bodies, every field optional
//! - [`NewRelease`] / [`ReleasePatch`]: validated, typed inputs to a store
//! - [`Release`]: the stored record, including its backend-assigned id

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::constants::{FORCE_UPDATE_DEFAULT, STATUS_DEFAULT, TAG_DEFAULT};
use crate::organization::organization_for_app;

/// Identifier assigned by the storage backend.
pub type ReleaseId = i64;

/// Free-form key-value data attached to a release.
pub type AdditionalData = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// Release Status
// =============================================================================

/// Review state of a release. The only closed value set in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReleaseStatus {
    /// Uploaded and awaiting store review
    #[serde(rename = "In Review")]
    InReview,
    /// Approved, waiting for someone to press publish
    #[serde(rename = "Ready to publish")]
    ReadyToPublish,
    /// Live in the store
    #[serde(rename = "Published")]
    Published,
}

impl ReleaseStatus {
    /// Persisted and wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InReview => "In Review",
            Self::ReadyToPublish => "Ready to publish",
            Self::Published => "Published",
        }
    }

    /// Parse an exact status literal.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "In Review" => Some(Self::InReview),
            "Ready to publish" => Some(Self::ReadyToPublish),
            "Published" => Some(Self::Published),
            _ => None,
        }
    }

    /// All statuses in workflow order.
    #[must_use]
    pub fn all() -> &'static [ReleaseStatus] {
        &[Self::InReview, Self::ReadyToPublish, Self::Published]
    }

    /// Comma-separated list used in validation messages.
    #[must_use]
    pub fn allowed_list() -> String {
        Self::all()
            .iter()
            .map(ReleaseStatus::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for ReleaseStatus {
    fn default() -> Self {
        Self::InReview
    }
}

impl std::fmt::Display for ReleaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Release
// =============================================================================

/// A stored release.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Release {
    /// Backend-assigned identifier, never reused
    pub id: ReleaseId,
    /// Owning organization, never empty
    pub organization: String,
    /// Application name
    pub app_name: String,
    /// Platform, conventionally iOS / Android / Web
    pub platform: String,
    /// Version string
    pub version: String,
    /// Source branch
    pub branch: String,
    /// Review state
    pub status: ReleaseStatus,
    /// Rollout campaign label
    pub tag: String,
    /// ISO-8601 upload timestamp
    pub upload_date: String,
    /// "Yes" when clients must install immediately
    pub force_update: String,
    /// Opaque extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<AdditionalData>,
}

// =============================================================================
// Wire Bodies
// =============================================================================

/// Create body as received from a caller. Validated into [`NewRelease`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseCreate {
    pub organization: Option<String>,
    pub app_name: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub upload_date: Option<String>,
    pub force_update: Option<String>,
    pub additional_data: Option<AdditionalData>,
}

/// Partial update body as received from a caller. Validated into [`ReleasePatch`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseUpdate {
    pub organization: Option<String>,
    pub app_name: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub upload_date: Option<String>,
    pub force_update: Option<String>,
    pub additional_data: Option<AdditionalData>,
}

// =============================================================================
// NewRelease
// =============================================================================

/// Validated create input. Required fields are plain strings; everything a
/// backend defaults stays optional until [`NewRelease::resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewRelease {
    pub organization: Option<String>,
    pub app_name: String,
    pub platform: String,
    pub version: String,
    pub branch: String,
    pub status: Option<ReleaseStatus>,
    pub tag: String,
    pub upload_date: Option<String>,
    pub force_update: Option<String>,
    pub additional_data: Option<AdditionalData>,
}

impl NewRelease {
    /// Create with the five required fields.
    #[must_use]
    pub fn new(
        app_name: impl Into<String>,
        platform: impl Into<String>,
        version: impl Into<String>,
        branch: impl Into<String>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            organization: None,
            app_name: app_name.into(),
            platform: platform.into(),
            version: version.into(),
            branch: branch.into(),
            status: None,
            tag: tag.into(),
            upload_date: None,
            force_update: None,
            additional_data: None,
        }
    }

    #[must_use]
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    #[must_use]
    pub fn with_status(mut self, status: ReleaseStatus) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_upload_date(mut self, upload_date: impl Into<String>) -> Self {
        self.upload_date = Some(upload_date.into());
        self
    }

    #[must_use]
    pub fn with_force_update(mut self, force_update: impl Into<String>) -> Self {
        self.force_update = Some(force_update.into());
        self
    }

    #[must_use]
    pub fn with_additional_data(mut self, data: AdditionalData) -> Self {
        self.additional_data = Some(data);
        self
    }

    /// Fill every defaulted field. Shared by all backends so defaults cannot
    /// drift between them.
    #[must_use]
    pub fn resolve(self, clock: &dyn Clock) -> ReleaseFields {
        let organization = non_empty(self.organization)
            .unwrap_or_else(|| organization_for_app(&self.app_name).to_string());
        let upload_date = non_empty(self.upload_date).unwrap_or_else(|| clock.now_iso());
        let force_update =
            non_empty(self.force_update).unwrap_or_else(|| FORCE_UPDATE_DEFAULT.to_string());

        let fields = ReleaseFields {
            organization,
            app_name: self.app_name,
            platform: self.platform,
            version: self.version,
            branch: self.branch,
            status: self.status.unwrap_or_default(),
            tag: self.tag,
            upload_date,
            force_update,
            additional_data: self.additional_data,
        };

        // Postcondition
        assert!(!fields.organization.is_empty(), "organization must be resolved");
        debug_assert_eq!(ReleaseStatus::default().as_str(), STATUS_DEFAULT);

        fields
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// ReleaseFields
// =============================================================================

/// A fully resolved release that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseFields {
    pub organization: String,
    pub app_name: String,
    pub platform: String,
    pub version: String,
    pub branch: String,
    pub status: ReleaseStatus,
    pub tag: String,
    pub upload_date: String,
    pub force_update: String,
    pub additional_data: Option<AdditionalData>,
}

impl ReleaseFields {
    /// Attach the backend-assigned id.
    #[must_use]
    pub fn into_release(self, id: ReleaseId) -> Release {
        Release {
            id,
            organization: self.organization,
            app_name: self.app_name,
            platform: self.platform,
            version: self.version,
            branch: self.branch,
            status: self.status,
            tag: self.tag,
            upload_date: self.upload_date,
            force_update: self.force_update,
            additional_data: self.additional_data,
        }
    }
}

impl From<Release> for ReleaseFields {
    fn from(release: Release) -> Self {
        Self {
            organization: release.organization,
            app_name: release.app_name,
            platform: release.platform,
            version: release.version,
            branch: release.branch,
            status: release.status,
            tag: release.tag,
            upload_date: release.upload_date,
            force_update: release.force_update,
            additional_data: release.additional_data,
        }
    }
}

// =============================================================================
// ReleasePatch
// =============================================================================

/// Validated partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleasePatch {
    pub organization: Option<String>,
    pub app_name: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub branch: Option<String>,
    pub status: Option<ReleaseStatus>,
    pub tag: Option<String>,
    pub upload_date: Option<String>,
    pub force_update: Option<String>,
    /// Replaces the whole mapping when present
    pub additional_data: Option<AdditionalData>,
}

impl ReleasePatch {
    /// Patch that only changes the status.
    #[must_use]
    pub fn status(status: ReleaseStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// True when applying the patch would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge supplied fields onto an existing release. The id never changes.
    pub fn apply(self, release: &mut Release) {
        let id = release.id;

        if let Some(v) = self.organization {
            release.organization = v;
        }
        if let Some(v) = self.app_name {
            release.app_name = v;
        }
        if let Some(v) = self.platform {
            release.platform = v;
        }
        if let Some(v) = self.version {
            release.version = v;
        }
        if let Some(v) = self.branch {
            release.branch = v;
        }
        if let Some(v) = self.status {
            release.status = v;
        }
        if let Some(v) = self.tag {
            release.tag = non_empty(Some(v)).unwrap_or_else(|| TAG_DEFAULT.to_string());
        }
        if let Some(v) = self.upload_date {
            release.upload_date = v;
        }
        // Blank values read back as their defaults from SQL rows.
        if let Some(v) = self.force_update {
            release.force_update =
                non_empty(Some(v)).unwrap_or_else(|| FORCE_UPDATE_DEFAULT.to_string());
        }
        if let Some(v) = self.additional_data {
            release.additional_data = Some(v);
        }

        // Postcondition
        assert_eq!(release.id, id, "patch must not change the id");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use crate::constants::ORGANIZATION_FALLBACK;

    fn sample() -> NewRelease {
        NewRelease::new("froggy-98", "iOS", "1.2.0", "main", "hotfix-22-july-2025")
    }

    #[test]
    fn test_status_as_str_and_parse() {
        for status in ReleaseStatus::all() {
            assert_eq!(ReleaseStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(ReleaseStatus::parse("Maybe"), None);
        assert_eq!(ReleaseStatus::parse("published"), None);
    }

    #[test]
    fn test_status_serde_uses_literals() {
        let json = serde_json::to_string(&ReleaseStatus::ReadyToPublish).unwrap();
        assert_eq!(json, "\"Ready to publish\"");
        let parsed: ReleaseStatus = serde_json::from_str("\"In Review\"").unwrap();
        assert_eq!(parsed, ReleaseStatus::InReview);
    }

    #[test]
    fn test_allowed_list() {
        assert_eq!(
            ReleaseStatus::allowed_list(),
            "In Review, Ready to publish, Published"
        );
    }

    #[test]
    fn test_patch_blank_force_update_becomes_default() {
        let mut release = sample().resolve(&SimClock::new()).into_release(1);
        release.force_update = "Yes".to_string();

        ReleasePatch {
            force_update: Some("  ".to_string()),
            tag: Some(String::new()),
            ..ReleasePatch::default()
        }
        .apply(&mut release);

        assert_eq!(release.force_update, FORCE_UPDATE_DEFAULT);
        assert_eq!(release.tag, TAG_DEFAULT);
    }

    #[test]
    fn test_resolve_fills_defaults() {
        let clock = SimClock::at_ms(1_717_234_200_000);
        let fields = sample().resolve(&clock);

        assert_eq!(fields.organization, "Froggy Media");
        assert_eq!(fields.status, ReleaseStatus::InReview);
        assert_eq!(fields.upload_date, "2024-06-01T09:30:00.000Z");
        assert_eq!(fields.force_update, "No");
        assert!(fields.additional_data.is_none());
    }

    #[test]
    fn test_resolve_keeps_supplied_values() {
        let clock = SimClock::new();
        let fields = sample()
            .with_organization("Acme")
            .with_status(ReleaseStatus::Published)
            .with_upload_date("2024-01-01T00:00:00.000Z")
            .with_force_update("Yes")
            .resolve(&clock);

        assert_eq!(fields.organization, "Acme");
        assert_eq!(fields.status, ReleaseStatus::Published);
        assert_eq!(fields.upload_date, "2024-01-01T00:00:00.000Z");
        assert_eq!(fields.force_update, "Yes");
    }

    #[test]
    fn test_resolve_treats_blank_organization_as_missing() {
        let clock = SimClock::new();
        let fields = NewRelease::new("unknown-app", "Web", "1", "main", "t")
            .with_organization("   ")
            .resolve(&clock);
        assert_eq!(fields.organization, ORGANIZATION_FALLBACK);
    }

    #[test]
    fn test_patch_changes_only_supplied_fields() {
        let clock = SimClock::new();
        let mut release = sample().resolve(&clock).into_release(7);
        let before = release.clone();

        ReleasePatch::status(ReleaseStatus::Published).apply(&mut release);

        assert_eq!(release.status, ReleaseStatus::Published);
        assert_eq!(
            Release {
                status: before.status,
                ..release.clone()
            },
            before
        );
    }

    #[test]
    fn test_empty_patch() {
        assert!(ReleasePatch::default().is_empty());
        assert!(!ReleasePatch::status(ReleaseStatus::InReview).is_empty());
    }

    #[test]
    fn test_release_json_shape() {
        let clock = SimClock::new();
        let mut data = AdditionalData::new();
        data.insert("notes".into(), serde_json::json!("x"));
        let release = sample()
            .with_additional_data(data)
            .resolve(&clock)
            .into_release(1);

        let value = serde_json::to_value(&release).unwrap();
        assert_eq!(value["appName"], "froggy-98");
        assert_eq!(value["uploadDate"], "1970-01-01T00:00:00.000Z");
        assert_eq!(value["forceUpdate"], "No");
        assert_eq!(value["status"], "In Review");
        assert_eq!(value["additionalData"]["notes"], "x");
    }

    #[test]
    fn test_release_without_additional_data_omits_field() {
        let clock = SimClock::new();
        let release = sample().resolve(&clock).into_release(1);
        let value = serde_json::to_value(&release).unwrap();
        assert!(value.get("additionalData").is_none());
    }
}
