//! Row mapping shared by the SQL backends.
//!
//! Both SQL backends read the same columns into a [`ReleaseRow`] and convert
//! it here, so legacy defaults and corrupt-payload rules cannot drift.

use super::error::{StorageError, StorageResult};
use crate::constants::{FORCE_UPDATE_DEFAULT, TAG_DEFAULT};
use crate::release::{AdditionalData, Release, ReleaseId, ReleaseStatus};

/// Raw column values of one `releases` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ReleaseRow {
    pub id: ReleaseId,
    pub organization: Option<String>,
    pub app_name: Option<String>,
    pub platform: Option<String>,
    pub version: Option<String>,
    pub branch: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
    pub upload_date: Option<String>,
    pub force_update: Option<String>,
    pub additional_data: Option<String>,
}

impl ReleaseRow {
    /// Convert to a [`Release`].
    ///
    /// Null or empty `status`, `tag` and `forceUpdate` read as their defaults.
    ///
    /// # Errors
    /// An unknown status literal or unparseable `additionalData` is corrupt.
    pub fn into_release(self) -> StorageResult<Release> {
        let id = self.id;

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => ReleaseStatus::default(),
            Some(s) => ReleaseStatus::parse(s).ok_or_else(|| {
                StorageError::corrupt(format!("release {id}: unknown status {s:?}"))
            })?,
        };

        let additional_data = match self.additional_data.as_deref() {
            None | Some("") | Some("null") => None,
            Some(raw) => Some(decode_additional_data(id, raw)?),
        };

        Ok(Release {
            id,
            organization: self.organization.unwrap_or_default(),
            app_name: self.app_name.unwrap_or_default(),
            platform: self.platform.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            branch: self.branch.unwrap_or_default(),
            status,
            tag: or_default(self.tag, TAG_DEFAULT),
            upload_date: self.upload_date.unwrap_or_default(),
            force_update: or_default(self.force_update, FORCE_UPDATE_DEFAULT),
            additional_data,
        })
    }
}

fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn decode_additional_data(id: ReleaseId, raw: &str) -> StorageResult<AdditionalData> {
    serde_json::from_str(raw).map_err(|e| {
        StorageError::corrupt(format!("release {id}: malformed additionalData: {e}"))
    })
}

/// Serialize `additionalData` for a TEXT column. `None` stays NULL.
pub(crate) fn encode_additional_data(data: Option<&AdditionalData>) -> StorageResult<Option<String>> {
    data.map(|d| {
        serde_json::to_string(d)
            .map_err(|e| StorageError::write(format!("failed to encode additionalData: {e}")))
    })
    .transpose()
}
