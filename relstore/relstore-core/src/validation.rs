//! Validation - rules enforced before any backend call.
//!
//! Wire bodies come in loose ([`ReleaseCreate`], [`ReleaseUpdate`], raw bulk
//! ids) and leave as typed inputs a store can trust.

use serde_json::Value;

use crate::constants::BULK_IDS_COUNT_MAX;
use crate::release::{
    NewRelease, ReleaseCreate, ReleaseId, ReleasePatch, ReleaseStatus, ReleaseUpdate,
};

/// Fields that must be present and non-empty on create, in message order.
pub const REQUIRED_CREATE_FIELDS: [&str; 5] = ["appName", "platform", "version", "branch", "tag"];

// =============================================================================
// Errors
// =============================================================================

/// Caller input that violates a documented constraint.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required fields: {} (missing: {})", REQUIRED_CREATE_FIELDS.join(", "), .missing.join(", "))]
    MissingFields { missing: Vec<&'static str> },

    #[error("Invalid status. Must be one of: {}", ReleaseStatus::allowed_list())]
    InvalidStatus { given: Option<String> },

    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    #[error("ids must be a non-empty array")]
    EmptyIds,

    #[error("too many ids: {count} > {max}")]
    TooManyIds { count: usize, max: usize },

    #[error("All IDs must be valid numbers")]
    InvalidIds { rejected: Vec<String> },
}

// =============================================================================
// Create / Update
// =============================================================================

/// Validate a create body.
///
/// # Errors
/// Missing required fields are reported before an invalid status.
pub fn validate_create(body: ReleaseCreate) -> Result<NewRelease, ValidationError> {
    let required = [
        ("appName", &body.app_name),
        ("platform", &body.platform),
        ("version", &body.version),
        ("branch", &body.branch),
        ("tag", &body.tag),
    ];
    let missing: Vec<&'static str> = required
        .iter()
        .filter(|(_, value)| is_blank(value.as_deref()))
        .map(|(name, _)| *name)
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields { missing });
    }

    let status = parse_optional_status(body.status)?;

    // Every required field was checked above.
    let (Some(app_name), Some(platform), Some(version), Some(branch), Some(tag)) = (
        body.app_name,
        body.platform,
        body.version,
        body.branch,
        body.tag,
    ) else {
        return Err(ValidationError::MissingFields {
            missing: REQUIRED_CREATE_FIELDS.to_vec(),
        });
    };

    Ok(NewRelease {
        organization: body.organization,
        app_name,
        platform,
        version,
        branch,
        status,
        tag,
        upload_date: body.upload_date,
        force_update: body.force_update,
        additional_data: body.additional_data,
    })
}

/// Validate a partial update body.
///
/// # Errors
/// Rejects an invalid status, or a supplied-but-empty identity field.
pub fn validate_update(body: ReleaseUpdate) -> Result<ReleasePatch, ValidationError> {
    let status = parse_optional_status(body.status)?;

    let non_empty = [
        ("organization", &body.organization),
        ("appName", &body.app_name),
        ("platform", &body.platform),
        ("version", &body.version),
        ("branch", &body.branch),
        ("tag", &body.tag),
    ];
    for (field, value) in non_empty {
        if matches!(value.as_deref(), Some(v) if v.trim().is_empty()) {
            return Err(ValidationError::EmptyField { field });
        }
    }

    Ok(ReleasePatch {
        organization: body.organization,
        app_name: body.app_name,
        platform: body.platform,
        version: body.version,
        branch: body.branch,
        status,
        tag: body.tag,
        upload_date: body.upload_date,
        force_update: body.force_update,
        additional_data: body.additional_data,
    })
}

/// Parse a required status literal.
///
/// # Errors
/// Missing or unknown literals are rejected.
pub fn validate_status(status: Option<&str>) -> Result<ReleaseStatus, ValidationError> {
    status
        .and_then(ReleaseStatus::parse)
        .ok_or_else(|| ValidationError::InvalidStatus {
            given: status.map(str::to_string),
        })
}

fn parse_optional_status(status: Option<String>) -> Result<Option<ReleaseStatus>, ValidationError> {
    match status {
        None => Ok(None),
        Some(s) => ReleaseStatus::parse(&s)
            .map(Some)
            .ok_or(ValidationError::InvalidStatus { given: Some(s) }),
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

// =============================================================================
// Bulk
// =============================================================================

/// Validate the id list of a bulk status update.
///
/// Each element must be a JSON integer, a float with no fractional part, or a
/// string holding an integer. One bad element rejects the whole batch.
/// Duplicates are collapsed keeping first-seen order.
///
/// # Errors
/// Empty lists, oversized lists and non-numeric elements are rejected.
pub fn validate_bulk_ids(ids: &[Value]) -> Result<Vec<ReleaseId>, ValidationError> {
    if ids.is_empty() {
        return Err(ValidationError::EmptyIds);
    }
    if ids.len() > BULK_IDS_COUNT_MAX {
        return Err(ValidationError::TooManyIds {
            count: ids.len(),
            max: BULK_IDS_COUNT_MAX,
        });
    }

    let mut parsed = Vec::with_capacity(ids.len());
    let mut rejected = Vec::new();
    for value in ids {
        match coerce_id(value) {
            Some(id) => {
                if !parsed.contains(&id) {
                    parsed.push(id);
                }
            }
            None => rejected.push(value.to_string()),
        }
    }

    if !rejected.is_empty() {
        return Err(ValidationError::InvalidIds { rejected });
    }

    // Postcondition
    assert!(!parsed.is_empty(), "validated id list must be non-empty");
    Ok(parsed)
}

fn coerce_id(value: &Value) -> Option<ReleaseId> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

// =============================================================================
// Tests
// =============================================================================
