//! Organization lookup - static app name to owning organization table.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::constants::ORGANIZATION_FALLBACK;

/// Known apps and the organization that ships them.
const APP_ORGANIZATIONS: &[(&str, &str)] = &[
    ("froggy-98", "Froggy Media"),
    ("wowy-radio", "Wowy Broadcasting"),
    ("radio-91-2", "Wowy Broadcasting"),
    ("wiil-rock", "Rock Radio Group"),
    ("the-wolf", "Rock Radio Group"),
    ("san-antonio", "Texas Audio Network"),
    ("ibiza-sonica", "Sonica Media"),
];

static ORGANIZATION_BY_APP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| APP_ORGANIZATIONS.iter().copied().collect());

/// Resolve the organization for an app name.
///
/// Matching ignores surrounding whitespace and ASCII case. Unknown names map
/// to [`ORGANIZATION_FALLBACK`].
#[must_use]
pub fn organization_for_app(app_name: &str) -> &'static str {
    let key = app_name.trim().to_ascii_lowercase();
    ORGANIZATION_BY_APP
        .get(key.as_str())
        .copied()
        .unwrap_or(ORGANIZATION_FALLBACK)
}

/// App names present in the lookup table, in declaration order.
pub fn known_apps() -> impl Iterator<Item = &'static str> {
    APP_ORGANIZATIONS.iter().map(|(app, _)| *app)
}
