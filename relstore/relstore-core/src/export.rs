//! CSV export of app names and versions.
//!
//! Two columns, `name,version`. A leading `v` on the version is dropped.
//! Lines are joined with `\n` and there is no trailing newline.

use crate::release::Release;

/// Header row.
pub const CSV_HEADER: &str = "name,version";

/// Suggested download name.
pub const CSV_FILENAME_DEFAULT: &str = "releases-export.csv";

/// Render releases as CSV, in the order given.
#[must_use]
pub fn releases_to_csv(releases: &[Release]) -> String {
    let mut lines = Vec::with_capacity(releases.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for release in releases {
        let version = release
            .version
            .strip_prefix('v')
            .unwrap_or(&release.version);
        lines.push(format!(
            "{},{}",
            escape_field(&release.app_name),
            escape_field(version)
        ));
    }
    lines.join("\n")
}

/// Quote a field containing a comma, quote or newline; inner quotes double.
#[must_use]
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimClock;
    use crate::release::NewRelease;

    fn release(app: &str, version: &str) -> Release {
        NewRelease::new(app, "iOS", version, "main", "t")
            .resolve(&SimClock::new())
            .into_release(1)
    }

    #[test]
    fn test_header_only_for_empty_list() {
        assert_eq!(releases_to_csv(&[]), "name,version");
    }

    #[test]
    fn test_strips_single_leading_v() {
        let csv = releases_to_csv(&[release("froggy-98", "v2.1.0"), release("the-wolf", "vv1")]);
        assert_eq!(csv, "name,version\nfroggy-98,2.1.0\nthe-wolf,v1");
    }

    #[test]
    fn test_escaping() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("two\nlines"), "\"two\nlines\"");
    }
}
