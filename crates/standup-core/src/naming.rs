//! Collision-free names for test releases

use once_cell::sync::Lazy;
use regex::Regex;

/// Release names accepted by the Release CRD validation
static RELEASE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^v(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-[.0-9A-Za-z]*)?$")
        .expect("valid regex")
});

/// Derive a unique test release name using the current time
pub fn generate_release_name(name: &str) -> String {
    generate_release_name_at(name, chrono::Utc::now().timestamp())
}

/// Derive a unique test release name for the given unix timestamp
///
/// A pre-release part is replaced by `-<timestamp>`; names without one (or
/// names that are not release names at all) get the suffix appended.
///
/// ```
/// use standup_core::generate_release_name_at;
///
/// assert_eq!(generate_release_name_at("v13.0.0", 1600000000), "v13.0.0-1600000000");
/// assert_eq!(generate_release_name_at("v13.0.0-beta1", 1600000000), "v13.0.0-1600000000");
/// ```
pub fn generate_release_name_at(name: &str, unix_ts: i64) -> String {
    let suffix = format!("-{}", unix_ts);

    match RELEASE_NAME
        .captures(name)
        .and_then(|caps| caps.get(4))
        .filter(|pre| !pre.as_str().is_empty())
    {
        Some(pre) => format!("{}{}{}", &name[..pre.start()], suffix, &name[pre.end()..]),
        None => format!("{}{}", name, suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1_602_000_000;

    #[test]
    fn test_appends_suffix_to_plain_release() {
        assert_eq!(generate_release_name_at("v13.0.0", TS), "v13.0.0-1602000000");
        assert_eq!(generate_release_name_at("v0.1.0", TS), "v0.1.0-1602000000");
    }

    #[test]
    fn test_replaces_prerelease() {
        assert_eq!(generate_release_name_at("v13.0.0-alpha", TS), "v13.0.0-1602000000");
        assert_eq!(generate_release_name_at("v13.0.0-beta.1", TS), "v13.0.0-1602000000");
    }

    #[test]
    fn test_bare_dash_is_replaced() {
        assert_eq!(generate_release_name_at("v13.0.0-", TS), "v13.0.0-1602000000");
    }

    #[test]
    fn test_non_release_name_appends() {
        assert_eq!(generate_release_name_at("13.0.0", TS), "13.0.0-1602000000");
        assert_eq!(generate_release_name_at("v01.0.0", TS), "v01.0.0-1602000000");
        assert_eq!(generate_release_name_at("foo", TS), "foo-1602000000");
    }

    #[test]
    fn test_incomplete_version_appends() {
        assert_eq!(generate_release_name_at("v13.0", TS), "v13.0-1602000000");
    }

    #[test]
    fn test_generated_name_is_valid_release_name() {
        let name = generate_release_name("v13.0.0-alpha");
        assert!(RELEASE_NAME.is_match(&name), "{}", name);
    }
}
