// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{cmp::Ordering, collections::HashMap, fmt, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

static SEMVER_CORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").expect("invalid semver pattern"));

/// a free-form version string broken into numeric segments.
///
/// parsing never fails: a segment without digits counts as zero, so
/// `"1.0.2-Alpha"` becomes `[1, 0, 2, 0]` and garbage becomes `[0]`.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<u64>,
}

impl Version {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw
            .strip_prefix('v')
            .or_else(|| raw.strip_prefix('V'))
            .unwrap_or(raw);

        let segments = trimmed.split(['.', '-']).map(parse_segment).collect();

        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[u64] {
        &self.segments
    }
}

/// keeps only the digits of a segment; empty segments are zero and overflowing
/// ones saturate so they still compare as huge.
fn parse_segment(segment: &str) -> u64 {
    let digits: String = segment.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return 0;
    }
    digits.parse().unwrap_or(u64::MAX)
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let max_len = self.segments.len().max(other.segments.len());

        for i in 0..max_len {
            let a = self.segments.get(i).copied().unwrap_or(0);
            let b = other.segments.get(i).copied().unwrap_or(0);

            match a.cmp(&b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }

        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// compares two version strings.
/// returns Ordering::Less if v1 < v2 (update available).
pub fn compare(v1: &str, v2: &str) -> Ordering {
    Version::parse(v1).cmp(&Version::parse(v2))
}

/// returns true if `available` is newer than `installed`.
pub fn is_update_available(installed: &str, available: &str) -> bool {
    compare(installed, available) == Ordering::Less
}

/// pulls the first `x.y.z` triple out of tool output such as `spicetify v2.38.4`.
pub fn extract_semver(text: &str) -> Option<&str> {
    SEMVER_CORE.find(text).map(|m| m.as_str())
}

/// memoized "is current strictly newer than latest" answers.
///
/// keys are directional: `("a", "b")` and `("b", "a")` are separate entries.
#[derive(Debug, Default)]
pub struct ComparisonCache {
    entries: HashMap<String, bool>,
}

impl ComparisonCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(current: &str, latest: &str) -> String {
        format!("{current}:{latest}")
    }

    pub fn get(&self, current: &str, latest: &str) -> Option<bool> {
        self.entries.get(&Self::key(current, latest)).copied()
    }

    fn insert(&mut self, current: &str, latest: &str, newer: bool) {
        self.entries.insert(Self::key(current, latest), newer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// where the installed build stands relative to the latest published release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStatus {
    /// installed build is ahead of the latest release (development or unreleased build).
    UnreleasedLocalBuild,
    UpdateAvailable,
    UpToDate,
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnreleasedLocalBuild => write!(f, "unreleased-local-build"),
            Self::UpdateAvailable => write!(f, "update-available"),
            Self::UpToDate => write!(f, "up-to-date"),
        }
    }
}

/// owns the comparison cache for one ui session.
#[derive(Debug, Default)]
pub struct VersionComparator {
    cache: ComparisonCache,
}

impl VersionComparator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache(&self) -> &ComparisonCache {
        &self.cache
    }

    /// returns true iff `current` is strictly newer than `latest`.
    pub fn is_newer(&mut self, current: &str, latest: &str) -> bool {
        if let Some(cached) = self.cache.get(current, latest) {
            return cached;
        }

        let newer = Version::parse(current) > Version::parse(latest);
        self.cache.insert(current, latest, newer);
        newer
    }

    /// the host's update flag can be stale when the local build is ahead of
    /// the published release, so "newer than latest" is checked first.
    pub fn classify(
        &mut self,
        installed: &str,
        host_says_update: bool,
        latest: Option<&str>,
    ) -> UpdateStatus {
        if latest.is_some_and(|latest| self.is_newer(installed, latest)) {
            UpdateStatus::UnreleasedLocalBuild
        } else if host_says_update {
            UpdateStatus::UpdateAvailable
        } else {
            UpdateStatus::UpToDate
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_prefix_and_suffix_letters() {
        assert_eq!(Version::parse("v2.3.10").segments(), &[2, 3, 10]);
        assert_eq!(Version::parse("V1.0").segments(), &[1, 0]);
        assert_eq!(Version::parse("1.0.2-Alpha").segments(), &[1, 0, 2, 0]);
        assert_eq!(Version::parse("1.0.2-rc3").segments(), &[1, 0, 2, 3]);
    }

    #[test]
    fn test_parse_malformed_degrades_to_zero() {
        assert_eq!(Version::parse("").segments(), &[0]);
        assert_eq!(Version::parse("banana").segments(), &[0]);
        assert_eq!(Version::parse("..").segments(), &[0, 0, 0]);
    }

    #[test]
    fn test_overflowing_segment_saturates() {
        assert_eq!(
            Version::parse("99999999999999999999999.1").segments(),
            &[u64::MAX, 1]
        );

        let mut comparator = VersionComparator::new();
        assert!(comparator.is_newer("99999999999999999999.0", "1.0"));
        assert!(!comparator.is_newer("1.0", "99999999999999999999.0"));
    }

    #[test]
    fn test_missing_segments_are_zero() {
        assert_eq!(Version::parse("1.2"), Version::parse("1.2.0"));
        assert!(Version::parse("1.2") < Version::parse("1.2.0.1"));
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
    }

    #[test]
    fn test_is_newer() {
        let mut comparator = VersionComparator::new();
        assert!(comparator.is_newer("1.2.1", "1.2.0"));
        assert!(!comparator.is_newer("1.2", "1.2.0"));
        assert!(comparator.is_newer("2.0.0", "1.9.9"));
        assert!(!comparator.is_newer("1.0.2-Alpha", "1.0.2-Alpha"));
        assert!(comparator.is_newer("v1.10.0", "1.9.0"));
    }

    #[test]
    fn test_is_newer_antisymmetric() {
        let pairs = [
            ("1.0.0", "1.0.1"),
            ("2.38.4", "v2.38.4"),
            ("1.0.2-Alpha", "1.0.2"),
            ("0.9", "0.10"),
            ("x", "1"),
        ];

        let mut comparator = VersionComparator::new();
        for (a, b) in pairs {
            let equal = Version::parse(a) == Version::parse(b);
            assert!(
                comparator.is_newer(a, b) == !comparator.is_newer(b, a) || equal,
                "{a} vs {b}"
            );
        }
    }

    #[test]
    fn test_cache_is_directional_and_idempotent() {
        let mut comparator = VersionComparator::new();
        assert!(comparator.is_newer("1.1", "1.0"));
        assert!(!comparator.is_newer("1.0", "1.1"));
        assert_eq!(comparator.cache().len(), 2);
        assert_eq!(comparator.cache().get("1.1", "1.0"), Some(true));
        assert_eq!(comparator.cache().get("1.0", "1.1"), Some(false));

        assert!(comparator.is_newer("1.1", "1.0"));
        assert_eq!(comparator.cache().len(), 2);
    }

    #[test]
    fn test_classify_unreleased_overrides_host_flag() {
        let mut comparator = VersionComparator::new();
        assert_eq!(
            comparator.classify("1.1.0", true, Some("1.0.2")),
            UpdateStatus::UnreleasedLocalBuild
        );
        assert_eq!(
            comparator.classify("1.0.0", true, Some("1.0.2")),
            UpdateStatus::UpdateAvailable
        );
        assert_eq!(
            comparator.classify("1.0.2", false, Some("1.0.2")),
            UpdateStatus::UpToDate
        );
    }

    #[test]
    fn test_classify_without_latest() {
        let mut comparator = VersionComparator::new();
        assert_eq!(
            comparator.classify("1.0.0", true, None),
            UpdateStatus::UpdateAvailable
        );
        assert_eq!(
            comparator.classify("1.0.0", false, None),
            UpdateStatus::UpToDate
        );
        assert!(comparator.cache().is_empty());
    }

    #[test]
    fn test_update_available() {
        assert!(is_update_available("2.36.0", "2.38.4"));
        assert!(!is_update_available("2.38.4", "v2.38.4"));
    }

    #[test]
    fn test_extract_semver() {
        assert_eq!(extract_semver("spicetify v2.38.4\r\n"), Some("2.38.4"));
        assert_eq!(extract_semver("2.38"), None);
        assert_eq!(extract_semver("Command failed"), None);
    }
}
