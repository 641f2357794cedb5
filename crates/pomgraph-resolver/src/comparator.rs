//! Version selectors used to pick upgrade candidates from published
//! versions: exact versions, `latest.release`, `latest.integration`,
//! `latest.patch`, hyphen ranges (`1.2 - 1.3.5`), X-ranges (`1.2.x`, `*`),
//! caret ranges (`^1.2.3`) and tilde ranges (`~1.2.3`).
//!
//! Every selector can carry a metadata pattern (e.g. `-jre`) that a
//! candidate's qualifier must contain. Candidates that are not of the form
//! `major[.minor[.patch[.build]]][(-|.)qualifier]` are never valid.

use std::cmp::Ordering;
use std::fmt;

use pomgraph_core::failure::VersionSelectorInvalid;

use crate::version::MavenVersion;

/// Decides which published versions satisfy a selector.
pub trait VersionComparator: fmt::Debug + Send + Sync {
    /// Whether `candidate` satisfies the selector, given the version
    /// currently in use (if any).
    fn is_valid(&self, current: Option<&str>, candidate: &str) -> bool;

    /// Order two candidates; the greater one is preferred.
    fn compare(&self, _current: Option<&str>, a: &str, b: &str) -> Ordering {
        MavenVersion::parse(a).cmp(&MavenVersion::parse(b))
    }

    /// The greatest valid candidate strictly newer than `current`. When
    /// `current` is absent or malformed, the greatest valid candidate.
    fn upgrade(&self, current: Option<&str>, candidates: &[String]) -> Option<String> {
        let floor = current
            .filter(|c| NumericVersion::parse(c).is_some())
            .map(MavenVersion::parse);
        candidates
            .iter()
            .filter(|c| self.is_valid(current, c))
            .filter(|c| floor.as_ref().map_or(true, |f| MavenVersion::parse(c) > *f))
            .max_by(|a, b| self.compare(current, a, b))
            .cloned()
    }
}

/// Parse a selector. `metadata_pattern` further restricts candidates by
/// their qualifier.
pub fn parse_selector(
    selector: &str,
    metadata_pattern: Option<&str>,
) -> Result<Box<dyn VersionComparator>, VersionSelectorInvalid> {
    let invalid = || VersionSelectorInvalid {
        pattern: selector.to_string(),
    };
    let pattern = metadata_pattern
        .map(|p| p.trim_start_matches(['-', '.']).to_lowercase())
        .filter(|p| !p.is_empty());
    let s = selector.trim();

    let comparator: Box<dyn VersionComparator> = match s {
        "latest.release" => Box::new(LatestRelease { pattern }),
        "latest.integration" => Box::new(LatestIntegration { pattern }),
        "latest.patch" => Box::new(LatestPatch { pattern }),
        _ if s.starts_with('^') => Box::new(CaretRange {
            base: numeric_parts(&s[1..]).ok_or_else(invalid)?,
            pattern,
        }),
        _ if s.starts_with('~') => Box::new(TildeRange {
            base: numeric_parts(&s[1..]).ok_or_else(invalid)?,
            pattern,
        }),
        _ if s.contains(" - ") => {
            let (lower, upper) = s.split_once(" - ").ok_or_else(invalid)?;
            Box::new(HyphenRange {
                lower: numeric_parts(lower).ok_or_else(invalid)?,
                upper: numeric_parts(upper).ok_or_else(invalid)?,
                pattern,
            })
        }
        _ if s.split('.').any(is_wildcard) => Box::new(XRange {
            prefix: x_range_prefix(s).ok_or_else(invalid)?,
            pattern,
        }),
        _ => {
            NumericVersion::parse(s).ok_or_else(invalid)?;
            Box::new(ExactVersion {
                version: s.to_string(),
            })
        }
    };
    Ok(comparator)
}

/// The numeric view of a version used by selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NumericVersion {
    parts: Vec<u64>,
    qualifier: String,
}

impl NumericVersion {
    fn parse(version: &str) -> Option<Self> {
        let s = version.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        let bytes = s.as_bytes();
        let mut parts = Vec::new();
        let mut pos = 0;

        loop {
            let start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos == start {
                return None;
            }
            parts.push(s[start..pos].parse().ok()?);
            let next_is_digit = bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
            if bytes.get(pos) == Some(&b'.') && next_is_digit && parts.len() < 4 {
                pos += 1;
                continue;
            }
            break;
        }

        let rest = &s[pos..];
        let qualifier = match rest.chars().next() {
            None => "",
            Some('.' | '-' | '+') if rest.len() > 1 => &rest[1..],
            Some(_) => return None,
        };
        Some(Self {
            parts,
            qualifier: qualifier.to_string(),
        })
    }

    fn part(&self, i: usize) -> u64 {
        self.parts.get(i).copied().unwrap_or(0)
    }

    /// A release, or a version whose qualifier matches the metadata pattern.
    fn is_release(&self, pattern: Option<&str>) -> bool {
        match pattern {
            Some(p) => self.qualifier.to_lowercase().contains(p),
            None => {
                self.qualifier.is_empty()
                    || ["release", "final", "ga"]
                        .contains(&self.qualifier.to_lowercase().as_str())
            }
        }
    }
}

/// Compare numeric parts, treating missing parts as `0`.
fn cmp_parts(a: &[u64], b: &[u64]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            x.cmp(&y)
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// `base[..=index]` with its last part incremented: the exclusive upper
/// bound of a caret or tilde range. `None` when the part cannot be
/// incremented, which leaves the range unbounded above.
fn bump(base: &[u64], index: usize) -> Option<Vec<u64>> {
    let mut upper: Vec<u64> = base.iter().take(index + 1).copied().collect();
    while upper.len() <= index {
        upper.push(0);
    }
    upper[index] = upper[index].checked_add(1)?;
    Some(upper)
}

fn below(parts: &[u64], upper: Option<&[u64]>) -> bool {
    upper.map_or(true, |u| cmp_parts(parts, u) == Ordering::Less)
}

fn numeric_parts(s: &str) -> Option<Vec<u64>> {
    let v = NumericVersion::parse(s)?;
    v.qualifier.is_empty().then_some(v.parts)
}

fn is_wildcard(segment: &str) -> bool {
    matches!(segment, "x" | "X" | "*")
}

fn x_range_prefix(s: &str) -> Option<Vec<u64>> {
    let mut prefix = Vec::new();
    let mut segments = s.split('.');
    for segment in segments.by_ref() {
        if is_wildcard(segment) {
            break;
        }
        prefix.push(segment.parse().ok()?);
    }
    // Nothing but wildcards may follow the first wildcard.
    segments.all(is_wildcard).then_some(prefix)
}

fn within(candidate: &str, pattern: Option<&str>, accept: impl Fn(&NumericVersion) -> bool) -> bool {
    NumericVersion::parse(candidate).is_some_and(|v| v.is_release(pattern) && accept(&v))
}

#[derive(Debug)]
pub struct ExactVersion {
    version: String,
}

impl VersionComparator for ExactVersion {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        NumericVersion::parse(candidate).is_some()
            && MavenVersion::parse(candidate) == MavenVersion::parse(&self.version)
    }
}

#[derive(Debug)]
pub struct LatestRelease {
    pattern: Option<String>,
}

impl VersionComparator for LatestRelease {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        within(candidate, self.pattern.as_deref(), |_| true)
    }
}

/// Any well-formed version, pre-releases and snapshots included.
#[derive(Debug)]
pub struct LatestIntegration {
    pattern: Option<String>,
}

impl VersionComparator for LatestIntegration {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        NumericVersion::parse(candidate).is_some_and(|v| match self.pattern.as_deref() {
            Some(p) => v.qualifier.to_lowercase().contains(p),
            None => true,
        })
    }
}

/// Releases sharing the current major and minor version.
#[derive(Debug)]
pub struct LatestPatch {
    pattern: Option<String>,
}

impl VersionComparator for LatestPatch {
    fn is_valid(&self, current: Option<&str>, candidate: &str) -> bool {
        let Some(current) = current.and_then(NumericVersion::parse) else {
            return false;
        };
        within(candidate, self.pattern.as_deref(), |v| {
            v.part(0) == current.part(0) && v.part(1) == current.part(1)
        })
    }
}

/// `1.2 - 1.3.5`: inclusive bounds. A partial upper bound admits every
/// version it is a prefix of (`1.2 - 1.3` admits `1.3.9`).
#[derive(Debug)]
pub struct HyphenRange {
    lower: Vec<u64>,
    upper: Vec<u64>,
    pattern: Option<String>,
}

impl VersionComparator for HyphenRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        within(candidate, self.pattern.as_deref(), |v| {
            if cmp_parts(&v.parts, &self.lower) == Ordering::Less {
                return false;
            }
            if self.upper.len() >= 3 {
                cmp_parts(&v.parts, &self.upper) != Ordering::Greater
            } else {
                let exclusive = bump(&self.upper, self.upper.len().saturating_sub(1));
                below(&v.parts, exclusive.as_deref())
            }
        })
    }
}

/// `1.2.x`, `1.x`, `*`: every release sharing the given prefix.
#[derive(Debug)]
pub struct XRange {
    prefix: Vec<u64>,
    pattern: Option<String>,
}

impl VersionComparator for XRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        within(candidate, self.pattern.as_deref(), |v| {
            self.prefix.iter().enumerate().all(|(i, p)| v.part(i) == *p)
        })
    }
}

/// `^1.2.3`: changes that do not modify the left-most non-zero part.
#[derive(Debug)]
pub struct CaretRange {
    base: Vec<u64>,
    pattern: Option<String>,
}

impl VersionComparator for CaretRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let significant = self
            .base
            .iter()
            .position(|p| *p != 0)
            .unwrap_or(self.base.len().saturating_sub(1));
        let upper = bump(&self.base, significant);
        within(candidate, self.pattern.as_deref(), |v| {
            cmp_parts(&v.parts, &self.base) != Ordering::Less && below(&v.parts, upper.as_deref())
        })
    }
}

/// `~1.2.3`: patch-level changes (`~1` allows minor-level changes).
#[derive(Debug)]
pub struct TildeRange {
    base: Vec<u64>,
    pattern: Option<String>,
}

impl VersionComparator for TildeRange {
    fn is_valid(&self, _current: Option<&str>, candidate: &str) -> bool {
        let upper = bump(&self.base, self.base.len().saturating_sub(1).min(1));
        within(candidate, self.pattern.as_deref(), |v| {
            cmp_parts(&v.parts, &self.base) != Ordering::Less && below(&v.parts, upper.as_deref())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn valid(selector: &str, pattern: Option<&str>, current: Option<&str>, list: &[&str]) -> Vec<String> {
        let comparator = parse_selector(selector, pattern).unwrap();
        versions(list)
            .into_iter()
            .filter(|v| comparator.is_valid(current, v))
            .collect()
    }

    #[test]
    fn caret_range() {
        let candidates = ["1.2.3", "1.2.9", "1.9.0", "2.0.0"];
        assert_eq!(
            valid("^1.2.3", None, None, &candidates),
            versions(&["1.2.3", "1.2.9", "1.9.0"])
        );
        let caret = parse_selector("^1.2.3", None).unwrap();
        assert_eq!(
            caret.upgrade(Some("1.2.3"), &versions(&candidates)).as_deref(),
            Some("1.9.0")
        );
        assert_eq!(caret.upgrade(None, &versions(&candidates)).as_deref(), Some("1.9.0"));
    }

    #[test]
    fn caret_range_with_leading_zeros() {
        assert_eq!(
            valid("^0.2.3", None, None, &["0.2.3", "0.2.10", "0.3.0"]),
            versions(&["0.2.3", "0.2.10"])
        );
        assert_eq!(
            valid("^0.0.3", None, None, &["0.0.3", "0.0.4"]),
            versions(&["0.0.3"])
        );
    }

    #[test]
    fn tilde_range() {
        assert_eq!(
            valid("~1.2.3", None, None, &["1.2.2", "1.2.3", "1.2.8", "1.3.0"]),
            versions(&["1.2.3", "1.2.8"])
        );
        assert_eq!(
            valid("~1", None, None, &["1.0", "1.9.9", "2.0"]),
            versions(&["1.0", "1.9.9"])
        );
    }

    #[test]
    fn x_ranges() {
        assert_eq!(
            valid("1.2.x", None, None, &["1.1.9", "1.2", "1.2.7", "1.3.0"]),
            versions(&["1.2", "1.2.7"])
        );
        assert_eq!(
            valid("*", None, None, &["0.1", "9.9.9", "2.0-SNAPSHOT"]),
            versions(&["0.1", "9.9.9"])
        );
        assert!(parse_selector("1.x.2", None).is_err());
    }

    #[test]
    fn hyphen_range_with_partial_upper_bound() {
        assert_eq!(
            valid("1.2 - 1.3", None, None, &["1.1.9", "1.2.0", "1.3.9", "1.4.0"]),
            versions(&["1.2.0", "1.3.9"])
        );
        assert_eq!(
            valid("1.2 - 1.3.5", None, None, &["1.3.5", "1.3.6"]),
            versions(&["1.3.5"])
        );
    }

    #[test]
    fn latest_release_skips_prereleases() {
        let latest = parse_selector("latest.release", None).unwrap();
        let published = versions(&["1.0", "1.1.Final", "2.0-rc1", "2.0-SNAPSHOT", "bogus"]);
        assert_eq!(latest.upgrade(None, &published).as_deref(), Some("1.1.Final"));

        let integration = parse_selector("latest.integration", None).unwrap();
        assert_eq!(
            integration.upgrade(None, &published).as_deref(),
            Some("2.0-SNAPSHOT")
        );
    }

    #[test]
    fn metadata_pattern_filters_qualifier() {
        let published = ["31.1-jre", "31.1-android", "32.0.1-jre", "32.0.1"];
        assert_eq!(
            valid("latest.release", Some("-jre"), None, &published),
            versions(&["31.1-jre", "32.0.1-jre"])
        );
        assert_eq!(
            valid("32.x", Some("-jre"), None, &published),
            versions(&["32.0.1-jre"])
        );
    }

    #[test]
    fn latest_patch_stays_on_minor() {
        let patch = parse_selector("latest.patch", None).unwrap();
        let published = versions(&["1.2.3", "1.2.5", "1.3.0"]);
        assert_eq!(patch.upgrade(Some("1.2.3"), &published).as_deref(), Some("1.2.5"));
        assert!(!patch.is_valid(None, "1.2.5"));
    }

    #[test]
    fn upgrade_requires_strictly_newer() {
        let exact = parse_selector("1.2.3", None).unwrap();
        assert!(exact.is_valid(None, "1.2.3"));
        assert!(exact.is_valid(None, "1.2.3.0"));
        assert_eq!(exact.upgrade(Some("1.2.3"), &versions(&["1.2.3"])), None);
        assert_eq!(exact.upgrade(Some("1.0"), &versions(&["1.2.3"])).as_deref(), Some("1.2.3"));
    }

    #[test]
    fn largest_part_leaves_range_open_above() {
        let caret = parse_selector("^18446744073709551615", None).unwrap();
        assert!(!caret.is_valid(None, "1.0"));
        assert!(caret.is_valid(None, "18446744073709551615.2"));

        let hyphen = parse_selector("1 - 18446744073709551615", None).unwrap();
        assert!(hyphen.is_valid(None, "1.0"));
        assert!(hyphen.is_valid(None, "18446744073709551615.9"));
        assert!(!hyphen.is_valid(None, "0.9"));

        let tilde = parse_selector("~1.18446744073709551615", None).unwrap();
        assert!(tilde.is_valid(None, "1.18446744073709551615.3"));
        assert!(!tilde.is_valid(None, "1.2"));
    }

    #[test]
    fn malformed_versions_are_never_valid() {
        for selector in ["latest.release", "latest.integration", "*", "^1", "~1", "1 - 2"] {
            let comparator = parse_selector(selector, None).unwrap();
            for candidate in ["", "abc", "1..2", "v", "1.0_beta"] {
                assert!(
                    !comparator.is_valid(Some("1.0"), candidate),
                    "{selector} accepted {candidate:?}"
                );
            }
        }
    }

    #[test]
    fn invalid_selectors() {
        for selector in ["^foo", "~", "one - two", "", "1.0_x"] {
            let err = parse_selector(selector, None).unwrap_err();
            assert_eq!(err.pattern, selector);
        }
    }
}
