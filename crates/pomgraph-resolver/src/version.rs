//! Maven versions: ordering, ranges, and choosing a dynamic version
//! (range, `LATEST`, `RELEASE`) from the versions a repository publishes.
//!
//! Ordering rules:
//! - A version splits into tokens at `.` and `-` and wherever digits meet
//!   other characters, so `1.0-rc1` reads as `1 0 rc 1`.
//! - Numbers compare numerically. A missing token counts as `0` or a plain
//!   release, so `1.0`, `1.0.0` and `1.0.Final` are equal.
//! - Qualifiers rank `alpha` < `beta` < `milestone` < `rc` < `snapshot` <
//!   release < `sp`. `a`, `b` and `m` abbreviate the first three, `cr` is
//!   `rc`, and `ga`, `final` and `release` mean a plain release.
//! - Unknown text (`jre`, `android`) sorts after every pre-release qualifier
//!   and before a release; two texts compare case-insensitively.
//! - A number outranks any qualifier or text in the same position.

use std::cmp::Ordering;
use std::fmt;

/// A parsed Maven version. Equality follows the ordering, so `1.0 == 1.0.0`.
#[derive(Debug, Clone)]
pub struct MavenVersion {
    pub original: String,
    tokens: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Number(u64),
    Qualifier(Rank),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Rank {
    Alpha,
    Beta,
    Milestone,
    Rc,
    Snapshot,
    Release,
    ServicePack,
}

impl Token {
    fn read(token: &str) -> Self {
        if let Ok(n) = token.parse() {
            return Self::Number(n);
        }
        let rank = match token.to_ascii_lowercase().as_str() {
            "alpha" | "a" => Rank::Alpha,
            "beta" | "b" => Rank::Beta,
            "milestone" | "m" => Rank::Milestone,
            "rc" | "cr" => Rank::Rc,
            "snapshot" => Rank::Snapshot,
            "ga" | "final" | "release" => Rank::Release,
            "sp" => Rank::ServicePack,
            _ => return Self::Text(token.to_string()),
        };
        Self::Qualifier(rank)
    }

    /// Compare against a position the other version does not have.
    fn cmp_missing(&self) -> Ordering {
        match self {
            Self::Number(n) => n.cmp(&0),
            Self::Qualifier(rank) => rank.cmp(&Rank::Release),
            Self::Text(_) => Ordering::Less,
        }
    }

    fn cmp_token(&self, other: &Self) -> Ordering {
        use Token::*;
        match (self, other) {
            (Number(a), Number(b)) => a.cmp(b),
            (Number(_), _) => Ordering::Greater,
            (_, Number(_)) => Ordering::Less,
            (Qualifier(a), Qualifier(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
            (Qualifier(rank), Text(_)) if *rank >= Rank::Release => Ordering::Greater,
            (Qualifier(_), Text(_)) => Ordering::Less,
            (Text(_), Qualifier(rank)) if *rank >= Rank::Release => Ordering::Less,
            (Text(_), Qualifier(_)) => Ordering::Greater,
        }
    }
}

fn tokenize(version: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut digits = false;

    for ch in version.trim().chars() {
        if ch == '.' || ch == '-' {
            if !current.is_empty() {
                tokens.push(Token::read(&current));
                current.clear();
            }
            continue;
        }
        if !current.is_empty() && ch.is_ascii_digit() != digits {
            tokens.push(Token::read(&current));
            current.clear();
        }
        digits = ch.is_ascii_digit();
        current.push(ch);
    }
    if !current.is_empty() {
        tokens.push(Token::read(&current));
    }
    tokens
}

impl MavenVersion {
    pub fn parse(version: &str) -> Self {
        Self {
            original: version.to_string(),
            tokens: tokenize(version),
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }

    /// The version without its `-SNAPSHOT` suffix.
    pub fn base_version(&self) -> &str {
        self.original
            .strip_suffix("-SNAPSHOT")
            .unwrap_or(&self.original)
    }
}

impl fmt::Display for MavenVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for MavenVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.tokens.len().max(other.tokens.len());
        (0..len)
            .map(|i| match (self.tokens.get(i), other.tokens.get(i)) {
                (Some(a), Some(b)) => a.cmp_token(b),
                (Some(a), None) => a.cmp_missing(),
                (None, Some(b)) => b.cmp_missing().reverse(),
                (None, None) => Ordering::Equal,
            })
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for MavenVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MavenVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MavenVersion {}

/// A Maven version range expression.
///
/// Supports: `[1.0,2.0)`, `[1.0,]`, `(,2.0)`, `[1.0]` (exact). Unions such as
/// `[1.0,2.0),[3.0,)` are parsed with [`parse_ranges`].
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone)]
pub struct Bound {
    pub version: MavenVersion,
    pub inclusive: bool,
}

impl VersionRange {
    /// Parse one bracketed range: `[1.0,2.0)`, `(,2.0]`, `[1.0,)` or the
    /// exact form `[1.0]`. Returns `None` for anything else, bare versions
    /// included.
    pub fn parse(text: &str) -> Option<Self> {
        let s = text.trim();
        let lower_inclusive = match s.chars().next()? {
            '[' => true,
            '(' => false,
            _ => return None,
        };
        let upper_inclusive = match s.chars().last()? {
            ']' => true,
            ')' => false,
            _ => return None,
        };
        let inner = s.get(1..s.len() - 1)?;

        let bound = |text: &str, inclusive: bool| {
            let text = text.trim();
            (!text.is_empty()).then(|| Bound {
                version: MavenVersion::parse(text),
                inclusive,
            })
        };
        match inner.split_once(',') {
            Some((lower, upper)) => Some(Self {
                lower: bound(lower, lower_inclusive),
                upper: bound(upper, upper_inclusive),
            }),
            None => {
                let exact = bound(inner, true)?;
                Some(Self {
                    lower: Some(exact.clone()),
                    upper: Some(exact),
                })
            }
        }
    }

    /// The version a range falls back to when no published version list is
    /// available: its lower bound, or an inclusive upper bound.
    pub fn fallback_version(&self) -> Option<&MavenVersion> {
        match (&self.lower, &self.upper) {
            (Some(lower), _) => Some(&lower.version),
            (None, Some(upper)) if upper.inclusive => Some(&upper.version),
            _ => None,
        }
    }

    pub fn contains(&self, version: &MavenVersion) -> bool {
        let above = self.lower.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Greater => true,
            Ordering::Equal => b.inclusive,
            Ordering::Less => false,
        });
        let below = self.upper.as_ref().map_or(true, |b| match version.cmp(&b.version) {
            Ordering::Less => true,
            Ordering::Equal => b.inclusive,
            Ordering::Greater => false,
        });
        above && below
    }
}

/// Parse a single range or a comma-separated union of ranges.
///
/// Returns `None` if `text` is not a range expression.
pub fn parse_ranges(text: &str) -> Option<Vec<VersionRange>> {
    let mut rest = text.trim();
    let mut ranges = Vec::new();
    while !rest.is_empty() {
        let end = rest.find([']', ')'])?;
        ranges.push(VersionRange::parse(&rest[..=end])?);
        rest = rest[end + 1..].trim_start();
        if let Some(next) = rest.strip_prefix(',') {
            rest = next.trim_start();
        } else if !rest.is_empty() {
            return None;
        }
    }
    (!ranges.is_empty()).then_some(ranges)
}

/// A version that must be chosen from the versions a repository publishes.
#[derive(Debug, Clone)]
pub enum DynamicVersion {
    /// One or more Maven ranges; the highest contained release wins.
    Ranges(Vec<VersionRange>),
    /// `LATEST` or `latest.integration`: the newest version, snapshots included.
    Latest,
    /// `RELEASE` or `latest.release`: the newest non-SNAPSHOT version.
    Release,
}

impl DynamicVersion {
    /// Returns `None` for plain (fixed) versions.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "LATEST" | "latest.integration" => Some(Self::Latest),
            "RELEASE" | "latest.release" => Some(Self::Release),
            other => parse_ranges(other).map(Self::Ranges),
        }
    }

    /// Choose from published versions. `latest` and `release` are the
    /// metadata markers, used when no version list is published.
    pub fn select(
        &self,
        versions: &[String],
        latest: Option<&str>,
        release: Option<&str>,
    ) -> Option<String> {
        let candidates = versions.iter().map(|v| MavenVersion::parse(v));
        let best = match self {
            Self::Ranges(ranges) => candidates
                .filter(|v| !v.is_snapshot() && ranges.iter().any(|r| r.contains(v)))
                .max(),
            Self::Latest => candidates.max(),
            Self::Release => candidates.filter(|v| !v.is_snapshot()).max(),
        };
        best.map(|v| v.original).or_else(|| match self {
            Self::Ranges(_) => None,
            Self::Latest => latest.or(release).map(str::to_string),
            Self::Release => release.map(str::to_string),
        })
    }

    /// What to use when the published versions cannot be obtained.
    pub fn fallback(&self) -> Option<String> {
        match self {
            Self::Ranges(ranges) => ranges
                .iter()
                .find_map(|r| r.fallback_version())
                .map(|v| v.original.clone()),
            Self::Latest | Self::Release => None,
        }
    }
}
