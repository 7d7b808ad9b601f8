//! Application version stamps and the per-step version gate.
//!
//! # Responsibility
//! - Parse `MAJOR.MINOR.PATCH[<qualifier><number>]` stamps (`1.0.0b5`, `2.1.12`).
//! - Decide whether a version-gated migration step must run for a document.
//!
//! # Invariants
//! - A release sorts after every pre-release of the same triplet.
//! - Pre-releases of one triplet order by their number alone, so `1.0.0b6`
//!   sorts before `1.0.0a16`. The qualifier letter only breaks ties.
//! - Absent or malformed document stamps always trigger migration.
//! - Gate evaluation is pure.

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Application version this build writes and migrates towards.
pub const CURRENT_VERSION: &str = "2.1.12";

static VERSION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\.(\d+)\.(\d+)(?:-?([A-Za-z]+)\.?(\d*))?$").expect("valid version regex")
});

/// Version stamp parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionParseError(pub String);

impl Display for VersionParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "malformed version stamp: `{}`", self.0)
    }
}

impl Error for VersionParseError {}

/// Pre-release qualifier such as `b5` or `a16`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreRelease {
    pub tag: String,
    pub number: u64,
}

impl Ord for PreRelease {
    fn cmp(&self, other: &Self) -> Ordering {
        self.number
            .cmp(&other.number)
            .then_with(|| self.tag.cmp(&other.tag))
    }
}

impl PartialOrd for PreRelease {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Parsed application version stamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AppVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Option<PreRelease>,
}

impl AppVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre: None,
        }
    }

    /// Returns the version this build targets.
    pub fn current() -> Self {
        CURRENT_VERSION
            .parse()
            .expect("CURRENT_VERSION must be a valid version stamp")
    }

    pub fn is_pre_release(&self) -> bool {
        self.pre.is_some()
    }
}

impl FromStr for AppVersion {
    type Err = VersionParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let caps = VERSION_RE
            .captures(trimmed)
            .ok_or_else(|| VersionParseError(value.to_string()))?;
        let number = |index: usize| -> Result<u64, VersionParseError> {
            caps[index]
                .parse::<u64>()
                .map_err(|_| VersionParseError(value.to_string()))
        };

        let pre = match caps.get(4) {
            Some(tag) => {
                let digits = caps.get(5).map_or("", |m| m.as_str());
                let number = if digits.is_empty() {
                    0
                } else {
                    digits
                        .parse::<u64>()
                        .map_err(|_| VersionParseError(value.to_string()))?
                };
                Some(PreRelease {
                    tag: tag.as_str().to_ascii_lowercase(),
                    number,
                })
            }
            None => None,
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre,
        })
    }
}

impl Display for AppVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre {
            write!(f, "{}{}", pre.tag, pre.number)?;
        }
        Ok(())
    }
}

impl Ord for AppVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre, &other.pre) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for AppVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Returns whether a step gated at `threshold` must run for a document
/// stamped with `document_version`.
///
/// Absent and unparsable stamps are treated as older than every threshold.
pub fn should_run(document_version: Option<&str>, threshold: &AppVersion) -> bool {
    match document_version.map(str::parse::<AppVersion>) {
        None => true,
        Some(Err(err)) => {
            log::debug!(
                "event=version_gate module=version status=fallback reason=malformed error={}",
                err
            );
            true
        }
        Some(Ok(version)) => version <= *threshold,
    }
}

#[cfg(test)]
mod tests {
    use super::{should_run, AppVersion, PreRelease, CURRENT_VERSION};

    fn v(value: &str) -> AppVersion {
        value.parse().expect("test version should parse")
    }

    #[test]
    fn parses_release_and_pre_release_stamps() {
        assert_eq!(v("2.1.12"), AppVersion::new(2, 1, 12));
        assert_eq!(
            v("1.0.0b5").pre,
            Some(PreRelease {
                tag: "b".to_string(),
                number: 5
            })
        );
        assert_eq!(v(" 1.0.0a16 ").to_string(), "1.0.0a16");
        assert!(v("2.0.12b1").is_pre_release());
    }

    #[test]
    fn rejects_malformed_stamps() {
        assert!("".parse::<AppVersion>().is_err());
        assert!("1.0".parse::<AppVersion>().is_err());
        assert!("one.two.three".parse::<AppVersion>().is_err());
        assert!("1.0.0b5x".parse::<AppVersion>().is_err());
    }

    #[test]
    fn orders_pre_releases_before_release() {
        assert!(v("1.0.0b5") < v("1.0.0b7"));
        assert!(v("1.0.0b7") < v("1.0.0"));
        assert!(v("1.0.0b5") < v("1.0.0a16"));
        assert!(v("1.0.0a2") < v("1.0.0a16"));
        assert!(v("1.0.0a6") < v("1.0.0b6"));
        assert!(v("1.9.9") < v("1.10.0"));
        assert!(v("2.0.12b1") < v("2.0.12"));
    }

    #[test]
    fn gate_runs_for_absent_and_malformed_stamps() {
        let threshold = v("1.0.0b5");
        assert!(should_run(None, &threshold));
        assert!(should_run(Some("not-a-version"), &threshold));
    }

    #[test]
    fn gate_is_inclusive_of_threshold() {
        let threshold = v("1.2.8");
        assert!(should_run(Some("1.2.7"), &threshold));
        assert!(should_run(Some("1.2.8"), &threshold));
        assert!(should_run(Some("1.2.8b3"), &threshold));
        assert!(!should_run(Some("1.2.9"), &threshold));
        assert!(!should_run(Some(CURRENT_VERSION), &threshold));
    }

    #[test]
    fn gate_compares_pre_release_numbers_across_letters() {
        let threshold = v("1.0.0a16");
        assert!(should_run(Some("1.0.0b6"), &threshold));
        assert!(!should_run(Some("1.0.0a17"), &threshold));
        assert!(!should_run(Some("1.0.0b17"), &threshold));
        assert!(!should_run(Some("1.0.0"), &threshold));
    }
}
