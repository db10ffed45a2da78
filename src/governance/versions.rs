//! Semantic versions and their mapping onto milestones and branches.
//!
//! Milestone titles (`6.6`, `6.6.0`, `7.0.0-RC1`) and maintenance branch names (`6.5.x`)
//! both encode a version; two of them correspond when major and minor agree.

use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

use crate::github::types::Milestone;

/// Suffix of a maintenance branch name standing for every patch release.
pub const PATCH_WILDCARD: &str = ".x";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{0}' is not a semantic version")]
pub struct VersionParseError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre_release: Option<String>,
}

fn version_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^v?(\d+)\.(\d+)(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.\-]*))?(?:\+[0-9A-Za-z.\-]+)?$")
                .ok()
        })
        .as_ref()
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            pre_release: None,
        }
    }

    /// The same version without its pre-release (`-SNAPSHOT`, `-RC1`) suffix.
    pub fn release(&self) -> Self {
        Self {
            pre_release: None,
            ..self.clone()
        }
    }

    pub fn same_minor_line(&self, other: &Version) -> bool {
        self.major == other.major && self.minor == other.minor
    }
}

impl FromStr for Version {
    type Err = VersionParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        let captures = version_pattern()
            .and_then(|pattern| pattern.captures(trimmed))
            .ok_or_else(|| VersionParseError(text.to_string()))?;

        let number = |index: usize| -> Result<u64, VersionParseError> {
            match captures.get(index) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| VersionParseError(text.to_string())),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            patch: number(3)?,
            pre_release: captures.get(4).map(|m| m.as_str().to_string()),
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.pre_release, &other.pre_release) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.cmp(b),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(pre) = &self.pre_release {
            write!(f, "-{pre}")?;
        }
        Ok(())
    }
}

/// Version encoded in a maintenance branch name; `.x` becomes the highest patch.
pub fn parse_branch_version(branch: &str) -> Option<Version> {
    let expanded = match branch.strip_suffix(PATCH_WILDCARD) {
        Some(prefix) => format!("{prefix}.{}", u64::MAX),
        None => branch.to_string(),
    };
    expanded.parse().ok()
}

pub fn milestone_version(milestone: &Milestone) -> Option<Version> {
    match milestone.title.parse::<Version>() {
        Ok(version) => Some(version),
        Err(e) => {
            debug!(milestone = %milestone.title, error = %e, "Ignoring milestone without a version title");
            None
        }
    }
}

/// First open milestone on the branch's `major.minor` line, in listing order.
pub fn resolve_milestone_for_branch<'a>(
    branch: &str,
    milestones: &'a [Milestone],
) -> Option<&'a Milestone> {
    let branch_version = parse_branch_version(branch)?;
    milestones.iter().filter(|m| m.is_open()).find(|m| {
        milestone_version(m).is_some_and(|v| v.same_minor_line(&branch_version))
    })
}

/// Milestones sorted by version then number; titles that do not parse sort last.
pub fn sort_milestones(milestones: &[Milestone]) -> Vec<&Milestone> {
    let mut sorted: Vec<&Milestone> = milestones.iter().collect();
    sorted.sort_by(|a, b| {
        match (milestone_version(a), milestone_version(b)) {
            (Some(va), Some(vb)) => va.cmp(&vb),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
        .then_with(|| a.number.cmp(&b.number))
    });
    sorted
}

/// Milestone tracking the mainline: the lowest open milestone on the current version's
/// `major.minor` line. Snapshot and other pre-release suffixes are ignored.
pub fn resolve_milestone_for_mainline<'a>(
    current_version: &Version,
    milestones: &'a [Milestone],
) -> Option<&'a Milestone> {
    let current = current_version.release();
    sort_milestones(milestones)
        .into_iter()
        .filter(|m| m.is_open())
        .find(|m| milestone_version(m).is_some_and(|v| v.same_minor_line(&current)))
}

/// Branch that carries the work of a milestone: the mainline for the mainline
/// milestone, otherwise `MAJOR.MINOR.x`.
pub fn resolve_branch_name_for_milestone(
    milestone: &Milestone,
    mainline_milestone: Option<&Milestone>,
    mainline_name: &str,
) -> Option<String> {
    if mainline_milestone.is_some_and(|m| m.number == milestone.number) {
        return Some(mainline_name.to_string());
    }
    let version = milestone_version(milestone)?;
    Some(format!(
        "{}.{}{PATCH_WILDCARD}",
        version.major, version.minor
    ))
}

/// Read a version property out of a `key=value` properties file.
pub fn parse_manifest_version(manifest: &str, key: &str) -> Option<Version> {
    manifest
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            Some((line[..split].trim(), line[split + 1..].trim()))
        })
        .find(|(name, _)| *name == key)
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::types::MilestoneState;

    fn milestones(titles: &[(u64, &str)]) -> Vec<Milestone> {
        titles.iter().map(|(n, t)| Milestone::open(*n, t)).collect()
    }

    #[test]
    fn test_parse_accepts_short_and_pre_release_versions() {
        assert_eq!("6.6".parse::<Version>().unwrap(), Version::new(6, 6, 0));
        let snapshot: Version = "7.0.0-SNAPSHOT".parse().unwrap();
        assert_eq!(snapshot.pre_release.as_deref(), Some("SNAPSHOT"));
        assert_eq!(snapshot.release(), Version::new(7, 0, 0));
        assert!("Backlog".parse::<Version>().is_err());
        assert!("6.x".parse::<Version>().is_err());
    }

    #[test]
    fn test_pre_release_sorts_before_release() {
        let rc: Version = "7.0.0-RC1".parse().unwrap();
        assert!(rc < Version::new(7, 0, 0));
        assert!(Version::new(6, 6, 9) < rc);
    }

    #[test]
    fn test_wildcard_branch_matches_its_minor_line_only() {
        let ms = milestones(&[(1, "6.5.3"), (2, "6.6.0")]);
        assert_eq!(resolve_milestone_for_branch("6.5.x", &ms).map(|m| m.number), Some(1));
        assert!(resolve_milestone_for_branch("6.4.x", &ms).is_none());
        assert!(resolve_milestone_for_branch("feature", &ms).is_none());
    }

    #[test]
    fn test_branch_resolution_keeps_listing_order_and_skips_closed() {
        let mut ms = milestones(&[(4, "6.5.4"), (3, "6.5.3")]);
        assert_eq!(resolve_milestone_for_branch("6.5.x", &ms).map(|m| m.number), Some(4));

        ms[0].state = MilestoneState::Closed;
        assert_eq!(resolve_milestone_for_branch("6.5.x", &ms).map(|m| m.number), Some(3));
    }

    #[test]
    fn test_mainline_milestone_is_lowest_on_current_line() {
        let ms = milestones(&[(9, "7.1.0"), (8, "7.0.1"), (7, "Backlog"), (6, "7.0.0-RC2")]);
        let current: Version = "7.0.0-SNAPSHOT".parse().unwrap();
        let found = resolve_milestone_for_mainline(&current, &ms).unwrap();
        assert_eq!(found.number, 6);

        let none = resolve_milestone_for_mainline(&Version::new(8, 0, 0), &ms);
        assert!(none.is_none());
    }

    #[test]
    fn test_unparseable_titles_sort_last() {
        let ms = milestones(&[(1, "Backlog"), (2, "6.6.0"), (3, "6.5.0")]);
        let order: Vec<u64> = sort_milestones(&ms).iter().map(|m| m.number).collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[test]
    fn test_branch_name_for_milestone() {
        let mainline = Milestone::open(10, "7.0.0");
        let maintenance = Milestone::open(11, "6.6.4");
        let backlog = Milestone::open(12, "Backlog");

        assert_eq!(
            resolve_branch_name_for_milestone(&mainline, Some(&mainline), "master").as_deref(),
            Some("master")
        );
        assert_eq!(
            resolve_branch_name_for_milestone(&maintenance, Some(&mainline), "master").as_deref(),
            Some("6.6.x")
        );
        assert!(resolve_branch_name_for_milestone(&backlog, None, "master").is_none());
    }

    #[test]
    fn test_manifest_version_lookup() {
        let manifest = "# build\ngroup=org.apereo.cas\nversion=7.1.0-SNAPSHOT\nsourceCompatibility = 21\n";
        let version = parse_manifest_version(manifest, "version").unwrap();
        assert_eq!(version.release(), Version::new(7, 1, 0));
        assert!(parse_manifest_version(manifest, "missing").is_none());
        assert!(parse_manifest_version("version=latest", "version").is_none());
    }
}
