// projeto: lstmmodelstore
// file: src/storage/version.rs
// Version directory names: v<major>.<minor>.<patch>_<YYYYMMDD>_<HHMMSS>

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::storage::utils::StoreError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemVer {
    pub const INITIAL: SemVer = SemVer { major: 1, minor: 0, patch: 0 };

    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        SemVer { major, minor, patch }
    }

    pub fn bump(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => SemVer::new(self.major + 1, 0, 0),
            BumpKind::Minor => SemVer::new(self.major, self.minor + 1, 0),
            BumpKind::Patch => SemVer::new(self.major, self.minor, self.patch + 1),
        }
    }
}

impl fmt::Display for SemVer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn parse_component(part: &str, whole: &str) -> Result<u64, StoreError> {
    // u64::from_str accepts a leading '+', directory names must not
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::InvalidVersion(whole.to_string()));
    }
    part.parse::<u64>()
        .map_err(|_| StoreError::InvalidVersion(whole.to_string()))
}

fn parse_triplet(body: &str, whole: &str) -> Result<SemVer, StoreError> {
    let parts: Vec<&str> = body.split('.').collect();
    if parts.len() != 3 {
        return Err(StoreError::InvalidVersion(whole.to_string()));
    }
    Ok(SemVer {
        major: parse_component(parts[0], whole)?,
        minor: parse_component(parts[1], whole)?,
        patch: parse_component(parts[2], whole)?,
    })
}

impl FromStr for SemVer {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_triplet(s.strip_prefix('v').unwrap_or(s), s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BumpKind {
    Major,
    #[default]
    Minor,
    Patch,
}

/// Identifies one version directory of an index.
///
/// Ordering is by semantic version first, then by creation time, so two
/// directories that share a semver still sort deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionTag {
    pub semver: SemVer,
    pub created_at: NaiveDateTime,
}

impl VersionTag {
    pub fn new(semver: SemVer, created_at: NaiveDateTime) -> Self {
        // Directory names only carry whole seconds
        let created_at = created_at.with_nanosecond(0).unwrap_or(created_at);
        VersionTag { semver, created_at }
    }

    pub fn dir_name(&self) -> String {
        format!("v{}_{}", self.semver, self.created_at.format(TIMESTAMP_FORMAT))
    }

    pub fn parse(dir_name: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidVersion(dir_name.to_string());

        let body = dir_name.strip_prefix('v').ok_or_else(invalid)?;
        let (semver_part, stamp) = body.split_once('_').ok_or_else(invalid)?;
        let semver = parse_triplet(semver_part, dir_name)?;

        // %Y accepts signs and variable widths; pin the shape first
        let bytes = stamp.as_bytes();
        let well_formed = bytes.len() == 15
            && bytes[8] == b'_'
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| i == 8 || b.is_ascii_digit());
        if !well_formed {
            return Err(invalid());
        }

        let created_at =
            NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).map_err(|_| invalid())?;
        Ok(VersionTag { semver, created_at })
    }

    pub fn next(latest: Option<&VersionTag>, kind: BumpKind, now: NaiveDateTime) -> VersionTag {
        let semver = match latest {
            Some(tag) => tag.semver.bump(kind),
            None => SemVer::INITIAL,
        };
        VersionTag::new(semver, now)
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dir_name())
    }
}

impl FromStr for VersionTag {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionTag::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_dir_name_format_and_parse() {
        let tag = VersionTag::new(SemVer::new(1, 2, 0), at(2025, 3, 14, 9, 30, 15));
        assert_eq!(tag.dir_name(), "v1.2.0_20250314_093015");

        let parsed = VersionTag::parse("v1.2.0_20250314_093015").unwrap();
        assert_eq!(parsed, tag);
    }

    #[test]
    fn test_rejects_malformed_names() {
        for name in [
            "1.2.0_20250314_093015",
            "v1.2_20250314_093015",
            "v1.2.0.1_20250314_093015",
            "v1.x.0_20250314_093015",
            "v+1.2.0_20250314_093015",
            "vv1.2.0_20250314_093015",
            "v1.2.0",
            "v1.2.0_20251314_093015",
            "v1.2.0_20250314-093015",
            "v1.2.0_2025031_093015",
            "v1.2.0_20250314_093015_extra",
            "",
        ] {
            assert!(VersionTag::parse(name).is_err(), "accepted {name}");
        }
    }

    #[test]
    fn test_ordering_semver_then_time() {
        let older = VersionTag::new(SemVer::new(1, 10, 0), at(2024, 1, 1, 0, 0, 0));
        let newer = VersionTag::new(SemVer::new(1, 9, 0), at(2025, 1, 1, 0, 0, 0));
        assert!(older > newer);

        let a = VersionTag::new(SemVer::new(2, 0, 0), at(2024, 1, 1, 0, 0, 0));
        let b = VersionTag::new(SemVer::new(2, 0, 0), at(2024, 1, 1, 0, 0, 1));
        assert!(b > a);
    }

    #[test]
    fn test_bump() {
        let v = SemVer::new(1, 4, 2);
        assert_eq!(v.bump(BumpKind::Major), SemVer::new(2, 0, 0));
        assert_eq!(v.bump(BumpKind::Minor), SemVer::new(1, 5, 0));
        assert_eq!(v.bump(BumpKind::Patch), SemVer::new(1, 4, 3));
    }

    #[test]
    fn test_next_starts_at_initial() {
        let now = at(2025, 6, 1, 12, 0, 0);
        let first = VersionTag::next(None, BumpKind::Major, now);
        assert_eq!(first.semver, SemVer::INITIAL);

        let second = VersionTag::next(Some(&first), BumpKind::Patch, now);
        assert_eq!(second.semver, SemVer::new(1, 0, 1));
    }

    #[test]
    fn test_semver_from_str() {
        assert_eq!("v3.1.4".parse::<SemVer>().unwrap(), SemVer::new(3, 1, 4));
        assert_eq!("0.0.1".parse::<SemVer>().unwrap(), SemVer::new(0, 0, 1));
        assert!("1.2".parse::<SemVer>().is_err());
        assert!("1.2.-3".parse::<SemVer>().is_err());
    }

    #[test]
    fn test_new_truncates_subseconds() {
        let precise = at(2025, 1, 1, 0, 0, 0).with_nanosecond(500_000_000).unwrap();
        let tag = VersionTag::new(SemVer::INITIAL, precise);
        assert_eq!(VersionTag::parse(&tag.dir_name()).unwrap(), tag);
    }
}
