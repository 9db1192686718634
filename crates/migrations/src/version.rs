use crate::MigrationError;
use std::fmt;
use std::str::FromStr;

/// Release version recorded in `roller.toml`.
///
/// Ordering is lexicographic over (major, minor, patch). Pre-release tags and
/// commit ids are accepted when parsing and then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VersionData {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl VersionData {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl FromStr for VersionData {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || MigrationError::InvalidVersion(s.to_string());

        // "v0.1.12-rc1 3f2a9c" -> "0.1.12"
        let core = s
            .split_ascii_whitespace()
            .next()
            .ok_or_else(invalid)?
            .trim_start_matches('v');
        let core = core.split(['-', '+']).next().unwrap_or_default();

        let parts = core
            .split('.')
            .map(|p| p.parse::<u32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match parts.as_slice() {
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for VersionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(
            "0.1.12".parse::<VersionData>().unwrap(),
            VersionData::new(0, 1, 12)
        );
        assert_eq!(
            "v0.1.10".parse::<VersionData>().unwrap(),
            VersionData::new(0, 1, 10)
        );
        assert_eq!(
            "v1.2.3-rc1 3f2a9c".parse::<VersionData>().unwrap(),
            VersionData::new(1, 2, 3)
        );
        assert!("".parse::<VersionData>().is_err());
        assert!("0.1".parse::<VersionData>().is_err());
        assert!("0.x.1".parse::<VersionData>().is_err());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        let v = |s: &str| s.parse::<VersionData>().unwrap();
        assert!(v("0.1.10") < v("0.1.12"));
        assert!(v("0.1.12") < v("0.2.0"));
        assert!(v("0.2.0") < v("2.0.0"));
        assert!(v("0.0.99") < v("0.1.0"));
        assert_eq!(v("v0.1.12").to_string(), "0.1.12");
    }
}
