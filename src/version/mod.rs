//! Semantic version selection
//!
//! Candidates are raw strings as reported by a repository. Parsing is
//! lenient: a leading `v` is accepted and short forms like `1` or `1.2`
//! are padded to three components. The original string of the winning
//! candidate is returned, never a re-serialized form.

use crate::domain::VersionConstraint;
use crate::error::ResolveError;
use semver::Version;
use std::cmp::Ordering;
use tracing::{debug, warn};

/// A repository version string paired with its parsed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionCandidate<'a> {
    pub raw: &'a str,
    pub version: Version,
}

impl<'a> VersionCandidate<'a> {
    /// Returns `None` when `raw` is not a usable version
    pub fn parse(raw: &'a str) -> Option<Self> {
        parse_lenient(raw).map(|version| Self { raw, version })
    }

    fn is_newer_than(&self, other: &Version) -> bool {
        compare(&self.version, other) == Ordering::Greater
    }
}

/// Outcome of a constraint-aware selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintResult {
    /// Latest version within the constraint, or the current version
    pub latest_within_constraint: String,
    /// Latest valid version ignoring the constraint
    pub latest_unconstrained: String,
    /// A version outside the constraint differs from the selected one
    pub has_update_outside_constraint: bool,
    /// The current version did not parse and the constraint was not applied
    pub constraint_ignored: bool,
}

/// Parses a version string, accepting a `v` prefix and missing components
pub fn parse_lenient(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, rest) = trimmed.split_at(split);
    let padded = match core.split('.').count() {
        1 => format!("{}.0.0{}", core, rest),
        2 => format!("{}.0{}", core, rest),
        _ => return None,
    };
    Version::parse(&padded).ok()
}

/// Compares two parsed versions by semantic version precedence
///
/// Build metadata does not participate.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    a.cmp_precedence(b)
}

/// Returns the original string of the highest valid candidate
///
/// Among candidates of equal precedence the first one in input order wins.
pub fn select_latest<S: AsRef<str>>(candidates: &[S]) -> Result<String, ResolveError> {
    if candidates.is_empty() {
        return Err(ResolveError::EmptyInput);
    }
    let valid = valid_candidates(candidates);
    max_of(&valid)
        .map(|candidate| candidate.raw.to_string())
        .ok_or(ResolveError::NoValidVersions)
}

/// Selects the latest version honoring a constraint relative to `current`
///
/// When `current` is not a valid version the constraint is ignored and both
/// fields hold the overall latest version.
pub fn select_latest_with_constraint<S: AsRef<str>>(
    candidates: &[S],
    current: &str,
    constraint: VersionConstraint,
) -> Result<ConstraintResult, ResolveError> {
    if candidates.is_empty() {
        return Err(ResolveError::EmptyInput);
    }

    let Some(current_version) = parse_lenient(current) else {
        warn!(
            current_version = %current,
            constraint = %constraint,
            "current version is not valid semver, checking all versions"
        );
        let latest = select_latest(candidates)?;
        return Ok(ConstraintResult {
            latest_within_constraint: latest.clone(),
            latest_unconstrained: latest,
            has_update_outside_constraint: false,
            constraint_ignored: true,
        });
    };

    let valid = valid_candidates(candidates);
    let Some(latest_all) = max_of(&valid) else {
        return Err(ResolveError::NoValidVersions);
    };

    let constrained: Vec<VersionCandidate<'_>> = valid
        .iter()
        .filter(|c| matches_constraint(&c.version, &current_version, constraint))
        .cloned()
        .collect();

    let Some(latest_constrained) = max_of(&constrained) else {
        return Ok(ConstraintResult {
            latest_within_constraint: current.to_string(),
            latest_unconstrained: latest_all.raw.to_string(),
            has_update_outside_constraint: latest_all.raw != current,
            constraint_ignored: false,
        });
    };

    let latest_within_constraint = if latest_constrained.is_newer_than(&current_version) {
        latest_constrained.raw.to_string()
    } else {
        current.to_string()
    };

    let has_update_outside_constraint = constraint.is_restrictive()
        && latest_all.is_newer_than(&current_version)
        && latest_all.is_newer_than(&latest_constrained.version);

    Ok(ConstraintResult {
        latest_within_constraint,
        latest_unconstrained: latest_all.raw.to_string(),
        has_update_outside_constraint,
        constraint_ignored: false,
    })
}

fn matches_constraint(candidate: &Version, current: &Version, constraint: VersionConstraint) -> bool {
    match constraint {
        VersionConstraint::Patch => {
            candidate.major == current.major && candidate.minor == current.minor
        }
        VersionConstraint::Minor => candidate.major == current.major,
        VersionConstraint::Major => true,
    }
}

fn valid_candidates<S: AsRef<str>>(candidates: &[S]) -> Vec<VersionCandidate<'_>> {
    candidates
        .iter()
        .filter_map(|raw| {
            let candidate = VersionCandidate::parse(raw.as_ref());
            if candidate.is_none() {
                debug!(version = %raw.as_ref(), "skipping invalid semantic version");
            }
            candidate
        })
        .collect()
}

fn max_of<'a, 'b>(candidates: &'b [VersionCandidate<'a>]) -> Option<&'b VersionCandidate<'a>> {
    let mut best: Option<&VersionCandidate<'a>> = None;
    for candidate in candidates {
        match best {
            Some(current) if !candidate.is_newer_than(&current.version) => {}
            _ => best = Some(candidate),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_lenient() {
        assert_eq!(parse_lenient("1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_lenient("v1.2.3"), Some(Version::new(1, 2, 3)));
        assert_eq!(parse_lenient("1.2"), Some(Version::new(1, 2, 0)));
        assert_eq!(parse_lenient("2"), Some(Version::new(2, 0, 0)));
        assert_eq!(
            parse_lenient("1.2-rc.1").map(|v| v.to_string()),
            Some("1.2.0-rc.1".to_string())
        );
        assert!(parse_lenient("latest").is_none());
        assert!(parse_lenient("").is_none());
        assert!(parse_lenient("1.2.3.4").is_none());
    }

    #[test]
    fn test_candidate_parse() {
        let candidate = VersionCandidate::parse("v1.0").unwrap();
        assert_eq!(candidate.raw, "v1.0");
        assert_eq!(candidate.version, Version::new(1, 0, 0));
        assert!(VersionCandidate::parse("main").is_none());
    }

    #[test]
    fn test_select_latest_basic() {
        let latest = select_latest(&["1.0.0", "1.0.1", "1.0.2"]).unwrap();
        assert_eq!(latest, "1.0.2");
    }

    #[test]
    fn test_select_latest_returns_original_string() {
        let latest = select_latest(&["v1.0.0", "v2.1"]).unwrap();
        assert_eq!(latest, "v2.1");
    }

    #[test]
    fn test_select_latest_numeric_ordering() {
        let latest = select_latest(&["1.9.0", "1.10.0", "1.2.0"]).unwrap();
        assert_eq!(latest, "1.10.0");
    }

    #[test]
    fn test_select_latest_prerelease_is_lower() {
        let latest = select_latest(&["2.0.0-rc.1", "2.0.0", "2.0.0-beta"]).unwrap();
        assert_eq!(latest, "2.0.0");
    }

    #[test]
    fn test_select_latest_tie_first_wins() {
        assert_eq!(select_latest(&["1.0", "1.0.0"]).unwrap(), "1.0");
        assert_eq!(select_latest(&["1.0.0", "v1.0.0"]).unwrap(), "1.0.0");
        assert_eq!(select_latest(&["1.0.0+b2", "1.0.0+b1"]).unwrap(), "1.0.0+b2");
    }

    #[test]
    fn test_select_latest_empty() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(select_latest(&empty), Err(ResolveError::EmptyInput));
    }

    #[test]
    fn test_select_latest_no_valid() {
        assert_eq!(
            select_latest(&["latest", "dev"]),
            Err(ResolveError::NoValidVersions)
        );
    }

    #[test]
    fn test_select_latest_skips_invalid() {
        assert_eq!(select_latest(&["latest", "0.1.0", "dev"]).unwrap(), "0.1.0");
    }

    #[test]
    fn test_constraint_minor() {
        let result = select_latest_with_constraint(
            &["1.0.0", "1.5.0", "2.0.0", "2.1.0"],
            "1.2.0",
            VersionConstraint::Minor,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.5.0");
        assert_eq!(result.latest_unconstrained, "2.1.0");
        assert!(result.has_update_outside_constraint);
        assert!(!result.constraint_ignored);
    }

    #[test]
    fn test_constraint_patch_no_newer() {
        let result = select_latest_with_constraint(
            &["1.2.0", "1.2.1", "1.3.0", "2.0.0"],
            "1.2.3",
            VersionConstraint::Patch,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.2.3");
        assert_eq!(result.latest_unconstrained, "2.0.0");
        assert!(result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_patch_newer() {
        let result = select_latest_with_constraint(
            &["1.2.0", "1.2.5", "1.3.0"],
            "1.2.3",
            VersionConstraint::Patch,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.2.5");
        assert_eq!(result.latest_unconstrained, "1.3.0");
        assert!(result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_major_never_outside() {
        let result = select_latest_with_constraint(
            &["1.0.0", "3.0.0"],
            "1.0.0",
            VersionConstraint::Major,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "3.0.0");
        assert!(!result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_no_matching_candidates() {
        let result = select_latest_with_constraint(
            &["2.0.0", "3.0.0"],
            "1.0.0",
            VersionConstraint::Minor,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.0.0");
        assert_eq!(result.latest_unconstrained, "3.0.0");
        assert!(result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_no_matching_candidates_older() {
        let result = select_latest_with_constraint(
            &["0.1.0", "0.2.0"],
            "1.0.0",
            VersionConstraint::Patch,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.0.0");
        assert_eq!(result.latest_unconstrained, "0.2.0");
        assert!(result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_never_regresses() {
        let result = select_latest_with_constraint(
            &["1.0.0", "1.1.0"],
            "1.4.0",
            VersionConstraint::Minor,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "1.4.0");
        assert!(!result.has_update_outside_constraint);
    }

    #[test]
    fn test_constraint_invalid_current_degrades() {
        let result = select_latest_with_constraint(
            &["1.0.0", "2.0.0"],
            "HEAD",
            VersionConstraint::Patch,
        )
        .unwrap();
        assert_eq!(result.latest_within_constraint, "2.0.0");
        assert_eq!(result.latest_unconstrained, "2.0.0");
        assert!(!result.has_update_outside_constraint);
        assert!(result.constraint_ignored);
    }

    #[test]
    fn test_constraint_errors() {
        let empty: Vec<&str> = Vec::new();
        assert_eq!(
            select_latest_with_constraint(&empty, "1.0.0", VersionConstraint::Minor),
            Err(ResolveError::EmptyInput)
        );
        assert_eq!(
            select_latest_with_constraint(&["latest"], "1.0.0", VersionConstraint::Minor),
            Err(ResolveError::NoValidVersions)
        );
    }

    fn version_strategy() -> impl Strategy<Value = String> {
        (0u64..5, 0u64..5, 0u64..5).prop_map(|(a, b, c)| format!("{}.{}.{}", a, b, c))
    }

    proptest! {
        #[test]
        fn prop_select_latest_is_maximum(versions in prop::collection::vec(version_strategy(), 1..20)) {
            let latest = select_latest(&versions).unwrap();
            prop_assert!(versions.contains(&latest));
            let latest_version = parse_lenient(&latest).unwrap();
            for v in &versions {
                let parsed = parse_lenient(v).unwrap();
                prop_assert!(compare(&latest_version, &parsed) != Ordering::Less);
            }
        }

        #[test]
        fn prop_select_latest_idempotent(versions in prop::collection::vec(version_strategy(), 1..20)) {
            prop_assert_eq!(select_latest(&versions), select_latest(&versions));
        }

        #[test]
        fn prop_patch_keeps_major_minor(
            versions in prop::collection::vec(version_strategy(), 1..20),
            current in version_strategy(),
        ) {
            let result = select_latest_with_constraint(&versions, &current, VersionConstraint::Patch).unwrap();
            if result.latest_within_constraint != current {
                let within = parse_lenient(&result.latest_within_constraint).unwrap();
                let current = parse_lenient(&current).unwrap();
                prop_assert_eq!((within.major, within.minor), (current.major, current.minor));
            }
        }

        #[test]
        fn prop_major_never_outside(
            versions in prop::collection::vec(version_strategy(), 1..20),
            current in "[a-z0-9.]{0,6}",
        ) {
            if let Ok(result) = select_latest_with_constraint(&versions, &current, VersionConstraint::Major) {
                prop_assert!(!result.has_update_outside_constraint);
            }
        }
    }
}
