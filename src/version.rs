//! Version index: which TOML language revisions exist, and which corpus
//! entries each one excludes relative to its parent.
//!
//! The corpus is maintained against the newest released version. Older
//! versions are expressed as subtractive diffs against it: `parent` points
//! from an older version toward the next-newer one, terminating at the
//! newest (parentless) version. This is the resolution of the spec's
//! version-inheritance open question; see DESIGN.md.

use crate::error::{ConformanceError, Result};

/// A single TOML language revision known to the harness.
#[derive(Debug, Clone)]
pub struct Version {
    pub id: &'static str,
    pub parent: Option<&'static str>,
    /// Globs, relative to `valid/`, of cases this version does not have.
    pub exclude: &'static [&'static str],
}

/// The full table of known versions, newest (parentless) first.
pub const VERSIONS: &[Version] = &[
    Version {
        id: "1.1.0",
        parent: None,
        exclude: &[],
    },
    Version {
        id: "1.0.0",
        parent: Some("1.1.0"),
        exclude: &["valid/string/escape-esc"],
    },
];

/// Resolves an alias (`1.0`, `1.1`, `latest`) to a canonical version id.
pub fn resolve_alias(requested: &str) -> Option<&'static str> {
    match requested {
        "latest" => Some("1.1.0"),
        "1.0" => Some("1.0.0"),
        "1.1" => Some("1.1.0"),
        other => VERSIONS.iter().find(|v| v.id == other).map(|v| v.id),
    }
}

/// The effective, flattened exclusion set for a version: the union of its
/// own exclusions and every ancestor's, plus a synthesized `encoder/` mirror
/// for every `valid/` exclusion.
#[derive(Debug, Clone)]
pub struct EffectiveExclusions {
    pub version: &'static str,
    patterns: Vec<glob::Pattern>,
}

impl EffectiveExclusions {
    pub fn resolve(requested: &str) -> Result<Self> {
        let canonical = resolve_alias(requested).ok_or_else(|| {
            let mut known: Vec<String> = VERSIONS.iter().map(|v| v.id.to_string()).collect();
            known.sort();
            ConformanceError::UnknownVersion {
                requested: requested.to_string(),
                known,
            }
        })?;

        let mut raw = Vec::new();
        let mut cur = Some(canonical);
        while let Some(id) = cur {
            let v = VERSIONS
                .iter()
                .find(|v| v.id == id)
                .expect("resolve_alias only returns known ids");
            raw.extend(v.exclude.iter().copied());
            cur = v.parent;
        }

        let mut patterns = Vec::with_capacity(raw.len() * 2);
        for excl in raw {
            patterns.push(
                glob::Pattern::new(excl)
                    .map_err(|source| ConformanceError::InvalidGlob {
                        pattern: excl.to_string(),
                        source,
                    })?,
            );
            if let Some(suffix) = excl.strip_prefix("valid/") {
                let mirrored = format!("encoder/{suffix}");
                patterns.push(glob::Pattern::new(&mirrored).map_err(|source| {
                    ConformanceError::InvalidGlob {
                        pattern: mirrored.clone(),
                        source,
                    }
                })?);
            }
        }

        Ok(EffectiveExclusions {
            version: canonical,
            patterns,
        })
    }

    /// Shell-style match where `*` does not cross `/`, matching the
    /// reference implementation's use of `filepath.Match`.
    pub fn excludes(&self, case_path: &str) -> bool {
        let opts = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        self.patterns
            .iter()
            .any(|p| p.matches_with(case_path, opts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_version_lists_known_ids() {
        let err = EffectiveExclusions::resolve("0.9").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("1.0.0"));
        assert!(msg.contains("1.1.0"));
    }

    #[test]
    fn older_version_excludes_escape_esc() {
        let ex = EffectiveExclusions::resolve("1.0.0").unwrap();
        assert!(ex.excludes("valid/string/escape-esc"));
        assert!(ex.excludes("encoder/string/escape-esc"));
    }

    #[test]
    fn newest_version_excludes_nothing() {
        let ex = EffectiveExclusions::resolve("latest").unwrap();
        assert!(!ex.excludes("valid/string/escape-esc"));
    }

    #[test]
    fn star_does_not_cross_slash() {
        let ex = EffectiveExclusions::resolve("1.0.0").unwrap();
        // sanity: a pattern anchored at valid/string/ should not match a
        // deeper nested path via `*` crossing `/`.
        assert!(!ex.excludes("valid/string/escape-esc/extra"));
    }

    #[test]
    fn invariant_child_exclusions_superset_of_parent() {
        // effective(1.0.0) must be a superset of effective(1.1.0) (its parent).
        let child = EffectiveExclusions::resolve("1.0.0").unwrap();
        let parent = EffectiveExclusions::resolve("1.1.0").unwrap();
        for p in &parent.patterns {
            assert!(child.patterns.iter().any(|c| c.as_str() == p.as_str()));
        }
    }
}
