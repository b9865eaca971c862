//! Case enumeration and the `-run`/`-skip` selection engine.

use crate::case::CasePath;
use crate::corpus::Corpus;
use crate::error::{ConformanceError, Result};
use crate::version::EffectiveExclusions;

/// Walks the three corpus roots, strips the `.toml` extension, and discards
/// any path matched by `exclusions`. Order is not significant; callers sort
/// downstream as needed.
pub fn enumerate_cases(corpus: &dyn Corpus, exclusions: &EffectiveExclusions) -> Vec<CasePath> {
    const ROOTS: [&str; 3] = ["valid/", "encoder/", "invalid/"];
    let mut out = Vec::new();
    for path in corpus.paths() {
        if !ROOTS.iter().any(|r| path.starts_with(r)) {
            continue;
        }
        let Some(stem) = path.strip_suffix(".toml") else {
            continue;
        };
        if exclusions.excludes(stem) {
            continue;
        }
        out.push(CasePath::new(stem));
    }
    out.sort();
    out
}

/// Shell-style glob match where `*` does not cross `/`, matching the
/// reference implementation's use of `filepath.Match`.
fn glob_match(pattern: &str, candidate: &str) -> Result<bool> {
    let p = glob::Pattern::new(pattern).map_err(|source| ConformanceError::InvalidGlob {
        pattern: pattern.to_string(),
        source,
    })?;
    let opts = glob::MatchOptions {
        case_sensitive: true,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };
    Ok(p.matches_with(candidate, opts))
}

/// Applies the `-run` inclusion filter. An empty pattern list selects
/// everything. Returns the selected cases in their original relative order.
pub fn apply_run_filter(cases: &[CasePath], run: &[String]) -> Result<Vec<CasePath>> {
    if run.is_empty() {
        return Ok(cases.to_vec());
    }
    let mut out = Vec::new();
    for case in cases {
        for pattern in run {
            if glob_match(pattern, case.as_str())? {
                out.push(case.clone());
                break;
            }
        }
    }
    Ok(out)
}

/// Whether `case` is named by any pattern in `skip`. Applied at execution
/// time, not at enumeration time, because `-skip-must-error` needs the test
/// to actually run.
pub fn is_skipped(case: &CasePath, skip: &[String]) -> Result<bool> {
    for pattern in skip {
        if glob_match(pattern, case.as_str())? {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::MapCorpus;

    fn corpus() -> MapCorpus {
        MapCorpus::new()
            .with_file("valid/string/simple.toml", "a=1")
            .with_file("valid/string/simple.json", "{}")
            .with_file("valid/string/escape-esc.toml", "a=1")
            .with_file("valid/string/escape-esc.json", "{}")
            .with_file("invalid/bad.toml", "a=")
    }

    #[test]
    fn enumerate_excludes_version_specific_cases() {
        let corpus = corpus();
        let excl = EffectiveExclusions::resolve("1.0.0").unwrap();
        let cases = enumerate_cases(&corpus, &excl);
        assert!(cases.iter().all(|c| c.as_str() != "valid/string/escape-esc"));
        assert!(cases.iter().any(|c| c.as_str() == "valid/string/simple"));
    }

    #[test]
    fn run_filter_star_does_not_cross_slash() {
        let cases = vec![
            CasePath::new("valid/string/simple"),
            CasePath::new("valid/string/nested/deep"),
        ];
        let selected = apply_run_filter(&cases, &["valid/string/*".to_string()]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].as_str(), "valid/string/simple");
    }

    #[test]
    fn empty_run_selects_all() {
        let cases = vec![CasePath::new("valid/a"), CasePath::new("invalid/b")];
        let selected = apply_run_filter(&cases, &[]).unwrap();
        assert_eq!(selected.len(), 2);
    }
}
