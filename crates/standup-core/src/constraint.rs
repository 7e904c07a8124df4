//! Version-range matching for requirement rules
//!
//! A rule is a comma-separated list of clauses which must all hold:
//!
//! ```yaml
//! releases:
//!   - name: ">= 13.0.0, < 14.0.0"   # operator clauses
//!   - name: "13.0.*"                 # wildcard pattern
//!   - name: "12.3.1"                 # exact version
//! ```
//!
//! Operator clauses compare by semver precedence (build metadata ignored).
//! Wildcards match the canonical version string, one `*` standing for any
//! run of characters.

use regex::Regex;
use semver::{BuildMetadata, Version};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result, parse_version};

/// Comparison operator of an operator clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Equal,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token {
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEq),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEq),
            "=" => Some(Self::Equal),
            _ => None,
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Greater => ordering == Ordering::Greater,
            Self::GreaterEq => ordering != Ordering::Less,
            Self::Less => ordering == Ordering::Less,
            Self::LessEq => ordering != Ordering::Greater,
            Self::Equal => ordering == Ordering::Equal,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Equal => "=",
        };
        write!(f, "{}", s)
    }
}

/// A single clause of a constraint
#[derive(Debug, Clone)]
pub enum Clause {
    /// `>= 13.0.0`, `< 12.0.0`, ...
    Compare { op: Operator, version: Version },
    /// `13.0.*`, `13.*`, `*`
    Wildcard { pattern: String, regex: Regex },
    /// `13.0.0`
    Exact(Version),
}

impl Clause {
    fn parse(raw: &str, lemma: &str) -> Result<Self> {
        if lemma.is_empty() {
            return Err(invalid(raw, "empty clause"));
        }

        if lemma.starts_with(['>', '<', '=']) {
            let tokens: Vec<&str> = lemma.split_whitespace().collect();
            if tokens.len() != 2 {
                return Err(invalid(
                    raw,
                    format!("unable to parse clause '{}': expected '<operator> <version>'", lemma),
                ));
            }
            let op = Operator::parse(tokens[0]).ok_or_else(|| {
                invalid(raw, format!("unrecognized operator '{}'", tokens[0]))
            })?;
            if tokens[1].contains('*') {
                return Err(invalid(
                    raw,
                    format!("wildcards are not allowed after '{}'", op),
                ));
            }
            let version = parse_version(tokens[1])?;
            return Ok(Self::Compare { op, version });
        }

        if lemma.contains('*') {
            let body = lemma
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            let regex = Regex::new(&format!("^{}$", body))
                .map_err(|e| invalid(raw, format!("invalid pattern '{}': {}", lemma, e)))?;
            return Ok(Self::Wildcard {
                pattern: lemma.to_string(),
                regex,
            });
        }

        Ok(Self::Exact(parse_version(lemma)?))
    }

    /// Check whether the target satisfies this clause
    pub fn matches(&self, target: &Version) -> bool {
        match self {
            Self::Compare { op, version } => op.accepts(precedence(target, version)),
            Self::Wildcard { regex, .. } => regex.is_match(&target.to_string()),
            Self::Exact(version) => precedence(target, version) == Ordering::Equal,
        }
    }
}

/// A parsed, conjunctive version constraint
#[derive(Debug, Clone)]
pub struct Constraint {
    raw: String,
    clauses: Vec<Clause>,
}

impl Constraint {
    /// Parse a constraint expression
    ///
    /// Any invalid clause invalidates the whole constraint.
    pub fn parse(raw: &str) -> Result<Self> {
        let clauses = raw
            .split(',')
            .map(|lemma| Clause::parse(raw, lemma.trim()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            raw: raw.to_string(),
            clauses,
        })
    }

    /// Check whether the target version satisfies every clause
    pub fn matches(&self, target: &Version) -> bool {
        self.clauses.iter().all(|clause| clause.matches(target))
    }

    /// The parsed clauses
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// The original expression
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Constraint {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Evaluate a rule expression against a target version
pub fn matches(rule: &str, target: &Version) -> Result<bool> {
    Ok(Constraint::parse(rule)?.matches(target))
}

/// Compare two versions by semver precedence, ignoring build metadata
pub(crate) fn precedence(a: &Version, b: &Version) -> Ordering {
    let strip = |v: &Version| Version {
        build: BuildMetadata::EMPTY,
        ..v.clone()
    };
    strip(a).cmp(&strip(b))
}

fn invalid(raw: &str, message: impl Into<String>) -> CoreError {
    CoreError::InvalidConstraint {
        constraint: raw.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn check(rule: &str, target: &str) -> bool {
        matches(rule, &v(target)).unwrap()
    }

    #[test]
    fn test_operator_clauses() {
        let cases = [
            (">= 13.0.0", "13.0.0", true),
            (">= 13.0.0", "13.0.1", true),
            (">= 13.0.1", "13.0.0", false),
            ("<= 13.0.0", "13.0.0", true),
            ("<= 13.0.0", "12.1.2", true),
            ("<= 13.0.0", "13.0.1", false),
            ("= 13.0.0", "13.0.0", true),
            ("= 13.0.0", "13.0.1", false),
            ("> 13.0.0", "13.0.0", false),
            ("> 13.0.0", "13.0.1", true),
            ("< 13.0.0", "13.0.0", false),
            ("< 13.0.0", "12.9.9", true),
        ];

        for (rule, target, expected) in cases {
            assert_eq!(check(rule, target), expected, "{} against {}", rule, target);
        }
    }

    #[test]
    fn test_bare_version_is_exact() {
        assert!(check("13.0.0", "13.0.0"));
        assert!(!check("13.0.0", "13.0.1"));
        assert!(check("v13.0.0", "13.0.0"));
    }

    #[test]
    fn test_wildcards() {
        assert!(check("13.0.*", "13.0.1"));
        assert!(check("13.0.*", "13.0.5"));
        assert!(check("13.*", "13.0.1"));
        assert!(check("*", "13.0.1"));
        assert!(check("*", "0.0.1-alpha.1"));
        assert!(!check("13.0.*", "13.1.0"));
        assert!(!check("13.0.*", "13.1.1"));
        assert!(!check("13.*", "12.0.1"));
    }

    #[test]
    fn test_wildcard_is_anchored() {
        // would match "113.0.0" and "13.0.10" if the pattern were unanchored
        assert!(!check("13.0.*", "113.0.0"));
        assert!(!check("3.*", "13.0.0"));
    }

    #[test]
    fn test_conjunctive_clauses() {
        assert!(check(">= 13.0.0, < 14.0.0", "13.5.0"));
        assert!(!check(">= 13.0.0, < 14.0.0", "14.0.0"));
        assert!(check("13.*, > 13.0.0", "13.0.1"));
        assert!(!check("13.*, > 13.0.0", "13.0.0"));
    }

    #[test]
    fn test_invalid_clause_fails_whole_rule() {
        let target = v("13.0.0");
        assert!(matches(">= 13.0.0, >=13.0.0", &target).is_err());
        assert!(matches(">= 13.0.0,", &target).is_err());
        assert!(matches("", &target).is_err());
        assert!(matches("=> 13.0.0", &target).is_err());
        assert!(matches(">= 13.*", &target).is_err());
        assert!(matches("not-a-version", &target).is_err());
    }

    #[test]
    fn test_invalid_version_error_kind() {
        let err = matches(">= banana", &v("1.0.0")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { .. }));

        let err = matches(">=1.0.0", &v("1.0.0")).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConstraint { .. }));
    }

    #[test]
    fn test_prerelease_precedence() {
        assert!(check("< 13.0.0", "13.0.0-alpha1"));
        assert!(!check("= 13.0.0", "13.0.0-alpha1"));
        assert!(check("= 13.0.0-alpha1", "13.0.0-alpha1"));
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert!(check("= 13.0.0", "13.0.0+build.5"));
        assert!(!check("> 13.0.0", "13.0.0+build.5"));
    }

    #[test]
    fn test_ordering_property() {
        let pairs = [
            ("1.0.0", "1.0.1"),
            ("1.2.3", "2.0.0"),
            ("0.9.9", "0.10.0"),
            ("13.0.0-alpha1", "13.0.0"),
            ("13.0.0-alpha.1", "13.0.0-alpha.2"),
            ("13.0.0-alpha", "13.0.0-beta"),
            ("12.9.9", "13.0.0-rc1"),
            ("13.0.0", "13.0.1+build.1"),
        ];
        for (lower, higher) in pairs {
            assert!(check(&format!(">= {}", lower), higher), ">= {} against {}", lower, higher);
            assert!(check(&format!("> {}", lower), higher), "> {} against {}", lower, higher);
            assert!(!check(&format!("< {}", lower), higher), "< {} against {}", lower, higher);
            assert!(!check(&format!("<= {}", lower), higher), "<= {} against {}", lower, higher);
        }
    }

    #[test]
    fn test_parse_keeps_clauses() {
        let c: Constraint = ">= 1.0.0, 1.*".parse().unwrap();
        assert_eq!(c.clauses().len(), 2);
        assert_eq!(c.to_string(), ">= 1.0.0, 1.*");
    }
}
