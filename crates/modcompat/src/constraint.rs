//! Provides [`Constraint`](Constraint), a version range expression that selects versions out of a
//! set of candidates.
//!
//! # Grammar
//!
//! * `||` separates alternatives. A version matches the constraint if it matches any alternative.
//! * Within an alternative, comparators separated by commas and/or whitespace must all match.
//! * A comparator is an optional operator (`=`, `==`, `!=`, `>`, `>=`, `<`, `<=`, `^`, `~`)
//!   followed by a version. There may be whitespace between the operator and the version.
//! * Versions in comparators may be partial (`1`, `1.2`) or contain trailing wildcards (`*`, `x`,
//!   `X`, `1.x`, `1.2.*`).
//! * `A - B` is an inclusive hyphen range.
//!
//! Ranges implied by `^`, `~`, wildcards and partial versions have exclusive upper bounds that
//! also exclude the pre-releases of the bound itself, so `^2.0` doesn't match `3.0.0-beta`.
//! Explicit comparators use plain [`Version`] ordering.

use crate::{
    error::{ConstraintError, VersionError},
    version::{self, Version},
};
use lazy_static::lazy_static;
use regex::Regex;
use std::{fmt, fmt::Display, str::FromStr};

/// Operators a single [`Comparator`](Comparator) can apply.
#[derive(Debug, PartialEq, Copy, Clone)]
pub enum Op {
    /// The version must equal the comparator's version.
    Equal,
    /// The version must not equal the comparator's version.
    NotEqual,
    /// The version must be greater than the comparator's version.
    Greater,
    /// The version must be greater than or equal to the comparator's version.
    GreaterOrEqual,
    /// The version must be less than the comparator's version.
    Less,
    /// The version must be less than or equal to the comparator's version.
    LessOrEqual,
    /// The version's numeric core must be less than the comparator's version's core. Used for the
    /// implied upper bounds of ranges, so pre-releases of the bound don't match.
    Below,
}

/// A single operator and version pair.
#[derive(Debug, PartialEq, Clone)]
pub struct Comparator {
    /// The operator to apply.
    pub op: Op,
    /// The version to compare against.
    pub version: Version,
}

/// Something that has a [`Version`](Version) and can be selected by a [`Constraint`](Constraint).
pub trait Versioned {
    /// Returns the item's version.
    fn version(&self) -> &Version;
}

/// A parsed version constraint expression.
#[derive(Debug, PartialEq, Clone)]
pub struct Constraint {
    source: String,
    alternatives: Vec<Vec<Comparator>>,
}

/// A version in a comparator, where trailing components may be missing or wildcards.
#[derive(Debug, PartialEq)]
struct PartialVersion {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    label: String,
    has_wildcard: bool,
}

impl Versioned for Version {
    fn version(&self) -> &Version {
        self
    }
}

impl<T> Versioned for (T, Version) {
    fn version(&self) -> &Version {
        &self.1
    }
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    /// Returns whether a given version satisfies this comparator.
    pub fn matches(&self, version: &Version) -> bool {
        match self.op {
            Op::Equal => *version == self.version,
            Op::NotEqual => *version != self.version,
            Op::Greater => *version > self.version,
            Op::GreaterOrEqual => *version >= self.version,
            Op::Less => *version < self.version,
            Op::LessOrEqual => *version <= self.version,
            Op::Below => version.core() < self.version.core(),
        }
    }
}

impl Constraint {
    /// Returns the constraint's original string.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns whether a given version satisfies this constraint.
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|comparators| comparators.iter().all(|c| c.matches(version)))
    }

    /// Returns every candidate that satisfies this constraint, in the order they were given.
    pub fn satisfying<'a, T>(&self, candidates: &'a [T]) -> Vec<&'a T>
    where
        T: Versioned,
    {
        candidates
            .iter()
            .filter(|candidate| self.matches(candidate.version()))
            .collect()
    }

    /// Returns the highest candidate that satisfies this constraint, or `None` if none do. If
    /// several matching candidates have equal versions, the last one of them is returned.
    pub fn best<'a, T>(&self, candidates: &'a [T]) -> Option<&'a T>
    where
        T: Versioned,
    {
        candidates
            .iter()
            .filter(|candidate| self.matches(candidate.version()))
            .max_by(|a, b| a.version().cmp(b.version()))
    }
}

impl FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConstraintError::Empty);
        }

        let mut alternatives = Vec::new();
        for alternative in s.split("||") {
            if alternative.trim().is_empty() {
                return Err(ConstraintError::EmptyAlternative(s.to_owned()));
            }

            alternatives.push(parse_alternative(alternative, s)?);
        }

        Ok(Self {
            source: s.to_owned(),
            alternatives,
        })
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

const OPERATORS: &[&str] = &["=", "==", "!=", ">", ">=", "<", "<=", "^", "~"];
const HYPHEN: &str = "-";

/// Parses a single `||`-separated alternative into the comparators that must all match.
fn parse_alternative(alternative: &str, source: &str) -> Result<Vec<Comparator>, ConstraintError> {
    let tokens: Vec<&str> = alternative
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .collect();

    // join operators separated from their version by whitespace, such as in `>= 1.0`
    let mut joined = Vec::with_capacity(tokens.len());
    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        if OPERATORS.contains(&token) {
            match tokens.next() {
                Some(next) if next != HYPHEN && !OPERATORS.contains(&next) => {
                    joined.push(format!("{}{}", token, next))
                }
                _ => return Err(ConstraintError::DanglingOperator(source.to_owned())),
            }
        } else {
            joined.push(token.to_owned());
        }
    }

    let mut comparators = Vec::new();
    let mut index = 0;
    while index < joined.len() {
        let token = joined[index].as_str();
        if token == HYPHEN {
            return Err(ConstraintError::DanglingHyphen(source.to_owned()));
        }

        if joined.get(index + 1).map(String::as_str) == Some(HYPHEN) {
            let upper = joined
                .get(index + 2)
                .filter(|upper| upper.as_str() != HYPHEN)
                .ok_or_else(|| ConstraintError::DanglingHyphen(source.to_owned()))?;

            comparators.extend(hyphen_range(token, upper)?);
            index += 3;
        } else {
            comparators.extend(parse_comparator(token)?);
            index += 1;
        }
    }

    Ok(comparators)
}

/// Expands an inclusive hyphen range `lower - upper` into comparators.
fn hyphen_range(lower: &str, upper: &str) -> Result<Vec<Comparator>, ConstraintError> {
    let lower = PartialVersion::parse(lower)?;
    let upper = PartialVersion::parse(upper)?;
    let mut comparators = Vec::new();

    if lower.major.is_some() {
        comparators.push(Comparator::new(Op::GreaterOrEqual, lower.floor()));
    }

    if upper.is_full() {
        comparators.push(Comparator::new(Op::LessOrEqual, upper.floor()));
    } else if let Some(bound) = upper.next_bound() {
        comparators.push(Comparator::new(Op::Below, bound));
    }

    Ok(comparators)
}

/// Parses a single comparator token, such as `>=1.0` or `^2`, into the comparators it expands to.
/// Wildcards and partial versions may expand into zero to two comparators.
fn parse_comparator(token: &str) -> Result<Vec<Comparator>, ConstraintError> {
    lazy_static! {
        static ref RE: Regex = Regex::new(r"^(>=|<=|==|!=|>|<|=|\^|~)?(.*)$").unwrap();
    }

    let captures = RE
        .captures(token)
        .ok_or_else(|| ConstraintError::UnknownOperator(token.to_owned()))?;
    let op = captures.get(1).map(|c| c.as_str());
    let rest = captures.get(2).map_or("", |c| c.as_str());

    if rest.starts_with(|c: char| "<>=!^~".contains(c)) {
        return Err(ConstraintError::UnknownOperator(token.to_owned()));
    }

    let partial = PartialVersion::parse(rest)?;
    let floor = partial.floor();
    let mut comparators = Vec::new();

    match op {
        None | Some("=") | Some("==") => {
            if partial.is_full() {
                comparators.push(Comparator::new(Op::Equal, floor));
            } else if let Some(bound) = partial.next_bound() {
                comparators.push(Comparator::new(Op::GreaterOrEqual, floor));
                comparators.push(Comparator::new(Op::Below, bound));
            }
        }
        Some("!=") => {
            if partial.has_wildcard {
                return Err(ConstraintError::UnsupportedWildcard(token.to_owned()));
            }
            comparators.push(Comparator::new(Op::NotEqual, floor));
        }
        Some(">") => {
            if partial.major.is_none() {
                return Err(ConstraintError::UnsupportedWildcard(token.to_owned()));
            }

            match partial.next_bound() {
                // `>1` is everything from 2.0.0 on
                Some(bound) => comparators.push(Comparator::new(Op::GreaterOrEqual, bound)),
                None => comparators.push(Comparator::new(Op::Greater, floor)),
            }
        }
        Some(">=") => {
            if partial.major.is_some() {
                comparators.push(Comparator::new(Op::GreaterOrEqual, floor));
            }
        }
        Some("<") => {
            if partial.major.is_none() {
                return Err(ConstraintError::UnsupportedWildcard(token.to_owned()));
            }

            if partial.is_full() {
                comparators.push(Comparator::new(Op::Less, floor));
            } else {
                comparators.push(Comparator::new(Op::Below, floor));
            }
        }
        Some("<=") => {
            if partial.is_full() {
                comparators.push(Comparator::new(Op::LessOrEqual, floor));
            } else if let Some(bound) = partial.next_bound() {
                comparators.push(Comparator::new(Op::Below, bound));
            }
        }
        Some("~") => {
            if let Some(major) = partial.major {
                let bound = match partial.minor {
                    Some(minor) => Version::new(major, minor.saturating_add(1), 0),
                    None => Version::new(major.saturating_add(1), 0, 0),
                };
                comparators.push(Comparator::new(Op::GreaterOrEqual, floor));
                comparators.push(Comparator::new(Op::Below, bound));
            }
        }
        Some("^") => {
            if let Some(major) = partial.major {
                let bound = caret_bound(major, partial.minor, partial.patch);
                comparators.push(Comparator::new(Op::GreaterOrEqual, floor));
                comparators.push(Comparator::new(Op::Below, bound));
            }
        }
        Some(_) => return Err(ConstraintError::UnknownOperator(token.to_owned())),
    }

    Ok(comparators)
}

/// Returns the exclusive upper bound of a caret range: the left-most non-zero given component is
/// locked.
fn caret_bound(major: u64, minor: Option<u64>, patch: Option<u64>) -> Version {
    if major > 0 {
        return Version::new(major.saturating_add(1), 0, 0);
    }

    match (minor, patch) {
        (None, _) => Version::new(1, 0, 0),
        (Some(minor), _) if minor > 0 => Version::new(0, minor.saturating_add(1), 0),
        (Some(_), None) => Version::new(0, 1, 0),
        (Some(_), Some(patch)) => Version::new(0, 0, patch.saturating_add(1)),
    }
}

impl PartialVersion {
    fn parse(s: &str) -> Result<Self, ConstraintError> {
        if s.trim().is_empty() {
            return Err(VersionError::Empty.into());
        }

        let (core, label) = version::split_label(s)?;
        let args: Vec<&str> = core.split('.').collect();
        if args.len() > 3 {
            return Err(VersionError::TooManyComponents(s.to_owned()).into());
        }

        let mut components = [None; 3];
        let mut has_wildcard = false;
        for (index, arg) in args.iter().enumerate() {
            if is_wildcard(arg) {
                has_wildcard = true;
            } else if has_wildcard {
                return Err(ConstraintError::WildcardNotTrailing(s.to_owned()));
            } else {
                components[index] = Some(version::parse_component(arg, s)?);
            }
        }

        if !label.is_empty() {
            if has_wildcard {
                return Err(ConstraintError::UnsupportedWildcard(s.to_owned()));
            }

            // a pre-release always refers to one exact version
            for component in components.iter_mut() {
                component.get_or_insert(0);
            }
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            label: String::from(label),
            has_wildcard,
        })
    }

    fn is_full(&self) -> bool {
        self.major.is_some() && self.minor.is_some() && self.patch.is_some()
    }

    /// Returns the version with every missing component set to zero.
    fn floor(&self) -> Version {
        Version::new(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
        )
        .with_label(&self.label)
    }

    /// Returns the first version past the range this partial version covers, or `None` if it
    /// covers a single version or every version.
    fn next_bound(&self) -> Option<Version> {
        match (self.major, self.minor, self.patch) {
            (None, _, _) | (Some(_), Some(_), Some(_)) => None,
            (Some(major), None, _) => Some(Version::new(major.saturating_add(1), 0, 0)),
            (Some(major), Some(minor), None) => Some(Version::new(major, minor.saturating_add(1), 0)),
        }
    }
}

fn is_wildcard(component: &str) -> bool {
    matches!(component, "*" | "x" | "X")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().expect("failed to parse test version")
    }

    fn c(s: &str) -> Constraint {
        s.parse().expect("failed to parse test constraint")
    }

    fn assert_matches(constraint: &str, matching: &[&str], not_matching: &[&str]) {
        let constraint = c(constraint);
        for version in matching {
            assert!(
                constraint.matches(&v(version)),
                "{} should match {}",
                constraint,
                version
            );
        }
        for version in not_matching {
            assert!(
                !constraint.matches(&v(version)),
                "{} should not match {}",
                constraint,
                version
            );
        }
    }

    #[test]
    fn exact() {
        assert_matches("1.2.3", &["1.2.3", "v1.2.3+build"], &["1.2.4", "1.2.3-beta"]);
        assert_matches("=1.2.3", &["1.2.3"], &["1.2.2"]);
        assert_matches("== 1.2.3-beta", &["1.2.3-beta"], &["1.2.3", "1.2.3-alpha"]);
        assert_matches("!=1.2.3", &["1.2.2", "1.2.3-beta"], &["1.2.3"]);
    }

    #[test]
    fn comparisons() {
        assert_matches(">1.2.3", &["1.2.4", "2.0.0"], &["1.2.3", "1.2.3-beta"]);
        assert_matches(">= 1.2.3", &["1.2.3", "9.0.0"], &["1.2.2", "1.2.3-rc.1"]);
        assert_matches("<1.2.3", &["1.2.2", "1.2.3-beta"], &["1.2.3"]);
        assert_matches("<=1.2.3", &["1.2.3", "0.1.0"], &["1.2.4"]);
        assert_matches(">1", &["2.0.0"], &["1.9.9"]);
        assert_matches(">1.2", &["1.3.0"], &["1.2.9"]);
        assert_matches(">=1", &["1.0.0"], &["0.9.9"]);
        assert_matches("<1.2", &["1.1.9"], &["1.2.0", "1.2.0-beta"]);
        assert_matches("<=1.2", &["1.2.9"], &["1.3.0", "1.3.0-beta"]);
    }

    #[test]
    fn and_or() {
        assert_matches(">=1.0.0 <2.0.0", &["1.0.0", "1.9.9"], &["2.0.0", "0.9.0"]);
        assert_matches(">=1.0.0, <2.0.0", &["1.5.0"], &["2.0.0"]);
        assert_matches(">= 1.0.0,<2.0.0", &["1.5.0"], &["2.0.0"]);
        assert_matches("1.0.0 || >=3.0.0", &["1.0.0", "3.1.0"], &["2.0.0"]);
        assert_matches("<1.0.0 || 2.x || >= 4", &["0.5.0", "2.3.0", "4.0.0"], &["1.0.0", "3.0.0"]);
    }

    #[test]
    fn caret() {
        assert_matches("^2.0", &["2.0.0", "2.9.0"], &["3.0.0", "3.0.0-beta", "1.9.9"]);
        assert_matches("^1.2.3", &["1.2.3", "1.9.0"], &["1.2.2", "2.0.0"]);
        assert_matches("^0.2.3", &["0.2.3", "0.2.9"], &["0.3.0"]);
        assert_matches("^0.0.3", &["0.0.3"], &["0.0.4"]);
        assert_matches("^0.0", &["0.0.9"], &["0.1.0"]);
        assert_matches("^0", &["0.9.0"], &["1.0.0"]);
        assert_matches("^1.2.3-beta.2", &["1.2.3-beta.3", "1.2.3"], &["1.2.3-beta.1"]);
    }

    #[test]
    fn tilde() {
        assert_matches("~1.2.3", &["1.2.3", "1.2.9"], &["1.3.0", "1.2.2"]);
        assert_matches("~1.2", &["1.2.0", "1.2.9"], &["1.3.0"]);
        assert_matches("~1", &["1.0.0", "1.9.0"], &["2.0.0"]);
        assert_matches("~ 0.1", &["0.1.4"], &["0.2.0-alpha"]);
    }

    #[test]
    fn wildcards_and_partials() {
        assert_matches("*", &["0.0.0", "99.1.0", "1.0.0-beta"], &[]);
        assert_matches("x", &["1.0.0"], &[]);
        assert_matches("1.x", &["1.0.0", "1.9.9"], &["2.0.0", "2.0.0-beta", "0.9.0"]);
        assert_matches("1.2.*", &["1.2.0", "1.2.99"], &["1.3.0"]);
        assert_matches("1.X.x", &["1.5.0"], &["2.0.0"]);
        assert_matches("1", &["1.0.0", "1.5.2"], &["2.0.0"]);
        assert_matches("1.2", &["1.2.5"], &["1.3.0"]);
        assert_matches(">=*", &["0.0.1"], &[]);
    }

    #[test]
    fn hyphen_ranges() {
        assert_matches("1.2.3 - 2.3.4", &["1.2.3", "2.3.4"], &["1.2.2", "2.3.5"]);
        assert_matches("1.2 - 2.3", &["1.2.0", "2.3.9"], &["2.4.0", "2.4.0-beta"]);
        assert_matches("1.2.3 - 2", &["2.9.9"], &["3.0.0"]);
        assert_matches("* - 2.0.0", &["0.0.1", "2.0.0"], &["2.0.1"]);
    }

    #[test]
    fn invalid_constraints() {
        assert_eq!("".parse::<Constraint>(), Err(ConstraintError::Empty));
        assert_eq!(
            "1.0 ||".parse::<Constraint>(),
            Err(ConstraintError::EmptyAlternative(String::from("1.0 ||")))
        );
        assert_eq!(
            ">=".parse::<Constraint>(),
            Err(ConstraintError::DanglingOperator(String::from(">=")))
        );
        assert_eq!(
            ">= < 1".parse::<Constraint>(),
            Err(ConstraintError::DanglingOperator(String::from(">= < 1")))
        );
        assert_eq!(
            "1.0 -".parse::<Constraint>(),
            Err(ConstraintError::DanglingHyphen(String::from("1.0 -")))
        );
        assert_eq!(
            "- 2.0".parse::<Constraint>(),
            Err(ConstraintError::DanglingHyphen(String::from("- 2.0")))
        );
        assert_eq!(
            "=>1.0".parse::<Constraint>(),
            Err(ConstraintError::UnknownOperator(String::from("=>1.0")))
        );
        assert_eq!(
            "~>1.0".parse::<Constraint>(),
            Err(ConstraintError::UnknownOperator(String::from("~>1.0")))
        );
        assert_eq!(
            ">*".parse::<Constraint>(),
            Err(ConstraintError::UnsupportedWildcard(String::from(">*")))
        );
        assert_eq!(
            "!=1.x".parse::<Constraint>(),
            Err(ConstraintError::UnsupportedWildcard(String::from("!=1.x")))
        );
        assert_eq!(
            "1.*.3".parse::<Constraint>(),
            Err(ConstraintError::WildcardNotTrailing(String::from("1.*.3")))
        );
        assert!(matches!(
            ">=1.two".parse::<Constraint>(),
            Err(ConstraintError::InvalidVersion(VersionError::InvalidComponent { .. }))
        ));
        assert!(matches!(
            "latest".parse::<Constraint>(),
            Err(ConstraintError::InvalidVersion(_))
        ));
    }

    #[test]
    fn satisfying_keeps_input_order() {
        let candidates = vec![v("1.2.0"), v("3.0.0"), v("1.0.0"), v("1.5.0-rc.1")];
        let satisfying = c("^1.0").satisfying(&candidates);

        assert_eq!(satisfying, vec![&candidates[0], &candidates[2], &candidates[3]]);
        assert!(c("^4").satisfying(&candidates).is_empty());
    }

    #[test]
    fn best_is_highest_match() {
        let candidates = vec![(1, v("1.0.0")), (2, v("1.1.0")), (3, v("2.0.0")), (4, v("1.1.0-beta"))];

        assert_eq!(c(">=1.0.0 <2.0.0").best(&candidates), Some(&(2, v("1.1.0"))));
        assert_eq!(c("*").best(&candidates), Some(&(3, v("2.0.0"))));
        assert_eq!(c(">=3").best(&candidates), None);
        assert_eq!(c("*").best::<(i64, Version)>(&[]), None);
    }

    #[test]
    fn keeps_source() {
        assert_eq!(c(" ^1.0 || 2.x ").as_str(), " ^1.0 || 2.x ");
        assert_eq!(c(">=1").to_string(), ">=1");
    }
}
