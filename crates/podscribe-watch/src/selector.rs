//! Label selectors in the `kubectl -l` syntax

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const KEY: &str = r"[A-Za-z0-9][-A-Za-z0-9_./]*";
const VALUE: &str = r"[-A-Za-z0-9_.]*";

static EQUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<key>{KEY})\s*(?P<op>==|=|!=)\s*(?P<value>{VALUE})$"
    ))
    .expect("equality requirement regex")
});

static SET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<key>{KEY})\s+(?P<op>in|notin)\s*\((?P<values>[^()]*)\)$"
    ))
    .expect("set requirement regex")
});

static EXISTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^(?P<not>!)?\s*(?P<key>{KEY})$")).expect("exists requirement regex")
});

static SET_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{VALUE}$")).expect("set value regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("invalid label requirement {0:?}")]
    InvalidRequirement(String),

    #[error("invalid value {value:?} for label {key:?}")]
    InvalidValue { key: String, value: String },

    #[error("label {0:?} needs at least one value")]
    EmptyValueSet(String),

    #[error("unbalanced parentheses in selector {0:?}")]
    Unbalanced(String),
}

/// One requirement of a label selector
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Requirement {
    Equals(String, String),
    NotEquals(String, String),
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Exists(String),
    DoesNotExist(String),
}

impl Requirement {
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        match self {
            Self::Equals(key, value) => labels.get(key) == Some(value),
            Self::NotEquals(key, value) => labels.get(key) != Some(value),
            Self::In(key, values) => labels.get(key).is_some_and(|v| values.contains(v)),
            Self::NotIn(key, values) => labels.get(key).is_none_or(|v| !values.contains(v)),
            Self::Exists(key) => labels.contains_key(key),
            Self::DoesNotExist(key) => !labels.contains_key(key),
        }
    }

    fn parse(raw: &str) -> Result<Self, SelectorError> {
        if let Some(caps) = SET.captures(raw) {
            let key = caps["key"].to_string();
            let values = caps["values"]
                .split(',')
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| {
                    if SET_VALUE.is_match(v) {
                        Ok(v.to_string())
                    } else {
                        Err(SelectorError::InvalidValue {
                            key: key.clone(),
                            value: v.to_string(),
                        })
                    }
                })
                .collect::<Result<BTreeSet<_>, _>>()?;

            if values.is_empty() {
                return Err(SelectorError::EmptyValueSet(key));
            }

            return Ok(match &caps["op"] {
                "in" => Self::In(key, values),
                _ => Self::NotIn(key, values),
            });
        }

        if let Some(caps) = EQUALITY.captures(raw) {
            let key = caps["key"].to_string();
            let value = caps["value"].to_string();
            return Ok(match &caps["op"] {
                "!=" => Self::NotEquals(key, value),
                _ => Self::Equals(key, value),
            });
        }

        if let Some(caps) = EXISTS.captures(raw) {
            let key = caps["key"].to_string();
            return Ok(if caps.name("not").is_some() {
                Self::DoesNotExist(key)
            } else {
                Self::Exists(key)
            });
        }

        Err(SelectorError::InvalidRequirement(raw.to_string()))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &BTreeSet<String>| {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        };

        match self {
            Self::Equals(k, v) => write!(f, "{k}={v}"),
            Self::NotEquals(k, v) => write!(f, "{k}!={v}"),
            Self::In(k, vs) => write!(f, "{k} in ({})", join(vs)),
            Self::NotIn(k, vs) => write!(f, "{k} notin ({})", join(vs)),
            Self::Exists(k) => write!(f, "{k}"),
            Self::DoesNotExist(k) => write!(f, "!{k}"),
        }
    }
}

/// A conjunction of label requirements; the empty selector matches everything
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelSelector {
    requirements: Vec<Requirement>,
}

impl LabelSelector {
    /// Parse a selector such as `app=web,tier notin (cache),!legacy`
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let requirements = split_requirements(selector)?
            .into_iter()
            .map(Requirement::parse)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { requirements })
    }

    /// Check whether a label set satisfies every requirement
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        self.requirements.iter().all(|r| r.matches(labels))
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.requirements.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(","))
    }
}

impl std::str::FromStr for LabelSelector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split on top-level commas, leaving `in (a,b)` value lists intact
fn split_requirements(selector: &str) -> Result<Vec<&str>, SelectorError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::Unbalanced(selector.to_string()))?;
            }
            ',' if depth == 0 => {
                parts.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(SelectorError::Unbalanced(selector.to_string()));
    }
    parts.push(&selector[start..]);

    let parts: Vec<&str> = parts.into_iter().map(str::trim).collect();
    if parts.len() == 1 && parts[0].is_empty() {
        return Ok(Vec::new());
    }
    if let Some(empty) = parts.iter().find(|p| p.is_empty()) {
        return Err(SelectorError::InvalidRequirement(empty.to_string()));
    }

    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_equality() {
        let sel = LabelSelector::parse("app=web, tier==frontend").unwrap();
        assert!(sel.matches(&labels(&[("app", "web"), ("tier", "frontend")])));
        assert!(!sel.matches(&labels(&[("app", "web")])));

        let sel = LabelSelector::parse("app!=web").unwrap();
        assert!(sel.matches(&labels(&[("app", "api")])));
        assert!(sel.matches(&labels(&[])));
        assert!(!sel.matches(&labels(&[("app", "web")])));
    }

    #[test]
    fn test_set_based() {
        let sel = LabelSelector::parse("env in (prod, staging),tier notin (cache)").unwrap();
        assert_eq!(sel.requirements().len(), 2);
        assert!(sel.matches(&labels(&[("env", "prod")])));
        assert!(sel.matches(&labels(&[("env", "staging"), ("tier", "web")])));
        assert!(!sel.matches(&labels(&[("env", "prod"), ("tier", "cache")])));
        assert!(!sel.matches(&labels(&[("env", "dev")])));
        assert!(!sel.matches(&labels(&[])));
    }

    #[test]
    fn test_existence() {
        let sel = LabelSelector::parse("app,!legacy").unwrap();
        assert!(sel.matches(&labels(&[("app", "x")])));
        assert!(!sel.matches(&labels(&[("app", "x"), ("legacy", "true")])));
        assert!(!sel.matches(&labels(&[("other", "x")])));
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let sel = LabelSelector::parse("  ").unwrap();
        assert!(sel.is_empty());
        assert!(sel.matches(&labels(&[("a", "b")])));
    }

    #[test]
    fn test_invalid_selectors() {
        assert!(matches!(
            LabelSelector::parse("app=web,"),
            Err(SelectorError::InvalidRequirement(_))
        ));
        assert!(matches!(
            LabelSelector::parse("env in (prod"),
            Err(SelectorError::Unbalanced(_))
        ));
        assert!(matches!(
            LabelSelector::parse("env in ()"),
            Err(SelectorError::EmptyValueSet(_))
        ));
        assert!(matches!(
            LabelSelector::parse("env in (a b)"),
            Err(SelectorError::InvalidValue { .. })
        ));
        assert!(LabelSelector::parse("=web").is_err());
    }

    #[test]
    fn test_display_round_trips() {
        let sel = LabelSelector::parse("app=web,env in (b,a),!legacy").unwrap();
        assert_eq!(sel.to_string(), "app=web,env in (a,b),!legacy");
        assert_eq!(LabelSelector::parse(&sel.to_string()).unwrap(), sel);
    }
}
