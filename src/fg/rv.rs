//! Random variables and the values in their ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One value in a random variable's range, e.g. `"true"` or `"rainy"`.
///
/// Ranges and evidence are carried around as plain strings rather than a generic
/// value type: the spec's Non-goals exclude continuous variables, so there is only
/// ever one range kind to model, and a tagged-variant `Value` enum would be dead
/// weight until a second kind actually exists.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RangeValue(pub String);

impl fmt::Display for RangeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RangeValue {
    fn from(s: &str) -> Self {
        RangeValue(s.to_string())
    }
}

impl From<String> for RangeValue {
    fn from(s: String) -> Self {
        RangeValue(s)
    }
}

/// A random variable: a unique name, an ordered range, and optional evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandVar {
    pub name: String,
    pub range: Vec<RangeValue>,
    pub evidence: Option<RangeValue>,
}

impl RandVar {
    pub fn new(name: impl Into<String>, range: Vec<RangeValue>) -> Self {
        Self {
            name: name.into(),
            range,
            evidence: None,
        }
    }

    pub fn with_evidence(mut self, value: RangeValue) -> Self {
        self.evidence = Some(value);
        self
    }

    /// Two RVs are compatible when their ranges and evidence coincide.
    pub fn compatible(&self, other: &RandVar) -> bool {
        self.range == other.range && self.evidence == other.evidence
    }

    /// The key used to group RVs by `(range, evidence)` during color initialization.
    pub fn init_key(&self) -> (Vec<RangeValue>, Option<RangeValue>) {
        (self.range.clone(), self.evidence.clone())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn compatible_requires_same_range_and_evidence() {
        let a = RandVar::new("A", vec!["T".into(), "F".into()]);
        let b = RandVar::new("B", vec!["T".into(), "F".into()]);
        assert!(a.compatible(&b));

        let c = b.with_evidence("T".into());
        assert!(!a.compatible(&c));
    }
}
