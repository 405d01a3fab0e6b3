//! Sample values and sample-to-value mappers.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Datatype, SampleId};

/// A single value observed for a sample.
///
/// There is no "undefined" variant: a sample without a value is simply
/// absent from the [`Mapper`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Loose truthiness used by boolean combination.
    ///
    /// Numbers are truthy when non-zero and not NaN, text when non-empty.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Text(s) => !s.is_empty(),
        }
    }

    /// Key used for category lookups.
    pub fn category_key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Total function from sample id to an optional value.
///
/// Keys are kept ordered so iteration (and everything computed from it) is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapper(BTreeMap<SampleId, Value>);

impl Mapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for a sample, `None` when undefined.
    pub fn get(&self, sample: &SampleId) -> Option<&Value> {
        self.0.get(sample)
    }

    /// Sets the value of a sample, returning the previous one.
    pub fn insert(&mut self, sample: SampleId, value: Value) -> Option<Value> {
        self.0.insert(sample, value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SampleId, &Value)> {
        self.0.iter()
    }

    pub fn samples(&self) -> impl Iterator<Item = &SampleId> {
        self.0.keys()
    }

    /// Number of samples with a defined value.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(SampleId, Value)> for Mapper {
    fn from_iter<I: IntoIterator<Item = (SampleId, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Mapper {
    type Item = (&'a SampleId, &'a Value);
    type IntoIter = std::collections::btree_map::Iter<'a, SampleId, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The set of values a variable can take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Closed numeric range.
    Range { min: f64, max: f64 },
    /// Explicit ordered categories.
    Categories { values: Vec<Value> },
}

impl Domain {
    /// Computes the default domain of a mapper for a datatype.
    ///
    /// Numeric variables get the `[min, max]` of their values (`[0, 0]` when
    /// there are none); binary variables always list `true, false`; other
    /// variables list their distinct values in first-seen order.
    pub fn from_mapper(mapper: &Mapper, datatype: Datatype) -> Self {
        match datatype {
            Datatype::Number => {
                let (min, max) = mapper
                    .iter()
                    .filter_map(|(_, v)| v.as_f64())
                    .filter(|n| n.is_finite())
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), n| {
                        (lo.min(n), hi.max(n))
                    });
                if min > max {
                    Self::Range { min: 0.0, max: 0.0 }
                } else {
                    Self::Range { min, max }
                }
            }
            Datatype::Binary => Self::Categories {
                values: vec![Value::Bool(true), Value::Bool(false)],
            },
            Datatype::String | Datatype::Ordinal | Datatype::Binned => {
                let mut values: Vec<Value> = Vec::new();
                for (_, value) in mapper {
                    if !values.contains(value) {
                        values.push(value.clone());
                    }
                }
                Self::Categories { values }
            }
        }
    }

    /// Explicit category list.
    pub const fn categories(values: Vec<Value>) -> Self {
        Self::Categories { values }
    }

    /// Whether a value lies inside the domain.
    pub fn contains(&self, value: &Value) -> bool {
        match self {
            Self::Range { min, max } => value.as_f64().is_some_and(|n| n >= *min && n <= *max),
            Self::Categories { values } => values.contains(value),
        }
    }
}
