//! Value transforms producing new mappers from existing ones.
//!
//! Every function here is pure: inputs are borrowed, a fresh [`Mapper`] is
//! returned, and undefined samples stay undefined unless the transform says
//! otherwise (boolean combination treats them as `false`).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Datatype;
use crate::value::{Domain, Mapper, Value};

/// Errors raised when a transform or modification is malformed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// Combination requested over zero mappers.
    #[error("cannot combine an empty list of mappers")]
    EmptyInput,

    /// Fewer than two bin boundaries.
    #[error("binning needs at least 2 boundaries, got {count}")]
    TooFewBins { count: usize },

    /// Boundaries are not strictly increasing finite numbers.
    #[error("bin boundaries must be finite and strictly increasing: {bins:?}")]
    UnorderedBins { bins: Vec<f64> },

    /// Number of names does not match the number of intervals.
    #[error("expected {expected} bin names, got {actual}")]
    BinNameMismatch { expected: usize, actual: usize },

    /// A modification was applied to the wrong number of sources.
    #[error("{modification} expects {expected} source mapper(s), got {actual}")]
    Arity {
        modification: &'static str,
        expected: &'static str,
        actual: usize,
    },
}

/// Boolean operator for [`binary_combine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CombineOperator {
    And,
    Or,
}

impl fmt::Display for CombineOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
        }
    }
}

/// Unary numeric functions available to [`continuous_transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinuousFn {
    Log10,
    Ln,
    Log2,
    Sqrt,
    Abs,
}

impl ContinuousFn {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Log10 => x.log10(),
            Self::Ln => x.ln(),
            Self::Log2 => x.log2(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
        }
    }
}

/// Validated bin boundaries and their names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBinning")]
pub struct Binning {
    bins: Vec<f64>,
    bin_names: Vec<String>,
}

#[derive(Deserialize)]
struct RawBinning {
    bins: Vec<f64>,
    bin_names: Vec<String>,
}

impl TryFrom<RawBinning> for Binning {
    type Error = TransformError;

    fn try_from(raw: RawBinning) -> Result<Self, Self::Error> {
        Self::new(raw.bins, raw.bin_names)
    }
}

impl Binning {
    /// Validates `bins` (length `k + 1`, strictly increasing) against
    /// `bin_names` (length `k`).
    pub fn new(bins: Vec<f64>, bin_names: Vec<String>) -> Result<Self, TransformError> {
        if bins.len() < 2 {
            return Err(TransformError::TooFewBins { count: bins.len() });
        }
        let ordered = bins.iter().all(|b| b.is_finite()) && bins.windows(2).all(|w| w[0] < w[1]);
        if !ordered {
            return Err(TransformError::UnorderedBins { bins });
        }
        if bin_names.len() != bins.len() - 1 {
            return Err(TransformError::BinNameMismatch {
                expected: bins.len() - 1,
                actual: bin_names.len(),
            });
        }
        Ok(Self { bins, bin_names })
    }

    /// Bins with generated `"a to b"` names, two decimals.
    pub fn with_range_names(bins: Vec<f64>) -> Result<Self, TransformError> {
        let names = bins
            .windows(2)
            .map(|w| format!("{} to {}", round2(w[0]), round2(w[1])))
            .collect();
        Self::new(bins, names)
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn bin_names(&self) -> &[String] {
        &self.bin_names
    }

    /// Name of the interval containing `x`.
    ///
    /// The first interval is closed on both ends, the rest are `(lo, hi]`.
    pub fn classify(&self, x: f64) -> Option<&str> {
        let first = self.bins[0];
        let last = self.bins[self.bins.len() - 1];
        if x.is_nan() || x < first || x > last {
            return None;
        }
        let idx = self
            .bins
            .windows(2)
            .position(|w| x <= w[1])
            .unwrap_or(self.bin_names.len() - 1);
        Some(&self.bin_names[idx])
    }

    /// Domain of a binned variable: the names in interval order.
    pub fn domain(&self) -> Domain {
        Domain::categories(self.bin_names.iter().map(|n| Value::from(n.as_str())).collect())
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Lookup table from a value's textual form to a new category name.
pub type CategoryMapping = BTreeMap<String, String>;

/// Boolean AND/OR across mappers.
///
/// Every sample present in any input appears in the output; missing or
/// falsy inputs count as `false`.
pub fn binary_combine(maps: &[&Mapper], operator: CombineOperator) -> Result<Mapper, TransformError> {
    if maps.is_empty() {
        return Err(TransformError::EmptyInput);
    }
    let mut samples: Vec<_> = maps.iter().flat_map(|m| m.samples()).collect();
    samples.sort();
    samples.dedup();

    Ok(samples
        .into_iter()
        .map(|sample| {
            let mut truths = maps.iter().map(|m| m.get(sample).is_some_and(Value::is_truthy));
            let combined = match operator {
                CombineOperator::And => truths.all(|t| t),
                CombineOperator::Or => truths.any(|t| t),
            };
            (sample.clone(), Value::Bool(combined))
        })
        .collect())
}

/// Maps numeric values to the name of their bin.
pub fn binned_transform(map: &Mapper, binning: &Binning) -> Mapper {
    map.iter()
        .filter_map(|(sample, value)| {
            let name = binning.classify(value.as_f64()?)?;
            Some((sample.clone(), Value::from(name)))
        })
        .collect()
}

/// Relabels values through `mapping`; unmapped values become undefined.
pub fn category_remap(map: &Mapper, mapping: &CategoryMapping) -> Mapper {
    map.iter()
        .filter_map(|(sample, value)| {
            let target = mapping.get(&value.category_key())?;
            Some((sample.clone(), Value::from(target.as_str())))
        })
        .collect()
}

/// Applies `function` to every numeric value.
///
/// Non-numeric inputs and non-finite results are dropped.
pub fn continuous_transform(map: &Mapper, function: ContinuousFn) -> Mapper {
    map.iter()
        .filter_map(|(sample, value)| {
            let y = function.apply(value.as_f64()?);
            y.is_finite().then(|| (sample.clone(), Value::Number(y)))
        })
        .collect()
}

/// A named, serializable recipe for computing a derived mapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Modification {
    /// AND/OR of any number of sources, optionally relabelled.
    BinaryCombine {
        operator: CombineOperator,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category_mapping: Option<CategoryMapping>,
    },
    /// Merges the categories of one source.
    CategoryCombine { category_mapping: CategoryMapping },
    /// Optional numeric function followed by optional binning.
    ContinuousTransform {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function: Option<ContinuousFn>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        binning: Option<Binning>,
    },
    /// Bins one numeric source.
    Binning { binning: Binning },
}

impl Modification {
    /// Short name used in errors and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::BinaryCombine { .. } => "binaryCombine",
            Self::CategoryCombine { .. } => "categoryCombine",
            Self::ContinuousTransform { .. } => "continuousTransform",
            Self::Binning { .. } => "binning",
        }
    }

    /// Datatype of the mapper this modification produces.
    pub const fn datatype(&self) -> Datatype {
        match self {
            Self::BinaryCombine {
                category_mapping: None,
                ..
            } => Datatype::Binary,
            Self::BinaryCombine { .. } | Self::CategoryCombine { .. } => Datatype::String,
            Self::ContinuousTransform { binning: None, .. } => Datatype::Number,
            Self::ContinuousTransform { .. } | Self::Binning { .. } => Datatype::Binned,
        }
    }

    /// Domain for the produced mapper.
    ///
    /// Binned results list their bin names in order; everything else falls
    /// back to [`Domain::from_mapper`].
    pub fn domain(&self, mapper: &Mapper) -> Domain {
        match self {
            Self::Binning { binning }
            | Self::ContinuousTransform {
                binning: Some(binning),
                ..
            } => binning.domain(),
            _ => Domain::from_mapper(mapper, self.datatype()),
        }
    }

    /// Computes the derived mapper from the source mappers.
    pub fn apply(&self, sources: &[&Mapper]) -> Result<Mapper, TransformError> {
        match self {
            Self::BinaryCombine {
                operator,
                category_mapping,
            } => {
                let combined = binary_combine(sources, *operator)?;
                Ok(match category_mapping {
                    Some(mapping) => category_remap(&combined, mapping),
                    None => combined,
                })
            }
            Self::CategoryCombine { category_mapping } => {
                let source = self.single(sources)?;
                Ok(category_remap(source, category_mapping))
            }
            Self::ContinuousTransform { function, binning } => {
                let source = self.single(sources)?;
                let transformed = function.map(|f| continuous_transform(source, f));
                let intermediate = transformed.as_ref().unwrap_or(source);
                Ok(match binning {
                    Some(binning) => binned_transform(intermediate, binning),
                    None => intermediate.clone(),
                })
            }
            Self::Binning { binning } => {
                let source = self.single(sources)?;
                Ok(binned_transform(source, binning))
            }
        }
    }

    fn single<'a>(&self, sources: &[&'a Mapper]) -> Result<&'a Mapper, TransformError> {
        match sources {
            [only] => Ok(*only),
            _ => Err(TransformError::Arity {
                modification: self.name(),
                expected: "exactly 1",
                actual: sources.len(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SampleId;

    fn sid(s: &str) -> SampleId {
        SampleId::new(s).unwrap()
    }

    fn numbers(pairs: &[(&str, f64)]) -> Mapper {
        pairs
            .iter()
            .map(|(s, v)| (sid(s), Value::Number(*v)))
            .collect()
    }

    fn bools(pairs: &[(&str, bool)]) -> Mapper {
        pairs
            .iter()
            .map(|(s, v)| (sid(s), Value::Bool(*v)))
            .collect()
    }

    fn low_high() -> Binning {
        Binning::new(vec![0.0, 5.0, 10.0], vec!["low".into(), "high".into()]).unwrap()
    }

    #[test]
    fn binning_boundaries() {
        let map: Mapper = [
            (sid("a"), Value::Number(5.0)),
            (sid("b"), Value::Number(5.0001)),
            (sid("c"), Value::Number(-1.0)),
            (sid("d"), Value::Number(0.0)),
            (sid("e"), Value::Number(10.0)),
            (sid("f"), Value::Number(10.5)),
        ]
        .into_iter()
        .collect();

        let binned = binned_transform(&map, &low_high());
        assert_eq!(binned.get(&sid("a")), Some(&Value::from("low")));
        assert_eq!(binned.get(&sid("b")), Some(&Value::from("high")));
        assert_eq!(binned.get(&sid("c")), None);
        assert_eq!(binned.get(&sid("d")), Some(&Value::from("low")));
        assert_eq!(binned.get(&sid("e")), Some(&Value::from("high")));
        assert_eq!(binned.get(&sid("f")), None);
        // Undefined input stays undefined.
        assert_eq!(binned.get(&sid("zzz")), None);
    }

    #[test]
    fn binning_ignores_text_values() {
        let map: Mapper = [(sid("a"), Value::from("7"))].into_iter().collect();
        assert!(binned_transform(&map, &low_high()).is_empty());
    }

    #[test]
    fn binning_validation() {
        assert_eq!(
            Binning::new(vec![1.0], vec![]),
            Err(TransformError::TooFewBins { count: 1 })
        );
        assert_eq!(
            Binning::new(vec![0.0, 1.0, 2.0], vec!["a".into()]),
            Err(TransformError::BinNameMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert!(matches!(
            Binning::new(vec![0.0, 0.0], vec!["a".into()]),
            Err(TransformError::UnorderedBins { .. })
        ));
        assert!(matches!(
            Binning::new(vec![0.0, f64::NAN], vec!["a".into()]),
            Err(TransformError::UnorderedBins { .. })
        ));
    }

    #[test]
    fn binning_deserialization_validates() {
        let ok: Result<Binning, _> =
            serde_json::from_str(r#"{"bins":[0,1],"bin_names":["only"]}"#);
        assert!(ok.is_ok());
        let bad: Result<Binning, _> = serde_json::from_str(r#"{"bins":[0,1],"bin_names":[]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn range_names_are_rounded() {
        let binning = Binning::with_range_names(vec![0.0, 1.234_56, 3.0]).unwrap();
        assert_eq!(binning.bin_names(), ["0 to 1.23", "1.23 to 3"]);
    }

    #[test]
    fn or_of_single_map_is_identity() {
        let map = bools(&[("a", true), ("b", false), ("c", true)]);
        let combined = binary_combine(&[&map], CombineOperator::Or).unwrap();
        assert_eq!(combined, map);
    }

    #[test]
    fn and_or_over_multiple_maps() {
        let left = bools(&[("a", true), ("b", true), ("c", false)]);
        let right = bools(&[("a", true), ("b", false)]);

        let and = binary_combine(&[&left, &right], CombineOperator::And).unwrap();
        assert_eq!(and, bools(&[("a", true), ("b", false), ("c", false)]));

        let or = binary_combine(&[&left, &right], CombineOperator::Or).unwrap();
        assert_eq!(or, bools(&[("a", true), ("b", true), ("c", false)]));
    }

    #[test]
    fn combine_includes_samples_missing_from_first_map() {
        let left = bools(&[("a", false)]);
        let right = bools(&[("b", true)]);
        let or = binary_combine(&[&left, &right], CombineOperator::Or).unwrap();
        assert_eq!(or.get(&sid("b")), Some(&Value::Bool(true)));
    }

    #[test]
    fn combine_rejects_empty_input() {
        assert_eq!(
            binary_combine(&[], CombineOperator::And),
            Err(TransformError::EmptyInput)
        );
    }

    #[test]
    fn category_remap_drops_unmapped_values() {
        let map: Mapper = [
            (sid("a"), Value::from("Stage I")),
            (sid("b"), Value::from("Stage II")),
            (sid("c"), Value::from("Unknown")),
        ]
        .into_iter()
        .collect();
        let mapping: CategoryMapping = [
            ("Stage I".to_string(), "early".to_string()),
            ("Stage II".to_string(), "early".to_string()),
        ]
        .into_iter()
        .collect();

        let remapped = category_remap(&map, &mapping);
        assert_eq!(remapped.get(&sid("a")), Some(&Value::from("early")));
        assert_eq!(remapped.get(&sid("b")), Some(&Value::from("early")));
        assert_eq!(remapped.get(&sid("c")), None);
    }

    #[test]
    fn continuous_transform_drops_non_finite() {
        let map = numbers(&[("a", 100.0), ("b", 0.0), ("c", -3.0)]);
        let logged = continuous_transform(&map, ContinuousFn::Log10);
        assert_eq!(logged.get(&sid("a")), Some(&Value::Number(2.0)));
        assert_eq!(logged.get(&sid("b")), None);
        assert_eq!(logged.get(&sid("c")), None);

        let abs = continuous_transform(&map, ContinuousFn::Abs);
        assert_eq!(abs.get(&sid("c")), Some(&Value::Number(3.0)));
    }

    #[test]
    fn continuous_pipeline_transforms_then_bins() {
        let map = numbers(&[("a", 10.0), ("b", 1000.0)]);
        let modification = Modification::ContinuousTransform {
            function: Some(ContinuousFn::Log10),
            binning: Some(
                Binning::new(vec![0.0, 2.0, 4.0], vec!["small".into(), "large".into()]).unwrap(),
            ),
        };
        assert_eq!(modification.datatype(), Datatype::Binned);

        let result = modification.apply(&[&map]).unwrap();
        assert_eq!(result.get(&sid("a")), Some(&Value::from("small")));
        assert_eq!(result.get(&sid("b")), Some(&Value::from("large")));
        // Re-applying the same recipe yields the same mapper.
        assert_eq!(modification.apply(&[&map]).unwrap(), result);
    }

    #[test]
    fn continuous_transform_without_steps_is_identity() {
        let map = numbers(&[("a", 1.5)]);
        let modification = Modification::ContinuousTransform {
            function: None,
            binning: None,
        };
        assert_eq!(modification.datatype(), Datatype::Number);
        assert_eq!(modification.apply(&[&map]).unwrap(), map);
    }

    #[test]
    fn binary_combine_with_categories() {
        let left = bools(&[("a", true), ("b", false)]);
        let mapping: CategoryMapping = [
            ("true".to_string(), "treated".to_string()),
            ("false".to_string(), "untreated".to_string()),
        ]
        .into_iter()
        .collect();
        let modification = Modification::BinaryCombine {
            operator: CombineOperator::Or,
            category_mapping: Some(mapping),
        };
        assert_eq!(modification.datatype(), Datatype::String);
        let result = modification.apply(&[&left]).unwrap();
        assert_eq!(result.get(&sid("b")), Some(&Value::from("untreated")));
    }

    #[test]
    fn single_source_modifications_check_arity() {
        let a = numbers(&[("a", 1.0)]);
        let modification = Modification::Binning {
            binning: low_high(),
        };
        let err = modification.apply(&[&a, &a]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "binning expects exactly 1 source mapper(s), got 2"
        );
    }

    #[test]
    fn modification_serde_is_tagged() {
        let modification = Modification::BinaryCombine {
            operator: CombineOperator::And,
            category_mapping: None,
        };
        let json = serde_json::to_string(&modification).unwrap();
        assert_eq!(json, r#"{"type":"binary_combine","operator":"and"}"#);
        let parsed: Modification = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, modification);
    }
}
