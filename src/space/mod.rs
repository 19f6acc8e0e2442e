//! Parametric design-space model: [`Parameter`], [`Point`] and [`Space`]
//! (spec.md §3, §4.1).
//!
//! A `Space` is an ordered list of parameters together with a mixed-radix
//! weight vector. `Space::build_point` is a bijection between `[0, size)`
//! and the realizable points; `size` is kept as an arbitrary-precision
//! integer since the implicit product space for large PE counts can
//! overflow a 64-bit product (spec.md §9).

pub mod factorize;
pub mod hardware;
pub mod software;

use num_bigint::{BigUint, RandBigInt};
use rand::Rng;
use std::fmt;

/// A value held by a [`Parameter`] or stored in a [`Point`].
///
/// Integers, ordinal integer tuples (factorizations), and categorical
/// strings cover every range kind spec.md §3 names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamValue {
    /// A plain integer value (e.g. `num_simd_lane`, `l0_buf_size`).
    Int(i64),
    /// An ordered tuple of integers (e.g. a tile factorization, or
    /// `subclusters`).
    IntTuple(Vec<i64>),
    /// A categorical string value (e.g. a `spatial_dim` name or a
    /// `dataflow` template name).
    Str(String),
}

impl ParamValue {
    /// View this value as a single integer, if it is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ParamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// View this value as an integer tuple, if it is one.
    pub fn as_int_tuple(&self) -> Option<&[i64]> {
        match self {
            ParamValue::IntTuple(v) => Some(v),
            _ => None,
        }
    }

    /// View this value as a string, if it is one.
    pub fn as_str_value(&self) -> Option<&str> {
        match self {
            ParamValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{v}"),
            ParamValue::IntTuple(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
            ParamValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// A named dimension of the design space: a name and an ordered, fixed-size
/// enumerable range of values (spec.md §3).
#[derive(Debug, Clone)]
pub struct Parameter {
    /// Parameter name, e.g. `"num_simd_lane"` or `"l0_spatial_dim"`.
    pub name: String,
    /// The enumerable range of values this parameter can take. Always
    /// non-empty.
    pub range: Vec<ParamValue>,
}

impl Parameter {
    /// Build a parameter from a name and a non-empty range.
    ///
    /// # Panics
    /// Panics if `range` is empty — spec.md §3 requires range size ≥ 1.
    pub fn new(name: impl Into<String>, range: Vec<ParamValue>) -> Self {
        let range_len = range.len();
        assert!(range_len >= 1, "parameter range must be non-empty");
        Parameter {
            name: name.into(),
            range,
        }
    }
}

/// An ordered mapping from parameter name to value, preserving insertion
/// order (spec.md §3). Value objects: cheap to clone, immutable in practice
/// after construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Point {
    labels: Vec<String>,
    values: Vec<ParamValue>,
}

impl Point {
    /// An empty point.
    pub fn new() -> Self {
        Point::default()
    }

    /// Append a `(label, value)` pair. If `label` already exists, its value
    /// is overwritten in place (matches `Point.set` in the reference
    /// implementation).
    pub fn set(&mut self, label: impl Into<String>, value: ParamValue) {
        let label = label.into();
        if let Some(idx) = self.labels.iter().position(|l| *l == label) {
            self.values[idx] = value;
        } else {
            self.labels.push(label);
            self.values.push(value);
        }
    }

    /// Look up a value by parameter name. Returns `None` if absent (the
    /// sentinel for "no such parameter", per spec.md §3).
    pub fn get(&self, label: &str) -> Option<&ParamValue> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|idx| &self.values[idx])
    }

    /// Convenience: look up an integer-valued parameter.
    pub fn get_int(&self, label: &str) -> Option<i64> {
        self.get(label).and_then(ParamValue::as_int)
    }

    /// Convenience: look up an integer-tuple-valued parameter.
    pub fn get_int_tuple(&self, label: &str) -> Option<&[i64]> {
        self.get(label).and_then(ParamValue::as_int_tuple)
    }

    /// Convenience: look up a string-valued parameter.
    pub fn get_str(&self, label: &str) -> Option<&str> {
        self.get(label).and_then(ParamValue::as_str_value)
    }

    /// Iterate over `(label, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (label, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{label}:{value}")?;
        }
        write!(f, "}}")
    }
}

/// An ordered list of parameters plus a precomputed mixed-radix weight
/// vector (spec.md §3, §4.1).
#[derive(Debug, Clone)]
pub struct Space {
    params: Vec<Parameter>,
    /// `weights[i]` is the product of `params[i+1..].range.len()`; the last
    /// parameter's implicit weight is 1. Leftmost parameter is the most
    /// significant digit.
    weights: Vec<BigUint>,
    /// Total number of realizable points: `Π params[i].range.len()`.
    size: BigUint,
    /// Number of memory-hierarchy levels this space was built for (2 by
    /// default; carried so `Optimizer` doesn't need to re-derive it).
    pub num_levels: usize,
}

impl Space {
    /// Build a space from an ordered parameter list. Parameters are indexed
    /// in declaration order; the leftmost parameter is the most-significant
    /// mixed-radix digit (spec.md §4.1).
    pub fn new(params: Vec<Parameter>, num_levels: usize) -> Self {
        assert!(!params.is_empty(), "space must have at least one parameter");
        let lens: Vec<BigUint> = params
            .iter()
            .map(|p| BigUint::from(p.range.len() as u64))
            .collect();

        let mut weights = vec![BigUint::from(1u32); lens.len()];
        let mut acc = BigUint::from(1u32);
        for i in (0..lens.len()).rev() {
            weights[i] = acc.clone();
            acc *= &lens[i];
        }
        let size = acc;

        Space {
            params,
            weights,
            size,
            num_levels,
        }
    }

    /// The parameter list, in declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Total number of realizable points in this space.
    pub fn size(&self) -> &BigUint {
        &self.size
    }

    /// Whether the space's size fits in a `u64` (the common case; only
    /// extreme PE-count configurations overflow this).
    pub fn size_fits_u64(&self) -> bool {
        self.size <= BigUint::from(u64::MAX)
    }

    /// Decode index `i` into the `i`-th point under the mixed-radix
    /// enumeration (spec.md §4.1). `i` must be `< size`.
    pub fn build_point(&self, index: &BigUint) -> Point {
        debug_assert!(index < &self.size, "index out of range for space");
        let mut remaining = index.clone();
        let mut point = Point::new();
        for (param, weight) in self.params.iter().zip(self.weights.iter()) {
            let digit = if weight.is_empty_weight() {
                remaining.clone()
            } else {
                &remaining / weight
            };
            let digit_usize = digit_to_usize(&digit, param.range.len());
            point.set(param.name.clone(), param.range[digit_usize].clone());
            if !weight.is_empty_weight() {
                remaining %= weight;
            }
        }
        point
    }

    /// Convenience over [`Space::build_point`] for spaces whose size fits in
    /// a `u64`.
    pub fn build_point_u64(&self, index: u64) -> Point {
        self.build_point(&BigUint::from(index))
    }

    /// Draw a uniformly random index in `[0, size)` and decode it.
    pub fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let idx = rng.gen_biguint_below(&self.size);
        self.build_point(&idx)
    }
}

/// Helper trait so `Space::build_point` can treat the implicit weight of 1
/// (the last parameter) without a special-cased branch at every call site.
trait IsOne {
    fn is_empty_weight(&self) -> bool;
}

impl IsOne for BigUint {
    fn is_empty_weight(&self) -> bool {
        self == &BigUint::from(1u32)
    }
}

fn digit_to_usize(digit: &BigUint, range_len: usize) -> usize {
    let rl = BigUint::from(range_len as u64);
    let reduced = digit % &rl;
    // `reduced < range_len <= usize::MAX` for any space we actually build,
    // so this conversion is infallible in practice.
    reduced.to_u64_digits().first().copied().unwrap_or(0) as usize
}
