//! Hardware design-space builder (spec.md §3, §4.1).
//!
//! Parameter order is significant: it fixes the mixed-radix digit order
//! `Space::build_point` decodes against, and HW feature extraction
//! (`crate::features`) reads fields back out of the resulting [`Point`] by
//! name, not by position, so the order only needs to be internally
//! consistent.

use super::factorize::combinations_v2;
use super::{ParamValue, Parameter, Space};

/// Inclusive `[low, high]` range stepped by `step`, used for every
/// arithmetic-progression hardware parameter (SIMD lanes, bit width,
/// bandwidth, per-level buffer sizes).
#[derive(Debug, Clone, Copy)]
pub struct Range {
    pub low: i64,
    pub high: i64,
    pub step: i64,
}

impl Range {
    pub fn new(low: i64, high: i64, step: i64) -> Self {
        assert!(step > 0, "range step must be positive");
        assert!(low <= high, "range low must not exceed high");
        Range { low, high, step }
    }

    fn values(self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut v = self.low;
        while v <= self.high {
            out.push(v);
            v += self.step;
        }
        out
    }
}

/// Bounds for the hardware design space (spec.md §6's `simd`, `prec`, `bw`,
/// `pe`, `l{1..3}` CLI flags).
#[derive(Debug, Clone)]
pub struct HardwareSpaceConfig {
    /// `num_simd_lane` bounds.
    pub simd: Range,
    /// `bit_width` bounds.
    pub bit_width: Range,
    /// `bandwidth` bounds.
    pub bandwidth: Range,
    /// Per-level buffer-size bounds, in kilobytes; `l_buf_sizes[i]` bounds
    /// `l{i}_buf_size`. Length must equal `num_levels`.
    pub l_buf_sizes_kb: Vec<Range>,
    /// Inclusive range of total PE counts to factorize into `subclusters`.
    pub pe_low: i64,
    pub pe_high: i64,
    /// Number of memory-hierarchy levels (`L`); fixed at 2 by default.
    pub num_levels: usize,
}

impl HardwareSpaceConfig {
    /// The reference default bounds: 2 memory levels, small buffer ranges
    /// suitable for the bundled examples and tests.
    pub fn default_two_level() -> Self {
        HardwareSpaceConfig {
            simd: Range::new(1, 4, 1),
            bit_width: Range::new(8, 16, 8),
            bandwidth: Range::new(1, 4, 1),
            l_buf_sizes_kb: vec![Range::new(8, 16, 8), Range::new(64, 128, 64)],
            pe_low: 4,
            pe_high: 16,
            num_levels: 2,
        }
    }
}

/// Build the hardware [`Space`] from `cfg` (spec.md §3's "Hardware space
/// parameters").
///
/// Parameter order: `num_simd_lane`, `bit_width`, `bandwidth`,
/// `l0_buf_size`..`l{L-1}_buf_size`, `subclusters`.
pub fn build_hardware_space(cfg: &HardwareSpaceConfig) -> Space {
    assert_eq!(
        cfg.l_buf_sizes_kb.len(),
        cfg.num_levels,
        "must supply one buffer-size range per memory level"
    );

    let mut params = Vec::with_capacity(4 + cfg.num_levels);

    params.push(Parameter::new(
        "num_simd_lane",
        int_range(cfg.simd),
    ));
    params.push(Parameter::new("bit_width", int_range(cfg.bit_width)));
    params.push(Parameter::new("bandwidth", int_range(cfg.bandwidth)));

    for (i, range) in cfg.l_buf_sizes_kb.iter().enumerate() {
        let values: Vec<ParamValue> = range
            .values()
            .into_iter()
            .map(|kb| ParamValue::Int(kb * 1024))
            .collect();
        params.push(Parameter::new(format!("l{i}_buf_size"), values));
    }

    params.push(Parameter::new(
        "subclusters",
        subclusters_range(cfg.pe_low, cfg.pe_high, cfg.num_levels),
    ));

    Space::new(params, cfg.num_levels)
}

fn int_range(range: Range) -> Vec<ParamValue> {
    range.values().into_iter().map(ParamValue::Int).collect()
}

/// The set of length-`num_levels` factorizations (factors ≥ 2) of every
/// integer in `[pe_low, pe_high]`, flattened into one parameter range
/// (spec.md §3).
fn subclusters_range(pe_low: i64, pe_high: i64, num_levels: usize) -> Vec<ParamValue> {
    let mut out = Vec::new();
    for pe in pe_low..=pe_high {
        for factors in combinations_v2(pe, num_levels) {
            out.push(ParamValue::IntTuple(factors));
        }
    }
    assert!(
        !out.is_empty(),
        "no PE count in [{pe_low}, {pe_high}] factorizes into {num_levels} levels of factor >= 2"
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subcluster_entry_has_correct_length_and_factor_bound() {
        let entries = subclusters_range(4, 16, 2);
        for entry in &entries {
            let tuple = entry.as_int_tuple().unwrap();
            assert_eq!(tuple.len(), 2);
            assert!(tuple.iter().all(|&f| f >= 2));
            assert!((4..=16).contains(&tuple.iter().product::<i64>()));
        }
    }

    #[test]
    fn buffer_size_parameters_are_kilobyte_multiples() {
        let cfg = HardwareSpaceConfig::default_two_level();
        let space = build_hardware_space(&cfg);
        let l0 = space
            .params()
            .iter()
            .find(|p| p.name == "l0_buf_size")
            .unwrap();
        for value in &l0.range {
            assert_eq!(value.as_int().unwrap() % 1024, 0);
        }
    }

    #[test]
    fn space_size_matches_product_of_ranges() {
        let cfg = HardwareSpaceConfig::default_two_level();
        let space = build_hardware_space(&cfg);
        let expected: usize = space.params().iter().map(|p| p.range.len()).product();
        assert_eq!(space.size(), &num_bigint::BigUint::from(expected as u64));
    }
}
