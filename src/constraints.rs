//! Evaluator-free pre-checks on a candidate (HW, SW) point: buffer usage,
//! tile monotonicity, and an analytical area model (spec.md §4.2).
//!
//! These are pure functions over [`LevelConfig`] — no I/O, no native calls —
//! so a candidate can be screened before the (expensive) native evaluator is
//! invoked.

use crate::space::software::DIM_ORDER;
use std::collections::HashMap;

/// Per memory-hierarchy-level configuration derived from a (HW, SW) point
/// (spec.md §3). Levels are ordered DRAM-closest first throughout this
/// crate (see DESIGN.md's level-ordering resolution).
#[derive(Debug, Clone)]
pub struct LevelConfig {
    /// Human-readable level label (e.g. `"L0"`, `"L1"`).
    pub label: String,
    /// Input-tensor buffer budget for this level, in bytes, already divided
    /// by the partition count closer to the PE (spec.md §3 note).
    pub inp_buf_size: i64,
    /// Weight-tensor buffer budget for this level, in bytes.
    pub wgt_buf_size: i64,
    /// Output-tensor buffer budget for this level, in bytes.
    pub out_buf_size: i64,
    /// Spatial unroll factor applied at this level.
    pub num_sub_clusters: i64,
    /// Per-dimension tile size active at this level.
    pub tile_sizes: HashMap<&'static str, i64>,
    /// Which dimension (one of [`DIM_ORDER`]) is spatially unrolled at this
    /// level, if any.
    pub spatial_dim: Option<&'static str>,
}

impl LevelConfig {
    /// Construct a level config with all three tensor buffers set from the
    /// same per-partition byte budget (the shape the original single-field
    /// `buf_size` is expanded into; see DESIGN.md).
    pub fn new(
        label: impl Into<String>,
        buf_size_per_partition: i64,
        num_sub_clusters: i64,
        tile_sizes: HashMap<&'static str, i64>,
        spatial_dim: Option<&'static str>,
    ) -> Self {
        LevelConfig {
            label: label.into(),
            inp_buf_size: buf_size_per_partition,
            wgt_buf_size: buf_size_per_partition,
            out_buf_size: buf_size_per_partition,
            num_sub_clusters,
            tile_sizes,
            spatial_dim,
        }
    }

    fn tile(&self, dim: &str) -> i64 {
        *self.tile_sizes.get(dim).unwrap_or(&1)
    }
}

/// Ratio of requested buffer usage to available buffer size for one tensor
/// at one level (spec.md §4.2). A ratio `<= 2` is within the double-buffer
/// budget.
#[derive(Debug, Clone, Copy)]
pub struct BufferRatio {
    pub level_index: usize,
    pub tensor: Tensor,
    pub ratio: f64,
}

/// Which of the three tensor buffers a [`BufferRatio`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tensor {
    Input,
    Weight,
    Output,
}

/// Adjusted dimension size along a tile's spatial axis, applying the halo
/// (`X`/`Y`) or full-unroll adjustment (every other dimension) from
/// spec.md §4.2.
fn adjusted(dim: &str, tile: i64, unroll: i64) -> i64 {
    if unroll <= 1 {
        return tile;
    }
    match dim {
        "X" | "Y" => tile + unroll - 1,
        _ => tile * unroll,
    }
}

/// Compute the buffer-usage ratio of every tensor at every level
/// (spec.md §4.2's "Buffer usage per level").
pub fn buffer_ratios(levels: &[LevelConfig]) -> Vec<BufferRatio> {
    let mut out = Vec::with_capacity(levels.len() * 3);
    for (level_index, level) in levels.iter().enumerate() {
        let unrolled = |dim: &str| -> i64 {
            let tile = level.tile(dim);
            let unroll = if level.spatial_dim == Some(dim_static(dim)) {
                level.num_sub_clusters
            } else {
                1
            };
            adjusted(dim, tile, unroll)
        };

        let (n, k, c, x, y, r, s) = (
            unrolled("N"),
            unrolled("K"),
            unrolled("C"),
            unrolled("X"),
            unrolled("Y"),
            unrolled("R"),
            unrolled("S"),
        );

        let inp = 2 * n * c * x * y;
        let wgt = 2 * k * c * r * s;
        let out_usage = 2 * n * k * (x - r + 1).max(1) * (y - s + 1).max(1);

        out_vec_push(&mut out, level_index, Tensor::Input, inp, level.inp_buf_size);
        out_vec_push(&mut out, level_index, Tensor::Weight, wgt, level.wgt_buf_size);
        out_vec_push(&mut out, level_index, Tensor::Output, out_usage, level.out_buf_size);
    }
    out
}

fn out_vec_push(out: &mut Vec<BufferRatio>, level_index: usize, tensor: Tensor, requested: i64, buf_size: i64) {
    let ratio = if buf_size <= 0 {
        f64::INFINITY
    } else {
        requested as f64 / buf_size as f64
    };
    out.push(BufferRatio {
        level_index,
        tensor,
        ratio,
    });
}

fn dim_static(dim: &str) -> &'static str {
    DIM_ORDER
        .iter()
        .find(|d| **d == dim)
        .copied()
        .unwrap_or("N")
}

/// Whether tile sizes are monotonically non-increasing from DRAM-closest to
/// PE-closest across every adjacent level pair and every dimension
/// (spec.md §4.2).
pub fn tile_monotonic(levels: &[LevelConfig]) -> bool {
    levels.windows(2).all(|pair| {
        let (outer, inner) = (&pair[0], &pair[1]);
        DIM_ORDER
            .iter()
            .all(|dim| outer.tile(dim) >= inner.tile(dim))
    })
}

/// Parameters feeding the analytical area model (spec.md §4.2). `num_pes`
/// is the product of every level's `num_sub_clusters`.
#[derive(Debug, Clone, Copy)]
pub struct AreaParams {
    pub bit_width: i64,
    pub bandwidth: i64,
    pub num_simd_lanes: i64,
}

const AREA_PER_L1_BYTE: f64 = 4505.1889 / 64.0;
const AREA_PER_L2_BYTE: f64 = 4161.536 / 32768.0;

/// Estimated chip area in the model's arbitrary units (spec.md §4.2).
/// `levels` must be ordered DRAM-closest first; the last entry is the
/// PE-closest level and uses L1 density. `bus`/`noc` accumulate one
/// contribution per level from that level's own `num_sub_clusters`, then
/// sum across every level.
pub fn estimate_area(levels: &[LevelConfig], params: &AreaParams) -> f64 {
    let byte_width = params.bit_width as f64 / 8.0;
    let num_pes: i64 = levels.iter().map(|l| l.num_sub_clusters).product();

    let mut sram = 0.0;
    let mut bus = 0.0;
    let mut noc = 0.0;
    for (i, level) in levels.iter().enumerate() {
        let density = if i + 1 == levels.len() {
            AREA_PER_L1_BYTE
        } else {
            AREA_PER_L2_BYTE
        };
        let bytes = (level.inp_buf_size + level.wgt_buf_size + level.out_buf_size) as f64;
        sram += density * bytes * byte_width;

        let k = level.num_sub_clusters as f64;
        bus += 14.662 * k + 28.895;
        noc += (1.2886 * k * k + 5.5814 * k - 23.711) * params.bandwidth as f64 * 101.79;
    }

    let compute = 4470.9014 * params.num_simd_lanes as f64 * num_pes as f64 * byte_width * byte_width;

    compute + sram + bus + noc
}

/// Ratio of estimated area to `max_area` (spec.md §4.2's "area ratio").
pub fn area_ratio(levels: &[LevelConfig], params: &AreaParams, max_area: f64) -> f64 {
    if max_area <= 0.0 {
        return f64::INFINITY;
    }
    estimate_area(levels, params) / max_area
}

/// Combined feasibility check: every buffer ratio `<= 2`, area ratio
/// `<= 2`, and tile monotonicity holds (spec.md §4.2). Feasibility is
/// informational only — the evaluator is still invoked regardless
/// (spec.md §4.2, §7).
pub fn is_feasible(levels: &[LevelConfig], params: &AreaParams, max_area: f64) -> bool {
    buffer_ratios(levels).iter().all(|r| r.ratio <= 2.0)
        && area_ratio(levels, params, max_area) <= 2.0
        && tile_monotonic(levels)
}
