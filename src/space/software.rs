//! Software (per-layer mapping) design-space builder (spec.md §3, §4.1).

use super::factorize::combinations;
use super::{ParamValue, Parameter, Space};

/// Canonical dimension order used everywhere a fixed iteration order over
/// convolution dimensions is required (tile-factor parameter order, dataflow
/// token emission order, raw feature order) — spec.md §4.2/§4.6.
pub const DIM_ORDER: [&str; 7] = ["N", "K", "C", "X", "Y", "R", "S"];

/// A convolution layer shape, `S = {N, K, C, X, Y, R, S}` (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerShape {
    pub n: i64,
    pub k: i64,
    pub c: i64,
    pub x: i64,
    pub y: i64,
    pub r: i64,
    pub s: i64,
}

impl LayerShape {
    /// Look up a dimension's value by its canonical name (one of
    /// [`DIM_ORDER`]).
    pub fn get(&self, dim: &str) -> i64 {
        match dim {
            "N" => self.n,
            "K" => self.k,
            "C" => self.c,
            "X" => self.x,
            "Y" => self.y,
            "R" => self.r,
            "S" => self.s,
            other => panic!("unknown convolution dimension `{other}`"),
        }
    }

    /// The shape's dimension values in [`DIM_ORDER`].
    pub fn ordered(&self) -> [i64; 7] {
        [self.n, self.k, self.c, self.x, self.y, self.r, self.s]
    }
}

/// Which software-mapping dataflow family to search (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataflowKind {
    /// Full tile-factorization + spatial-dim search over all seven
    /// dimensions.
    Searched,
    /// Restricted search over `K`/`C` tiling plus a categorical choice of
    /// hand-designed dataflow template.
    Fixed,
}

/// Hand-designed dataflow templates available in `fixed` mode
/// (spec.md §4.2/§6).
pub const FIXED_DATAFLOW_TEMPLATES: [&str; 3] = ["eye", "dla", "shi"];

/// Build the software [`Space`] for one layer under the given dataflow
/// family (spec.md §3's "Software space parameters").
///
/// Parameter order for `Searched`: `K, C, N, X, Y, R, S` tile
/// factorizations, followed by `l0_spatial_dim .. l{num_levels-1}_spatial_dim`.
/// Parameter order for `Fixed`: `K, C` tile factorizations, followed by
/// `dataflow`.
pub fn build_software_space(shape: &LayerShape, kind: DataflowKind, num_levels: usize) -> Space {
    let num_tile_levels = num_levels + 1;
    match kind {
        DataflowKind::Searched => {
            let mut params = Vec::with_capacity(7 + num_levels);
            for dim in ["K", "C", "N", "X", "Y", "R", "S"] {
                params.push(tile_parameter(dim, shape.get(dim), num_tile_levels));
            }
            for i in 0..num_levels {
                params.push(spatial_dim_parameter(i));
            }
            Space::new(params, num_levels)
        }
        DataflowKind::Fixed => {
            let mut params = Vec::with_capacity(3);
            params.push(tile_parameter("K", shape.k, num_tile_levels));
            params.push(tile_parameter("C", shape.c, num_tile_levels));
            params.push(Parameter::new(
                "dataflow",
                FIXED_DATAFLOW_TEMPLATES
                    .iter()
                    .map(|t| ParamValue::Str((*t).to_string()))
                    .collect(),
            ));
            Space::new(params, num_levels)
        }
    }
}

fn tile_parameter(dim: &str, value: i64, num_tile_levels: usize) -> Parameter {
    let range = combinations(value, num_tile_levels)
        .into_iter()
        .map(ParamValue::IntTuple)
        .collect();
    Parameter::new(dim, range)
}

fn spatial_dim_parameter(level: usize) -> Parameter {
    let range = DIM_ORDER
        .iter()
        .map(|d| ParamValue::Str((*d).to_string()))
        .collect();
    Parameter::new(format!("l{level}_spatial_dim"), range)
}
