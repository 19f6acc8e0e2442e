//! Native cost-model library binding via `libloading`, matching
//! `interface.py`'s `ctypes.CDLL` ABI exactly (spec.md §4.3, §6).

use super::dataflow;
use super::Evaluator;
use crate::constraints::LevelConfig;
use crate::error::{AccelError, Result};
use crate::results::Cost;
use crate::space::software::{LayerShape, DIM_ORDER};
use libloading::{Library, Symbol};
use std::ffi::CString;
use std::os::raw::{c_char, c_ulonglong};
use std::path::Path;

/// Standard five-`double` ABI signature: `evaluate(shape, layer_type,
/// num_pes, num_simd_lanes, bit_width, bandwidth, num_levels, buf_sizes,
/// num_sub_clusters, dataflow, search_permutations, logpath) -> *const f64`
/// (5-entry array: `[ExactRunTime, OverallEnergy, Area, Power,
/// Throughput]`).
type EvaluateFn = unsafe extern "C" fn(
    *const c_ulonglong,
    *const c_char,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    *const c_ulonglong,
    *const c_ulonglong,
    *const c_char,
    c_ulonglong,
    *const c_char,
) -> *const f64;

/// The `evaluateWithDump` ABI variant: identical arguments, returns a
/// NUL-terminated JSON string instead of a fixed double array
/// (spec.md §6, used when `dump_all` is configured).
type EvaluateWithDumpFn = unsafe extern "C" fn(
    *const c_ulonglong,
    *const c_char,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    c_ulonglong,
    *const c_ulonglong,
    *const c_ulonglong,
    *const c_char,
    c_ulonglong,
    *const c_char,
) -> *const c_char;

/// Loads `libspotlight.{so,dylib}` and calls into it per spec.md §4.3/§6.
pub struct NativeEvaluator {
    _library: Library,
    dump_all: bool,
    evaluate: Option<EvaluateFn>,
    evaluate_with_dump: Option<EvaluateWithDumpFn>,
}

impl NativeEvaluator {
    /// Load the shared library at `path` and resolve `evaluate` or
    /// `evaluateWithDump`, matching `dump_all`.
    pub fn load(path: &Path, dump_all: bool) -> Result<Self> {
        let library = unsafe { Library::new(path) }.map_err(|e| AccelError::NativeLibrary {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (evaluate, evaluate_with_dump) = unsafe {
            if dump_all {
                let symbol: Symbol<EvaluateWithDumpFn> =
                    library
                        .get(b"evaluateWithDump\0")
                        .map_err(|e| AccelError::NativeLibrary {
                            path: path.to_path_buf(),
                            message: e.to_string(),
                        })?;
                (None, Some(*symbol))
            } else {
                let symbol: Symbol<EvaluateFn> =
                    library.get(b"evaluate\0").map_err(|e| AccelError::NativeLibrary {
                        path: path.to_path_buf(),
                        message: e.to_string(),
                    })?;
                (Some(*symbol), None)
            }
        };

        Ok(NativeEvaluator {
            _library: library,
            dump_all,
            evaluate,
            evaluate_with_dump,
        })
    }
}

/// Build the 14-entry shape array: `(in, out)` pairs for each dimension in
/// `[N,K,C,X,Y,R,S]` order (spec.md §6's `itertools.chain` construction).
/// The input dims are the shape's own values; the reference treats the
/// layer's output dims identically to its input dims for every dimension
/// except the spatial ones, which the native model recomputes internally —
/// we pass the same shape for both, matching `interface.py`'s call sites
/// where `shape[1]` and `shape[2]` are populated identically for the
/// loader boundary in scope here (see `crate::shapes`).
fn build_shape_array(shape: &LayerShape) -> [u64; 14] {
    let mut out = [0u64; 14];
    for (i, dim) in DIM_ORDER.iter().enumerate() {
        let v = shape.get(dim) as u64;
        out[2 * i] = v;
        out[2 * i + 1] = v;
    }
    out
}

impl Evaluator for NativeEvaluator {
    fn evaluate(
        &self,
        shape: &LayerShape,
        layer_type: &str,
        num_simd_lanes: u64,
        bit_width: u64,
        bandwidth: u64,
        levels: &[LevelConfig],
        dataflow_string: &str,
        search_permutations: bool,
        logpath: &str,
    ) -> Option<Cost> {
        let shape_array = build_shape_array(shape);
        let layer_type_c = CString::new(layer_type).ok()?;
        let dataflow_c = CString::new(dataflow_string).ok()?;
        let logpath_c = CString::new(logpath).ok()?;

        let num_pes: u64 = levels.iter().map(|l| l.num_sub_clusters as u64).product();
        let buf_sizes: Vec<u64> = levels
            .iter()
            .map(|l| (l.inp_buf_size + l.wgt_buf_size + l.out_buf_size) as u64 / 3)
            .collect();
        let num_sub_clusters: Vec<u64> = levels.iter().map(|l| l.num_sub_clusters as u64).collect();

        if self.dump_all {
            let f = self.evaluate_with_dump?;
            let raw = unsafe {
                f(
                    shape_array.as_ptr(),
                    layer_type_c.as_ptr(),
                    num_pes,
                    num_simd_lanes,
                    bit_width,
                    bandwidth,
                    levels.len() as u64,
                    buf_sizes.as_ptr(),
                    num_sub_clusters.as_ptr(),
                    dataflow_c.as_ptr(),
                    search_permutations as u64,
                    logpath_c.as_ptr(),
                )
            };
            if raw.is_null() {
                return None;
            }
            let json_str = unsafe { std::ffi::CStr::from_ptr(raw) }.to_str().ok()?;
            let value: serde_json::Value = serde_json::from_str(json_str).ok()?;
            Some(Cost {
                exact_run_time: value.get("ExactRunTime")?.as_f64()?,
                overall_energy: value.get("OverallEnergy")?.as_f64()?,
                area: value.get("Area")?.as_f64()?,
                power: value.get("Power")?.as_f64()?,
                throughput: value.get("Throughput")?.as_f64()?,
            })
        } else {
            let f = self.evaluate?;
            let raw = unsafe {
                f(
                    shape_array.as_ptr(),
                    layer_type_c.as_ptr(),
                    num_pes,
                    num_simd_lanes,
                    bit_width,
                    bandwidth,
                    levels.len() as u64,
                    buf_sizes.as_ptr(),
                    num_sub_clusters.as_ptr(),
                    dataflow_c.as_ptr(),
                    search_permutations as u64,
                    logpath_c.as_ptr(),
                )
            };
            if raw.is_null() {
                return None;
            }
            let values = unsafe { std::slice::from_raw_parts(raw, 5) };
            Some(Cost {
                exact_run_time: values[0],
                overall_energy: values[1],
                area: values[2],
                power: values[3],
                throughput: values[4],
            })
        }
    }
}

/// Build the dataflow string for the given family, mutating `levels` in
/// place for the `searched` family's inter-level clamp (spec.md §4.3).
pub fn dataflow_for(
    family: &str,
    shape: &LayerShape,
    levels: &mut [LevelConfig],
) -> Option<String> {
    if family == "searched" {
        Some(dataflow::build_searched(levels))
    } else {
        dataflow::build_fixed(family, shape, levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_array_duplicates_in_and_out_dims() {
        let shape = LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 };
        let array = build_shape_array(&shape);
        assert_eq!(array[0], 1);
        assert_eq!(array[1], 1);
        assert_eq!(array[2], 4);
        assert_eq!(array[3], 4);
        assert_eq!(array.len(), 14);
    }
}
