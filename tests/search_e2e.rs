//! End-to-end search scenarios (spec.md §8), exercising the whole pipeline
//! -- space construction, samplers, the optimizer driver, and the entry
//! points in `search` -- against a stand-in [`Evaluator`] rather than the
//! real native library.

use accelco::evaluator::{Evaluator, FailureStats};
use accelco::optimizer::OptimizerConfig;
use accelco::results::{Cost, TargetMetric};
use accelco::samplers::bayes::kernel::KernelKind;
use accelco::search::{run_fixed_point, run_search, SamplerFamily, SamplerSpec, TrialConfig};
use accelco::shapes::Layer;
use accelco::space::hardware::{build_hardware_space, HardwareSpaceConfig, Range};
use accelco::space::software::LayerShape;
use accelco::constraints::LevelConfig;
use std::path::PathBuf;

/// Returns a fixed, always-feasible cost regardless of the candidate, so
/// every search scenario here is about the driver/sampler plumbing, not
/// about evaluator semantics.
struct ConstantEvaluator {
    cost: Cost,
}

impl Evaluator for ConstantEvaluator {
    fn evaluate(
        &self,
        _shape: &LayerShape,
        _layer_type: &str,
        _num_simd_lanes: u64,
        _bit_width: u64,
        _bandwidth: u64,
        _levels: &[LevelConfig],
        _dataflow: &str,
        _search_permutations: bool,
        _logpath: &str,
    ) -> Option<Cost> {
        Some(self.cost)
    }
}

struct AlwaysFailEvaluator;

impl Evaluator for AlwaysFailEvaluator {
    fn evaluate(
        &self,
        _shape: &LayerShape,
        _layer_type: &str,
        _num_simd_lanes: u64,
        _bit_width: u64,
        _bandwidth: u64,
        _levels: &[LevelConfig],
        _dataflow: &str,
        _search_permutations: bool,
        _logpath: &str,
    ) -> Option<Cost> {
        None
    }
}

fn single_layer() -> Vec<Layer> {
    vec![Layer {
        name: "conv1".to_string(),
        shape: LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 },
        layer_type: "CONV",
    }]
}

fn sampler_spec(seed: u64) -> SamplerSpec {
    SamplerSpec {
        family: SamplerFamily::Random,
        seed,
        batch_size: 4,
        kernel: KernelKind::Rbf,
        exhaustive_window: None,
    }
}

fn base_optimizer(target: TargetMetric) -> OptimizerConfig {
    OptimizerConfig {
        target,
        max_area: 1_000_000.0,
        n_hw: 1,
        n_sw: 1,
        max_invalid: 20,
        num_levels: 2,
        dataflow_family: "searched".to_string(),
        search_permutations: false,
        sw_parallelism: 0,
    }
}

/// Scenario 1: smallest HW space. A single-point hardware space (every
/// bound collapses to one value) has `size == 1`; after one random-sampler
/// draw the search must collect exactly that one point.
#[test]
fn smallest_hw_space_collects_its_single_point() {
    let hw_space_cfg = HardwareSpaceConfig {
        simd: Range::new(2, 2, 1),
        bit_width: Range::new(8, 8, 8),
        bandwidth: Range::new(64, 64, 1),
        l_buf_sizes_kb: vec![Range::new(32, 32, 1), Range::new(32, 32, 1)],
        pe_low: 4,
        pe_high: 4,
        num_levels: 2,
    };
    let hw_space = build_hardware_space(&hw_space_cfg);
    assert_eq!(hw_space.size(), &num_bigint::BigUint::from(1u32));
    let unique_point = hw_space.build_point_u64(0);

    let trial = TrialConfig {
        hw_space_cfg,
        layers: single_layer(),
        hw_sampler: sampler_spec(1),
        sw_sampler: sampler_spec(2),
        optimizer: base_optimizer(TargetMetric::Delay),
        log_dir: PathBuf::from("logs"),
    };
    let evaluator = ConstantEvaluator {
        cost: Cost { exact_run_time: 1.0, overall_energy: 1.0, area: 10.0, power: 1.0, throughput: 1.0 },
    };
    let stats = FailureStats::new();

    let results = run_search(&trial, &evaluator, &stats);
    assert_eq!(results.len(), 1);
    assert_eq!(*results.best().unwrap(), unique_point);
}

/// Scenario 6: budget exhaustion. An evaluator that always reports failure
/// must drive the inner (and outer) loop to `max_invalid` without ever
/// adding a sample.
#[test]
fn budget_exhaustion_yields_no_samples() {
    let hw_space_cfg = HardwareSpaceConfig::default_two_level();
    let trial = TrialConfig {
        hw_space_cfg,
        layers: single_layer(),
        hw_sampler: sampler_spec(10),
        sw_sampler: sampler_spec(11),
        optimizer: OptimizerConfig { max_invalid: 5, n_hw: 3, n_sw: 3, ..base_optimizer(TargetMetric::Edp) },
        log_dir: PathBuf::from("logs"),
    };
    let evaluator = AlwaysFailEvaluator;
    let stats = FailureStats::new();

    let results = run_search(&trial, &evaluator, &stats);
    assert!(results.is_empty());
    assert_eq!(stats.snapshot_sorted(), Vec::<(&str, u64)>::new());
}

/// A feasible fixed-point evaluation must score every layer and reduce to
/// one `LayerTarget` under the chosen metric -- the `--hw-point` CLI path.
#[test]
fn fixed_point_mode_scores_an_explicit_hardware_point() {
    let hw_space_cfg = HardwareSpaceConfig::default_two_level();
    let hw_space = build_hardware_space(&hw_space_cfg);
    let hw_point = hw_space.build_point_u64(0);

    let trial = TrialConfig {
        hw_space_cfg,
        layers: single_layer(),
        hw_sampler: sampler_spec(20),
        sw_sampler: sampler_spec(21),
        optimizer: base_optimizer(TargetMetric::Edp),
        log_dir: PathBuf::from("logs"),
    };
    let evaluator = ConstantEvaluator {
        cost: Cost { exact_run_time: 2.0, overall_energy: 3.0, area: 10.0, power: 1.0, throughput: 1.0 },
    };
    let stats = FailureStats::new();

    let target = run_fixed_point(hw_point, &trial, &evaluator, &stats).expect("feasible point must score");
    assert_eq!(target.scalar(), 6.0);
}

/// `hypermapper` is parsed only to fail with an explanatory configuration
/// error -- it is never reachable as a running sampler.
#[test]
fn hypermapper_model_family_is_rejected_before_a_search_ever_runs() {
    let err = SamplerFamily::parse("hypermapper").unwrap_err();
    assert!(err.to_string().to_lowercase().contains("hypermapper"));
}

/// A trial with two layers must aggregate both into the outer objective;
/// under the `Delay` metric that is a sum of per-layer delays.
#[test]
fn multi_layer_trial_sums_delay_across_layers() {
    let hw_space_cfg = HardwareSpaceConfig::default_two_level();
    let layers = vec![
        Layer { name: "conv1".to_string(), shape: LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 }, layer_type: "CONV" },
        Layer { name: "conv2".to_string(), shape: LayerShape { n: 1, k: 8, c: 4, x: 4, y: 4, r: 3, s: 3 }, layer_type: "CONV" },
    ];
    let trial = TrialConfig {
        hw_space_cfg,
        layers,
        hw_sampler: sampler_spec(30),
        sw_sampler: sampler_spec(31),
        optimizer: base_optimizer(TargetMetric::Delay),
        log_dir: PathBuf::from("logs"),
    };
    let evaluator = ConstantEvaluator {
        cost: Cost { exact_run_time: 2.5, overall_energy: 1.0, area: 5.0, power: 1.0, throughput: 1.0 },
    };
    let stats = FailureStats::new();

    let results = run_search(&trial, &evaluator, &stats);
    assert_eq!(results.len(), 1);
    assert_eq!(results.best_target().unwrap().scalar(), 5.0);
}
