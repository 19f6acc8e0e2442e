//! Entry-point wiring: turns a model-family string plus space/trial
//! settings into a running search (spec.md §4.4–§4.5, §6).

use crate::error::{AccelError, Result};
use crate::evaluator::{Evaluator, FailureStats};
use crate::features;
use crate::optimizer::{opt_hw_point, OptimizerConfig};
use crate::results::{LayerTarget, Results};
use crate::samplers::bayes::kernel::KernelKind;
use crate::samplers::bayes::{BayesSampler, FeatureFn};
use crate::samplers::genetic::GeneticSampler;
use crate::samplers::grid::GridSampler;
use crate::samplers::random::RandomSampler;
use crate::samplers::Sampler;
use crate::shapes::Layer;
use crate::space::hardware::{build_hardware_space, HardwareSpaceConfig};
use crate::space::software::DataflowKind;
use crate::space::{Point, Space};
use std::path::{Path, PathBuf};

/// Which search strategy drives one space (spec.md §4.4, §6's model-family
/// CLI values). `hypermapper` is accepted only to fail with a clear
/// "out of scope" error: it depends on an external Python package this
/// engine does not embed. `exhaustive` walks a bounded index window
/// sequentially rather than reusing the grid sampler's budget-modulo
/// quirk, since that quirk belongs to `grid` specifically (see
/// DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerFamily {
    Random,
    Grid,
    Genetic,
    Bayesian,
    Exhaustive,
}

impl SamplerFamily {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "random" => Ok(SamplerFamily::Random),
            "grid" => Ok(SamplerFamily::Grid),
            "ga" => Ok(SamplerFamily::Genetic),
            "bo" => Ok(SamplerFamily::Bayesian),
            "exhaustive" => Ok(SamplerFamily::Exhaustive),
            "hypermapper" => Err(AccelError::config(
                "the hypermapper model family requires the external HyperMapper Python package \
                 and is not implemented by this engine",
            )),
            other => Err(AccelError::UnknownVariant {
                kind: "model family",
                value: other.to_string(),
            }),
        }
    }
}

/// Search-strategy settings for one space (hardware or software), enough
/// to construct any [`SamplerFamily`]'s concrete sampler.
#[derive(Debug, Clone)]
pub struct SamplerSpec {
    pub family: SamplerFamily,
    pub seed: u64,
    /// Batch size for `ga`/`bo`; ignored by `random`/`grid`/`exhaustive`.
    pub batch_size: usize,
    /// GP covariance kernel for `bo`; ignored otherwise.
    pub kernel: KernelKind,
    /// Inclusive-exclusive index window for `exhaustive`; ignored
    /// otherwise (spec.md §6's `exhaustive-*-start-idx`/`-end-idx` flags).
    pub exhaustive_window: Option<(u64, u64)>,
}

/// Sequentially exhausts `[start, end)` under `Space::build_point`,
/// wrapping back to `start` once the window is spent rather than ever
/// reading a stale or out-of-window index (spec.md §4.5's `exhaustive`
/// resolution; see DESIGN.md — deliberately simpler than reusing
/// [`GridSampler`]'s budget-modulo/falsy-zero quirks, which are specific
/// to the `grid` family).
struct SequentialWindowSampler {
    start: u64,
    end: u64,
    cursor: u64,
}

impl SequentialWindowSampler {
    fn new(start: u64, end: u64) -> Self {
        assert!(start < end, "exhaustive window must be non-empty");
        SequentialWindowSampler {
            start,
            end,
            cursor: start,
        }
    }
}

impl Sampler for SequentialWindowSampler {
    fn reset(&mut self, _space: &Space) {
        self.cursor = self.start;
    }

    fn next(&mut self, space: &Space, _results: &Results<Point>) -> Point {
        space.build_point_u64(self.cursor)
    }

    fn notify(&mut self, _success: bool) {
        self.cursor += 1;
        if self.cursor >= self.end {
            self.cursor = self.start;
        }
    }
}

fn exhaustive_window(spec: &SamplerSpec, space: &Space) -> (u64, u64) {
    match spec.exhaustive_window {
        Some(window) => window,
        None => (0, biguint_to_u64_saturating(space.size())),
    }
}

fn biguint_to_u64_saturating(value: &num_bigint::BigUint) -> u64 {
    if value > &num_bigint::BigUint::from(u64::MAX) {
        u64::MAX
    } else {
        value.to_u64_digits().first().copied().unwrap_or(0)
    }
}

/// Build the hardware-space sampler for `spec` (spec.md §4.4's "10
/// warmup iterations, 0.1 exploration ratio" hardware defaults).
pub fn build_hw_sampler(spec: &SamplerSpec, hw_space: &Space, n_hw: usize) -> Box<dyn Sampler> {
    match spec.family {
        SamplerFamily::Random => Box::new(RandomSampler::new(spec.seed)),
        SamplerFamily::Grid => Box::new(GridSampler::new(n_hw as u64, spec.seed)),
        SamplerFamily::Exhaustive => {
            let (start, end) = exhaustive_window(spec, hw_space);
            Box::new(SequentialWindowSampler::new(start, end))
        }
        SamplerFamily::Genetic => Box::new(GeneticSampler::new(spec.batch_size, spec.seed)),
        SamplerFamily::Bayesian => {
            let num_levels = hw_space.num_levels;
            let feature_fn: FeatureFn = Box::new(move |p: &Point| features::hw_point_feats(p, num_levels));
            Box::new(BayesSampler::new(spec.kernel, 10, 0.1, spec.batch_size, feature_fn, spec.seed))
        }
    }
}

/// Build the per-layer software-space sampler for `spec` (spec.md §4.4's
/// "30 warmup iterations, 0.3 exploration ratio" software defaults). The
/// fixed hardware point is captured so the Bayesian sampler's feature
/// function can read hardware-dependent software features.
pub fn build_sw_sampler(
    spec: &SamplerSpec,
    sw_space: &Space,
    n_sw: usize,
    hw_point: Point,
    dataflow_kind: DataflowKind,
) -> Box<dyn Sampler> {
    match spec.family {
        SamplerFamily::Random => Box::new(RandomSampler::new(spec.seed)),
        SamplerFamily::Grid => Box::new(GridSampler::new(n_sw as u64, spec.seed)),
        SamplerFamily::Exhaustive => {
            let (start, end) = exhaustive_window(spec, sw_space);
            Box::new(SequentialWindowSampler::new(start, end))
        }
        SamplerFamily::Genetic => Box::new(GeneticSampler::new(spec.batch_size, spec.seed)),
        SamplerFamily::Bayesian => {
            let num_levels = sw_space.num_levels;
            let selector = features::SwFeatureSelector::default();
            let feature_fn: FeatureFn = Box::new(move |sw_point: &Point| {
                features::sw_point_feats(&hw_point, sw_point, num_levels, &selector, dataflow_kind)
            });
            Box::new(BayesSampler::new(spec.kernel, 30, 0.3, spec.batch_size, feature_fn, spec.seed))
        }
    }
}

/// Everything needed to run one trial end to end (spec.md §6's CLI
/// surface, collected into one value so `src/bin/accelco.rs` only has to
/// parse flags into this struct).
pub struct TrialConfig {
    pub hw_space_cfg: HardwareSpaceConfig,
    pub layers: Vec<Layer>,
    pub hw_sampler: SamplerSpec,
    pub sw_sampler: SamplerSpec,
    pub optimizer: OptimizerConfig,
    pub log_dir: PathBuf,
}

/// Run the full nested search (spec.md §4.5's `opt_hw`). Every layer's
/// inner loop gets its own sampler instance per hardware point, built
/// fresh from `trial.sw_sampler` (the sampler's internal state — batches,
/// GP history — does not carry across hardware points, matching the
/// reference's per-`opt_sw`-call sampler construction).
pub fn run_search(trial: &TrialConfig, evaluator: &dyn Evaluator, stats: &FailureStats) -> Results<Point> {
    let hw_space = build_hardware_space(&trial.hw_space_cfg);
    let mut hw_sampler = build_hw_sampler(&trial.hw_sampler, &hw_space, trial.optimizer.n_hw);

    let mut per_point_sw_sampler = PerPointSwSampler {
        spec: trial.sw_sampler.clone(),
        num_levels: trial.optimizer.num_levels,
        dataflow_kind: trial.optimizer.dataflow_kind(),
    };

    run_opt_hw_with_fresh_sw_samplers(
        evaluator,
        hw_sampler.as_mut(),
        &mut per_point_sw_sampler,
        &hw_space,
        &trial.layers,
        &trial.optimizer,
        &trial.log_dir,
        stats,
    )
}

/// Evaluate one explicit hardware point across every layer (spec.md §6's
/// `--hw-point` JSON-literal CLI mode, a.k.a. fixed-point mode).
pub fn run_fixed_point(
    hw_point: Point,
    trial: &TrialConfig,
    evaluator: &dyn Evaluator,
    stats: &FailureStats,
) -> Option<LayerTarget> {
    let dataflow_kind = trial.optimizer.dataflow_kind();
    let mut sw_sampler = build_sw_sampler(
        &trial.sw_sampler,
        &crate::space::software::build_software_space(
            &trial.layers[0].shape,
            dataflow_kind,
            trial.optimizer.num_levels,
        ),
        trial.optimizer.n_sw,
        hw_point.clone(),
        dataflow_kind,
    );
    opt_hw_point(
        evaluator,
        sw_sampler.as_mut(),
        &hw_point,
        &trial.layers,
        &trial.optimizer,
        &trial.log_dir,
        stats,
    )
}

/// Builds a fresh software sampler for each hardware point `opt_hw`
/// visits, since the concrete family and its feature function depend on
/// the hardware point being evaluated.
struct PerPointSwSampler {
    spec: SamplerSpec,
    num_levels: usize,
    dataflow_kind: DataflowKind,
}

/// Runs spec.md §4.5's outer loop directly (rather than through
/// [`opt_hw`]) so each hardware point gets its own freshly built software
/// sampler, matching the per-call sampler construction in the reference.
#[allow(clippy::too_many_arguments)]
fn run_opt_hw_with_fresh_sw_samplers(
    evaluator: &dyn Evaluator,
    hw_sampler: &mut dyn Sampler,
    sw_sampler_factory: &mut PerPointSwSampler,
    hw_space: &Space,
    layers: &[Layer],
    cfg: &OptimizerConfig,
    log_dir: &Path,
    stats: &FailureStats,
) -> Results<Point> {
    hw_sampler.reset(hw_space);
    let mut hw_results: Results<Point> = Results::new();
    let mut invalid = 0usize;

    while hw_results.len() < cfg.n_hw {
        let hw_point = hw_sampler.next(hw_space, &hw_results);
        let sw_space = crate::space::software::build_software_space(
            &layers[0].shape,
            sw_sampler_factory.dataflow_kind,
            sw_sampler_factory.num_levels,
        );
        let mut sw_sampler = build_sw_sampler(
            &sw_sampler_factory.spec,
            &sw_space,
            cfg.n_sw,
            hw_point.clone(),
            sw_sampler_factory.dataflow_kind,
        );

        let outcome = opt_hw_point(evaluator, sw_sampler.as_mut(), &hw_point, layers, cfg, log_dir, stats);
        hw_sampler.notify(outcome.is_some());
        match outcome {
            Some(target) => {
                let feats = features::hw_point_feats(&hw_point, cfg.num_levels);
                hw_results.add(hw_point, target, feats);
            }
            None => {
                invalid += 1;
                if invalid >= cfg.max_invalid {
                    break;
                }
            }
        }
    }
    hw_results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::FailureStats;
    use crate::results::{Cost, TargetMetric};
    use crate::space::software::LayerShape;
    use crate::constraints::LevelConfig;

    struct AlwaysValid;
    impl Evaluator for AlwaysValid {
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
            Some(Cost {
                exact_run_time: 1.0,
                overall_energy: 1.0,
                area: 10.0,
                power: 1.0,
                throughput: 1.0,
            })
        }
    }

    fn trial() -> TrialConfig {
        TrialConfig {
            hw_space_cfg: HardwareSpaceConfig::default_two_level(),
            layers: vec![Layer {
                name: "conv1".to_string(),
                shape: LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 },
                layer_type: "CONV",
            }],
            hw_sampler: SamplerSpec {
                family: SamplerFamily::Random,
                seed: 1,
                batch_size: 4,
                kernel: KernelKind::Rbf,
                exhaustive_window: None,
            },
            sw_sampler: SamplerSpec {
                family: SamplerFamily::Random,
                seed: 2,
                batch_size: 4,
                kernel: KernelKind::Rbf,
                exhaustive_window: None,
            },
            optimizer: OptimizerConfig {
                target: TargetMetric::Delay,
                max_area: 1_000_000.0,
                n_hw: 2,
                n_sw: 2,
                max_invalid: 5,
                num_levels: 2,
                dataflow_family: "searched".to_string(),
                search_permutations: false,
                sw_parallelism: 0,
            },
            log_dir: PathBuf::from("logs"),
        }
    }

    #[test]
    fn parse_rejects_hypermapper_with_explanatory_error() {
        let err = SamplerFamily::parse("hypermapper").unwrap_err();
        assert!(err.to_string().contains("HyperMapper"));
    }

    #[test]
    fn parse_rejects_unknown_family() {
        assert!(SamplerFamily::parse("bogus").is_err());
    }

    #[test]
    fn run_search_collects_n_hw_points_with_always_valid_evaluator() {
        let trial = trial();
        let evaluator = AlwaysValid;
        let stats = FailureStats::new();
        let results = run_search(&trial, &evaluator, &stats);
        assert_eq!(results.len(), trial.optimizer.n_hw);
    }

    #[test]
    fn run_fixed_point_evaluates_every_layer() {
        let trial = trial();
        let hw_space = build_hardware_space(&trial.hw_space_cfg);
        let hw_point = hw_space.build_point_u64(0);
        let evaluator = AlwaysValid;
        let stats = FailureStats::new();
        let target = run_fixed_point(hw_point, &trial, &evaluator, &stats).unwrap();
        assert_eq!(target.scalar(), 1.0);
    }
}
