//! Nested hardware/software co-optimization driver (spec.md §4.5): the
//! outer loop over hardware points and, for each, the inner loop over every
//! layer's software mapping, reduced to a single outer objective.

use crate::constraints::LevelConfig;
use crate::evaluator::native::dataflow_for;
use crate::evaluator::{post_filter, Evaluator, FailureStats};
use crate::features::{self, SwFeatureSelector};
use crate::results::{Cost, LayerTarget, Results, TargetMetric};
use crate::samplers::Sampler;
use crate::shapes::Layer;
use crate::space::software::{build_software_space, DataflowKind, LayerShape, DIM_ORDER};
use crate::space::{Point, Space};
use std::collections::HashMap;
use std::path::Path;
use std::sync::mpsc;
use std::thread;

/// Search budgets and fixed choices shared across one trial's outer and
/// inner loops (spec.md §4.5, §6).
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    pub target: TargetMetric,
    pub max_area: f64,
    pub n_hw: usize,
    pub n_sw: usize,
    pub max_invalid: usize,
    pub num_levels: usize,
    /// `"searched"` or one of the fixed templates (`"eye"`, `"dla"`, `"shi"`).
    pub dataflow_family: String,
    pub search_permutations: bool,
    /// `0`/`1` run the inner loop single-threaded; `>1` evaluates that many
    /// software candidates concurrently per batch (spec.md §5).
    pub sw_parallelism: usize,
}

impl OptimizerConfig {
    /// Which dataflow family this trial's `dataflow_family` string selects.
    pub fn dataflow_kind(&self) -> DataflowKind {
        if self.dataflow_family == "searched" {
            DataflowKind::Searched
        } else {
            DataflowKind::Fixed
        }
    }
}

/// Build the per-level hardware/software configuration for one (HW, SW)
/// point pair (spec.md §3's `LevelConfig`, resolved per DESIGN.md).
///
/// `subclusters[i]`, `l{i}_buf_size` and `l{i}_spatial_dim` all index the
/// same raw point position `i`, and a level's buffer budget is divided by
/// the product of every `subclusters` entry at a raw position closer to the
/// PE (`subclusters[i+1..]`). A level's tile size for each dimension is the
/// cumulative product of that dimension's raw tile-factorization entries
/// from index `0` up to `i` inclusive, so it grows monotonically with `i` --
/// every attribute is read against the same raw-position convention. The
/// whole `Vec` is then reversed once so the returned levels are in this
/// crate's canonical DRAM-closest-first order (index `0` farthest from the
/// PE), matching the source's `aggregate_tile_sizes`/`level_configs.reverse()`
/// pairing (see DESIGN.md).
///
/// `sw_point` is `None` for a HW-only context (no tiling applied; every
/// level's tile size defaults to the full dimension value).
pub fn build_level_configs(
    hw_point: &Point,
    sw_point: Option<&Point>,
    shape: &LayerShape,
    num_levels: usize,
) -> Vec<LevelConfig> {
    let subclusters = hw_point.get_int_tuple("subclusters").unwrap_or(&[]);
    let mut levels = Vec::with_capacity(num_levels);

    for i in 0..num_levels {
        let num_sub_clusters = *subclusters.get(i).unwrap_or(&1);
        let partition_count: i64 = subclusters.get(i + 1..).unwrap_or(&[]).iter().product();
        let raw_buf = hw_point.get_int(&format!("l{i}_buf_size")).unwrap_or(1);
        let buf_per_partition = raw_buf / partition_count;

        let mut tile_sizes: HashMap<&'static str, i64> = HashMap::new();
        for dim in DIM_ORDER {
            let tile = match sw_point.and_then(|p| p.get_int_tuple(dim)) {
                Some(raw) => {
                    let take = (i + 1).min(raw.len());
                    raw[..take].iter().product()
                }
                None => shape.get(dim),
            };
            tile_sizes.insert(dim, tile);
        }

        let spatial_dim = sw_point
            .and_then(|p| p.get_str(&format!("l{i}_spatial_dim")))
            .and_then(|s| DIM_ORDER.iter().find(|d| **d == s).copied());

        levels.push(LevelConfig::new(
            format!("L{i}"),
            buf_per_partition,
            num_sub_clusters,
            tile_sizes,
            spatial_dim,
        ));
    }
    levels.reverse();
    for (idx, level) in levels.iter_mut().enumerate() {
        level.label = format!("L{idx}");
    }
    levels
}

/// Evaluate one (HW point, SW point) candidate end to end: build its level
/// configs, the dataflow string, call the evaluator, then post-filter
/// (spec.md §4.2–§4.3). `None` covers every rejection reason; the reason
/// itself is already recorded in `stats`.
#[allow(clippy::too_many_arguments)]
fn evaluate_sw_point(
    evaluator: &dyn Evaluator,
    hw_point: &Point,
    sw_point: &Point,
    shape: &LayerShape,
    layer_type: &str,
    dataflow_family: &str,
    num_levels: usize,
    max_area: f64,
    search_permutations: bool,
    logpath: &str,
    stats: &FailureStats,
) -> Option<Cost> {
    let mut levels = build_level_configs(hw_point, Some(sw_point), shape, num_levels);
    let dataflow = dataflow_for(dataflow_family, shape, &mut levels)?;

    let num_simd_lanes = hw_point.get_int("num_simd_lane")? as u64;
    let bit_width = hw_point.get_int("bit_width")? as u64;
    let bandwidth = hw_point.get_int("bandwidth")? as u64;

    let area_params = crate::constraints::AreaParams {
        bit_width: bit_width as i64,
        bandwidth: bandwidth as i64,
        num_simd_lanes: num_simd_lanes as i64,
    };
    if !crate::constraints::is_feasible(&levels, &area_params, max_area) {
        tracing::debug!(?dataflow, "candidate fails the analytical feasibility pre-check; evaluating anyway");
    }

    let cost = evaluator.evaluate(
        shape,
        layer_type,
        num_simd_lanes,
        bit_width,
        bandwidth,
        &levels,
        &dataflow,
        search_permutations,
        logpath,
    )?;

    post_filter(&cost, max_area, stats).then_some(cost)
}

/// Feature vector for one software-mapping candidate, the form
/// [`Results::feats`] stores so the Bayesian surrogate can retrain on a
/// candidate's history regardless of which sampler produced it.
fn sw_feats(hw_point: &Point, sw_point: &Point, cfg: &OptimizerConfig) -> Vec<f64> {
    let selector = SwFeatureSelector::default();
    features::sw_point_feats(hw_point, sw_point, cfg.num_levels, &selector, cfg.dataflow_kind())
}

/// Feature vector for one hardware-point candidate, stored in
/// [`Results::feats`] alongside the outer objective's scalar.
fn hw_feats(hw_point: &Point, cfg: &OptimizerConfig) -> Vec<f64> {
    features::hw_point_feats(hw_point, cfg.num_levels)
}

/// Inner per-layer software-mapping search for one fixed hardware point
/// (spec.md §4.5's `opt_sw`). Returns the accepted samples once `n_sw` have
/// been collected, or `None` if `max_invalid` rejections were hit first.
#[allow(clippy::too_many_arguments)]
pub fn opt_sw(
    evaluator: &dyn Evaluator,
    sampler: &mut dyn Sampler,
    hw_point: &Point,
    shape: &LayerShape,
    layer_type: &str,
    cfg: &OptimizerConfig,
    logpath: &str,
    stats: &FailureStats,
) -> Option<Results<Point>> {
    let sw_space = build_software_space(shape, cfg.dataflow_kind(), cfg.num_levels);
    sampler.reset(&sw_space);

    let mut results: Results<Point> = Results::new();
    let mut invalid = 0usize;

    while results.len() < cfg.n_sw {
        let sw_point = sampler.next(&sw_space, &results);
        let outcome = evaluate_sw_point(
            evaluator,
            hw_point,
            &sw_point,
            shape,
            layer_type,
            &cfg.dataflow_family,
            cfg.num_levels,
            cfg.max_area,
            cfg.search_permutations,
            logpath,
            stats,
        );
        sampler.notify(outcome.is_some());
        match outcome {
            Some(cost) => {
                let feats = sw_feats(hw_point, &sw_point, cfg);
                results.add(sw_point, LayerTarget::from_cost(cfg.target, &cost), feats);
            }
            None => {
                invalid += 1;
                if invalid >= cfg.max_invalid {
                    return None;
                }
            }
        }
    }
    Some(results)
}

/// Concurrent variant of [`opt_sw`]: draws a batch of up to
/// `cfg.sw_parallelism` candidates on the calling thread, evaluates them on
/// worker threads, then replays the outcomes onto `results`/`sampler` in
/// dispatch order (spec.md §5).
///
/// Because the batch is drawn before any of its candidates are evaluated,
/// `sampler.notify` cannot yet report a real outcome for the later members
/// of the batch; this implementation optimistically notifies `true` at draw
/// time so samplers with per-call state (grid, genetic) still advance, and
/// accepts that a sampler's own success bookkeeping is therefore
/// approximate under parallelism — `Results::add` itself is unaffected,
/// since it replays outcomes in exact dispatch order (see DESIGN.md).
#[allow(clippy::too_many_arguments)]
pub fn opt_sw_parallel(
    evaluator: &(dyn Evaluator + Sync),
    sampler: &mut dyn Sampler,
    hw_point: &Point,
    shape: &LayerShape,
    layer_type: &str,
    cfg: &OptimizerConfig,
    logpath: &str,
    stats: &FailureStats,
) -> Option<Results<Point>> {
    let sw_space = build_software_space(shape, cfg.dataflow_kind(), cfg.num_levels);
    sampler.reset(&sw_space);

    let mut results: Results<Point> = Results::new();
    let mut invalid = 0usize;
    let parallelism = cfg.sw_parallelism.max(1);

    while results.len() < cfg.n_sw && invalid < cfg.max_invalid {
        let batch_size = parallelism.min(cfg.n_sw - results.len());
        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            let point = sampler.next(&sw_space, &results);
            sampler.notify(true);
            batch.push(point);
        }

        let mut outcomes: Vec<Option<Option<Cost>>> = (0..batch.len()).map(|_| None).collect();
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for (idx, sw_point) in batch.iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move || {
                    let cost = evaluate_sw_point(
                        evaluator,
                        hw_point,
                        sw_point,
                        shape,
                        layer_type,
                        &cfg.dataflow_family,
                        cfg.num_levels,
                        cfg.max_area,
                        cfg.search_permutations,
                        logpath,
                        stats,
                    );
                    tx.send((idx, cost)).expect("optimizer aggregator channel closed early");
                });
            }
            drop(tx);
            for (idx, cost) in rx {
                outcomes[idx] = Some(cost);
            }
        });

        for (point, outcome) in batch.into_iter().zip(outcomes) {
            match outcome.expect("every dispatched candidate reports exactly once") {
                Some(cost) => {
                    let feats = sw_feats(hw_point, &point, cfg);
                    results.add(point, LayerTarget::from_cost(cfg.target, &cost), feats);
                }
                None => {
                    invalid += 1;
                    if invalid >= cfg.max_invalid {
                        break;
                    }
                }
            }
        }
    }

    (results.len() >= cfg.n_sw).then_some(results)
}

/// Reduce every layer's best per-layer target into the single outer
/// objective for one hardware point (spec.md §4.5's outer aggregation).
pub fn aggregate_layers(metric: TargetMetric, layer_targets: &[LayerTarget]) -> LayerTarget {
    match metric {
        TargetMetric::Edp => {
            let mut sum_energy = 0.0;
            let mut sum_delay = 0.0;
            let mut max_area: f64 = 0.0;
            for target in layer_targets {
                if let LayerTarget::Edp { energy, delay, area } = target {
                    sum_energy += energy;
                    sum_delay += delay;
                    max_area = max_area.max(*area);
                }
            }
            LayerTarget::Edp {
                energy: sum_energy,
                delay: sum_delay,
                area: max_area,
            }
        }
        TargetMetric::Delay => {
            let mut sum_delay = 0.0;
            let mut max_area: f64 = 0.0;
            for target in layer_targets {
                if let LayerTarget::Delay { delay, area } = target {
                    sum_delay += delay;
                    max_area = max_area.max(*area);
                }
            }
            LayerTarget::Delay {
                delay: sum_delay,
                area: max_area,
            }
        }
    }
}

/// Run the inner loop over every layer for one fixed hardware point,
/// aggregating into the outer objective. `None` if any layer's inner loop
/// exhausted `max_invalid` (spec.md §4.5's "if inner loop aborts, the HW
/// point is reported invalid").
pub fn opt_hw_point(
    evaluator: &dyn Evaluator,
    sw_sampler: &mut dyn Sampler,
    hw_point: &Point,
    layers: &[Layer],
    cfg: &OptimizerConfig,
    log_dir: &Path,
    stats: &FailureStats,
) -> Option<LayerTarget> {
    let mut layer_targets = Vec::with_capacity(layers.len());
    for layer in layers {
        let logpath = log_dir.join(format!("{}.log", layer.name));
        let logpath = logpath.to_string_lossy();
        let results = if cfg.sw_parallelism > 1 {
            opt_sw_parallel(
                evaluator,
                sw_sampler,
                hw_point,
                &layer.shape,
                layer.layer_type,
                cfg,
                &logpath,
                stats,
            )?
        } else {
            opt_sw(evaluator, sw_sampler, hw_point, &layer.shape, layer.layer_type, cfg, &logpath, stats)?
        };
        layer_targets.push(*results.best_target()?);
    }
    Some(aggregate_layers(cfg.target, &layer_targets))
}

/// Outer hardware-point search (spec.md §4.5's `opt_hw`): drives `hw_space`
/// with `hw_sampler` until `n_hw` valid hardware points are collected or
/// `max_invalid` is exhausted, tracking the running best under `cfg.target`.
#[allow(clippy::too_many_arguments)]
pub fn opt_hw(
    evaluator: &dyn Evaluator,
    hw_sampler: &mut dyn Sampler,
    sw_sampler: &mut dyn Sampler,
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
        let outcome = opt_hw_point(evaluator, sw_sampler, &hw_point, layers, cfg, log_dir, stats);
        hw_sampler.notify(outcome.is_some());
        match outcome {
            Some(target) => {
                let feats = hw_feats(&hw_point, cfg);
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
    use crate::space::hardware::{build_hardware_space, HardwareSpaceConfig};
    use crate::space::software::DataflowKind;
    use crate::samplers::random::RandomSampler;

    fn sample_shape() -> LayerShape {
        LayerShape { n: 1, k: 4, c: 2, x: 8, y: 8, r: 3, s: 3 }
    }

    fn base_cfg() -> OptimizerConfig {
        OptimizerConfig {
            target: TargetMetric::Delay,
            max_area: 1_000_000.0,
            n_hw: 2,
            n_sw: 2,
            max_invalid: 5,
            num_levels: 2,
            dataflow_family: "searched".to_string(),
            search_permutations: false,
            sw_parallelism: 0,
        }
    }

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
                exact_run_time: 2.0,
                overall_energy: 3.0,
                area: 10.0,
                power: 1.0,
                throughput: 1.0,
            })
        }
    }

    struct AlwaysInvalid;
    impl Evaluator for AlwaysInvalid {
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

    #[test]
    fn level_tile_sizes_are_cumulative_and_non_increasing_toward_pe() {
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let hw_point = hw_space.build_point_u64(0);
        let shape = sample_shape();
        let sw_space = build_software_space(&shape, DataflowKind::Searched, 2);
        let sw_point = sw_space.build_point_u64(0);

        let levels = build_level_configs(&hw_point, Some(&sw_point), &shape, 2);
        assert_eq!(levels.len(), 2);
        // level 0 (DRAM-closest) holds the larger cumulative tile.
        for dim in DIM_ORDER {
            let outer = *levels[0].tile_sizes.get(dim).unwrap();
            let inner = *levels[1].tile_sizes.get(dim).unwrap();
            assert!(outer >= inner, "dim {dim}: outer={outer} inner={inner}");
        }
    }

    #[test]
    fn buffer_partition_count_divides_closer_to_pe_levels_only() {
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let hw_point = hw_space.build_point_u64(0);
        let shape = sample_shape();
        let levels = build_level_configs(&hw_point, None, &shape, 2);
        let subclusters = hw_point.get_int_tuple("subclusters").unwrap();
        // level 0 (DRAM-closest) is raw position 1 after the reversal, so
        // it has nothing closer to the PE than itself to divide by.
        let l1_buf = hw_point.get_int("l1_buf_size").unwrap();
        assert_eq!(levels[0].inp_buf_size, l1_buf);
        // level 1 (PE-closest) is raw position 0, divided by subclusters[1].
        let l0_buf = hw_point.get_int("l0_buf_size").unwrap();
        assert_eq!(levels[1].inp_buf_size, l0_buf / subclusters[1]);
    }

    #[test]
    fn opt_sw_exhausts_max_invalid_and_returns_none() {
        let evaluator = AlwaysInvalid;
        let mut sampler = RandomSampler::new(1);
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let hw_point = hw_space.build_point_u64(0);
        let shape = sample_shape();
        let cfg = base_cfg();
        let stats = FailureStats::new();

        let result = opt_sw(&evaluator, &mut sampler, &hw_point, &shape, "CONV", &cfg, "logs/test.log", &stats);
        assert!(result.is_none());
    }

    #[test]
    fn opt_sw_collects_n_sw_valid_samples() {
        let evaluator = AlwaysValid;
        let mut sampler = RandomSampler::new(2);
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let hw_point = hw_space.build_point_u64(0);
        let shape = sample_shape();
        let cfg = base_cfg();
        let stats = FailureStats::new();

        let results = opt_sw(&evaluator, &mut sampler, &hw_point, &shape, "CONV", &cfg, "logs/test.log", &stats)
            .expect("always-valid evaluator should fill the batch");
        assert_eq!(results.len(), cfg.n_sw);
        assert_eq!(results.best_target().unwrap().scalar(), 2.0);
    }

    #[test]
    fn opt_hw_point_requires_every_layer_to_succeed() {
        let evaluator = AlwaysValid;
        let mut sw_sampler = RandomSampler::new(3);
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let hw_point = hw_space.build_point_u64(0);
        let layers = vec![
            Layer { name: "l0".to_string(), shape: sample_shape(), layer_type: "CONV" },
            Layer { name: "l1".to_string(), shape: sample_shape(), layer_type: "CONV" },
        ];
        let cfg = base_cfg();
        let stats = FailureStats::new();
        let dir = tempfile::tempdir().unwrap();

        let target = opt_hw_point(&evaluator, &mut sw_sampler, &hw_point, &layers, &cfg, dir.path(), &stats)
            .expect("both layers succeed");
        // Two layers, each contributing delay=2.0 under the preserved-scalar
        // Delay target: aggregate is the sum.
        assert_eq!(target.scalar(), 4.0);
    }

    #[test]
    fn opt_hw_collects_n_hw_points_with_always_valid_evaluator() {
        let evaluator = AlwaysValid;
        let mut hw_sampler = RandomSampler::new(4);
        let mut sw_sampler = RandomSampler::new(5);
        let hw_space = build_hardware_space(&HardwareSpaceConfig::default_two_level());
        let layers = vec![Layer { name: "l0".to_string(), shape: sample_shape(), layer_type: "CONV" }];
        let cfg = base_cfg();
        let stats = FailureStats::new();
        let dir = tempfile::tempdir().unwrap();

        let hw_results = opt_hw(&evaluator, &mut hw_sampler, &mut sw_sampler, &hw_space, &layers, &cfg, dir.path(), &stats);
        assert_eq!(hw_results.len(), cfg.n_hw);
    }

    #[test]
    fn aggregate_edp_sums_energy_and_delay_and_takes_max_area() {
        let targets = vec![
            LayerTarget::Edp { energy: 1.0, delay: 2.0, area: 5.0 },
            LayerTarget::Edp { energy: 3.0, delay: 4.0, area: 9.0 },
        ];
        let aggregate = aggregate_layers(TargetMetric::Edp, &targets);
        match aggregate {
            LayerTarget::Edp { energy, delay, area } => {
                assert_eq!(energy, 4.0);
                assert_eq!(delay, 6.0);
                assert_eq!(area, 9.0);
            }
            _ => panic!("expected Edp aggregate"),
        }
    }
}
