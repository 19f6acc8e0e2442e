//! `accelco` -- hardware/software accelerator co-design search CLI
//! (spec.md §6).

use accelco::config::Config;
use accelco::error::{AccelError, Result};
use accelco::evaluator::native::NativeEvaluator;
use accelco::evaluator::FailureStats;
use accelco::optimizer::OptimizerConfig;
use accelco::results::{LayerTarget, Results, TargetMetric};
use accelco::samplers::bayes::kernel::KernelKind;
use accelco::search::{run_fixed_point, run_search, SamplerFamily, SamplerSpec, TrialConfig};
use accelco::shapes::load_layers;
use accelco::space::hardware::{HardwareSpaceConfig, Range};
use accelco::space::{ParamValue, Point};
use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "accelco", version, about = "Hardware/software accelerator co-design search")]
struct Cli {
    /// Path to the layer-shape model file (`name N K C X Y R S` lines).
    #[arg(long)]
    shapes: PathBuf,

    /// Hardware search strategy: random, grid, ga, bo, exhaustive, hypermapper.
    #[arg(long, default_value = "random")]
    hw_model: String,

    /// Software search strategy, same vocabulary as `--hw-model`.
    #[arg(long, default_value = "random")]
    sw_model: String,

    /// Target objective: edp or delay.
    #[arg(long, default_value = "edp")]
    target: String,

    /// Dataflow family: searched, eye, dla, shi.
    #[arg(long, default_value = "searched")]
    dataflow: String,

    /// Number of hardware points to collect.
    #[arg(long, default_value_t = 10)]
    n_hw: usize,

    /// Number of software mappings to collect per layer per hardware point.
    #[arg(long, default_value_t = 10)]
    n_sw: usize,

    /// Rejections allowed before a hardware point (or a layer) is abandoned.
    #[arg(long, default_value_t = 50)]
    max_invalid: usize,

    /// Maximum chip area accepted by the post-filter.
    #[arg(long, default_value_t = 1.0e7)]
    max_area: f64,

    /// Number of memory-hierarchy levels.
    #[arg(long, default_value_t = 2)]
    num_levels: usize,

    /// SIMD lane-count bounds, `low:high:step`.
    #[arg(long, default_value = "1:4:1")]
    simd: String,
    /// Bit-width bounds, `low:high:step`.
    #[arg(long, default_value = "8:16:8")]
    bit_width: String,
    /// Bandwidth bounds, `low:high:step`.
    #[arg(long, default_value = "1:4:1")]
    bandwidth: String,
    /// Per-level buffer-size bounds in kB, `low:high:step`, comma-separated,
    /// one entry per level. Defaults to `8:16:8` at every level.
    #[arg(long = "l-buf-kb", value_delimiter = ',')]
    l_buf_kb: Vec<String>,
    /// Inclusive PE-count range to factorize, `low:high`.
    #[arg(long, default_value = "4:64")]
    pe: String,

    /// GP kernel for the Bayesian sampler: linear, matern, rbf.
    #[arg(long, default_value = "rbf")]
    kernel: String,
    /// Batch size for the genetic/Bayesian samplers.
    #[arg(long, default_value_t = 16)]
    batch_size: usize,
    /// Random seed for the hardware sampler.
    #[arg(long, default_value_t = 0)]
    hw_seed: u64,
    /// Random seed for the software sampler.
    #[arg(long, default_value_t = 1)]
    sw_seed: u64,

    /// Start index (inclusive) of the exhaustive hardware-space window.
    #[arg(long)]
    exhaustive_hw_start_idx: Option<u64>,
    /// End index (exclusive) of the exhaustive hardware-space window.
    #[arg(long)]
    exhaustive_hw_end_idx: Option<u64>,

    /// Evaluate one explicit hardware point instead of searching (a JSON
    /// object mapping hardware parameter names to values).
    #[arg(long)]
    hw_point: Option<String>,

    /// Number of software candidates to evaluate concurrently per batch;
    /// `0`/`1` run the inner loop single-threaded.
    #[arg(long, default_value_t = 0)]
    sw_parallelism: usize,

    /// Search over dataflow loop-order permutations in the native evaluator.
    #[arg(long)]
    search_permutations: bool,

    /// Write the final report as JSON to this path instead of stdout.
    #[arg(long)]
    output_to_file: Option<PathBuf>,
}

fn parse_range(spec: &str, name: &str) -> Result<Range> {
    let parts: Vec<&str> = spec.split(':').collect();
    let [low, high, step] = parts.as_slice() else {
        return Err(AccelError::config(format!("{name} must be `low:high:step`, got `{spec}`")));
    };
    let parse_i64 = |s: &str| s.parse::<i64>().map_err(|e| AccelError::config(format!("{name}: {e}")));
    Ok(Range::new(parse_i64(low)?, parse_i64(high)?, parse_i64(step)?))
}

fn parse_pe_range(spec: &str) -> Result<(i64, i64)> {
    let parts: Vec<&str> = spec.split(':').collect();
    let [low, high] = parts.as_slice() else {
        return Err(AccelError::config(format!("--pe must be `low:high`, got `{spec}`")));
    };
    let parse_i64 = |s: &str| s.parse::<i64>().map_err(|e| AccelError::config(format!("--pe: {e}")));
    Ok((parse_i64(low)?, parse_i64(high)?))
}

/// Parse a `--hw-point`/`--sw-point` JSON literal into a [`Point`]: a JSON
/// object whose values are integers, strings, or integer arrays (spec.md
/// §6).
fn parse_point_json(json: &str) -> Result<Point> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let object = value
        .as_object()
        .ok_or_else(|| AccelError::config("point literal must be a JSON object"))?;

    let mut point = Point::new();
    for (key, v) in object {
        let param_value = match v {
            serde_json::Value::Number(n) => ParamValue::Int(
                n.as_i64()
                    .ok_or_else(|| AccelError::config(format!("{key}: not an integer")))?,
            ),
            serde_json::Value::String(s) => ParamValue::Str(s.clone()),
            serde_json::Value::Array(items) => {
                let ints = items
                    .iter()
                    .map(|item| {
                        item.as_i64()
                            .ok_or_else(|| AccelError::config(format!("{key}: array entries must be integers")))
                    })
                    .collect::<Result<Vec<i64>>>()?;
                ParamValue::IntTuple(ints)
            }
            other => return Err(AccelError::config(format!("{key}: unsupported JSON value `{other}`"))),
        };
        point.set(key.clone(), param_value);
    }
    Ok(point)
}

/// The final report emitted as JSON (spec.md §6's "output to file").
#[derive(Debug, Serialize)]
struct Report {
    status: &'static str,
    scalar: Option<f64>,
    area: Option<f64>,
}

fn area_of(target: &LayerTarget) -> f64 {
    match target {
        LayerTarget::Edp { area, .. } => *area,
        LayerTarget::Delay { area, .. } => *area,
    }
}

impl Report {
    fn from_target(target: Option<LayerTarget>) -> Self {
        match target {
            Some(t) => Report {
                status: "VALID",
                scalar: Some(t.scalar()),
                area: Some(area_of(&t)),
            },
            None => Report { status: "INVALID", scalar: None, area: None },
        }
    }

    fn from_search(results: &Results<Point>, n_hw: usize) -> Self {
        if results.len() < n_hw {
            return Report { status: "INVALID", scalar: None, area: None };
        }
        Report::from_target(results.best_target().copied())
    }
}

fn emit(report: &Report, path: Option<&std::path::Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    match path {
        Some(p) => std::fs::write(p, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn build_trial(cli: &Cli) -> anyhow::Result<(TrialConfig, Config)> {
    let config = Config::load().context("loading configuration")?;
    let layers = load_layers(&cli.shapes).context("loading layer shapes")?;

    let l_buf_kb = if cli.l_buf_kb.is_empty() {
        vec!["8:16:8".to_string(); cli.num_levels]
    } else {
        cli.l_buf_kb.clone()
    };
    if l_buf_kb.len() != cli.num_levels {
        anyhow::bail!("--l-buf-kb must supply exactly {} ranges, got {}", cli.num_levels, l_buf_kb.len());
    }
    let l_buf_sizes_kb = l_buf_kb
        .iter()
        .map(|s| parse_range(s, "--l-buf-kb"))
        .collect::<Result<Vec<_>>>()?;
    let (pe_low, pe_high) = parse_pe_range(&cli.pe)?;

    let hw_space_cfg = HardwareSpaceConfig {
        simd: parse_range(&cli.simd, "--simd")?,
        bit_width: parse_range(&cli.bit_width, "--bit-width")?,
        bandwidth: parse_range(&cli.bandwidth, "--bandwidth")?,
        l_buf_sizes_kb,
        pe_low,
        pe_high,
        num_levels: cli.num_levels,
    };

    let kernel = KernelKind::parse(&cli.kernel)?;
    let hw_sampler = SamplerSpec {
        family: SamplerFamily::parse(&cli.hw_model)?,
        seed: cli.hw_seed,
        batch_size: cli.batch_size,
        kernel,
        exhaustive_window: cli.exhaustive_hw_start_idx.zip(cli.exhaustive_hw_end_idx),
    };
    let sw_sampler = SamplerSpec {
        family: SamplerFamily::parse(&cli.sw_model)?,
        seed: cli.sw_seed,
        batch_size: cli.batch_size,
        kernel,
        exhaustive_window: None,
    };

    let optimizer = OptimizerConfig {
        target: TargetMetric::parse(&cli.target)?,
        max_area: cli.max_area,
        n_hw: cli.n_hw,
        n_sw: cli.n_sw,
        max_invalid: cli.max_invalid,
        num_levels: cli.num_levels,
        dataflow_family: cli.dataflow.clone(),
        search_permutations: cli.search_permutations,
        sw_parallelism: cli.sw_parallelism,
    };

    std::fs::create_dir_all(&config.output.log_dir).context("creating log directory")?;

    let trial = TrialConfig {
        hw_space_cfg,
        layers,
        hw_sampler,
        sw_sampler,
        optimizer,
        log_dir: config.output.log_dir.clone(),
    };
    Ok((trial, config))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (trial, config) = build_trial(&cli)?;

    let evaluator = NativeEvaluator::load(&config.evaluator.library_path, config.evaluator.dump_all)
        .context("loading native evaluator")?;
    let stats = FailureStats::new();

    let report = if let Some(json) = &cli.hw_point {
        let hw_point = parse_point_json(json).context("parsing --hw-point")?;
        tracing::info!(?hw_point, "evaluating explicit hardware point");
        Report::from_target(run_fixed_point(hw_point, &trial, &evaluator, &stats))
    } else {
        tracing::info!(n_hw = trial.optimizer.n_hw, n_sw = trial.optimizer.n_sw, "starting search");
        let results = run_search(&trial, &evaluator, &stats);
        Report::from_search(&results, trial.optimizer.n_hw)
    };

    for (category, count) in stats.snapshot_sorted() {
        tracing::info!(category, count, "rejection tally");
    }

    emit(&report, cli.output_to_file.as_deref())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading configuration")?;
    std::fs::create_dir_all(&config.output.log_dir).context("creating log directory")?;

    let file_appender = tracing_appender::rolling::daily(&config.output.log_dir, "accelco.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(non_blocking)
        .init();

    run(cli)
}
