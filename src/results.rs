//! Per-layer/per-point cost samples and the chronological reduction monoid
//! that both feeds the BO surrogate and tracks the running best
//! (spec.md §3, §4.5, §8).

/// The five raw outputs of one native evaluator call (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cost {
    pub exact_run_time: f64,
    pub overall_energy: f64,
    pub area: f64,
    pub power: f64,
    pub throughput: f64,
}

/// Which scalar objective the search optimizes (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetMetric {
    /// Energy-delay product.
    Edp,
    /// Delay alone.
    Delay,
}

impl TargetMetric {
    /// Parse a CLI/config string (`"edp"` / `"delay"`).
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "edp" => Ok(TargetMetric::Edp),
            "delay" => Ok(TargetMetric::Delay),
            other => Err(crate::error::AccelError::UnknownVariant {
                kind: "target metric",
                value: other.to_string(),
            }),
        }
    }
}

/// Per-layer software-mapping target, ordered by the chosen metric
/// (spec.md §4.5): for EDP, `(energy, delay, area)` ordered by
/// `energy*delay` ascending with area as tiebreak; for delay,
/// `(delay, area)` ordered by delay ascending with area as tiebreak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayerTarget {
    Edp { energy: f64, delay: f64, area: f64 },
    Delay { delay: f64, area: f64 },
}

impl LayerTarget {
    pub fn from_cost(metric: TargetMetric, cost: &Cost) -> Self {
        match metric {
            TargetMetric::Edp => LayerTarget::Edp {
                energy: cost.overall_energy,
                delay: cost.exact_run_time,
                area: cost.area,
            },
            TargetMetric::Delay => LayerTarget::Delay {
                delay: cost.exact_run_time,
                area: cost.area,
            },
        }
    }

    /// Scalar used for comparison: `energy*delay` for EDP, `delay` alone
    /// otherwise.
    pub fn scalar(&self) -> f64 {
        match self {
            LayerTarget::Edp { energy, delay, .. } => energy * delay,
            LayerTarget::Delay { delay, .. } => *delay,
        }
    }

    fn area(&self) -> f64 {
        match self {
            LayerTarget::Edp { area, .. } => *area,
            LayerTarget::Delay { area, .. } => *area,
        }
    }

    /// Total order: ascending scalar, ties broken by ascending area
    /// (spec.md §4.5).
    pub fn cmp_order(&self, other: &Self) -> std::cmp::Ordering {
        self.scalar()
            .partial_cmp(&other.scalar())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                self.area()
                    .partial_cmp(&other.area())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

/// The chronological reduction monoid spec.md §3/§4.5/§8 calls `Results`:
/// tracks every evaluated scalar and feature vector in call order (feeding
/// the BO surrogate's training set) and the running best sample under `T`'s
/// ordering.
#[derive(Debug, Clone)]
pub struct Results<T> {
    /// Chronological scalar values, one per `add` call, in call order —
    /// required verbatim by the BO surrogate invariant (spec.md §5, §8).
    pub values: Vec<f64>,
    /// Chronological feature vectors, `feats[i]` paired with `values[i]` —
    /// the BO surrogate's training set (spec.md §4.4, §4.6).
    pub feats: Vec<Vec<f64>>,
    samples: Vec<(T, LayerTarget)>,
    best_index: Option<usize>,
}

impl<T> Default for Results<T> {
    fn default() -> Self {
        Results {
            values: Vec::new(),
            feats: Vec::new(),
            samples: Vec::new(),
            best_index: None,
        }
    }
}

impl<T> Results<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new sample. Always appends to `values`/`feats` (spec.md
    /// §4.5's `Results::add` — "regardless of whether the sample replaced
    /// the running best", see DESIGN.md), and updates `best_index` if
    /// `target` improves on the running best under `LayerTarget::cmp_order`.
    pub fn add(&mut self, sample: T, target: LayerTarget, feats: Vec<f64>) {
        self.values.push(target.scalar());
        self.feats.push(feats);
        let idx = self.samples.len();
        let improves = match self.best_index {
            None => true,
            Some(best) => target.cmp_order(&self.samples[best].1) == std::cmp::Ordering::Less,
        };
        self.samples.push((sample, target));
        if improves {
            self.best_index = Some(idx);
        }
    }

    /// The running best sample, if any have been added.
    pub fn best(&self) -> Option<&T> {
        self.best_index.map(|i| &self.samples[i].0)
    }

    /// The running best sample's target.
    pub fn best_target(&self) -> Option<&LayerTarget> {
        self.best_index.map(|i| &self.samples[i].1)
    }

    /// Number of samples recorded so far.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
