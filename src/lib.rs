//! # accelco - Hardware/Software Accelerator Co-Design Search
//!
//! A nested hardware/software design-space search engine for neural
//! accelerators: an outer loop proposes hardware configurations (SIMD
//! lanes, bit width, bandwidth, memory-hierarchy buffer sizes, PE
//! sub-clustering), an inner loop searches each layer's software mapping
//! onto that hardware, and both are scored against an external analytical
//! cost model loaded as a native shared library.
//!
//! ## Architecture
//!
//! - Parametric design-space model (`space`) shared by hardware and
//!   software search
//! - Pluggable search strategies (`samplers`) behind one protocol
//! - Evaluator-free feasibility pre-checks (`constraints`) and an
//!   analytical area model
//! - A `libloading`-based binding to the native cost model (`evaluator`)
//! - The nested co-optimization driver (`optimizer`) and its CLI-facing
//!   entry points (`search`)

pub mod config;
pub mod constraints;
pub mod error;
pub mod evaluator;
pub mod features;
pub mod optimizer;
pub mod results;
pub mod samplers;
pub mod search;
pub mod shapes;
pub mod space;

pub use config::Config;
pub use error::{AccelError, Result};
pub use evaluator::{native::NativeEvaluator, post_filter, Evaluator, FailureStats};
pub use optimizer::{aggregate_layers, build_level_configs, opt_hw, opt_sw, OptimizerConfig};
pub use results::{Cost, LayerTarget, Results, TargetMetric};
pub use shapes::{load_layers, Layer};
pub use space::software::{DataflowKind, LayerShape};
pub use space::{ParamValue, Parameter, Point, Space};

/// Re-export of the crate's most commonly used types.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{AccelError, Result};
    pub use crate::evaluator::{Evaluator, FailureStats};
    pub use crate::optimizer::{opt_hw, opt_sw, OptimizerConfig};
    pub use crate::results::{Cost, LayerTarget, Results, TargetMetric};
    pub use crate::shapes::{load_layers, Layer};
    pub use crate::space::software::LayerShape;
    pub use crate::space::{Point, Space};
}
