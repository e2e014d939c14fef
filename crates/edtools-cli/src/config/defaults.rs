use edtools::core::models::cell::AngleTransform;
use edtools::engine::batch::DEFAULT_WORKERS;
use edtools::engine::config::{CellMetric, LinkageMethod};

/// Built-in values used when neither the command line, `--set` nor the
/// configuration file provide one.
pub struct DefaultsConfig {
    pub threads: usize,
    pub method: LinkageMethod,
    pub min_size: usize,
    pub metric: CellMetric,
    pub angle_transform: AngleTransform,
    pub use_raw_cell: bool,
    pub resolution: (f64, f64),
    pub snrc: f64,
    pub min_completeness: f64,
    pub min_cc_half: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_WORKERS,
            method: LinkageMethod::Average,
            min_size: 1,
            metric: CellMetric::Euclidean,
            angle_transform: AngleTransform::Degrees,
            use_raw_cell: true,
            resolution: (20.0, 0.8),
            snrc: 2.0,
            min_completeness: 10.0,
            min_cc_half: 90.0,
        }
    }
}
