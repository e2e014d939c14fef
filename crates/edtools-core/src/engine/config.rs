use crate::core::models::cell::AngleTransform;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Angle transform '{transform}' only applies to the euclidean metric, not '{metric}'")]
    IncompatibleTransform {
        metric: CellMetric,
        transform: AngleTransform,
    },
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Agglomerative linkage criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkageMethod {
    Single,
    Complete,
    #[default]
    Average,
    Weighted,
    Ward,
    Centroid,
    Median,
}

impl LinkageMethod {
    pub const ALL: [LinkageMethod; 7] = [
        LinkageMethod::Single,
        LinkageMethod::Average,
        LinkageMethod::Complete,
        LinkageMethod::Median,
        LinkageMethod::Weighted,
        LinkageMethod::Centroid,
        LinkageMethod::Ward,
    ];

    pub(crate) fn to_kodama(self) -> kodama::Method {
        match self {
            LinkageMethod::Single => kodama::Method::Single,
            LinkageMethod::Complete => kodama::Method::Complete,
            LinkageMethod::Average => kodama::Method::Average,
            LinkageMethod::Weighted => kodama::Method::Weighted,
            LinkageMethod::Ward => kodama::Method::Ward,
            LinkageMethod::Centroid => kodama::Method::Centroid,
            LinkageMethod::Median => kodama::Method::Median,
        }
    }
}

impl fmt::Display for LinkageMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkageMethod::Single => "single",
            LinkageMethod::Complete => "complete",
            LinkageMethod::Average => "average",
            LinkageMethod::Weighted => "weighted",
            LinkageMethod::Ward => "ward",
            LinkageMethod::Centroid => "centroid",
            LinkageMethod::Median => "median",
        };
        f.write_str(s)
    }
}

impl FromStr for LinkageMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LinkageMethod::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown linkage method '{}' (expected one of: single, average, complete, median, weighted, centroid, ward)",
                    s
                )
            })
    }
}

/// Pairwise distance between two unit cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CellMetric {
    /// Euclidean distance over the six (optionally transformed) parameters.
    #[default]
    Euclidean,
    /// Linear cell variation: largest relative difference of face diagonals.
    Lcv,
    /// Absolute volume difference in Å³.
    Volume,
}

impl CellMetric {
    /// Cutoff shown first when the dendrogram is inspected for this metric.
    pub fn initial_display_cutoff(&self) -> Option<f64> {
        match self {
            CellMetric::Euclidean => Some(2.0),
            CellMetric::Volume => Some(250.0),
            CellMetric::Lcv => None,
        }
    }
}

impl fmt::Display for CellMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CellMetric::Euclidean => "euclidean",
            CellMetric::Lcv => "lcv",
            CellMetric::Volume => "volume",
        };
        f.write_str(s)
    }
}

impl FromStr for CellMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "euclidean" => Ok(CellMetric::Euclidean),
            "lcv" => Ok(CellMetric::Lcv),
            "volume" => Ok(CellMetric::Volume),
            _ => Err(format!(
                "unknown cell metric '{}' (expected euclidean, lcv or volume)",
                s
            )),
        }
    }
}

/// Parameters shared by every clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterConfig {
    pub method: LinkageMethod,
    /// Cut height; `None` selects `0.7 × max merge distance`.
    pub cutoff: Option<f64>,
    /// Groups with `min_size` members or fewer are left out of the output.
    pub min_size: usize,
}

/// Parameters of a unit-cell clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct CellClusterConfig {
    pub cluster: ClusterConfig,
    pub metric: CellMetric,
    pub transform: AngleTransform,
    /// Cluster the unrefined cells instead of the refined ones.
    pub use_raw_cell: bool,
}

#[derive(Default)]
pub struct ClusterConfigBuilder {
    method: Option<LinkageMethod>,
    cutoff: Option<f64>,
    min_size: Option<usize>,
    metric: Option<CellMetric>,
    transform: Option<AngleTransform>,
    use_raw_cell: Option<bool>,
}

impl ClusterConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: LinkageMethod) -> Self {
        self.method = Some(method);
        self
    }
    pub fn cutoff(mut self, cutoff: Option<f64>) -> Self {
        self.cutoff = cutoff;
        self
    }
    pub fn min_size(mut self, min_size: usize) -> Self {
        self.min_size = Some(min_size);
        self
    }
    pub fn metric(mut self, metric: CellMetric) -> Self {
        self.metric = Some(metric);
        self
    }
    pub fn transform(mut self, transform: AngleTransform) -> Self {
        self.transform = Some(transform);
        self
    }
    pub fn use_raw_cell(mut self, use_raw_cell: bool) -> Self {
        self.use_raw_cell = Some(use_raw_cell);
        self
    }

    pub fn build(self) -> Result<ClusterConfig, ConfigError> {
        if let Some(cutoff) = self.cutoff {
            if !cutoff.is_finite() || cutoff < 0.0 {
                return Err(ConfigError::InvalidValue {
                    name: "cutoff",
                    reason: format!("must be a non-negative number, got {cutoff}"),
                });
            }
        }
        Ok(ClusterConfig {
            method: self
                .method
                .ok_or(ConfigError::MissingParameter("method"))?,
            cutoff: self.cutoff,
            min_size: self
                .min_size
                .ok_or(ConfigError::MissingParameter("min_size"))?,
        })
    }

    pub fn build_for_cells(self) -> Result<CellClusterConfig, ConfigError> {
        let metric = self.metric.ok_or(ConfigError::MissingParameter("metric"))?;
        let transform = self
            .transform
            .ok_or(ConfigError::MissingParameter("transform"))?;
        let use_raw_cell = self
            .use_raw_cell
            .ok_or(ConfigError::MissingParameter("use_raw_cell"))?;
        if metric != CellMetric::Euclidean && transform != AngleTransform::Degrees {
            return Err(ConfigError::IncompatibleTransform { metric, transform });
        }
        Ok(CellClusterConfig {
            cluster: self.build()?,
            metric,
            transform,
            use_raw_cell,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linkage_method_round_trips_through_strings() {
        for method in LinkageMethod::ALL {
            assert_eq!(method.to_string().parse::<LinkageMethod>(), Ok(method));
        }
        assert_eq!("WARD".parse::<LinkageMethod>(), Ok(LinkageMethod::Ward));
        assert!("upgma".parse::<LinkageMethod>().is_err());
    }

    #[test]
    fn builder_reports_missing_parameters() {
        assert_eq!(
            ClusterConfigBuilder::new().min_size(1).build(),
            Err(ConfigError::MissingParameter("method"))
        );
        assert_eq!(
            ClusterConfigBuilder::new()
                .method(LinkageMethod::Average)
                .build(),
            Err(ConfigError::MissingParameter("min_size"))
        );
    }

    #[test]
    fn builder_rejects_negative_cutoff() {
        let result = ClusterConfigBuilder::new()
            .method(LinkageMethod::Average)
            .min_size(1)
            .cutoff(Some(-0.5))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { name: "cutoff", .. })
        ));
    }

    #[test]
    fn transforms_are_limited_to_euclidean_metric() {
        let builder = || {
            ClusterConfigBuilder::new()
                .method(LinkageMethod::Average)
                .min_size(1)
                .use_raw_cell(true)
        };
        assert!(
            builder()
                .metric(CellMetric::Euclidean)
                .transform(AngleTransform::Sine)
                .build_for_cells()
                .is_ok()
        );
        assert_eq!(
            builder()
                .metric(CellMetric::Lcv)
                .transform(AngleTransform::Radians)
                .build_for_cells(),
            Err(ConfigError::IncompatibleTransform {
                metric: CellMetric::Lcv,
                transform: AngleTransform::Radians
            })
        );
    }
}
