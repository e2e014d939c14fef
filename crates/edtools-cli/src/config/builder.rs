use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileScalingConfig};
use super::models::{AppConfig, ClusteringSettings};
use crate::cli::{ClusterArgs, FindCellArgs};
use crate::error::{CliError, Result};
use edtools::core::io::filelist::GatherCriteria;
use edtools::core::models::cell::AngleTransform;
use edtools::engine::config::{CellClusterConfig, ClusterConfig, ClusterConfigBuilder};
use edtools::workflows::correlation_clustering::ScalingOptions;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

/// Loads the configuration file, applies `--set` overrides and fills the
/// remaining values from the built-in defaults.
pub fn build_config(config_path: Option<&Path>, set_values: &[String]) -> Result<AppConfig> {
    let file_config = FileConfig::load(config_path)?;
    let file_config = apply_set_values(file_config, set_values)?;
    Ok(merge_with_defaults(file_config, &DefaultsConfig::default()))
}

fn merge_with_defaults(file: FileConfig, defaults: &DefaultsConfig) -> AppConfig {
    let clustering = file.clustering.unwrap_or_default();
    let scaling = file.scaling.unwrap_or_default();
    let gather = file.gather.unwrap_or_default();

    AppConfig {
        threads: file.threads.unwrap_or(defaults.threads),
        clustering: ClusteringSettings {
            method: clustering.method.unwrap_or(defaults.method),
            distance: clustering.distance,
            min_size: clustering.min_size.unwrap_or(defaults.min_size),
            metric: clustering.metric.unwrap_or(defaults.metric),
            angle_transform: clustering
                .angle_transform
                .unwrap_or(defaults.angle_transform),
            use_raw_cell: clustering.use_raw_cell.unwrap_or(defaults.use_raw_cell),
        },
        scaling: ScalingOptions {
            resolution: scaling
                .resolution
                .map(|[dmax, dmin]| (dmax, dmin))
                .unwrap_or(defaults.resolution),
            snrc: scaling.snrc.unwrap_or(defaults.snrc),
        },
        gather: GatherCriteria {
            min_completeness: gather
                .min_completeness
                .unwrap_or(defaults.min_completeness),
            min_cc_half: gather.min_cc_half.unwrap_or(defaults.min_cc_half),
        },
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

fn parse_pair(key: &str, value: &str) -> Result<[f64; 2]> {
    let parts: Vec<&str> = value
        .split([',', ' '])
        .filter(|s| !s.is_empty())
        .collect();
    match parts.as_slice() {
        [a, b] => Ok([parse_value(key, a)?, parse_value(key, b)?]),
        _ => Err(CliError::Config(format!(
            "Invalid value for {}: '{}' (expected two numbers, e.g. 20,0.8)",
            key, value
        ))),
    }
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };
        let key = key.trim();

        match key {
            "threads" => config.threads = Some(parse_value(key, value)?),
            "clustering.method" => {
                config.clustering.get_or_insert_with(Default::default).method =
                    Some(parse_value(key, value)?)
            }
            "clustering.distance" => {
                config.clustering.get_or_insert_with(Default::default).distance =
                    Some(parse_value(key, value)?)
            }
            "clustering.min-size" => {
                config.clustering.get_or_insert_with(Default::default).min_size =
                    Some(parse_value(key, value)?)
            }
            "clustering.metric" => {
                config.clustering.get_or_insert_with(Default::default).metric =
                    Some(parse_value(key, value)?)
            }
            "clustering.angle-transform" => {
                config
                    .clustering
                    .get_or_insert_with(Default::default)
                    .angle_transform = Some(parse_value(key, value)?)
            }
            "clustering.use-raw-cell" => {
                config
                    .clustering
                    .get_or_insert_with(Default::default)
                    .use_raw_cell = Some(parse_value(key, value)?)
            }
            "scaling.resolution" => {
                config
                    .scaling
                    .get_or_insert_with(FileScalingConfig::default)
                    .resolution = Some(parse_pair(key, value)?)
            }
            "scaling.snrc" => {
                config.scaling.get_or_insert_with(Default::default).snrc =
                    Some(parse_value(key, value)?)
            }
            "gather.min-completeness" => {
                config
                    .gather
                    .get_or_insert_with(Default::default)
                    .min_completeness = Some(parse_value(key, value)?)
            }
            "gather.min-cc-half" => {
                config.gather.get_or_insert_with(Default::default).min_cc_half =
                    Some(parse_value(key, value)?)
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

/// Reads a `DMAX DMIN` pair given on the command line.
pub fn resolution_arg(values: Option<&[f64]>) -> Result<Option<(f64, f64)>> {
    match values {
        None => Ok(None),
        Some([dmax, dmin]) => Ok(Some((*dmax, *dmin))),
        Some(other) => Err(CliError::Argument(format!(
            "expected two resolution limits, got {}",
            other.len()
        ))),
    }
}

pub fn cell_cluster_config(app: &AppConfig, args: &FindCellArgs) -> Result<CellClusterConfig> {
    let settings = &app.clustering;
    let transform = if args.radians {
        AngleTransform::Radians
    } else if args.sine {
        AngleTransform::Sine
    } else {
        settings.angle_transform
    };

    ClusterConfigBuilder::new()
        .method(args.method.unwrap_or(settings.method))
        .cutoff(args.distance.or(settings.distance))
        .min_size(args.min_size.unwrap_or(settings.min_size))
        .metric(args.metric.unwrap_or(settings.metric))
        .transform(transform)
        .use_raw_cell(!args.use_bravais_lattice && settings.use_raw_cell)
        .build_for_cells()
        .map_err(|e| CliError::Config(e.to_string()))
}

pub fn correlation_cluster_config(app: &AppConfig, args: &ClusterArgs) -> Result<ClusterConfig> {
    let settings = &app.clustering;
    ClusterConfigBuilder::new()
        .method(args.method.unwrap_or(settings.method))
        .cutoff(args.distance.or(settings.distance))
        .min_size(args.min_size.unwrap_or(settings.min_size))
        .build()
        .map_err(|e| CliError::Config(e.to_string()))
}

pub fn scaling_options(app: &AppConfig, args: &ClusterArgs) -> Result<ScalingOptions> {
    Ok(ScalingOptions {
        resolution: resolution_arg(args.resolution.as_deref())?.unwrap_or(app.scaling.resolution),
        snrc: args.snrc.unwrap_or(app.scaling.snrc),
    })
}
