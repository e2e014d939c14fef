mod builder;
mod defaults;
mod file;
mod models;

pub use builder::{
    build_config, cell_cluster_config, correlation_cluster_config, resolution_arg, scaling_options,
};
pub use models::AppConfig;
