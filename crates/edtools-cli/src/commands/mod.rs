use crate::config::AppConfig;
use crate::utils::progress::CliProgressHandler;
use edtools::engine::batch::BatchPool;

pub mod cluster;
pub mod extract;
pub mod find_cell;
pub mod make_xscale;
pub mod update_xds;

/// Shared state handed to every subcommand.
pub struct CommandContext {
    pub config: AppConfig,
    pub pool: BatchPool,
    pub quiet: bool,
}

impl CommandContext {
    pub fn progress(&self) -> CliProgressHandler {
        if self.quiet {
            CliProgressHandler::hidden()
        } else {
            CliProgressHandler::new()
        }
    }
}

/// `{:10.2}` for each of the six cell parameters.
pub(crate) fn format_cell(params: &[f64; 6]) -> String {
    params.iter().map(|v| format!("{v:10.2}")).collect()
}
