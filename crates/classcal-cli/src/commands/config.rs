use std::path::Path;

use clap::Subcommand;
use classcal_core::schedule::read_schedule;

use super::CliResult;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the resolved configuration as JSON
    Show,
    /// Validate the configuration and the schedule header
    Check,
}

pub fn run(config_path: Option<&Path>, action: ConfigAction) -> CliResult {
    let config = super::resolve_config(config_path)?;
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Check => {
            let schedule = read_schedule(&config.csv_path)?;
            tracing::info!(rows = schedule.len(), "schedule readable");
            println!("ok");
        }
    }
    Ok(())
}
