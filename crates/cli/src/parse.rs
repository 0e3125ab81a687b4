//! ArgMatches → CliAction conversion.
//!
//! Loads the base configuration (a `--config` file, or the classic or fast
//! preset), applies the command-line overrides and validates the result.

use clap::ArgMatches;
use rendezvous_engine::SimulationConfig;

/// The result of parsing the command line.
#[derive(Debug)]
pub enum CliAction {
    /// Run the simulation with this configuration.
    Run(SimulationConfig),
    /// Print the effective configuration as TOML and exit.
    ShowConfig(SimulationConfig),
}

/// Output style for the escort log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

pub fn output_mode(matches: &ArgMatches) -> OutputMode {
    if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    }
}

pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => SimulationConfig::load(path)
            .map_err(|e| format!("Failed to load {}: {}", path, e))?,
        None if matches.get_flag("fast") => SimulationConfig::fast(),
        None => SimulationConfig::classic(),
    };

    if let Some(cycles) = matches.get_one::<u32>("cycles") {
        config.cycles = *cycles;
    }
    if let Some(work_ms) = matches.get_one::<u64>("work-ms") {
        config.work_ms = *work_ms;
    }
    config.validate().map_err(|e| e.to_string())?;

    if matches.get_flag("show-config") {
        Ok(CliAction::ShowConfig(config))
    } else {
        Ok(CliAction::Run(config))
    }
}
