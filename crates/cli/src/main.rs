//! santa: run the Santa Claus rendezvous simulation.
//!
//! ```text
//! santa                          classic timings, six cycles
//! santa --fast --cycles 100      no delays
//! santa --config pools.toml      pools and timings from TOML
//! santa --json                   escort log as JSON lines on stdout
//! ```
//!
//! Logs go to stderr so `--json` output stays machine-readable.

mod parse;

use std::process;

use clap::{value_parser, Arg, ArgAction, Command};
use rendezvous_engine::{Simulation, SimulationConfig, SimulationReport};
use tracing::Level;

use parse::{matches_to_action, output_mode, CliAction, OutputMode};

pub(crate) fn build_cli() -> Command {
    Command::new("santa")
        .about("Santa Claus rendezvous on software transactional memory")
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML file with pools and timings"),
        )
        .arg(
            Arg::new("fast")
                .long("fast")
                .action(ArgAction::SetTrue)
                .conflicts_with("config")
                .help("Use the classic pools with every delay set to zero"),
        )
        .arg(
            Arg::new("cycles")
                .long("cycles")
                .short('n')
                .value_parser(value_parser!(u32))
                .help("Number of coordinator cycles"),
        )
        .arg(
            Arg::new("work-ms")
                .long("work-ms")
                .value_parser(value_parser!(u64))
                .help("Length of each escorted activity in milliseconds"),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .action(ArgAction::Count)
                .help("More logging (-v debug, -vv trace)"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print each escort as a JSON line"),
        )
        .arg(
            Arg::new("show-config")
                .long("show-config")
                .action(ArgAction::SetTrue)
                .help("Print the effective configuration as TOML and exit"),
        )
}

fn main() {
    let matches = build_cli().get_matches();

    let level = match matches.get_count("verbose") {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_thread_names(true)
        .init();

    let mode = output_mode(&matches);
    let exit_code = match matches_to_action(&matches) {
        Ok(CliAction::ShowConfig(config)) => show_config(&config),
        Ok(CliAction::Run(config)) => run(config, mode),
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    };
    process::exit(exit_code);
}

fn show_config(config: &SimulationConfig) -> i32 {
    match config.to_toml_string() {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("(error) {}", e);
            1
        }
    }
}

fn run(config: SimulationConfig, mode: OutputMode) -> i32 {
    let report = match Simulation::new(config).and_then(Simulation::run) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("(error) {}", e);
            return 1;
        }
    };
    print_report(&report, mode);
    0
}

fn print_report(report: &SimulationReport, mode: OutputMode) {
    match mode {
        OutputMode::Json => {
            for escort in &report.escorts {
                match serde_json::to_string(escort) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("(error) {}", e),
                }
            }
        }
        OutputMode::Human => {
            for escort in &report.escorts {
                println!(
                    "cycle {:>3}: escorted {} (generation {})",
                    escort.cycle, escort.pool, escort.generation
                );
            }
            let stats = &report.stats;
            println!(
                "{} commits, {} conflicts, {} retries, {} wakeups",
                stats.commits, stats.conflicts, stats.retries, stats.wakeups
            );
        }
    }
}
