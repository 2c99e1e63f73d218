//! Top-level application orchestration.
//!
//! `src/main.rs` only maps the result to an exit code; this module parses the
//! CLI, installs logging, runs the pipeline and prints the report.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, EditArgs, FitArgs};
use crate::domain::{CalibratorConfig, EditRequest, PopulationConfig, RunConfig};
use crate::error::AppError;
use crate::report::RunReport;

pub mod pipeline;

/// Entry point for the `csr` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(&args, OutputMode::Full),
        Command::Classify(args) => handle_fit(&args, OutputMode::TableOnly),
        Command::Edit(args) => handle_edit(&args),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Full,
    TableOnly,
}

fn handle_fit(args: &FitArgs, mode: OutputMode) -> Result<(), AppError> {
    init_logging(args.verbose);
    let config = run_config_from_args(args, None);
    let run = pipeline::run_fatigue(&config)?;
    print_report(&run.report, config.json, mode)
}

fn handle_edit(args: &EditArgs) -> Result<(), AppError> {
    init_logging(args.fit.verbose);
    let edit = EditRequest {
        stratum: args.stratum.clone(),
        sample: args.sample.clone(),
        cycle: args.cycle,
        csr: args.csr,
    };
    let config = run_config_from_args(&args.fit, Some(edit));
    let run = pipeline::run_fatigue(&config)?;
    print_report(&run.report, config.json, OutputMode::Full)
}

fn print_report(report: &RunReport, json: bool, mode: OutputMode) -> Result<(), AppError> {
    if json {
        println!("{}", crate::report::report_to_json(report)?);
        return Ok(());
    }
    if mode == OutputMode::Full {
        println!("{}", crate::report::format_run_summary(report));
    }
    println!("{}", crate::report::format_sample_tables(report));
    Ok(())
}

/// Logs go to stderr so `--json` output stays clean. `RUST_LOG` wins over
/// `--verbose` when set.
fn init_logging(verbose: bool) {
    let default = if verbose { "csr_curves=info" } else { "csr_curves=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // A second init (e.g. from tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_config_from_args(args: &FitArgs, edit: Option<EditRequest>) -> RunConfig {
    RunConfig {
        population: PopulationConfig {
            strata: args.strata,
            samples_per_stratum: args.samples,
            seed: args.seed,
            missing_ip_fraction: args.missing_ip,
        },
        calibrator: CalibratorConfig {
            seed: args.fit_seed,
            popsize: args.popsize,
            max_generations: args.max_generations,
            ..CalibratorConfig::default()
        },
        curve: args.curve,
        margin_seed: args.margin_seed,
        json: args.json,
        edit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_map_onto_run_config() {
        let cli = Cli::parse_from([
            "csr", "fit", "--strata", "2", "--fit-seed", "9", "--margin-seed", "3",
        ]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let config = run_config_from_args(&args, None);
        assert_eq!(config.population.strata, 2);
        assert_eq!(config.calibrator.seed, 9);
        assert_eq!(config.calibrator.recombination, 0.7);
        assert_eq!(config.margin_seed, Some(3));
        assert!(config.edit.is_none());
    }
}
