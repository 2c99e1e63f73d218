//! Command-line parsing for the `csr` binary.
//!
//! Argument parsing and dispatch live here and in `app`, away from the
//! fitting and classification code.

use clap::{Args, Parser, Subcommand};

use crate::domain::CurveChoice;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "csr", version, about = "Stratum CSR fatigue curve fitter and classifier")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit every stratum, print diagnostics and the per-sample table.
    Fit(FitArgs),
    /// Print the per-sample verdict table only.
    Classify(FitArgs),
    /// Edit one sample's observed point, refit its stratum and print the result.
    Edit(EditArgs),
}

/// Options shared by every subcommand.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Number of synthetic strata to generate.
    #[arg(long, default_value_t = 3)]
    pub strata: usize,

    /// Samples generated per stratum.
    #[arg(short = 'n', long, default_value_t = 12)]
    pub samples: usize,

    /// Seed for the synthetic population.
    #[arg(long, default_value_t = 7)]
    pub seed: u64,

    /// Fraction of samples generated without a plasticity index.
    #[arg(long, default_value_t = 0.1)]
    pub missing_ip: f64,

    /// Seed for the global search stage of calibration.
    #[arg(long, default_value_t = 42)]
    pub fit_seed: u64,

    /// Population size multiplier for the global search.
    #[arg(long, default_value_t = 15)]
    pub popsize: usize,

    /// Generation budget for the global search.
    #[arg(long, default_value_t = 1000)]
    pub max_generations: usize,

    /// Curve used for the verdict column.
    #[arg(long, value_enum, default_value_t = CurveChoice::Preferred)]
    pub curve: CurveChoice,

    /// Seed for drawn safety margins (OS entropy when omitted).
    #[arg(long)]
    pub margin_seed: Option<u64>,

    /// Print the report as JSON instead of tables.
    #[arg(long)]
    pub json: bool,

    /// Log calibration progress to stderr.
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub fit: FitArgs,

    /// Stratum that owns the sample.
    #[arg(long)]
    pub stratum: String,

    /// Sample id to edit.
    #[arg(long)]
    pub sample: String,

    /// New observed failure cycle.
    #[arg(long)]
    pub cycle: f64,

    /// New observed CSR.
    #[arg(long)]
    pub csr: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_with_shared_flags() {
        let cli = Cli::parse_from([
            "csr", "edit", "--stratum", "EGE-1", "--sample", "EGE-1/03", "--cycle", "40",
            "--csr", "0.35", "--curve", "calibrated", "--json",
        ]);
        match cli.command {
            Command::Edit(args) => {
                assert_eq!(args.stratum, "EGE-1");
                assert_eq!(args.sample, "EGE-1/03");
                assert_eq!(args.cycle, 40.0);
                assert_eq!(args.fit.curve, CurveChoice::Calibrated);
                assert!(args.fit.json);
            }
            other => panic!("expected edit, got {other:?}"),
        }
    }

    #[test]
    fn fit_defaults() {
        let cli = Cli::parse_from(["csr", "fit"]);
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.strata, 3);
        assert_eq!(args.fit_seed, 42);
        assert_eq!(args.curve, CurveChoice::Preferred);
        assert!(args.margin_seed.is_none());
    }
}
