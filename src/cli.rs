use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::{
    CompoundingFrequency, MAX_PROJECTION_YEARS, Scenario, SolveRequest, Unknown,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFrequency {
    Annually,
    SemiAnnually,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl From<CliFrequency> for CompoundingFrequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Annually => CompoundingFrequency::Annually,
            CliFrequency::SemiAnnually => CompoundingFrequency::SemiAnnually,
            CliFrequency::Quarterly => CompoundingFrequency::Quarterly,
            CliFrequency::Monthly => CompoundingFrequency::Monthly,
            CliFrequency::Weekly => CompoundingFrequency::Weekly,
            CliFrequency::Daily => CompoundingFrequency::Daily,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliUnknown {
    Principal,
    Rate,
    Years,
}

impl From<CliUnknown> for Unknown {
    fn from(value: CliUnknown) -> Self {
        match value {
            CliUnknown::Principal => Unknown::Principal,
            CliUnknown::Rate => Unknown::Rate,
            CliUnknown::Years => Unknown::Years,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "compound",
    about = "Compound interest projections, goal solving and savings plans"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API.
    Serve {
        #[arg(long, env = "COMPOUND_PORT", default_value_t = 8080)]
        port: u16,
        #[arg(
            long,
            env = "COMPOUND_DATA_DIR",
            help = "Directory for saved plans and history; kept in memory when unset"
        )]
        data_dir: Option<PathBuf>,
    },
    /// Print the year-by-year projection of a scenario.
    Project(ScenarioArgs),
    /// Solve for the one input that reaches a target final value.
    Solve {
        #[arg(value_enum)]
        unknown: CliUnknown,
        #[arg(long, allow_negative_numbers = true)]
        target: f64,
        #[command(flatten)]
        scenario: ScenarioArgs,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub principal: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Nominal annual rate in percent, e.g. 5"
    )]
    pub rate: f64,
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub years: f64,
    #[arg(long, value_enum, default_value_t = CliFrequency::Monthly)]
    pub frequency: CliFrequency,
    #[arg(
        long,
        alias = "contribution",
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Annual contribution, spread evenly over the compounding periods"
    )]
    pub annual_contribution: f64,
}

pub fn build_scenario(args: &ScenarioArgs) -> Result<Scenario, String> {
    for (flag, value) in [
        ("--principal", args.principal),
        ("--rate", args.rate),
        ("--years", args.years),
        ("--annual-contribution", args.annual_contribution),
    ] {
        if !value.is_finite() {
            return Err(format!("{flag} must be a finite number"));
        }
    }
    if args.principal < 0.0 {
        return Err("--principal must be >= 0".to_string());
    }
    if args.years < 0.0 {
        return Err("--years must be >= 0".to_string());
    }
    if args.years > MAX_PROJECTION_YEARS {
        return Err(format!("--years must be <= {MAX_PROJECTION_YEARS}"));
    }
    if args.annual_contribution < 0.0 {
        return Err("--annual-contribution must be >= 0".to_string());
    }

    Ok(Scenario {
        principal: args.principal,
        annual_rate_percent: args.rate,
        years: args.years,
        frequency: args.frequency.into(),
        annual_contribution: args.annual_contribution,
    })
}

pub fn build_solve_request(
    unknown: CliUnknown,
    target: f64,
    args: &ScenarioArgs,
) -> Result<SolveRequest, String> {
    Ok(SolveRequest {
        unknown: unknown.into(),
        target_final_value: target,
        scenario: build_scenario(args)?,
    })
}
