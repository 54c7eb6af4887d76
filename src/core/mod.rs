mod engine;
mod error;
mod metrics;
mod search;
mod solver;
mod types;

pub use engine::{
    MAX_PROJECTION_YEARS, contribution_future_value, contributions_value, final_value,
    growth_factor, project,
};
pub use error::SolveError;
pub use metrics::{
    DAYS_PER_YEAR, compute_metrics, days_between, parse_day, required_saving_for_period,
};
pub use search::{
    BisectConfig, BisectOutcome, FixedPointConfig, FixedPointOutcome, Probe, bisect, fixed_point,
    step_search,
};
pub use solver::{solve, solve_principal, solve_principal_iterative, solve_rate, solve_years};
pub use types::{
    Adjustment, CompoundingFrequency, PlanMetrics, ProjectionResult, SavingsPlan, Scenario,
    SolveMethod, SolveOutcome, SolveRequest, Unknown, YearlyDataPoint,
};
