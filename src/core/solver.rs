use super::engine::{contributions_value, final_value, growth_factor};
use super::error::SolveError;
use super::search::{BisectConfig, FixedPointConfig, Probe, bisect, fixed_point, step_search};
use super::types::{Scenario, SolveMethod, SolveOutcome, SolveRequest, Unknown};

const RATE_SEARCH_MAX: f64 = 1.0;
const RATE_MAX_ITERATIONS: u32 = 100;
const RATE_BRACKET_TOLERANCE: f64 = 1e-5;
const VALUE_TOLERANCE: f64 = 0.01;

const PRINCIPAL_MAX_ITERATIONS: u32 = 100;
const PRINCIPAL_TOLERANCE: f64 = 1.0;

const HORIZON_MAX_YEARS: u32 = 100;

pub fn solve(request: &SolveRequest) -> Result<SolveOutcome, SolveError> {
    let target = request.target_final_value;
    if !target.is_finite() {
        return Err(SolveError::invalid("targetFinalValue", "must be a finite number"));
    }

    match request.unknown {
        Unknown::Principal => solve_principal(&request.scenario, target),
        Unknown::Rate => solve_rate(&request.scenario, target),
        Unknown::Years => solve_years(&request.scenario, target),
    }
}

/// Principal needed today so that the scenario ends at `target`. A negative
/// answer (contributions alone overshoot) is reported as zero.
pub fn solve_principal(scenario: &Scenario, target: f64) -> Result<SolveOutcome, SolveError> {
    let growth = principal_growth(scenario)?;
    let principal = (target - contributions_value(scenario)) / growth;

    Ok(SolveOutcome {
        unknown: Unknown::Principal,
        value: principal.max(0.0),
        method: SolveMethod::ClosedForm,
        iterations: 0,
        converged: true,
    })
}

/// Same answer as [`solve_principal`], reached by refining an estimate that
/// ignores contributions until the projection lands within one currency unit.
pub fn solve_principal_iterative(
    scenario: &Scenario,
    target: f64,
) -> Result<SolveOutcome, SolveError> {
    let growth = principal_growth(scenario)?;
    let outcome = fixed_point(
        target / growth,
        growth,
        FixedPointConfig {
            max_iterations: PRINCIPAL_MAX_ITERATIONS,
            tolerance: PRINCIPAL_TOLERANCE,
        },
        |principal| {
            target
                - final_value(&Scenario {
                    principal,
                    ..*scenario
                })
        },
    );

    if !outcome.converged {
        tracing::debug!(
            residual = outcome.residual,
            iterations = outcome.iterations,
            "principal refinement did not settle"
        );
        return Err(SolveError::Unreachable(format!(
            "principal refinement still {:.2} away after {} iterations",
            outcome.residual, outcome.iterations
        )));
    }

    Ok(SolveOutcome {
        unknown: Unknown::Principal,
        value: outcome.value.max(0.0),
        method: SolveMethod::FixedPoint,
        iterations: outcome.iterations,
        converged: true,
    })
}

pub fn solve_rate(scenario: &Scenario, target: f64) -> Result<SolveOutcome, SolveError> {
    if scenario.principal <= 0.0 {
        return Err(SolveError::invalid("principal", "must be greater than zero"));
    }
    if target <= 0.0 {
        return Err(SolveError::invalid("targetFinalValue", "must be greater than zero"));
    }
    if scenario.years <= 0.0 {
        return Err(SolveError::invalid("years", "must be greater than zero"));
    }

    if !scenario.has_contribution() {
        let periods = scenario.frequency.periods_per_year() as f64;
        let ratio = target / scenario.principal;
        let rate = periods * (ratio.powf(1.0 / (periods * scenario.years)) - 1.0);
        return Ok(SolveOutcome {
            unknown: Unknown::Rate,
            value: rate * 100.0,
            method: SolveMethod::ClosedForm,
            iterations: 0,
            converged: true,
        });
    }

    let value_at = |rate: f64| {
        final_value(&Scenario {
            annual_rate_percent: rate * 100.0,
            ..*scenario
        })
    };

    if value_at(0.0) >= target {
        return Ok(SolveOutcome {
            unknown: Unknown::Rate,
            value: 0.0,
            method: SolveMethod::Bisection,
            iterations: 0,
            converged: true,
        });
    }
    let ceiling_value = value_at(RATE_SEARCH_MAX);
    if ceiling_value + VALUE_TOLERANCE < target {
        tracing::debug!(target, ceiling_value, "rate search ceiling too low");
        return Err(SolveError::Unreachable(format!(
            "target is not reached even at {}% a year",
            RATE_SEARCH_MAX * 100.0
        )));
    }

    let outcome = bisect(
        0.0,
        RATE_SEARCH_MAX,
        BisectConfig {
            max_iterations: RATE_MAX_ITERATIONS,
            width_tolerance: RATE_BRACKET_TOLERANCE,
        },
        |rate| {
            let projected = value_at(rate);
            if (projected - target).abs() <= VALUE_TOLERANCE {
                Probe::Hit
            } else if projected >= target {
                Probe::Above
            } else {
                Probe::Below
            }
        },
    );

    if !outcome.converged {
        return Err(SolveError::Unreachable(format!(
            "rate bisection did not close within {RATE_MAX_ITERATIONS} iterations"
        )));
    }

    let rate = outcome.hit.unwrap_or_else(|| outcome.midpoint());
    Ok(SolveOutcome {
        unknown: Unknown::Rate,
        value: rate * 100.0,
        method: SolveMethod::Bisection,
        iterations: outcome.iterations,
        converged: true,
    })
}

/// Years needed to reach `target`. Fractional without contributions; with
/// contributions, the first whole year that meets the target.
pub fn solve_years(scenario: &Scenario, target: f64) -> Result<SolveOutcome, SolveError> {
    if scenario.principal <= 0.0 {
        return Err(SolveError::invalid("principal", "must be greater than zero"));
    }
    if target <= 0.0 {
        return Err(SolveError::invalid("targetFinalValue", "must be greater than zero"));
    }
    if scenario.annual_rate_percent == 0.0 {
        return Err(SolveError::invalid("annualRatePercent", "must not be zero"));
    }

    if !scenario.has_contribution() {
        if target <= scenario.principal {
            return Err(SolveError::invalid("targetFinalValue", "must exceed principal"));
        }

        let periods = scenario.frequency.periods_per_year() as f64;
        let years = (target / scenario.principal).ln()
            / (periods * (1.0 + scenario.annual_rate() / periods).ln());
        if !years.is_finite() || years <= 0.0 {
            tracing::debug!(target, years, "horizon closed form has no positive solution");
            return Err(SolveError::Unreachable(
                "the balance never grows to the target at this rate".to_string(),
            ));
        }

        return Ok(SolveOutcome {
            unknown: Unknown::Years,
            value: years,
            method: SolveMethod::ClosedForm,
            iterations: 0,
            converged: true,
        });
    }

    let (found, evaluated) = step_search(1..=HORIZON_MAX_YEARS, |years| {
        final_value(&Scenario {
            years: years as f64,
            ..*scenario
        }) >= target
    });

    match found {
        Some(years) => Ok(SolveOutcome {
            unknown: Unknown::Years,
            value: years as f64,
            method: SolveMethod::StepSearch,
            iterations: evaluated,
            converged: true,
        }),
        None => {
            tracing::debug!(target, "horizon search exhausted");
            Err(SolveError::Unreachable(format!(
                "target is not reached within {HORIZON_MAX_YEARS} years"
            )))
        }
    }
}

fn principal_growth(scenario: &Scenario) -> Result<f64, SolveError> {
    let years = scenario.years.max(0.0);
    let growth = growth_factor(scenario.annual_rate(), scenario.frequency, years);
    if !growth.is_finite() || growth <= 0.0 {
        return Err(SolveError::invalid(
            "annualRatePercent",
            "must keep the balance positive",
        ));
    }
    Ok(growth)
}
