use super::types::{CompoundingFrequency, ProjectionResult, Scenario, YearlyDataPoint};

/// Longest horizon accepted from callers. The schedule holds one point per year.
pub const MAX_PROJECTION_YEARS: f64 = 1_000.0;

pub fn growth_factor(annual_rate: f64, frequency: CompoundingFrequency, years: f64) -> f64 {
    let periods = frequency.periods_per_year() as f64;
    (1.0 + annual_rate / periods).powf(periods * years)
}

/// Year-end value of one year of contributions paid in equal installments at the
/// end of each compounding period (ordinary annuity).
pub fn contribution_future_value(
    annual_contribution: f64,
    annual_rate: f64,
    frequency: CompoundingFrequency,
) -> f64 {
    let periods = frequency.periods_per_year();
    let period_rate = annual_rate / periods as f64;
    if period_rate == 0.0 {
        return annual_contribution;
    }

    let payment = annual_contribution / periods as f64;
    payment * ((1.0 + period_rate).powi(periods as i32) - 1.0) / period_rate
}

pub fn project(scenario: &Scenario) -> ProjectionResult {
    let rate = scenario.annual_rate();
    let yearly_growth = growth_factor(rate, scenario.frequency, 1.0);
    let yearly_contribution_value =
        contribution_future_value(scenario.annual_contribution, rate, scenario.frequency);
    let years = whole_years(scenario.years);

    let mut total = scenario.principal;
    let mut principal_to_date = scenario.principal;
    let mut schedule = Vec::with_capacity(years as usize + 1);
    schedule.push(YearlyDataPoint {
        year: 0,
        principal_to_date,
        interest_to_date: 0.0,
        total_value: total,
    });

    for year in 1..=years {
        total *= yearly_growth;
        if scenario.has_contribution() {
            total += yearly_contribution_value;
            principal_to_date += scenario.annual_contribution;
        }
        schedule.push(YearlyDataPoint {
            year,
            principal_to_date,
            interest_to_date: total - principal_to_date,
            total_value: total,
        });
    }

    ProjectionResult {
        schedule,
        final_amount: total,
        total_principal: principal_to_date,
        total_interest: total - principal_to_date,
    }
}

// Contributions are paid for each whole year, then compound over the
// fractional remainder.
pub fn final_value(scenario: &Scenario) -> f64 {
    let rate = scenario.annual_rate();
    let years = scenario.years.max(0.0);
    let lump_sum = scenario.principal * growth_factor(rate, scenario.frequency, years);
    if !scenario.has_contribution() {
        return lump_sum;
    }

    lump_sum + contributions_value(scenario)
}

pub fn contributions_value(scenario: &Scenario) -> f64 {
    if !scenario.has_contribution() {
        return 0.0;
    }

    let rate = scenario.annual_rate();
    let yearly_growth = growth_factor(rate, scenario.frequency, 1.0);
    let yearly_contribution_value =
        contribution_future_value(scenario.annual_contribution, rate, scenario.frequency);
    let years = whole_years(scenario.years);

    let mut accumulated = 0.0;
    for _ in 0..years {
        accumulated = accumulated * yearly_growth + yearly_contribution_value;
    }

    let remainder = scenario.years - years as f64;
    if remainder > 0.0 {
        accumulated *= growth_factor(rate, scenario.frequency, remainder);
    }
    accumulated
}

fn whole_years(years: f64) -> u32 {
    // NaN and negatives saturate to zero.
    years.max(0.0).floor() as u32
}
