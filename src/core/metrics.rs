use jiff::civil::{Date, DateTime};

use super::search::{BisectConfig, Probe, bisect};
use super::types::{Adjustment, PlanMetrics, SavingsPlan};

pub const DAYS_PER_YEAR: f64 = 365.0;

const REQUIRED_RATE_CEILING: f64 = 2.0;
const REQUIRED_RATE_ITERATIONS: u32 = 80;

const YEARLY_PERIOD_DAYS: u32 = 365;
const MONTHLY_PERIOD_DAYS: u32 = 30;
const DAILY_PERIOD_DAYS: u32 = 1;

#[derive(Debug, Clone, Copy)]
struct DatedAdjustment {
    days_to_deadline: i64,
    amount: f64,
}

impl DatedAdjustment {
    fn value_at_deadline(self, annual_rate: f64) -> f64 {
        if self.days_to_deadline <= 0 {
            return self.amount;
        }
        self.amount * (1.0 + annual_rate).powf(self.days_to_deadline as f64 / DAYS_PER_YEAR)
    }
}

pub fn compute_metrics(plan: &SavingsPlan, as_of: Date) -> PlanMetrics {
    let days_remaining = days_between(as_of, plan.deadline).max(0);
    let days_remaining = u32::try_from(days_remaining).unwrap_or(u32::MAX);
    if days_remaining == 0 {
        return deadline_reached_metrics(plan);
    }

    let rate = plan.expected_annual_rate_percent / 100.0;
    let years_remaining = days_remaining as f64 / DAYS_PER_YEAR;
    let dated = dated_adjustments(plan);

    let future_value_of_current_holdings =
        plan.current_amount * (1.0 + rate).powf(years_remaining);
    let future_value_of_adjustments = adjustments_value(&dated, rate);
    let projected = future_value_of_current_holdings + future_value_of_adjustments;
    let funding_gap = (plan.target_amount - projected).max(0.0);

    let projection_at = |candidate: f64| {
        plan.current_amount * (1.0 + candidate).powf(years_remaining)
            + adjustments_value(&dated, candidate)
    };

    PlanMetrics {
        days_remaining,
        years_remaining,
        future_value_of_current_holdings,
        future_value_of_adjustments,
        projected_total_without_further_saving: projected,
        funding_gap,
        required_yearly_saving: required_saving_for_period(
            funding_gap,
            days_remaining,
            YEARLY_PERIOD_DAYS,
            rate,
        ),
        required_monthly_saving: required_saving_for_period(
            funding_gap,
            days_remaining,
            MONTHLY_PERIOD_DAYS,
            rate,
        ),
        required_daily_saving: required_saving_for_period(
            funding_gap,
            days_remaining,
            DAILY_PERIOD_DAYS,
            rate,
        ),
        required_annual_rate_percent: required_annual_rate(plan.target_amount, projection_at),
    }
}

fn deadline_reached_metrics(plan: &SavingsPlan) -> PlanMetrics {
    let adjustments: f64 = plan.adjustments.iter().map(|adj| adj.amount).sum();
    let projected = plan.current_amount + adjustments;
    let funding_gap = (plan.target_amount - projected).max(0.0);

    PlanMetrics {
        days_remaining: 0,
        years_remaining: 0.0,
        future_value_of_current_holdings: plan.current_amount,
        future_value_of_adjustments: adjustments,
        projected_total_without_further_saving: projected,
        funding_gap,
        required_yearly_saving: funding_gap,
        required_monthly_saving: funding_gap,
        required_daily_saving: funding_gap,
        required_annual_rate_percent: None,
    }
}

/// Payment per period of `period_days` that closes `funding_gap` by the
/// deadline, each payment compounding at the plan rate until then.
pub fn required_saving_for_period(
    funding_gap: f64,
    days_remaining: u32,
    period_days: u32,
    annual_rate: f64,
) -> f64 {
    let period_days = period_days.max(1);
    let periods = days_remaining.div_ceil(period_days).max(1);
    let period_rate = (1.0 + annual_rate).powf(period_days as f64 / DAYS_PER_YEAR) - 1.0;
    let annuity_factor = if period_rate == 0.0 {
        periods as f64
    } else {
        ((1.0 + period_rate).powf(periods as f64) - 1.0) / period_rate
    };
    funding_gap / annuity_factor
}

/// Lowest annual rate at which the current holdings and adjustments alone reach
/// `target`, as a percentage.
fn required_annual_rate<F>(target: f64, projection_at: F) -> Option<f64>
where
    F: Fn(f64) -> f64,
{
    if projection_at(0.0) >= target {
        return Some(0.0);
    }
    if projection_at(REQUIRED_RATE_CEILING) < target {
        tracing::debug!(target, "plan target unreachable below rate ceiling");
        return None;
    }

    let outcome = bisect(
        0.0,
        REQUIRED_RATE_CEILING,
        BisectConfig {
            max_iterations: REQUIRED_RATE_ITERATIONS,
            width_tolerance: 0.0,
        },
        |rate| {
            if projection_at(rate) >= target {
                Probe::Above
            } else {
                Probe::Below
            }
        },
    );
    Some(outcome.high * 100.0)
}

fn dated_adjustments(plan: &SavingsPlan) -> Vec<DatedAdjustment> {
    plan.adjustments
        .iter()
        .filter_map(|adj| match parse_day(&adj.date) {
            Some(date) => Some(DatedAdjustment {
                days_to_deadline: days_between(date, plan.deadline),
                amount: adj.amount,
            }),
            None => {
                skip_malformed(adj);
                None
            }
        })
        .collect()
}

fn skip_malformed(adj: &Adjustment) {
    tracing::debug!(
        adjustment = %adj.id,
        date = %adj.date,
        "skipping adjustment with unparseable date"
    );
}

fn adjustments_value(dated: &[DatedAdjustment], annual_rate: f64) -> f64 {
    dated
        .iter()
        .map(|adj| adj.value_at_deadline(annual_rate))
        .sum()
}

pub fn parse_day(text: &str) -> Option<Date> {
    let text = text.trim();
    if let Ok(date) = text.parse::<Date>() {
        return Some(date);
    }
    if let Ok(datetime) = text.parse::<DateTime>() {
        return Some(datetime.date());
    }
    text.parse::<jiff::Timestamp>()
        .ok()
        .map(|ts| ts.to_zoned(jiff::tz::TimeZone::UTC).date())
}

pub fn days_between(from: Date, to: Date) -> i64 {
    day_number(to) - day_number(from)
}

// Days since 0000-03-01 in the proleptic Gregorian calendar. Starting the year
// in March puts the leap day last.
fn day_number(date: Date) -> i64 {
    let month = date.month() as i64;
    let (year, shifted_month) = if month <= 2 {
        (date.year() as i64 - 1, month + 9)
    } else {
        (date.year() as i64, month - 3)
    };
    365 * year + year.div_euclid(4) - year.div_euclid(100) + year.div_euclid(400)
        + (153 * shifted_month + 2) / 5
        + date.day() as i64
        - 1
}
