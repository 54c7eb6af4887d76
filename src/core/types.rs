use jiff::civil::Date;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum CompoundingFrequency {
    Annually,
    SemiAnnually,
    Quarterly,
    Monthly,
    Weekly,
    Daily,
}

impl CompoundingFrequency {
    pub const ALL: [CompoundingFrequency; 6] = [
        CompoundingFrequency::Annually,
        CompoundingFrequency::SemiAnnually,
        CompoundingFrequency::Quarterly,
        CompoundingFrequency::Monthly,
        CompoundingFrequency::Weekly,
        CompoundingFrequency::Daily,
    ];

    pub fn periods_per_year(self) -> u32 {
        match self {
            CompoundingFrequency::Annually => 1,
            CompoundingFrequency::SemiAnnually => 2,
            CompoundingFrequency::Quarterly => 4,
            CompoundingFrequency::Monthly => 12,
            CompoundingFrequency::Weekly => 52,
            CompoundingFrequency::Daily => 365,
        }
    }

    pub fn from_periods(periods: u32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|freq| freq.periods_per_year() == periods)
    }
}

impl TryFrom<u32> for CompoundingFrequency {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_periods(value)
            .ok_or_else(|| format!("unsupported compounding frequency {value}"))
    }
}

impl From<CompoundingFrequency> for u32 {
    fn from(value: CompoundingFrequency) -> Self {
        value.periods_per_year()
    }
}

// `annual_rate_percent` is a percentage (5.0 means 5%). `annual_contribution`
// is spread evenly over the compounding periods of each year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub years: f64,
    pub frequency: CompoundingFrequency,
    pub annual_contribution: f64,
}

impl Scenario {
    pub fn annual_rate(&self) -> f64 {
        self.annual_rate_percent / 100.0
    }

    pub fn has_contribution(&self) -> bool {
        self.annual_contribution > 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyDataPoint {
    pub year: u32,
    pub principal_to_date: f64,
    pub interest_to_date: f64,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub schedule: Vec<YearlyDataPoint>,
    pub final_amount: f64,
    pub total_principal: f64,
    pub total_interest: f64,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Unknown {
    Principal,
    Rate,
    Years,
}

/// The fixed side of an inverse solve. The field named by `unknown` is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveRequest {
    pub unknown: Unknown,
    pub target_final_value: f64,
    pub scenario: Scenario,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolveMethod {
    ClosedForm,
    Bisection,
    StepSearch,
    FixedPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveOutcome {
    pub unknown: Unknown,
    /// Currency units for principal, annual percent for rate, years for horizon.
    pub value: f64,
    pub method: SolveMethod,
    pub iterations: u32,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjustment {
    pub id: String,
    /// Kept as entered; a date that fails to parse excludes the adjustment from metrics.
    pub date: String,
    /// Negative amounts are withdrawals.
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPlan {
    pub id: String,
    pub name: String,
    pub deadline: Date,
    pub target_amount: f64,
    pub current_amount: f64,
    pub expected_annual_rate_percent: f64,
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanMetrics {
    pub days_remaining: u32,
    pub years_remaining: f64,
    pub future_value_of_current_holdings: f64,
    pub future_value_of_adjustments: f64,
    pub projected_total_without_further_saving: f64,
    pub funding_gap: f64,
    pub required_yearly_saving: f64,
    pub required_monthly_saving: f64,
    pub required_daily_saving: f64,
    /// `None` when even 200% a year does not reach the target, or no time remains.
    pub required_annual_rate_percent: Option<f64>,
}
