use jiff::ToSpan;
use jiff::civil::Date;
use thiserror::Error;
use uuid::Uuid;

use crate::core::{Adjustment, SavingsPlan};

pub const DEFAULT_PLAN_NAME: &str = "New savings plan";
pub const DEFAULT_TARGET_AMOUNT: f64 = 10_000.0;
pub const DEFAULT_EXPECTED_RATE_PERCENT: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("plan {0} not found")]
    PlanNotFound(String),
    #[error("adjustment {0} not found")]
    AdjustmentNotFound(String),
    #[error("at least one plan must remain")]
    LastPlan,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// Each `with_*` consumes the plan and hands back the updated value.
impl SavingsPlan {
    pub fn with_defaults(today: Date) -> Self {
        SavingsPlan {
            id: new_id(),
            name: DEFAULT_PLAN_NAME.to_string(),
            deadline: today.saturating_add(1.year()),
            target_amount: DEFAULT_TARGET_AMOUNT,
            current_amount: 0.0,
            expected_annual_rate_percent: DEFAULT_EXPECTED_RATE_PERCENT,
            adjustments: Vec::new(),
        }
    }

    pub fn with_name(self, name: impl Into<String>) -> Self {
        SavingsPlan {
            name: name.into(),
            ..self
        }
    }

    pub fn with_deadline(self, deadline: Date) -> Self {
        SavingsPlan { deadline, ..self }
    }

    pub fn with_target_amount(self, target_amount: f64) -> Self {
        SavingsPlan {
            target_amount,
            ..self
        }
    }

    pub fn with_current_amount(self, current_amount: f64) -> Self {
        SavingsPlan {
            current_amount,
            ..self
        }
    }

    pub fn with_expected_rate(self, expected_annual_rate_percent: f64) -> Self {
        SavingsPlan {
            expected_annual_rate_percent,
            ..self
        }
    }

    pub fn with_adjustment(mut self, date: impl Into<String>, amount: f64) -> Self {
        self.adjustments.push(Adjustment {
            id: new_id(),
            date: date.into(),
            amount,
        });
        self
    }

    pub fn without_adjustment(mut self, adjustment_id: &str) -> Result<Self, PlanError> {
        let before = self.adjustments.len();
        self.adjustments.retain(|adj| adj.id != adjustment_id);
        if self.adjustments.len() == before {
            return Err(PlanError::AdjustmentNotFound(adjustment_id.to_string()));
        }
        Ok(self)
    }
}

/// The active plan collection, in insertion order. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanBook {
    plans: Vec<SavingsPlan>,
}

impl PlanBook {
    pub fn new(today: Date) -> Self {
        PlanBook {
            plans: vec![SavingsPlan::with_defaults(today)],
        }
    }

    /// Restore a saved collection, seeding a default plan if it is empty.
    pub fn from_plans(plans: Vec<SavingsPlan>, today: Date) -> Self {
        if plans.is_empty() {
            return Self::new(today);
        }
        PlanBook { plans }
    }

    pub fn plans(&self) -> &[SavingsPlan] {
        &self.plans
    }

    pub fn get(&self, id: &str) -> Option<&SavingsPlan> {
        self.plans.iter().find(|plan| plan.id == id)
    }

    pub fn add(&mut self, plan: SavingsPlan) -> &SavingsPlan {
        self.plans.push(plan);
        let last = self.plans.len() - 1;
        &self.plans[last]
    }

    pub fn update<F>(&mut self, id: &str, update: F) -> Result<&SavingsPlan, PlanError>
    where
        F: FnOnce(SavingsPlan) -> Result<SavingsPlan, PlanError>,
    {
        let idx = self
            .plans
            .iter()
            .position(|plan| plan.id == id)
            .ok_or_else(|| PlanError::PlanNotFound(id.to_string()))?;
        let updated = update(self.plans[idx].clone())?;
        self.plans[idx] = updated;
        Ok(&self.plans[idx])
    }

    pub fn remove(&mut self, id: &str) -> Result<SavingsPlan, PlanError> {
        let idx = self
            .plans
            .iter()
            .position(|plan| plan.id == id)
            .ok_or_else(|| PlanError::PlanNotFound(id.to_string()))?;
        if self.plans.len() == 1 {
            return Err(PlanError::LastPlan);
        }
        Ok(self.plans.remove(idx))
    }
}
