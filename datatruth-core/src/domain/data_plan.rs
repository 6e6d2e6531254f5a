use serde::{Deserialize, Serialize};

pub const DEFAULT_ALERT_THRESHOLD_PERCENTAGE: f64 = 80.0;
pub const DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE: f64 = 5.0;

/// User-configured data plan. One active plan per provider; writes are
/// insert-or-replace keyed by provider name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPlan {
    pub id: String,
    pub provider_name: String,
    pub data_limit_bytes: i64,
    /// Day of the billing cycle the plan resets on, 1..=31.
    pub billing_cycle_start_day: u8,
    pub alert_threshold_percentage: f64,
    pub discrepancy_threshold_percentage: f64,
}

#[derive(thiserror::Error, Debug)]
pub enum PlanValidationError {
    #[error("provider name must not be empty")]
    EmptyProviderName,
    #[error("data limit must be positive, got {0}")]
    NonPositiveLimit(i64),
    #[error("billing cycle start day must be in 1..=31, got {0}")]
    InvalidCycleDay(u8),
}

impl DataPlan {
    pub fn new(
        id: impl Into<String>,
        provider_name: impl Into<String>,
        data_limit_bytes: i64,
        billing_cycle_start_day: u8,
    ) -> Self {
        Self {
            id: id.into(),
            provider_name: provider_name.into(),
            data_limit_bytes,
            billing_cycle_start_day,
            alert_threshold_percentage: DEFAULT_ALERT_THRESHOLD_PERCENTAGE,
            discrepancy_threshold_percentage: DEFAULT_DISCREPANCY_THRESHOLD_PERCENTAGE,
        }
    }

    /// Boundary validation; the calculators assume an in-domain plan.
    pub fn validate(&self) -> Result<(), PlanValidationError> {
        if self.provider_name.trim().is_empty() {
            return Err(PlanValidationError::EmptyProviderName);
        }
        if self.data_limit_bytes <= 0 {
            return Err(PlanValidationError::NonPositiveLimit(self.data_limit_bytes));
        }
        if !(1..=31).contains(&self.billing_cycle_start_day) {
            return Err(PlanValidationError::InvalidCycleDay(
                self.billing_cycle_start_day,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_plan_carries_default_thresholds() {
        let plan = DataPlan::new("plan_1", "Acme Mobile", 5_000_000_000, 1);
        assert_eq!(plan.alert_threshold_percentage, 80.0);
        assert_eq!(plan.discrepancy_threshold_percentage, 5.0);
        assert!(plan.validate().is_ok());
    }

    #[test]
    fn validation_rejects_out_of_domain_plans() {
        let mut plan = DataPlan::new("plan_1", "Acme Mobile", 5_000_000_000, 1);
        plan.data_limit_bytes = 0;
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::NonPositiveLimit(0))
        ));

        let mut plan = DataPlan::new("plan_1", "Acme Mobile", 5_000_000_000, 32);
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::InvalidCycleDay(32))
        ));
        plan.billing_cycle_start_day = 0;
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::InvalidCycleDay(0))
        ));

        let plan = DataPlan::new("plan_1", "  ", 5_000_000_000, 1);
        assert!(matches!(
            plan.validate(),
            Err(PlanValidationError::EmptyProviderName)
        ));
    }
}
