use serde::{Deserialize, Serialize};

use crate::decimal::Rate;
use crate::errors::{LendingError, Result};

/// marketplace configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingConfig {
    pub profit_split: ProfitSplitConfig,
    pub schedule: ScheduleConfig,
    pub funding: FundingConfig,
}

/// how interest income is divided between the platform and the investor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitSplitConfig {
    /// platform share of total interest
    pub bank_share: Rate,
}

/// repayment schedule generation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// installment i is due `i * installment_interval_days` after generation
    pub installment_interval_days: u32,
    pub formula: InstallmentFormula,
}

/// per-installment amount formula
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallmentFormula {
    /// invested amount divided evenly by the number of installments
    EqualSplit,
    /// fixed Price-table installment including interest
    Amortized,
}

/// funding workflow
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundingConfig {
    pub contract_timing: ContractTiming,
    /// investment amount must equal the requested loan amount
    pub require_full_funding: bool,
}

/// when the contract and the installments are generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractTiming {
    /// on the explicit transition to `payed`; investment only moves the loan to `solicited`
    OnPayedTransition,
    /// inside the investment call; the loan goes straight to `done`
    OnInvestment,
}

impl LendingConfig {
    /// deferred contract generation, equal-split installments, 20% platform share
    pub fn standard() -> Self {
        Self {
            profit_split: ProfitSplitConfig {
                bank_share: Rate::from_percentage(20),
            },
            schedule: ScheduleConfig {
                installment_interval_days: 30,
                formula: InstallmentFormula::EqualSplit,
            },
            funding: FundingConfig {
                contract_timing: ContractTiming::OnPayedTransition,
                require_full_funding: false,
            },
        }
    }

    /// contract and installments generated as soon as the loan is funded
    pub fn immediate_contracts() -> Self {
        let mut config = Self::standard();
        config.funding.contract_timing = ContractTiming::OnInvestment;
        config
    }

    pub fn with_formula(mut self, formula: InstallmentFormula) -> Self {
        self.schedule.formula = formula;
        self
    }

    pub fn with_full_funding(mut self) -> Self {
        self.funding.require_full_funding = true;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let share = self.profit_split.bank_share;
        if share.is_negative() || share > Rate::ONE {
            return Err(LendingError::validation(format!(
                "bank share must be between 0% and 100%, got {}",
                share
            )));
        }

        if self.schedule.installment_interval_days == 0 {
            return Err(LendingError::validation(
                "installment interval must be at least one day",
            ));
        }

        Ok(())
    }
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config() {
        let config = LendingConfig::default();
        assert_eq!(config.profit_split.bank_share, Rate::from_percentage(20));
        assert_eq!(config.schedule.installment_interval_days, 30);
        assert_eq!(config.schedule.formula, InstallmentFormula::EqualSplit);
        assert_eq!(config.funding.contract_timing, ContractTiming::OnPayedTransition);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = LendingConfig::standard();
        config.profit_split.bank_share = Rate::from_percentage(120);
        assert!(config.validate().is_err());

        let mut config = LendingConfig::standard();
        config.schedule.installment_interval_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_roundtrips_through_json() {
        let config = LendingConfig::immediate_contracts().with_formula(InstallmentFormula::Amortized);
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LendingConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
