use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::config::{InstallmentFormula, LendingConfig};
use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::payments::amortization::{due_date, AmortizationSchedule};
use crate::payments::profit::ProfitCalculator;

/// installment figures before they are persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedInstallment {
    pub installment_number: u32,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub bank_profit: Money,
    pub investor_profit: Money,
}

/// turns a funded amount into `duration` installments
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstallmentPlanner {
    formula: InstallmentFormula,
    interval_days: u32,
    calculator: ProfitCalculator,
}

impl InstallmentPlanner {
    pub fn new(formula: InstallmentFormula, interval_days: u32, calculator: ProfitCalculator) -> Self {
        Self {
            formula,
            interval_days,
            calculator,
        }
    }

    pub fn from_config(config: &LendingConfig) -> Self {
        Self::new(
            config.schedule.formula,
            config.schedule.installment_interval_days,
            ProfitCalculator::new(config.profit_split.bank_share),
        )
    }

    pub fn formula(&self) -> InstallmentFormula {
        self.formula
    }

    /// installment `i` is due `i * interval_days` after `start`
    pub fn plan(
        &self,
        invested: Money,
        rate: Rate,
        duration: u32,
        start: DateTime<Utc>,
    ) -> Result<Vec<PlannedInstallment>> {
        if duration == 0 {
            return Err(LendingError::NumericDomain {
                message: "cannot split a loan into zero installments".to_string(),
            });
        }

        let planned = match self.formula {
            InstallmentFormula::EqualSplit => self.equal_split(invested, rate, duration, start)?,
            InstallmentFormula::Amortized => self.amortized(invested, rate, duration, start)?,
        };

        tracing::debug!(
            formula = ?self.formula,
            invested = %invested,
            installments = duration,
            first_amount = %planned[0].amount,
            "installments planned"
        );

        Ok(planned)
    }

    fn equal_split(
        &self,
        invested: Money,
        rate: Rate,
        duration: u32,
        start: DateTime<Utc>,
    ) -> Result<Vec<PlannedInstallment>> {
        let profits = self.calculator.calculate(invested, rate, duration)?;

        let amounts = split_evenly(invested, duration);
        let bank = split_evenly(profits.bank_profit.to_cents(), duration);
        let investor = split_evenly(profits.investor_profit.to_cents(), duration);

        Ok((1..=duration)
            .zip(amounts)
            .zip(bank.into_iter().zip(investor))
            .map(|((number, amount), (bank_profit, investor_profit))| PlannedInstallment {
                installment_number: number,
                amount,
                due_date: due_date(start, number, self.interval_days),
                bank_profit,
                investor_profit,
            })
            .collect())
    }

    fn amortized(
        &self,
        invested: Money,
        rate: Rate,
        duration: u32,
        start: DateTime<Utc>,
    ) -> Result<Vec<PlannedInstallment>> {
        let schedule = AmortizationSchedule::generate(invested, rate, duration, start, self.interval_days)?;

        Ok(schedule
            .installments
            .iter()
            .map(|row| {
                let (bank_profit, investor_profit) = row.split_interest(self.calculator.bank_share());
                PlannedInstallment {
                    installment_number: row.installment_number,
                    amount: row.payment_amount.to_cents(),
                    due_date: row.due_date,
                    bank_profit: bank_profit.to_cents(),
                    investor_profit: investor_profit.to_cents(),
                }
            })
            .collect())
    }
}

/// `parts` cent amounts summing exactly to `total`; the last one takes the remainder
fn split_evenly(total: Money, parts: u32) -> Vec<Money> {
    let per_part = Money::from_decimal(
        (total.as_decimal() / Decimal::from(parts)).round_dp_with_strategy(2, RoundingStrategy::ToZero),
    );
    let remainder = total - per_part * Decimal::from(parts - 1);

    let mut amounts = vec![per_part; parts as usize - 1];
    amounts.push(remainder);
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_equal_split_sums_to_invested_amount() {
        let planner = InstallmentPlanner::from_config(&LendingConfig::standard());
        let plan = planner
            .plan(Money::from_major(1_000), Rate::from_percentage(2), 3, start())
            .unwrap();

        let amounts: Vec<String> = plan.iter().map(|p| p.amount.to_string()).collect();
        assert_eq!(amounts, vec!["333.33", "333.33", "333.34"]);
        assert_eq!(plan.iter().map(|p| p.amount).sum::<Money>(), Money::from_major(1_000));

        assert_eq!(plan[0].due_date, start() + Duration::days(30));
        assert_eq!(plan[2].due_date, start() + Duration::days(90));
        assert_eq!(plan[2].installment_number, 3);
    }

    #[test]
    fn test_equal_split_carries_profit_shares() {
        let planner = InstallmentPlanner::from_config(&LendingConfig::standard());
        let invested = Money::from_major(10_000);
        let rate = Rate::from_decimal(dec!(0.05) / dec!(12));

        let plan = planner.plan(invested, rate, 12, start()).unwrap();
        let breakdown = ProfitCalculator::standard().calculate(invested, rate, 12).unwrap();

        let bank: Money = plan.iter().map(|p| p.bank_profit).sum();
        let investor: Money = plan.iter().map(|p| p.investor_profit).sum();
        assert_eq!(bank, breakdown.bank_profit.to_cents());
        assert_eq!(investor, breakdown.investor_profit.to_cents());
    }

    #[test]
    fn test_amortized_installments() {
        let config = LendingConfig::standard().with_formula(InstallmentFormula::Amortized);
        let planner = InstallmentPlanner::from_config(&config);

        let plan = planner
            .plan(Money::from_major(10_000), Rate::from_percentage(5), 12, start())
            .unwrap();

        assert_eq!(plan.len(), 12);
        assert_eq!(plan[0].amount, Money::from_str_exact("1128.25").unwrap());
        // first period interest is 500, 20% to the platform
        assert_eq!(plan[0].bank_profit, Money::from_major(100));
        assert_eq!(plan[0].investor_profit, Money::from_major(400));
        assert!(plan[11].bank_profit < plan[0].bank_profit);
    }

    #[test]
    fn test_zero_installments_rejected() {
        let planner = InstallmentPlanner::from_config(&LendingConfig::standard());
        let err = planner
            .plan(Money::from_major(500), Rate::from_percentage(1), 0, start())
            .unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));
    }

    #[test]
    fn test_split_evenly_single_part() {
        let parts = split_evenly(Money::from_str_exact("10.01").unwrap(), 1);
        assert_eq!(parts, vec![Money::from_str_exact("10.01").unwrap()]);
    }
}
