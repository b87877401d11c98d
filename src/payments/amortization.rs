use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::payments::profit::price_installment;

/// one row of a Price table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub installment_number: u32,
    pub due_date: DateTime<Utc>,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
    pub cumulative_interest: Money,
}

impl ScheduledInstallment {
    /// (platform, investor) share of this installment's interest
    pub fn split_interest(&self, bank_share: Rate) -> (Money, Money) {
        let bank = self.interest_portion.share(bank_share);
        (bank, self.interest_portion - bank)
    }
}

/// fixed-installment amortization schedule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub rate: Rate,
    pub periods: u32,
    pub start_date: DateTime<Utc>,
    pub interval_days: u32,
    pub installments: Vec<ScheduledInstallment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    /// generate the schedule; installment i is due `i * interval_days` after `start_date`
    pub fn generate(
        principal: Money,
        rate: Rate,
        periods: u32,
        start_date: DateTime<Utc>,
        interval_days: u32,
    ) -> Result<Self> {
        let payment = price_installment(principal, rate, periods)?;

        let mut installments = Vec::with_capacity(periods as usize);
        let mut balance = principal;
        let mut cumulative_interest = Money::ZERO;

        for number in 1..=periods {
            let interest_portion = balance.share(rate);
            let principal_portion = payment - interest_portion;
            let ending_balance = (balance - principal_portion).max(Money::ZERO);
            cumulative_interest += interest_portion;

            installments.push(ScheduledInstallment {
                installment_number: number,
                due_date: due_date(start_date, number, interval_days),
                beginning_balance: balance,
                payment_amount: payment,
                principal_portion,
                interest_portion,
                ending_balance,
                cumulative_interest,
            });

            balance = ending_balance;
        }

        // absorb rounding drift in the last installment
        if let Some(last) = installments.last_mut() {
            if last.ending_balance.is_positive() && last.ending_balance < Money::ONE {
                last.principal_portion += last.ending_balance;
                last.payment_amount += last.ending_balance;
                last.ending_balance = Money::ZERO;
            }
        }

        let total_interest = installments.iter().map(|i| i.interest_portion).sum();
        let total_payment = installments.iter().map(|i| i.payment_amount).sum();

        Ok(Self {
            principal,
            rate,
            periods,
            start_date,
            interval_days,
            installments,
            total_interest,
            total_payment,
        })
    }

    /// installment by 1-based number
    pub fn get(&self, installment_number: u32) -> Option<&ScheduledInstallment> {
        installment_number
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    /// outstanding balance after the given installment
    pub fn balance_after(&self, installment_number: u32) -> Money {
        self.get(installment_number)
            .map(|i| i.ending_balance)
            .unwrap_or(self.principal)
    }
}

/// due date of installment `number`
pub fn due_date(start: DateTime<Utc>, number: u32, interval_days: u32) -> DateTime<Utc> {
    start + Duration::days(i64::from(number) * i64::from(interval_days))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_price_table_schedule() {
        let principal = Money::from_major(10_000);
        let rate = Rate::from_percentage(5);

        let schedule = AmortizationSchedule::generate(principal, rate, 12, start(), 30).unwrap();

        assert_eq!(schedule.installments.len(), 12);

        let first = schedule.get(1).unwrap();
        assert_eq!(first.beginning_balance, principal);
        assert_eq!(first.interest_portion, Money::from_major(500));
        assert_eq!(first.due_date, start() + Duration::days(30));

        // interest declines, principal grows
        for pair in schedule.installments.windows(2) {
            assert!(pair[1].interest_portion < pair[0].interest_portion);
            assert!(pair[1].principal_portion > pair[0].principal_portion);
            assert_eq!(pair[1].due_date - pair[0].due_date, Duration::days(30));
        }

        let last = schedule.get(12).unwrap();
        assert_eq!(last.ending_balance, Money::ZERO);
        assert_eq!(last.due_date, start() + Duration::days(360));
    }

    #[test]
    fn test_totals_match_profit_calculator() {
        let principal = Money::from_major(10_000);
        let rate = Rate::from_percentage(5);

        let schedule = AmortizationSchedule::generate(principal, rate, 12, start(), 30).unwrap();
        let breakdown = crate::payments::ProfitCalculator::standard()
            .calculate(principal, rate, 12)
            .unwrap();

        assert!(schedule.total_payment.approx_eq(breakdown.total_payment, 2));
        assert!(schedule.total_interest.approx_eq(breakdown.total_interest, 2));
    }

    #[test]
    fn test_interest_split_per_installment() {
        let schedule = AmortizationSchedule::generate(
            Money::from_major(1_000),
            Rate::from_percentage(10),
            1,
            start(),
            30,
        )
        .unwrap();

        let only = schedule.get(1).unwrap();
        let (bank, investor) = only.split_interest(Rate::from_percentage(20));
        assert_eq!(bank, Money::from_major(20));
        assert_eq!(investor, Money::from_major(80));
        assert!(schedule.get(0).is_none());
        assert_eq!(schedule.balance_after(1), Money::ZERO);
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(AmortizationSchedule::generate(Money::from_major(100), Rate::ZERO, 3, start(), 30).is_err());
    }
}
