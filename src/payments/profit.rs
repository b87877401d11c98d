use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};

/// result of splitting a loan's interest income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitBreakdown {
    /// fixed Price-table installment
    pub monthly_payment: Money,
    pub total_payment: Money,
    pub total_interest: Money,
    pub bank_profit: Money,
    pub investor_profit: Money,
}

/// Price-table profit calculator.
///
/// `monthly_payment = P * i(1+i)^n / ((1+i)^n - 1)`, the interest over the
/// whole term is split between the platform (`bank_share`) and the investor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfitCalculator {
    bank_share: Rate,
}

impl ProfitCalculator {
    pub fn new(bank_share: Rate) -> Self {
        Self { bank_share }
    }

    /// calculator with the 20% platform share
    pub fn standard() -> Self {
        Self::new(Rate::from_percentage(20))
    }

    pub fn bank_share(&self) -> Rate {
        self.bank_share
    }

    pub fn calculate(&self, principal: Money, rate: Rate, duration: u32) -> Result<ProfitBreakdown> {
        let monthly_payment = price_installment(principal, rate, duration)?;

        let total_payment = monthly_payment
            .checked_mul(Decimal::from(duration))
            .ok_or_else(|| overflow("total payment"))?;
        let total_interest = total_payment
            .checked_sub(principal)
            .ok_or_else(|| overflow("total interest"))?;
        let bank_profit = total_interest
            .checked_share(self.bank_share)
            .ok_or_else(|| overflow("bank profit"))?;
        let investor_profit = total_interest
            .checked_sub(bank_profit)
            .ok_or_else(|| overflow("investor profit"))?;

        tracing::debug!(
            principal = %principal,
            rate = %rate,
            duration,
            monthly_payment = %monthly_payment,
            bank_profit = %bank_profit,
            investor_profit = %investor_profit,
            "profit split calculated"
        );

        Ok(ProfitBreakdown {
            monthly_payment,
            total_payment,
            total_interest,
            bank_profit,
            investor_profit,
        })
    }
}

impl Default for ProfitCalculator {
    fn default() -> Self {
        Self::standard()
    }
}

/// `(bank_profit, investor_profit, monthly_payment)` with the standard platform share
pub fn calculate_profits(principal: Money, rate: Rate, duration: u32) -> Result<(Money, Money, Money)> {
    let breakdown = ProfitCalculator::standard().calculate(principal, rate, duration)?;
    Ok((
        breakdown.bank_profit,
        breakdown.investor_profit,
        breakdown.monthly_payment,
    ))
}

/// fixed installment of a Price table, `rate` being the per-period rate
pub fn price_installment(principal: Money, rate: Rate, periods: u32) -> Result<Money> {
    if periods == 0 {
        return Err(LendingError::validation("duration must be at least one period"));
    }

    if !principal.is_positive() {
        return Err(LendingError::validation(format!(
            "principal must be positive, got {}",
            principal
        )));
    }

    if rate.is_negative() {
        return Err(LendingError::validation(format!(
            "interest rate must be positive, got {}",
            rate
        )));
    }

    // (1+i)^n - 1 is zero for a zero rate
    if rate.is_zero() {
        return Err(LendingError::NumericDomain {
            message: "interest rate of zero makes the Price-table denominator zero".to_string(),
        });
    }

    let i = rate.as_decimal();
    let compound = compound_factor(i, periods)?;
    let denominator = compound - Decimal::ONE;

    let numerator = i
        .checked_mul(compound)
        .and_then(|growth| principal.as_decimal().checked_mul(growth))
        .ok_or_else(|| overflow("installment numerator"))?;

    let payment = numerator
        .checked_div(denominator)
        .ok_or_else(|| LendingError::NumericDomain {
            message: format!("installment of {} over {} periods is not representable", principal, periods),
        })?;

    Ok(Money::from_decimal(payment))
}

fn overflow(what: &str) -> LendingError {
    LendingError::NumericDomain {
        message: format!("{} overflowed", what),
    }
}

/// (1 + i)^n by repeated multiplication
fn compound_factor(i: Decimal, periods: u32) -> Result<Decimal> {
    let base = Decimal::ONE + i;
    let mut compound = Decimal::ONE;
    for _ in 0..periods {
        compound = compound
            .checked_mul(base)
            .ok_or_else(|| LendingError::NumericDomain {
                message: format!("(1 + {})^{} overflowed", i, periods),
            })?;
    }
    Ok(compound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use rust_decimal_macros::dec;

    #[test]
    fn test_five_percent_per_month_for_twelve_months() {
        let principal = Money::from_major(10_000);
        let rate = Rate::from_percentage(5);

        let breakdown = ProfitCalculator::standard().calculate(principal, rate, 12).unwrap();

        assert_eq!(breakdown.monthly_payment.to_cents(), Money::from_str_exact("1128.25").unwrap());
        assert_eq!(breakdown.total_interest, breakdown.total_payment - principal);
        assert_eq!(breakdown.bank_profit + breakdown.investor_profit, breakdown.total_interest);
        assert_eq!(breakdown.bank_profit, breakdown.total_interest.share(Rate::from_percentage(20)));
    }

    #[test]
    fn test_annual_rate_scenario() {
        // 5% a year expressed as a monthly rate
        let rate = Rate::from_percent_decimal(dec!(5) / dec!(12));

        let (bank, investor, payment) = calculate_profits(Money::from_major(10_000), rate, 12).unwrap();

        let tolerance = Money::from_str_exact("0.05").unwrap();
        assert_eq!(payment.to_cents(), Money::from_str_exact("856.07").unwrap());
        assert!((bank - Money::from_str_exact("54.58").unwrap()).abs() < tolerance);
        assert!((investor - Money::from_str_exact("218.30").unwrap()).abs() < tolerance);
        assert!(((bank + investor) - Money::from_str_exact("272.88").unwrap()).abs() < tolerance);
    }

    #[test]
    fn test_split_identity_holds_across_inputs() {
        let calculator = ProfitCalculator::standard();
        for (principal, percent, duration) in [(500, 1, 1), (2_500, 3, 6), (80_000, 2, 48), (1, 9, 3)] {
            let principal = Money::from_major(principal);
            let breakdown = calculator
                .calculate(principal, Rate::from_percentage(percent), duration)
                .unwrap();

            assert!(breakdown.total_interest.is_positive());
            assert_eq!(breakdown.bank_profit + breakdown.investor_profit, breakdown.total_payment - principal);
            assert!(breakdown.bank_profit.approx_eq(breakdown.total_interest * dec!(0.2), 6));
        }
    }

    #[test]
    fn test_single_period_is_principal_plus_interest() {
        let payment = price_installment(Money::from_major(1_000), Rate::from_percentage(10), 1).unwrap();
        assert_eq!(payment, Money::from_major(1_100));
    }

    #[test]
    fn test_zero_rate_is_a_numeric_domain_error() {
        let err = calculate_profits(Money::from_major(10_000), Rate::ZERO, 12).unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_invalid_arguments() {
        let rate = Rate::from_percentage(5);
        assert!(matches!(
            calculate_profits(Money::from_major(10_000), rate, 0),
            Err(LendingError::Validation { .. })
        ));
        assert!(matches!(
            calculate_profits(Money::ZERO, rate, 12),
            Err(LendingError::Validation { .. })
        ));
        assert!(matches!(
            calculate_profits(Money::from_major(100), Rate::from_decimal(dec!(-0.01)), 12),
            Err(LendingError::Validation { .. })
        ));
    }

    #[test]
    fn test_overflowing_terms_are_a_numeric_domain_error() {
        // (1+i)^n still fits, i * (1+i)^n does not
        let err = calculate_profits(Money::from_major(10_000), Rate::from_percentage(1000), 27).unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));

        let err = calculate_profits(Money::from_major(10_000), Rate::from_percentage(1000), 400).unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));

        // the installment fits, the total over the term does not
        let huge = Money::from_decimal(Decimal::MAX - Decimal::MAX / dec!(100));
        let err = calculate_profits(huge, Rate::from_percentage(10), 2).unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
    }

    #[test]
    fn test_custom_bank_share() {
        let calculator = ProfitCalculator::new(Rate::ZERO);
        let breakdown = calculator
            .calculate(Money::from_major(1_000), Rate::from_percentage(2), 10)
            .unwrap();
        assert_eq!(breakdown.bank_profit, Money::ZERO);
        assert_eq!(breakdown.investor_profit, breakdown.total_interest);
    }
}
