//! read projections returned by the listing operations
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::Result;
use crate::identity::UserProfile;
use crate::state::{Investment, Loan, Payment};
use crate::store::Transaction;
use crate::types::PaymentStatus;

/// loan with the borrower's identity and risk score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanListing {
    #[serde(flatten)]
    pub loan: Loan,
    pub borrower: Option<UserProfile>,
    pub risk_score: Option<u32>,
}

impl LoanListing {
    pub(crate) fn load(tx: &dyn Transaction, loan: Loan) -> Result<Self> {
        let borrower = match tx.get_borrower(loan.borrower_id)? {
            Some(borrower) => tx.get_user(borrower.user_id)?,
            None => None,
        };
        let risk_score = tx.risk_profile(loan.borrower_id)?.map(|p| p.risk_score);

        Ok(Self {
            loan,
            borrower,
            risk_score,
        })
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// investment with the funded loan and both parties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentListing {
    pub investment: Investment,
    pub loan: LoanListing,
    pub investor: Option<UserProfile>,
}

impl InvestmentListing {
    pub(crate) fn load(tx: &dyn Transaction, investment: Investment, loan: Loan) -> Result<Self> {
        let investor = match tx.get_investor(investment.investor_id)? {
            Some(investor) => tx.get_user(investor.user_id)?,
            None => None,
        };

        Ok(Self {
            investment,
            loan: LoanListing::load(tx, loan)?,
            investor,
        })
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// an investor's own investment joined with its loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInvestment {
    pub investment: Investment,
    pub loan: Loan,
}

/// repayment progress of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentSummary {
    pub installments: usize,
    pub installments_paid: usize,
    pub amount_scheduled: Money,
    pub amount_paid: Money,
    pub awaiting_payout: usize,
}

impl RepaymentSummary {
    pub fn from_payments(payments: &[Payment]) -> Self {
        let paid: Vec<&Payment> = payments
            .iter()
            .filter(|p| p.status == PaymentStatus::Payed)
            .collect();

        Self {
            installments: payments.len(),
            installments_paid: paid.len(),
            amount_scheduled: payments.iter().map(|p| p.amount).sum(),
            amount_paid: paid.iter().map(|p| p.amount).sum(),
            awaiting_payout: payments.iter().filter(|p| p.awaiting_payout()).count(),
        }
    }

    pub fn is_settled(&self) -> bool {
        self.installments > 0 && self.installments == self.installments_paid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{LoanGoal, LoanStatus};
    use chrono::{TimeZone, Utc};

    fn payment(number: u32, status: PaymentStatus) -> Payment {
        Payment {
            payment_id: u64::from(number),
            loan_id: 1,
            borrower_id: 1,
            installment_number: number,
            amount: Money::from_major(100),
            due_date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            status,
            status_payment_investor: PaymentStatus::Pending,
            bank_profit: Money::from_major(2),
            investor_profit: Money::from_major(8),
            last_status_change: None,
            last_investor_status_change: None,
        }
    }

    #[test]
    fn test_repayment_summary() {
        let payments = vec![
            payment(1, PaymentStatus::Payed),
            payment(2, PaymentStatus::Late),
            payment(3, PaymentStatus::Pending),
        ];

        let summary = RepaymentSummary::from_payments(&payments);
        assert_eq!(summary.installments, 3);
        assert_eq!(summary.installments_paid, 1);
        assert_eq!(summary.amount_scheduled, Money::from_major(300));
        assert_eq!(summary.amount_paid, Money::from_major(100));
        assert_eq!(summary.awaiting_payout, 1);
        assert!(!summary.is_settled());
        assert!(!RepaymentSummary::from_payments(&[]).is_settled());
    }

    #[test]
    fn test_listing_json_flattens_loan() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let listing = LoanListing {
            loan: Loan {
                loan_id: 4,
                borrower_id: 2,
                amount: Money::from_major(1_500),
                interest_rate: Rate::from_percentage(3),
                duration: 6,
                status: LoanStatus::Pending,
                goal: LoanGoal::Business,
                bank_profit: None,
                investor_profit: None,
                created_at: now,
                last_status_change: now,
            },
            borrower: None,
            risk_score: Some(720),
        };

        let json: serde_json::Value = serde_json::from_str(&listing.to_json_pretty().unwrap()).unwrap();
        assert_eq!(json["loan_id"], 4);
        assert_eq!(json["goal"], "negocios");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["risk_score"], 720);
    }
}
