use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LendingError, Result};
use crate::payments::ProfitBreakdown;
use crate::types::{
    BorrowerId, ContractId, ContractStatus, InvestmentId, InvestorId, LoanGoal, LoanId, LoanStatus,
    PaymentId, PaymentStatus, UserId,
};

/// borrower role attached to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub borrower_id: BorrowerId,
    pub user_id: UserId,
}

/// investor role attached to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investor {
    pub investor_id: InvestorId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskProfile {
    pub borrower_id: BorrowerId,
    pub risk_score: u32,
}

/// financial terms of a loan request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub amount: Money,
    /// rate per installment period
    pub interest_rate: Rate,
    /// number of installments
    pub duration: u32,
    pub goal: LoanGoal,
}

impl LoanTerms {
    pub fn new(amount: Money, interest_rate: Rate, duration: u32, goal: LoanGoal) -> Self {
        Self {
            amount,
            interest_rate,
            duration,
            goal,
        }
    }

    /// reject terms the profit calculation cannot handle
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LendingError::validation(format!(
                "loan amount must be positive, got {}",
                self.amount
            )));
        }

        if self.interest_rate.is_zero() || self.interest_rate.is_negative() {
            return Err(LendingError::validation(format!(
                "interest rate must be positive, got {}",
                self.interest_rate
            )));
        }

        if self.duration == 0 {
            return Err(LendingError::validation("duration must be at least one installment"));
        }

        Ok(())
    }
}

/// loan record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub amount: Money,
    pub interest_rate: Rate,
    pub duration: u32,
    pub status: LoanStatus,
    pub goal: LoanGoal,
    // set once the loan is funded
    pub bank_profit: Option<Money>,
    pub investor_profit: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub last_status_change: DateTime<Utc>,
}

impl Loan {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms::new(self.amount, self.interest_rate, self.duration, self.goal)
    }

    /// overwrite the financial terms; only allowed before funding
    pub fn apply_terms(&mut self, terms: &LoanTerms) -> Result<()> {
        terms.validate()?;

        let changes_money = terms.amount != self.amount
            || terms.interest_rate != self.interest_rate
            || terms.duration != self.duration;

        if changes_money && self.status != LoanStatus::Pending {
            return Err(LendingError::invalid_state(self.status, LoanStatus::Pending));
        }

        self.amount = terms.amount;
        self.interest_rate = terms.interest_rate;
        self.duration = terms.duration;
        self.goal = terms.goal;
        Ok(())
    }

    /// move to `next`, forward only. returns false when already there.
    pub fn transition(&mut self, next: LoanStatus, timestamp: DateTime<Utc>) -> Result<bool> {
        if next == self.status {
            return Ok(false);
        }

        if !self.status.can_transition_to(next) {
            return Err(LendingError::InvalidState {
                current: self.status.to_string(),
                expected: format!("a status after {}", self.status),
            });
        }

        self.status = next;
        self.last_status_change = timestamp;
        Ok(true)
    }

    pub fn record_profits(&mut self, breakdown: &ProfitBreakdown) {
        self.bank_profit = Some(breakdown.bank_profit);
        self.investor_profit = Some(breakdown.investor_profit);
    }
}

/// loan insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoan {
    pub borrower_id: BorrowerId,
    pub terms: LoanTerms,
    pub created_at: DateTime<Utc>,
}

/// investor commitment against a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Investment {
    pub investment_id: InvestmentId,
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInvestment {
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub amount: Money,
    pub created_at: DateTime<Utc>,
}

/// signed agreement between borrower and investor, one per loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub contract_id: ContractId,
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub borrower_id: BorrowerId,
    pub status: ContractStatus,
    pub date_signed: DateTime<Utc>,
    pub investor_signature: Uuid,
    pub borrower_signature: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub loan_id: LoanId,
    pub investor_id: InvestorId,
    pub borrower_id: BorrowerId,
    pub date_signed: DateTime<Utc>,
}

/// one installment of a loan's repayment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub installment_number: u32,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    /// borrower side
    pub status: PaymentStatus,
    /// payout to the investor
    pub status_payment_investor: PaymentStatus,
    pub bank_profit: Money,
    pub investor_profit: Money,
    /// last change of `status`
    pub last_status_change: Option<DateTime<Utc>>,
    /// last change of `status_payment_investor`
    pub last_investor_status_change: Option<DateTime<Utc>>,
}

impl Payment {
    /// borrower paid, investor not yet paid out
    pub fn awaiting_payout(&self) -> bool {
        self.status == PaymentStatus::Payed && self.status_payment_investor == PaymentStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub loan_id: LoanId,
    pub borrower_id: BorrowerId,
    pub installment_number: u32,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub bank_profit: Money,
    pub investor_profit: Money,
}
