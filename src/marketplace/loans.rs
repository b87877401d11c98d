use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{require_borrower, Marketplace};
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::identity::AuthenticatedUser;
use crate::state::{Loan, LoanTerms, NewLoan};
use crate::store::{LendingStore, Transaction};
use crate::types::{LoanId, LoanStatus};
use crate::views::LoanListing;

/// full overwrite of a loan's editable fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanUpdate {
    #[serde(flatten)]
    pub terms: LoanTerms,
    pub status: LoanStatus,
}

impl<S: LendingStore> Marketplace<S> {
    /// request a loan as the caller's borrower role
    pub fn create_loan(&self, user: &AuthenticatedUser, terms: LoanTerms) -> Result<Loan> {
        let now = self.now();

        self.in_transaction("create_loan", |tx, events| {
            self.check_terms(&terms)?;
            let borrower = require_borrower(tx, user)?;

            let loan = tx.insert_loan(NewLoan {
                borrower_id: borrower.borrower_id,
                terms,
                created_at: now,
            })?;

            tracing::info!(
                loan_id = loan.loan_id,
                borrower_id = loan.borrower_id,
                amount = %loan.amount,
                rate = %loan.interest_rate,
                duration = loan.duration,
                goal = %loan.goal,
                "loan requested"
            );
            events.push(Event::LoanRequested {
                loan_id: loan.loan_id,
                borrower_id: loan.borrower_id,
                amount: loan.amount,
                timestamp: now,
            });
            Ok(loan)
        })
    }

    pub fn get_loan(&self, loan_id: LoanId) -> Result<LoanListing> {
        self.read("get_loan", |tx| {
            let loan = require_loan(tx, loan_id)?;
            LoanListing::load(tx, loan)
        })
    }

    /// overwrite terms and status; the status goes through the same forward-only
    /// transition as [`Marketplace::update_loan_status`]
    pub fn update_loan(&self, loan_id: LoanId, update: LoanUpdate) -> Result<Loan> {
        let now = self.now();

        self.in_transaction("update_loan", |tx, events| {
            let mut loan = require_loan(tx, loan_id)?;
            // validate the target before anything is written
            if !loan.status.can_transition_to(update.status) {
                return Err(LendingError::invalid_state(
                    loan.status,
                    format!("a status after {}", loan.status),
                ));
            }

            let before = loan.terms();
            loan.apply_terms(&update.terms)?;
            if loan.terms() != before {
                self.check_terms(&update.terms)?;
                tx.save_loan(&loan)?;
                tracing::info!(loan_id, amount = %loan.amount, duration = loan.duration, "loan updated");
                events.push(Event::LoanUpdated {
                    loan_id,
                    amount: loan.amount,
                    timestamp: now,
                });
            }

            self.apply_status(tx, events, &mut loan, update.status, now)?;
            Ok(loan)
        })
    }

    /// move the loan forward; entering `payed` generates the contract and installments
    pub fn update_loan_status(&self, loan_id: LoanId, status: LoanStatus) -> Result<Loan> {
        let now = self.now();

        self.in_transaction("update_loan_status", |tx, events| {
            let mut loan = require_loan(tx, loan_id)?;
            self.apply_status(tx, events, &mut loan, status, now)?;
            Ok(loan)
        })
    }

    /// status given as its wire value; only the five lifecycle values are accepted
    pub fn update_loan_status_str(&self, loan_id: LoanId, status: &str) -> Result<Loan> {
        let status = status.parse::<LoanStatus>().map_err(|err| {
            tracing::warn!(loan_id, value = status, "unsupported loan status");
            err
        })?;
        self.update_loan_status(loan_id, status)
    }

    /// hard delete of a pending loan
    pub fn delete_loan(&self, loan_id: LoanId) -> Result<()> {
        let now = self.now();

        self.in_transaction("delete_loan", |tx, events| {
            let loan = require_loan(tx, loan_id)?;
            if loan.status != LoanStatus::Pending {
                return Err(LendingError::invalid_state(loan.status, LoanStatus::Pending));
            }

            tx.delete_loan(loan_id)?;
            tracing::info!(loan_id, "loan deleted");
            events.push(Event::LoanDeleted { loan_id, timestamp: now });
            Ok(())
        })
    }

    pub fn list_loans(&self) -> Result<Vec<LoanListing>> {
        self.read("list_loans", |tx| {
            tx.loans()?
                .into_iter()
                .map(|loan| LoanListing::load(tx, loan))
                .collect()
        })
    }

    /// loans requested by the caller's borrower role
    pub fn list_user_loans(&self, user: &AuthenticatedUser) -> Result<Vec<Loan>> {
        self.read("list_user_loans", |tx| {
            let borrower = require_borrower(tx, user)?;
            tx.loans_by_borrower(borrower.borrower_id)
        })
    }

    /// single validated status entry point
    pub(crate) fn apply_status(
        &self,
        tx: &mut dyn Transaction,
        events: &mut Vec<Event>,
        loan: &mut Loan,
        next: LoanStatus,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let old_status = loan.status;
        // funding is the only way out of pending
        if old_status == LoanStatus::Pending
            && next != LoanStatus::Pending
            && tx.investments_for_loan(loan.loan_id)?.is_empty()
        {
            return Err(LendingError::invalid_state(old_status, "funded by an investment"));
        }

        if !loan.transition(next, now)? {
            return Ok(());
        }
        tx.save_loan(loan)?;

        tracing::info!(loan_id = loan.loan_id, from = %old_status, to = %next, "loan status changed");
        events.push(Event::LoanStatusChanged {
            loan_id: loan.loan_id,
            old_status,
            new_status: next,
            timestamp: now,
        });

        if next == LoanStatus::Payed {
            self.disburse(tx, events, loan, now)?;
        }
        Ok(())
    }

    /// terms must validate and yield a representable profit split
    fn check_terms(&self, terms: &LoanTerms) -> Result<()> {
        terms.validate()?;
        self.calculator
            .calculate(terms.amount, terms.interest_rate, terms.duration)
            .map(|_| ())
    }
}

pub(crate) fn require_loan(tx: &dyn Transaction, loan_id: LoanId) -> Result<Loan> {
    tx.get_loan(loan_id)?
        .ok_or_else(|| LendingError::not_found("loan", loan_id))
}
