use chrono::{DateTime, Utc};

use super::{require_investor_id, Marketplace};
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::identity::AuthenticatedUser;
use crate::payments::{first_due_date, InstallmentPlanner};
use crate::state::{Contract, Loan, NewContract, Payment};
use crate::store::{LendingStore, Transaction};
use crate::types::{InvestorId, LoanId};

/// sign the single contract of a funded loan.
///
/// a second contract for the same loan fails with `DuplicateContract`.
pub fn generate_contract(
    tx: &mut dyn Transaction,
    loan: &Loan,
    investor_id: InvestorId,
    now: DateTime<Utc>,
) -> Result<Contract> {
    let contract = tx.insert_contract(NewContract {
        loan_id: loan.loan_id,
        investor_id,
        borrower_id: loan.borrower_id,
        date_signed: now,
    })?;

    tracing::info!(
        contract_id = contract.contract_id,
        loan_id = loan.loan_id,
        investor_id,
        borrower_id = loan.borrower_id,
        "contract signed"
    );
    Ok(contract)
}

/// insert `loan.duration` pending installments for the invested amount
pub fn generate_payments(
    tx: &mut dyn Transaction,
    loan: &Loan,
    invested: Money,
    now: DateTime<Utc>,
    planner: &InstallmentPlanner,
) -> Result<Vec<Payment>> {
    let plan = planner.plan(invested, loan.interest_rate, loan.duration, now)?;
    let first_due = first_due_date(&plan);

    let rows = plan
        .into_iter()
        .map(|p| p.into_new_payment(loan.loan_id, loan.borrower_id))
        .collect();
    let payments = tx.insert_payments(rows)?;

    tracing::info!(
        loan_id = loan.loan_id,
        installments = payments.len(),
        invested = %invested,
        first_due = ?first_due,
        "payments scheduled"
    );
    Ok(payments)
}

impl<S: LendingStore> Marketplace<S> {
    /// contract and installments for a loan entering repayment
    pub(crate) fn disburse(
        &self,
        tx: &mut dyn Transaction,
        events: &mut Vec<Event>,
        loan: &Loan,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let investment = tx
            .investments_for_loan(loan.loan_id)?
            .into_iter()
            .next()
            .ok_or_else(|| LendingError::not_found("investment for loan", loan.loan_id))?;
        let investor = require_investor_id(tx, investment.investor_id)?;

        self.sign_and_schedule(tx, events, loan, investor.investor_id, investment.amount, now)
    }

    pub(crate) fn sign_and_schedule(
        &self,
        tx: &mut dyn Transaction,
        events: &mut Vec<Event>,
        loan: &Loan,
        investor_id: InvestorId,
        invested: Money,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let contract = generate_contract(tx, loan, investor_id, now)?;
        events.push(Event::ContractSigned {
            contract_id: contract.contract_id,
            loan_id: loan.loan_id,
            investor_id,
            borrower_id: loan.borrower_id,
            timestamp: now,
        });

        let payments = generate_payments(tx, loan, invested, now, &self.planner)?;
        if let Some(first) = payments.first() {
            events.push(Event::PaymentsScheduled {
                loan_id: loan.loan_id,
                installments: loan.duration,
                installment_amount: first.amount,
                first_due_date: first.due_date,
            });
        }
        Ok(())
    }

    pub fn list_contracts(&self) -> Result<Vec<Contract>> {
        self.read("list_contracts", |tx| tx.contracts())
    }

    /// contracts where the caller is the borrower or the investor
    pub fn list_user_contracts(&self, user: &AuthenticatedUser) -> Result<Vec<Contract>> {
        self.read("list_user_contracts", |tx| {
            let borrower_id = tx.borrower_by_user(user.id)?.map(|b| b.borrower_id);
            let investor_id = tx.investor_by_user(user.id)?.map(|i| i.investor_id);

            Ok(tx
                .contracts()?
                .into_iter()
                .filter(|c| Some(c.borrower_id) == borrower_id || Some(c.investor_id) == investor_id)
                .collect())
        })
    }

    pub fn get_contract_for_loan(&self, loan_id: LoanId) -> Result<Contract> {
        self.read("get_contract_for_loan", |tx| {
            tx.contract_for_loan(loan_id)?
                .ok_or_else(|| LendingError::not_found("contract for loan", loan_id))
        })
    }

    /// installments of one loan in installment order
    pub fn list_loan_payments(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        self.read("list_loan_payments", |tx| {
            if tx.get_loan(loan_id)?.is_none() {
                return Err(LendingError::not_found("loan", loan_id));
            }
            tx.payments_for_loan(loan_id)
        })
    }

    /// installments owed by the caller as borrower
    pub fn list_user_payments(&self, user: &AuthenticatedUser) -> Result<Vec<Payment>> {
        self.read("list_user_payments", |tx| {
            let Some(borrower) = tx.borrower_by_user(user.id)? else {
                return Ok(Vec::new());
            };

            Ok(tx
                .payments()?
                .into_iter()
                .filter(|p| p.borrower_id == borrower.borrower_id)
                .collect())
        })
    }
}
