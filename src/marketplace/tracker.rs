use chrono::{DateTime, Utc};

use super::loans::require_loan;
use super::Marketplace;
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::state::Payment;
use crate::store::{LendingStore, Transaction};
use crate::types::{LoanId, LoanStatus, PaymentId, PaymentStatus};
use crate::views::RepaymentSummary;

impl<S: LendingStore> Marketplace<S> {
    /// overwrite the borrower-side status of an installment.
    ///
    /// once every installment of a `payed` loan is paid the loan moves to `done`.
    pub fn update_payment_status(&self, payment_id: PaymentId, status: PaymentStatus) -> Result<Payment> {
        let now = self.now();

        self.in_transaction("update_payment_status", |tx, events| {
            let mut payment = require_payment(tx, payment_id)?;
            let old_status = std::mem::replace(&mut payment.status, status.clone());
            if old_status == status {
                return Ok(payment);
            }

            payment.last_status_change = Some(now);
            tx.save_payment(&payment)?;

            tracing::info!(
                payment_id,
                loan_id = payment.loan_id,
                from = %old_status,
                to = %status,
                "payment status changed"
            );
            events.push(Event::PaymentStatusChanged {
                payment_id,
                loan_id: payment.loan_id,
                old_status,
                new_status: status,
                timestamp: now,
            });

            if payment.status == PaymentStatus::Payed {
                self.settle_if_repaid(tx, events, &payment, now)?;
            }
            Ok(payment)
        })
    }

    /// overwrite the investor payout status, independent of the borrower side
    pub fn update_payment_investor_status(&self, payment_id: PaymentId, status: PaymentStatus) -> Result<Payment> {
        let now = self.now();

        self.in_transaction("update_payment_investor_status", |tx, events| {
            let mut payment = require_payment(tx, payment_id)?;
            let old_status = std::mem::replace(&mut payment.status_payment_investor, status.clone());
            if old_status == status {
                return Ok(payment);
            }

            payment.last_investor_status_change = Some(now);
            tx.save_payment(&payment)?;

            tracing::info!(
                payment_id,
                loan_id = payment.loan_id,
                from = %old_status,
                to = %status,
                "investor payout status changed"
            );
            events.push(Event::InvestorPayoutStatusChanged {
                payment_id,
                loan_id: payment.loan_id,
                old_status,
                new_status: status,
                timestamp: now,
            });
            Ok(payment)
        })
    }

    /// installments paid by the borrower and not yet paid out to the investor
    pub fn list_investor_pending_payments(&self) -> Result<Vec<Payment>> {
        self.read("list_investor_pending_payments", |tx| {
            Ok(tx
                .payments()?
                .into_iter()
                .filter(Payment::awaiting_payout)
                .collect())
        })
    }

    pub fn repayment_summary(&self, loan_id: LoanId) -> Result<RepaymentSummary> {
        self.read("repayment_summary", |tx| {
            require_loan(tx, loan_id)?;
            Ok(RepaymentSummary::from_payments(&tx.payments_for_loan(loan_id)?))
        })
    }

    fn settle_if_repaid(
        &self,
        tx: &mut dyn Transaction,
        events: &mut Vec<Event>,
        payment: &Payment,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut loan = require_loan(tx, payment.loan_id)?;
        if loan.status != LoanStatus::Payed {
            return Ok(());
        }

        let summary = RepaymentSummary::from_payments(&tx.payments_for_loan(loan.loan_id)?);
        if !summary.is_settled() {
            return Ok(());
        }

        self.apply_status(tx, events, &mut loan, LoanStatus::Done, now)?;

        tracing::info!(loan_id = loan.loan_id, total_repaid = %summary.amount_paid, "loan settled");
        events.push(Event::LoanSettled {
            loan_id: loan.loan_id,
            total_repaid: summary.amount_paid,
            timestamp: now,
        });
        Ok(())
    }
}

fn require_payment(tx: &dyn Transaction, payment_id: PaymentId) -> Result<Payment> {
    tx.get_payment(payment_id)?
        .ok_or_else(|| LendingError::not_found("payment", payment_id))
}
