pub mod amortization;
pub mod profit;
pub mod schedule;

use chrono::{DateTime, Utc};

use crate::state::NewPayment;
use crate::types::{BorrowerId, LoanId};

pub use amortization::{AmortizationSchedule, ScheduledInstallment};
pub use profit::{calculate_profits, price_installment, ProfitBreakdown, ProfitCalculator};
pub use schedule::{InstallmentPlanner, PlannedInstallment};

impl PlannedInstallment {
    /// payment row for `loan_id`, both statuses start as pending
    pub fn into_new_payment(self, loan_id: LoanId, borrower_id: BorrowerId) -> NewPayment {
        NewPayment {
            loan_id,
            borrower_id,
            installment_number: self.installment_number,
            amount: self.amount,
            due_date: self.due_date,
            bank_profit: self.bank_profit,
            investor_profit: self.investor_profit,
        }
    }
}

/// first due date of a plan, if any
pub fn first_due_date(plan: &[PlannedInstallment]) -> Option<DateTime<Utc>> {
    plan.iter().map(|p| p.due_date).min()
}
