//! persistence collaborator.
//!
//! every marketplace operation runs inside one [`Transaction`]; dropping a
//! transaction without calling [`Transaction::commit`] discards its writes.

pub mod memory;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::identity::UserProfile;
use crate::state::{
    Borrower, Contract, Investment, Investor, Loan, NewContract, NewInvestment, NewLoan, NewPayment,
    Payment, RiskProfile,
};
use crate::types::{BorrowerId, InvestorId, LoanId, LoanStatus, PaymentId, UserId};

pub use memory::{MemoryStore, MemoryTransaction};

/// a store able to open transactions
pub trait LendingStore {
    type Tx<'a>: Transaction
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>>;
}

/// unit of work over the lending tables
pub trait Transaction {
    // users and roles
    fn upsert_user(&mut self, profile: UserProfile) -> Result<()>;
    fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>>;
    fn insert_borrower(&mut self, user_id: UserId) -> Result<Borrower>;
    fn get_borrower(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>>;
    fn borrower_by_user(&self, user_id: UserId) -> Result<Option<Borrower>>;
    fn insert_investor(&mut self, user_id: UserId) -> Result<Investor>;
    fn get_investor(&self, investor_id: InvestorId) -> Result<Option<Investor>>;
    fn investor_by_user(&self, user_id: UserId) -> Result<Option<Investor>>;
    fn upsert_risk_profile(&mut self, borrower_id: BorrowerId, risk_score: u32) -> Result<RiskProfile>;
    fn risk_profile(&self, borrower_id: BorrowerId) -> Result<Option<RiskProfile>>;

    // loans
    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan>;
    fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>>;
    /// overwrite an existing loan row
    fn save_loan(&mut self, loan: &Loan) -> Result<()>;
    /// set the status only if it currently equals `expected`; returns whether it did
    fn compare_and_set_loan_status(
        &mut self,
        loan_id: LoanId,
        expected: LoanStatus,
        next: LoanStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<bool>;
    /// remove the loan with its investments, contract and payments
    fn delete_loan(&mut self, loan_id: LoanId) -> Result<Loan>;
    fn loans(&self) -> Result<Vec<Loan>>;
    fn loans_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>>;

    // investments
    fn insert_investment(&mut self, investment: NewInvestment) -> Result<Investment>;
    fn investments(&self) -> Result<Vec<Investment>>;
    fn investments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Investment>>;
    fn investments_by_investor(&self, investor_id: InvestorId) -> Result<Vec<Investment>>;

    // contracts
    /// at most one contract per loan
    fn insert_contract(&mut self, contract: NewContract) -> Result<Contract>;
    fn contract_for_loan(&self, loan_id: LoanId) -> Result<Option<Contract>>;
    fn contracts(&self) -> Result<Vec<Contract>>;

    // payments
    fn insert_payments(&mut self, payments: Vec<NewPayment>) -> Result<Vec<Payment>>;
    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>>;
    fn save_payment(&mut self, payment: &Payment) -> Result<()>;
    fn payments(&self) -> Result<Vec<Payment>>;
    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>>;

    fn commit(self) -> Result<()>
    where
        Self: Sized;
}
