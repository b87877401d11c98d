use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::errors::{LendingError, Result};
use crate::identity::UserProfile;
use crate::state::{
    Borrower, Contract, Investment, Investor, Loan, NewContract, NewInvestment, NewLoan, NewPayment,
    Payment, RiskProfile,
};
use crate::store::{LendingStore, Transaction};
use crate::types::{
    BorrowerId, ContractStatus, InvestorId, LoanId, LoanStatus, PaymentId, PaymentStatus, UserId,
};

/// per-table id sequences, starting at 1
#[derive(Debug, Clone, Default)]
struct Sequences {
    borrower: u64,
    investor: u64,
    loan: u64,
    investment: u64,
    contract: u64,
    payment: u64,
}

fn next(counter: &mut u64) -> u64 {
    *counter += 1;
    *counter
}

#[derive(Debug, Clone, Default)]
struct Tables {
    sequences: Sequences,
    users: HashMap<UserId, UserProfile>,
    borrowers: BTreeMap<BorrowerId, Borrower>,
    investors: BTreeMap<InvestorId, Investor>,
    risk_profiles: BTreeMap<BorrowerId, RiskProfile>,
    loans: BTreeMap<LoanId, Loan>,
    investments: BTreeMap<u64, Investment>,
    contracts: BTreeMap<u64, Contract>,
    payments: BTreeMap<PaymentId, Payment>,
}

/// in-memory store.
///
/// a transaction holds the table lock for its whole lifetime and works on a
/// copy, so transactions are serialized and commits are all-or-nothing.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_next_commit: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// make the next commit fail with a storage error (fault injection for tests)
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }
}

impl LendingStore for MemoryStore {
    type Tx<'a> = MemoryTransaction<'a>;

    fn begin(&self) -> Result<MemoryTransaction<'_>> {
        let guard = self.tables.lock();
        let working = guard.clone();
        Ok(MemoryTransaction {
            guard,
            working,
            fail_commit: &self.fail_next_commit,
        })
    }
}

/// open transaction on a [`MemoryStore`]
pub struct MemoryTransaction<'a> {
    guard: MutexGuard<'a, Tables>,
    working: Tables,
    fail_commit: &'a AtomicBool,
}

impl MemoryTransaction<'_> {
    fn loan_mut(&mut self, loan_id: LoanId) -> Result<&mut Loan> {
        self.working
            .loans
            .get_mut(&loan_id)
            .ok_or_else(|| LendingError::not_found("loan", loan_id))
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn upsert_user(&mut self, profile: UserProfile) -> Result<()> {
        self.working.users.insert(profile.user_id, profile);
        Ok(())
    }

    fn get_user(&self, user_id: UserId) -> Result<Option<UserProfile>> {
        Ok(self.working.users.get(&user_id).cloned())
    }

    fn insert_borrower(&mut self, user_id: UserId) -> Result<Borrower> {
        if self.borrower_by_user(user_id)?.is_some() {
            return Err(LendingError::invalid_state("borrower registered", "no borrower role"));
        }
        let borrower = Borrower {
            borrower_id: next(&mut self.working.sequences.borrower),
            user_id,
        };
        self.working.borrowers.insert(borrower.borrower_id, borrower.clone());
        Ok(borrower)
    }

    fn get_borrower(&self, borrower_id: BorrowerId) -> Result<Option<Borrower>> {
        Ok(self.working.borrowers.get(&borrower_id).cloned())
    }

    fn borrower_by_user(&self, user_id: UserId) -> Result<Option<Borrower>> {
        Ok(self
            .working
            .borrowers
            .values()
            .find(|b| b.user_id == user_id)
            .cloned())
    }

    fn insert_investor(&mut self, user_id: UserId) -> Result<Investor> {
        if self.investor_by_user(user_id)?.is_some() {
            return Err(LendingError::invalid_state("investor registered", "no investor role"));
        }
        let investor = Investor {
            investor_id: next(&mut self.working.sequences.investor),
            user_id,
        };
        self.working.investors.insert(investor.investor_id, investor.clone());
        Ok(investor)
    }

    fn get_investor(&self, investor_id: InvestorId) -> Result<Option<Investor>> {
        Ok(self.working.investors.get(&investor_id).cloned())
    }

    fn investor_by_user(&self, user_id: UserId) -> Result<Option<Investor>> {
        Ok(self
            .working
            .investors
            .values()
            .find(|i| i.user_id == user_id)
            .cloned())
    }

    fn upsert_risk_profile(&mut self, borrower_id: BorrowerId, risk_score: u32) -> Result<RiskProfile> {
        if !self.working.borrowers.contains_key(&borrower_id) {
            return Err(LendingError::not_found("borrower", borrower_id));
        }
        let profile = RiskProfile {
            borrower_id,
            risk_score,
        };
        self.working.risk_profiles.insert(borrower_id, profile.clone());
        Ok(profile)
    }

    fn risk_profile(&self, borrower_id: BorrowerId) -> Result<Option<RiskProfile>> {
        Ok(self.working.risk_profiles.get(&borrower_id).cloned())
    }

    fn insert_loan(&mut self, loan: NewLoan) -> Result<Loan> {
        if !self.working.borrowers.contains_key(&loan.borrower_id) {
            return Err(LendingError::not_found("borrower", loan.borrower_id));
        }
        let record = Loan {
            loan_id: next(&mut self.working.sequences.loan),
            borrower_id: loan.borrower_id,
            amount: loan.terms.amount,
            interest_rate: loan.terms.interest_rate,
            duration: loan.terms.duration,
            status: LoanStatus::Pending,
            goal: loan.terms.goal,
            bank_profit: None,
            investor_profit: None,
            created_at: loan.created_at,
            last_status_change: loan.created_at,
        };
        self.working.loans.insert(record.loan_id, record.clone());
        Ok(record)
    }

    fn get_loan(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.working.loans.get(&loan_id).cloned())
    }

    fn save_loan(&mut self, loan: &Loan) -> Result<()> {
        let row = self.loan_mut(loan.loan_id)?;
        *row = loan.clone();
        Ok(())
    }

    fn compare_and_set_loan_status(
        &mut self,
        loan_id: LoanId,
        expected: LoanStatus,
        next: LoanStatus,
        timestamp: DateTime<Utc>,
    ) -> Result<bool> {
        let row = self.loan_mut(loan_id)?;
        if row.status != expected {
            return Ok(false);
        }
        row.status = next;
        row.last_status_change = timestamp;
        Ok(true)
    }

    fn delete_loan(&mut self, loan_id: LoanId) -> Result<Loan> {
        let loan = self
            .working
            .loans
            .remove(&loan_id)
            .ok_or_else(|| LendingError::not_found("loan", loan_id))?;

        self.working.investments.retain(|_, i| i.loan_id != loan_id);
        self.working.contracts.retain(|_, c| c.loan_id != loan_id);
        self.working.payments.retain(|_, p| p.loan_id != loan_id);
        Ok(loan)
    }

    fn loans(&self) -> Result<Vec<Loan>> {
        Ok(self.working.loans.values().cloned().collect())
    }

    fn loans_by_borrower(&self, borrower_id: BorrowerId) -> Result<Vec<Loan>> {
        Ok(self
            .working
            .loans
            .values()
            .filter(|l| l.borrower_id == borrower_id)
            .cloned()
            .collect())
    }

    fn insert_investment(&mut self, investment: NewInvestment) -> Result<Investment> {
        if !self.working.loans.contains_key(&investment.loan_id) {
            return Err(LendingError::not_found("loan", investment.loan_id));
        }
        if !self.working.investors.contains_key(&investment.investor_id) {
            return Err(LendingError::not_found("investor", investment.investor_id));
        }
        let record = Investment {
            investment_id: next(&mut self.working.sequences.investment),
            loan_id: investment.loan_id,
            investor_id: investment.investor_id,
            amount: investment.amount,
            created_at: investment.created_at,
        };
        self.working.investments.insert(record.investment_id, record.clone());
        Ok(record)
    }

    fn investments(&self) -> Result<Vec<Investment>> {
        Ok(self.working.investments.values().cloned().collect())
    }

    fn investments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Investment>> {
        Ok(self
            .working
            .investments
            .values()
            .filter(|i| i.loan_id == loan_id)
            .cloned()
            .collect())
    }

    fn investments_by_investor(&self, investor_id: InvestorId) -> Result<Vec<Investment>> {
        Ok(self
            .working
            .investments
            .values()
            .filter(|i| i.investor_id == investor_id)
            .cloned()
            .collect())
    }

    fn insert_contract(&mut self, contract: NewContract) -> Result<Contract> {
        if self.contract_for_loan(contract.loan_id)?.is_some() {
            return Err(LendingError::DuplicateContract {
                loan_id: contract.loan_id,
            });
        }
        let record = Contract {
            contract_id: next(&mut self.working.sequences.contract),
            loan_id: contract.loan_id,
            investor_id: contract.investor_id,
            borrower_id: contract.borrower_id,
            status: ContractStatus::Active,
            date_signed: contract.date_signed,
            investor_signature: Uuid::new_v4(),
            borrower_signature: Uuid::new_v4(),
        };
        self.working.contracts.insert(record.contract_id, record.clone());
        Ok(record)
    }

    fn contract_for_loan(&self, loan_id: LoanId) -> Result<Option<Contract>> {
        Ok(self
            .working
            .contracts
            .values()
            .find(|c| c.loan_id == loan_id)
            .cloned())
    }

    fn contracts(&self) -> Result<Vec<Contract>> {
        Ok(self.working.contracts.values().cloned().collect())
    }

    fn insert_payments(&mut self, payments: Vec<NewPayment>) -> Result<Vec<Payment>> {
        let mut inserted = Vec::with_capacity(payments.len());
        for payment in payments {
            if !self.working.loans.contains_key(&payment.loan_id) {
                return Err(LendingError::not_found("loan", payment.loan_id));
            }
            let record = Payment {
                payment_id: next(&mut self.working.sequences.payment),
                loan_id: payment.loan_id,
                borrower_id: payment.borrower_id,
                installment_number: payment.installment_number,
                amount: payment.amount,
                due_date: payment.due_date,
                status: PaymentStatus::Pending,
                status_payment_investor: PaymentStatus::Pending,
                bank_profit: payment.bank_profit,
                investor_profit: payment.investor_profit,
                last_status_change: None,
                last_investor_status_change: None,
            };
            self.working.payments.insert(record.payment_id, record.clone());
            inserted.push(record);
        }
        Ok(inserted)
    }

    fn get_payment(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        Ok(self.working.payments.get(&payment_id).cloned())
    }

    fn save_payment(&mut self, payment: &Payment) -> Result<()> {
        let row = self
            .working
            .payments
            .get_mut(&payment.payment_id)
            .ok_or_else(|| LendingError::not_found("payment", payment.payment_id))?;
        *row = payment.clone();
        Ok(())
    }

    fn payments(&self) -> Result<Vec<Payment>> {
        Ok(self.working.payments.values().cloned().collect())
    }

    fn payments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .working
            .payments
            .values()
            .filter(|p| p.loan_id == loan_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.installment_number);
        Ok(payments)
    }

    fn commit(self) -> Result<()> {
        let MemoryTransaction {
            mut guard,
            working,
            fail_commit,
        } = self;

        if fail_commit.swap(false, Ordering::SeqCst) {
            return Err(LendingError::storage("commit rejected by store"));
        }

        *guard = working;
        Ok(())
    }
}
