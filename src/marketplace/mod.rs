//! marketplace operations.
//!
//! each public operation runs inside a single store transaction. events are
//! recorded only after the transaction commits; a failed operation leaves the
//! store untouched and records nothing.

pub mod contracts;
pub mod investments;
pub mod loans;
pub mod tracker;

use chrono::{DateTime, Utc};
use hourglass_rs::{SafeTimeProvider, TimeSource};
use parking_lot::Mutex;

use crate::config::LendingConfig;
use crate::errors::{LendingError, Result};
use crate::events::{Event, EventStore};
use crate::identity::{AuthenticatedUser, UserProfile};
use crate::payments::{InstallmentPlanner, ProfitCalculator};
use crate::state::{Borrower, Investor, RiskProfile};
use crate::store::{LendingStore, Transaction};
use crate::types::{BorrowerId, InvestorId};

pub use contracts::{generate_contract, generate_payments};
pub use investments::InvestmentRequest;
pub use loans::LoanUpdate;

/// lending marketplace over a transactional store
pub struct Marketplace<S: LendingStore> {
    store: S,
    config: LendingConfig,
    calculator: ProfitCalculator,
    planner: InstallmentPlanner,
    time: SafeTimeProvider,
    events: Mutex<EventStore>,
}

impl<S: LendingStore> Marketplace<S> {
    pub fn new(store: S, config: LendingConfig, time: SafeTimeProvider) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            calculator: ProfitCalculator::new(config.profit_split.bank_share),
            planner: InstallmentPlanner::from_config(&config),
            store,
            config,
            time,
            events: Mutex::new(EventStore::new()),
        })
    }

    /// marketplace on wall-clock time
    pub fn with_system_time(store: S, config: LendingConfig) -> Result<Self> {
        Self::new(store, config, SafeTimeProvider::new(TimeSource::System))
    }

    pub fn config(&self) -> &LendingConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub fn calculator(&self) -> &ProfitCalculator {
        &self.calculator
    }

    /// drain the events recorded so far
    pub fn take_events(&self) -> Vec<Event> {
        self.events.lock().take_events()
    }

    fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    /// run `op` in a transaction, commit, then record its events
    fn in_transaction<T>(
        &self,
        operation: &'static str,
        op: impl FnOnce(&mut dyn Transaction, &mut Vec<Event>) -> Result<T>,
    ) -> Result<T> {
        let mut tx = self.store.begin().map_err(|err| log_failure(operation, err))?;
        let mut pending = Vec::new();

        // on error `tx` is dropped here, rolling back
        let value = op(&mut tx, &mut pending).map_err(|err| log_failure(operation, err))?;
        tx.commit().map_err(|err| log_failure(operation, err))?;

        self.events.lock().extend(pending);
        Ok(value)
    }

    /// run a read-only query; the transaction is never committed
    fn read<T>(&self, operation: &'static str, query: impl FnOnce(&dyn Transaction) -> Result<T>) -> Result<T> {
        let tx = self.store.begin().map_err(|err| log_failure(operation, err))?;
        query(&tx).map_err(|err| log_failure(operation, err))
    }

    /// mirror a user's identity into the store
    pub fn register_user(&self, profile: UserProfile) -> Result<()> {
        self.in_transaction("register_user", |tx, _| {
            tx.upsert_user(profile.clone())?;
            tracing::info!(user_id = %profile.user_id, "user registered");
            Ok(())
        })
    }

    /// attach the borrower role; a user holds it at most once
    pub fn register_borrower(&self, user: &AuthenticatedUser) -> Result<Borrower> {
        self.in_transaction("register_borrower", |tx, _| {
            let borrower = tx.insert_borrower(user.id)?;
            tracing::info!(user_id = %user.id, borrower_id = borrower.borrower_id, "borrower registered");
            Ok(borrower)
        })
    }

    /// attach the investor role; a user holds it at most once
    pub fn register_investor(&self, user: &AuthenticatedUser) -> Result<Investor> {
        self.in_transaction("register_investor", |tx, _| {
            let investor = tx.insert_investor(user.id)?;
            tracing::info!(user_id = %user.id, investor_id = investor.investor_id, "investor registered");
            Ok(investor)
        })
    }

    pub fn assign_risk_score(&self, borrower_id: BorrowerId, risk_score: u32) -> Result<RiskProfile> {
        self.in_transaction("assign_risk_score", |tx, _| {
            let profile = tx.upsert_risk_profile(borrower_id, risk_score)?;
            tracing::info!(borrower_id, risk_score, "risk score assigned");
            Ok(profile)
        })
    }

    pub fn borrower_for(&self, user: &AuthenticatedUser) -> Result<Borrower> {
        self.read("borrower_for", |tx| require_borrower(tx, user))
    }

    pub fn investor_for(&self, user: &AuthenticatedUser) -> Result<Investor> {
        self.read("investor_for", |tx| require_investor(tx, user))
    }
}

fn log_failure(operation: &'static str, err: LendingError) -> LendingError {
    if err.is_internal() {
        tracing::error!(operation, error = %err, "operation failed, transaction rolled back");
    } else {
        tracing::warn!(operation, kind = ?err.kind(), error = %err, "operation rejected");
    }
    err
}

fn require_borrower(tx: &dyn Transaction, user: &AuthenticatedUser) -> Result<Borrower> {
    tx.borrower_by_user(user.id)?
        .ok_or_else(|| LendingError::not_found("borrower", user.id))
}

fn require_investor(tx: &dyn Transaction, user: &AuthenticatedUser) -> Result<Investor> {
    tx.investor_by_user(user.id)?
        .ok_or_else(|| LendingError::not_found("investor", user.id))
}

fn require_investor_id(tx: &dyn Transaction, investor_id: InvestorId) -> Result<Investor> {
    tx.get_investor(investor_id)?
        .ok_or_else(|| LendingError::not_found("investor", investor_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn marketplace() -> Marketplace<MemoryStore> {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
        ));
        Marketplace::new(MemoryStore::new(), LendingConfig::standard(), time).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = LendingConfig::standard();
        config.schedule.installment_interval_days = 0;
        assert!(Marketplace::with_system_time(MemoryStore::new(), config).is_err());
    }

    #[test]
    fn test_roles_are_unique_per_user() {
        let market = marketplace();
        let user = AuthenticatedUser::new(Uuid::new_v4());

        let borrower = market.register_borrower(&user).unwrap();
        assert_eq!(market.borrower_for(&user).unwrap(), borrower);

        let err = market.register_borrower(&user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        // the same user may also invest
        let investor = market.register_investor(&user).unwrap();
        assert_eq!(market.investor_for(&user).unwrap(), investor);
    }

    #[test]
    fn test_missing_roles_are_not_found() {
        let market = marketplace();
        let stranger = AuthenticatedUser::new(Uuid::new_v4());

        assert_eq!(market.borrower_for(&stranger).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(market.investor_for(&stranger).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(market.assign_risk_score(42, 700).unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_risk_score_upsert() {
        let market = marketplace();
        let user = AuthenticatedUser::new(Uuid::new_v4());
        let borrower = market.register_borrower(&user).unwrap();

        market.assign_risk_score(borrower.borrower_id, 500).unwrap();
        let profile = market.assign_risk_score(borrower.borrower_id, 810).unwrap();
        assert_eq!(profile.risk_score, 810);
    }

    #[test]
    fn test_failed_commit_records_nothing() {
        let market = marketplace();
        let user = AuthenticatedUser::new(Uuid::new_v4());

        market.store().fail_next_commit();
        let err = market.register_borrower(&user).unwrap_err();
        assert!(err.is_internal());
        assert_eq!(err.public_message(), "internal failure");
        assert!(market.borrower_for(&user).is_err());
        assert!(market.take_events().is_empty());
    }
}
