use serde::{Deserialize, Serialize};

use super::loans::require_loan;
use super::{require_investor, Marketplace};
use crate::config::ContractTiming;
use crate::decimal::Money;
use crate::errors::{LendingError, Result};
use crate::events::Event;
use crate::identity::AuthenticatedUser;
use crate::state::{Investment, NewInvestment};
use crate::store::LendingStore;
use crate::types::{LoanId, LoanStatus};
use crate::views::{InvestmentListing, UserInvestment};

/// funding request for a pending loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentRequest {
    pub loan_id: LoanId,
    pub amount: Money,
}

impl InvestmentRequest {
    pub fn new(loan_id: LoanId, amount: Money) -> Self {
        Self { loan_id, amount }
    }
}

impl<S: LendingStore> Marketplace<S> {
    /// fund a pending loan as the caller's investor role.
    ///
    /// the loan leaves `pending` through a conditional update, so only one
    /// investment can ever be accepted per loan.
    pub fn create_investment(&self, user: &AuthenticatedUser, request: InvestmentRequest) -> Result<Investment> {
        let now = self.now();
        let InvestmentRequest { loan_id, amount } = request;

        self.in_transaction("create_investment", |tx, events| {
            if !amount.is_positive() {
                return Err(LendingError::validation(format!(
                    "investment amount must be positive, got {}",
                    amount
                )));
            }

            let investor = require_investor(tx, user)?;
            let loan = require_loan(tx, loan_id)?;
            if loan.status != LoanStatus::Pending {
                return Err(LendingError::invalid_state(loan.status, LoanStatus::Pending));
            }

            if self.config.funding.require_full_funding && amount != loan.amount {
                return Err(LendingError::validation(format!(
                    "investment must cover the requested {}, got {}",
                    loan.amount, amount
                )));
            }

            let profits = self.calculator.calculate(amount, loan.interest_rate, loan.duration)?;

            let next = match self.config.funding.contract_timing {
                ContractTiming::OnPayedTransition => LoanStatus::Solicited,
                ContractTiming::OnInvestment => LoanStatus::Done,
            };
            if !tx.compare_and_set_loan_status(loan_id, LoanStatus::Pending, next, now)? {
                return Err(LendingError::invalid_state("funded", LoanStatus::Pending));
            }

            let investment = tx.insert_investment(NewInvestment {
                loan_id,
                investor_id: investor.investor_id,
                amount,
                created_at: now,
            })?;

            let mut funded = require_loan(tx, loan_id)?;
            funded.record_profits(&profits);
            tx.save_loan(&funded)?;

            tracing::info!(
                investment_id = investment.investment_id,
                loan_id,
                investor_id = investor.investor_id,
                amount = %amount,
                status = %next,
                "loan funded"
            );
            events.push(Event::InvestmentCreated {
                investment_id: investment.investment_id,
                loan_id,
                investor_id: investor.investor_id,
                amount,
                timestamp: now,
            });
            events.push(Event::LoanStatusChanged {
                loan_id,
                old_status: LoanStatus::Pending,
                new_status: next,
                timestamp: now,
            });

            if next == LoanStatus::Done {
                self.sign_and_schedule(tx, events, &funded, investor.investor_id, amount, now)?;
            }

            Ok(investment)
        })
    }

    /// every investment with its loan, borrower and investor
    pub fn list_investments(&self) -> Result<Vec<InvestmentListing>> {
        self.read("list_investments", |tx| {
            tx.investments()?
                .into_iter()
                .map(|investment| {
                    let loan = require_loan(tx, investment.loan_id)?;
                    InvestmentListing::load(tx, investment, loan)
                })
                .collect()
        })
    }

    /// the caller's investments joined with their loans
    pub fn list_user_investments(&self, user: &AuthenticatedUser) -> Result<Vec<UserInvestment>> {
        self.read("list_user_investments", |tx| {
            let investor = require_investor(tx, user)?;

            tx.investments_by_investor(investor.investor_id)?
                .into_iter()
                .map(|investment| {
                    let loan = require_loan(tx, investment.loan_id)?;
                    Ok(UserInvestment { investment, loan })
                })
                .collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LendingConfig;
    use crate::decimal::Rate;
    use crate::errors::ErrorKind;
    use crate::identity::UserProfile;
    use crate::state::LoanTerms;
    use crate::store::MemoryStore;
    use crate::types::LoanGoal;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use uuid::Uuid;

    struct Fixture {
        market: Marketplace<MemoryStore>,
        borrower: AuthenticatedUser,
        investor: AuthenticatedUser,
    }

    fn fixture(config: LendingConfig) -> Fixture {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap(),
        ));
        let market = Marketplace::new(MemoryStore::new(), config, time).unwrap();

        let borrower = UserProfile::new(Uuid::new_v4(), "Bruno Lima", "bruno@example.com", "111.222.333-44");
        let investor = UserProfile::new(Uuid::new_v4(), "Carla Dias", "carla@example.com", "555.666.777-88");
        let (b, i) = (borrower.identity(), investor.identity());
        market.register_user(borrower).unwrap();
        market.register_user(investor).unwrap();
        market.register_borrower(&b).unwrap();
        market.register_investor(&i).unwrap();

        Fixture {
            market,
            borrower: b,
            investor: i,
        }
    }

    fn request_loan(f: &Fixture) -> LoanId {
        f.market
            .create_loan(
                &f.borrower,
                LoanTerms::new(Money::from_major(3_000), Rate::from_percentage(3), 6, LoanGoal::Business),
            )
            .unwrap()
            .loan_id
    }

    #[test]
    fn test_funding_flips_status_once() {
        let f = fixture(LendingConfig::standard());
        let loan_id = request_loan(&f);

        let investment = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(3_000)))
            .unwrap();
        assert_eq!(investment.loan_id, loan_id);

        let loan = f.market.get_loan(loan_id).unwrap().loan;
        assert_eq!(loan.status, LoanStatus::Solicited);
        assert!(loan.bank_profit.unwrap().is_positive());

        // second investment is refused
        let err = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(3_000)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(f.market.list_investments().unwrap().len(), 1);

        // deferred timing: nothing generated yet
        assert!(f.market.list_contracts().unwrap().is_empty());
        assert!(f.market.list_loan_payments(loan_id).unwrap().is_empty());
    }

    #[test]
    fn test_precondition_order() {
        let f = fixture(LendingConfig::standard());
        let loan_id = request_loan(&f);

        let err = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::ZERO))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);

        // the borrower holds no investor role
        let err = f
            .market
            .create_investment(&f.borrower, InvestmentRequest::new(loan_id, Money::from_major(10)))
            .unwrap_err();
        assert_eq!(err, LendingError::not_found("investor", f.borrower.id));

        let err = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(404, Money::from_major(10)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_full_funding_requirement() {
        let f = fixture(LendingConfig::standard().with_full_funding());
        let loan_id = request_loan(&f);

        let err = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(1_000)))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailure);
        assert_eq!(f.market.get_loan(loan_id).unwrap().loan.status, LoanStatus::Pending);
    }

    #[test]
    fn test_uncomputable_investment_is_refused() {
        let f = fixture(LendingConfig::immediate_contracts());
        let loan_id = f
            .market
            .create_loan(
                &f.borrower,
                LoanTerms::new(Money::from_major(1_000), Rate::from_percentage(1000), 20, LoanGoal::Shopping),
            )
            .unwrap()
            .loan_id;

        let err = f
            .market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(100_000_000)))
            .unwrap_err();
        assert!(matches!(err, LendingError::NumericDomain { .. }));

        assert_eq!(f.market.get_loan(loan_id).unwrap().loan.status, LoanStatus::Pending);
        assert!(f.market.list_investments().unwrap().is_empty());
        assert!(f.market.list_loan_payments(loan_id).unwrap().is_empty());
    }

    #[test]
    fn test_immediate_contract_timing() {
        let f = fixture(LendingConfig::immediate_contracts());
        let loan_id = request_loan(&f);

        f.market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(3_000)))
            .unwrap();

        assert_eq!(f.market.get_loan(loan_id).unwrap().loan.status, LoanStatus::Done);
        assert_eq!(f.market.get_contract_for_loan(loan_id).unwrap().loan_id, loan_id);
        assert_eq!(f.market.list_loan_payments(loan_id).unwrap().len(), 6);
    }

    #[test]
    fn test_user_investment_projections() {
        let f = fixture(LendingConfig::standard());
        let loan_id = request_loan(&f);
        f.market
            .create_investment(&f.investor, InvestmentRequest::new(loan_id, Money::from_major(2_500)))
            .unwrap();

        let mine = f.market.list_user_investments(&f.investor).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].loan.loan_id, loan_id);
        assert_eq!(mine[0].investment.amount, Money::from_major(2_500));

        let all = f.market.list_investments().unwrap();
        assert_eq!(all[0].investor.as_ref().map(|u| u.name.as_str()), Some("Carla Dias"));
        assert_eq!(
            all[0].loan.borrower.as_ref().map(|u| u.name.as_str()),
            Some("Bruno Lima")
        );

        assert_eq!(
            f.market.list_user_investments(&f.borrower).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
