pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod identity;
pub mod marketplace;
pub mod payments;
pub mod state;
pub mod store;
pub mod types;
pub mod views;

// re-export key types
pub use config::{
    ContractTiming, FundingConfig, InstallmentFormula, LendingConfig, ProfitSplitConfig,
    ScheduleConfig,
};
pub use decimal::{Money, Rate};
pub use errors::{ErrorKind, LendingError, Result};
pub use events::{Event, EventStore};
pub use identity::{AuthenticatedUser, UserProfile};
pub use marketplace::{generate_contract, generate_payments, InvestmentRequest, LoanUpdate, Marketplace};
pub use payments::{
    calculate_profits, AmortizationSchedule, InstallmentPlanner, PlannedInstallment,
    ProfitBreakdown, ProfitCalculator, ScheduledInstallment,
};
pub use state::{
    Borrower, Contract, Investment, Investor, Loan, LoanTerms, Payment, RiskProfile,
};
pub use store::{LendingStore, MemoryStore, Transaction};
pub use types::{
    BorrowerId, ContractId, ContractStatus, InvestmentId, InvestorId, LoanGoal, LoanId,
    LoanStatus, PaymentId, PaymentStatus, UserId,
};
pub use views::{InvestmentListing, LoanListing, RepaymentSummary, UserInvestment};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
