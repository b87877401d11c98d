/// immediate contracts - contract and amortized installments generated at investment time
use p2p_lending_rs::chrono::{TimeZone, Utc};
use p2p_lending_rs::{
    AuthenticatedUser, InstallmentFormula, InvestmentRequest, LendingConfig, LoanGoal, LoanTerms,
    Marketplace, MemoryStore, Money, Rate, SafeTimeProvider, TimeSource, Uuid,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let config = LendingConfig::immediate_contracts()
        .with_formula(InstallmentFormula::Amortized)
        .with_full_funding();
    println!("config:\n{}\n", serde_json::to_string_pretty(&config)?);

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
    ));
    let market = Marketplace::new(MemoryStore::new(), config, time)?;

    let borrower = AuthenticatedUser::new(Uuid::new_v4());
    let investor = AuthenticatedUser::new(Uuid::new_v4());
    market.register_borrower(&borrower)?;
    market.register_investor(&investor)?;

    let loan = market.create_loan(
        &borrower,
        LoanTerms::new(Money::from_major(2_400), Rate::from_percentage(3), 4, LoanGoal::Travel),
    )?;

    // partial funding is refused with full funding on
    if let Err(e) = market.create_investment(&investor, InvestmentRequest::new(loan.loan_id, Money::from_major(1_000))) {
        println!("partial investment rejected: {}", e.public_message());
    }

    market.create_investment(&investor, InvestmentRequest::new(loan.loan_id, loan.amount))?;
    println!("loan status after funding: {}", market.get_loan(loan.loan_id)?.loan.status);

    for payment in market.list_loan_payments(loan.loan_id)? {
        println!(
            "  #{} due {}  amount {}  bank {}  investor {}",
            payment.installment_number,
            payment.due_date.format("%Y-%m-%d"),
            payment.amount,
            payment.bank_profit,
            payment.investor_profit,
        );
    }

    let contracts = market.list_user_contracts(&investor)?;
    println!("investor contracts: {}", contracts.len());

    Ok(())
}
