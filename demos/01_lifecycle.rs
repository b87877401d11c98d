/// lifecycle - loan request, funding, repayment and settlement on the deferred workflow
use p2p_lending_rs::chrono::{Duration, TimeZone, Utc};
use p2p_lending_rs::{
    InvestmentRequest, LendingConfig, LoanGoal, LoanStatus, LoanTerms, Marketplace, MemoryStore,
    Money, PaymentStatus, Rate, SafeTimeProvider, TimeSource, UserProfile, Uuid,
};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();
    let market = Marketplace::new(MemoryStore::new(), LendingConfig::standard(), time.clone())?;

    // 1. onboarding
    println!("1. onboarding");
    let ana = UserProfile::new(Uuid::new_v4(), "Ana Souza", "ana@example.com", "123.456.789-00");
    let caio = UserProfile::new(Uuid::new_v4(), "Caio Reis", "caio@example.com", "987.654.321-00");
    let (borrower, investor) = (ana.identity(), caio.identity());
    market.register_user(ana)?;
    market.register_user(caio)?;
    let borrower_role = market.register_borrower(&borrower)?;
    market.register_investor(&investor)?;
    market.assign_risk_score(borrower_role.borrower_id, 720)?;

    // 2. request
    println!("\n2. loan request");
    let loan = market.create_loan(
        &borrower,
        LoanTerms::new(Money::from_major(6_000), Rate::from_percentage(2), 6, LoanGoal::Business),
    )?;
    println!("  loan {} requested: {} ({})", loan.loan_id, loan.amount, loan.status);
    println!("{}", market.get_loan(loan.loan_id)?.to_json_pretty()?);

    // 3. funding
    println!("\n3. funding");
    controller.advance(Duration::days(2));
    market.create_investment(&investor, InvestmentRequest::new(loan.loan_id, Money::from_major(6_000)))?;
    let funded = market.get_loan(loan.loan_id)?.loan;
    println!(
        "  status: {}  bank profit: {}  investor profit: {}",
        funded.status,
        funded.bank_profit.unwrap_or(Money::ZERO).to_cents(),
        funded.investor_profit.unwrap_or(Money::ZERO).to_cents(),
    );

    // 4. approval and disbursement
    println!("\n4. approval and disbursement");
    market.update_loan_status(loan.loan_id, LoanStatus::Approved)?;
    market.update_loan_status(loan.loan_id, LoanStatus::Payed)?;
    let contract = market.get_contract_for_loan(loan.loan_id)?;
    println!("  contract {} signed {}", contract.contract_id, contract.date_signed.format("%Y-%m-%d"));

    // 5. repayment
    println!("\n5. repayment");
    for payment in market.list_loan_payments(loan.loan_id)? {
        controller.advance(Duration::days(30));
        market.update_payment_status(payment.payment_id, PaymentStatus::Payed)?;
        market.update_payment_investor_status(payment.payment_id, PaymentStatus::Payed)?;
        println!(
            "  #{} due {} amount {} paid on {}",
            payment.installment_number,
            payment.due_date.format("%Y-%m-%d"),
            payment.amount,
            time.now().format("%Y-%m-%d"),
        );
    }

    let settled = market.get_loan(loan.loan_id)?.loan;
    println!("\n  final status: {}", settled.status);
    assert_eq!(settled.status, LoanStatus::Done);

    // 6. events
    println!("\n6. events");
    for event in market.take_events() {
        println!("  {:?}", event);
    }

    // a finished loan cannot move back
    match market.update_loan_status(loan.loan_id, LoanStatus::Pending) {
        Ok(_) => println!("error: backward transition accepted"),
        Err(e) => println!("\nbackward transition rejected: {}", e),
    }

    Ok(())
}
