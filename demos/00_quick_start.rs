/// quick start - profit split and installment preview for a single loan
use p2p_lending_rs::chrono::Utc;
use p2p_lending_rs::{AmortizationSchedule, Money, ProfitCalculator, Rate};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 10,000 over 12 months at 2% per month
    let principal = Money::from_major(10_000);
    let rate = Rate::from_percentage(2);

    let breakdown = ProfitCalculator::standard().calculate(principal, rate, 12)?;
    println!("monthly payment: {}", breakdown.monthly_payment.to_cents());
    println!("total interest:  {}", breakdown.total_interest.to_cents());
    println!("bank profit:     {}", breakdown.bank_profit.to_cents());
    println!("investor profit: {}", breakdown.investor_profit.to_cents());

    let schedule = AmortizationSchedule::generate(principal, rate, 12, Utc::now(), 30)?;
    for row in &schedule.installments {
        println!(
            "  #{:>2} {}  interest {:>8}  principal {:>8}  balance {:>9}",
            row.installment_number,
            row.due_date.format("%Y-%m-%d"),
            row.interest_portion.to_cents(),
            row.principal_portion.to_cents(),
            row.ending_balance.to_cents(),
        );
    }

    // a zero rate has no Price-table installment
    match ProfitCalculator::standard().calculate(principal, Rate::ZERO, 12) {
        Ok(_) => println!("error: zero rate should be rejected"),
        Err(e) => println!("zero rate rejected: {}", e),
    }

    Ok(())
}
