use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{
    BorrowerId, ContractId, InvestmentId, InvestorId, LoanId, LoanStatus, PaymentId, PaymentStatus,
};

/// all events emitted by the marketplace after a committed operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // loan events
    LoanRequested {
        loan_id: LoanId,
        borrower_id: BorrowerId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanUpdated {
        loan_id: LoanId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    LoanStatusChanged {
        loan_id: LoanId,
        old_status: LoanStatus,
        new_status: LoanStatus,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        loan_id: LoanId,
        timestamp: DateTime<Utc>,
    },
    LoanSettled {
        loan_id: LoanId,
        total_repaid: Money,
        timestamp: DateTime<Utc>,
    },

    // funding events
    InvestmentCreated {
        investment_id: InvestmentId,
        loan_id: LoanId,
        investor_id: InvestorId,
        amount: Money,
        timestamp: DateTime<Utc>,
    },
    ContractSigned {
        contract_id: ContractId,
        loan_id: LoanId,
        investor_id: InvestorId,
        borrower_id: BorrowerId,
        timestamp: DateTime<Utc>,
    },
    PaymentsScheduled {
        loan_id: LoanId,
        installments: u32,
        installment_amount: Money,
        first_due_date: DateTime<Utc>,
    },

    // installment events
    PaymentStatusChanged {
        payment_id: PaymentId,
        loan_id: LoanId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
    InvestorPayoutStatusChanged {
        payment_id: PaymentId,
        loan_id: LoanId,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn loan_id(&self) -> LoanId {
        match self {
            Event::LoanRequested { loan_id, .. }
            | Event::LoanUpdated { loan_id, .. }
            | Event::LoanStatusChanged { loan_id, .. }
            | Event::LoanDeleted { loan_id, .. }
            | Event::LoanSettled { loan_id, .. }
            | Event::InvestmentCreated { loan_id, .. }
            | Event::ContractSigned { loan_id, .. }
            | Event::PaymentsScheduled { loan_id, .. }
            | Event::PaymentStatusChanged { loan_id, .. }
            | Event::InvestorPayoutStatusChanged { loan_id, .. } => *loan_id,
        }
    }
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = Event>) {
        self.events.extend(events);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains_store() {
        let mut store = EventStore::new();
        store.emit(Event::LoanDeleted { loan_id: 3, timestamp: Utc::now() });
        store.extend(vec![Event::LoanUpdated {
            loan_id: 4,
            amount: Money::from_major(10),
            timestamp: Utc::now(),
        }]);

        assert_eq!(store.events().len(), 2);
        let drained = store.take_events();
        assert_eq!(drained.iter().map(Event::loan_id).collect::<Vec<_>>(), vec![3, 4]);
        assert!(store.events().is_empty());
    }
}
