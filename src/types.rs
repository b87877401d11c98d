use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::errors::LendingError;

/// identity issued by the external auth service
pub type UserId = Uuid;

pub type BorrowerId = u64;
pub type InvestorId = u64;
pub type LoanId = u64;
pub type InvestmentId = u64;
pub type ContractId = u64;
pub type PaymentId = u64;

/// loan status.
///
/// declaration order is the lifecycle order; transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    /// requested by the borrower, open for funding
    Pending,
    /// an investor committed funds
    Solicited,
    /// approved by the platform
    Approved,
    /// funds transferred to the borrower, repayment schedule running
    Payed,
    /// fully repaid
    Done,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 5] = [
        LoanStatus::Pending,
        LoanStatus::Solicited,
        LoanStatus::Approved,
        LoanStatus::Payed,
        LoanStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Solicited => "solicited",
            LoanStatus::Approved => "approved",
            LoanStatus::Payed => "payed",
            LoanStatus::Done => "done",
        }
    }

    /// forward moves (including skips) are allowed, backward moves are not
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        next >= *self
    }

    /// a loan that has received its investment
    pub fn is_funded(&self) -> bool {
        *self != LoanStatus::Pending
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LendingError::InvalidStatus {
                value: s.to_string(),
            })
    }
}

/// purpose declared by the borrower
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanGoal {
    #[serde(rename = "viagem")]
    Travel,
    #[serde(rename = "compras")]
    Shopping,
    #[serde(rename = "negocios")]
    Business,
}

impl LoanGoal {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanGoal::Travel => "viagem",
            LoanGoal::Shopping => "compras",
            LoanGoal::Business => "negocios",
        }
    }
}

impl fmt::Display for LoanGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanGoal {
    type Err = LendingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viagem" => Ok(LoanGoal::Travel),
            "compras" => Ok(LoanGoal::Shopping),
            "negocios" => Ok(LoanGoal::Business),
            other => Err(LendingError::validation(format!("unknown loan goal: {}", other))),
        }
    }
}

/// installment status, used for both the borrower side and the investor payout side.
///
/// the set is open: unknown values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Pending,
    Payed,
    Late,
    Canceled,
    Other(String),
}

impl PaymentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Payed => "payed",
            PaymentStatus::Late => "late",
            PaymentStatus::Canceled => "canceled",
            PaymentStatus::Other(value) => value,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => PaymentStatus::Pending,
            "payed" => PaymentStatus::Payed,
            "late" => PaymentStatus::Late,
            "canceled" => PaymentStatus::Canceled,
            other => PaymentStatus::Other(other.to_string()),
        })
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

/// contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Active,
    Completed,
    Canceled,
}
