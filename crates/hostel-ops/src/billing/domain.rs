use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::domain::BookingId;
use crate::occupancy::domain::{HostelId, ResidentId};

/// Identifier wrapper for payment records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Advance,
    Monthly,
    SecurityDeposit,
    Maintenance,
    LateFee,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Still collectible: counts toward settlement and late-fee sweeps.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::Processing)
    }
}

/// Calendar month tag for recurring obligations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingPeriod {
    pub year: i32,
    pub month: u32,
}

impl BillingPeriod {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// A single billing obligation or recorded payment. Monthly obligations carry
/// a period tag and due date; one-off records (advance, deposit) do not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub booking: BookingId,
    pub hostel: HostelId,
    pub resident: ResidentId,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub base_rent: i64,
    pub utility_charge: i64,
    pub maintenance_charge: i64,
    /// Always `base_rent + utility_charge + maintenance_charge` for monthly
    /// obligations; the paid amount for one-off records.
    pub amount: i64,
    pub period: Option<BillingPeriod>,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub late_fee: i64,
    /// Idempotency guard: a sweep never stacks a second fee on a record that
    /// already carries one.
    pub late_fee_applied: bool,
    pub is_overdue: bool,
    pub overdue_since: Option<NaiveDate>,
}

impl Payment {
    pub fn recompute_amount(&mut self) {
        self.amount = self.base_rent + self.utility_charge + self.maintenance_charge;
    }
}
