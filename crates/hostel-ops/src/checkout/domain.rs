use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::domain::BookingId;
use crate::occupancy::domain::{BedId, HostelId, ResidentId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckoutId(pub String);

impl fmt::Display for CheckoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStatus {
    Pending,
    Approved,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageItem {
    pub description: String,
    pub cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageAssessment {
    pub damages: Vec<DamageItem>,
    pub total_damage_cost: i64,
}

impl DamageAssessment {
    pub fn from_items(damages: Vec<DamageItem>) -> Self {
        let total_damage_cost = damages.iter().map(|item| item.cost).sum();
        Self {
            damages,
            total_damage_cost,
        }
    }
}

/// Final financial reconciliation computed when the checkout completes.
///
/// `net_amount = total_due - security_refund`; a negative value means a refund
/// is owed to the resident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalBill {
    pub rent_due: i64,
    pub utilities_due: i64,
    pub damage_cost: i64,
    pub late_fees: i64,
    pub other_charges: i64,
    pub total_due: i64,
    pub security_refund: i64,
    pub net_amount: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkout {
    pub id: CheckoutId,
    pub booking: BookingId,
    pub bed: BedId,
    pub hostel: HostelId,
    pub resident: ResidentId,
    pub status: CheckoutStatus,
    pub requested_for: NaiveDate,
    pub damage: DamageAssessment,
    pub final_bill: Option<FinalBill>,
    pub completed_at: Option<DateTime<Utc>>,
}
