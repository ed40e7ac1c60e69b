use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::occupancy::domain::{BedId, HostelId, OwnerId, ResidentId, RoomId};

/// Identifier wrapper for bookings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Approved,
    Rejected,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// A booking in one of these states counts against the one-active-booking
    /// rule for its (resident, facility) pair.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Approved | Self::Confirmed)
    }

    /// The only legal transitions: `pending → approved → confirmed →
    /// completed`, with `pending → rejected` and `{pending, approved} →
    /// cancelled` as terminal side branches.
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Approved)
                | (Self::Pending, Self::Rejected)
                | (Self::Pending, Self::Cancelled)
                | (Self::Approved, Self::Confirmed)
                | (Self::Approved, Self::Cancelled)
                | (Self::Confirmed, Self::Completed)
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("illegal booking transition {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    Unpaid,
    Paid,
    Failed,
}

/// Advance payment tracked inline on the booking; the amount is fixed from
/// facility pricing at approval time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancePayment {
    pub amount: i64,
    pub status: AdvanceStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

impl AdvancePayment {
    pub fn unpaid() -> Self {
        Self {
            amount: 0,
            status: AdvanceStatus::Unpaid,
            paid_at: None,
        }
    }
}

/// Resident-supplied request details embedded in the booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRequest {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[serde(default)]
    pub room_preference: Option<String>,
    #[serde(default)]
    pub floor_preference: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub resident: ResidentId,
    pub hostel: HostelId,
    pub owner: OwnerId,
    pub request: StayRequest,
    pub status: BookingStatus,
    pub advance: AdvancePayment,
    pub allocated_room: Option<RoomId>,
    pub allocated_bed: Option<BedId>,
    pub actual_check_in: Option<DateTime<Utc>>,
    pub actual_check_out: Option<DateTime<Utc>>,
    /// Raised when automatic allocation found no capacity; the booking stays
    /// `confirmed` but unallocated until an owner retries.
    pub needs_manual_allocation: bool,
    pub rejection_reason: Option<String>,
    /// Store-level precondition for transitions; stale updates are rejected.
    pub version: u64,
}

impl Booking {
    pub fn transition_to(&mut self, next: BookingStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn status_view(&self) -> BookingStatusView {
        BookingStatusView {
            booking_id: self.id.clone(),
            status: self.status.label(),
            advance_amount: self.advance.amount,
            advance_status: self.advance.status,
            needs_manual_allocation: self.needs_manual_allocation,
            allocated_room: self.allocated_room.as_ref().map(|room| room.0.clone()),
            allocated_bed: self.allocated_bed.as_ref().map(|bed| bed.0.clone()),
        }
    }
}

/// Sanitized representation of a booking's exposed state.
#[derive(Debug, Clone, Serialize)]
pub struct BookingStatusView {
    pub booking_id: BookingId,
    pub status: &'static str,
    pub advance_amount: i64,
    pub advance_status: AdvanceStatus,
    pub needs_manual_allocation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated_bed: Option<String>,
}
