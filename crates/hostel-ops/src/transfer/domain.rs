use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::booking::domain::BookingId;
use crate::occupancy::domain::{BedId, HostelId, ResidentId, RoomId};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransferId(pub String);

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    Pending,
    Approved,
    Rejected,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomTransfer {
    pub id: TransferId,
    pub booking: BookingId,
    pub hostel: HostelId,
    pub resident: ResidentId,
    pub current_room: RoomId,
    pub current_bed: BedId,
    pub requested_room: RoomId,
    pub requested_bed: BedId,
    pub status: TransferStatus,
    pub reason: Option<String>,
    pub actual_move_date: Option<DateTime<Utc>>,
}
