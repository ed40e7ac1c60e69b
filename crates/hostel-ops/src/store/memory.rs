//! In-memory store backing tests and the demo service. Each record family
//! lives behind its own mutex; `claim_bed_if_free` gets its conditional
//! semantics from holding the bed lock across the check-and-write.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Utc};

use crate::billing::domain::{Payment, PaymentId, PaymentStatus, PaymentType};
use crate::billing::store::PaymentStore;
use crate::booking::domain::{Booking, BookingId, BookingStatus};
use crate::booking::store::BookingStore;
use crate::checkout::domain::{Checkout, CheckoutId};
use crate::checkout::store::CheckoutStore;
use crate::occupancy::domain::{
    Bed, BedFilter, BedId, Floor, FloorId, Hostel, HostelId, ResidentId, Room, RoomId,
};
use crate::occupancy::store::OccupancyStore;
use crate::store::StoreError;
use crate::transfer::domain::{RoomTransfer, TransferId};
use crate::transfer::store::TransferStore;

#[derive(Default, Clone)]
pub struct MemoryStore {
    hostels: Arc<Mutex<HashMap<HostelId, Hostel>>>,
    floors: Arc<Mutex<HashMap<FloorId, Floor>>>,
    rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
    beds: Arc<Mutex<HashMap<BedId, Bed>>>,
    bookings: Arc<Mutex<HashMap<BookingId, Booking>>>,
    payments: Arc<Mutex<HashMap<PaymentId, Payment>>>,
    checkouts: Arc<Mutex<HashMap<CheckoutId, Checkout>>>,
    transfers: Arc<Mutex<HashMap<TransferId, RoomTransfer>>>,
}

fn insert_new<K: std::hash::Hash + Eq + Clone, V: Clone>(
    map: &Mutex<HashMap<K, V>>,
    key: K,
    value: V,
) -> Result<(), StoreError> {
    let mut guard = map.lock().expect("store mutex poisoned");
    if guard.contains_key(&key) {
        return Err(StoreError::Conflict);
    }
    guard.insert(key, value);
    Ok(())
}

fn update_existing<K: std::hash::Hash + Eq, V>(
    map: &Mutex<HashMap<K, V>>,
    key: &K,
    value: V,
) -> Result<(), StoreError>
where
    K: Clone,
{
    let mut guard = map.lock().expect("store mutex poisoned");
    if !guard.contains_key(key) {
        return Err(StoreError::NotFound);
    }
    guard.insert(key.clone(), value);
    Ok(())
}

impl OccupancyStore for MemoryStore {
    fn insert_hostel(&self, hostel: Hostel) -> Result<(), StoreError> {
        insert_new(&self.hostels, hostel.id.clone(), hostel)
    }

    fn hostel(&self, id: &HostelId) -> Result<Option<Hostel>, StoreError> {
        Ok(self.hostels.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn update_hostel(&self, hostel: Hostel) -> Result<(), StoreError> {
        update_existing(&self.hostels, &hostel.id.clone(), hostel)
    }

    fn insert_floor(&self, floor: Floor) -> Result<(), StoreError> {
        insert_new(&self.floors, floor.id.clone(), floor)
    }

    fn floor(&self, id: &FloorId) -> Result<Option<Floor>, StoreError> {
        Ok(self.floors.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn update_floor(&self, floor: Floor) -> Result<(), StoreError> {
        update_existing(&self.floors, &floor.id.clone(), floor)
    }

    fn insert_room(&self, room: Room) -> Result<(), StoreError> {
        insert_new(&self.rooms, room.id.clone(), room)
    }

    fn room(&self, id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn update_room(&self, room: Room) -> Result<(), StoreError> {
        update_existing(&self.rooms, &room.id.clone(), room)
    }

    fn insert_bed(&self, bed: Bed) -> Result<(), StoreError> {
        insert_new(&self.beds, bed.id.clone(), bed)
    }

    fn bed(&self, id: &BedId) -> Result<Option<Bed>, StoreError> {
        Ok(self.beds.lock().expect("store mutex poisoned").get(id).cloned())
    }

    fn update_bed(&self, bed: Bed) -> Result<(), StoreError> {
        update_existing(&self.beds, &bed.id.clone(), bed)
    }

    fn beds_in_hostel(&self, hostel: &HostelId) -> Result<Vec<Bed>, StoreError> {
        let guard = self.beds.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|bed| &bed.hostel == hostel)
            .cloned()
            .collect())
    }

    fn free_beds_ordered(
        &self,
        hostel: &HostelId,
        filter: &BedFilter,
    ) -> Result<Vec<Bed>, StoreError> {
        let guard = self.beds.lock().expect("store mutex poisoned");
        let mut free: Vec<Bed> = guard
            .values()
            .filter(|bed| {
                &bed.hostel == hostel && bed.active && !bed.is_occupied && filter.matches(bed)
            })
            .cloned()
            .collect();
        free.sort_by_key(Bed::sort_key);
        Ok(free)
    }

    fn claim_bed_if_free(
        &self,
        bed: &BedId,
        occupant: &ResidentId,
        booking: &BookingId,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut guard = self.beds.lock().expect("store mutex poisoned");
        let record = guard.get_mut(bed).ok_or(StoreError::NotFound)?;
        if !record.active || record.is_occupied {
            return Ok(false);
        }
        record.is_occupied = true;
        record.occupant = Some(occupant.clone());
        record.booking = Some(booking.clone());
        record.occupied_from = Some(now);
        record.occupied_till = None;
        Ok(true)
    }

    fn release_bed(&self, bed: &BedId, now: DateTime<Utc>) -> Result<Bed, StoreError> {
        let mut guard = self.beds.lock().expect("store mutex poisoned");
        let record = guard.get_mut(bed).ok_or(StoreError::NotFound)?;
        record.is_occupied = false;
        record.occupant = None;
        record.booking = None;
        record.occupied_till = Some(now);
        Ok(record.clone())
    }
}

impl BookingStore for MemoryStore {
    fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        insert_new(&self.bookings, booking.id.clone(), booking.clone())?;
        Ok(booking)
    }

    fn booking(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self
            .bookings
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_booking(
        &self,
        mut booking: Booking,
        expected_version: u64,
    ) -> Result<Booking, StoreError> {
        let mut guard = self.bookings.lock().expect("store mutex poisoned");
        let stored = guard.get(&booking.id).ok_or(StoreError::NotFound)?;
        if stored.version != expected_version {
            return Err(StoreError::StaleVersion);
        }
        booking.version = expected_version + 1;
        guard.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    fn active_for(
        &self,
        resident: &ResidentId,
        hostel: &HostelId,
    ) -> Result<Option<Booking>, StoreError> {
        let guard = self.bookings.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .find(|booking| {
                &booking.resident == resident
                    && &booking.hostel == hostel
                    && booking.status.is_active()
            })
            .cloned())
    }

    fn awaiting_manual_allocation(&self, hostel: &HostelId) -> Result<Vec<Booking>, StoreError> {
        let guard = self.bookings.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|booking| &booking.hostel == hostel && booking.needs_manual_allocation)
            .cloned()
            .collect())
    }

    fn confirmed_bookings(&self) -> Result<Vec<Booking>, StoreError> {
        let guard = self.bookings.lock().expect("store mutex poisoned");
        Ok(guard
            .values()
            .filter(|booking| booking.status == BookingStatus::Confirmed)
            .cloned()
            .collect())
    }
}

impl PaymentStore for MemoryStore {
    fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        insert_new(&self.payments, payment.id.clone(), payment.clone())?;
        Ok(payment)
    }

    fn update_payment(&self, payment: Payment) -> Result<(), StoreError> {
        update_existing(&self.payments, &payment.id.clone(), payment)
    }

    fn payment(&self, id: &PaymentId) -> Result<Option<Payment>, StoreError> {
        Ok(self
            .payments
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn delete_payment(&self, id: &PaymentId) -> Result<(), StoreError> {
        let mut guard = self.payments.lock().expect("store mutex poisoned");
        guard.remove(id).ok_or(StoreError::NotFound)?;
        Ok(())
    }

    fn monthly_for_booking(&self, booking: &BookingId) -> Result<Vec<Payment>, StoreError> {
        let guard = self.payments.lock().expect("store mutex poisoned");
        let mut monthly: Vec<Payment> = guard
            .values()
            .filter(|payment| {
                &payment.booking == booking && payment.payment_type == PaymentType::Monthly
            })
            .cloned()
            .collect();
        monthly.sort_by_key(|payment| payment.due_date);
        Ok(monthly)
    }

    fn overdue_candidates(&self, today: NaiveDate) -> Result<Vec<Payment>, StoreError> {
        let guard = self.payments.lock().expect("store mutex poisoned");
        let mut overdue: Vec<Payment> = guard
            .values()
            .filter(|payment| {
                payment.payment_type == PaymentType::Monthly
                    && payment.status == PaymentStatus::Pending
                    && !payment.late_fee_applied
                    && payment.due_date.map_or(false, |due| due < today)
            })
            .cloned()
            .collect();
        overdue.sort_by_key(|payment| payment.due_date);
        Ok(overdue)
    }
}

impl CheckoutStore for MemoryStore {
    fn insert_checkout(&self, checkout: Checkout) -> Result<Checkout, StoreError> {
        insert_new(&self.checkouts, checkout.id.clone(), checkout.clone())?;
        Ok(checkout)
    }

    fn checkout(&self, id: &CheckoutId) -> Result<Option<Checkout>, StoreError> {
        Ok(self
            .checkouts
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_checkout(&self, checkout: Checkout) -> Result<(), StoreError> {
        update_existing(&self.checkouts, &checkout.id.clone(), checkout)
    }
}

impl TransferStore for MemoryStore {
    fn insert_transfer(&self, transfer: RoomTransfer) -> Result<RoomTransfer, StoreError> {
        insert_new(&self.transfers, transfer.id.clone(), transfer.clone())?;
        Ok(transfer)
    }

    fn transfer(&self, id: &TransferId) -> Result<Option<RoomTransfer>, StoreError> {
        Ok(self
            .transfers
            .lock()
            .expect("store mutex poisoned")
            .get(id)
            .cloned())
    }

    fn update_transfer(&self, transfer: RoomTransfer) -> Result<(), StoreError> {
        update_existing(&self.transfers, &transfer.id.clone(), transfer)
    }
}
