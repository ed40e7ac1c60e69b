use super::domain::{RoomTransfer, TransferId};
use crate::store::StoreError;

/// Storage abstraction for room transfer requests.
pub trait TransferStore: Send + Sync {
    fn insert_transfer(&self, transfer: RoomTransfer) -> Result<RoomTransfer, StoreError>;
    fn transfer(&self, id: &TransferId) -> Result<Option<RoomTransfer>, StoreError>;
    fn update_transfer(&self, transfer: RoomTransfer) -> Result<(), StoreError>;
}
