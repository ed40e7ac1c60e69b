use super::domain::{Checkout, CheckoutId};
use crate::store::StoreError;

/// Storage abstraction for checkout records.
pub trait CheckoutStore: Send + Sync {
    fn insert_checkout(&self, checkout: Checkout) -> Result<Checkout, StoreError>;
    fn checkout(&self, id: &CheckoutId) -> Result<Option<Checkout>, StoreError>;
    fn update_checkout(&self, checkout: Checkout) -> Result<(), StoreError>;
}
