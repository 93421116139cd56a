//! In-memory [`Store`] implementation for tests.
//!
//! Holds the same tagged attribute maps the real table does, keyed by the
//! same `PK`/`SK` pairs, so the entity mappers and the wire format are
//! exercised end to end. Transactional methods validate every condition
//! before mutating anything, matching the all-or-nothing behavior of
//! `transact_write_items`.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;

use crate::entities::{Item, List, Product, ReservationState, ReservedDetail, User};
use crate::error::Error;

use super::{items, keys, NewList, ReserveWrite, Store, UnreserveWrite};

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(String, String), Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a raw item; the item must carry `PK` and `SK` attributes.
    pub fn insert(&self, item: Item) {
        let pk = string_attr(&item, "PK").expect("item missing PK");
        let sk = string_attr(&item, "SK").expect("item missing SK");
        self.lock().insert((pk, sk), item);
    }

    /// Raw read-back for assertions.
    pub fn get_raw(&self, pk: &str, sk: &str) -> Option<Item> {
        self.lock().get(&(pk.to_string(), sk.to_string())).cloned()
    }

    /// Raw removal, used to force conditional failures in tests.
    pub fn remove(&self, pk: &str, sk: &str) -> Option<Item> {
        self.lock().remove(&(pk.to_string(), sk.to_string()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<(String, String), Item>> {
        self.records.lock().expect("store mutex poisoned")
    }
}

fn string_attr(item: &Item, key: &str) -> Option<String> {
    item.get(key).and_then(|v| v.as_s().ok()).cloned()
}

fn number_attr(item: &Item, key: &str) -> Option<u32> {
    item.get(key)
        .and_then(|v| v.as_n().ok())
        .and_then(|raw| raw.parse().ok())
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_list(&self, list_id: &str, user_id: &str) -> Result<List, Error> {
        let records = self.lock();
        let item = records
            .get(&(keys::list_pk(list_id), keys::user_key(user_id)))
            .ok_or_else(|| Error::NotFound("No list exists with this ID.".to_string()))?;

        List::from_item(item)
    }

    async fn find_list(&self, list_id: &str) -> Result<List, Error> {
        let pk = keys::list_pk(list_id);
        let records = self.lock();
        let item = records
            .iter()
            .find(|((item_pk, item_sk), _)| *item_pk == pk && item_sk.starts_with("USER#"))
            .map(|(_, item)| item)
            .ok_or_else(|| Error::NotFound("No list exists with this ID.".to_string()))?;

        List::from_item(item)
    }

    async fn create_list(
        &self,
        list_id: &str,
        owner_id: &str,
        attributes: &NewList,
        created_at: i64,
    ) -> Result<(), Error> {
        let (owner_item, share_item) = items::list_items(list_id, owner_id, attributes, created_at);
        self.insert(owner_item);
        self.insert(share_item);
        Ok(())
    }

    async fn get_product(&self, list_id: &str, product_id: &str) -> Result<Product, Error> {
        let records = self.lock();
        let item = records
            .get(&(keys::list_pk(list_id), keys::product_sk(product_id)))
            .ok_or_else(|| Error::NotFound("No product item exists with this ID.".to_string()))?;

        Product::from_item(item)
    }

    async fn update_product_quantity(
        &self,
        list_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<u32, Error> {
        let mut records = self.lock();
        let item = records
            .get_mut(&(keys::list_pk(list_id), keys::product_sk(product_id)))
            .ok_or_else(|| Error::NotFound("Product did not exist.".to_string()))?;

        item.insert(
            "quantity".to_string(),
            AttributeValue::N(quantity.to_string()),
        );

        Ok(quantity)
    }

    async fn get_reserved_detail(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<ReservedDetail, Error> {
        let records = self.lock();
        let item = records
            .get(&(keys::list_pk(list_id), keys::reserved_sk(product_id, user_id)))
            .ok_or_else(|| Error::NotFound("Product is not reserved by user.".to_string()))?;

        ReservedDetail::from_item(item)
    }

    async fn assert_not_reserved(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<(), Error> {
        let records = self.lock();
        if records.contains_key(&(keys::list_pk(list_id), keys::reserved_sk(product_id, user_id)))
        {
            return Err(Error::AlreadyReserved(
                "Product already reserved by user.".to_string(),
            ));
        }

        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<String>, Error> {
        let records = self.lock();
        for ((pk, _), item) in records.iter() {
            if pk.starts_with("USER") && string_attr(item, "email").as_deref() == Some(email) {
                return Ok(string_attr(item, "userId"));
            }
        }

        Ok(None)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, Error> {
        let records = self.lock();
        let item = records
            .get(&(keys::user_key(user_id), keys::user_key(user_id)))
            .ok_or_else(|| Error::NotFound("No user exists with this ID.".to_string()))?;

        User::from_item(item)
    }

    async fn reserve_transaction(&self, write: &ReserveWrite) -> Result<(), Error> {
        let mut records = self.lock();

        let product_key = (
            keys::list_pk(&write.list_id),
            keys::product_sk(&write.product_id),
        );
        let detail_key = (
            keys::list_pk(&write.list_id),
            keys::reserved_sk(&write.product_id, &write.user_id),
        );

        // Condition checks first; nothing mutates unless all pass.
        let observed = records
            .get(&product_key)
            .and_then(|item| number_attr(item, "reserved"));
        if observed != Some(write.prior_reserved) {
            return Err(Error::Transaction(
                "Unexpected error when reserving product.".to_string(),
            ));
        }
        if records.contains_key(&detail_key) {
            return Err(Error::Transaction(
                "Unexpected error when reserving product.".to_string(),
            ));
        }

        if let Some(product) = records.get_mut(&product_key) {
            product.insert(
                "reserved".to_string(),
                AttributeValue::N(write.new_reserved.to_string()),
            );
        }
        records.insert(detail_key, items::reserved_detail_item(write));

        let reservation_item = items::reservation_item(write, ReservationState::Reserved);
        let reservation_key = keys::reservation_key(&write.resv_id);
        records.insert((reservation_key.clone(), reservation_key), reservation_item);

        Ok(())
    }

    async fn unreserve_transaction(&self, write: &UnreserveWrite) -> Result<(), Error> {
        let mut records = self.lock();

        let product_key = (
            keys::list_pk(&write.list_id),
            keys::product_sk(&write.product_id),
        );
        let detail_key = (
            keys::list_pk(&write.list_id),
            keys::reserved_sk(&write.product_id, &write.user_id),
        );

        // The delete condition: the detail record must still be present.
        if !records.contains_key(&detail_key) {
            return Err(Error::Transaction(
                "Unexpected error when unreserving product.".to_string(),
            ));
        }

        if let Some(product) = records.get_mut(&product_key) {
            product.insert(
                "reserved".to_string(),
                AttributeValue::N(write.new_reserved.to_string()),
            );
        }
        records.remove(&detail_key);

        let reservation_key = keys::reservation_key(&write.resv_id);
        if let Some(reservation) = records.get_mut(&(reservation_key.clone(), reservation_key)) {
            reservation.insert(
                "state".to_string(),
                AttributeValue::S(ReservationState::Cancelled.as_str().to_string()),
            );
        }

        Ok(())
    }
}
