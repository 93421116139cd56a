//! Store access layer.
//!
//! [`Store`] exposes one narrow operation per underlying table call; the
//! DynamoDB implementation lives in [`dynamo`] and an in-memory one in
//! [`memory`] so workflows can run against either. Key and item construction
//! is shared below so both backends write byte-identical records.

use async_trait::async_trait;

use crate::entities::{Item, List, Product, ReservationState, ReservedDetail, User};
use crate::error::Error;

pub mod dynamo;
pub mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// Composite-key construction. Every record type shares one table, keyed by
/// these prefixes.
pub mod keys {
    pub fn list_pk(list_id: &str) -> String {
        format!("LIST#{list_id}")
    }

    pub fn user_key(user_id: &str) -> String {
        format!("USER#{user_id}")
    }

    pub fn share_sk(user_id: &str) -> String {
        format!("SHARE#{user_id}")
    }

    pub fn product_sk(product_id: &str) -> String {
        format!("PRODUCT#{product_id}")
    }

    pub fn reserved_sk(product_id: &str, user_id: &str) -> String {
        format!("RESERVED#{product_id}#{user_id}")
    }

    pub fn reservation_key(resv_id: &str) -> String {
        format!("RESERVATION#{resv_id}")
    }
}

/// Attributes for a new list, as supplied by the client.
#[derive(Debug, Clone)]
pub struct NewList {
    pub title: String,
    pub occasion: String,
    pub description: String,
}

/// Payload for the atomic reserve write. `prior_reserved` is the count
/// observed during the capacity check; the product update is conditioned on
/// it so racing reservations cannot both commit past capacity.
#[derive(Debug, Clone)]
pub struct ReserveWrite {
    pub list_id: String,
    pub list_title: String,
    pub product_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub resv_id: String,
    pub prior_reserved: u32,
    pub new_reserved: u32,
    pub quantity: u32,
}

/// Payload for the atomic unreserve write.
#[derive(Debug, Clone)]
pub struct UnreserveWrite {
    pub list_id: String,
    pub product_id: String,
    pub user_id: String,
    pub resv_id: String,
    pub new_reserved: u32,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Owner-keyed list lookup.
    async fn get_list(&self, list_id: &str, user_id: &str) -> Result<List, Error>;

    /// List lookup by id alone, via the owner record.
    async fn find_list(&self, list_id: &str) -> Result<List, Error>;

    /// Write the owner record and the owner's share record.
    async fn create_list(
        &self,
        list_id: &str,
        owner_id: &str,
        attributes: &NewList,
        created_at: i64,
    ) -> Result<(), Error>;

    async fn get_product(&self, list_id: &str, product_id: &str) -> Result<Product, Error>;

    /// Conditional update of the requested quantity; returns the stored value.
    async fn update_product_quantity(
        &self,
        list_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<u32, Error>;

    async fn get_reserved_detail(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<ReservedDetail, Error>;

    /// Fails with `AlreadyReserved` when a reservation-detail exists.
    async fn assert_not_reserved(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<(), Error>;

    /// Email-index lookup; absence is `None`, not an error.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<String>, Error>;

    async fn get_user(&self, user_id: &str) -> Result<User, Error>;

    /// Atomic triple write: product reserved count, reservation-detail,
    /// reservation record. All or nothing.
    async fn reserve_transaction(&self, write: &ReserveWrite) -> Result<(), Error>;

    /// Atomic rollback of a reservation. All or nothing.
    async fn unreserve_transaction(&self, write: &UnreserveWrite) -> Result<(), Error>;
}

pub(crate) mod items {
    use aws_sdk_dynamodb::types::AttributeValue;

    use super::{keys, Item, NewList, ReservationState, ReserveWrite};

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn n(value: impl ToString) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    /// Owner record and the owner's share record for a new list. The share
    /// record starts as a copy of the owner record under a `SHARE#` sort key.
    pub fn list_items(
        list_id: &str,
        owner_id: &str,
        attributes: &NewList,
        created_at: i64,
    ) -> (Item, Item) {
        let owner = Item::from([
            ("PK".to_string(), s(&keys::list_pk(list_id))),
            ("SK".to_string(), s(&keys::user_key(owner_id))),
            ("listId".to_string(), s(list_id)),
            ("listOwner".to_string(), s(owner_id)),
            ("userId".to_string(), s(owner_id)),
            ("title".to_string(), s(&attributes.title)),
            ("occasion".to_string(), s(&attributes.occasion)),
            ("description".to_string(), s(&attributes.description)),
            ("createdAt".to_string(), n(created_at)),
        ]);

        let mut share = owner.clone();
        share.insert("SK".to_string(), s(&keys::share_sk(owner_id)));

        (owner, share)
    }

    pub fn reserved_detail_item(write: &ReserveWrite) -> Item {
        Item::from([
            ("PK".to_string(), s(&keys::list_pk(&write.list_id))),
            (
                "SK".to_string(),
                s(&keys::reserved_sk(&write.product_id, &write.user_id)),
            ),
            ("productId".to_string(), s(&write.product_id)),
            ("userId".to_string(), s(&write.user_id)),
            ("quantity".to_string(), n(write.quantity)),
            ("resvId".to_string(), s(&write.resv_id)),
        ])
    }

    pub fn reservation_item(write: &ReserveWrite, state: ReservationState) -> Item {
        let key = keys::reservation_key(&write.resv_id);
        let mut item = Item::from([
            ("PK".to_string(), s(&key)),
            ("SK".to_string(), s(&key)),
            ("resvId".to_string(), s(&write.resv_id)),
            ("listId".to_string(), s(&write.list_id)),
            ("listTitle".to_string(), s(&write.list_title)),
            ("productId".to_string(), s(&write.product_id)),
            ("userId".to_string(), s(&write.user_id)),
            ("quantity".to_string(), n(write.quantity)),
            ("state".to_string(), s(state.as_str())),
        ]);

        if let Some(name) = &write.user_name {
            item.insert("name".to_string(), s(name));
        }

        item
    }
}
