//! DynamoDB-backed [`Store`] implementation.
//!
//! Each trait method is one SDK call. Multi-record updates go through
//! `transact_write_items`; the store's conditional expressions carry all the
//! concurrency control, there is no local locking or retry.

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{
    AttributeValue, Delete, Put, ReturnValue, TransactWriteItem, Update,
};
use aws_sdk_dynamodb::Client;
use tracing::{error, info};

use crate::config::Config;
use crate::entities::{Item, List, Product, ReservationState, ReservedDetail, User};
use crate::error::Error;

use super::{items, keys, NewList, ReserveWrite, Store, UnreserveWrite};

#[derive(Debug, Clone)]
pub struct DynamoStore {
    client: Client,
    table_name: String,
    index_name: String,
}

impl DynamoStore {
    pub fn new(client: Client, config: &Config) -> Self {
        DynamoStore {
            client,
            table_name: config.table_name.clone(),
            index_name: config.index_name.clone(),
        }
    }

    async fn get_item(&self, pk: String, sk: String) -> Result<Option<Item>, Error> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .send()
            .await
            .map_err(|err| {
                error!("Get item request failed: {err:?}");
                Error::Transaction("Unexpected error when getting item from table.".to_string())
            })?;

        Ok(output.item)
    }

    async fn put_item(&self, item: Item, failure_message: &str) -> Result<(), Error> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| {
                error!("{failure_message} {err:?}");
                Error::Transaction(failure_message.to_string())
            })?;

        Ok(())
    }
}

#[async_trait]
impl Store for DynamoStore {
    async fn get_list(&self, list_id: &str, user_id: &str) -> Result<List, Error> {
        let item = self
            .get_item(keys::list_pk(list_id), keys::user_key(user_id))
            .await?
            .ok_or_else(|| {
                info!("No items for the list {} were found.", list_id);
                Error::NotFound("No list exists with this ID.".to_string())
            })?;

        List::from_item(&item)
    }

    async fn find_list(&self, list_id: &str) -> Result<List, Error> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :owner)")
            .expression_attribute_values(":pk", AttributeValue::S(keys::list_pk(list_id)))
            .expression_attribute_values(":owner", AttributeValue::S("USER#".to_string()))
            .send()
            .await
            .map_err(|err| {
                error!("List query failed: {err:?}");
                Error::Transaction("Unexpected error when getting item from table.".to_string())
            })?;

        let items = output.items.unwrap_or_default();
        let item = items.first().ok_or_else(|| {
            info!("No items for the list {} were found.", list_id);
            Error::NotFound("No list exists with this ID.".to_string())
        })?;

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

        info!("Put owned item for lists table: {:?}", owner_item);
        self.put_item(owner_item, "List could not be created.").await?;

        info!("Put shared item for lists table: {:?}", share_item);
        self.put_item(share_item, "List shared item for owner could not be created.")
            .await
    }

    async fn get_product(&self, list_id: &str, product_id: &str) -> Result<Product, Error> {
        info!("Getting product item {} for list {}.", product_id, list_id);

        let item = self
            .get_item(keys::list_pk(list_id), keys::product_sk(product_id))
            .await?
            .ok_or_else(|| {
                info!(
                    "No product was found for list {} and product id {}.",
                    list_id, product_id
                );
                Error::NotFound("No product item exists with this ID.".to_string())
            })?;

        Product::from_item(&item)
    }

    async fn update_product_quantity(
        &self,
        list_id: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<u32, Error> {
        info!(
            "Updating quantity of product item {} on list {} to {}",
            product_id, list_id, quantity
        );

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(keys::list_pk(list_id)))
            .key("SK", AttributeValue::S(keys::product_sk(product_id)))
            .update_expression("set quantity = :q")
            .expression_attribute_values(":q", AttributeValue::N(quantity.to_string()))
            .condition_expression("attribute_exists(PK)")
            .return_values(ReturnValue::UpdatedNew)
            .send()
            .await;

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                error!("Product could not be updated: {err:?}");
                let service_err = err.into_service_error();
                if service_err.is_conditional_check_failed_exception() {
                    return Err(Error::NotFound("Product did not exist.".to_string()));
                }
                return Err(Error::Transaction(
                    "Unexpected error when updating product.".to_string(),
                ));
            }
        };

        output
            .attributes
            .as_ref()
            .and_then(|attrs| attrs.get("quantity"))
            .and_then(|v| v.as_n().ok())
            .and_then(|raw| raw.parse().ok())
            .ok_or_else(|| {
                Error::Transaction("No updates to quantity were required.".to_string())
            })
    }

    async fn get_reserved_detail(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<ReservedDetail, Error> {
        let item = self
            .get_item(keys::list_pk(list_id), keys::reserved_sk(product_id, user_id))
            .await?
            .ok_or_else(|| {
                info!(
                    "No reserved details were found for list {} and product id {}.",
                    list_id, product_id
                );
                Error::NotFound("Product is not reserved by user.".to_string())
            })?;

        ReservedDetail::from_item(&item)
    }

    async fn assert_not_reserved(
        &self,
        list_id: &str,
        product_id: &str,
        user_id: &str,
    ) -> Result<(), Error> {
        let item = self
            .get_item(keys::list_pk(list_id), keys::reserved_sk(product_id, user_id))
            .await?;

        if item.is_some() {
            info!(
                "Reserved product was found for list {}, product id {} and user {}.",
                list_id, product_id, user_id
            );
            return Err(Error::AlreadyReserved(
                "Product already reserved by user.".to_string(),
            ));
        }

        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<String>, Error> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(&self.index_name)
            .key_condition_expression("email = :email")
            .expression_attribute_values(":email", AttributeValue::S(email.to_string()))
            .send()
            .await
            .map_err(|err| {
                error!("User query failed: {err:?}");
                Error::Transaction("Unexpected error when getting user from table.".to_string())
            })?;

        for item in output.items.unwrap_or_default() {
            let is_user_record = item
                .get("PK")
                .and_then(|v| v.as_s().ok())
                .is_some_and(|pk| pk.starts_with("USER"));

            if is_user_record {
                info!("User with email {} was found.", email);
                let user_id = item
                    .get("userId")
                    .and_then(|v| v.as_s().ok())
                    .cloned()
                    .ok_or_else(|| {
                        Error::Mapping("Missing required attribute: userId".to_string())
                    })?;
                return Ok(Some(user_id));
            }
        }

        Ok(None)
    }

    async fn get_user(&self, user_id: &str) -> Result<User, Error> {
        let item = self
            .get_item(keys::user_key(user_id), keys::user_key(user_id))
            .await?
            .ok_or_else(|| {
                info!("No user id {} was found.", user_id);
                Error::NotFound("No user exists with this ID.".to_string())
            })?;

        User::from_item(&item)
    }

    async fn reserve_transaction(&self, write: &ReserveWrite) -> Result<(), Error> {
        let product_update = Update::builder()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(keys::list_pk(&write.list_id)))
            .key("SK", AttributeValue::S(keys::product_sk(&write.product_id)))
            .update_expression("set reserved = :r")
            .condition_expression("reserved = :prev")
            .expression_attribute_values(":r", AttributeValue::N(write.new_reserved.to_string()))
            .expression_attribute_values(
                ":prev",
                AttributeValue::N(write.prior_reserved.to_string()),
            )
            .build()?;

        let detail_put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(items::reserved_detail_item(write)))
            .condition_expression("attribute_not_exists(PK)")
            .build()?;

        let reservation_put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(items::reservation_item(write, ReservationState::Reserved)))
            .build()?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().update(product_update).build())
            .transact_items(TransactWriteItem::builder().put(detail_put).build())
            .transact_items(TransactWriteItem::builder().put(reservation_put).build())
            .send()
            .await
            .map_err(|err| {
                error!("Transaction write exception: {err:?}");
                Error::Transaction("Unexpected error when reserving product.".to_string())
            })?;

        Ok(())
    }

    async fn unreserve_transaction(&self, write: &UnreserveWrite) -> Result<(), Error> {
        let list_pk = keys::list_pk(&write.list_id);
        let reserved_sk = keys::reserved_sk(&write.product_id, &write.user_id);
        let reservation_key = keys::reservation_key(&write.resv_id);

        let product_update = Update::builder()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(list_pk.clone()))
            .key("SK", AttributeValue::S(keys::product_sk(&write.product_id)))
            .update_expression("set reserved = :r")
            .expression_attribute_values(":r", AttributeValue::N(write.new_reserved.to_string()))
            .build()?;

        // The delete is conditioned on the key still matching, guarding
        // against a concurrent mutation reusing the slot.
        let detail_delete = Delete::builder()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(list_pk.clone()))
            .key("SK", AttributeValue::S(reserved_sk.clone()))
            .condition_expression("PK = :PK AND SK = :SK")
            .expression_attribute_values(":PK", AttributeValue::S(list_pk))
            .expression_attribute_values(":SK", AttributeValue::S(reserved_sk))
            .build()?;

        let reservation_update = Update::builder()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(reservation_key.clone()))
            .key("SK", AttributeValue::S(reservation_key))
            .update_expression("set #st = :s")
            .expression_attribute_names("#st", "state")
            .expression_attribute_values(
                ":s",
                AttributeValue::S(ReservationState::Cancelled.as_str().to_string()),
            )
            .build()?;

        self.client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().update(product_update).build())
            .transact_items(TransactWriteItem::builder().delete(detail_delete).build())
            .transact_items(TransactWriteItem::builder().update(reservation_update).build())
            .send()
            .await
            .map_err(|err| {
                error!("Transaction write exception: {err:?}");
                Error::Transaction("Unexpected error when unreserving product.".to_string())
            })?;

        Ok(())
    }
}
