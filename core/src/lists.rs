//! List management: creating a list and updating a product's requested
//! quantity. Both are owner-scoped.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;
use uuid::Uuid;

use crate::entities::List;
use crate::error::Error;
use crate::identity::Identity;
use crate::store::{NewList, Store};

#[derive(Debug, Clone)]
pub struct CreatedList {
    pub list_id: String,
    pub message: &'static str,
}

pub async fn create_list<S: Store>(
    store: &S,
    identity: &Identity,
    attributes: &NewList,
) -> Result<CreatedList, Error> {
    let list_id = Uuid::new_v4().to_string();
    info!("Generated List ID: {}", list_id);

    let created_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    store
        .create_list(&list_id, &identity.user_pool_sub, attributes, created_at)
        .await?;

    Ok(CreatedList {
        list_id,
        message: "List was created.",
    })
}

pub async fn update_product_quantity<S: Store>(
    store: &S,
    identity: &Identity,
    list_id: &str,
    product_id: &str,
    quantity: u32,
) -> Result<u32, Error> {
    let list = store.get_list(list_id, &identity.user_pool_sub).await?;
    confirm_owner(&list, list_id, &identity.user_pool_sub)?;

    store
        .update_product_quantity(list_id, product_id, quantity)
        .await
}

fn confirm_owner(list: &List, list_id: &str, user_id: &str) -> Result<(), Error> {
    if list.list_owner != user_id {
        info!(
            "Owner of List ID {} did not match user id of requestor: {}.",
            list_id, user_id
        );
        return Err(Error::Identity(format!(
            "Owner of List ID {list_id} did not match user id of requestor: {user_id}."
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::store::{keys, MemoryStore};

    use super::*;

    fn identity(user_id: &str) -> Identity {
        Identity {
            cognito_identity_id: format!("eu-west-1:{user_id}"),
            user_pool_sub: user_id.to_string(),
        }
    }

    fn attributes() -> NewList {
        NewList {
            title: "Child User1 1st Birthday".to_string(),
            occasion: "Birthday".to_string(),
            description: "A gift list for Child User1.".to_string(),
        }
    }

    #[tokio::test]
    async fn create_list_writes_owner_and_share_records() {
        let store = MemoryStore::new();

        let created = create_list(&store, &identity("user-1"), &attributes())
            .await
            .unwrap();
        assert_eq!(created.message, "List was created.");

        let owner = store
            .get_raw(&keys::list_pk(&created.list_id), &keys::user_key("user-1"))
            .unwrap();
        assert_eq!(owner.get("listOwner").unwrap().as_s().unwrap(), "user-1");
        assert_eq!(
            owner.get("title").unwrap().as_s().unwrap(),
            "Child User1 1st Birthday"
        );

        let share = store
            .get_raw(&keys::list_pk(&created.list_id), &keys::share_sk("user-1"))
            .unwrap();
        assert_eq!(share.get("listId").unwrap().as_s().unwrap(), created.list_id);
    }

    #[tokio::test]
    async fn created_list_round_trips_through_the_mapper() {
        let store = MemoryStore::new();

        let created = create_list(&store, &identity("user-1"), &attributes())
            .await
            .unwrap();

        let list = store.get_list(&created.list_id, "user-1").await.unwrap();
        assert_eq!(list.list_id, created.list_id);
        assert_eq!(list.occasion, "Birthday");
        assert_eq!(list.list_owner, "user-1");
    }

    #[tokio::test]
    async fn only_the_owner_can_update_quantity() {
        let store = MemoryStore::new();
        let created = create_list(&store, &identity("user-1"), &attributes())
            .await
            .unwrap();

        let err = update_product_quantity(&store, &identity("user-2"), &created.list_id, "p1", 4)
            .await
            .unwrap_err();

        // A non-owner has no owner record for the list.
        assert_eq!(err.to_string(), "No list exists with this ID.");
    }

    #[tokio::test]
    async fn owner_mismatch_on_the_record_is_rejected() {
        let store = MemoryStore::new();
        let created = create_list(&store, &identity("user-1"), &attributes())
            .await
            .unwrap();

        // Forge a second owner record pointing at a different listOwner.
        let mut forged = store
            .get_raw(&keys::list_pk(&created.list_id), &keys::user_key("user-1"))
            .unwrap();
        forged.insert(
            "SK".to_string(),
            aws_sdk_dynamodb::types::AttributeValue::S(keys::user_key("user-2")),
        );
        store.insert(forged);

        let err = update_product_quantity(&store, &identity("user-2"), &created.list_id, "p1", 4)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Owner of List ID {} did not match user id of requestor: user-2.",
                created.list_id
            )
        );
    }

    #[tokio::test]
    async fn updating_a_missing_product_is_not_found() {
        let store = MemoryStore::new();
        let created = create_list(&store, &identity("user-1"), &attributes())
            .await
            .unwrap();

        let err = update_product_quantity(&store, &identity("user-1"), &created.list_id, "p1", 4)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Product did not exist.");
    }
}
