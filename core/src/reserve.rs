//! Reservation workflow.
//!
//! Composes the store operations into the reserve and unreserve use cases:
//! ownership of the capacity invariant (`0 <= reserved <= quantity`) lives
//! here, while the atomicity of the record changes is delegated to the
//! store's transactional writes.

use tracing::info;
use uuid::Uuid;

use crate::error::Error;
use crate::identity::Identity;
use crate::store::{ReserveWrite, Store, UnreserveWrite};

/// Who is reserving: an authenticated account, or the no-account email flow.
#[derive(Debug, Clone)]
pub enum Reserver {
    Account(Identity),
    Email { email: String, name: Option<String> },
}

#[derive(Debug, Clone)]
pub struct ReserveOutcome {
    pub resv_id: String,
    pub new_reserved: u32,
}

pub async fn reserve_product<S: Store>(
    store: &S,
    list_id: &str,
    product_id: &str,
    quantity: u32,
    reserver: Reserver,
) -> Result<ReserveOutcome, Error> {
    let list = store.find_list(list_id).await?;

    let (user_id, user_name) = match reserver {
        Reserver::Account(identity) => (identity.user_pool_sub, None),
        Reserver::Email { email, name } => {
            if store.find_user_by_email(&email).await?.is_some() {
                return Err(Error::AccountExists(
                    "User has an account, login required before product can be reserved."
                        .to_string(),
                ));
            }
            (email, name)
        }
    };

    let product = store.get_product(list_id, product_id).await?;
    store.assert_not_reserved(list_id, product_id, &user_id).await?;

    let new_reserved = product.reserved + quantity;
    if new_reserved > product.quantity {
        return Err(Error::OverReserved {
            reserved: product.reserved,
            requested: quantity,
            quantity: product.quantity,
        });
    }

    let resv_id = Uuid::new_v4().to_string();
    info!(
        "Reserving product {} on list {} for user {} with reservation id {}",
        product_id, list_id, user_id, resv_id
    );

    store
        .reserve_transaction(&ReserveWrite {
            list_id: list_id.to_string(),
            list_title: list.title,
            product_id: product_id.to_string(),
            user_id,
            user_name,
            resv_id: resv_id.clone(),
            prior_reserved: product.reserved,
            new_reserved,
            quantity,
        })
        .await?;

    Ok(ReserveOutcome {
        resv_id,
        new_reserved,
    })
}

pub async fn unreserve_product<S: Store>(
    store: &S,
    list_id: &str,
    product_id: &str,
    user_id: &str,
) -> Result<(), Error> {
    let detail = store.get_reserved_detail(list_id, product_id, user_id).await?;
    let product = store.get_product(list_id, product_id).await?;

    // The store never lets reserved go negative, but floor anyway.
    let new_reserved = product.reserved.saturating_sub(detail.quantity);

    info!(
        "Unreserving product {} on list {} for user {} (reservation {})",
        product_id, list_id, user_id, detail.resv_id
    );

    store
        .unreserve_transaction(&UnreserveWrite {
            list_id: list_id.to_string(),
            product_id: product_id.to_string(),
            user_id: user_id.to_string(),
            resv_id: detail.resv_id,
            new_reserved,
        })
        .await
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::AttributeValue;

    use crate::entities::Item;
    use crate::store::{keys, MemoryStore};

    use super::*;

    const LIST_ID: &str = "12345678-list-0001-1234-abcdefghijkl";
    const OWNER_ID: &str = "12345678-user-0001-1234-abcdefghijkl";
    const RESERVER_ID: &str = "42cf26f5-407c-47cf-bcb6-f70cd63ac119";
    const SECOND_RESERVER_ID: &str = "12345678-user-0002-1234-abcdefghijkl";

    fn s(value: &str) -> AttributeValue {
        AttributeValue::S(value.to_string())
    }

    fn n(value: u32) -> AttributeValue {
        AttributeValue::N(value.to_string())
    }

    fn account(user_id: &str) -> Reserver {
        Reserver::Account(Identity {
            cognito_identity_id: format!("eu-west-1:{user_id}"),
            user_pool_sub: user_id.to_string(),
        })
    }

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();

        store.insert(Item::from([
            ("PK".to_string(), s(&keys::list_pk(LIST_ID))),
            ("SK".to_string(), s(&keys::user_key(OWNER_ID))),
            ("listId".to_string(), s(LIST_ID)),
            ("listOwner".to_string(), s(OWNER_ID)),
            ("title".to_string(), s("Child User1 1st Birthday")),
            ("occasion".to_string(), s("Birthday")),
            ("description".to_string(), s("A gift list for Child User1.")),
            ("createdAt".to_string(), AttributeValue::N("1570552083".to_string())),
        ]));

        store.insert(Item::from([
            ("PK".to_string(), s(&keys::list_pk(LIST_ID))),
            ("SK".to_string(), s(&keys::product_sk("prod-1"))),
            ("quantity".to_string(), n(3)),
            ("reserved".to_string(), n(0)),
        ]));

        store.insert(Item::from([
            ("PK".to_string(), s(&keys::user_key(OWNER_ID))),
            ("SK".to_string(), s(&keys::user_key(OWNER_ID))),
            ("userId".to_string(), s(OWNER_ID)),
            ("email".to_string(), s("test.user1@gmail.com")),
            ("name".to_string(), s("Test User1")),
        ]));

        store
    }

    #[tokio::test]
    async fn reserve_then_unreserve_round_trips() {
        let store = seeded_store();

        let outcome = reserve_product(&store, LIST_ID, "prod-1", 1, account(RESERVER_ID))
            .await
            .unwrap();
        assert_eq!(outcome.new_reserved, 1);

        let detail = store
            .get_reserved_detail(LIST_ID, "prod-1", RESERVER_ID)
            .await
            .unwrap();
        assert_eq!(detail.quantity, 1);
        assert_eq!(detail.resv_id, outcome.resv_id);

        unreserve_product(&store, LIST_ID, "prod-1", RESERVER_ID)
            .await
            .unwrap();

        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 0);
        assert!(store
            .get_raw(&keys::list_pk(LIST_ID), &keys::reserved_sk("prod-1", RESERVER_ID))
            .is_none());

        let reservation_key = keys::reservation_key(&outcome.resv_id);
        let record = store.get_raw(&reservation_key, &reservation_key).unwrap();
        assert_eq!(record.get("state").unwrap().as_s().unwrap(), "cancelled");
    }

    #[tokio::test]
    async fn reserving_exactly_the_remaining_quantity_is_allowed() {
        let store = seeded_store();

        reserve_product(&store, LIST_ID, "prod-1", 2, account(SECOND_RESERVER_ID))
            .await
            .unwrap();
        let outcome = reserve_product(&store, LIST_ID, "prod-1", 1, account(RESERVER_ID))
            .await
            .unwrap();

        assert_eq!(outcome.new_reserved, 3);
        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 3);
        assert!(product.reserved <= product.quantity);
    }

    #[tokio::test]
    async fn over_reserving_fails_with_the_exact_message() {
        let store = seeded_store();

        reserve_product(&store, LIST_ID, "prod-1", 2, account(SECOND_RESERVER_ID))
            .await
            .unwrap();

        let err = reserve_product(&store, LIST_ID, "prod-1", 4, account(RESERVER_ID))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Reserved quantity for product (2) could not be updated by 4 as exceeds required quantity (3)."
        );

        // The failed attempt must not have touched the table.
        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 2);
    }

    #[tokio::test]
    async fn reserving_twice_without_unreserving_fails() {
        let store = seeded_store();

        reserve_product(&store, LIST_ID, "prod-1", 1, account(RESERVER_ID))
            .await
            .unwrap();
        let err = reserve_product(&store, LIST_ID, "prod-1", 1, account(RESERVER_ID))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::AlreadyReserved(_)));
        assert_eq!(err.to_string(), "Product already reserved by user.");
    }

    #[tokio::test]
    async fn reserving_on_a_missing_list_fails() {
        let store = seeded_store();

        let err = reserve_product(&store, "no-such-list", "prod-1", 1, account(RESERVER_ID))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No list exists with this ID.");
    }

    #[tokio::test]
    async fn reserving_a_product_not_on_the_list_fails() {
        let store = seeded_store();

        let err = reserve_product(&store, LIST_ID, "prod-404", 1, account(RESERVER_ID))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "No product item exists with this ID.");
    }

    #[tokio::test]
    async fn email_flow_rejects_registered_addresses_without_writing() {
        let store = seeded_store();

        let err = reserve_product(
            &store,
            LIST_ID,
            "prod-1",
            1,
            Reserver::Email {
                email: "test.user1@gmail.com".to_string(),
                name: Some("Test User1".to_string()),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(
            err.to_string(),
            "User has an account, login required before product can be reserved."
        );

        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 0);
        assert!(store
            .get_raw(
                &keys::list_pk(LIST_ID),
                &keys::reserved_sk("prod-1", "test.user1@gmail.com"),
            )
            .is_none());
    }

    #[tokio::test]
    async fn email_flow_reserves_under_the_email_identity() {
        let store = seeded_store();

        let outcome = reserve_product(
            &store,
            LIST_ID,
            "prod-1",
            1,
            Reserver::Email {
                email: "aunt.carol@gmail.com".to_string(),
                name: Some("Aunt Carol".to_string()),
            },
        )
        .await
        .unwrap();

        let detail = store
            .get_reserved_detail(LIST_ID, "prod-1", "aunt.carol@gmail.com")
            .await
            .unwrap();
        assert_eq!(detail.user_id, "aunt.carol@gmail.com");
        assert_eq!(detail.resv_id, outcome.resv_id);

        let reservation_key = keys::reservation_key(&outcome.resv_id);
        let record = store.get_raw(&reservation_key, &reservation_key).unwrap();
        assert_eq!(record.get("name").unwrap().as_s().unwrap(), "Aunt Carol");
    }

    #[tokio::test]
    async fn unreserving_without_a_reservation_fails() {
        let store = seeded_store();

        let err = unreserve_product(&store, LIST_ID, "prod-1", RESERVER_ID)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Product is not reserved by user.");
    }

    #[tokio::test]
    async fn failed_unreserve_leaves_the_product_untouched() {
        let store = seeded_store();

        reserve_product(&store, LIST_ID, "prod-1", 2, account(RESERVER_ID))
            .await
            .unwrap();

        // Pull the detail record out from under the transaction so its
        // conditional delete fails.
        store
            .remove(&keys::list_pk(LIST_ID), &keys::reserved_sk("prod-1", RESERVER_ID))
            .unwrap();

        let err = unreserve_product(&store, LIST_ID, "prod-1", RESERVER_ID)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Product is not reserved by user.");

        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 2);
    }

    #[tokio::test]
    async fn capacity_invariant_holds_across_a_mixed_sequence() {
        let store = seeded_store();

        reserve_product(&store, LIST_ID, "prod-1", 2, account(RESERVER_ID))
            .await
            .unwrap();
        reserve_product(&store, LIST_ID, "prod-1", 1, account(SECOND_RESERVER_ID))
            .await
            .unwrap();
        unreserve_product(&store, LIST_ID, "prod-1", RESERVER_ID)
            .await
            .unwrap();

        let product = store.get_product(LIST_ID, "prod-1").await.unwrap();
        assert_eq!(product.reserved, 1);
        assert!(product.reserved <= product.quantity);
    }
}
