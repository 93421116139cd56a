//! Typed views over the raw tagged items in the table.
//!
//! Every record type lives in one table behind composite `PK`/`SK` keys; the
//! mappers here lift an attribute map into a domain struct and are the only
//! place the `{"S": ...}` / `{"N": ...}` wire form is interpreted.

use std::collections::HashMap;
use std::str::FromStr;

use aws_sdk_dynamodb::types::AttributeValue;
use serde::Serialize;

use crate::error::Error;

pub type Item = HashMap<String, AttributeValue>;

/// Owner view of a gift list.
#[derive(Debug, Clone, Serialize)]
pub struct List {
    #[serde(rename = "listId")]
    pub list_id: String,
    pub title: String,
    pub occasion: String,
    pub description: String,
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "listOwner")]
    pub list_owner: String,
}

impl List {
    pub fn from_item(item: &Item) -> Result<Self, Error> {
        Ok(List {
            list_id: get_s(item, "listId")?,
            title: get_s(item, "title")?,
            occasion: get_s(item, "occasion")?,
            description: get_s(item, "description")?,
            created_at: get_n(item, "createdAt")?,
            list_owner: get_s(item, "listOwner")?,
        })
    }
}

/// A product on a list, with its requested and currently-reserved counts.
#[derive(Debug, Clone, Serialize)]
pub struct Product {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub quantity: u32,
    pub reserved: u32,
}

impl Product {
    pub fn from_item(item: &Item) -> Result<Self, Error> {
        let sk = get_s(item, "SK")?;
        let product_id = sk
            .strip_prefix("PRODUCT#")
            .ok_or_else(|| Error::Mapping(format!("Invalid sort key for product item: {sk}")))?;

        Ok(Product {
            product_id: product_id.to_string(),
            quantity: get_n(item, "quantity")?,
            reserved: get_n(item, "reserved")?,
        })
    }
}

/// Proof that one user holds a reservation for one product on one list.
#[derive(Debug, Clone, Serialize)]
pub struct ReservedDetail {
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub quantity: u32,
    #[serde(rename = "resvId")]
    pub resv_id: String,
}

impl ReservedDetail {
    pub fn from_item(item: &Item) -> Result<Self, Error> {
        Ok(ReservedDetail {
            product_id: get_s(item, "productId")?,
            user_id: get_s(item, "userId")?,
            quantity: get_n(item, "quantity")?,
            resv_id: get_s(item, "resvId")?,
        })
    }
}

/// Lifecycle state of a reservation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationState {
    Reserved,
    Cancelled,
}

impl ReservationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationState::Reserved => "reserved",
            ReservationState::Cancelled => "cancelled",
        }
    }
}

impl FromStr for ReservationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reserved" => Ok(ReservationState::Reserved),
            "cancelled" => Ok(ReservationState::Cancelled),
            other => Err(Error::Mapping(format!("Unknown reservation state: {other}"))),
        }
    }
}

/// Audit record tracking one reservation event.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    #[serde(rename = "resvId")]
    pub resv_id: String,
    #[serde(rename = "listId")]
    pub list_id: String,
    #[serde(rename = "listTitle")]
    pub list_title: String,
    #[serde(rename = "productId")]
    pub product_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub quantity: u32,
    pub state: ReservationState,
}

impl Reservation {
    pub fn from_item(item: &Item) -> Result<Self, Error> {
        Ok(Reservation {
            resv_id: get_s(item, "resvId")?,
            list_id: get_s(item, "listId")?,
            list_title: get_s(item, "listTitle")?,
            product_id: get_s(item, "productId")?,
            user_id: get_s(item, "userId")?,
            quantity: get_n(item, "quantity")?,
            state: get_s(item, "state")?.parse()?,
        })
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl User {
    pub fn from_item(item: &Item) -> Result<Self, Error> {
        Ok(User {
            user_id: get_s(item, "userId")?,
            email: get_s(item, "email")?,
            name: get_s(item, "name")?,
        })
    }
}

fn get_s(item: &Item, key: &str) -> Result<String, Error> {
    item.get(key)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| Error::Mapping(format!("Missing required attribute: {key}")))
}

fn get_n<T: FromStr>(item: &Item, key: &str) -> Result<T, Error> {
    let raw = item
        .get(key)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| Error::Mapping(format!("Missing required attribute: {key}")))?;

    raw.parse()
        .map_err(|_| Error::Mapping(format!("Invalid numeric attribute: {key}")))
}
