use lambda_http::{Body, Error, Request, RequestExt, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use lists_core::identity::{self, IdentityClaims};
use lists_core::lists;
use lists_core::reserve::{self, Reserver};
use lists_core::response;
use lists_core::store::{NewList, Store};
use lists_core::Config;

#[derive(Deserialize)]
struct CreateListRequest {
    title: String,
    occasion: String,
    description: String,
}

#[derive(Deserialize)]
struct UpdateProductRequest {
    quantity: u32,
}

#[derive(Deserialize)]
struct ReserveRequest {
    quantity: u32,
    #[serde(default)]
    name: Option<String>,
}

pub(crate) async fn function_handler<S: Store>(
    store: &S,
    config: &Config,
    event: Request,
) -> Result<Response<Body>, Error> {
    let path = event.uri().path();
    let method = event.method().as_str();

    match (method, path) {
        ("POST", "/lists") => create_list(store, config, &event).await,
        ("PUT", p) if p.starts_with("/lists/") && p.contains("/products/") => {
            update_product(store, config, &event).await
        }
        ("POST", p)
            if p.starts_with("/lists/") && p.contains("/reserve/") && p.contains("/email/") =>
        {
            reserve_with_email(store, &event).await
        }
        ("POST", p) if p.starts_with("/lists/") && p.contains("/reserve/") => {
            reserve(store, config, &event).await
        }
        ("DELETE", p) if p.starts_with("/lists/") && p.contains("/reserve/") => {
            unreserve(store, config, &event).await
        }
        _ => response::json(404, &json!({ "error": "Not found" })),
    }
}

fn respond(result: Result<serde_json::Value, lists_core::Error>) -> Result<Response<Body>, Error> {
    match result {
        Ok(data) => response::json(200, &data),
        Err(err) => {
            error!("Exception: {}", err);
            response::error(&err)
        }
    }
}

async fn create_list<S: Store>(
    store: &S,
    config: &Config,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let attributes: CreateListRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(req) => req,
        Err(_) => {
            return response::bad_request("API Event did not contain a valid body.".to_string())
        }
    };

    let result = async {
        let claims = IdentityClaims::from_request(event)?;
        let caller = identity::resolve(&claims, config)?;

        let created = lists::create_list(
            store,
            &caller,
            &NewList {
                title: attributes.title,
                occasion: attributes.occasion,
                description: attributes.description,
            },
        )
        .await?;

        Ok(json!({ "listId": created.list_id, "message": created.message }))
    }
    .await;

    respond(result)
}

async fn update_product<S: Store>(
    store: &S,
    config: &Config,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let params = event.path_parameters();
    let list_id = match params.first("id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a List ID in the path parameters.".to_string(),
            )
        }
    };
    let product_id = match params.first("productid") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a Product ID in the path parameters.".to_string(),
            )
        }
    };

    let body: UpdateProductRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(req) => req,
        Err(_) => {
            return response::bad_request(
                "API Event did not contain the quantity in the body.".to_string(),
            )
        }
    };

    let result = async {
        let claims = IdentityClaims::from_request(event)?;
        let caller = identity::resolve(&claims, config)?;

        let quantity =
            lists::update_product_quantity(store, &caller, &list_id, &product_id, body.quantity)
                .await?;

        Ok(json!({ "quantity": quantity }))
    }
    .await;

    respond(result)
}

async fn reserve<S: Store>(
    store: &S,
    config: &Config,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let params = event.path_parameters();
    let list_id = match params.first("id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a List ID in the path parameters.".to_string(),
            )
        }
    };
    let product_id = match params.first("productid") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a Product ID in the path parameters.".to_string(),
            )
        }
    };

    let body: ReserveRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(req) => req,
        Err(_) => {
            return response::bad_request(
                "API Event did not contain the quantity in the body.".to_string(),
            )
        }
    };

    let result = async {
        let claims = IdentityClaims::from_request(event)?;
        let caller = identity::resolve(&claims, config)?;

        reserve::reserve_product(
            store,
            &list_id,
            &product_id,
            body.quantity,
            Reserver::Account(caller),
        )
        .await?;

        Ok(json!({ "reserved": true }))
    }
    .await;

    respond(result)
}

async fn reserve_with_email<S: Store>(store: &S, event: &Request) -> Result<Response<Body>, Error> {
    let params = event.path_parameters();
    let list_id = match params.first("id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a List ID in the path parameters.".to_string(),
            )
        }
    };
    let product_id = match params.first("productid") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a Product ID in the path parameters.".to_string(),
            )
        }
    };
    let email = match params.first("email") {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain an email in the path parameters.".to_string(),
            )
        }
    };

    let body: ReserveRequest = match serde_json::from_slice(event.body().as_ref()) {
        Ok(req) => req,
        Err(_) => {
            return response::bad_request(
                "API Event did not contain the quantity in the body.".to_string(),
            )
        }
    };

    let result = async {
        reserve::reserve_product(
            store,
            &list_id,
            &product_id,
            body.quantity,
            Reserver::Email {
                email,
                name: body.name,
            },
        )
        .await?;

        Ok(json!({ "reserved": true }))
    }
    .await;

    respond(result)
}

async fn unreserve<S: Store>(
    store: &S,
    config: &Config,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let params = event.path_parameters();
    let list_id = match params.first("id") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a List ID in the path parameters.".to_string(),
            )
        }
    };
    let product_id = match params.first("productid") {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain a Product ID in the path parameters.".to_string(),
            )
        }
    };

    let result = async {
        let claims = IdentityClaims::from_request(event)?;
        let caller = identity::resolve(&claims, config)?;

        reserve::unreserve_product(store, &list_id, &product_id, &caller.user_pool_sub).await?;

        Ok(json!({ "unreserved": true }))
    }
    .await;

    respond(result)
}
