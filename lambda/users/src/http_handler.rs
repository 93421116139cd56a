use lambda_http::{Body, Error, Request, RequestExt, Response};
use serde_json::json;
use tracing::error;

use lists_core::identity::{self, IdentityClaims};
use lists_core::response;
use lists_core::store::Store;
use lists_core::Config;

pub(crate) async fn function_handler<S: Store>(
    store: &S,
    config: &Config,
    event: Request,
) -> Result<Response<Body>, Error> {
    let path = event.uri().path();
    let method = event.method().as_str();

    match (method, path) {
        ("GET", "/users/me") => current_user(store, config, &event).await,
        ("GET", p) if p.starts_with("/users/") => lookup_by_email(store, &event).await,
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

/// The caller's own account record, resolved from the identity claims.
async fn current_user<S: Store>(
    store: &S,
    config: &Config,
    event: &Request,
) -> Result<Response<Body>, Error> {
    let result = async {
        let claims = IdentityClaims::from_request(event)?;
        let caller = identity::resolve(&claims, config)?;

        let user = store.get_user(&caller.user_pool_sub).await?;
        Ok(json!({ "userId": user.user_id, "email": user.email, "name": user.name }))
    }
    .await;

    respond(result)
}

/// Whether an account exists for the given address. Absence is a regular
/// answer here, not an error.
async fn lookup_by_email<S: Store>(store: &S, event: &Request) -> Result<Response<Body>, Error> {
    let params = event.path_parameters();
    let email = match params.first("email") {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => {
            return response::bad_request(
                "API Event did not contain an email in the path parameters.".to_string(),
            )
        }
    };

    let result = async {
        match store.find_user_by_email(&email).await? {
            Some(user_id) => Ok(json!({ "exists": true, "userId": user_id })),
            None => Ok(json!({ "exists": false })),
        }
    }
    .await;

    respond(result)
}
