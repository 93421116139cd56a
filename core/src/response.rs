//! JSON response construction shared by the lambda handlers.
//!
//! Every response carries the same fixed header pair regardless of status.

use lambda_http::{Body, Response};
use serde::Serialize;
use tracing::info;

use crate::error::Error;

type LambdaError = lambda_http::Error;

pub fn json(status: u16, body: &impl Serialize) -> Result<Response<Body>, LambdaError> {
    let body = serde_json::to_string(body)?;
    info!("Creating response with status code ({}) and body ({})", status, body);

    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::Text(body))?)
}

pub fn error(err: &Error) -> Result<Response<Body>, LambdaError> {
    json(
        err.status_code(),
        &serde_json::json!({ "error": err.to_string() }),
    )
}

pub fn bad_request(message: String) -> Result<Response<Body>, LambdaError> {
    json(400, &serde_json::json!({ "error": message }))
}
