//! Caller identity, resolved from the API Gateway request context.
//!
//! Requests signed by the API test harness carry an IAM user ARN instead of a
//! Cognito identity; those get the fixed identity pair from configuration so
//! integration runs can bypass real authentication.

use lambda_http::request::RequestContext;
use lambda_http::{Request, RequestExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Error;

static TEST_USER_ARN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^arn:aws:iam::[0-9]{12}:user/ApiTestUser").expect("valid regex")
});

const NO_IDENTITY_CONTEXT: &str = "There was no identity context in API event.";

/// Raw identity claims as delivered by the gateway.
#[derive(Debug, Clone, Default)]
pub struct IdentityClaims {
    pub user_arn: Option<String>,
    pub cognito_identity_id: Option<String>,
    pub cognito_authentication_provider: Option<String>,
}

impl IdentityClaims {
    pub fn from_request(event: &Request) -> Result<Self, Error> {
        let context = event
            .request_context_ref()
            .ok_or_else(|| Error::Identity(NO_IDENTITY_CONTEXT.to_string()))?;

        match context {
            RequestContext::ApiGatewayV1(context) => Ok(IdentityClaims {
                user_arn: context.identity.user_arn.clone(),
                cognito_identity_id: context.identity.cognito_identity_id.clone(),
                cognito_authentication_provider: context
                    .identity
                    .cognito_authentication_provider
                    .clone(),
            }),
            _ => {
                error!("There was no identity context in API event.");
                Err(Error::Identity(NO_IDENTITY_CONTEXT.to_string()))
            }
        }
    }
}

/// Normalized caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub cognito_identity_id: String,
    pub user_pool_sub: String,
}

/// Resolve the normalized identity pair from the raw claims.
pub fn resolve(claims: &IdentityClaims, config: &Config) -> Result<Identity, Error> {
    let user_arn = claims
        .user_arn
        .as_deref()
        .ok_or_else(|| Error::Identity(NO_IDENTITY_CONTEXT.to_string()))?;

    if TEST_USER_ARN.is_match(user_arn) {
        info!("Request was from postman, using API test identity.");
        return postman_identity(config);
    }

    let cognito_identity_id = claims.cognito_identity_id.clone().ok_or_else(|| {
        Error::Identity("There was no cognitoIdentityId in the API event.".to_string())
    })?;

    let provider = claims
        .cognito_authentication_provider
        .as_deref()
        .ok_or_else(|| Error::Identity(NO_IDENTITY_CONTEXT.to_string()))?;

    // The pool sub is the final segment of the authentication provider string.
    let user_pool_sub = provider.rsplit(':').next().unwrap_or(provider).to_string();

    info!("cognitoIdentityId was retrieved from event.");

    Ok(Identity {
        cognito_identity_id,
        user_pool_sub,
    })
}

fn postman_identity(config: &Config) -> Result<Identity, Error> {
    match (&config.postman_identity_id, &config.postman_userpool_sub) {
        (Some(id), Some(sub)) => Ok(Identity {
            cognito_identity_id: id.clone(),
            user_pool_sub: sub.clone(),
        }),
        _ => {
            error!("POSTMAN_IDENTITY_ID and POSTMAN_USERPOOL_SUB environment variables not set correctly.");
            Err(Error::Configuration(
                "POSTMAN_IDENTITY_ID and POSTMAN_USERPOOL_SUB environment variables not set correctly."
                    .to_string(),
            ))
        }
    }
}
