use thiserror::Error as ThisError;

/// Everything a handler can fail with, one variant per failure kind so call
/// sites branch on the kind rather than on message content. Message strings
/// are kept identical to the original service for client compatibility.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A required environment variable is missing. Fatal at startup.
    #[error("{0}")]
    Configuration(String),

    /// The event carried no usable identity claims.
    #[error("{0}")]
    Identity(String),

    /// List, product, reservation or user record is absent.
    #[error("{0}")]
    NotFound(String),

    /// The caller already holds a reservation for this product.
    #[error("{0}")]
    AlreadyReserved(String),

    /// The requested quantity would push the reserved count past the
    /// product's required quantity.
    #[error("Reserved quantity for product ({reserved}) could not be updated by {requested} as exceeds required quantity ({quantity}).")]
    OverReserved {
        reserved: u32,
        requested: u32,
        quantity: u32,
    },

    /// An email-flow reservation was attempted for an address that already
    /// has a registered account.
    #[error("{0}")]
    AccountExists(String),

    /// A stored record is missing an attribute or carries a malformed value.
    #[error("{0}")]
    Mapping(String),

    /// The store rejected a conditional or transactional write.
    #[error("{0}")]
    Transaction(String),
}

impl Error {
    /// HTTP status the handler layer responds with. The original service
    /// flattened everything to 500; mapping the domain failures to 4xx is a
    /// deliberate deviation, message strings unchanged.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Identity(_) => 401,
            Error::NotFound(_) => 404,
            Error::AlreadyReserved(_) | Error::OverReserved { .. } | Error::AccountExists(_) => 409,
            Error::Configuration(_) | Error::Mapping(_) | Error::Transaction(_) => 500,
        }
    }
}

impl From<aws_sdk_dynamodb::error::BuildError> for Error {
    fn from(err: aws_sdk_dynamodb::error::BuildError) -> Self {
        Error::Transaction(format!("Invalid store request: {err}"))
    }
}
