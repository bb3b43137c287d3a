//! SSO error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SsoError {
    #[error("[SSO] Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("[SSO] Response code: [{status}], result: [{body}]")]
    Api { status: u16, body: String },

    #[error("[SSO] Unable to decode token response: {source}, result: [{body}]")]
    Decode {
        source: serde_json::Error,
        body: String,
    },
}

pub type Result<T> = std::result::Result<T, SsoError>;
