//! SSO token acquisition for cmpflow
//!
//! Exchanges client credentials (optionally with a user's name and password)
//! for a bearer token at `<endpoint>/oauth2/token`.
//!
//! # Example
//!
//! ```ignore
//! use cmpflow_sso::{authenticate, Credentials};
//!
//! let auth = authenticate(
//!     "https://sso.example.com",
//!     &Credentials::client("client-id", "client-secret"),
//! )
//! .await?;
//! println!("token expires in {}s", auth.expires_in);
//! ```

pub mod error;
pub mod token;

pub use error::{Result, SsoError};
pub use token::{Authorization, Credentials, SsoClient, authenticate};
