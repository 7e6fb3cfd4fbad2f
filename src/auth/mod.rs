//! Auth Module
//!
//! Bearer token acquisition and refresh for the upstream SQL service.

mod authenticator;
mod store;
mod token;

pub use authenticator::{Authenticator, Credentials, HttpAuthenticator, IssuedToken};
pub use store::{CredentialStore, TokenStatus};
pub use token::Token;
