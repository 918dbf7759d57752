//! Use cases built on the data-access core.

mod token_store;

pub use token_store::{NewAccessToken, TokenManager, TokenStore};
