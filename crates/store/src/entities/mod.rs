//! SeaORM entities owned by the store.

pub mod access_token;
