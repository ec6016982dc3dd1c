//! Core traits for session storage.

mod token_store;

pub use token_store::TokenStore;
