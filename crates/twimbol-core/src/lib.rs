//! twimbol-core - Core types and traits for the Twimbol API client.

pub mod error;
pub mod memory;
pub mod request;
pub mod response;
pub mod retry;
pub mod tokens;
pub mod traits;
pub mod types;

pub use error::Error;
pub use memory::{MemoryTokenStore, SessionTokens};
pub use request::{ApiRequest, MultipartField, MultipartValue, RequestBody};
pub use response::ApiResponse;
pub use retry::{RequestState, RetryMachine, RetryPolicy, Step};
pub use tokens::{AccessToken, RefreshToken};
pub use traits::TokenStore;
pub use types::{ApiPath, ApiUrl};

pub use http::{HeaderMap, Method, StatusCode};

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;
