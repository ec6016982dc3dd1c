//! Validated addressing types.
//!
//! These types check their format at construction time, so a client can
//! never be configured with a malformed origin or path.

mod api_path;
mod api_url;

pub use api_path::ApiPath;
pub use api_url::ApiUrl;
