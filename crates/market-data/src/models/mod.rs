//! Provider call models
//!
//! This module contains the data types exchanged with providers:
//! - `request` - Outbound call description (ProviderRequest, HttpMethod)
//! - `response` - Opaque provider response (ProviderResponse)

mod request;
mod response;

pub use request::{HttpMethod, ProviderRequest};
pub use response::ProviderResponse;
