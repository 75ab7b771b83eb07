//! External data provider plumbing.
//!
//! The gateway never talks HTTP directly. It hands a [`ProviderRequest`]
//! and a credential secret to a [`ProviderTransport`], then asks the
//! provider's [`RateLimitSignalExtractor`] whether the response means the
//! credential is out of quota.
//!
//! [`ProviderRequest`]: crate::models::ProviderRequest

mod config;
mod http;
mod signals;
mod traits;

pub use config::{ApiKeyPlacement, ProviderConfig};
pub use http::HttpTransport;
pub use signals::{PatternSignal, StatusCodeSignal};
pub use traits::{ProviderTransport, RateLimitSignalExtractor};
