//! Network access: a single-shot transport, a response cache, and the
//! bounded retry loop that ties them together.

/// URL-keyed response storage.
pub mod cache;
/// Bounded retry loop around a transport.
pub mod retry;
/// Single HTTP GET abstraction.
pub mod transport;

pub use cache::{CachedResponse, ResponseCache};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use transport::{HttpTransport, RawResponse, Transport};
