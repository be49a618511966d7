//! Forecast retrieval: chunked requests, shared rate governor, retry
//! with backoff, and cooperative cancellation.

pub mod client;
pub mod error;
pub mod governor;
pub mod transport;

pub use client::{FetchConfig, OpenMeteoClient};
pub use error::FetchError;
pub use governor::RateGovernor;
pub use transport::{HttpTransport, ReqwestTransport, TransportResponse};
