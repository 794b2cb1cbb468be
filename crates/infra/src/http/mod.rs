//! Outbound HTTP transport.

pub mod client;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder};
pub use transport::{encode_pairs, HttpTransport, TransportRequest, TransportResponse};
