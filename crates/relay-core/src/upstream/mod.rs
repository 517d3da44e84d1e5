//! Outbound HTTP access to the primary Sui RPC endpoint.

pub mod client;
pub mod errors;

pub use client::{RpcClient, UpstreamResponse};
pub use errors::UpstreamError;
