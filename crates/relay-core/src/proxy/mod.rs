//! The forwarding engine and its supporting pieces.

pub mod decompress;
pub mod engine;
pub mod errors;
pub mod fallback;

pub use engine::{ProxyEngine, Relayed, ServedBy};
pub use errors::ProxyError;
