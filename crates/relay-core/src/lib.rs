//! Core library for the Sui JSON-RPC relay.
//!
//! The relay sits between browser clients and a public Sui fullnode. It
//! forwards JSON-RPC requests to a primary upstream, caches validated
//! responses, coalesces token-metadata lookups against the Birdeye API,
//! and falls back to a secondary fullnode when the primary path fails or
//! the system is overloaded.
//!
//! # Module Overview
//!
//! - [`cache`]: TTL key-value stores for RPC responses and token metadata
//! - [`config`]: layered application configuration
//! - [`limiter`]: the server-wide fixed-window limiter and the Birdeye pacer
//! - [`metadata`]: coalescing token-metadata fetcher and Birdeye client
//! - [`proxy`]: the forwarding engine, fallback client, and body decompression
//! - [`queue`]: the admission queue serializing access to the primary upstream
//! - [`types`]: JSON-RPC envelope and token-metadata types
//! - [`upstream`]: the outbound HTTP client for the primary endpoint

pub mod cache;
pub mod config;
pub mod limiter;
pub mod metadata;
pub mod proxy;
pub mod queue;
pub mod types;
pub mod upstream;
