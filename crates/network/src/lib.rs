// crates/network/src/lib.rs
//! Network utilities for audio source resolution
//!
//! A thin wrapper over `reqwest` with the operations the resolver needs:
//! fetch JSON metadata, check that a URL is reachable, download a file.

mod client;
mod error;

pub use client::{Client, ClientConfig};
pub use error::{NetworkError, NetworkResult};
