//! Redis-backed [`waf_core::store::ConfigStoreClient`] and the key schema
//! it reads and writes (spec §6.1).

mod client;
mod error;
pub mod keys;

pub use client::RedisStoreClient;
pub use error::Error;
