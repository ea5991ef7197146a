//! A [`D1Database`](crate::store::D1Database) backed by the Cloudflare D1 REST API
//!
//! This lets the dialect run from any environment that can make HTTPS requests,
//! not just from inside a Worker.

mod client;
mod config;
mod wire;

pub use client::{D1HttpDatabase, D1HttpStatement, WireFormat};
pub use config::{D1HttpConfig, DEFAULT_BASE_URL};
