//! Per-connection state and lifecycle.

pub mod client;
pub mod connection;

pub use client::{Client, Profile};
pub use connection::ConnectionSession;
