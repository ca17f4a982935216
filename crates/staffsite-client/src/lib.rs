//! Typed client for the staffsite query endpoint.
//!
//! Every read and write the admin UI performs goes through
//! [`GraphqlClient::send`]. The client carries the session cookie on every
//! request; whether a caller may perform an operation is decided by the
//! server alone.

pub mod client;
pub mod error;

pub use client::GraphqlClient;
pub use error::RequestError;

#[cfg(test)]
mod tests;
