//! Core types and trait definitions for the staffsite backend.
//!
//! This crate is free of HTTP and database dependencies. It owns the boot-time
//! configuration record, the role → permission table, the query envelope
//! shared by server and client, and the [`store::SiteStore`] abstraction.

// Native `async fn` in traits; the store trait spells out `Send` futures.
#![allow(async_fn_in_trait)]

pub mod config;
pub mod error;
pub mod graphql;
pub mod identity;
pub mod permission;
pub mod section;
pub mod store;

pub use crate::config::{AppConfig, Mode, RawConfig, validate};
pub use error::{AuthorizationError, ConfigError, Violation};
pub use identity::{Identity, IdentityReport, Role, Session};
pub use permission::{Permission, PermissionTable};
