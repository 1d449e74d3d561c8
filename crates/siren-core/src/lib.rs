//! Core types and dispatch logic for the Siren dispatch service.
//!
//! This crate has no HTTP or database dependencies. Storage
//! backends implement [`store::DispatchStore`]; routing services implement
//! [`eta::EtaOracle`]; the HTTP layer supplies identity resolution through
//! [`identity::IdentityService`].

// Trait methods return explicit `impl Future + Send`; impls use `async fn`.
#![allow(async_fn_in_trait)]

pub mod assignment;
pub mod dispatch;
pub mod error;
pub mod eta;
pub mod identity;
pub mod location;
pub mod media;
pub mod notify;
pub mod party;
pub mod registry;
pub mod store;

pub use error::{Error, Result};

#[cfg(test)]
mod fakes;
