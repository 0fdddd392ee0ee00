//! Core types, rules and services for the Incidencias incident tracker.
//!
//! This crate is free of HTTP and database dependencies. Storage backends
//! implement [`store::IncidentStore`]; the HTTP layer and the terminal client
//! build on the services and pure functions defined here.

// Native `async fn` in traits; the store trait spells out `Send` futures
// explicitly, so the advisory lint is noise here.
#![allow(async_fn_in_trait)]

pub mod auth;
pub mod credential;
pub mod dashboard;
pub mod error;
pub mod filter;
pub mod incident;
pub mod service;
pub mod store;
pub mod user;

#[cfg(test)]
mod memory;

pub use error::{Error, Result};
