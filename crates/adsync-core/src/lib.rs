//! Core types and trait definitions for the adsync directory synchroniser.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! Graph client and the storage backends depend on it; it depends on neither.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod course;
pub mod directory;
pub mod enrol;
pub mod error;
pub mod reconcile;
pub mod schedule;
pub mod store;
pub mod user;

pub use error::{Error, Result};
