//! Core types and trait definitions for skyreplay.
//!
//! This crate is deliberately free of HTTP and database dependencies. It holds
//! the sample model, the [`store::SampleStore`] abstraction, the filter
//! composer and the snapshot resolver that turns an evenly spaced playback
//! grid into frames backed by real collected samples.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod controller;
pub mod error;
pub mod filter;
pub mod sample;
pub mod snapshot;
pub mod store;

pub use error::{Error, Result};
