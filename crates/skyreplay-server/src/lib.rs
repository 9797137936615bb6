//! Ingest side of skyreplay: configuration, the upstream feed client and the
//! poller that turns feed snapshots into stored, airspace-annotated batches.
//!
//! The `skyreplay` binary wires these together with the HTTP API from
//! `skyreplay-api`.

pub mod config;
pub mod feed;
pub mod poller;

pub use config::ServerConfig;

#[cfg(test)]
mod test_support;
