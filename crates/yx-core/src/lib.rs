//! YX protocol engine.
//!
//! Wraps `yx-proto`'s wire types and `yx-crypto`'s primitives into the
//! stateful pieces a running peer needs: key lookup, replay protection,
//! rate limiting, chunk reassembly, delivery deduplication, and the
//! sender/receiver pipelines that tie all of it together.
//!
//! This crate has no transport of its own; `yx-transport` hands it raw
//! datagrams and takes raw datagrams back out.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod binary;
pub mod config;
pub mod dedup;
pub mod env;
pub mod error;
pub mod forensic;
pub mod keystore;
pub mod metrics;
pub mod pipeline;
pub mod rate_limit;
pub mod reassembly;
pub mod replay;
pub mod router;
pub mod sequence;
pub mod text;

pub use config::YxConfig;
pub use env::{Environment, SystemEnvironment};
pub use error::{Result, YxError};
pub use keystore::KeyStore;
pub use metrics::{Counters, CountersSnapshot};
pub use pipeline::{ApplicationCallback, Delivery, DeliveredPayload, ReceiverPipeline, SenderPipeline};
