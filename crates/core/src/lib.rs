//! CraftDrop Core Types
//!
//! This crate defines the fundamental data structures shared by every
//! CraftDrop crate: keys, hashes, entitlements, codecs, and the
//! distributor configuration passed to each call site.

mod config;
mod error;
mod types;

pub use config::*;
pub use error::*;
pub use types::*;
