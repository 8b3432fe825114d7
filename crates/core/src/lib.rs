//! Moda Verse Core - Shared types library.
//!
//! This crate provides common types used across all Moda Verse components:
//! - `storefront` - Cart store, live collection queries, catalog and orders
//! - `cli` - Command-line front end over the storefront library
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access,
//! no subscriptions. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
