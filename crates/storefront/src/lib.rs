//! Moda Verse Storefront library.
//!
//! The storefront's state core: a persistent shopping cart, live queries
//! over the document store, and the catalog and order documents built on
//! top of them.
//!
//! - [`cart`] - Cart lines, persistence port and the cart store
//! - [`query`] - Collection query specs and live observations
//! - [`catalog`] - Product documents and listing queries
//! - [`orders`] - Order documents, checkout and dashboard figures
//! - [`archive`] - Orders and catalog edits kept on disk between sessions

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod archive;
pub mod cart;
pub mod catalog;
pub mod config;
pub mod error;
pub mod orders;
pub mod query;
pub mod state;

pub use error::{Result, StorefrontError};
pub use state::AppState;
