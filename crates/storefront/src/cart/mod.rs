//! Shopping cart with durable persistence.
//!
//! - [`line`] - Cart lines and the product snapshot they carry
//! - [`storage`] - The [`CartStorage`] port and its file/memory slots
//! - [`store`] - [`CartStore`], the operations and derived totals

pub mod line;
pub mod storage;
pub mod store;

pub use line::{CartLine, ProductSnapshot};
pub use storage::{CartStorage, FileCartStorage, MemoryCartStorage, StorageError};
pub use store::{CartSettings, CartStore, DEFAULT_MAX_LINE_QUANTITY};
