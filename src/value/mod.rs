//! Value type system
//!
//! - **`Value`** - dynamically typed scalar, list or nested row
//! - **`Row`** - ordered named values as returned by a backend
//! - **`TryGetable`** - safe typed extraction with error handling

pub mod row;
pub mod try_getable;
pub mod types;

pub use row::Row;
pub use try_getable::{TryGetable, ValueExtractionError};
pub use types::Value;
