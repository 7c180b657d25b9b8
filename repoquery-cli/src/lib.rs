//! Repository definition tooling.
//!
//! Loads repository definitions from TOML and compiles them with the core library. The
//! CLI tool (main.rs) uses this library.

pub mod definition;
pub mod report;

pub use definition::{Compiled, Definition};
