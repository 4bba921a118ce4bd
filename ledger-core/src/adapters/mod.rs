//! Adapter implementations
//!
//! Concrete implementations of the port traits.

pub mod duckdb;
pub mod locks;
