//! Domain Module
//!
//! Core identity and value types shared by the registry and its callers.

pub mod types;

pub use types::*;
