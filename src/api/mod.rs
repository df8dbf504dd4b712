//! API Module
//!
//! REST boundary exposing the registry operations over HTTP.

pub mod rest;
pub mod server;

pub use rest::*;
pub use server::*;
