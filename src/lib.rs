//! Crucible - reproducible, cached Rust build environments
//!
//! Provisions a layered container environment (base image + toolchain +
//! mounted source and caches) and runs check/format operations against
//! it through an abstract container engine.

pub mod cli;
pub mod config;
pub mod engine;
pub mod environment;
pub mod error;
pub mod ops;
pub mod provision;

pub use error::{CrucibleError, CrucibleResult};
