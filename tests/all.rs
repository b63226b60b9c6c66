//! Integration test aggregator
//!
//! This file serves as the entry point for the `steward-core` integration tests.
//! Individual test modules are declared in `suite/mod.rs`.

mod common;
mod suite;
