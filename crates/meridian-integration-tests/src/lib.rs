//! Integration test crate for the Meridian oracle engine.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end oracle flows across multiple workspace crates.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p meridian-integration-tests
//! ```
