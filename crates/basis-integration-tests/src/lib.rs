//! Integration test crate for the staking ledger.
//!
//! This crate has no library code. It only contains integration tests
//! that run end-to-end staking flows across the ledger, the in-memory
//! asset and the access roles.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p basis-integration-tests
//! ```
