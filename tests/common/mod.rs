//! Common test utilities for integration and scenario tests.
//!
//! Helpers for temporary projects with a prompt log and change stores.
//!
//! Note: Each integration test file compiles as a separate crate,
//! so not all helpers are used in every test file. We suppress
//! dead_code warnings at the module level.

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod test_project;

pub use test_project::{TestProject, hashes_at, prompt_block, record, store_at};
