//! Step definitions for cucumber tests
//!
//! Re-exports all step definitions for use in tests.

pub mod given;
pub mod when;
pub mod then;
pub mod rift_only;
