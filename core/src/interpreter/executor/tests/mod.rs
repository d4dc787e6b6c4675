//! Tests for the executor
//!
//! Organized by feature area

mod helpers;

mod error_tests;
mod limit_tests;
