//! Tests for the reducer
//!
//! Organized by node kind / feature area

mod cond_tests;
mod enumeration_tests;
mod foreign_tests;
mod helpers;
