//! # solclone-common
//!
//! Shared types, error definitions, the run-scoped template dictionary,
//! configuration models, and constants used across the solclone workspace.
//!
//! This crate is the leaf of the dependency graph: it depends on no other
//! internal crate and provides the primitives that the templatizer and the
//! deployment scheduler both build upon.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod dictionary;
pub mod error;
pub mod types;
