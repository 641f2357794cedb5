//! Shared utilities for the pomgraph resolver.
//!
//! This crate provides the cross-cutting error type used by every other
//! pomgraph crate for failures that abort an operation outright, and the
//! status-line helpers the binary prints progress with.

pub mod errors;
pub mod progress;
