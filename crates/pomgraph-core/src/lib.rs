//! Core data types for the pomgraph resolver.
//!
//! This crate defines the requested (as-written) POM model, Maven coordinates,
//! dependency scopes and classpaths, repository declarations, settings
//! lookups, the property interpolator, the failure taxonomy shared by every
//! resolution stage, and user configuration.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod failure;
pub mod gav;
pub mod pom;
pub mod properties;
pub mod repository;
pub mod scope;
pub mod settings;
