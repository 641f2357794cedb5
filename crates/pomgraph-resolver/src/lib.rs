//! Resolution engine: Maven version ordering and selectors, profile
//! activation, the POM model merger producing [`resolved::ResolvedPom`],
//! the nearest-wins dependency graph resolver, and reactor ordering.

pub mod comparator;
pub mod conflict;
pub mod graph;
pub mod merger;
pub mod profile;
pub mod reactor;
pub mod resolved;
pub mod resolver;
pub mod version;
