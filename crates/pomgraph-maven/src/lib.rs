//! Maven repository protocol: POM and metadata parsing, repository
//! transport and authentication, the on-disk cache, the coalescing fetch
//! cache, the POM downloader, and loading project trees from disk.

pub mod auth;
pub mod cache;
pub mod coalesce;
pub mod download;
pub mod downloader;
pub mod metadata;
pub mod project;
pub mod transport;
pub mod xml;
