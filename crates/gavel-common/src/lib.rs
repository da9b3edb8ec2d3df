//! Gavel Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the Gavel workspace members:
//!
//! - **Logging**: `tracing` subscriber setup with console/file targets
//! - **Checksums**: SHA-256 helpers backing the export content digest

pub mod checksum;
pub mod logging;
