//! CLI command implementations.

pub mod common;
pub mod download;
pub mod feed;
pub mod init;
