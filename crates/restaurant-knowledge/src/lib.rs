//! `restaurant-knowledge` - notes on restaurants, kept as one JSON document
//!
//! This library provides the record model, the local-disk and remote
//! repository backends, the record operations, the preview image lookup and
//! the HTTP application that serves them.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod cli;
pub mod config;
pub mod contents;
pub mod error;
pub mod logging;
pub mod record;
pub mod server;
pub mod service;
pub mod storage;
pub mod thumbnail;
pub mod web;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::{Record, RecordInput};
pub use service::RecordService;
pub use storage::{open_store, RecordStore, StorageMode};
pub use thumbnail::ThumbnailResolver;
