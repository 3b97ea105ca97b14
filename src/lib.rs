//! tasklog - report logs and task dashboard backend
//!
//! Serves the report-log API over a JSON file store with file attachments,
//! and provides the typed client and list views used against the remote
//! task/staff backend.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod extractor;
pub mod filter;
pub mod models;
pub mod remote;
pub mod reports;
pub mod session;
pub mod store;
pub mod views;
