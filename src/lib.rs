//! Channel post archiver library.
//!
//! A service that consumes posts broadcast on a messaging channel,
//! classifies them, stores them idempotently, and serves paginated,
//! filtered, and aggregate queries over the archive.

pub mod classifier;
pub mod config;
pub mod db;
pub mod ingest;
pub mod query;
pub mod storage;
pub mod web;
