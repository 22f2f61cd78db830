//! Topograph - versioned network topology ingestion
//!
//! Ingests polled device snapshots into a relational store, one event per
//! run, and publishes each fully ingested event by repointing a single root
//! row.

pub mod config;
pub mod ingest;
pub mod interfaces;
pub mod snapshot;
pub mod storage;
pub mod topology;
pub mod utils;
