//! Darshan Agg
//!
//! Aggregates Darshan I/O profiling logs into Parquet files for
//! downstream analysis.
//!
//! This crate provides the implementation behind the `darshan-agg`
//! CLI tool: reading logs through darshan-util, shaping per-module
//! records into tables, and writing them out as Parquet.
//!
//! ## Getting Started
//!
//! ```bash
//! cargo install darshan-agg
//! darshan-agg /path/to/logs --output parquet/
//! ```

pub mod aggregator;
pub mod commands;
pub mod output;
pub mod reader;
pub mod utils;
