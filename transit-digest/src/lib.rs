//! Transit network digestion.
//!
//! Turns a bus agency's published sources (CSV exports, a GTFS archive
//! and scraped HTML pages) into one consistent network of lines, stops,
//! connections and timetables.

pub mod builder;
pub mod config;
pub mod domain;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod schedule;
pub mod snapshot;
pub mod source;
pub mod validate;

#[cfg(test)]
mod pipeline_tests;

pub use error::DigestError;
