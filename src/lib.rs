//! Job core of the seaside operations console.
//!
//! A translation job reads a subtitle or text file, cuts it into blocks,
//! groups them into batches, translates the batches concurrently through a
//! remote chat API, and writes the reassembled result next to the source.
//! Every job lives in a [`jobs::JobRegistry`] that pollers can read at any
//! time without blocking the workers.

pub mod cli;
pub mod config;
pub mod deepseek;
pub mod error;
pub mod jobs;
pub mod orchestrator;
pub mod pipeline;
pub mod translator;
pub mod ui;

pub use error::{FallbackReason, SeasideError};
