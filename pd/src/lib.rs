//! ProgressDash - progress control for road-construction groups
//!
//! Loads group records from a tabular store, derives a progress percentage
//! per group, buckets it into a colored severity, and lets an operator record
//! actual length and absorbed funds which are written back to the store.
//!
//! # Modules
//!
//! - [`engine`] - Progress computation and severity classification
//! - [`session`] - Loaded snapshot plus the edit/persist cycle
//! - [`markers`] - Map marker layer, legend and GeoJSON export
//! - [`report`] - Terminal listings and summaries
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`tui`] - Terminal dashboard

pub mod cli;
pub mod config;
pub mod engine;
pub mod markers;
pub mod report;
pub mod session;
pub mod tui;

pub use config::Config;
pub use engine::{ProgressBasis, Severity, apply_edit, classify, compute_progress, recompute};
pub use session::{EditOutcome, Session, SessionError};
