//! # Workflows Module
//!
//! End-to-end procedures that tie the [`core`](crate::core) parsers and
//! models to the [`engine`](crate::engine) clustering machinery. Each
//! workflow is a plain function (plus small result types) that the command
//! line front end calls directly.
//!
//! - **Consolidation** ([`consolidate`]) - Parse a batch of integration reports and rank lattices
//! - **Unit-cell clustering** ([`cell_clustering`]) - Group datasets by cell similarity
//! - **Correlation clustering** ([`correlation_clustering`]) - Group datasets by pairwise correlation and prepare per-cluster scaling
//! - **Cell estimation** ([`cell_estimate`]) - Robust weighted mean cell
//! - **Merge planning** ([`merge_plan`]) - Cell and space group for a batch merge

pub mod cell_clustering;
pub mod cell_estimate;
pub mod consolidate;
pub mod correlation_clustering;
pub mod merge_plan;
