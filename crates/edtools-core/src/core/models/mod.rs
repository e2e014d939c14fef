//! # Core Models Module
//!
//! Data structures shared by every tool in the suite: the crystallographic
//! unit cell, the per-dataset integration summary, and the pairwise data
//! produced by a merge run.
//!
//! ## Key Components
//!
//! - [`cell`] - Validated unit cells, volume computation, axis normalization and angle transforms
//! - [`observation`] - Integration reports and the reduced `Observation` used for clustering
//! - [`merge`] - Correlation entries, merge reports and merged-data statistics
//!
//! All models are created once from parsed reports and are not mutated
//! afterwards; the clustering engine only reads them.

pub mod cell;
pub mod merge;
pub mod observation;
