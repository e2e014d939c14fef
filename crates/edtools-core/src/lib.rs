//! # edtools
//!
//! Processing helpers for serial electron-diffraction data: readers for the
//! reports written by XDS, XSCALE and pointless, writers for their input
//! files, and hierarchical clustering of datasets by unit-cell similarity or
//! by pairwise correlation.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Stateless data models (`UnitCell`, `Observation`,
//!   `MergeReport`), the space-group table, statistics helpers and all file I/O.
//!
//! - **[`engine`]: The Logic Core.** Distance matrices, linkage trees, flat cuts, group
//!   summaries, threshold selection and the bounded batch pool.
//!
//! - **[`workflows`]: The Public API.** Complete procedures (consolidation, cell and
//!   correlation clustering, cell estimation, merge planning) built from the two layers below.

pub mod core;
pub mod engine;
pub mod workflows;
