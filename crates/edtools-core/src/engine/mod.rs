//! # Engine Module
//!
//! The clustering core and the machinery around it.
//!
//! ## Architecture
//!
//! - **Distances** ([`distance`]) - Condensed distance matrices from unit cells or pairwise correlations
//! - **Linkage** ([`linkage`]) - Agglomerative merge trees and the flat cut at a distance threshold
//! - **Grouping** ([`grouping`]) - Size filtering and per-group summaries
//! - **Threshold Selection** ([`threshold`]) - Cut-height state for dendrogram inspection
//! - **Batch Execution** ([`batch`]) - Bounded worker pool for independent per-dataset jobs
//! - **Configuration** ([`config`]) - Linkage methods, metrics and run parameters
//! - **Progress Monitoring** ([`progress`]) - Progress reporting hooks
//! - **Error Handling** ([`error`]) - Engine error taxonomy
//!
//! Distance construction, linkage and cutting are single-threaded and pure;
//! only [`batch`] runs work concurrently.

pub mod batch;
pub mod config;
pub mod distance;
pub mod error;
pub mod grouping;
pub mod linkage;
pub mod progress;
pub mod threshold;
