//! # Core Module
//!
//! The stateless foundation of the library: data models for unit cells and
//! datasets, the space-group reference table, small numerical helpers, and
//! the readers and writers for every file exchanged with XDS, XSCALE and
//! pointless.
//!
//! ## Architecture
//!
//! - **Data models** ([`models`]) - Unit cells, integration reports, observations and merge reports
//! - **File I/O** ([`io`]) - Report parsers and input-file writers
//! - **Symmetry** ([`symmetry`]) - Space groups, crystal systems and Bravais lattices
//! - **Utilities** ([`utils`]) - Weighted statistics used by cell estimation and summaries
//!
//! Nothing in this module keeps state between calls: every parser returns
//! owned values and every writer takes its input by reference.

pub mod io;
pub mod models;
pub mod symmetry;
pub mod utils;
