//! Provides input/output for the text files exchanged with the external
//! crystallographic programs.
//!
//! Reports written by XDS (including XPARM.XDS), XSCALE and pointless are parsed through the
//! [`traits::ReportFile`] interface; list-like files the suite both reads and
//! writes (CELLPARM.INP, cells.yaml) implement [`traits::RecordFile`]. Input
//! files for the next processing step (XDS.INP edits, XSCALE.INP, XDSCONV.INP,
//! filelist.txt, cells.csv) have dedicated writers.

pub mod cellparm;
pub mod cells_table;
pub mod cells_yaml;
pub mod correct_lp;
pub mod fields;
pub mod filelist;
pub mod pointless;
pub mod traits;
pub mod xds_ascii;
pub mod xds_inp;
pub mod xparm;
pub mod xscale_inp;
pub mod xscale_lp;
