//! Threshold selection state for inspecting a dendrogram.
//!
//! The selector only holds the tree and the current cut height; every
//! recomputation is a pure function of the two, so a front end can redraw
//! as often as it likes.

use super::error::EngineError;
use super::linkage::{ClusterAssignment, LinkageTree, round_to};
use std::fmt::Write;

pub struct ThresholdSelector<'a> {
    tree: &'a LinkageTree,
    threshold: f64,
}

impl<'a> ThresholdSelector<'a> {
    /// Starts at `initial`, or at the tree's default cutoff when `None`.
    pub fn new(tree: &'a LinkageTree, initial: Option<f64>) -> Self {
        let threshold = initial.map_or_else(|| tree.default_cutoff(), |t| round_to(t, 4));
        Self { tree, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn tree(&self) -> &LinkageTree {
        self.tree
    }

    /// Moves the cut to height `y` (rounded to 4 decimals) and returns the
    /// new assignment. The previous threshold is kept if `y` is invalid.
    pub fn select(&mut self, y: f64) -> Result<ClusterAssignment, EngineError> {
        let threshold = round_to(y, 4);
        let assignment = self.tree.cut(threshold)?;
        self.threshold = threshold;
        Ok(assignment)
    }

    pub fn recompute(&self) -> Result<ClusterAssignment, EngineError> {
        self.tree.cut(self.threshold)
    }

    /// Text rendition of the merge sequence with the current cut marked.
    pub fn render(&self) -> String {
        render_dendrogram(self.tree, self.threshold)
    }
}

fn node_label(n: usize, id: usize) -> String {
    if id < n {
        format!("{}", id + 1)
    } else {
        format!("#{}", id - n + 1)
    }
}

/// Lists every merge (observations numbered from 1, merged clusters as
/// `#k`) and flags merges that lie above `threshold`.
pub fn render_dendrogram(tree: &LinkageTree, threshold: f64) -> String {
    let n = tree.leaves();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Linkage: {} ({} observations), cut at {:.4}",
        tree.method(),
        n,
        threshold
    );
    let _ = writeln!(out, "  merge      left     right    distance   size");
    let cut_line = format!("  {:-^48}", format!(" cut {:.4} ", threshold));
    let mut cut_drawn = false;
    for (k, merge) in tree.merges().iter().enumerate() {
        if !cut_drawn && merge.distance > threshold {
            let _ = writeln!(out, "{cut_line}");
            cut_drawn = true;
        }
        let _ = writeln!(
            out,
            "  {:>5} {:>9} {:>9} {:>11.4} {:>6}",
            format!("#{}", k + 1),
            node_label(n, merge.left),
            node_label(n, merge.right),
            merge.distance,
            merge.size
        );
    }
    // Every merge lies below the threshold: the cut sits above the root.
    if !cut_drawn {
        let _ = writeln!(out, "{cut_line}");
    }
    if let Ok(assignment) = tree.cut(threshold) {
        let _ = writeln!(out, "{} clusters at this cut:", assignment.cluster_count());
        for (label, members) in assignment.clusters() {
            let members: Vec<String> = members.iter().map(|i| (i + 1).to_string()).collect();
            let _ = writeln!(out, "  {:>3}: {}", label, members.join(" "));
        }
    }
    out
}
