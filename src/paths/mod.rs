//! # Introduction paths
//!
//! `PathFinder` asks the store for seed → target paths and scores them
//! with `PathScorer`; `SegmentScorer` gives the per-hop view of the same
//! weighting.

pub mod finder;
pub mod scorer;

pub use finder::{normalize_scores, rank, PathFinder, PathMetadata, ScoredPath};
pub use scorer::{PathFactors, PathScorer, SegmentScore, SegmentScorer};
