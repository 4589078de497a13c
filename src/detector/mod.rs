//! Barcode localization
//!
//! - Row scanning into bar/space runs
//! - Guard pattern matching with a quiet-zone check
//! - Online clustering of matches across rows
//! - Start/stop pairing with geometric validation

/// Start/stop pairing and validation
pub mod candidate;
/// Clustering of guard matches across rows
pub mod cluster;
/// Guard pattern finders
pub mod pattern;
/// Row scanner
pub mod runs;
