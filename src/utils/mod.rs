//! Utility functions
//!
//! - Geometry (line fitting, angles, quad overlap)
//! - Cooperative deadline checks

/// Cooperative time budget
pub mod deadline;
/// Line fitting, angles and overlap tests
pub mod geometry;
