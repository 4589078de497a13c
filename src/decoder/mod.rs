//! Barcode decoding
//!
//! - Line sampling into module counts
//! - Multi-line, bidirectional decode attempts per candidate
//! - Edge tracking to tighten region corners

/// Line-sampling primitive and its run-length implementation
pub mod line_reader;
/// Decode orchestration for one candidate region
pub mod region;
