//! linear_barcode - Linear (1-D) barcode localization and decoding
//!
//! Finds start/stop guard patterns row by row in a bi-level image, clusters
//! them across rows, pairs start and stop clusters into candidate regions and
//! decodes them along several scan lines. Rotation up to the configured axis
//! angle, modest skew and print noise are tolerated.
//!
//! ```no_run
//! use linear_barcode::{BitMatrix, detect};
//!
//! let image = BitMatrix::new(640, 480);
//! for code in detect(&image).unwrap_or_default() {
//!     println!("{} {}", code.symbology, code.value);
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Result aggregation (duplicate suppression, ordering)
pub mod aggregate;
/// Scan configuration
pub mod config;
/// Line sampling and region decode orchestration
pub mod decoder;
/// Row scanning, guard finders, clustering and candidate validation
pub mod detector;
/// Error types
pub mod error;
/// Core data structures (BitMatrix, Point, FoundBarcode, etc.)
pub mod models;
/// Single-symbology detection pipeline
pub mod pipeline;
/// Per-symbology guard tables and decoders
pub mod symbology;
/// Synthetic rendering and image helpers
pub mod tools;
/// Geometry and deadline helpers
pub mod utils;

pub use config::ScanConfig;
pub use decoder::line_reader::{LineRead, LineReader, RunLengthLineReader};
pub use error::{BarcodeError, Result};
pub use models::{BitMatrix, FoundBarcode, Point, Rect, SymbologyKind};
pub use pipeline::BarcodeReader;
pub use symbology::{Symbology, SymbologyParams};

use aggregate::ResultAggregator;
use image::GrayImage;
use utils::deadline::Deadline;

/// Luminance below which a pixel counts as black in [`detect_from_luma`]
pub const DEFAULT_LUMA_THRESHOLD: u8 = 128;

/// Detect barcodes of every built-in symbology with the default configuration
pub fn detect(image: &BitMatrix) -> Result<Vec<FoundBarcode>> {
    detect_with_config(image, &ScanConfig::default())
}

/// Detect barcodes of every built-in symbology
///
/// All symbologies share one time budget and one result list, so overlapping
/// reads from different symbologies are resolved like any other duplicate.
pub fn detect_with_config(image: &BitMatrix, config: &ScanConfig) -> Result<Vec<FoundBarcode>> {
    let deadline = Deadline::start(config.timeout);
    let mut aggregator = ResultAggregator::new(config.duplicate_padding, config.duplicate_confidence_ratio);
    for symbology in symbology::builtin() {
        let reader = BarcodeReader::new(symbology, config.clone())?;
        reader.detect_into(image, &mut aggregator, &deadline)?;
    }
    Ok(aggregator.finish())
}

/// Threshold a grayscale image at [`DEFAULT_LUMA_THRESHOLD`] and detect
pub fn detect_from_luma(image: &GrayImage) -> Result<Vec<FoundBarcode>> {
    detect(&BitMatrix::from_luma(image, DEFAULT_LUMA_THRESHOLD))
}
