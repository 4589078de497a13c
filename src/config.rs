//! Scan configuration
//!
//! One immutable [`ScanConfig`] is built before a decode call and passed by
//! reference into every stage. Tolerances are expressed in modules unless a
//! field says otherwise.

use crate::error::{BarcodeError, Result};
use crate::models::Rect;
use std::time::Duration;

/// Default order in which scan lines are placed across a candidate region
pub const DEFAULT_MID_POINTS: [f32; 8] = [0.5, 0.3, 0.7, 0.4, 0.6, 0.1, 0.9, 0.97];

/// Tolerances and limits for one decode call
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    /// Required white run next to a guard pattern, in modules
    pub min_quiet_zone: f32,
    /// Max horizontal drift (px) between consecutive patterns of one cluster
    ///
    /// The cluster index only reaches half of this to either side, so a guard
    /// edge at `max_barcode_angle` must move less than `max_cluster_distance_x / 2`
    /// columns per `scan_step` rows.
    pub max_cluster_distance_x: usize,
    /// Max row gap between consecutive patterns of one cluster
    pub max_cluster_distance_y: usize,
    /// Patterns a cluster needs to survive finalization (halved for thin modules)
    pub min_cluster_size: usize,
    /// Try the other entries of `mid_points` when the first scan line fails
    pub try_different_lines_of_barcode_region: bool,
    /// Fractional positions along the clusters where scan lines are placed
    pub mid_points: Vec<f32>,
    /// Max per-element deviation from the reference guard, relative to element width
    pub max_pattern_symbol_difference: f32,
    /// Max average deviation from the reference guard
    pub max_pattern_average_symbol_difference: f32,
    /// Guard matches implying a larger module (px) are ignored
    pub max_module_size: f32,
    /// Max angle (degrees) of the start-to-stop axis against the image rows
    pub max_barcode_angle: f32,
    /// Max angle (degrees) between a cluster normal and the start-to-stop axis
    pub max_skew_angle: f32,
    /// Allowed perpendicular drift (px) per scanned row of the opposite cluster
    pub max_skew: f32,
    /// Scan lines with a larger mean quantization error are ignored
    pub max_read_error: f32,
    /// Scan lines with a lower confidence are ignored
    pub min_confidence: f32,
    /// Decodes above this confidence consume their clusters
    pub min_robust_confidence: f32,
    /// Max ratio between start and stop module estimates
    pub max_left_and_right_modules_difference: f32,
    /// Max ratio between neighbouring bars for guards without a reference pattern
    pub max_bar_length_difference: f32,
    /// Smallest start-to-stop distance (px)
    pub min_allowed_barcode_side_size: f32,
    /// Largest start-to-stop distance (px)
    pub max_allowed_barcode_side_size: f32,
    /// Restrict scanning to this rectangle
    pub roi: Option<Rect>,
    /// Allow reading mirrored-guard symbologies from stop to start
    pub reverse_enabled: bool,
    /// Row increment of the scan
    pub scan_step: usize,
    /// Stop pairing once this many barcodes have been accepted
    pub expected_number_of_barcodes: Option<usize>,
    /// Wall-clock budget for one decode call
    pub timeout: Option<Duration>,
    /// Padding (px) applied when testing two results for overlap
    pub duplicate_padding: f32,
    /// Overlapping results below this fraction of the kept confidence are dropped
    pub duplicate_confidence_ratio: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_quiet_zone: 5.0,
            max_cluster_distance_x: 10,
            max_cluster_distance_y: 6,
            min_cluster_size: 5,
            try_different_lines_of_barcode_region: true,
            mid_points: DEFAULT_MID_POINTS.to_vec(),
            max_pattern_symbol_difference: 0.7,
            max_pattern_average_symbol_difference: 0.4,
            max_module_size: 64.0,
            max_barcode_angle: 60.0,
            max_skew_angle: 15.0,
            max_skew: 0.25,
            max_read_error: 0.4,
            min_confidence: 0.3,
            min_robust_confidence: 0.6,
            max_left_and_right_modules_difference: 1.5,
            max_bar_length_difference: 3.0,
            min_allowed_barcode_side_size: 10.0,
            max_allowed_barcode_side_size: 16384.0,
            roi: None,
            reverse_enabled: true,
            scan_step: 2,
            expected_number_of_barcodes: None,
            timeout: None,
            duplicate_padding: 4.0,
            duplicate_confidence_ratio: 0.9,
        }
    }
}

fn parse_env_f32(name: &str, default: f32) -> f32 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<f32>().ok())
        .unwrap_or(default)
}

fn parse_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_env_bool_u8(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u8>().ok())
        .map(|v| v != 0)
        .unwrap_or(default)
}

fn parse_env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

impl ScanConfig {
    /// Defaults with `BARCODE_*` environment overrides applied
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            min_quiet_zone: parse_env_f32("BARCODE_MIN_QUIET_ZONE", d.min_quiet_zone),
            min_cluster_size: parse_env_usize("BARCODE_MIN_CLUSTER_SIZE", d.min_cluster_size),
            scan_step: parse_env_usize("BARCODE_SCAN_STEP", d.scan_step),
            max_read_error: parse_env_f32("BARCODE_MAX_READ_ERROR", d.max_read_error),
            min_confidence: parse_env_f32("BARCODE_MIN_CONFIDENCE", d.min_confidence),
            reverse_enabled: parse_env_bool_u8("BARCODE_REVERSE", d.reverse_enabled),
            try_different_lines_of_barcode_region: parse_env_bool_u8(
                "BARCODE_MULTI_LINE",
                d.try_different_lines_of_barcode_region,
            ),
            expected_number_of_barcodes: parse_env_u64("BARCODE_EXPECTED_COUNT")
                .map(|v| v as usize)
                .filter(|&v| v > 0),
            timeout: parse_env_u64("BARCODE_TIMEOUT_MS").map(Duration::from_millis),
            ..d
        }
    }

    /// Reject values that would make the scan meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.min_quiet_zone > 0.0) {
            return Err(BarcodeError::config("min_quiet_zone", "must be positive"));
        }
        if self.max_cluster_distance_x == 0 {
            return Err(BarcodeError::config("max_cluster_distance_x", "must be at least 1"));
        }
        if self.max_cluster_distance_y == 0 {
            return Err(BarcodeError::config("max_cluster_distance_y", "must be at least 1"));
        }
        if self.scan_step == 0 || self.scan_step > self.max_cluster_distance_y {
            return Err(BarcodeError::config(
                "scan_step",
                format!(
                    "must be in 1..={} (max_cluster_distance_y)",
                    self.max_cluster_distance_y
                ),
            ));
        }
        if self.min_cluster_size == 0 {
            return Err(BarcodeError::config("min_cluster_size", "must be at least 1"));
        }
        if self.mid_points.is_empty() {
            return Err(BarcodeError::config("mid_points", "must not be empty"));
        }
        if self.mid_points.iter().any(|m| !(0.0..=1.0).contains(m)) {
            return Err(BarcodeError::config("mid_points", "entries must lie in [0, 1]"));
        }
        let positive = [
            ("max_pattern_symbol_difference", self.max_pattern_symbol_difference),
            (
                "max_pattern_average_symbol_difference",
                self.max_pattern_average_symbol_difference,
            ),
            ("max_module_size", self.max_module_size),
            ("max_skew_angle", self.max_skew_angle),
            ("max_skew", self.max_skew),
            ("max_read_error", self.max_read_error),
            ("duplicate_confidence_ratio", self.duplicate_confidence_ratio),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(BarcodeError::config(field, "must be positive"));
            }
        }
        if !(self.max_barcode_angle > 0.0 && self.max_barcode_angle <= 90.0) {
            return Err(BarcodeError::config("max_barcode_angle", "must be in (0, 90] degrees"));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(BarcodeError::config("min_confidence", "must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.min_robust_confidence)
            || self.min_robust_confidence < self.min_confidence
        {
            return Err(BarcodeError::config(
                "min_robust_confidence",
                "must lie in [min_confidence, 1]",
            ));
        }
        if !(self.max_left_and_right_modules_difference >= 1.0) {
            return Err(BarcodeError::config(
                "max_left_and_right_modules_difference",
                "ratio must be at least 1",
            ));
        }
        if !(self.max_bar_length_difference >= 1.0) {
            return Err(BarcodeError::config("max_bar_length_difference", "ratio must be at least 1"));
        }
        if !(self.min_allowed_barcode_side_size >= 0.0
            && self.min_allowed_barcode_side_size < self.max_allowed_barcode_side_size)
        {
            return Err(BarcodeError::config(
                "min_allowed_barcode_side_size",
                "must be non-negative and below max_allowed_barcode_side_size",
            ));
        }
        if self.duplicate_confidence_ratio > 1.0 {
            return Err(BarcodeError::config("duplicate_confidence_ratio", "must not exceed 1"));
        }
        if !(self.duplicate_padding >= 0.0) {
            return Err(BarcodeError::config("duplicate_padding", "must not be negative"));
        }
        if self.roi.is_some_and(|r| r.is_empty()) {
            return Err(BarcodeError::config("roi", "must cover at least one pixel"));
        }
        Ok(())
    }

    /// Scan lines to try for one region, honouring the multi-line switch
    pub fn active_mid_points(&self) -> &[f32] {
        if self.try_different_lines_of_barcode_region {
            &self.mid_points
        } else {
            &self.mid_points[..1]
        }
    }
}
