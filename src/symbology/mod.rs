//! Per-symbology collaborators
//!
//! A symbology is a plain value: guard tables, length bounds and a decode
//! function. The detection core never needs to know which one it runs.

use crate::error::{BarcodeError, Result};
use crate::models::{BarcodeRegion, SymbologyKind};

/// EAN-13 / UPC-A
pub mod ean13;
/// Interleaved 2 of 5
pub mod itf;

/// Maps the codewords of one scan line to a payload written into `region`
pub type DecodeFn = fn(&mut BarcodeRegion, &[u32]) -> bool;

/// Element widths (modules, bar first, guards included) for a payload
pub type EncodeFn = fn(&str) -> Option<Vec<u8>>;

/// Guard shapes and symbol length bounds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbologyParams {
    /// Start guard element widths in modules, beginning with a bar
    pub start_pattern: Vec<u8>,
    /// Stop guard element widths in modules, ending with a bar
    pub stop_pattern: Vec<u8>,
    /// Fewest modules a valid symbol spans, guards included
    pub min_modules: usize,
    /// Most modules a valid symbol spans, guards included
    pub max_modules: usize,
}

impl SymbologyParams {
    /// Modules covered by the stop guard
    pub fn stop_modules(&self) -> u32 {
        self.stop_pattern.iter().map(|&w| w as u32).sum()
    }

    /// Start and stop guards read the same in both directions
    pub fn is_mirrored(&self) -> bool {
        !self.start_pattern.is_empty()
            && self.start_pattern.len() == self.stop_pattern.len()
            && self
                .start_pattern
                .iter()
                .zip(self.stop_pattern.iter().rev())
                .all(|(a, b)| a == b)
    }

    /// Reject tables the finders cannot work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| {
            Err(BarcodeError::InvalidSymbology {
                reason: reason.to_string(),
            })
        };
        if self.min_modules == 0 || self.min_modules > self.max_modules {
            return invalid("module bounds must satisfy 0 < min <= max");
        }
        for (name, pattern) in [("start", &self.start_pattern), ("stop", &self.stop_pattern)] {
            if pattern.contains(&0) {
                return invalid(&format!("{name} pattern has a zero-width element"));
            }
            if !pattern.is_empty() && pattern.len() % 2 == 0 && name == "stop" {
                return invalid("stop pattern must begin and end with a bar");
            }
        }
        Ok(())
    }
}

/// A linear symbology plugged into the detection core
#[derive(Debug, Clone)]
pub struct Symbology {
    /// Identifier reported on results
    pub kind: SymbologyKind,
    /// Guard tables and length bounds
    pub params: SymbologyParams,
    /// Payload decoder
    pub decode: DecodeFn,
    /// Payload encoder, when the symbology can render test images
    pub encode: Option<EncodeFn>,
}

impl Symbology {
    /// Element widths for `value`, if this symbology can encode it
    pub fn encode(&self, value: &str) -> Option<Vec<u8>> {
        self.encode.and_then(|f| f(value))
    }
}

/// Every symbology shipped with the crate
pub fn builtin() -> Vec<Symbology> {
    vec![itf::symbology(), ean13::symbology()]
}
