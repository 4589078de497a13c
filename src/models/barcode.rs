use super::Point;
use std::fmt;

/// Linear symbology identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbologyKind {
    /// Interleaved 2 of 5
    Itf,
    /// EAN-13 / UPC-A product code
    Ean13,
    /// Externally supplied symbology, identified by name
    Custom(&'static str),
}

impl fmt::Display for SymbologyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbologyKind::Itf => f.write_str("ITF"),
            SymbologyKind::Ean13 => f.write_str("EAN-13"),
            SymbologyKind::Custom(name) => f.write_str(name),
        }
    }
}

/// Working state of one candidate while it is being decoded
///
/// Corners are ordered start-top, stop-top, stop-bottom, start-bottom where
/// "top" is the end of the guard clusters with the smaller row index.
#[derive(Debug, Clone)]
pub struct BarcodeRegion {
    /// Quadrilateral in image coordinates
    pub corners: [Point; 4],
    /// Decode confidence; 0 until a decode attempt succeeds
    pub confidence: f32,
    /// Payload written by the symbology decoder
    pub value: String,
    /// Codewords of the accepted scan line
    pub codewords: Vec<u32>,
    /// The accepted scan line ran from the stop guard to the start guard
    pub reversed: bool,
}

impl BarcodeRegion {
    /// Fresh region with zero confidence
    pub fn new(corners: [Point; 4], reversed: bool) -> Self {
        Self {
            corners,
            confidence: 0.0,
            value: String::new(),
            codewords: Vec::new(),
            reversed,
        }
    }

    /// Whether a decode attempt has succeeded on this region
    pub fn is_decoded(&self) -> bool {
        self.confidence > 0.0
    }
}

/// Detected linear barcode
#[derive(Debug, Clone)]
pub struct FoundBarcode {
    /// Symbology that decoded the payload
    pub symbology: SymbologyKind,
    /// Decoded payload
    pub value: String,
    /// Corner points in image coordinates (closed quad)
    pub polygon: [Point; 4],
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Codewords read along the accepted scan line
    pub raw_data: Option<Vec<u32>>,
}

impl FoundBarcode {
    /// Build the external result from a decoded region
    ///
    /// Returns `None` when the region was never decoded.
    pub fn from_region(symbology: SymbologyKind, region: BarcodeRegion) -> Option<Self> {
        if !region.is_decoded() {
            return None;
        }
        let raw_data = if region.codewords.is_empty() {
            None
        } else {
            Some(region.codewords)
        };
        Some(Self {
            symbology,
            value: region.value,
            polygon: region.corners,
            confidence: region.confidence.clamp(0.0, 1.0),
            raw_data,
        })
    }

    /// Top-left corner of the axis-aligned bounding box
    pub fn top_left(&self) -> Point {
        let x = self.polygon.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let y = self.polygon.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        Point::new(x, y)
    }

    /// Physical extent of the symbol: the longer quad diagonal
    pub fn span(&self) -> f32 {
        let d1 = self.polygon[0].distance(&self.polygon[2]);
        let d2 = self.polygon[1].distance(&self.polygon[3]);
        d1.max(d2)
    }
}
