/// Symbology kinds, regions and results
pub mod barcode;
/// Bit image and rectangle
pub mod matrix;
/// 2-D point
pub mod point;

pub use barcode::{BarcodeRegion, FoundBarcode, SymbologyKind};
pub use matrix::{BitMatrix, Rect};
pub use point::Point;
