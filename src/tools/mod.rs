//! Synthetic barcode rendering and image I/O helpers for tests and benchmarks

use crate::models::{BitMatrix, Point};
use crate::symbology::Symbology;
use image::{GrayImage, Luma};
use std::path::Path;

/// Geometry of a rendered symbol
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Module width (px)
    pub module: f32,
    /// Counter-clockwise rotation in image coordinates (degrees)
    pub angle_deg: f32,
    /// White space on both ends of the symbol (modules)
    pub quiet_modules: f32,
    /// Bar height (px)
    pub bar_height: f32,
    /// Extra white border around the rotated symbol (px)
    pub margin: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            module: 3.0,
            angle_deg: 0.0,
            quiet_modules: 10.0,
            bar_height: 60.0,
            margin: 8,
        }
    }
}

impl RenderOptions {
    fn symbol_length(&self, widths: &[u8]) -> f32 {
        widths.iter().map(|&w| w as f32).sum::<f32>() * self.module
    }

    /// Size of an image that holds the rotated symbol with its quiet zones
    pub fn canvas_size(&self, widths: &[u8]) -> (usize, usize) {
        let length = self.symbol_length(widths) + 2.0 * self.quiet_modules * self.module;
        let (sin, cos) = self.angle_deg.to_radians().sin_cos();
        let w = length * cos.abs() + self.bar_height * sin.abs();
        let h = length * sin.abs() + self.bar_height * cos.abs();
        (
            w.ceil() as usize + 2 * self.margin,
            h.ceil() as usize + 2 * self.margin,
        )
    }
}

/// Paint element widths (bar first) centred at `centre` onto `image`
pub fn paint(image: &mut BitMatrix, widths: &[u8], opts: &RenderOptions, centre: Point) {
    let length = opts.symbol_length(widths);
    let mut edges = Vec::with_capacity(widths.len());
    let mut acc = 0.0f32;
    for &w in widths {
        acc += w as f32 * opts.module;
        edges.push(acc);
    }

    // Image y grows downwards, so a positive angle turns the axis upwards
    let (sin, cos) = (-opts.angle_deg).to_radians().sin_cos();
    for y in 0..image.height() {
        for x in 0..image.width() {
            let d = Point::new(x as f32 + 0.5, y as f32 + 0.5) - centre;
            let u = d.x * cos + d.y * sin + length / 2.0;
            let v = -d.x * sin + d.y * cos + opts.bar_height / 2.0;
            if !(0.0..length).contains(&u) || !(0.0..opts.bar_height).contains(&v) {
                continue;
            }
            let element = edges.partition_point(|&e| e <= u);
            if element % 2 == 0 {
                image.set(x, y, true);
            }
        }
    }
}

/// Render one symbol on a fresh canvas sized to fit it
pub fn render_widths(widths: &[u8], opts: &RenderOptions) -> BitMatrix {
    let (w, h) = opts.canvas_size(widths);
    let mut image = BitMatrix::new(w, h);
    paint(&mut image, widths, opts, Point::new(w as f32 / 2.0, h as f32 / 2.0));
    image
}

/// Encode `value` with `symbology` and render it
pub fn render(symbology: &Symbology, value: &str, opts: &RenderOptions) -> Option<BitMatrix> {
    let widths = symbology.encode(value)?;
    Some(render_widths(&widths, opts))
}

/// 8-bit view of a bit matrix, black = 0
pub fn to_luma(matrix: &BitMatrix) -> GrayImage {
    GrayImage::from_fn(matrix.width() as u32, matrix.height() as u32, |x, y| {
        if matrix.get(x as usize, y as usize) {
            Luma([0])
        } else {
            Luma([255])
        }
    })
}

/// Load any image file and threshold its luminance
pub fn load_bitmatrix<P: AsRef<Path>>(path: P, threshold: u8) -> Result<BitMatrix, image::ImageError> {
    let img = image::open(path)?.to_luma8();
    Ok(BitMatrix::from_luma(&img, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbology::itf;

    fn row(matrix: &BitMatrix, y: usize) -> String {
        (0..matrix.width())
            .map(|x| if matrix.get(x, y) { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn test_axis_aligned_layout() {
        let opts = RenderOptions {
            module: 2.0,
            quiet_modules: 2.0,
            bar_height: 4.0,
            margin: 1,
            ..RenderOptions::default()
        };
        let image = render_widths(&[1, 1, 3], &opts);
        // 5 modules of symbol, 2 quiet modules each side, 1 px margin
        assert_eq!(image.width(), 20);
        assert_eq!(image.height(), 6);
        assert_eq!(row(&image, 2), "00000110011111100000");
        assert_eq!(row(&image, 0), "0".repeat(20));
    }

    #[test]
    fn test_rotated_canvas_grows() {
        let widths = itf::encode("1234").unwrap();
        let flat = RenderOptions::default().canvas_size(&widths);
        let tilted = RenderOptions {
            angle_deg: 15.0,
            ..RenderOptions::default()
        }
        .canvas_size(&widths);
        assert!(tilted.1 > flat.1);
        assert!(tilted.0 < flat.0 + 20);
    }

    #[test]
    fn test_png_round_trip() {
        let image = render(&itf::symbology(), "42", &RenderOptions::default()).unwrap();
        let path = std::env::temp_dir().join(format!("linear_barcode_{}.png", std::process::id()));
        to_luma(&image).save(&path).unwrap();
        let loaded = load_bitmatrix(&path, 128).unwrap();
        let _ = std::fs::remove_file(&path);
        assert_eq!(loaded.width(), image.width());
        for y in 0..image.height() {
            assert_eq!(row(&loaded, y), row(&image, y));
        }
    }
}
