use image::GrayImage;

/// Compact bit matrix holding a bi-level image (true = black)
#[derive(Debug, Clone)]
pub struct BitMatrix {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl BitMatrix {
    /// Create a new all-white bit matrix with given dimensions
    pub fn new(width: usize, height: usize) -> Self {
        let bytes_needed = (width * height).div_ceil(8);
        Self {
            width,
            height,
            data: vec![0; bytes_needed],
        }
    }

    /// Threshold an 8-bit grayscale image: pixels darker than `threshold` become black
    pub fn from_luma(img: &GrayImage, threshold: u8) -> Self {
        let (w, h) = img.dimensions();
        let mut matrix = Self::new(w as usize, h as usize);
        for (x, y, px) in img.enumerate_pixels() {
            if px.0[0] < threshold {
                matrix.set(x as usize, y as usize, true);
            }
        }
        matrix
    }

    /// Get matrix width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get matrix height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get bit at (x, y); out-of-range reads are white
    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        (self.data[byte_index] >> bit_index) & 1 == 1
    }

    /// Signed-coordinate pixel test used by line sampling and edge tracking
    pub fn is_black(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        self.get(x as usize, y as usize)
    }

    /// Copy the pixels of row `y` in `[from_x, to_x)` into `out`
    pub fn row_bits(&self, y: usize, from_x: usize, to_x: usize, out: &mut Vec<bool>) {
        out.clear();
        let to_x = to_x.min(self.width);
        if y >= self.height || from_x >= to_x {
            return;
        }
        out.extend((from_x..to_x).map(|x| self.get(x, y)));
    }

    /// Set bit at (x, y)
    pub fn set(&mut self, x: usize, y: usize, value: bool) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = y * self.width + x;
        let byte_index = index / 8;
        let bit_index = index % 8;
        if value {
            self.data[byte_index] |= 1 << bit_index;
        } else {
            self.data[byte_index] &= !(1 << bit_index);
        }
    }

    /// Clear all bits to white
    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl Default for BitMatrix {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Integer rectangle used as a region of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Width in pixels
    pub width: usize,
    /// Height in pixels
    pub height: usize,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no pixels
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Intersect with an image of the given size
    pub fn clamp_to(&self, width: usize, height: usize) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let right = (self.x + self.width).min(width);
        let bottom = (self.y + self.height).min(height);
        Rect::new(x, y, right - x, bottom - y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_matrix() {
        let mut matrix = BitMatrix::new(8, 8);
        assert_eq!(matrix.width(), 8);
        assert_eq!(matrix.height(), 8);

        matrix.set(3, 4, true);
        assert!(matrix.get(3, 4));
        assert!(matrix.is_black(3, 4));
        assert!(!matrix.get(3, 3));

        matrix.clear();
        assert!(!matrix.get(3, 4));
    }

    #[test]
    fn test_out_of_bounds() {
        let mut matrix = BitMatrix::new(8, 8);
        matrix.set(10, 10, true); // Should not panic
        assert!(!matrix.get(10, 10));
        assert!(!matrix.is_black(-1, 2));
    }

    #[test]
    fn test_row_bits() {
        let mut matrix = BitMatrix::new(6, 2);
        matrix.set(1, 1, true);
        matrix.set(2, 1, true);
        let mut row = Vec::new();
        matrix.row_bits(1, 1, 100, &mut row);
        assert_eq!(row, vec![true, true, false, false, false]);
        matrix.row_bits(5, 0, 6, &mut row);
        assert!(row.is_empty());
    }

    #[test]
    fn test_from_luma() {
        let img = GrayImage::from_raw(2, 1, vec![10, 200]).unwrap();
        let matrix = BitMatrix::from_luma(&img, 128);
        assert!(matrix.get(0, 0));
        assert!(!matrix.get(1, 0));
    }

    #[test]
    fn test_rect_clamp() {
        let r = Rect::new(5, 5, 100, 3).clamp_to(20, 6);
        assert_eq!(r, Rect::new(5, 5, 15, 1));
        assert!(Rect::new(30, 0, 5, 5).clamp_to(20, 20).is_empty());
    }
}
