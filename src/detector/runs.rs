/// Row scanner: one image row as alternating bar/space run lengths

/// Length of the white run appended after the last real pixel
///
/// Large enough to satisfy any trailing quiet zone, so finders never have to
/// bounds-check past the end of the row.
pub const SYNTHETIC_WHITE_RUN: u32 = 1 << 20;

/// Alternating run lengths of one row with their start columns
#[derive(Debug, Clone, Default)]
pub struct BarRuns {
    lengths: Vec<u32>,
    starts: Vec<u32>,
    first_black: bool,
}

impl BarRuns {
    /// Empty run buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the pixels of one row; `from_x` is the column of the first pixel
    pub fn scan<I>(&mut self, pixels: I, from_x: usize)
    where
        I: IntoIterator<Item = bool>,
    {
        self.lengths.clear();
        self.starts.clear();
        self.first_black = false;

        let mut current: Option<bool> = None;
        let mut x = from_x as u32;
        for black in pixels {
            if current == Some(black) {
                if let Some(last) = self.lengths.last_mut() {
                    *last += 1;
                }
            } else {
                if current.is_none() {
                    self.first_black = black;
                }
                current = Some(black);
                self.lengths.push(1);
                self.starts.push(x);
            }
            x += 1;
        }

        match current {
            Some(false) => {
                if let Some(last) = self.lengths.last_mut() {
                    *last += SYNTHETIC_WHITE_RUN;
                }
            }
            _ => {
                self.lengths.push(SYNTHETIC_WHITE_RUN);
                self.starts.push(x);
            }
        }
    }

    /// Number of runs, including the synthetic trailing one
    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    /// Whether the last scanned row had no runs
    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }

    /// Whether run `i` is a bar
    pub fn is_black(&self, i: usize) -> bool {
        (i % 2 == 0) == self.first_black
    }

    /// Index of the first bar, if the row has one
    pub fn first_black_index(&self) -> usize {
        if self.first_black { 0 } else { 1 }
    }

    /// Width of run `i` (px)
    pub fn length(&self, i: usize) -> u32 {
        self.lengths[i]
    }

    /// All run widths of the row
    pub fn lengths(&self) -> &[u32] {
        &self.lengths
    }

    /// Column where run `i` begins
    pub fn start(&self, i: usize) -> u32 {
        self.starts[i]
    }

    /// Sum of `count` runs starting at `i`
    pub fn width(&self, i: usize, count: usize) -> u32 {
        self.lengths[i..i + count].iter().sum()
    }
}
