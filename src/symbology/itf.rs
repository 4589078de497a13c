use super::{Symbology, SymbologyParams};
use crate::models::{BarcodeRegion, SymbologyKind};

const NARROW: u8 = 1;
const WIDE: u8 = 3;
const START: [u8; 4] = [1, 1, 1, 1];
const STOP: [u8; 3] = [3, 1, 1];
const PAIR_ELEMENTS: usize = 10;

/// Narrow/wide layout of each digit, five elements
const DIGITS: [[bool; 5]; 10] = [
    [false, false, true, true, false],
    [true, false, false, false, true],
    [false, true, false, false, true],
    [true, true, false, false, false],
    [false, false, true, false, true],
    [true, false, true, false, false],
    [false, true, true, false, false],
    [false, false, false, true, true],
    [true, false, false, true, false],
    [false, true, false, true, false],
];

/// Interleaved 2 of 5 with the default length bounds
pub fn symbology() -> Symbology {
    Symbology {
        kind: SymbologyKind::Itf,
        params: SymbologyParams {
            start_pattern: START.to_vec(),
            stop_pattern: STOP.to_vec(),
            min_modules: 27,
            max_modules: 1000,
        },
        decode,
        encode: Some(encode),
    }
}

fn digit_of(widths: [u32; 5]) -> Option<u8> {
    let pattern = widths.map(|w| w >= 2);
    DIGITS.iter().position(|d| *d == pattern).map(|d| d as u8)
}

/// Decode codewords laid out as start, digit pairs, stop
pub fn decode(region: &mut BarcodeRegion, codewords: &[u32]) -> bool {
    let n = codewords.len();
    if n < START.len() + STOP.len() + PAIR_ELEMENTS {
        return false;
    }
    let body = n - START.len() - STOP.len();
    if body % PAIR_ELEMENTS != 0 {
        return false;
    }
    if codewords[..START.len()].iter().any(|&w| w != 1) {
        return false;
    }
    let stop = &codewords[n - STOP.len()..];
    if stop[0] < 2 || stop[1] != 1 || stop[2] != 1 {
        return false;
    }

    let mut value = String::with_capacity(body / 5);
    for pair in codewords[START.len()..n - STOP.len()].chunks_exact(PAIR_ELEMENTS) {
        let bars = [pair[0], pair[2], pair[4], pair[6], pair[8]];
        let spaces = [pair[1], pair[3], pair[5], pair[7], pair[9]];
        let (Some(first), Some(second)) = (digit_of(bars), digit_of(spaces)) else {
            return false;
        };
        value.push(char::from(b'0' + first));
        value.push(char::from(b'0' + second));
    }

    region.value = value;
    true
}

/// Element widths for an even-length string of digits
pub fn encode(value: &str) -> Option<Vec<u8>> {
    let digits: Vec<usize> = value
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as usize))
        .collect::<Option<_>>()?;
    if digits.is_empty() || digits.len() % 2 != 0 {
        return None;
    }

    let width = |wide: bool| if wide { WIDE } else { NARROW };
    let mut widths = START.to_vec();
    for pair in digits.chunks_exact(2) {
        for (bar, space) in DIGITS[pair[0]].iter().zip(DIGITS[pair[1]].iter()) {
            widths.push(width(*bar));
            widths.push(width(*space));
        }
    }
    widths.extend_from_slice(&STOP);
    Some(widths)
}
