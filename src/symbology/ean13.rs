use super::{Symbology, SymbologyParams};
use crate::models::{BarcodeRegion, SymbologyKind};

const GUARD: [u8; 3] = [1, 1, 1];
const CENTRE: [u8; 5] = [1, 1, 1, 1, 1];
const ELEMENTS: usize = 59;
const LEFT_FROM: usize = 3;
const RIGHT_FROM: usize = 32;

/// Odd-parity ("L") element widths, space first; R codes share them bar first
const L_CODES: [[u8; 4]; 10] = [
    [3, 2, 1, 1],
    [2, 2, 2, 1],
    [2, 1, 2, 2],
    [1, 4, 1, 1],
    [1, 1, 3, 2],
    [1, 2, 3, 1],
    [1, 1, 1, 4],
    [1, 3, 1, 2],
    [1, 2, 1, 3],
    [3, 1, 1, 2],
];

/// Parity of the six left digits (true = even "G" code) for each leading digit
const FIRST_DIGIT_PARITY: [[bool; 6]; 10] = [
    [false, false, false, false, false, false],
    [false, false, true, false, true, true],
    [false, false, true, true, false, true],
    [false, false, true, true, true, false],
    [false, true, false, false, true, true],
    [false, true, true, false, false, true],
    [false, true, true, true, false, false],
    [false, true, false, true, false, true],
    [false, true, false, true, true, false],
    [false, true, true, false, true, false],
];

/// EAN-13 with its fixed 95-module length
pub fn symbology() -> Symbology {
    Symbology {
        kind: SymbologyKind::Ean13,
        params: SymbologyParams {
            start_pattern: GUARD.to_vec(),
            stop_pattern: GUARD.to_vec(),
            min_modules: 95,
            max_modules: 95,
        },
        decode,
        encode: Some(encode),
    }
}

fn matches(codewords: &[u32], expected: &[u8]) -> bool {
    codewords.len() == expected.len()
        && codewords.iter().zip(expected).all(|(&c, &e)| c == e as u32)
}

/// Left-half digit and whether it used the G (mirrored) code
fn left_digit(widths: &[u32]) -> Option<(u8, bool)> {
    for (digit, code) in L_CODES.iter().enumerate() {
        if matches(widths, code) {
            return Some((digit as u8, false));
        }
        let mut mirrored = *code;
        mirrored.reverse();
        if matches(widths, &mirrored) {
            return Some((digit as u8, true));
        }
    }
    None
}

fn right_digit(widths: &[u32]) -> Option<u8> {
    L_CODES
        .iter()
        .position(|code| matches(widths, code))
        .map(|d| d as u8)
}

fn checksum_ok(digits: &[u8; 13]) -> bool {
    let total: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    total % 10 == 0
}

fn check_digit(first12: &[u8]) -> u8 {
    let total: u32 = first12
        .iter()
        .enumerate()
        .map(|(i, &d)| d as u32 * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - total % 10) % 10) as u8
}

/// Decode the 59 elements of one EAN-13 symbol
pub fn decode(region: &mut BarcodeRegion, codewords: &[u32]) -> bool {
    if codewords.len() != ELEMENTS
        || !matches(&codewords[..3], &GUARD)
        || !matches(&codewords[27..32], &CENTRE)
        || !matches(&codewords[ELEMENTS - 3..], &GUARD)
    {
        return false;
    }

    let mut digits = [0u8; 13];
    let mut parity = [false; 6];
    for i in 0..6 {
        let from = LEFT_FROM + 4 * i;
        let Some((digit, even)) = left_digit(&codewords[from..from + 4]) else {
            return false;
        };
        digits[i + 1] = digit;
        parity[i] = even;
    }
    for i in 0..6 {
        let from = RIGHT_FROM + 4 * i;
        let Some(digit) = right_digit(&codewords[from..from + 4]) else {
            return false;
        };
        digits[i + 7] = digit;
    }
    let Some(first) = FIRST_DIGIT_PARITY.iter().position(|p| *p == parity) else {
        return false;
    };
    digits[0] = first as u8;
    if !checksum_ok(&digits) {
        return false;
    }

    region.value = digits.iter().map(|&d| char::from(b'0' + d)).collect();
    true
}

/// Element widths for 12 digits (check digit appended) or 13 digits (check verified)
pub fn encode(value: &str) -> Option<Vec<u8>> {
    let mut digits: Vec<u8> = value
        .chars()
        .map(|c| c.to_digit(10).map(|d| d as u8))
        .collect::<Option<_>>()?;
    match digits.len() {
        12 => digits.push(check_digit(&digits)),
        13 if check_digit(&digits[..12]) == digits[12] => {}
        _ => return None,
    }

    let parity = FIRST_DIGIT_PARITY[digits[0] as usize];
    let mut widths = GUARD.to_vec();
    for (i, &d) in digits[1..7].iter().enumerate() {
        let mut code = L_CODES[d as usize];
        if parity[i] {
            code.reverse();
        }
        widths.extend_from_slice(&code);
    }
    widths.extend_from_slice(&CENTRE);
    for &d in &digits[7..] {
        widths.extend_from_slice(&L_CODES[d as usize]);
    }
    widths.extend_from_slice(&GUARD);
    Some(widths)
}
