//! Data Matrix ECC 200 (ISO/IEC 16022).
//!
//! Compaction picks between ASCII, C40, TEXT, X12, EDIFACT and Base 256
//! with the Annex P look-ahead. The fixed-point counts are scaled by 12 so
//! the 1/2, 2/3, 3/4 and 1/4 increments stay integral; the tie-breaks at
//! equality are observable. Placement follows the Annex M walk.

use crate::common::{ctoi, is_twodigits, posn};
use crate::error::{Error, Warning};
use crate::reedsol::RsCode;
use crate::symbol::{Segment, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ascii,
    C40,
    Text,
    X12,
    Edifact,
    Base256,
}

/* ---- Size tables ---- */

const SIZES: usize = 43;

/// Position in the size tables for each explicit size option, ordered by
/// increasing data codewords with square symbols first.
#[rustfmt::skip]
static INTSYMBOL: [usize; SIZES] = [
     0,  1,  3,  5,  7,  9, 12, 15, 17, 22, 26, 29, 31, 32, 33, 34, 35, 36, 37, 38,
    39, 40, 41, 42,  2,  4,  6, 10, 13, 18,  8, 11, 14, 16, 23, 19, 21, 25, 28, 20,
    24, 27, 30,
];

#[rustfmt::skip]
static MATRIX_H: [usize; SIZES] = [
    10, 12,  8, 14,  8, 16, 12, 18,  8, 20, 12,  8, 22, 16, 12, 24, 12, 26, 16, 24,
    26, 24, 32, 16, 26, 24, 36, 26, 24, 40, 26, 44, 48, 52, 64, 72, 80, 88, 96, 104,
    120, 132, 144,
];

#[rustfmt::skip]
static MATRIX_W: [usize; SIZES] = [
    10, 12, 18, 14, 32, 16, 26, 18, 48, 20, 36, 64, 22, 36, 48, 24, 64, 26, 48, 32,
    32, 36, 32, 64, 40, 48, 36, 48, 64, 40, 64, 44, 48, 52, 64, 72, 80, 88, 96, 104,
    120, 132, 144,
];

#[rustfmt::skip]
static MATRIX_FH: [usize; SIZES] = [
    10, 12,  8, 14,  8, 16, 12, 18,  8, 20, 12,  8, 22, 16, 12, 24, 12, 26, 16, 24,
    26, 24, 16, 16, 26, 24, 18, 26, 24, 20, 26, 22, 24, 26, 16, 18, 20, 22, 24, 26,
    20, 22, 24,
];

#[rustfmt::skip]
static MATRIX_FW: [usize; SIZES] = [
    10, 12, 18, 14, 16, 16, 26, 18, 24, 20, 18, 16, 22, 18, 24, 24, 16, 26, 24, 16,
    16, 18, 16, 16, 20, 24, 18, 24, 16, 20, 16, 22, 24, 26, 16, 18, 20, 22, 24, 26,
    20, 22, 24,
];

#[rustfmt::skip]
static MATRIX_BYTES: [usize; SIZES] = [
      3,   5,   5,   8,  10,  12,  16,  18,  18,  22,  22,  24,  30,  32,  32,  36,
     43,  44,  49,  49,  52,  55,  62,  62,  70,  80,  86,  90, 108, 114, 118, 144,
    174, 204, 280, 368, 456, 576, 696, 816, 1050, 1304, 1558,
];

#[rustfmt::skip]
static MATRIX_DATABLOCK: [usize; SIZES] = [
      3,   5,   5,   8,  10,  12,  16,  18,  18,  22,  22,  24,  30,  32,  32,  36,
     43,  44,  49,  49,  52,  55,  62,  62,  70,  80,  86,  90, 108, 114, 118, 144,
    174, 102, 140,  92, 114, 144, 174, 136, 175, 163, 156,
];

#[rustfmt::skip]
static MATRIX_RSBLOCK: [usize; SIZES] = [
     5,  7,  7, 10, 11, 12, 14, 14, 15, 18, 18, 18, 20, 24, 23, 24, 27, 28, 28, 28,
    32, 33, 36, 36, 38, 41, 42, 42, 46, 48, 50, 56, 68, 42, 56, 36, 48, 56, 68, 56,
    68, 62, 62,
];

/* ---- C40/TEXT shift tables ---- */

#[rustfmt::skip]
static C40_SHIFT: [u8; 128] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
];

#[rustfmt::skip]
static C40_VALUE: [u8; 128] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
    3, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13,
    15, 16, 17, 18, 19, 20, 21, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39,
    22, 23, 24, 25, 26, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
];

#[rustfmt::skip]
static TEXT_SHIFT: [u8; 128] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    0, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    2, 2, 2, 2, 2, 2, 2, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3,
    2, 2, 2, 2, 2, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 3, 3, 3, 3, 3,
];

#[rustfmt::skip]
static TEXT_VALUE: [u8; 128] = [
    0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31,
    3, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13,
    15, 16, 17, 18, 19, 20, 21, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26,
    22, 23, 24, 25, 26, 0, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 27, 28, 29, 30, 31,
];

/* ---- Character predicates ---- */

fn is_c40(c: u8) -> bool {
    c.is_ascii_digit() || c.is_ascii_uppercase() || c == b' '
}

fn is_text(c: u8) -> bool {
    c.is_ascii_digit() || c.is_ascii_lowercase() || c == b' '
}

fn is_c40_text(mode: Mode, c: u8) -> bool {
    if mode == Mode::C40 { is_c40(c) } else { is_text(c) }
}

fn is_x12(c: u8) -> bool {
    is_c40(c) || c == 13 || c == b'*' || c == b'>'
}

/// Whether an X12 terminator/separator occurs in the yet-to-be-processed
/// data before any non-X12 character (Annex P step (r)(6)(ii)(I)).
fn x12_terminator_first(data: &[u8], position: usize) -> bool {
    data[position..]
        .iter()
        .take_while(|&&c| is_x12(c))
        .any(|&c| c == 13 || c == b'*' || c == b'>')
}

/* ---- Look-ahead (Annex P) ---- */

// Character counts are scaled by 12 so that halves, thirds and quarters
// stay integral; the tie-breaks below depend on exact equality.
const MULT: i32 = 12;
const MULT_1_DIV_2: i32 = 6;
const MULT_2_DIV_3: i32 = 8;
const MULT_3_DIV_4: i32 = 9;
const MULT_1: i32 = 12;
const MULT_5_DIV_4: i32 = 15;
const MULT_4_DIV_3: i32 = 16;
const MULT_2: i32 = 24;
const MULT_9_DIV_4: i32 = 27;
const MULT_8_DIV_3: i32 = 32;
const MULT_13_DIV_4: i32 = 39;
const MULT_10_DIV_3: i32 = 40;
const MULT_4: i32 = 48;
const MULT_17_DIV_4: i32 = 51;
const MULT_13_DIV_3: i32 = 52;

fn mult_ceil(n: i32) -> i32 {
    (n + MULT - 1) / MULT * MULT
}

fn look_ahead_test(data: &[u8], position: usize, current_mode: Mode, gs1: u8) -> Mode {
    // Step (j): initial counts reflect the cost of switching from the
    // current mode to each candidate.
    let (mut ascii, mut c40, mut text, mut x12, mut edf, mut b256) = if current_mode == Mode::Ascii
    {
        (0, MULT_1, MULT_1, MULT_1, MULT_1, MULT_5_DIV_4)
    } else {
        (MULT_1, MULT_2, MULT_2, MULT_2, MULT_2, MULT_9_DIV_4)
    };
    match current_mode {
        Mode::C40 => c40 = 0,
        Mode::Text => text = 0,
        Mode::X12 => x12 = 0,
        Mode::Edifact => edf = 0,
        Mode::Base256 => b256 = 0,
        Mode::Ascii => {}
    }

    for sp in position..data.len() {
        let c = data[sp];
        let is_extended = c & 0x80 != 0;

        // ascii ... step (l)
        if c.is_ascii_digit() {
            ascii += MULT_1_DIV_2;
        } else if is_extended {
            ascii = mult_ceil(ascii) + MULT_2;
        } else {
            ascii = mult_ceil(ascii) + MULT_1;
        }

        // c40 ... step (m)
        c40 += if is_c40(c) {
            MULT_2_DIV_3
        } else if is_extended {
            MULT_8_DIV_3
        } else {
            MULT_4_DIV_3
        };

        // text ... step (n)
        text += if is_text(c) {
            MULT_2_DIV_3
        } else if is_extended {
            MULT_8_DIV_3
        } else {
            MULT_4_DIV_3
        };

        // x12 ... step (o)
        x12 += if is_x12(c) {
            MULT_2_DIV_3
        } else if is_extended {
            MULT_13_DIV_3
        } else {
            MULT_10_DIV_3
        };

        // edifact ... step (p)
        edf += if (b' '..=b'^').contains(&c) {
            MULT_3_DIV_4
        } else if is_extended {
            MULT_17_DIV_4
        } else {
            MULT_13_DIV_4
        };

        // base 256 ... step (q)
        b256 += if gs1 == 1 && c == b'[' { MULT_4 } else { MULT_1 };

        if sp >= position + 4 {
            // At least 5 data characters processed ... step (r).
            let cnt = ascii + MULT_1;
            if cnt <= b256 && cnt <= edf && cnt <= text && cnt <= x12 && cnt <= c40 {
                return Mode::Ascii; // (r)(1)
            }
            let cnt = b256 + MULT_1;
            if cnt <= ascii || (cnt < edf && cnt < text && cnt < x12 && cnt < c40) {
                return Mode::Base256; // (r)(2)
            }
            let cnt = edf + MULT_1;
            if cnt < ascii && cnt < b256 && cnt < text && cnt < x12 && cnt < c40 {
                return Mode::Edifact; // (r)(3)
            }
            let cnt = text + MULT_1;
            if cnt < ascii && cnt < b256 && cnt < edf && cnt < x12 && cnt < c40 {
                return Mode::Text; // (r)(4)
            }
            let cnt = x12 + MULT_1;
            if cnt < ascii && cnt < b256 && cnt < edf && cnt < text && cnt < c40 {
                return Mode::X12; // (r)(5)
            }
            let cnt = c40 + MULT_1;
            if cnt < ascii && cnt < b256 && cnt < edf && cnt < text {
                if c40 < x12 {
                    return Mode::C40; // (r)(6)(i)
                }
                if c40 == x12 {
                    if x12_terminator_first(data, sp) {
                        return Mode::X12; // (r)(6)(ii)(I)
                    }
                    return Mode::C40; // (r)(6)(ii)(II)
                }
            }
        }
    }

    // End of data ... step (k): rounded-up values decide.
    let ascii = mult_ceil(ascii);
    let b256 = mult_ceil(b256);
    let edf = mult_ceil(edf);
    let text = mult_ceil(text);
    let x12 = mult_ceil(x12);
    let c40 = mult_ceil(c40);

    if ascii <= b256 && ascii <= edf && ascii <= text && ascii <= x12 && ascii <= c40 {
        Mode::Ascii // (k)(2)
    } else if b256 < ascii && b256 < edf && b256 < text && b256 < x12 && b256 < c40 {
        Mode::Base256 // (k)(3)
    } else if edf < ascii && edf < b256 && edf < text && edf < x12 && edf < c40 {
        Mode::Edifact // (k)(4)
    } else if text < ascii && text < b256 && text < edf && text < x12 && text < c40 {
        Mode::Text // (k)(5)
    } else if x12 < ascii && x12 < b256 && x12 < edf && x12 < text && x12 < c40 {
        Mode::X12 // (k)(6)
    } else {
        Mode::C40 // (k)(7)
    }
}

/* ---- Codeword emission ---- */

/// Copies complete C40/TEXT/X12 triplets from the process buffer to the
/// target, packing each as 1600a + 40b + c + 1 into two bytes. Returns the
/// elements left over (< 3).
fn ctx_buffer_transfer(buf: &mut Vec<i32>, target: &mut Vec<u8>) {
    let complete = buf.len() / 3 * 3;
    for t in buf[..complete].chunks(3) {
        let iv = 1600 * t[0] + 40 * t[1] + t[2] + 1;
        target.push((iv >> 8) as u8);
        target.push((iv & 0xff) as u8);
    }
    buf.drain(..complete);
}

/// Copies complete EDIFACT quadruplets, packing four 6-bit values into
/// three bytes.
fn edi_buffer_transfer(buf: &mut Vec<i32>, target: &mut Vec<u8>) {
    let complete = buf.len() / 4 * 4;
    for q in buf[..complete].chunks(4) {
        target.push((q[0] << 2 | (q[1] & 0x30) >> 4) as u8);
        target.push(((q[1] & 0x0f) << 4 | (q[2] & 0x3c) >> 2) as u8);
        target.push(((q[2] & 0x03) << 6 | q[3]) as u8);
    }
    buf.drain(..complete);
}

/// Symbol size index: as requested, or the smallest fitting `minimum`
/// codewords under the `option_3` shape policy.
fn get_symbol_size(symbol: &Symbol, minimum: usize) -> usize {
    if (1..=SIZES as i32).contains(&symbol.option_2) {
        return INTSYMBOL[symbol.option_2 as usize - 1];
    }
    for i in (0..SIZES - 1).rev() {
        if minimum > MATRIX_BYTES[i] {
            if symbol.option_3 == DM_DMRE {
                return i + 1;
            }
            if symbol.option_3 == DM_SQUARE {
                // Skip rectangular symbols in square-only mode.
                let mut j = i;
                while j + 1 < SIZES && MATRIX_H[j + 1] != MATRIX_W[j + 1] {
                    j += 1;
                }
                return if j + 1 < SIZES { j + 1 } else { 0 };
            }
            // Skip the extended-rectangular sizes by default.
            let mut j = i;
            while j + 1 < SIZES && is_dmre(j + 1) {
                j += 1;
            }
            return if j + 1 < SIZES { j + 1 } else { 0 };
        }
    }
    0
}

/// Square-only size selection.
pub const DM_SQUARE: i32 = 100;
/// Allow the extended rectangular (DMRE) sizes.
pub const DM_DMRE: i32 = 101;

fn is_dmre(i: usize) -> bool {
    // The DMRE additions are every rectangle beyond the six of the base
    // standard.
    let (h, w) = (MATRIX_H[i], MATRIX_W[i]);
    h != w
        && !matches!(
            (h, w),
            (8, 18) | (8, 32) | (12, 26) | (12, 36) | (16, 36) | (16, 48)
        )
}

/// Codewords still available in the chosen symbol for the data gathered so
/// far (may be negative).
fn codewords_remaining(symbol: &Symbol, tp: usize, process_p: usize) -> i32 {
    let size = get_symbol_size(symbol, tp + process_p);
    MATRIX_BYTES[size] as i32 - tp as i32
}

/// C40/TEXT elements needed to encode `input`.
fn c40text_cnt(mode: Mode, gs1: u8, input: u8) -> usize {
    if gs1 != 0 && input == b'[' {
        return 2;
    }
    let mut cnt = 1;
    let mut input = input;
    if input & 0x80 != 0 {
        cnt += 2;
        input -= 128;
    }
    let shift = if mode == Mode::C40 {
        C40_SHIFT[input as usize]
    } else {
        TEXT_SHIFT[input as usize]
    };
    if shift != 0 {
        cnt += 1;
    }
    cnt
}

/// Writes the Base 256 field length, inserting a second length byte when
/// the field exceeds 249 bytes.
fn update_b256_field_length(target: &mut Vec<u8>, b256_start: usize) {
    let count = target.len() - (b256_start + 1);
    if count <= 249 {
        target[b256_start] = count as u8;
    } else {
        target.insert(b256_start + 1, (count % 250) as u8);
        target[b256_start] = (249 + count / 250) as u8;
    }
}

/// 255-state randomising algorithm over a finished Base 256 field.
fn b256_randomise(target: &mut [u8], b256_start: usize) {
    for i in b256_start..target.len() {
        let prn = (149 * (i + 1)) % 255 + 1;
        target[i] = (target[i] as usize + prn) as u8;
    }
}

/// Reduces the payload to data codewords (ISO/IEC 16022 5.2).
fn dm200encode(symbol: &mut Symbol, source: &[u8], eci: u32) -> Result<Vec<u8>, Error> {
    let mut sp = 0usize;
    let mut target: Vec<u8> = Vec::with_capacity(2200);
    let mut process_buffer: Vec<i32> = Vec::with_capacity(8);
    let mut b256_start = 0usize;
    let mut inputlen = source.len();

    // gs1: 0 none, 1 FNC1 separators, 2 GS separators.
    let gs1 = if symbol.input_mode.base == crate::symbol::BaseMode::Gs1 {
        if symbol.output_options.gs1_gs_separator { 2 } else { 1 }
    } else {
        0u8
    };

    if gs1 != 0 {
        target.push(232); // FNC1
    }

    if symbol.output_options.reader_init {
        target.push(234); // Reader Programming
    }

    if eci > 0 {
        // ECI numbers according to Table 6.
        target.push(241);
        if eci <= 126 {
            target.push((eci + 1) as u8);
        } else if eci <= 16382 {
            target.push(((eci - 127) / 254 + 128) as u8);
            target.push(((eci - 127) % 254 + 1) as u8);
        } else {
            target.push(((eci - 16383) / 64516 + 192) as u8);
            target.push((((eci - 16383) / 254) % 254 + 1) as u8);
            target.push(((eci - 16383) % 254 + 1) as u8);
        }
    }

    // Macro05/Macro06 headers: "[)>\R05\G...\R\E" / "[)>\R06\G...\R\E".
    if target.is_empty()
        && inputlen >= 9
        && source.starts_with(b"[)>\x1e0")
        && (source[5] == b'5' || source[5] == b'6')
        && source[6] == 0x1d
        && source[inputlen - 2] == 0x1e
        && source[inputlen - 1] == 0x04
    {
        target.push(if source[5] == b'5' { 236 } else { 237 });
        sp = 7;
        inputlen -= 2;
    }

    let mut current_mode = Mode::Ascii;
    let mut next_mode;

    while sp < inputlen {
        let c = source[sp];

        match current_mode {
            // step (b) - ASCII encodation
            Mode::Ascii => {
                next_mode = Mode::Ascii;

                if is_twodigits(&source[..inputlen], sp) {
                    target.push((10 * ctoi(c) + ctoi(source[sp + 1]) + 130) as u8);
                    sp += 2;
                } else {
                    next_mode = look_ahead_test(&source[..inputlen], sp, current_mode, gs1);

                    if next_mode != Mode::Ascii {
                        match next_mode {
                            Mode::C40 => target.push(230),
                            Mode::Text => target.push(239),
                            Mode::X12 => target.push(238),
                            Mode::Edifact => target.push(240),
                            Mode::Base256 => {
                                target.push(231);
                                b256_start = target.len();
                                target.push(0); // length holder
                            }
                            Mode::Ascii => unreachable!(),
                        }
                    } else if c & 0x80 != 0 {
                        target.push(235); // FNC4
                        target.push(c - 128 + 1);
                        sp += 1;
                    } else {
                        if gs1 != 0 && c == b'[' {
                            target.push(if gs1 == 2 { 29 + 1 } else { 232 });
                        } else {
                            target.push(c + 1);
                        }
                        sp += 1;
                    }
                }
            }

            // step (c)/(d) C40/TEXT encodation
            Mode::C40 | Mode::Text => {
                next_mode = current_mode;
                if process_buffer.is_empty() {
                    next_mode = look_ahead_test(&source[..inputlen], sp, current_mode, gs1);
                }

                if next_mode != current_mode {
                    target.push(254); // Unlatch
                    next_mode = Mode::Ascii;
                } else {
                    let (shift_table, value_table) = if current_mode == Mode::C40 {
                        (&C40_SHIFT, &C40_VALUE)
                    } else {
                        (&TEXT_SHIFT, &TEXT_VALUE)
                    };

                    let (shift_set, value) = if c & 0x80 != 0 {
                        process_buffer.push(1);
                        process_buffer.push(30); // Upper Shift
                        (
                            shift_table[(c - 128) as usize],
                            value_table[(c - 128) as usize],
                        )
                    } else if gs1 != 0 && c == b'[' {
                        if gs1 == 2 {
                            (shift_table[29], value_table[29]) // GS
                        } else {
                            (2, 27) // FNC1
                        }
                    } else {
                        (shift_table[c as usize], value_table[c as usize])
                    };

                    if shift_set != 0 {
                        process_buffer.push(shift_set as i32 - 1);
                    }
                    process_buffer.push(value as i32);

                    if process_buffer.len() >= 3 {
                        ctx_buffer_transfer(&mut process_buffer, &mut target);
                    }
                    sp += 1;
                }
            }

            // step (e) X12 encodation
            Mode::X12 => {
                next_mode = Mode::X12;
                if process_buffer.is_empty() {
                    next_mode = look_ahead_test(&source[..inputlen], sp, current_mode, gs1);
                }

                if next_mode != Mode::X12 {
                    target.push(254); // Unlatch
                    next_mode = Mode::Ascii;
                } else {
                    let value = if c.is_ascii_digit() {
                        (c - b'0') as i32 + 4
                    } else if c.is_ascii_uppercase() {
                        (c - b'A') as i32 + 14
                    } else {
                        posn(b"\r*> ", c)
                    };
                    process_buffer.push(value);

                    if process_buffer.len() >= 3 {
                        ctx_buffer_transfer(&mut process_buffer, &mut target);
                    }
                    sp += 1;
                }
            }

            // step (f) EDIFACT encodation
            Mode::Edifact => {
                next_mode = Mode::Edifact;
                if process_buffer.len() == 3 {
                    next_mode = look_ahead_test(&source[..inputlen], sp, current_mode, gs1);
                }

                if next_mode != Mode::Edifact {
                    process_buffer.push(31); // Unlatch
                    next_mode = Mode::Ascii;
                } else {
                    let mut value = c as i32;
                    if value >= 64 {
                        value -= 64;
                    }
                    process_buffer.push(value);
                    sp += 1;
                }

                if process_buffer.len() >= 4 {
                    edi_buffer_transfer(&mut process_buffer, &mut target);
                }
            }

            // step (g) Base 256 encodation
            Mode::Base256 => {
                next_mode = look_ahead_test(&source[..inputlen], sp, current_mode, gs1);

                if next_mode == Mode::Base256 {
                    target.push(c);
                    sp += 1;
                } else {
                    update_b256_field_length(&mut target, b256_start);
                    b256_randomise(&mut target, b256_start);
                    next_mode = Mode::Ascii;
                }
            }
        }

        current_mode = next_mode;

        if target.len() > 1558 {
            return Err(symbol.err(Error::TooLong("data too long to fit in symbol".into())));
        }
    }

    let symbols_left = codewords_remaining(symbol, target.len(), process_buffer.len());

    if symbol.debug {
        log::debug!(
            "symbols_left {symbols_left}, process buffer {} in mode {current_mode:?}",
            process_buffer.len()
        );
    }

    match current_mode {
        Mode::C40 | Mode::Text => {
            // End-of-data rules 5.2.5.2: a Shift-1 padded triplet only when
            // exactly two symbol characters remain.
            if process_buffer.is_empty() {
                if symbols_left > 0 {
                    target.push(254); // Unlatch
                }
            } else if process_buffer.len() == 2 && symbols_left == 2 {
                // (b)
                process_buffer.push(0); // Shift 1
                ctx_buffer_transfer(&mut process_buffer, &mut target);
            } else if process_buffer.len() == 1
                && symbols_left <= 2
                && is_c40_text(current_mode, source[inputlen - 1])
            {
                // (c)/(d)
                if symbols_left > 1 {
                    target.push(254); // Unlatch, remainder in ASCII
                }
                target.push(source[inputlen - 1] + 1);
            } else {
                // Backtrack to the last complete triplet and finish in
                // ASCII.
                let mut process_p = process_buffer.len() as i32;
                let mut total_cnt = 0usize;
                while sp > 0 && process_p % 3 != 0 {
                    sp -= 1;
                    let cnt = c40text_cnt(current_mode, gs1, source[sp]);
                    total_cnt += cnt;
                    process_p -= cnt as i32;
                }
                target.truncate(target.len() - total_cnt / 3 * 2);
                process_buffer.clear();

                target.push(254); // Unlatch
                while sp < inputlen {
                    let c = source[sp];
                    if is_twodigits(&source[..inputlen], sp) {
                        target.push((10 * ctoi(c) + ctoi(source[sp + 1]) + 130) as u8);
                        sp += 2;
                    } else if c & 0x80 != 0 {
                        target.push(235); // FNC4
                        target.push(c - 128 + 1);
                        sp += 1;
                    } else if gs1 != 0 && c == b'[' {
                        target.push(if gs1 == 2 { 29 + 1 } else { 232 });
                        sp += 1;
                    } else {
                        target.push(c + 1);
                        sp += 1;
                    }
                }
            }
        }
        Mode::X12 => {
            if symbols_left == 1 && process_buffer.len() == 1 {
                // Unlatch not required.
                target.push(source[inputlen - 1] + 1);
            } else {
                if symbols_left > 0 {
                    target.push(254); // Unlatch
                }
                if process_buffer.len() == 1 {
                    target.push(source[inputlen - 1] + 1);
                } else if process_buffer.len() == 2 {
                    target.push(source[inputlen - 2] + 1);
                    target.push(source[inputlen - 1] + 1);
                }
            }
            process_buffer.clear();
        }
        Mode::Edifact => {
            if symbols_left <= 2 && process_buffer.len() <= symbols_left as usize {
                // Unlatch not required.
                if process_buffer.len() == 1 {
                    target.push(source[inputlen - 1] + 1);
                } else if process_buffer.len() == 2 {
                    target.push(source[inputlen - 2] + 1);
                    target.push(source[inputlen - 1] + 1);
                }
                process_buffer.clear();
            } else {
                // Append the EDIFACT unlatch value (31) and flush
                // zero-padded.
                if process_buffer.len() <= 3 {
                    process_buffer.push(31);
                    while process_buffer.len() < 4 {
                        process_buffer.push(0);
                    }
                }
                edi_buffer_transfer(&mut process_buffer, &mut target);
            }
        }
        Mode::Base256 => {
            if symbols_left > 0 {
                update_b256_field_length(&mut target, b256_start);
            }
            b256_randomise(&mut target, b256_start);
        }
        Mode::Ascii => {}
    }

    if symbol.debug {
        log::debug!("Data ({}): {:?}", target.len(), target);
    }

    Ok(target)
}

/// Pads to the version's data-word count: 129 then the 253-state
/// randomising algorithm.
fn add_tail(target: &mut Vec<u8>, tail_length: usize) {
    for i in (1..=tail_length).rev() {
        if i == tail_length {
            target.push(129);
        } else {
            let tp = target.len();
            let prn = (149 * (tp + 1)) % 253 + 1;
            let temp = 129 + prn;
            target.push(if temp <= 254 { temp as u8 } else { (temp - 254) as u8 });
        }
    }
}

/// Appends interleaved RS check codewords; `skew` relocates the first
/// eight blocks' residuals for the 144x144 symbol.
fn ecc200(binary: &mut Vec<u8>, bytes: usize, datablock: usize, rsblock: usize, skew: bool) {
    let blocks = (bytes + 2) / datablock;
    let rsblocks = rsblock * blocks;
    binary.resize(bytes + rsblocks + if skew { 2 } else { 0 }, 0);

    let rs = RsCode::new(0x12d, rsblock, 1);
    for b in 0..blocks {
        let buf: Vec<u8> = (b..bytes).step_by(blocks).map(|n| binary[n]).collect();
        let ecc = rs.encode(&buf);
        let mut p = rsblock; // comes back reversed
        for n in (b..rsblocks).step_by(blocks) {
            p -= 1;
            if skew {
                // Rotate the residual so the 144x144 layout matches
                // deployed readers.
                if b < 8 {
                    binary[bytes + n + 2] = ecc[p];
                } else {
                    binary[bytes + n - 8] = ecc[p];
                }
            } else {
                binary[bytes + n] = ecc[p];
            }
        }
    }
    binary.truncate(bytes + rsblocks);
}

/* ---- Annex M placement ---- */

fn place_bit(grid: &mut [i32], nr: usize, nc: usize, r: i32, c: i32, p: usize, b: u8) {
    let mut r = r;
    let mut c = c;
    if r < 0 {
        r += nr as i32;
        c += 4 - (nr as i32 + 4) % 8;
    }
    if c < 0 {
        c += nc as i32;
        r += 4 - (nc as i32 + 4) % 8;
    }
    // Necessary wrap for tall rectangles.
    if r >= nr as i32 {
        r -= nr as i32;
    }
    debug_assert_eq!(grid[r as usize * nc + c as usize], 0);
    grid[r as usize * nc + c as usize] = (p << 3) as i32 + b as i32;
}

fn place_block(grid: &mut [i32], nr: usize, nc: usize, r: i32, c: i32, p: usize) {
    place_bit(grid, nr, nc, r - 2, c - 2, p, 7);
    place_bit(grid, nr, nc, r - 2, c - 1, p, 6);
    place_bit(grid, nr, nc, r - 1, c - 2, p, 5);
    place_bit(grid, nr, nc, r - 1, c - 1, p, 4);
    place_bit(grid, nr, nc, r - 1, c, p, 3);
    place_bit(grid, nr, nc, r, c - 2, p, 2);
    place_bit(grid, nr, nc, r, c - 1, p, 1);
    place_bit(grid, nr, nc, r, c, p, 0);
}

fn place_corner_a(grid: &mut [i32], nr: usize, nc: usize, p: usize) {
    let (nr_i, nc_i) = (nr as i32, nc as i32);
    place_bit(grid, nr, nc, nr_i - 1, 0, p, 7);
    place_bit(grid, nr, nc, nr_i - 1, 1, p, 6);
    place_bit(grid, nr, nc, nr_i - 1, 2, p, 5);
    place_bit(grid, nr, nc, 0, nc_i - 2, p, 4);
    place_bit(grid, nr, nc, 0, nc_i - 1, p, 3);
    place_bit(grid, nr, nc, 1, nc_i - 1, p, 2);
    place_bit(grid, nr, nc, 2, nc_i - 1, p, 1);
    place_bit(grid, nr, nc, 3, nc_i - 1, p, 0);
}

fn place_corner_b(grid: &mut [i32], nr: usize, nc: usize, p: usize) {
    let (nr_i, nc_i) = (nr as i32, nc as i32);
    place_bit(grid, nr, nc, nr_i - 3, 0, p, 7);
    place_bit(grid, nr, nc, nr_i - 2, 0, p, 6);
    place_bit(grid, nr, nc, nr_i - 1, 0, p, 5);
    place_bit(grid, nr, nc, 0, nc_i - 4, p, 4);
    place_bit(grid, nr, nc, 0, nc_i - 3, p, 3);
    place_bit(grid, nr, nc, 0, nc_i - 2, p, 2);
    place_bit(grid, nr, nc, 0, nc_i - 1, p, 1);
    place_bit(grid, nr, nc, 1, nc_i - 1, p, 0);
}

fn place_corner_c(grid: &mut [i32], nr: usize, nc: usize, p: usize) {
    let (nr_i, nc_i) = (nr as i32, nc as i32);
    place_bit(grid, nr, nc, nr_i - 3, 0, p, 7);
    place_bit(grid, nr, nc, nr_i - 2, 0, p, 6);
    place_bit(grid, nr, nc, nr_i - 1, 0, p, 5);
    place_bit(grid, nr, nc, 0, nc_i - 2, p, 4);
    place_bit(grid, nr, nc, 0, nc_i - 1, p, 3);
    place_bit(grid, nr, nc, 1, nc_i - 1, p, 2);
    place_bit(grid, nr, nc, 2, nc_i - 1, p, 1);
    place_bit(grid, nr, nc, 3, nc_i - 1, p, 0);
}

fn place_corner_d(grid: &mut [i32], nr: usize, nc: usize, p: usize) {
    let (nr_i, nc_i) = (nr as i32, nc as i32);
    place_bit(grid, nr, nc, nr_i - 1, 0, p, 7);
    place_bit(grid, nr, nc, nr_i - 1, nc_i - 1, p, 6);
    place_bit(grid, nr, nc, 0, nc_i - 3, p, 5);
    place_bit(grid, nr, nc, 0, nc_i - 2, p, 4);
    place_bit(grid, nr, nc, 0, nc_i - 1, p, 3);
    place_bit(grid, nr, nc, 1, nc_i - 3, p, 2);
    place_bit(grid, nr, nc, 1, nc_i - 2, p, 1);
    place_bit(grid, nr, nc, 1, nc_i - 1, p, 0);
}

/// The Annex M diagonal walk over the data region.
fn placement(nr: usize, nc: usize) -> Vec<i32> {
    let mut grid = vec![0i32; nr * nc];
    let mut p = 1usize;
    let mut r = 4i32;
    let mut c = 0i32;
    let (nr_i, nc_i) = (nr as i32, nc as i32);

    loop {
        if r == nr_i && c == 0 {
            place_corner_a(&mut grid, nr, nc, p);
            p += 1;
        }
        if r == nr_i - 2 && c == 0 && nc % 4 != 0 {
            place_corner_b(&mut grid, nr, nc, p);
            p += 1;
        }
        if r == nr_i - 2 && c == 0 && nc % 8 == 4 {
            place_corner_c(&mut grid, nr, nc, p);
            p += 1;
        }
        if r == nr_i + 4 && c == 2 && nc % 8 == 0 {
            place_corner_d(&mut grid, nr, nc, p);
            p += 1;
        }
        // up/right
        loop {
            if r < nr_i && c >= 0 && grid[r as usize * nc + c as usize] == 0 {
                place_block(&mut grid, nr, nc, r, c, p);
                p += 1;
            }
            r -= 2;
            c += 2;
            if !(r >= 0 && c < nc_i) {
                break;
            }
        }
        r += 1;
        c += 3;
        // down/left
        loop {
            if r >= 0 && c < nc_i && grid[r as usize * nc + c as usize] == 0 {
                place_block(&mut grid, nr, nc, r, c, p);
                p += 1;
            }
            r += 2;
            c -= 2;
            if !(r < nr_i && c >= 0) {
                break;
            }
        }
        r += 3;
        c += 1;
        if !(r < nr_i || c < nc_i) {
            break;
        }
    }

    // Unfilled corner: both modules forced dark.
    if grid[nr * nc - 1] == 0 {
        grid[nr * nc - 1] = 1;
        grid[nr * nc - nc - 2] = 1;
    }
    grid
}

/* ---- Top level ---- */

pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    if symbol.option_1 > 1 {
        return Err(symbol.err(Error::InvalidOption(
            "older Data Matrix standards are no longer supported".into(),
        )));
    }
    let source = &segs[0].source.clone();
    let eci = segs[0].eci;

    let mut binary = dm200encode(symbol, source, eci)?;
    let binlen = binary.len();

    let size = get_symbol_size(symbol, binlen);

    if binlen > MATRIX_BYTES[size] {
        if (1..=SIZES as i32).contains(&symbol.option_2) {
            return Err(symbol.err(Error::TooLong(
                "input too long for selected symbol size".into(),
            )));
        }
        return Err(symbol.err(Error::TooLong("data too long to fit in symbol".into())));
    }

    let h = MATRIX_H[size];
    let w = MATRIX_W[size];
    let fh = MATRIX_FH[size];
    let fw = MATRIX_FW[size];
    let bytes = MATRIX_BYTES[size];
    let datablock = MATRIX_DATABLOCK[size];
    let rsblock = MATRIX_RSBLOCK[size];

    if bytes > binlen {
        add_tail(&mut binary, bytes - binlen);
    }

    let skew = h == 144 && w == 144;
    ecc200(&mut binary, bytes, datablock, rsblock, skew);

    if symbol.debug {
        log::debug!("Codewords with ECC ({}): {:?}", binary.len(), binary);
    }

    // Placement into the data region, then interleave the finder grid.
    let nc = w - 2 * (w / fw);
    let nr = h - 2 * (h / fh);
    let places = placement(nr, nc);

    let mut grid = vec![0u8; w * h];
    for y in (0..h).step_by(fh) {
        for x in 0..w {
            grid[y * w + x] = 1;
        }
        for x in (0..w).step_by(2) {
            grid[(y + fh - 1) * w + x] = 1;
        }
    }
    for x in (0..w).step_by(fw) {
        for y in 0..h {
            grid[y * w + x] = 1;
        }
        for y in (0..h).step_by(2) {
            grid[y * w + x + fw - 1] = 1;
        }
    }
    for y in 0..nr {
        for x in 0..nc {
            let v = places[(nr - y - 1) * nc + x];
            if v == 1 || (v > 7 && binary[(v >> 3) as usize - 1] & (1 << (v & 7)) != 0) {
                grid[(1 + y + 2 * (y / (fh - 2))) * w + 1 + x + 2 * (x / (fw - 2))] = 1;
            }
        }
    }
    for y in (0..h).rev() {
        for x in 0..w {
            if grid[w * y + x] != 0 {
                symbol.set_module(h - y - 1, x);
            }
        }
        symbol.set_row_height(h - y - 1, 1.0);
    }

    symbol.height = h as f32;
    symbol.rows = h;
    symbol.width = w;

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::DataMatrix)
    }

    #[test]
    fn test_digits_10x10() {
        let mut s = symbol();
        s.encode(b"123456").unwrap();
        assert_eq!(s.rows, 10);
        assert_eq!(s.width, 10);
        // The L finder: solid bottom row and left column.
        assert!((0..10).all(|x| s.module_is_set(9, x)));
        assert!((0..10).all(|y| s.module_is_set(y, 0)));
        // Alternating timing edges along the top and right.
        assert!(s.module_is_set(0, 0) && !s.module_is_set(0, 1));
        assert!(s.module_is_set(0, 2) && !s.module_is_set(0, 3));
    }

    #[test]
    fn test_digit_pairs_compact() {
        let mut s = symbol();
        let out = dm200encode(&mut s, b"123456", 0).unwrap();
        // Three digit pairs: 12 -> 142, 34 -> 164, 56 -> 186.
        assert_eq!(out, vec![142, 164, 186]);
    }

    #[test]
    fn test_ascii_single_chars() {
        let mut s = symbol();
        let out = dm200encode(&mut s, b"A", 0).unwrap();
        assert_eq!(out, vec![66]); // 'A' + 1
    }

    #[test]
    fn test_look_ahead_prefers_c40_for_uppercase() {
        assert_eq!(
            look_ahead_test(b"AIMAIMAIMAIM", 0, Mode::Ascii, 0),
            Mode::C40
        );
    }

    #[test]
    fn test_look_ahead_prefers_text_for_lowercase() {
        assert_eq!(
            look_ahead_test(b"aimaimaimaim", 0, Mode::Ascii, 0),
            Mode::Text
        );
    }

    #[test]
    fn test_look_ahead_prefers_edifact_for_upper_symbols() {
        assert_eq!(
            look_ahead_test(b"@@@@@@@@@@@@", 0, Mode::Ascii, 0),
            Mode::Edifact
        );
    }

    #[test]
    fn test_look_ahead_prefers_base256_for_binary() {
        let data = [0x90u8, 0x91, 0x92, 0x93, 0x94, 0x95, 0x96, 0x97];
        assert_eq!(look_ahead_test(&data, 0, Mode::Ascii, 0), Mode::Base256);
    }

    #[test]
    fn test_c40_packing() {
        // "AIMAIM" in C40: A=14, I=22, M=26.
        // (1600*14 + 40*22 + 26) + 1 = 23307 = 0x5B0B
        let mut s = symbol();
        let out = dm200encode(&mut s, b"AIMAIMAIMAIM", 0).unwrap();
        assert_eq!(out[0], 230); // C40 latch
        assert_eq!(out[1], 0x5b);
        assert_eq!(out[2], 0x0b);
    }

    #[test]
    fn test_macro05_header() {
        let mut s = symbol();
        let out = dm200encode(&mut s, b"[)>\x1e05\x1dAB\x1e\x04", 0).unwrap();
        assert_eq!(out[0], 236);
        // "AB" follows in ASCII.
        assert_eq!(&out[1..], &[66, 67]);
    }

    #[test]
    fn test_explicit_size_too_small() {
        let mut s = symbol();
        s.option_2 = 1; // 10x10: 3 data codewords
        let err = s.encode(b"ABCDEFGH").unwrap_err();
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn test_capacity_boundary_square_default() {
        // Largest symbol holds 1558 data codewords; 3116 digits fit
        // exactly (2 digits per codeword).
        let mut s = symbol();
        let data = vec![b'9'; 3116];
        s.encode(&data).unwrap();
        assert_eq!(s.rows, 144);
        let mut s = symbol();
        let data = vec![b'9'; 3118];
        assert_eq!(s.encode(&data).unwrap_err().code(), 5);
    }

    #[test]
    fn test_square_only_option_skips_rectangles() {
        let mut s = symbol();
        s.option_3 = DM_SQUARE;
        s.encode(b"ABCDEF").unwrap(); // needs 6 codewords
        assert_eq!(s.rows, s.width);
    }

    #[test]
    fn test_rectangular_auto() {
        let mut s = symbol();
        s.option_2 = 25; // 8x18
        s.encode(b"1234").unwrap();
        assert_eq!(s.rows, 8);
        assert_eq!(s.width, 18);
    }

    #[test]
    fn test_gs1_fnc1_leading_codeword() {
        let mut s = symbol();
        s.input_mode.base = crate::symbol::BaseMode::Gs1;
        let out = dm200encode(&mut s, b"0112345678901231", 0).unwrap();
        assert_eq!(out[0], 232); // FNC1
    }

    #[test]
    fn test_eci_header() {
        let mut s = symbol();
        let out = dm200encode(&mut s, b"A", 26).unwrap();
        assert_eq!(out, vec![241, 27, 66]);
    }

    #[test]
    fn test_reader_init_header() {
        let mut s = symbol();
        s.output_options.reader_init = true;
        let out = dm200encode(&mut s, b"A", 0).unwrap();
        assert_eq!(out, vec![234, 66]);
    }

    #[test]
    fn test_placement_fills_smallest_region() {
        // The 10x10 symbol's 8x8 data region holds its 8 codewords
        // exactly, with no unfilled corner.
        let places = placement(8, 8);
        assert_eq!(places.iter().filter(|&&v| v > 7).count(), 64);
    }

    #[test]
    fn test_placement_forced_corner() {
        // The 12x12 symbol's 10x10 region carries 12 codewords (96 bits);
        // the walk leaves the bottom-right corner pair forced dark and two
        // remainder cells light.
        let places = placement(10, 10);
        assert_eq!(places.iter().filter(|&&v| v > 7).count(), 96);
        assert_eq!(places.iter().filter(|&&v| v == 1).count(), 2);
        assert_eq!(places.iter().filter(|&&v| v == 0).count(), 2);
        assert_eq!(places[99], 1);
        assert_eq!(places[88], 1);
    }

    #[test]
    fn test_pad_randomisation() {
        let mut tail = vec![];
        add_tail(&mut tail, 3);
        assert_eq!(tail[0], 129);
        // 253-state: prn = (149 * 2) % 253 + 1 = 46, pad = 129 + 46 = 175.
        assert_eq!(tail[1], 175);
    }
}
