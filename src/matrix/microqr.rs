//! Micro QR Code (ISO/IEC 18004).
//!
//! The four versions M1-M4 share QR's codeword and Reed-Solomon
//! machinery but carry a single finder pattern, shortened mode/count
//! fields, four masks scored on the right and lower edges, and (for M1
//! and M3) a final four-bit data codeword.

use crate::error::{Error, Warning};
use crate::reedsol::RsCode;
use crate::symbol::{Segment, Symbol};

use super::qr::ALPHANUMERIC;

/// Data capacity in bits per (version, ECC ordinal: 0 = L, 1 = M, 2 = Q).
/// -1 marks unavailable combinations.
static DATA_BITS: [[i32; 3]; 4] = [
    [20, -1, -1],  // M1 (error detection only)
    [40, 32, -1],  // M2
    [84, 68, -1],  // M3
    [128, 112, 80], // M4
];

/// Check codewords per (version, ECC ordinal).
static ECC_CODEWORDS: [[i32; 3]; 4] = [
    [2, -1, -1],
    [5, 6, -1],
    [6, 8, -1],
    [8, 10, 14],
];

/// Symbol number carried in the format information.
static SYMBOL_NUMBER: [[i32; 3]; 4] = [
    [0, -1, -1],
    [1, 2, -1],
    [3, 4, -1],
    [5, 6, 7],
];

/// Terminator length in bits per version.
static TERMINATOR: [usize; 4] = [3, 5, 7, 9];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegMode {
    Numeric,
    Alphanumeric,
    Byte,
}

impl SegMode {
    /// Smallest version that offers this mode (1-based).
    fn min_version(self) -> usize {
        match self {
            SegMode::Numeric => 1,
            SegMode::Alphanumeric => 2,
            SegMode::Byte => 3,
        }
    }

    /// Mode indicator: `version - 1` bits, value by position in the
    /// version's mode list.
    fn indicator(self) -> u32 {
        match self {
            SegMode::Numeric => 0,
            SegMode::Alphanumeric => 1,
            SegMode::Byte => 2,
        }
    }

    fn char_count_bits(self, version: usize) -> usize {
        match self {
            SegMode::Numeric => [3, 4, 5, 6][version - 1],
            SegMode::Alphanumeric => [0, 3, 4, 5][version - 1],
            SegMode::Byte => [0, 0, 4, 5][version - 1],
        }
    }
}

fn pick_mode(data: &[u8]) -> SegMode {
    if data.iter().all(|c| c.is_ascii_digit()) {
        SegMode::Numeric
    } else if data.iter().all(|c| ALPHANUMERIC.contains(c)) {
        SegMode::Alphanumeric
    } else {
        SegMode::Byte
    }
}

fn append_bits(bits: &mut Vec<bool>, val: u32, len: usize) {
    debug_assert!(len == 32 || val >> len == 0);
    for i in (0..len).rev() {
        bits.push(val >> i & 1 != 0);
    }
}

/// Payload bits for the chosen mode, headers excluded.
fn segment_bits(data: &[u8], mode: SegMode) -> Vec<bool> {
    let mut bits = Vec::with_capacity(data.len() * 8);
    match mode {
        SegMode::Numeric => {
            for group in data.chunks(3) {
                let val = group.iter().fold(0u32, |a, &c| a * 10 + (c - b'0') as u32);
                append_bits(&mut bits, val, group.len() * 3 + 1);
            }
        }
        SegMode::Alphanumeric => {
            for pair in data.chunks(2) {
                let val = pair.iter().fold(0u32, |a, &c| {
                    a * 45 + ALPHANUMERIC.iter().position(|&x| x == c).unwrap() as u32
                });
                append_bits(&mut bits, val, if pair.len() == 2 { 11 } else { 6 });
            }
        }
        SegMode::Byte => {
            for &b in data {
                append_bits(&mut bits, b as u32, 8);
            }
        }
    }
    bits
}

/// Encoded length including mode indicator and character count.
fn total_bits(data_bits: usize, mode: SegMode, version: usize) -> usize {
    (version - 1) + mode.char_count_bits(version) + data_bits
}

/* ---- The module grid ---- */

struct Grid {
    size: i32,
    modules: Vec<bool>,
    isfunction: Vec<bool>,
}

impl Grid {
    fn new(version: usize) -> Self {
        let size = (version * 2 + 9) as i32;
        Grid {
            size,
            modules: vec![false; (size * size) as usize],
            isfunction: vec![false; (size * size) as usize],
        }
    }

    fn module(&self, x: i32, y: i32) -> bool {
        self.modules[(y * self.size + x) as usize]
    }

    fn set(&mut self, x: i32, y: i32, dark: bool) {
        self.modules[(y * self.size + x) as usize] = dark;
    }

    fn set_function(&mut self, x: i32, y: i32, dark: bool) {
        self.set(x, y, dark);
        self.isfunction[(y * self.size + x) as usize] = true;
    }

    fn draw_function_patterns(&mut self) {
        let size = self.size;

        // Timing patterns along the top row and left column.
        for i in 8..size {
            self.set_function(i, 0, i % 2 == 0);
            self.set_function(0, i, i % 2 == 0);
        }

        // The single finder pattern with its separator.
        for dy in 0..8 {
            for dx in 0..8 {
                let dist = (dx as i32 - 3).abs().max((dy as i32 - 3).abs());
                self.set_function(dx, dy, dist != 2 && dx != 7 && dy != 7);
            }
        }

        // Format area reserved around the finder.
        for i in 1..=8 {
            self.set_function(8, i, false);
            self.set_function(i, 8, false);
        }
    }

    /// Format information: symbol number and mask, BCH-protected.
    fn draw_format_bits(&mut self, symbol_number: u32, mask: u32) {
        let data = symbol_number << 2 | mask;
        let mut rem = data;
        for _ in 0..10 {
            rem = (rem << 1) ^ ((rem >> 9) * 0x537);
        }
        let bits = (data << 10 | rem) ^ 0x4445;
        debug_assert!(bits >> 15 == 0);

        for i in 0..8 {
            self.set_function(8, i + 1, bits >> i & 1 != 0);
        }
        for i in 8..15 {
            self.set_function(15 - i, 8, bits >> i & 1 != 0);
        }
    }

    /// Zigzag placement: column pairs from the right, no function column
    /// skip (the timing pattern lives on the edge).
    fn draw_codewords(&mut self, bits: &[bool]) {
        let size = self.size;
        let mut i = 0usize;
        let mut upward = true;
        let mut right = size - 1;
        while right >= 1 {
            for vert in 0..size {
                for j in 0..2 {
                    let x = right - j;
                    let y = if upward { size - 1 - vert } else { vert };
                    if !self.isfunction[(y * size + x) as usize] && i < bits.len() {
                        self.set(x, y, bits[i]);
                        i += 1;
                    }
                }
            }
            upward = !upward;
            right -= 2;
        }
        debug_assert_eq!(i, bits.len());
    }

    fn apply_mask(&mut self, mask: u32) {
        for y in 0..self.size {
            for x in 0..self.size {
                let invert = match mask {
                    0 => y % 2 == 0,
                    1 => (y / 2 + x / 3) % 2 == 0,
                    2 => (x * y % 2 + x * y % 3) % 2 == 0,
                    _ => ((x + y) % 2 + x * y % 3) % 2 == 0,
                };
                let idx = (y * self.size + x) as usize;
                self.modules[idx] ^= invert & !self.isfunction[idx];
            }
        }
    }

    /// Edge score: dark counts on the right and lower edges, the smaller
    /// weighted by 16; the highest score wins.
    fn evaluate(&self) -> i32 {
        let size = self.size;
        let mut sum1 = 0;
        let mut sum2 = 0;
        for i in 1..size {
            if self.module(size - 1, i) {
                sum1 += 1;
            }
            if self.module(i, size - 1) {
                sum2 += 1;
            }
        }
        if sum1 <= sum2 { sum1 * 16 + sum2 } else { sum2 * 16 + sum1 }
    }
}

pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let data = segs[0].source.clone();

    if symbol.structapp.is_some() {
        return Err(symbol.err(Error::InvalidOption(
            "Structured Append not supported for this symbology".into(),
        )));
    }
    if symbol.output_options.reader_init {
        return Err(symbol.err(Error::InvalidOption(
            "Reader Initialisation not supported for this symbology".into(),
        )));
    }

    // option_1: 1 = L, 2 = M, 3 = Q; M1 carries error detection only.
    let ecl = match symbol.option_1 {
        -1 | 0 | 1 => 0usize,
        2 => 1,
        3 => 2,
        _ => {
            return Err(symbol.err(Error::InvalidOption(
                "error correction level out of range (1 to 3)".into(),
            )));
        }
    };

    let mode = pick_mode(&data);
    let payload = segment_bits(&data, mode);

    // Version: requested via option_2 (1-4 = M1-M4) or the smallest fit.
    let version = if symbol.option_2 != 0 {
        let v = symbol.option_2;
        if !(1..=4).contains(&v) {
            return Err(symbol.err(Error::InvalidOption(
                "version out of range (1 to 4)".into(),
            )));
        }
        let v = v as usize;
        if v < mode.min_version() {
            return Err(symbol.err(Error::InvalidData(
                "input content not encodable in the selected version".into(),
            )));
        }
        if DATA_BITS[v - 1][ecl] < 0 {
            return Err(symbol.err(Error::InvalidOption(
                "error correction level not available for the selected version".into(),
            )));
        }
        if total_bits(payload.len(), mode, v) > DATA_BITS[v - 1][ecl] as usize {
            return Err(symbol.err(Error::TooLong(
                "input too long for selected symbol size".into(),
            )));
        }
        v
    } else {
        let mut found = None;
        for v in mode.min_version()..=4 {
            if DATA_BITS[v - 1][ecl] < 0 {
                continue;
            }
            if total_bits(payload.len(), mode, v) <= DATA_BITS[v - 1][ecl] as usize {
                found = Some(v);
                break;
            }
        }
        match found {
            Some(v) => v,
            None => {
                return Err(symbol.err(Error::TooLong("input too long for symbology".into())));
            }
        }
    };

    let capacity = DATA_BITS[version - 1][ecl] as usize;
    let ecc_cw = ECC_CODEWORDS[version - 1][ecl] as usize;
    let symbol_number = SYMBOL_NUMBER[version - 1][ecl] as u32;

    // Assemble the bit stream: indicator, count, payload, terminator,
    // zero-fill to the codeword boundary, then alternating pad bytes.
    // M1 and M3 end in a four-bit codeword that pads to zero.
    let mut bits: Vec<bool> = Vec::with_capacity(capacity);
    append_bits(&mut bits, mode.indicator(), version - 1);
    append_bits(&mut bits, data.len() as u32, mode.char_count_bits(version));
    bits.extend_from_slice(&payload);

    let terminator = TERMINATOR[version - 1].min(capacity - bits.len());
    append_bits(&mut bits, 0, terminator);
    while bits.len() % 8 != 0 && bits.len() < capacity {
        bits.push(false);
    }
    let mut padbyte = 0xEC;
    while capacity - bits.len() >= 8 {
        append_bits(&mut bits, padbyte, 8);
        padbyte ^= 0xEC ^ 0x11;
    }
    while bits.len() < capacity {
        bits.push(false); // the final half codeword
    }

    // Data codewords (the trailing four-bit codeword keeps its raw
    // value), then the check codewords.
    let mut datacodewords: Vec<u8> = Vec::with_capacity(capacity / 8 + 1);
    for chunk in bits.chunks(8) {
        let mut val = 0u8;
        for &b in chunk {
            val = val << 1 | b as u8;
        }
        datacodewords.push(val);
    }

    let rs = RsCode::new(0x11d, ecc_cw, 0);
    let mut ecc = rs.encode(&datacodewords);
    ecc.reverse(); // highest-degree coefficient first

    let mut stream = bits;
    for &cw in &ecc {
        append_bits(&mut stream, cw as u32, 8);
    }

    if symbol.debug {
        log::debug!(
            "version M{version}, {} data codewords + {ecc_cw} check: {datacodewords:?}",
            datacodewords.len()
        );
    }

    let user_mask = (symbol.option_3 >> 8) & 0x0f;
    let user_mask = if (1..=4).contains(&user_mask) {
        Some(user_mask as u32 - 1)
    } else {
        None
    };

    let mut grid = Grid::new(version);
    grid.draw_function_patterns();
    grid.draw_codewords(&stream);

    let mask = match user_mask {
        Some(m) => m,
        None => {
            let mut best = 0;
            let mut best_score = -1;
            for m in 0..4u32 {
                grid.apply_mask(m);
                let score = grid.evaluate();
                if score > best_score {
                    best = m;
                    best_score = score;
                }
                grid.apply_mask(m); // XOR undoes it
            }
            best
        }
    };
    grid.draw_format_bits(symbol_number, mask);
    grid.apply_mask(mask);

    let size = grid.size as usize;
    for y in 0..size {
        for x in 0..size {
            if grid.module(x as i32, y as i32) {
                symbol.set_module(y, x);
            }
        }
        symbol.set_row_height(y, 1.0);
    }
    symbol.rows = size;
    symbol.width = size;
    symbol.height = size as f32;

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::MicroQr)
    }

    #[test]
    fn test_m1_numeric_only() {
        let mut s = symbol();
        s.option_2 = 1;
        s.encode(b"0123").unwrap();
        assert_eq!((s.rows, s.width), (11, 11));

        let mut s = symbol();
        s.option_2 = 1;
        assert_eq!(s.encode(b"AB").unwrap_err().code(), 6);
    }

    #[test]
    fn test_auto_version_growth() {
        // 8 digits overflow M1's 20 data bits and land in M2 (13x13).
        let mut s = symbol();
        s.encode(b"01234567").unwrap();
        assert_eq!(s.rows, 13);

        // Alphanumeric content starts at M2.
        let mut s = symbol();
        s.encode(b"A1").unwrap();
        assert_eq!(s.rows, 13);

        // Bytes start at M3.
        let mut s = symbol();
        s.encode(b"a").unwrap();
        assert_eq!(s.rows, 15);
    }

    #[test]
    fn test_finder_and_timing() {
        let mut s = symbol();
        s.encode(b"12345").unwrap();
        // Finder core is dark, separator ring light.
        assert!(s.module_is_set(3, 3));
        assert!(!s.module_is_set(7, 7));
        // Timing alternates along the top row and left column.
        assert!(s.module_is_set(0, 8) && !s.module_is_set(0, 9));
        assert!(s.module_is_set(8, 0) && !s.module_is_set(9, 0));
    }

    #[test]
    fn test_ecc_levels_per_version() {
        // Q exists only in M4.
        let mut s = symbol();
        s.option_1 = 3;
        s.option_2 = 3;
        assert_eq!(s.encode(b"123").unwrap_err().code(), 8);

        let mut s = symbol();
        s.option_1 = 3;
        s.option_2 = 4;
        s.encode(b"123").unwrap();
        assert_eq!(s.rows, 17);
    }

    #[test]
    fn test_capacity_boundaries() {
        // M4-L numeric capacity: 3 + 6 + bits; 35 digits = 117 bits,
        // total 126 <= 128 fits; 36 digits = 121 bits, total 130 > 128.
        let mut s = symbol();
        s.option_2 = 4;
        s.encode(&[b'7'; 35]).unwrap();
        assert_eq!(s.rows, 17);

        let mut s = symbol();
        s.option_2 = 4;
        assert_eq!(s.encode(&[b'7'; 36]).unwrap_err().code(), 5);
    }

    #[test]
    fn test_user_mask() {
        let mut s = symbol();
        s.option_3 = 2 << 8; // mask 1
        s.encode(b"99").unwrap();
        assert_eq!(s.rows, 11);
    }

    #[test]
    fn test_structapp_rejected() {
        let mut s = symbol();
        s.structapp = Some(crate::symbol::StructApp { index: 1, count: 2, id: String::new() });
        assert_eq!(s.encode(b"1").unwrap_err().code(), 8);
    }

    #[test]
    fn test_segment_bit_lengths() {
        // Numeric: 3+3+2 digits -> 10+10+7 bits.
        assert_eq!(segment_bits(b"12345678", SegMode::Numeric).len(), 27);
        // Alphanumeric: 2+1 -> 11+6.
        assert_eq!(segment_bits(b"AC-", SegMode::Alphanumeric).len(), 17);
        assert_eq!(segment_bits(b"ab", SegMode::Byte).len(), 16);
    }
}
