//! Aztec Code (ISO/IEC 24778).
//!
//! Five text modes (upper, lower, mixed, punctuation, digit) with shift
//! and latch transitions plus binary shifts; bit stuffing per word size;
//! Reed-Solomon over GF(64), GF(256), GF(1024) or GF(4096) depending on
//! the layer count (the wider fields use the heap-table engine); and the
//! layered spiral placement around the bullseye, with a reference grid on
//! full-range symbols. No masking: the bullseye carries orientation.

use crate::error::{Error, Warning};
use crate::reedsol::{RsCode, RsUint};
use crate::symbol::{BaseMode, Segment, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Upper,
    Lower,
    Mixed,
    Punct,
    Digit,
}

impl Mode {
    /// Code width in this mode: digit codes are four bits, the rest five.
    fn bits(self) -> usize {
        if self == Mode::Digit { 4 } else { 5 }
    }
}

/// Code value of `c` in `mode`, if directly representable.
fn mode_value(mode: Mode, c: u8) -> Option<u32> {
    match mode {
        Mode::Upper => match c {
            b' ' => Some(1),
            b'A'..=b'Z' => Some((c - b'A') as u32 + 2),
            _ => None,
        },
        Mode::Lower => match c {
            b' ' => Some(1),
            b'a'..=b'z' => Some((c - b'a') as u32 + 2),
            _ => None,
        },
        Mode::Digit => match c {
            b' ' => Some(1),
            b'0'..=b'9' => Some((c - b'0') as u32 + 2),
            b',' => Some(12),
            b'.' => Some(13),
            _ => None,
        },
        Mode::Mixed => match c {
            b' ' => Some(1),
            0x01..=0x0d => Some(c as u32 + 1),
            0x1b..=0x1f => Some((c - 0x1b) as u32 + 15),
            b'@' => Some(20),
            b'\\' => Some(21),
            b'^' => Some(22),
            b'_' => Some(23),
            b'`' => Some(24),
            b'|' => Some(25),
            b'~' => Some(26),
            0x7f => Some(27),
            _ => None,
        },
        Mode::Punct => match c {
            b'\r' => Some(1),
            b'!' => Some(6),
            b'"' => Some(7),
            b'#' => Some(8),
            b'$' => Some(9),
            b'%' => Some(10),
            b'&' => Some(11),
            b'\'' => Some(12),
            b'(' => Some(13),
            b')' => Some(14),
            b'*' => Some(15),
            b'+' => Some(16),
            b',' => Some(17),
            b'-' => Some(18),
            b'.' => Some(19),
            b'/' => Some(20),
            b':' => Some(21),
            b';' => Some(22),
            b'<' => Some(23),
            b'=' => Some(24),
            b'>' => Some(25),
            b'?' => Some(26),
            b'[' => Some(27),
            b']' => Some(28),
            b'{' => Some(29),
            b'}' => Some(30),
            _ => None,
        },
    }
}

/// Two-character punctuation codes.
fn punct_pair(a: u8, b: u8) -> Option<u32> {
    match (a, b) {
        (b'\r', b'\n') => Some(2),
        (b'.', b' ') => Some(3),
        (b',', b' ') => Some(4),
        (b':', b' ') => Some(5),
        _ => None,
    }
}

/// Shortest latch path between modes as (code, bits) steps.
fn latch_seq(from: Mode, to: Mode) -> &'static [(u32, usize)] {
    use Mode::*;
    match (from, to) {
        (Upper, Lower) | (Mixed, Lower) => &[(28, 5)],
        (Upper, Mixed) | (Lower, Mixed) => &[(29, 5)],
        (Upper, Digit) | (Lower, Digit) => &[(30, 5)],
        (Upper, Punct) | (Lower, Punct) => &[(29, 5), (30, 5)],
        (Lower, Upper) => &[(30, 5), (14, 4)], // via digit
        (Mixed, Upper) => &[(29, 5)],
        (Mixed, Punct) => &[(30, 5)],
        (Mixed, Digit) => &[(29, 5), (30, 5)],
        (Digit, Upper) => &[(14, 4)],
        (Digit, Lower) => &[(14, 4), (28, 5)],
        (Digit, Mixed) => &[(14, 4), (29, 5)],
        (Digit, Punct) => &[(14, 4), (29, 5), (30, 5)],
        (Punct, Upper) => &[(31, 5)],
        (Punct, Lower) => &[(31, 5), (28, 5)],
        (Punct, Mixed) => &[(31, 5), (29, 5)],
        (Punct, Digit) => &[(31, 5), (30, 5)],
        _ => &[],
    }
}

/// Punctuation shift, available from every non-punctuation mode.
fn punct_shift(from: Mode) -> (u32, usize) {
    (0, from.bits())
}

/// The natural home mode for a character.
fn best_mode(c: u8) -> Option<Mode> {
    if c.is_ascii_digit() {
        Some(Mode::Digit)
    } else if c.is_ascii_uppercase() || c == b' ' {
        Some(Mode::Upper)
    } else if c.is_ascii_lowercase() {
        Some(Mode::Lower)
    } else if mode_value(Mode::Punct, c).is_some() {
        Some(Mode::Punct)
    } else if mode_value(Mode::Mixed, c).is_some() {
        Some(Mode::Mixed)
    } else {
        None
    }
}

struct Bits(Vec<bool>);

impl Bits {
    fn push(&mut self, val: u32, len: usize) {
        debug_assert!(len == 32 || val >> len == 0);
        for i in (0..len).rev() {
            self.0.push(val >> i & 1 != 0);
        }
    }
}

/// Emits FLG(n): FNC1 for n = 0, an ECI designator for n = 1..=6.
fn push_flg(bits: &mut Bits, mode: Mode, value: u32) {
    let (sv, sb) = punct_shift(mode);
    bits.push(sv, sb);
    bits.push(0, 5); // FLG(n)
    if value == 0 {
        bits.push(0, 3); // FNC1
    } else {
        let digits = value.to_string();
        bits.push(digits.len() as u32, 3);
        for d in digits.bytes() {
            bits.push((d - b'0') as u32 + 2, 4);
        }
    }
}

/// Binary run: B/S, a 5-bit (or 0 + 11-bit extended) length, raw bytes.
fn push_binary(bits: &mut Bits, mode: &mut Mode, bytes: &[u8]) {
    // B/S is reachable from upper, lower and mixed only.
    if matches!(*mode, Mode::Digit | Mode::Punct) {
        for &(v, b) in latch_seq(*mode, Mode::Upper) {
            bits.push(v, b);
        }
        *mode = Mode::Upper;
    }
    for chunk in bytes.chunks(31 + 2047) {
        bits.push(31, mode.bits()); // B/S
        if chunk.len() < 32 {
            bits.push(chunk.len() as u32, 5);
        } else {
            bits.push(0, 5);
            bits.push(chunk.len() as u32 - 31, 11);
        }
        for &b in chunk {
            bits.push(b as u32, 8);
        }
    }
    // The mode in force resumes after a binary shift.
}

/// Reduces the payload to the five-mode bit stream (the high-level
/// encoding). Greedy: stay in mode, shift for isolated excursions, latch
/// for runs.
fn highlevel_encode(symbol: &Symbol, source: &[u8], eci: u32) -> Vec<bool> {
    let gs1 = symbol.input_mode.base == BaseMode::Gs1;
    let mut bits = Bits(Vec::with_capacity(source.len() * 8 + 32));
    let mut mode = Mode::Upper;

    if eci != 0 {
        push_flg(&mut bits, mode, eci);
    }
    if gs1 {
        push_flg(&mut bits, mode, 0);
    }

    let mut pos = 0;
    while pos < source.len() {
        let c = source[pos];

        if gs1 && c == b'[' {
            // FNC1 as the element separator.
            push_flg(&mut bits, mode, 0);
            pos += 1;
            continue;
        }

        // Two-character punctuation first.
        if pos + 1 < source.len() {
            if let Some(v) = punct_pair(c, source[pos + 1]) {
                if mode == Mode::Punct {
                    bits.push(v, 5);
                } else {
                    let (sv, sb) = punct_shift(mode);
                    bits.push(sv, sb);
                    bits.push(v, 5);
                }
                pos += 2;
                continue;
            }
        }

        if let Some(v) = mode_value(mode, c) {
            bits.push(v, mode.bits());
            pos += 1;
            continue;
        }

        let Some(target) = best_mode(c) else {
            // Not representable in any mode: a binary run.
            let mut end = pos;
            while end < source.len() && best_mode(source[end]).is_none() {
                end += 1;
            }
            push_binary(&mut bits, &mut mode, &source[pos..end]);
            pos = end;
            continue;
        };

        let next_in_current =
            pos + 1 < source.len() && mode_value(mode, source[pos + 1]).is_some();

        // Isolated excursions shift instead of latching.
        if next_in_current {
            if target == Mode::Punct {
                let (sv, sb) = punct_shift(mode);
                bits.push(sv, sb);
                bits.push(mode_value(Mode::Punct, c).unwrap(), 5);
                pos += 1;
                continue;
            }
            if target == Mode::Upper && mode == Mode::Lower {
                bits.push(28, 5); // U/S
                bits.push(mode_value(Mode::Upper, c).unwrap(), 5);
                pos += 1;
                continue;
            }
            if target == Mode::Upper && mode == Mode::Digit {
                bits.push(15, 4); // U/S
                bits.push(mode_value(Mode::Upper, c).unwrap(), 5);
                pos += 1;
                continue;
            }
        }

        for &(v, b) in latch_seq(mode, target) {
            bits.push(v, b);
        }
        mode = target;
        // The character re-encodes under the new mode.
    }

    bits.0
}

/* ---- Bit stuffing and sizing ---- */

/// Breaks the stream into `wordsize`-bit words, stuffing a complementary
/// bit whenever the first `wordsize - 1` bits of a word are uniform, and
/// padding the tail with 1 bits.
fn stuff_bits(bits: &[bool], wordsize: usize) -> Vec<u32> {
    let mask = (1u32 << wordsize) - 2;
    let mut words = Vec::with_capacity(bits.len() / wordsize + 2);
    let mut i = 0;
    while i < bits.len() {
        let mut word = 0u32;
        for j in 0..wordsize {
            word = word << 1 | bits.get(i + j).copied().unwrap_or(true) as u32;
        }
        if word & mask == mask {
            words.push(mask);
            i += wordsize - 1;
        } else if word & mask == 0 {
            words.push(word | 1);
            i += wordsize - 1;
        } else {
            words.push(word);
            i += wordsize;
        }
    }
    words
}

/// Bit capacity of a symbol.
fn capacity_bits(compact: bool, layers: usize) -> usize {
    if compact {
        (88 + 16 * layers) * layers
    } else {
        (112 + 16 * layers) * layers
    }
}

/// Codeword size in bits for a layer count.
fn word_size(layers: usize) -> usize {
    match layers {
        1..=2 => 6,
        3..=8 => 8,
        9..=22 => 10,
        _ => 12,
    }
}

/// Check codewords for a data word stream.
fn check_words(
    symbol: &mut Symbol,
    words: &[u32],
    wordsize: usize,
    nsym: usize,
) -> Result<Vec<u32>, Error> {
    match wordsize {
        6 | 8 => {
            let poly = if wordsize == 6 { 0x43 } else { 0x163 };
            let rs = RsCode::new(poly, nsym, 1);
            let data: Vec<u8> = words.iter().map(|&w| w as u8).collect();
            Ok(rs.encode(&data).iter().rev().map(|&w| w as u32).collect())
        }
        10 | 12 => {
            let (poly, logmod) = if wordsize == 10 { (0x409, 1023) } else { (0x1069, 4095) };
            let rs = RsUint::new(poly, logmod, nsym, 1)
                .ok_or_else(|| symbol.err(Error::Memory("insufficient memory for field tables".into())))?;
            let mut ecc = rs.encode(words);
            ecc.reverse();
            Ok(ecc)
        }
        _ => unreachable!("word size is 6, 8, 10 or 12"),
    }
}

/* ---- Placement ---- */

fn draw(
    symbol: &mut Symbol,
    compact: bool,
    layers: usize,
    message_bits: &[bool],
    mode_message: &[bool],
) {
    let base_size = if compact { 11 + layers * 4 } else { 14 + layers * 4 };

    // Full-range symbols thread a reference grid through the data, which
    // the alignment map accounts for.
    let (matrix_size, alignment_map) = if compact {
        (base_size, (0..base_size).collect::<Vec<usize>>())
    } else {
        let matrix_size = base_size + 1 + 2 * ((base_size / 2 - 1) / 15);
        let mut map = vec![0usize; base_size];
        let orig_center = base_size / 2;
        let center = matrix_size / 2;
        for i in 0..orig_center {
            let offset = i + i / 15;
            map[orig_center - i - 1] = center - offset - 1;
            map[orig_center + i] = center + offset + 1;
        }
        (matrix_size, map)
    };
    let center = matrix_size / 2;

    let mut set = |x: usize, y: usize| symbol.set_module(y, x);

    // Data dominoes, layer by layer, four sides each.
    let mut row_offset = 0usize;
    let bit = |i: usize| message_bits.get(i).copied().unwrap_or(false);
    for i in 0..layers {
        let row_size = (layers - i) * 4 + if compact { 9 } else { 12 };
        for j in 0..row_size {
            let column_offset = j * 2;
            for k in 0..2 {
                if bit(row_offset + column_offset + k) {
                    set(alignment_map[i * 2 + k], alignment_map[i * 2 + j]);
                }
                if bit(row_offset + row_size * 2 + column_offset + k) {
                    set(alignment_map[i * 2 + j], alignment_map[base_size - 1 - i * 2 - k]);
                }
                if bit(row_offset + row_size * 4 + column_offset + k) {
                    set(
                        alignment_map[base_size - 1 - i * 2 - k],
                        alignment_map[base_size - 1 - i * 2 - j],
                    );
                }
                if bit(row_offset + row_size * 6 + column_offset + k) {
                    set(alignment_map[base_size - 1 - i * 2 - j], alignment_map[i * 2 + k]);
                }
            }
        }
        row_offset += row_size * 8;
    }

    // Reference grid: dotted rows and columns through the centre and at
    // every sixteenth line out from it (the positions the alignment map
    // skips), dark where the distance along the line is even.
    if !compact {
        let mut k = 0usize;
        while center + k < matrix_size {
            for j in ((center & 1)..matrix_size).step_by(2) {
                set(center - k, j);
                set(center + k, j);
                set(j, center - k);
                set(j, center + k);
            }
            k += 16;
        }
    }

    // Bullseye rings.
    let radius = if compact { 5 } else { 7 };
    let mut ring = 0usize;
    while ring < radius {
        for j in center - ring..=center + ring {
            set(j, center - ring);
            set(j, center + ring);
            set(center - ring, j);
            set(center + ring, j);
        }
        ring += 2;
    }

    // Orientation marks at the bullseye corners.
    set(center - radius, center - radius);
    set(center - radius + 1, center - radius);
    set(center - radius, center - radius + 1);
    set(center + radius, center - radius);
    set(center + radius, center - radius + 1);
    set(center + radius, center + radius - 1);

    // Mode message around the bullseye.
    let mbit = |i: usize| mode_message.get(i).copied().unwrap_or(false);
    if compact {
        for i in 0..7 {
            let offset = center - 3 + i;
            if mbit(i) {
                set(offset, center - 5);
            }
            if mbit(i + 7) {
                set(center + 5, offset);
            }
            if mbit(20 - i) {
                set(offset, center + 5);
            }
            if mbit(27 - i) {
                set(center - 5, offset);
            }
        }
    } else {
        for i in 0..10 {
            let offset = center - 5 + i + i / 5;
            if mbit(i) {
                set(offset, center - 7);
            }
            if mbit(i + 10) {
                set(center + 7, offset);
            }
            if mbit(29 - i) {
                set(offset, center + 7);
            }
            if mbit(39 - i) {
                set(center - 7, offset);
            }
        }
    }

    symbol.rows = matrix_size;
    symbol.width = matrix_size;
    for y in 0..matrix_size {
        symbol.set_row_height(y, 1.0);
    }
    symbol.height = matrix_size as f32;
}

/* ---- Top level ---- */

pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let source = segs[0].source.clone();
    let eci = segs[0].eci;

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

    // option_1: check-word share 1-4 = 10/23/36/50 percent (plus three
    // words); the default is 23.
    let percent = match symbol.option_1 {
        -1 | 0 | 2 => 23,
        1 => 10,
        3 => 36,
        4 => 50,
        _ => {
            return Err(symbol.err(Error::InvalidOption(
                "error correction level out of range (1 to 4)".into(),
            )));
        }
    };

    let bits = highlevel_encode(symbol, &source, eci);

    // Candidate sizes: option_2 pins one (1-4 compact, 5-36 full layers
    // 1-32); otherwise the smallest symbol that fits, compact preferred
    // at equal size.
    let candidates: Vec<(bool, usize)> = if symbol.option_2 != 0 {
        match symbol.option_2 {
            1..=4 => vec![(true, symbol.option_2 as usize)],
            5..=36 => vec![(false, symbol.option_2 as usize - 4)],
            _ => {
                return Err(symbol.err(Error::InvalidOption(
                    "symbol size out of range (1 to 36)".into(),
                )));
            }
        }
    } else {
        let mut list: Vec<(bool, usize)> = (1..=4usize)
            .map(|l| (true, l))
            .chain((1..=32usize).map(|l| (false, l)))
            .collect();
        list.sort_by_key(|&(compact, layers)| {
            let base = if compact { 11 + layers * 4 } else { 14 + layers * 4 };
            let size = if compact { base } else { base + 1 + 2 * ((base / 2 - 1) / 15) };
            (size, !compact as usize)
        });
        list
    };

    let mut chosen = None;
    for &(compact, layers) in &candidates {
        let total_bits = capacity_bits(compact, layers);
        let wordsize = word_size(layers);
        let total_words = total_bits / wordsize;
        let stuffed = stuff_bits(&bits, wordsize);
        // Reserve the requested share of check words, plus three.
        let ecc_min_bits = total_bits * percent / 100 + 3 * wordsize;
        if stuffed.len() * wordsize + ecc_min_bits > total_words * wordsize {
            continue;
        }
        // The mode message field caps compact data words at 64.
        if compact && stuffed.len() > 64 {
            continue;
        }
        chosen = Some((compact, layers, stuffed));
        break;
    }
    let Some((compact, layers, data_words)) = chosen else {
        return Err(symbol.err(Error::TooLong(if symbol.option_2 != 0 {
            "input too long for selected symbol size".into()
        } else {
            "input too long for symbology".into()
        })));
    };

    let total_bits = capacity_bits(compact, layers);
    let wordsize = word_size(layers);
    let total_words = total_bits / wordsize;
    let ecc_words = total_words - data_words.len();

    let ecc = check_words(symbol, &data_words, wordsize, ecc_words)?;

    if symbol.debug {
        log::debug!(
            "{} layers {layers}, {} data + {ecc_words} check words of {wordsize} bits",
            if compact { "compact" } else { "full" },
            data_words.len()
        );
    }

    // Message bit stream: leading pad to the symbol's bit capacity, then
    // data and check words.
    let mut message = Bits(Vec::with_capacity(total_bits));
    message.push(0, total_bits % wordsize);
    for &w in data_words.iter().chain(ecc.iter()) {
        message.push(w, wordsize);
    }

    // Mode message: layer and data-word counts, RS over GF(16).
    let mut mode_data = Bits(Vec::with_capacity(40));
    if compact {
        mode_data.push(layers as u32 - 1, 2);
        mode_data.push(data_words.len() as u32 - 1, 6);
    } else {
        mode_data.push(layers as u32 - 1, 5);
        mode_data.push(data_words.len() as u32 - 1, 11);
    }
    let mode_words: Vec<u8> = mode_data
        .0
        .chunks(4)
        .map(|chunk| chunk.iter().fold(0u8, |a, &b| a << 1 | b as u8))
        .collect();
    let mode_rs = RsCode::new(0x13, if compact { 5 } else { 6 }, 1);
    let mode_ecc = mode_rs.encode(&mode_words);
    let mut mode_message = Bits(Vec::with_capacity(40));
    for &w in mode_words.iter().chain(mode_ecc.iter().rev()) {
        mode_message.push(w as u32, 4);
    }

    draw(symbol, compact, layers, &message.0, &mode_message.0);

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::Aztec)
    }

    #[test]
    fn test_single_upper_compact1() {
        let mut s = symbol();
        s.encode(b"A").unwrap();
        assert_eq!((s.rows, s.width), (15, 15));
        // Bullseye: centre dark, first ring light, second ring dark.
        assert!(s.module_is_set(7, 7));
        assert!(!s.module_is_set(7, 8));
        assert!(s.module_is_set(7, 9));
        // Orientation chevron at the top-left ring corner.
        assert!(s.module_is_set(2, 2) && s.module_is_set(2, 3) && s.module_is_set(3, 2));
    }

    #[test]
    fn test_full_range_forced() {
        let mut s = symbol();
        s.option_2 = 5; // full, one layer
        s.encode(b"A").unwrap();
        assert_eq!((s.rows, s.width), (19, 19));
    }

    #[test]
    fn test_mode_values() {
        assert_eq!(mode_value(Mode::Upper, b'A'), Some(2));
        assert_eq!(mode_value(Mode::Upper, b'Z'), Some(27));
        assert_eq!(mode_value(Mode::Lower, b'a'), Some(2));
        assert_eq!(mode_value(Mode::Digit, b'0'), Some(2));
        assert_eq!(mode_value(Mode::Digit, b'.'), Some(13));
        assert_eq!(mode_value(Mode::Punct, b'!'), Some(6));
        assert_eq!(mode_value(Mode::Punct, b'}'), Some(30));
        assert_eq!(mode_value(Mode::Mixed, 0x0d), Some(14));
        assert_eq!(mode_value(Mode::Mixed, b'@'), Some(20));
        assert_eq!(mode_value(Mode::Upper, b'a'), None);
    }

    #[test]
    fn test_highlevel_upper_run() {
        let s = symbol();
        // "AB": two five-bit upper codes, no mode changes.
        let bits = highlevel_encode(&s, b"AB", 0);
        assert_eq!(bits.len(), 10);
    }

    #[test]
    fn test_highlevel_latch_to_digit() {
        let s = symbol();
        // "123": D/L (5) then three four-bit codes.
        let bits = highlevel_encode(&s, b"123", 0);
        assert_eq!(bits.len(), 5 + 3 * 4);
    }

    #[test]
    fn test_highlevel_punct_shift() {
        let s = symbol();
        // "A!B": the isolated '!' goes through P/S.
        let bits = highlevel_encode(&s, b"A!B", 0);
        assert_eq!(bits.len(), 5 + 5 + 5 + 5);
    }

    #[test]
    fn test_highlevel_binary_run() {
        let s = symbol();
        // Two unrepresentable bytes: B/S + 5-bit length + 16 bits.
        let bits = highlevel_encode(&s, &[0x80, 0x81], 0);
        assert_eq!(bits.len(), 5 + 5 + 16);
    }

    #[test]
    fn test_stuffing_all_ones() {
        // Five 1 bits followed by another 1 must split with a stuffed 0.
        let bits = vec![true; 6];
        let words = stuff_bits(&bits, 6);
        assert_eq!(words[0], 0b111110);
        // The sixth bit carries into a padded word.
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_stuffing_all_zeros() {
        let bits = vec![false; 6];
        let words = stuff_bits(&bits, 6);
        assert_eq!(words[0], 0b000001);
        assert_eq!(words.len(), 2);
    }

    #[test]
    fn test_word_sizes() {
        assert_eq!(word_size(1), 6);
        assert_eq!(word_size(3), 8);
        assert_eq!(word_size(9), 10);
        assert_eq!(word_size(23), 12);
    }

    #[test]
    fn test_capacity_grows_layers() {
        // A payload too big for compact symbols selects a full-range
        // size with wider words.
        let mut s = symbol();
        let data: Vec<u8> = std::iter::repeat(b"Aztec Code ")
            .take(30)
            .flatten()
            .copied()
            .collect();
        s.encode(&data).unwrap();
        assert!(s.rows > 27);
        assert_eq!(s.rows % 2, 1);
    }

    #[test]
    fn test_fixed_size_too_small() {
        let mut s = symbol();
        s.option_2 = 1;
        let data = vec![b'A'; 200];
        assert_eq!(s.encode(&data).unwrap_err().code(), 5);
    }

    #[test]
    fn test_gs1_flg_prefix() {
        let mut s = symbol();
        s.input_mode.base = BaseMode::Gs1;
        let bits = highlevel_encode(&s, b"0112345678901231", 0);
        // P/S + FLG(0): 5 + 5 + 3 bits before the data latches digit.
        assert!(bits.len() > 13);
        let mut s = symbol();
        s.input_mode.base = BaseMode::Gs1;
        s.encode(b"[01]12345678901231[21]ABC").unwrap();
        assert!(s.rows >= 15);
    }

    #[test]
    fn test_eci_flg() {
        let s = symbol();
        let with_eci = highlevel_encode(&s, b"A", 26);
        let without = highlevel_encode(&s, b"A", 0);
        // FLG(2) for "26": 5 + 5 + 3 + 2 * 4 extra bits.
        assert_eq!(with_eci.len(), without.len() + 21);
    }

    #[test]
    fn test_ecc_share_option() {
        // Higher check share forces a bigger symbol for the same data.
        let data = vec![b'M'; 30];
        let mut low = symbol();
        low.option_1 = 1;
        low.encode(&data).unwrap();
        let mut high = symbol();
        high.option_1 = 4;
        high.encode(&data).unwrap();
        assert!(high.rows >= low.rows);
    }
}
