//! Code 128 (ISO/IEC 15417) and its GS1 shipping forms: GS1-128, EAN-14
//! and NVE-18.
//!
//! Code set selection is automatic (digit runs compact into set C, control
//! characters pull set A, single stragglers use shifts) unless the
//! `extra_escape` input flag supplies manual `\^A`/`\^B`/`\^C` switches.

use crate::common::{NEON, expand, not_sane, set_height};
use crate::error::{Error, Warning, worse};
use crate::gs1;
use crate::symbol::{Symbol, Symbology};

/// Widths for values 0-105; the stop pattern is its own 13-module shape.
static C128_TABLE: [&[u8; 6]; 106] = [
    b"212222", b"222122", b"222221", b"121223", b"121322", b"131222", b"122213",
    b"122312", b"132212", b"221213", b"221312", b"231212", b"112232", b"122132",
    b"122231", b"113222", b"123122", b"123221", b"223211", b"221132", b"221231",
    b"213212", b"223112", b"312131", b"311222", b"321122", b"321221", b"312212",
    b"322112", b"322211", b"212123", b"212321", b"232121", b"111323", b"131123",
    b"131321", b"112313", b"132113", b"132311", b"211313", b"231113", b"231311",
    b"112133", b"112331", b"132131", b"113123", b"113321", b"133121", b"313121",
    b"211331", b"231131", b"213113", b"213311", b"213131", b"311123", b"311321",
    b"331121", b"312113", b"312311", b"332111", b"314111", b"221411", b"431111",
    b"111224", b"111422", b"121124", b"121421", b"141122", b"141221", b"112214",
    b"112412", b"122114", b"122411", b"142112", b"142211", b"241211", b"221114",
    b"413111", b"241112", b"134111", b"111242", b"121142", b"121241", b"114212",
    b"124112", b"124211", b"411212", b"421112", b"421211", b"212141", b"214121",
    b"412121", b"111143", b"111341", b"131141", b"114113", b"114311", b"411113",
    b"411311", b"113141", b"114131", b"311141", b"411131", b"211412", b"211214",
    b"211232",
];

const STOP: &[u8] = b"2331112";

const SHIFT: u8 = 98;
const CODE_C: u8 = 99;
const FNC1: u8 = 102;
const START_A: u8 = 103;
const START_B: u8 = 104;
const START_C: u8 = 105;

/// Longest symbol in glyphs (start + data + shifts), check digit and stop
/// excluded.
const MAX_GLYPHS: usize = 102;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Set {
    A,
    B,
    C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tok {
    Ch(u8),
    Fnc1,
    Force(Set),
}

fn encodable(set: Set, c: u8) -> bool {
    match set {
        Set::A => c < 96,
        Set::B => (32..128).contains(&c),
        Set::C => c.is_ascii_digit(),
    }
}

fn value_in(set: Set, c: u8) -> u8 {
    match set {
        Set::A => {
            if c < 32 {
                c + 64
            } else {
                c - 32
            }
        }
        Set::B => c - 32,
        Set::C => unreachable!("set C values come from digit pairs"),
    }
}

fn latch_code(from: Set, to: Set) -> u8 {
    match (from, to) {
        (Set::A, Set::B) | (Set::C, Set::B) => 100,
        (Set::B, Set::A) | (Set::C, Set::A) => 101,
        (_, Set::C) => CODE_C,
        _ => unreachable!("latch to current set"),
    }
}

fn fnc4_code(set: Set) -> u8 {
    match set {
        Set::A => 101,
        Set::B => 100,
        Set::C => unreachable!("FNC4 undefined in set C"),
    }
}

/// Splits manual-mode input into data characters and control markers.
fn tokenize(symbol: &mut Symbol, source: &[u8], gs1: bool) -> Result<Vec<Tok>, Error> {
    let manual = symbol.input_mode.extra_escape && symbol.symbology == Symbology::Code128;
    let mut toks = Vec::with_capacity(source.len());
    let mut i = 0;
    while i < source.len() {
        let c = source[i];
        if gs1 && c == b'[' {
            toks.push(Tok::Fnc1);
            i += 1;
            continue;
        }
        if manual && c == b'\\' && i + 1 < source.len() && source[i + 1] == b'^' {
            if i + 2 >= source.len() {
                return Err(symbol.err(Error::InvalidData(
                    "incomplete \\^ sequence at end of input".into(),
                )));
            }
            match source[i + 2] {
                b'A' => toks.push(Tok::Force(Set::A)),
                b'B' => toks.push(Tok::Force(Set::B)),
                b'C' => toks.push(Tok::Force(Set::C)),
                b'1' => toks.push(Tok::Fnc1),
                b'^' => {
                    toks.push(Tok::Ch(b'\\'));
                    toks.push(Tok::Ch(b'^'));
                }
                other => {
                    return Err(symbol.err(Error::InvalidData(format!(
                        "invalid \\^ sequence '\\^{}' in input",
                        other as char
                    ))));
                }
            }
            i += 3;
            continue;
        }
        toks.push(Tok::Ch(c));
        i += 1;
    }
    Ok(toks)
}

fn digits_ahead(toks: &[Tok], from: usize) -> usize {
    toks[from..]
        .iter()
        .take_while(|t| matches!(t, Tok::Ch(c) if c.is_ascii_digit()))
        .count()
}

fn tok_char(toks: &[Tok], i: usize) -> Option<u8> {
    match toks.get(i) {
        Some(Tok::Ch(c)) => Some(*c),
        _ => None,
    }
}

/// Turns tokens into Code 128 symbol values (start code included).
fn select_and_emit(
    symbol: &mut Symbol,
    toks: &[Tok],
    gs1: bool,
) -> Result<Vec<u8>, Error> {
    let manual = toks.iter().any(|t| matches!(t, Tok::Force(_)));
    let n_chars = toks.iter().filter(|t| matches!(t, Tok::Ch(_))).count();

    // Start code.
    let mut set;
    let mut start_at = 0;
    if let Some(Tok::Force(s)) = toks.first() {
        set = *s;
        start_at = 1;
    } else {
        let d0 = digits_ahead(toks, 0);
        let first_ch = toks.iter().find_map(|t| match t {
            Tok::Ch(c) => Some(*c),
            _ => None,
        });
        set = if gs1 || d0 >= 4 || (d0 == n_chars && d0 >= 2) {
            Set::C
        } else if first_ch.is_some_and(|c| c < 32) {
            Set::A
        } else {
            Set::B
        };
    }
    if symbol.output_options.reader_init && set == Set::C {
        // FNC3 has no set C representation.
        set = Set::B;
    }

    let mut values: Vec<u8> = Vec::with_capacity(toks.len() + 8);
    values.push(match set {
        Set::A => START_A,
        Set::B => START_B,
        Set::C => START_C,
    });
    if gs1 {
        values.push(FNC1);
    }
    if symbol.output_options.reader_init && !gs1 {
        values.push(96); // FNC3
    }

    let mut i = start_at;
    while i < toks.len() {
        match toks[i] {
            Tok::Force(s2) => {
                if s2 != set {
                    values.push(latch_code(set, s2));
                    set = s2;
                }
                i += 1;
            }
            Tok::Fnc1 => {
                values.push(FNC1);
                i += 1;
            }
            Tok::Ch(c) => {
                if set == Set::C {
                    if c.is_ascii_digit()
                        && tok_char(toks, i + 1).is_some_and(|c2| c2.is_ascii_digit())
                    {
                        let d2 = tok_char(toks, i + 1).unwrap();
                        values.push((c - b'0') * 10 + (d2 - b'0'));
                        i += 2;
                        continue;
                    }
                    if manual {
                        return Err(symbol.err(Error::InvalidData(
                            "code set C requires pairs of digits".into(),
                        )));
                    }
                    let target = if c < 32 { Set::A } else { Set::B };
                    values.push(latch_code(set, target));
                    set = target;
                    continue;
                }

                // Consider compacting an upcoming digit run into set C.
                if !manual {
                    let d = digits_ahead(toks, i);
                    let to_end = i + d == toks.len();
                    if d >= 6 || (d >= 4 && to_end) {
                        if d % 2 == 1 {
                            values.push(value_in(set, c));
                            i += 1;
                        }
                        values.push(latch_code(set, Set::C));
                        set = Set::C;
                        continue;
                    }
                }

                let (cc, extended) = if c >= 128 { (c - 128, true) } else { (c, false) };

                if encodable(set, cc) {
                    if extended {
                        values.push(fnc4_code(set));
                    }
                    values.push(value_in(set, cc));
                    i += 1;
                    continue;
                }

                let other = if set == Set::A { Set::B } else { Set::A };
                // Shift for an isolated character, latch when the next
                // one leaves the current set too.
                let next_stays = tok_char(toks, i + 1)
                    .is_some_and(|c2| encodable(set, if c2 >= 128 { c2 - 128 } else { c2 }));
                if !extended && next_stays && !manual {
                    values.push(SHIFT);
                    values.push(value_in(other, cc));
                    i += 1;
                } else if manual {
                    values.push(SHIFT);
                    if extended {
                        values.push(fnc4_code(other));
                    }
                    values.push(value_in(other, cc));
                    i += 1;
                } else {
                    values.push(latch_code(set, other));
                    set = other;
                }
            }
        }
        if values.len() > MAX_GLYPHS {
            return Err(symbol.err(Error::TooLong("input too long".into())));
        }
    }

    if values.len() > MAX_GLYPHS {
        return Err(symbol.err(Error::TooLong("input too long".into())));
    }

    Ok(values)
}

/// Renders values + check digit + stop and expands into the symbol.
fn emit(symbol: &mut Symbol, values: &[u8]) {
    // Modulo 103 check digit: start weight 1, data weights 1, 2, ...
    let mut total = values[0] as u32;
    for (i, &v) in values[1..].iter().enumerate() {
        total += (i as u32 + 1) * v as u32;
    }
    let check = (total % 103) as u8;

    if symbol.debug {
        log::debug!("Code 128 values: {values:?} check {check}");
    }

    let mut dest: Vec<u8> = Vec::with_capacity(values.len() * 6 + 13);
    for &v in values {
        dest.extend_from_slice(C128_TABLE[v as usize]);
    }
    dest.extend_from_slice(C128_TABLE[check as usize]);
    dest.extend_from_slice(STOP);

    expand(symbol, &dest);
}

pub fn encode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    match symbol.symbology {
        Symbology::Code128 => code128(symbol, source),
        Symbology::Gs1_128 => gs1_128(symbol, source),
        Symbology::Ean14 => gs1_wrapper(symbol, source, b"01", 13),
        Symbology::Nve18 => gs1_wrapper(symbol, source, b"00", 17),
        _ => unreachable!("not a Code 128 symbology"),
    }
}

fn code128(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    let toks = tokenize(symbol, source, false)?;
    if !toks.iter().any(|t| matches!(t, Tok::Ch(_) | Tok::Fnc1)) {
        return Err(symbol.err(Error::InvalidData("no input data".into())));
    }
    let values = select_and_emit(symbol, &toks, false)?;
    emit(symbol, &values);

    let warning = set_height(symbol, 0.0, 50.0, 0.0, true);

    let hrt: Vec<u8> = toks
        .iter()
        .filter_map(|t| match t {
            Tok::Ch(c) => Some(*c),
            _ => None,
        })
        .collect();
    let hrt_warning = symbol.set_hrt_latin1(&hrt);

    Ok(worse(warning, hrt_warning))
}

/// Takes the reduced FNC1 stream produced by the GS1 validator.
fn gs1_128(symbol: &mut Symbol, reduced: &[u8]) -> Result<Option<Warning>, Error> {
    let data_len = reduced.iter().filter(|&&c| c != b'[').count();
    if data_len > 48 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {data_len} too long (maximum 48)"
        ))));
    }

    let toks = tokenize(symbol, reduced, true)?;
    let values = select_and_emit(symbol, &toks, true)?;
    emit(symbol, &values);

    let warning = if symbol.output_options.compliant_height {
        // GS1 General Specifications 5.12.3.2: min 5.8mm at X max
        // 1.016mm, default 31.75mm at X 0.495mm.
        set_height(symbol, 5.708_661_6, 64.141_41, 0.0, false)
    } else {
        set_height(symbol, 0.0, 50.0, 0.0, true)
    };

    let text = match symbol.gs1_hrt.take() {
        Some(t) => t,
        None => String::from_utf8_lossy(reduced)
            .replace('[', " "),
    };
    let hrt_warning = symbol.set_hrt_latin1(text.as_bytes());

    Ok(worse(warning, hrt_warning))
}

/// EAN-14 and NVE-18: zero-pad, add the GS1 check digit and encode as a
/// single fixed-length AI element string.
fn gs1_wrapper(
    symbol: &mut Symbol,
    source: &[u8],
    ai: &[u8],
    max: usize,
) -> Result<Option<Warning>, Error> {
    if source.len() > max {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum {max})",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut digits: Vec<u8> = vec![b'0'; max - source.len()];
    digits.extend_from_slice(source);
    digits.push(gs1::check_digit(&digits));

    // Reduced element string: the AI is fixed-length, no separator needed.
    let mut reduced = ai.to_vec();
    reduced.extend_from_slice(&digits);

    symbol.gs1_hrt = Some(format!(
        "({}){}",
        String::from_utf8_lossy(ai),
        String::from_utf8_lossy(&digits)
    ));

    gs1_128(symbol, &reduced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn widths_prefix(symbol: &Symbol, n: usize) -> Vec<usize> {
        // Reads the first n runs back out of row 0.
        let mut runs = Vec::new();
        let mut col = 0;
        let mut latch = symbol.module_is_set(0, 0);
        let mut run = 0;
        while runs.len() < n && col < symbol.width {
            if symbol.module_is_set(0, col) == latch {
                run += 1;
            } else {
                runs.push(run);
                latch = !latch;
                run = 1;
            }
            col += 1;
        }
        if runs.len() < n {
            runs.push(run);
        }
        runs
    }

    #[test]
    fn test_basic_text() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"Rust").unwrap();
        assert_eq!(symbol.text, "Rust");
        assert_eq!(symbol.rows, 1);
        // start B + 4 data + check at 11 modules each, stop 13.
        assert_eq!(symbol.width, 6 * 11 + 13);
        // Starts with the start-B pattern 211214.
        assert_eq!(widths_prefix(&symbol, 6), vec![2, 1, 1, 2, 1, 4]);
    }

    #[test]
    fn test_check_digit_known_value() {
        // "AIM" in set B: start 104, values 33, 41, 45.
        // check = (104 + 33*1 + 41*2 + 45*3) % 103 = 354 % 103 = 45.
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"AIM").unwrap();
        // 5 glyphs + stop
        assert_eq!(symbol.width, 5 * 11 + 13);
    }

    #[test]
    fn test_all_digits_use_set_c() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"123456").unwrap();
        // start C + 3 pairs + check + stop
        assert_eq!(symbol.width, 5 * 11 + 13);
    }

    #[test]
    fn test_long_digit_run_latches_c() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"abc123456xyz").unwrap();
        // start B + 3 + latch C + 3 pairs + latch B + 3 + check: 13 glyphs
        assert_eq!(symbol.width, 13 * 11 + 13);
    }

    #[test]
    fn test_isolated_control_uses_shift() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"ab\tcd").unwrap();
        // start B + a b + shift + HT + c d + check + stop = 8 glyphs
        assert_eq!(symbol.width, 8 * 11 + 13);
    }

    #[test]
    fn test_control_run_latches_a() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, b"ab\t\tcd").unwrap();
        // start B + a b + latch A + HT HT + latch B + c d + check + stop
        assert_eq!(symbol.width, 10 * 11 + 13);
    }

    #[test]
    fn test_extended_ascii_uses_fnc4() {
        let mut symbol = Symbol::new(Symbology::Code128);
        code128(&mut symbol, &[b'a', 0xE9, b'b']).unwrap(); // a é b
        // start B + a + FNC4 + i(0x69) + b + check: 6 glyphs
        assert_eq!(symbol.width, 6 * 11 + 13);
    }

    #[test]
    fn test_manual_code_set_control() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.input_mode.extra_escape = true;
        code128(&mut symbol, b"\\^C1234").unwrap();
        // start C + 2 pairs + check + stop
        assert_eq!(symbol.width, 4 * 11 + 13);
        assert_eq!(symbol.text, "1234");
    }

    #[test]
    fn test_manual_odd_digits_in_c_rejected() {
        let mut symbol = Symbol::new(Symbology::Code128);
        symbol.input_mode.extra_escape = true;
        assert_eq!(code128(&mut symbol, b"\\^C123").unwrap_err().code(), 6);
    }

    #[test]
    fn test_gs1_128_fnc1_and_hrt() {
        let mut symbol = Symbol::new(Symbology::Gs1_128);
        symbol.gs1_hrt = Some("(01)12345678901231".into());
        gs1_128(&mut symbol, b"0112345678901231").unwrap();
        assert_eq!(symbol.text, "(01)12345678901231");
        // start C + FNC1 + 8 pairs + check + stop
        assert_eq!(symbol.width, 11 * 11 + 13);
    }

    #[test]
    fn test_gs1_128_length_cap() {
        let mut symbol = Symbol::new(Symbology::Gs1_128);
        let long = vec![b'1'; 49];
        assert_eq!(gs1_128(&mut symbol, &long).unwrap_err().code(), 5);
    }

    #[test]
    fn test_ean14_builds_element_string() {
        let mut symbol = Symbol::new(Symbology::Ean14);
        encode(&mut symbol, b"1234567890123").unwrap();
        assert_eq!(symbol.text, "(01)12345678901231");
    }

    #[test]
    fn test_nve18_check_digit() {
        let mut symbol = Symbol::new(Symbology::Nve18);
        encode(&mut symbol, b"12345678901234567").unwrap();
        assert!(symbol.text.starts_with("(00)"));
        assert_eq!(symbol.text.len(), 4 + 18);
    }

    #[test]
    fn test_too_long_rejected() {
        let mut symbol = Symbol::new(Symbology::Code128);
        let data = vec![b'a'; 120];
        assert_eq!(code128(&mut symbol, &data).unwrap_err().code(), 5);
    }
}
