//! The Code 2 of 5 family: Standard (Matrix), Industrial, IATA, Data
//! Logic, Interleaved, and the Interleaved derivatives ITF-14 and the
//! Deutsche Post Leitcode/Identcode.

use crate::common::{NEON, ctoi, expand, itoc, not_sane, set_height};
use crate::error::{Error, Warning, worse};
use crate::gs1;
use crate::symbol::{Symbol, Symbology};

/// First five runs of each entry are the Interleaved bar/space widths.
static MATRIX_TABLE: [&[u8; 6]; 10] = [
    b"113311", b"311131", b"131131", b"331111", b"113131",
    b"313111", b"133111", b"111331", b"311311", b"131311",
];

static INDUST_TABLE: [&[u8; 10]; 10] = [
    b"1111313111", b"3111111131", b"1131111131", b"3131111111", b"1111311131",
    b"3111311111", b"1131311111", b"1111113131", b"3111113111", b"1131113111",
];

pub fn encode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    match symbol.symbology {
        Symbology::C25Standard => c25_common(symbol, source, 112, true, b"411111", b"41111"),
        Symbology::C25Industrial => c25_common(symbol, source, 79, false, b"313111", b"31113"),
        Symbology::C25Iata => c25_common(symbol, source, 80, false, b"1111", b"311"),
        Symbology::C25Logic => c25_common(symbol, source, 113, true, b"1111", b"311"),
        Symbology::C25Interleaved => {
            let checkdigit_option = symbol.option_2;
            c25_inter_common(symbol, source, checkdigit_option, false)
        }
        Symbology::Itf14 => itf14(symbol, source),
        Symbology::DpLeitcode => dp_leitcode(symbol, source),
        Symbology::DpIdentcode => dp_identcode(symbol, source),
        _ => unreachable!("not a 2 of 5 symbology"),
    }
}

/// Common to Standard (Matrix), Industrial, IATA and Data Logic.
fn c25_common(
    symbol: &mut Symbol,
    source: &[u8],
    max: usize,
    is_matrix: bool,
    start: &[u8],
    stop: &[u8],
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

    let have_checkdigit = symbol.option_2 == 1 || symbol.option_2 == 2;
    let mut temp = source.to_vec();
    if have_checkdigit {
        let check = gs1::check_digit(source);
        temp.push(check);
        if symbol.debug {
            log::debug!("2 of 5 check digit: {}", check as char);
        }
    }

    let mut dest: Vec<u8> = Vec::with_capacity(1160);
    dest.extend_from_slice(start);
    for &c in &temp {
        let d = ctoi(c) as usize;
        if is_matrix {
            dest.extend_from_slice(MATRIX_TABLE[d]);
        } else {
            dest.extend_from_slice(INDUST_TABLE[d]);
        }
    }
    dest.extend_from_slice(stop);

    expand(symbol, &dest);

    let warning = set_height(symbol, 0.0, 50.0, 0.0, true);

    if symbol.option_2 == 2 {
        // Check digit in the bars but not the HRT.
        temp.pop();
    }
    let hrt_warning = symbol.set_hrt_latin1(&temp);

    Ok(worse(warning, hrt_warning))
}

/// Common to Interleaved, ITF-14, DP Leitcode and DP Identcode.
fn c25_inter_common(
    symbol: &mut Symbol,
    source: &[u8],
    checkdigit_option: i32,
    dont_set_height: bool,
) -> Result<Option<Warning>, Error> {
    if source.len() > 125 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 125)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let have_checkdigit = checkdigit_option == 1 || checkdigit_option == 2;

    // Interleaving needs an even number of digits: prepend a zero when the
    // length parity (including any check digit) is odd.
    let mut temp: Vec<u8> = Vec::with_capacity(source.len() + 2);
    if have_checkdigit == (source.len() & 1 == 0) {
        temp.push(b'0');
    }
    temp.extend_from_slice(source);

    if have_checkdigit {
        let check = gs1::check_digit(&temp);
        temp.push(check);
    }

    let mut dest: Vec<u8> = Vec::with_capacity(640);
    dest.extend_from_slice(b"1111"); // start

    for pair in temp.chunks(2) {
        let bars = MATRIX_TABLE[ctoi(pair[0]) as usize];
        let spaces = MATRIX_TABLE[ctoi(pair[1]) as usize];
        for j in 0..5 {
            dest.push(bars[j]);
            dest.push(spaces[j]);
        }
    }

    dest.extend_from_slice(b"311"); // stop

    expand(symbol, &dest);

    let mut hrt = temp.clone();
    if checkdigit_option == 2 {
        hrt.pop();
    }
    let hrt_warning = symbol.set_hrt_latin1(&hrt);

    let height_warning = if dont_set_height {
        None
    } else if symbol.output_options.compliant_height {
        // ISO/IEC 16390 4.4: min 5mm or 15% of symbol width, whichever
        // greater, taking min X = 0.330mm; width = (P(4N+6) + N + 6)X with
        // N = 3.
        let min_height = ((18.0 * (temp.len() / 2) as f32 + 9.0) * 0.15).max(15.151_515);
        set_height(symbol, min_height, min_height.max(50.0), 0.0, false)
    } else {
        set_height(symbol, 0.0, 50.0, 0.0, true)
    };

    Ok(worse(height_warning, hrt_warning))
}

/// Interleaved 2-of-5 with the GS1 shipping-container conventions.
fn itf14(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 13 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 13)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut local: Vec<u8> = vec![b'0'; 13 - source.len()];
    local.extend_from_slice(source);
    local.push(gs1::check_digit(&local));

    let warning = c25_inter_common(symbol, &local.clone(), 0, true)?;
    let hrt_warning = symbol.set_hrt_latin1(&local);

    // ITF-14 is boxed by default (bearer bars).
    if !(symbol.output_options.barcode_box
        || symbol.output_options.barcode_bind
        || symbol.output_options.barcode_bind_top)
    {
        symbol.output_options.barcode_box = true;
        if symbol.border_width == 0 {
            // GS1 General Specifications 5.3.2.4: bearer min 4.83mm at
            // X max 1.016mm.
            symbol.border_width = 5;
        }
    }

    let height_warning = if symbol.output_options.compliant_height {
        // GS1 General Specifications 5.12.3.2 table 2: min 5.8mm at X max
        // 1.016mm, default 31.75mm at X 0.495mm.
        set_height(symbol, 5.708_661_6, 64.141_41, 0.0, false)
    } else {
        set_height(symbol, 0.0, 50.0, 0.0, true)
    };

    Ok(worse(worse(warning, hrt_warning), height_warning))
}

/// Deutsche Post check digit over 4/9-alternating weights.
fn dp_check_digit(count: u32) -> u8 {
    itoc(((10 - count % 10) % 10) as i32)
}

fn dp_weighted_count(data: &[u8]) -> u32 {
    // Weights alternate 4 and 9 from the rightmost digit.
    let mut factor = 4u32;
    let mut count = 0u32;
    for &c in data.iter().rev() {
        count += factor * ctoi(c) as u32;
        factor ^= 0x0d; // toggles 4 and 9
    }
    count
}

fn dp_leitcode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 13 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 13)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut local: Vec<u8> = vec![b'0'; 13 - source.len()];
    local.extend_from_slice(source);
    local.push(dp_check_digit(dp_weighted_count(&local[..13])));

    let warning = c25_inter_common(symbol, &local.clone(), 0, true)?;

    // HRT grouping nnnnn.nnn.nnn.nn c
    let mut text = String::new();
    for (i, &c) in local.iter().enumerate() {
        text.push(c as char);
        if i == 4 || i == 7 || i == 10 {
            text.push('.');
        }
    }
    symbol.text = text;

    let height_warning = set_height(symbol, 0.0, 72.0, 0.0, true);

    Ok(worse(warning, height_warning))
}

fn dp_identcode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 11 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 11)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut local: Vec<u8> = vec![b'0'; 11 - source.len()];
    local.extend_from_slice(source);
    local.push(dp_check_digit(dp_weighted_count(&local[..11])));

    let warning = c25_inter_common(symbol, &local.clone(), 0, true)?;

    // HRT grouping nn.nn n.nnn.nnn c
    let mut text = String::new();
    for (i, &c) in local.iter().enumerate() {
        text.push(c as char);
        if i == 1 || i == 4 || i == 7 {
            text.push('.');
        } else if i == 3 || i == 10 {
            text.push(' ');
        }
    }
    symbol.text = text;

    let height_warning = set_height(symbol, 0.0, 72.0, 0.0, true);

    Ok(worse(warning, height_warning))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(symbology: Symbology) -> Symbol {
        Symbol::new(symbology)
    }

    #[test]
    fn test_itf14_pads_and_appends_check_digit() {
        let mut s = symbol(Symbology::Itf14);
        encode(&mut s, b"1234567890123").unwrap();
        assert_eq!(s.text, "12345678901231");
        // 7 digit pairs at 18 modules each, plus start 4 and stop 5.
        assert_eq!(s.width, 4 + 7 * 18 + 5);
        assert!(s.output_options.barcode_box);
        assert_eq!(s.border_width, 5);
    }

    #[test]
    fn test_itf14_compliant_height() {
        let mut s = symbol(Symbology::Itf14);
        s.output_options.compliant_height = true;
        encode(&mut s, b"1234567890123").unwrap();
        assert!((s.height - 64.141_41).abs() < 0.01);
    }

    #[test]
    fn test_interleaved_odd_length_zero_padded() {
        let mut s = symbol(Symbology::C25Interleaved);
        encode(&mut s, b"123").unwrap();
        assert_eq!(s.text, "0123");
    }

    #[test]
    fn test_interleaved_check_digit_options() {
        let mut s = symbol(Symbology::C25Interleaved);
        s.option_2 = 1;
        encode(&mut s, b"123").unwrap();
        // "123" + check: even parity now holds without padding.
        assert_eq!(s.text.len(), 4);
        let visible = s.text.clone();

        let mut hidden = symbol(Symbology::C25Interleaved);
        hidden.option_2 = 2;
        encode(&mut hidden, b"123").unwrap();
        assert_eq!(hidden.text, visible[..3]);
        assert_eq!(hidden.encoded_data, s.encoded_data);
    }

    #[test]
    fn test_standard_width() {
        let mut s = symbol(Symbology::C25Standard);
        encode(&mut s, b"87654321").unwrap();
        // start 9 + 8 digits * 10 + stop 8
        assert_eq!(s.width, 9 + 8 * 10 + 8);
        assert_eq!(s.text, "87654321");
    }

    #[test]
    fn test_industrial_width() {
        let mut s = symbol(Symbology::C25Industrial);
        encode(&mut s, b"1234").unwrap();
        // start 10 + 4 digits * 14 + stop 9
        assert_eq!(s.width, 10 + 4 * 14 + 9);
    }

    #[test]
    fn test_leitcode_check_digit_and_grouping() {
        let mut s = symbol(Symbology::DpLeitcode);
        // 14 digits is too long (maximum 13)
        assert_eq!(encode(&mut s, b"21348075016401").unwrap_err().code(), 5);

        let mut s = symbol(Symbology::DpLeitcode);
        encode(&mut s, b"2134807501640").unwrap();
        // weights from right 4,9,4,9...: check per Deutsche Post scheme
        assert_eq!(s.text.len(), 14 + 3);
        assert_eq!(&s.text[..6], "21348.");
    }

    #[test]
    fn test_identcode_grouping() {
        let mut s = symbol(Symbology::DpIdentcode);
        encode(&mut s, b"80420000001").unwrap();
        assert_eq!(s.text.chars().filter(|&c| c == '.').count(), 3);
        assert_eq!(s.text.chars().filter(|&c| c == ' ').count(), 2);
    }

    #[test]
    fn test_non_digit_rejected() {
        let mut s = symbol(Symbology::C25Interleaved);
        let err = encode(&mut s, b"12x4").unwrap_err();
        assert_eq!(err.code(), 6);
        assert!(s.errtxt.contains("position 3"));
    }
}
