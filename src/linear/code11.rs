//! Code 11 (USD-8): digits and dash, with one or two mod-11 check digits.

use crate::common::{SODIUM, ctoi, expand, itoc, not_sane, posn, set_height};
use crate::error::{Error, Warning, worse};
use crate::symbol::Symbol;

const SET: &[u8] = b"0123456789-";

static TABLE: [&[u8; 6]; 11] = [
    b"111121", b"211121", b"121121", b"221111", b"112121", b"212111", b"122111",
    b"111221", b"211211", b"211111", b"112111",
];

pub fn encode(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 121 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 121)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(SODIUM, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits and \"-\" only)"
        ))));
    }

    // option_2: 0 = C and K digits, 1 = C only, 2 = none.
    let num_check_digits = match symbol.option_2 {
        0 => 2,
        1 => 1,
        2 => 0,
        _ => {
            return Err(symbol.err(Error::InvalidOption(
                "invalid check digit version (1, 2 only)".into(),
            )));
        }
    };

    let mut weight: Vec<i32> = source
        .iter()
        .map(|&c| if c == b'-' { 10 } else { ctoi(c) })
        .collect();

    let mut dest: Vec<u8> = Vec::with_capacity(750);
    dest.extend_from_slice(b"112211"); // start

    for &c in source {
        dest.extend_from_slice(TABLE[posn(SET, c) as usize]);
    }

    let mut checkstr: Vec<u8> = Vec::new();
    if num_check_digits > 0 {
        // C checksum: weights 1, 2, ... from the right, wrapping above 10.
        let mut c_count = 0;
        let mut c_weight = 1;
        for &w in weight.iter().rev() {
            c_count += c_weight * w;
            c_weight += 1;
            if c_weight > 10 {
                c_weight = 1;
            }
        }
        let c_digit = c_count % 11;
        weight.push(c_digit);
        checkstr.push(if c_digit == 10 { b'-' } else { itoc(c_digit) });

        if num_check_digits == 2 {
            // K checksum over data + C digit, weights wrapping above 9.
            let mut k_count = 0;
            let mut k_weight = 1;
            for &w in weight.iter().rev() {
                k_count += k_weight * w;
                k_weight += 1;
                if k_weight > 9 {
                    k_weight = 1;
                }
            }
            let k_digit = k_count % 11;
            checkstr.push(if k_digit == 10 { b'-' } else { itoc(k_digit) });
        }

        for &c in &checkstr {
            dest.extend_from_slice(TABLE[posn(SET, c) as usize]);
        }
    }

    if symbol.debug {
        log::debug!(
            "Code 11 check digits ({}): {}",
            num_check_digits,
            String::from_utf8_lossy(&checkstr)
        );
    }

    dest.extend_from_slice(b"11221"); // stop

    expand(symbol, &dest);

    let warning = set_height(symbol, 0.0, 50.0, 0.0, true);

    let mut text = source.to_vec();
    text.extend_from_slice(&checkstr);
    let hrt_warning = symbol.set_hrt_latin1(&text);

    Ok(worse(warning, hrt_warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbology;

    #[test]
    fn test_check_digits_appended() {
        let mut symbol = Symbol::new(Symbology::Code11);
        encode(&mut symbol, b"123-45").unwrap();
        // C digit: weighted sum from right = 5*1+4*2+10*3+3*4+2*5+1*6 = 71,
        // 71 % 11 = 5. K over "123-455": 5*1+5*2+4*3+10*4+3*5+2*6+1*7 = 101,
        // 101 % 11 = 2.
        assert_eq!(symbol.text, "123-4552");
        assert_eq!(symbol.rows, 1);
    }

    #[test]
    fn test_single_check_digit_option() {
        let mut symbol = Symbol::new(Symbology::Code11);
        symbol.option_2 = 1;
        encode(&mut symbol, b"123-45").unwrap();
        assert_eq!(symbol.text, "123-455");
    }

    #[test]
    fn test_no_check_digit_option() {
        let mut symbol = Symbol::new(Symbology::Code11);
        symbol.option_2 = 2;
        encode(&mut symbol, b"123-45").unwrap();
        assert_eq!(symbol.text, "123-45");
    }

    #[test]
    fn test_width() {
        let mut symbol = Symbol::new(Symbology::Code11);
        symbol.option_2 = 2;
        encode(&mut symbol, b"1").unwrap();
        // start(8) + one char(8) + stop(7) modules
        assert_eq!(symbol.width, 8 + 8 + 7);
    }

    #[test]
    fn test_rejects_bad_character() {
        let mut symbol = Symbol::new(Symbology::Code11);
        let err = encode(&mut symbol, b"12a4").unwrap_err();
        assert_eq!(err.code(), 6);
        assert!(symbol.errtxt.contains("position 3"));
    }

    #[test]
    fn test_rejects_bad_option() {
        let mut symbol = Symbol::new(Symbology::Code11);
        symbol.option_2 = 3;
        assert_eq!(encode(&mut symbol, b"123").unwrap_err().code(), 8);
    }
}
