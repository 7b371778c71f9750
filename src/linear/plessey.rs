//! UK Plessey and MSI Plessey.
//!
//! MSI check-digit selection by `option_2`: 0 none, 1 mod-10, 2 mod-10 +
//! mod-10, 3 mod-11 (IBM), 4 mod-11 (IBM) + mod-10, 5 mod-11 (NCR),
//! 6 mod-11 (NCR) + mod-10; 11-16 are the same with the check digits kept
//! out of the human-readable text (the bars always carry them).

use crate::common::{NEON, SSET, ctoi, expand, itoc, not_sane, posn, set_height};
use crate::error::{Error, Warning, worse};
use crate::symbol::Symbol;

const HEX_SET: &[u8] = b"0123456789ABCDEF";

static PLESS_TABLE: [&[u8; 8]; 16] = [
    b"13131313", b"31131313", b"13311313", b"31311313",
    b"13133113", b"31133113", b"13313113", b"31313113",
    b"13131331", b"31131331", b"13311331", b"31311331",
    b"13133131", b"31133131", b"13313131", b"31313131",
];

static MSI_TABLE: [&[u8; 8]; 10] = [
    b"12121212", b"12121221", b"12122112", b"12122121", b"12211212",
    b"12211221", b"12212112", b"12212121", b"21121212", b"21121221",
];

/// The older UK Plessey standard with its CRC check over a 9-bit grid.
pub fn plessey(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    static GRID: [u8; 9] = [1, 1, 1, 1, 0, 1, 0, 0, 1];

    if source.len() > 65 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 65)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(SSET, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits and \"ABCDEF\" only)"
        ))));
    }

    let mut dest: Vec<u8> = Vec::with_capacity(560);
    dest.extend_from_slice(b"31311331"); // start

    // Data nibbles, LSB first, feeding the CRC register.
    let mut checkptr = vec![0u8; source.len() * 4 + 8];
    for (i, &c) in source.iter().enumerate() {
        let check = posn(HEX_SET, c) as u32;
        dest.extend_from_slice(PLESS_TABLE[check as usize]);
        checkptr[4 * i] = (check & 1) as u8;
        checkptr[4 * i + 1] = (check >> 1 & 1) as u8;
        checkptr[4 * i + 2] = (check >> 2 & 1) as u8;
        checkptr[4 * i + 3] = (check >> 3 & 1) as u8;
    }

    // CRC check digit
    for i in 0..4 * source.len() {
        if checkptr[i] != 0 {
            for j in 0..9 {
                checkptr[i + j] ^= GRID[j];
            }
        }
    }

    for i in 0..8 {
        match checkptr[source.len() * 4 + i] {
            0 => dest.extend_from_slice(b"13"),
            _ => dest.extend_from_slice(b"31"),
        }
    }

    dest.extend_from_slice(b"331311313"); // stop

    expand(symbol, &dest);

    let warning = set_height(symbol, 0.0, 50.0, 0.0, true);
    let hrt_warning = symbol.set_hrt_latin1(source);

    Ok(worse(warning, hrt_warning))
}

/// Modulo 10 check digit, Luhn style.
fn msi_check_digit_mod10(source: &[u8]) -> u8 {
    static VALS: [[i32; 10]; 2] = [
        [0, 2, 4, 6, 8, 1, 3, 5, 7, 9], // doubled, then digits summed
        [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    ];
    let mut x = 0;
    let mut undoubled = 0;
    for &c in source.iter().rev() {
        x += VALS[undoubled][ctoi(c) as usize];
        undoubled = 1 - undoubled;
    }
    itoc((10 - x % 10) % 10)
}

/// Modulo 11 check digit: IBM weight system wraps at 7, NCR at 9.
/// Returns `b':'` + 1 = `'A'` stand-in when the digit is 10.
fn msi_check_digit_mod11(source: &[u8], wrap: i32) -> u8 {
    let mut x = 0;
    let mut weight = 2;
    for &c in source.iter().rev() {
        x += weight * ctoi(c);
        weight += 1;
        if weight > wrap {
            weight = 2;
        }
    }
    itoc((11 - x % 11) % 11) // 'A' for 10
}

pub fn msi_plessey(symbol: &mut Symbol, source: &[u8]) -> Result<Option<Warning>, Error> {
    if source.len() > 65 {
        return Err(symbol.err(Error::TooLong(format!(
            "input length {} too long (maximum 65)",
            source.len()
        ))));
    }
    if let Some(i) = not_sane(NEON, source) {
        return Err(symbol.err(Error::InvalidData(format!(
            "invalid character at position {i} in input (digits only)"
        ))));
    }

    let mut check_option = symbol.option_2;
    let mut no_checktext = false;
    if (11..=16).contains(&check_option) {
        // +10 means don't print the check digits in the HRT.
        check_option -= 10;
        no_checktext = true;
    }
    if !(0..=6).contains(&check_option) {
        check_option = 0;
    }

    // Bars always carry the full digit string including any check digits.
    let mut temp = source.to_vec();
    match check_option {
        1 | 2 => {
            temp.push(msi_check_digit_mod10(source));
            if check_option == 2 {
                temp.push(msi_check_digit_mod10(&temp));
            }
        }
        3..=6 => {
            let wrap = if check_option <= 4 { 7 } else { 9 };
            let check = msi_check_digit_mod11(source, wrap);
            if check == b'A' {
                temp.extend_from_slice(b"10");
            } else {
                temp.push(check);
            }
            if check_option == 4 || check_option == 6 {
                temp.push(msi_check_digit_mod10(&temp));
            }
        }
        _ => {}
    }

    let mut dest: Vec<u8> = Vec::with_capacity(550);
    dest.extend_from_slice(b"21"); // start
    for &c in &temp {
        dest.extend_from_slice(MSI_TABLE[ctoi(c) as usize]);
    }
    dest.extend_from_slice(b"121"); // stop

    expand(symbol, &dest);

    let warning = set_height(symbol, 0.0, 50.0, 0.0, true);
    let hrt_warning = if no_checktext {
        symbol.set_hrt_latin1(source)
    } else {
        symbol.set_hrt_latin1(&temp)
    };

    Ok(worse(warning, hrt_warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbology;

    #[test]
    fn test_msi_plain() {
        let mut symbol = Symbol::new(Symbology::MsiPlessey);
        msi_plessey(&mut symbol, b"1234567").unwrap();
        assert_eq!(symbol.text, "1234567");
        // start 3 + 7 digits * 12 + stop 4
        assert_eq!(symbol.width, 3 + 7 * 12 + 4);
    }

    #[test]
    fn test_msi_mod10() {
        let mut symbol = Symbol::new(Symbology::MsiPlessey);
        symbol.option_2 = 1;
        msi_plessey(&mut symbol, b"1234567").unwrap();
        // Luhn: 7,5,3,1 doubled-summed: (5+1+7+3) wait - standard result
        // for 1234567 is check digit 4.
        assert_eq!(symbol.text, "12345674");
    }

    #[test]
    fn test_msi_mod11_ibm() {
        let mut symbol = Symbol::new(Symbology::MsiPlessey);
        symbol.option_2 = 3;
        msi_plessey(&mut symbol, b"2070").unwrap();
        // weights 2,3,4,5 from right: 0*2+7*3+0*4+2*5 = 31, 11-31%11 = 2
        assert_eq!(symbol.text, "20702");
    }

    #[test]
    fn test_msi_mod11_ten_becomes_10() {
        // Find a value with check 10: weights from right 2,3,...:
        // "29": 9*2+2*3 = 24, 24%11 = 2, 11-2=9. "13": 3*2+1*3=9 -> 2.
        // "65": 5*2+6*3=28 -> 28%11=6, 11-6=5. "111": 1*2+1*3+1*4=9 -> 2.
        // "90": 0*2+9*3=27 -> 27%11=5 -> 6. "19": 9*2+1*3=21 -> 21%11=10
        // -> 11-10=1. "28": 8*2+2*3=22 -> 0 -> 11-0=0? (22%11=0, (11-0)%11=0).
        // "74": 4*2+7*3=29 -> 29%11=7 -> 4. "56": 6*2+5*3=27 -> 6.
        // "12": 2*2+1*3=7 -> 4. "39": 9*2+3*3=27 -> 6. "47": 7*2+4*3=26
        // -> 26%11=4 -> 7. "89": 9*2+8*3=42 -> 42%11=9 -> 2. "67":
        // 7*2+6*3=32 -> 32%11=10 -> 1. "091": 1*2+9*3+0*4=29 -> 4.
        // Try sum%11 == 1: "83": 3*2+8*3=30 -> 30%11=8 -> 3. "61":
        // 1*2+6*3=20 -> 9 -> 2. "50": 0*2+5*3=15 -> 4 -> 7. "45":
        // 5*2+4*3=22 -> 0 -> 0. "23": 3*2+2*3=12 -> 1 -> 10!
        let mut symbol = Symbol::new(Symbology::MsiPlessey);
        symbol.option_2 = 3;
        msi_plessey(&mut symbol, b"23").unwrap();
        assert_eq!(symbol.text, "2310");
    }

    #[test]
    fn test_msi_hidden_check_digits_still_encoded() {
        let mut visible = Symbol::new(Symbology::MsiPlessey);
        visible.option_2 = 1;
        msi_plessey(&mut visible, b"1234567").unwrap();

        let mut hidden = Symbol::new(Symbology::MsiPlessey);
        hidden.option_2 = 11;
        msi_plessey(&mut hidden, b"1234567").unwrap();

        assert_eq!(hidden.text, "1234567");
        assert_eq!(hidden.encoded_data, visible.encoded_data);
        assert_eq!(hidden.width, visible.width);
    }

    #[test]
    fn test_msi_out_of_range_option_means_no_check() {
        let mut symbol = Symbol::new(Symbology::MsiPlessey);
        symbol.option_2 = 9;
        msi_plessey(&mut symbol, b"123").unwrap();
        assert_eq!(symbol.text, "123");
    }

    #[test]
    fn test_plessey_hex_and_crc() {
        let mut symbol = Symbol::new(Symbology::Plessey);
        plessey(&mut symbol, b"1A3F").unwrap();
        assert_eq!(symbol.text, "1A3F");
        // start 16 + 4 chars * 16 + 8 crc bits * 4 + stop 19
        assert_eq!(symbol.width, 16 + 4 * 16 + 8 * 4 + 19);
    }

    #[test]
    fn test_plessey_rejects_lowercase() {
        let mut symbol = Symbol::new(Symbology::Plessey);
        assert_eq!(plessey(&mut symbol, b"1a").unwrap_err().code(), 6);
    }
}
