//! MaxiCode (ISO/IEC 16023).
//!
//! Six 64-value code sets with shift and lock transitions, nine-digit
//! Number Compression, structured primaries for modes 2 and 3, Extended
//! Error Correction on the primary and interleaved odd/even RS on the
//! secondary, all over GF(0x43). The 30x33 grid is fixed.

use std::sync::OnceLock;

use crate::common::{to_int, to_upper_vec};
use crate::error::{Error, Warning};
use crate::reedsol::RsCode;
use crate::symbol::{Segment, Symbol};

/// Per-byte (code set, symbol value). Set 0 marks the nine characters
/// representable in more than one set, resolved against their neighbours.
fn code_set_tables() -> &'static ([u8; 256], [u8; 256]) {
    static TABLES: OnceLock<([u8; 256], [u8; 256])> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut set = [0u8; 256];
        let mut chr = [0u8; 256];
        let mut put = |b: usize, s: u8, c: u8| {
            set[b] = s;
            chr[b] = c;
        };

        // Dual-set characters keep their marker value under set 0.
        for b in [13u8, 28, 29, 30, 32, 44, 46, 47, 58] {
            put(b as usize, 0, b);
        }

        // Set A: CR, A-Z, punctuation and digits.
        for b in b'A'..=b'Z' {
            put(b as usize, 1, b - 64);
        }
        for b in b'0'..=b'9' {
            put(b as usize, 1, b);
        }
        for b in [b'"', b'#', b'$', b'%', b'&', b'\'', b'(', b')', b'*', b'+', b'-'] {
            put(b as usize, 1, b);
        }

        // Set B: lower case and the remaining ASCII punctuation.
        put(b'`' as usize, 2, 0);
        for b in b'a'..=b'z' {
            put(b as usize, 2, b - 96);
        }
        for (b, v) in [
            (b'{', 32u8), (b'}', 34), (b'~', 35), (0x7f, 36), (b';', 37), (b'<', 38),
            (b'=', 39), (b'>', 40), (b'?', 41), (b'[', 42), (b'\\', 43), (b']', 44),
            (b'^', 45), (b'_', 46), (b'@', 52), (b'!', 53), (b'|', 54),
        ] {
            put(b as usize, 2, v);
        }

        // Set E: the C0 controls (FS/GS/RS resolved dynamically).
        for b in 0u8..=0x1a {
            if b != 13 {
                put(b as usize, 5, b);
            }
        }
        put(0x1b, 5, 28); // ESC
        put(0x1f, 5, 29); // US
        for (i, b) in (0x9bu8..=0x9f).enumerate() {
            put(b as usize, 5, 35 + i as u8);
        }
        for (i, b) in [0xa0u8, 0xa2, 0xa3, 0xa4, 0xa5, 0xa6, 0xa7, 0xa9, 0xad, 0xae, 0xb6]
            .into_iter()
            .enumerate()
        {
            put(b as usize, 5, 40 + i as u8);
        }

        // Set C: upper-range Latin letters and symbols.
        for (i, b) in (0xc0u8..=0xda).enumerate() {
            put(b as usize, 3, i as u8);
        }
        for (i, b) in (0xdbu8..=0xdf).enumerate() {
            put(b as usize, 3, [28, 29, 30, 32, 33][i]);
        }
        for (i, b) in [0xaau8, 0xac, 0xb1, 0xb2, 0xb3, 0xb5, 0xb9, 0xba, 0xbc, 0xbd, 0xbe]
            .into_iter()
            .enumerate()
        {
            put(b as usize, 3, 34 + i as u8);
        }
        for (i, b) in (0x80u8..=0x8c).enumerate() {
            put(b as usize, 3, 45 + i as u8);
        }

        // Set D: lower-range accented letters and symbols.
        for (i, b) in (0xe0u8..=0xfa).enumerate() {
            put(b as usize, 4, i as u8);
        }
        for (i, b) in (0xfbu8..=0xff).enumerate() {
            put(b as usize, 4, [28, 29, 30, 32, 33][i]);
        }
        for (i, b) in [0xa1u8, 0xa8, 0xab, 0xaf, 0xb0, 0xb4, 0xb7, 0xb8, 0xbb, 0xbf]
            .into_iter()
            .enumerate()
        {
            put(b as usize, 4, 34 + i as u8);
        }
        for (i, b) in (0x8du8..=0x9a).enumerate() {
            put(b as usize, 4, 44 + i as u8);
        }

        (set, chr)
    })
}

/// Module -> bit-number map for the 30x33 grid: value n > 0 means overall
/// bit n (1-based, codeword n/6, MSB first); 0 is structural.
fn grid_map() -> &'static [u16; 990] {
    static MAP: OnceLock<[u16; 990]> = OnceLock::new();
    MAP.get_or_init(|| {
        const ORIENTATION: [(usize, usize); 13] = [
            (0, 28), (0, 29), (9, 10), (9, 11), (10, 11), (15, 7), (16, 8),
            (16, 20), (17, 20), (22, 10), (23, 10), (22, 17), (23, 17),
        ];
        let mut map = [0u16; 990];
        let mut n = 1u16;
        for row in 0..33 {
            for col in 0..30 {
                let in_finder = (12..=20).contains(&row) && (10..=19).contains(&col);
                let orientation = ORIENTATION.contains(&(row, col));
                if !in_finder && !orientation && n <= 144 * 6 {
                    map[row * 30 + col] = n;
                    n += 1;
                }
            }
        }
        map
    })
}

/* ---- Error correction ---- */

/// Extended ECC over the ten primary codewords.
fn do_primary_check(codewords: &mut [u8; 144]) {
    let rs = RsCode::new(0x43, 10, 1);
    let data: [u8; 10] = codewords[..10].try_into().expect("primary is ten codewords");
    let results = rs.encode(&data);
    for j in 0..10 {
        codewords[10 + j] = results[10 - 1 - j];
    }
}

/// Check codewords over the odd-indexed half of the secondary.
fn do_secondary_chk_odd(codewords: &mut [u8; 144], ecclen: usize) {
    let datalen = if ecclen == 20 { 84 } else { 68 };
    let rs = RsCode::new(0x43, ecclen, 1);

    let data: Vec<u8> = (1..datalen).step_by(2).map(|j| codewords[j + 20]).collect();
    let results = rs.encode(&data);
    for j in 0..ecclen {
        codewords[datalen + 2 * j + 1 + 20] = results[ecclen - 1 - j];
    }
}

/// Check codewords over the even-indexed half of the secondary.
fn do_secondary_chk_even(codewords: &mut [u8; 144], ecclen: usize) {
    let datalen = if ecclen == 20 { 84 } else { 68 };
    let rs = RsCode::new(0x43, ecclen, 1);

    let data: Vec<u8> = (0..datalen).step_by(2).map(|j| codewords[j + 20]).collect();
    let results = rs.encode(&data);
    for j in 0..ecclen {
        codewords[datalen + 2 * j + 20] = results[ecclen - 1 - j];
    }
}

/* ---- Text processing (Appendix A) ---- */

struct Message {
    set: [u8; 144],
    character: [u8; 144],
    length: usize,
}

impl Message {
    /// Moves everything up so a shift or latch can be inserted. The
    /// length grows regardless so overlong input always trips the cap.
    fn bump(&mut self, posn: usize) {
        if posn < 143 {
            self.set.copy_within(posn..143, posn + 1);
            self.character.copy_within(posn..143, posn + 1);
        }
        self.length += 1;
    }
}

fn value_in_array(val: u8, arr: &[u8]) -> Option<u8> {
    arr.contains(&val).then_some(val)
}

/// Best set for a dual-set character given its neighbours; falls back to
/// the first candidate.
fn best_surrounding_set(index: usize, length: usize, set: &[u8; 144], setval: &[u8]) -> u8 {
    let option1 = value_in_array(set[index - 1], setval);
    if index + 1 < length {
        // Two options to check, previous and next.
        if let (Some(o1), Some(o2)) = (option1, value_in_array(set[index + 1], setval)) {
            if o1 > o2 {
                return o2;
            }
        }
    }
    option1.unwrap_or(setval[0])
}

fn text_process(
    codewords: &mut [u8; 144],
    mode: i32,
    source: &[u8],
    eci: u32,
    scm_vv: i32,
) -> Result<(), ()> {
    const SET15: [u8; 2] = [1, 5];
    const SET12: [u8; 2] = [1, 2];
    const SET12345: [u8; 5] = [1, 2, 3, 4, 5];

    let (code_set, symbol_chr) = code_set_tables();

    if source.len() > 144 {
        return Err(());
    }

    let prefixed: Vec<u8>;
    let source: &[u8] = if scm_vv != -1 {
        // SCM prefix "[)>\R01\Gvv".
        if source.len() > 135 {
            return Err(());
        }
        let mut buf = format!("[)>\x1e01\x1d{scm_vv:02}").into_bytes();
        buf.extend_from_slice(source);
        prefixed = buf;
        &prefixed
    } else {
        source
    };
    let length = source.len();

    let mut msg = Message { set: [255; 144], character: [0; 144], length };
    for (i, &b) in source.iter().enumerate() {
        msg.set[i] = code_set[b as usize];
        msg.character[i] = symbol_chr[b as usize];
    }

    // Resolve the dual-set characters.
    if msg.set[0] == 0 {
        if msg.character[0] == 13 {
            msg.character[0] = 0; // CR in set A
        }
        msg.set[0] = 1;
    }
    for i in 1..length {
        if msg.set[i] != 0 {
            continue;
        }
        match msg.character[i] {
            13 => {
                // Carriage return
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET15);
                if msg.set[i] != 5 {
                    msg.character[i] = 0;
                }
            }
            28 | 29 | 30 => {
                // FS, GS, RS
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12345);
                if msg.set[i] == 5 {
                    msg.character[i] += 4; // 32, 33, 34
                }
            }
            32 => {
                // Space
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12345);
                match msg.set[i] {
                    1 => msg.character[i] = 32,
                    2 => msg.character[i] = 47,
                    _ => msg.character[i] = 59,
                }
            }
            44 => {
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12);
                if msg.set[i] == 2 {
                    msg.character[i] = 48;
                }
            }
            46 => {
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12);
                if msg.set[i] == 2 {
                    msg.character[i] = 49;
                }
            }
            47 => {
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12);
                if msg.set[i] == 2 {
                    msg.character[i] = 50;
                }
            }
            58 => {
                msg.set[i] = best_surrounding_set(i, length, &msg.set, &SET12);
                if msg.set[i] == 2 {
                    msg.character[i] = 51;
                }
            }
            _ => {}
        }
    }

    // Pad in the set the message ends in (A unless that was B).
    let padding_set = if length > 0 && msg.set[length - 1] == 2 { 2 } else { 1 };
    for i in length..144 {
        msg.set[i] = padding_set;
        msg.character[i] = 33; // PAD
    }

    // Mark nine-digit runs for Number Compression.
    let mut count = 0;
    for i in 0..144 {
        if msg.set[i] == 1 && msg.character[i].is_ascii_digit() {
            count += 1;
            if count == 9 {
                for s in &mut msg.set[i - 8..=i] {
                    *s = 6;
                }
                count = 0;
            }
        } else {
            count = 0;
        }
    }

    // Insert shift and latch characters.
    let mut current_set = 1u8;
    let mut i = 0usize;
    while i < 144 {
        if msg.set[i] != current_set && msg.set[i] != 6 {
            match msg.set[i] {
                1 => {
                    if current_set == 2 {
                        if i + 1 < 144 && msg.set[i + 1] == 1 {
                            if i + 2 < 144 && msg.set[i + 2] == 1 {
                                if i + 3 < 144 && msg.set[i + 3] == 1 {
                                    // Latch A
                                    msg.bump(i);
                                    msg.character[i] = 63;
                                    current_set = 1;
                                    i += 3;
                                } else {
                                    // Triple shift A
                                    msg.bump(i);
                                    msg.character[i] = 57;
                                    i += 2;
                                }
                            } else {
                                // Double shift A
                                msg.bump(i);
                                msg.character[i] = 56;
                                i += 1;
                            }
                        } else {
                            // Shift A
                            msg.bump(i);
                            msg.character[i] = 59;
                        }
                    } else {
                        // Sets C, D and E only latch back.
                        msg.bump(i);
                        msg.character[i] = 58;
                        current_set = 1;
                    }
                }
                2 => {
                    if current_set != 1 || (i + 1 < 144 && msg.set[i + 1] == 2) {
                        // Latch B
                        msg.bump(i);
                        msg.character[i] = 63;
                        current_set = 2;
                    } else {
                        // Shift B
                        msg.bump(i);
                        msg.character[i] = 59;
                    }
                }
                s @ (3 | 4 | 5) => {
                    // Shift C/D/E, doubled into a lock when a run follows.
                    let lock = (i == 0
                        && i + 3 < 144
                        && msg.set[i + 1] == s
                        && msg.set[i + 2] == s
                        && msg.set[i + 3] == s)
                        || (i > 0
                            && msg.set[i - 1] == s
                            && i + 2 < 144
                            && msg.set[i + 1] == s
                            && msg.set[i + 2] == s);
                    if lock {
                        if i == 0 {
                            msg.bump(i);
                            msg.character[i] = 60 + s - 3;
                            i += 1;
                            msg.bump(i);
                            msg.character[i] = 60 + s - 3;
                            i += 3;
                        } else {
                            // Add a second shift next to the previous one.
                            msg.bump(i - 1);
                            msg.character[i - 1] = 60 + s - 3;
                            i += 2;
                        }
                        current_set = s;
                    } else {
                        msg.bump(i);
                        msg.character[i] = 60 + s - 3;
                    }
                }
                _ => {}
            }
            i += 1; // allow for the inserted character
        }
        i += 1;
    }

    // Resolve Number Compression runs into NS + 30-bit values.
    let mut i = 0usize;
    while i <= 135 {
        if msg.set[i] == 6 {
            let value = to_int(&msg.character[i..i + 9]) as u32;
            msg.character[i] = 31; // NS
            msg.character[i + 1] = ((value & 0x3f00_0000) >> 24) as u8;
            msg.character[i + 2] = ((value & 0x00fc_0000) >> 18) as u8;
            msg.character[i + 3] = ((value & 0x0003_f000) >> 12) as u8;
            msg.character[i + 4] = ((value & 0x0000_0fc0) >> 6) as u8;
            msg.character[i + 5] = (value & 0x3f) as u8;
            i += 6;
            msg.set.copy_within(i + 3..141 + 3, i);
            msg.character.copy_within(i + 3..141 + 3, i);
            msg.length -= 3;
        } else {
            i += 1;
        }
    }

    // ECI designator at the front (Table 3).
    if eci != 0 {
        msg.bump(0);
        msg.character[0] = 27; // ECI
        if eci <= 31 {
            msg.bump(1);
            msg.character[1] = eci as u8;
        } else if eci <= 1023 {
            msg.bump(1);
            msg.bump(1);
            msg.character[1] = (0x20 | (eci >> 6) & 0x0f) as u8;
            msg.character[2] = (eci & 0x3f) as u8;
        } else if eci <= 32767 {
            for _ in 0..3 {
                msg.bump(1);
            }
            msg.character[1] = (0x30 | (eci >> 12) & 0x07) as u8;
            msg.character[2] = ((eci >> 6) & 0x3f) as u8;
            msg.character[3] = (eci & 0x3f) as u8;
        } else {
            for _ in 0..4 {
                msg.bump(1);
            }
            msg.character[1] = (0x38 | (eci >> 18) & 0x03) as u8;
            msg.character[2] = ((eci >> 12) & 0x3f) as u8;
            msg.character[3] = ((eci >> 6) & 0x3f) as u8;
            msg.character[4] = (eci & 0x3f) as u8;
        }
    }

    match mode {
        2 | 3 if msg.length > 84 => return Err(()),
        4 | 6 if msg.length > 93 => return Err(()),
        5 if msg.length > 77 => return Err(()),
        _ => {}
    }

    // Copy into the codeword layout.
    match mode {
        2 | 3 => {
            codewords[20..104].copy_from_slice(&msg.character[..84]);
        }
        5 => {
            codewords[1..10].copy_from_slice(&msg.character[..9]);
            codewords[20..88].copy_from_slice(&msg.character[9..77]);
        }
        _ => {
            codewords[1..10].copy_from_slice(&msg.character[..9]);
            codewords[20..104].copy_from_slice(&msg.character[9..93]);
        }
    }

    Ok(())
}

/* ---- Structured primaries ---- */

/// Mode 2: numeric postcode + length, country, service class bit-packed
/// into ten 6-bit codewords.
fn do_primary_2(codewords: &mut [u8; 144], postcode: &[u8], country: u32, service: u32) {
    let postcode_num = to_int(postcode).max(0) as u32;
    let postcode_length = postcode.len() as u32;

    codewords[0] = ((postcode_num & 0x03) << 4) as u8 | 2;
    codewords[1] = ((postcode_num & 0xfc) >> 2) as u8;
    codewords[2] = ((postcode_num & 0x3f00) >> 8) as u8;
    codewords[3] = ((postcode_num & 0xf_c000) >> 14) as u8;
    codewords[4] = ((postcode_num & 0x3f0_0000) >> 20) as u8;
    codewords[5] = ((postcode_num & 0x3c00_0000) >> 26) as u8 | ((postcode_length & 0x3) << 4) as u8;
    codewords[6] = ((postcode_length & 0x3c) >> 2) as u8 | ((country & 0x3) << 4) as u8;
    codewords[7] = ((country & 0xfc) >> 2) as u8;
    codewords[8] = ((country & 0x300) >> 8) as u8 | ((service & 0xf) << 2) as u8;
    codewords[9] = ((service & 0x3f0) >> 4) as u8;
}

/// Mode 3: six Code-Set-A postcode characters, packed 6 bits each.
fn do_primary_3(codewords: &mut [u8; 144], postcode: &mut [u8; 6], country: u32, service: u32) {
    let (_, symbol_chr) = code_set_tables();
    for p in postcode.iter_mut() {
        *p = symbol_chr[*p as usize];
    }

    codewords[0] = ((postcode[5] & 0x03) << 4) | 3;
    codewords[1] = ((postcode[4] & 0x03) << 4) | ((postcode[5] & 0x3c) >> 2);
    codewords[2] = ((postcode[3] & 0x03) << 4) | ((postcode[4] & 0x3c) >> 2);
    codewords[3] = ((postcode[2] & 0x03) << 4) | ((postcode[3] & 0x3c) >> 2);
    codewords[4] = ((postcode[1] & 0x03) << 4) | ((postcode[2] & 0x3c) >> 2);
    codewords[5] = ((postcode[0] & 0x03) << 4) | ((postcode[1] & 0x3c) >> 2);
    codewords[6] = ((postcode[0] & 0x3c) >> 2) | ((country & 0x3) << 4) as u8;
    codewords[7] = ((country & 0xfc) >> 2) as u8;
    codewords[8] = ((country & 0x300) >> 8) as u8 | ((service & 0xf) << 2) as u8;
    codewords[9] = ((service & 0x3f0) >> 4) as u8;
}

pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let source = segs[0].source.clone();
    let eci = segs[0].eci;
    let mut codewords = [0u8; 144];
    let mut scm_vv = -1;

    let mut mode = symbol.option_1;
    let primary = symbol.primary.clone().into_bytes();

    if mode <= 0 {
        // Unspecified (-1) or auto-determined (0) between 2 and 3.
        if primary.is_empty() {
            if mode == 0 {
                return Err(symbol.err(Error::InvalidData("primary message empty".into())));
            }
            mode = 4;
        } else {
            mode = 2;
            for &p in &primary[..primary.len().saturating_sub(6)] {
                if !p.is_ascii_digit() && p != b' ' {
                    mode = 3;
                    break;
                }
            }
        }
    }

    if !(2..=6).contains(&mode) {
        return Err(symbol.err(Error::InvalidOption("invalid mode (2 to 6 only)".into())));
    }

    if mode == 2 || mode == 3 {
        let lp = primary.len();
        if !(7..=15).contains(&lp) {
            // 1-9 character postcode + 3-digit country + 3-digit service.
            return Err(symbol.err(Error::InvalidData(
                "invalid length for primary message".into(),
            )));
        }
        let postcode_len = lp - 6;

        let country = to_int(&primary[postcode_len..postcode_len + 3]);
        let service = to_int(&primary[postcode_len + 3..postcode_len + 6]);
        if country == -1 || service == -1 {
            return Err(symbol.err(Error::InvalidData(
                "non-numeric country code or service class in primary message".into(),
            )));
        }

        if mode == 2 {
            let mut postcode = primary[..postcode_len].to_vec();
            if let Some(space) = postcode.iter().position(|&c| c == b' ') {
                postcode.truncate(space);
            }
            if postcode.iter().any(|c| !c.is_ascii_digit()) {
                return Err(symbol.err(Error::InvalidData(
                    "non-numeric postcode in primary message".into(),
                )));
            }
            do_primary_2(&mut codewords, &postcode, country as u32, service as u32);
        } else {
            // Truncate, right-space-pad to six and upper-case.
            let mut postcode = [b' '; 6];
            for (i, &c) in primary[..postcode_len.min(6)].iter().enumerate() {
                postcode[i] = c;
            }
            let upper = to_upper_vec(&postcode);
            postcode.copy_from_slice(&upper);
            let (code_set, _) = code_set_tables();
            for &c in &postcode {
                // Code Set A only, excluding the CR/FS/GS/RS controls.
                if c < b' ' || code_set[c as usize] > 1 {
                    return Err(symbol.err(Error::InvalidData(
                        "invalid character in postcode in primary message".into(),
                    )));
                }
            }
            do_primary_3(&mut codewords, &mut postcode, country as u32, service as u32);
        }

        if symbol.option_2 != 0 {
            // option_2 = vv + 1 selects the SCM prefix "[)>\R01\Gvv".
            if !(0..=100).contains(&symbol.option_2) {
                return Err(symbol.err(Error::InvalidOption("invalid SCM prefix version".into())));
            }
            scm_vv = symbol.option_2 - 1;
        }
    } else {
        codewords[0] = mode as u8;
    }

    if text_process(&mut codewords, mode, &source, eci, scm_vv).is_err() {
        return Err(symbol.err(Error::TooLong("input data too long".into())));
    }

    // Primary always carries Extended ECC; the secondary interleaves odd
    // and even check sequences.
    do_primary_check(&mut codewords);
    let eclen = if mode == 5 { 56 } else { 40 };
    do_secondary_chk_even(&mut codewords, eclen / 2);
    do_secondary_chk_odd(&mut codewords, eclen / 2);

    if symbol.debug {
        log::debug!("MaxiCode codewords: {:?}", &codewords[..]);
    }

    // Fixed grid placement plus the orientation marks.
    let map = grid_map();
    for row in 0..33 {
        for col in 0..30 {
            let v = map[row * 30 + col] as usize;
            if v != 0 {
                let block = (v + 5) / 6;
                let shift = 5 - (v + 5) % 6;
                if codewords[block - 1] >> shift & 1 != 0 {
                    symbol.set_module(row, col);
                }
            }
        }
    }
    for (row, col) in [
        (0, 28), (0, 29), (9, 10), (9, 11), (10, 11), (15, 7), (16, 8),
        (16, 20), (17, 20), (22, 10), (23, 10), (22, 17), (23, 17),
    ] {
        symbol.set_module(row, col);
    }

    symbol.width = 30;
    symbol.rows = 33;

    // Fixed-ratio symbol: any requested height is ignored.
    crate::common::set_height(symbol, 5.0, 0.0, 0.0, true);

    Ok(None)
}
