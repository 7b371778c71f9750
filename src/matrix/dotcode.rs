//! DotCode (AIM ISS DotCode Rev 4.0).
//!
//! Six-state encoder over code sets C, B, A and a binary buffer, with
//! macro and ECI prefixes; GF(113) Reed-Solomon with interleaved blocks;
//! checkerboard placement with six reserved corner dots; four masks
//! scored on edge coverage, isolated dots and empty rows/columns, with a
//! forced-corner rerun when every mask scores badly.

use crate::common::to_int;
use crate::error::{Error, Warning};
use crate::symbol::{BaseMode, Segment, Symbol};

const GF: u32 = 113;
const PM: u32 = 3;
const SCORE_UNLIT_EDGE: i32 = -99999;

/// Symbol character dot patterns, 9 bits each (Annex C).
#[rustfmt::skip]
static DOT_PATTERNS: [u16; 113] = [
    0x155, 0x0ab, 0x0ad, 0x0b5, 0x0d5, 0x156, 0x15a, 0x16a, 0x1aa, 0x0ae,
    0x0b6, 0x0ba, 0x0d6, 0x0da, 0x0ea, 0x12b, 0x12d, 0x135, 0x14b, 0x14d,
    0x153, 0x159, 0x165, 0x169, 0x195, 0x1a5, 0x1a9, 0x057, 0x05b, 0x05d,
    0x06b, 0x06d, 0x075, 0x097, 0x09b, 0x09d, 0x0a7, 0x0b3, 0x0b9, 0x0cb,
    0x0cd, 0x0d3, 0x0d9, 0x0e5, 0x0e9, 0x12e, 0x136, 0x13a, 0x14e, 0x15c,
    0x166, 0x16c, 0x172, 0x174, 0x196, 0x19a, 0x1a6, 0x1ac, 0x1b2, 0x1b4,
    0x1ca, 0x1d2, 0x1d4, 0x05e, 0x06e, 0x076, 0x07a, 0x09e, 0x0bc, 0x0ce,
    0x0dc, 0x0e6, 0x0ec, 0x0f2, 0x0f4, 0x117, 0x11b, 0x11d, 0x127, 0x133,
    0x139, 0x147, 0x163, 0x171, 0x18b, 0x18d, 0x193, 0x199, 0x1a3, 0x1b1,
    0x1c5, 0x1c9, 0x1d1, 0x02f, 0x037, 0x03b, 0x03d, 0x04f, 0x067, 0x073,
    0x079, 0x08f, 0x0c7, 0x0e3, 0x0f1, 0x11e, 0x13c, 0x178, 0x18e, 0x19c,
    0x1b8, 0x1c6, 0x1cc,
];

/* ---- Mask scoring (Annex A) ---- */

fn get_dot(dots: &[u8], hgt: i32, wid: i32, x: i32, y: i32) -> bool {
    x >= 0 && x < wid && y >= 0 && y < hgt && dots[(y * wid + x) as usize] == b'1'
}

fn clr_col(dots: &[u8], hgt: i32, wid: i32, x: i32) -> bool {
    ((x & 1)..hgt).step_by(2).all(|y| !get_dot(dots, hgt, wid, x, y))
}

fn clr_row(dots: &[u8], hgt: i32, wid: i32, y: i32) -> bool {
    ((y & 1)..wid).step_by(2).all(|x| !get_dot(dots, hgt, wid, x, y))
}

/// Empty interior columns cost `Hgt^n` for `n` consecutive, so clustered
/// emptiness is exponentially worse.
fn col_penalty(dots: &[u8], hgt: i32, wid: i32) -> i32 {
    let mut penalty = 0i64;
    let mut local = 0i64;
    for x in 1..wid - 1 {
        if clr_col(dots, hgt, wid, x) {
            local = if local == 0 { hgt as i64 } else { (local * hgt as i64).min(i32::MAX as i64) };
        } else if local != 0 {
            penalty += local;
            local = 0;
        }
    }
    (penalty + local).min(i32::MAX as i64) as i32
}

fn row_penalty(dots: &[u8], hgt: i32, wid: i32) -> i32 {
    let mut penalty = 0i64;
    let mut local = 0i64;
    for y in 1..hgt - 1 {
        if clr_row(dots, hgt, wid, y) {
            local = if local == 0 { wid as i64 } else { (local * wid as i64).min(i32::MAX as i64) };
        } else if local != 0 {
            penalty += local;
            local = 0;
        }
    }
    (penalty + local).min(i32::MAX as i64) as i32
}

fn score_array(dots: &[u8], hgt: i32, wid: i32) -> i32 {
    let penalty = row_penalty(dots, hgt, wid) + col_penalty(dots, hgt, wid);

    // Measure each edge's printed dots and their extent; the worst edge
    // (scaled by the crossing dimension) rules.
    let mut worstedge = i32::MAX;
    let edges: [(Box<dyn Fn(i32) -> (i32, i32)>, i32, i32, i32); 4] = [
        (Box::new(move |x| (x, 0)), 0, wid, hgt),             // top
        (Box::new(move |x| (x, hgt - 1)), wid & 1, wid, hgt), // bottom
        (Box::new(move |y| (0, y)), 0, hgt, wid),             // left
        (Box::new(move |y| (wid - 1, y)), hgt & 1, hgt, wid), // right
    ];
    for (project, start, limit, scale) in edges {
        let mut sum = 0;
        let mut first = -1;
        let mut last = -1;
        let mut i = start;
        while i < limit {
            let (x, y) = project(i);
            if get_dot(dots, hgt, wid, x, y) {
                if first < 0 {
                    first = i;
                }
                last = i;
                sum += 1;
            }
            i += 2;
        }
        if sum == 0 {
            return SCORE_UNLIT_EDGE;
        }
        let edge = (sum + last - first) * scale;
        worstedge = worstedge.min(edge);
    }

    // Count unprinted 5-crosses plus printed dots with 8 unprinted
    // neighbours.
    let mut sum = 0i32;
    for y in 0..hgt {
        let mut x = y & 1;
        while x < wid {
            if !get_dot(dots, hgt, wid, x - 1, y - 1)
                && !get_dot(dots, hgt, wid, x + 1, y - 1)
                && !get_dot(dots, hgt, wid, x - 1, y + 1)
                && !get_dot(dots, hgt, wid, x + 1, y + 1)
                && (!get_dot(dots, hgt, wid, x, y)
                    || (!get_dot(dots, hgt, wid, x - 2, y)
                        && !get_dot(dots, hgt, wid, x, y - 2)
                        && !get_dot(dots, hgt, wid, x + 2, y)
                        && !get_dot(dots, hgt, wid, x, y + 2)))
            {
                sum += 1;
            }
            x += 2;
        }
    }

    worstedge - sum * sum - penalty
}

/* ---- GF(113) Reed-Solomon ---- */

/// Adds `nc` check words to `nd` data words in `wd`, splitting into
/// interleaved blocks when the total exceeds the field size.
fn rsencode(nd: usize, nc: usize, wd: &mut [u8]) {
    // Antilog table for the generator element 3.
    let mut root = [0u32; (GF - 1) as usize];
    root[0] = 1;
    for i in 1..root.len() {
        root[i] = (PM * root[i - 1]) % GF;
    }

    let nw = nd + nc;
    let step = (nw + GF as usize - 2) / (GF as usize - 1);

    for start in 0..step {
        let nd_b = (nd - start).div_ceil(step);
        let nw_b = (nw - start).div_ceil(step);
        let nc_b = nw_b - nd_b;

        // Generator polynomial of order nc_b.
        let mut c = vec![0u32; GF as usize];
        c[0] = 1;
        for i in 1..=nc_b {
            for j in (1..=nc_b.min(i)).rev() {
                c[j] = (GF + c[j] - (root[i] * c[j - 1]) % GF) % GF;
            }
        }

        for i in nd_b..nw_b {
            wd[start + i * step] = 0;
        }
        for i in 0..nd_b {
            let k = (wd[start + i * step] as u32 + wd[start + nd_b * step] as u32) % GF;
            for j in 0..nc_b - 1 {
                wd[start + (nd_b + j) * step] =
                    ((GF - (c[j + 1] * k) % GF + wd[start + (nd_b + j + 1) * step] as u32) % GF)
                        as u8;
            }
            wd[start + (nd_b + nc_b - 1) * step] = ((GF - (c[nc_b] * k) % GF) % GF) as u8;
        }
        for i in nd_b..nw_b {
            wd[start + i * step] = ((GF - wd[start + i * step] as u32) % GF) as u8;
        }
    }
}

/* ---- Annex F predicates ---- */

fn datum_a(source: &[u8], position: usize) -> bool {
    position < source.len() && source[position] <= 95
}

/// 0 not encodable, 1 one character, 2 a CRLF pair.
fn datum_b(source: &[u8], position: usize) -> usize {
    if position >= source.len() {
        return 0;
    }
    let c = source[position];
    if position + 1 < source.len() && c == 13 && source[position + 1] == 10 {
        return 2;
    }
    if (32..=127).contains(&c) || matches!(c, 9 | 28 | 29 | 30) {
        return 1;
    }
    0
}

fn datum_c(source: &[u8], position: usize) -> bool {
    position + 1 < source.len()
        && source[position].is_ascii_digit()
        && source[position + 1].is_ascii_digit()
}

fn n_digits(source: &[u8], position: usize) -> usize {
    source[position.min(source.len())..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .count()
}

/// Ten or more digits shaped "17xxxxxx10..." (Annex F.II.B).
fn seventeen_ten(source: &[u8], position: usize) -> bool {
    n_digits(source, position) >= 10
        && source[position] == b'1'
        && source[position + 1] == b'7'
        && source[position + 8] == b'1'
        && source[position + 9] == b'0'
}

fn ahead_c(source: &[u8], position: usize) -> usize {
    let mut count = 0;
    let mut i = position;
    while datum_c(source, i) {
        count += 1;
        i += 2;
    }
    count
}

fn try_c(source: &[u8], position: usize) -> usize {
    if n_digits(source, position) > 0 && ahead_c(source, position) > ahead_c(source, position + 1)
    {
        ahead_c(source, position)
    } else {
        0
    }
}

fn ahead_a(source: &[u8], position: usize) -> usize {
    let mut count = 0;
    let mut i = position;
    while datum_a(source, i) && try_c(source, i) < 2 {
        count += 1;
        i += 1;
    }
    count
}

/// Returns characters reachable in set B; the codeword count comes back in
/// the second slot (CRLF pairs take one codeword).
fn ahead_b(source: &[u8], position: usize) -> (usize, usize) {
    let mut nx = 0;
    let mut i = position;
    loop {
        let incr = datum_b(source, i);
        if incr == 0 || try_c(source, i) >= 2 {
            break;
        }
        nx += 1;
        i += incr;
    }
    (i - position, nx)
}

fn is_binary(source: &[u8], position: usize) -> bool {
    position < source.len() && source[position] >= 128
}

/* ---- Annex F encoder ---- */

fn encode_message(
    symbol: &Symbol,
    source: &[u8],
    eci: u32,
    codewords: &mut Vec<u8>,
) -> bool {
    const LEAD_SPECIALS: [u8; 4] = [0x09, 0x1c, 0x1d, 0x1e]; // HT, FS, GS, RS

    let length = source.len();
    let gs1 = symbol.input_mode.base == BaseMode::Gs1;
    let mut input_position = 0usize;
    let mut encoding_mode = b'C';
    let mut inside_macro = 0u8;
    let mut binary_buffer: u64 = 0;
    let mut binary_buffer_size = 0usize;
    let mut binary_finish = false;

    if symbol.output_options.reader_init {
        codewords.push(109); // FNC3
    }

    if !gs1 && length > 2 && source[0].is_ascii_digit() && source[1].is_ascii_digit() {
        codewords.push(107); // FNC1 implied for a leading digit pair
    }

    if eci > 0 {
        codewords.push(108); // FNC2
        if eci <= 39 {
            codewords.push(eci as u8);
        } else {
            // Three codewords A, B, C encode (A-40)*12769 + B*113 + C + 40.
            let a = (eci - 40) / 12769;
            let b = (eci - 40 - 12769 * a) / 113;
            let c = eci - 40 - 12769 * a - 113 * b;
            codewords.push((a + 40) as u8);
            codewords.push(b as u8);
            codewords.push(c as u8);
        }
    }

    // A special character first would read as a macro: latch A around it.
    if LEAD_SPECIALS.contains(&source[0]) {
        codewords.push(101); // Latch A
        codewords.push(source[0] + 64);
        encoding_mode = b'A';
        input_position = 1;
    }

    while input_position < length {
        let mut done = false;

        /* Step A */
        if length >= 2 && input_position == length - 2 && inside_macro != 0 && inside_macro != 100
        {
            // Macros 97-99 imply the trailing RS/EOT.
            input_position += 2;
            done = true;
        }

        /* Step B */
        if !done && input_position == length - 1 && inside_macro == 100 {
            input_position += 1;
            done = true;
        }

        /* Step C1: macro headers */
        if !done && encoding_mode == b'C' && codewords.is_empty() && length > 6 {
            let p = input_position;
            if source[p] == b'['
                && source[p + 1] == b')'
                && source[p + 2] == b'>'
                && source[p + 3] == 30
                && source[length - 1] == 4
            {
                if source[p + 6] == 29 && source[length - 2] == 30 {
                    let macro_cw = match (source[p + 4], source[p + 5]) {
                        (b'0', b'5') => Some(97),
                        (b'0', b'6') => Some(98),
                        (b'1', b'2') => Some(99),
                        _ => None,
                    };
                    if let Some(cw) = macro_cw {
                        codewords.push(106); // Latch B
                        encoding_mode = b'B';
                        codewords.push(cw);
                        input_position += 7;
                        inside_macro = cw;
                        done = true;
                    }
                }
                if !done
                    && source[p + 4].is_ascii_digit()
                    && source[p + 5].is_ascii_digit()
                {
                    codewords.push(106); // Latch B
                    encoding_mode = b'B';
                    codewords.push(100); // free-form macro
                    input_position += 4;
                    inside_macro = 100;
                    done = true;
                }
            }
        }

        /* Step C2 */
        if !done && encoding_mode == b'C' {
            if seventeen_ten(source, input_position) {
                codewords.push(100); // (17)...(10) date compaction
                codewords.push(to_int(&source[input_position + 2..input_position + 4]) as u8);
                codewords.push(to_int(&source[input_position + 4..input_position + 6]) as u8);
                codewords.push(to_int(&source[input_position + 6..input_position + 8]) as u8);
                input_position += 10;
                done = true;
            }
        }
        if !done && encoding_mode == b'C' {
            if datum_c(source, input_position) || (gs1 && source[input_position] == b'[') {
                if source[input_position] == b'[' {
                    codewords.push(107); // FNC1
                    input_position += 1;
                } else {
                    codewords
                        .push(to_int(&source[input_position..input_position + 2]) as u8);
                    input_position += 2;
                }
                done = true;
            }
        }

        /* Step C3 */
        if !done && encoding_mode == b'C' && is_binary(source, input_position) {
            if n_digits(source, input_position + 1) > 0 {
                let c = source[input_position];
                if c - 128 < 32 {
                    codewords.push(110); // Upper Shift A
                    codewords.push(c - 128 + 64);
                } else {
                    codewords.push(111); // Upper Shift B
                    codewords.push(c - 128 - 32);
                }
                input_position += 1;
            } else {
                codewords.push(112); // Bin Latch
                encoding_mode = b'X';
            }
            done = true;
        }

        /* Step C4 */
        if !done && encoding_mode == b'C' {
            let m = ahead_a(source, input_position);
            let (n_chars, nx) = ahead_b(source, input_position);
            if m > n_chars {
                codewords.push(101); // Latch A
                encoding_mode = b'A';
            } else if (1..=4).contains(&nx) {
                codewords.push(101 + nx as u8); // nx Shift B
                for _ in 0..nx {
                    let c = source[input_position];
                    if c >= 32 {
                        codewords.push(c - 32);
                    } else if c == 13 {
                        codewords.push(96); // CRLF
                        input_position += 1;
                    } else {
                        match c {
                            9 => codewords.push(97),
                            28 => codewords.push(98),
                            29 => codewords.push(99),
                            _ => codewords.push(100), // RS
                        }
                    }
                    input_position += 1;
                }
            } else {
                codewords.push(106); // Latch B
                encoding_mode = b'B';
            }
            done = true;
        }

        /* Step D1 */
        if !done && encoding_mode == b'B' {
            let n = try_c(source, input_position);
            if n >= 2 {
                if n <= 4 {
                    codewords.push(103 + (n as u8 - 2)); // nx Shift C
                    for _ in 0..n {
                        codewords
                            .push(to_int(&source[input_position..input_position + 2]) as u8);
                        input_position += 2;
                    }
                } else {
                    codewords.push(106); // Latch C
                    encoding_mode = b'C';
                }
                done = true;
            }
        }

        /* Step D2 */
        if !done && encoding_mode == b'B' {
            if gs1 && source[input_position] == b'[' {
                codewords.push(107); // FNC1
                input_position += 1;
                done = true;
            } else {
                let db = datum_b(source, input_position);
                if db != 0 {
                    let c = source[input_position];
                    if (32..=127).contains(&c) {
                        codewords.push(c - 32);
                        done = true;
                    } else if c == 13 && db == 2 {
                        codewords.push(96); // CRLF
                        input_position += 1;
                        done = true;
                    } else if input_position != 0 {
                        // HT/FS/GS/RS first would read as a macro.
                        match c {
                            9 => codewords.push(97),
                            28 => codewords.push(98),
                            29 => codewords.push(99),
                            _ => codewords.push(100),
                        }
                        done = true;
                    }
                    if done {
                        input_position += 1;
                    }
                }
            }
        }

        /* Step D3 */
        if !done && encoding_mode == b'B' && is_binary(source, input_position) {
            if datum_b(source, input_position + 1) != 0 {
                let c = source[input_position];
                if c - 128 < 32 {
                    codewords.push(110); // Bin Shift A
                    codewords.push(c - 128 + 64);
                } else {
                    codewords.push(111); // Bin Shift B
                    codewords.push(c - 128 - 32);
                }
                input_position += 1;
            } else {
                codewords.push(112); // Bin Latch
                encoding_mode = b'X';
            }
            done = true;
        }

        /* Step D4 */
        if !done && encoding_mode == b'B' {
            if ahead_a(source, input_position) == 1 {
                codewords.push(101); // Shift A
                let c = source[input_position];
                codewords.push(if c < 32 { c + 64 } else { c - 32 });
                input_position += 1;
            } else {
                codewords.push(102); // Latch A
                encoding_mode = b'A';
            }
            done = true;
        }

        /* Step E1 */
        if !done && encoding_mode == b'A' {
            let n = try_c(source, input_position);
            if n >= 2 {
                if n <= 4 {
                    codewords.push(103 + (n as u8 - 2)); // nx Shift C
                    for _ in 0..n {
                        codewords
                            .push(to_int(&source[input_position..input_position + 2]) as u8);
                        input_position += 2;
                    }
                } else {
                    codewords.push(106); // Latch C
                    encoding_mode = b'C';
                }
                done = true;
            }
        }

        /* Step E2 */
        if !done && encoding_mode == b'A' {
            if gs1 && source[input_position] == b'[' {
                codewords.push(107); // FNC1
                input_position += 1;
                done = true;
            } else if datum_a(source, input_position) {
                let c = source[input_position];
                codewords.push(if c < 32 { c + 64 } else { c - 32 });
                input_position += 1;
                done = true;
            }
        }

        /* Step E3 */
        if !done && encoding_mode == b'A' && is_binary(source, input_position) {
            if datum_a(source, input_position + 1) {
                let c = source[input_position];
                if c - 128 < 32 {
                    codewords.push(110); // Bin Shift A
                    codewords.push(c - 128 + 64);
                } else {
                    codewords.push(111); // Bin Shift B
                    codewords.push(c - 128 - 32);
                }
                input_position += 1;
            } else {
                codewords.push(112); // Bin Latch
                encoding_mode = b'X';
            }
            done = true;
        }

        /* Step E4 */
        if !done && encoding_mode == b'A' {
            let (_, nx) = ahead_b(source, input_position);
            if (1..=6).contains(&nx) {
                codewords.push(95 + nx as u8); // nx Shift B
                for _ in 0..nx {
                    let c = source[input_position];
                    if c >= 32 {
                        codewords.push(c - 32);
                    } else if c == 13 {
                        codewords.push(96); // CRLF
                        input_position += 1;
                    } else {
                        match c {
                            9 => codewords.push(97),
                            28 => codewords.push(98),
                            29 => codewords.push(99),
                            _ => codewords.push(100),
                        }
                    }
                    input_position += 1;
                }
            } else {
                codewords.push(102); // Latch B
                encoding_mode = b'B';
            }
            done = true;
        }

        /* Step F1 */
        if !done && encoding_mode == b'X' {
            let n = try_c(source, input_position);
            if n >= 2 {
                drain_binary_buffer(&mut binary_buffer, &mut binary_buffer_size, codewords);
                if n <= 7 {
                    codewords.push(101 + n as u8); // interrupt for nx Shift C
                    for _ in 0..n {
                        codewords
                            .push(to_int(&source[input_position..input_position + 2]) as u8);
                        input_position += 2;
                    }
                } else {
                    codewords.push(111); // terminate with Latch C
                    encoding_mode = b'C';
                }
                done = true;
            }
        }

        /* Step F2: five bytes pack base 259 into six radix-103 codewords */
        if !done && encoding_mode == b'X' {
            if is_binary(source, input_position)
                || is_binary(source, input_position + 1)
                || is_binary(source, input_position + 2)
                || is_binary(source, input_position + 3)
            {
                binary_buffer = binary_buffer * 259 + source[input_position] as u64;
                binary_buffer_size += 1;
                if binary_buffer_size == 5 {
                    let mut lawrencium = [0u8; 6];
                    for l in lawrencium.iter_mut() {
                        *l = (binary_buffer % 103) as u8;
                        binary_buffer /= 103;
                    }
                    codewords.extend(lawrencium.iter().rev());
                    binary_buffer = 0;
                    binary_buffer_size = 0;
                }
                input_position += 1;
                done = true;
            }
        }

        /* Step F3 */
        if !done && encoding_mode == b'X' {
            drain_binary_buffer(&mut binary_buffer, &mut binary_buffer_size, codewords);
            if ahead_a(source, input_position) > ahead_b(source, input_position).0 {
                codewords.push(109); // terminate with Latch A
                encoding_mode = b'A';
            } else {
                codewords.push(110); // terminate with Latch B
                encoding_mode = b'B';
            }
        }
    }

    if encoding_mode == b'X' {
        if binary_buffer_size != 0 {
            drain_binary_buffer(&mut binary_buffer, &mut binary_buffer_size, codewords);
        }
        binary_finish = true;
    }

    binary_finish
}

/// Writes the buffered bytes as radix-103 codewords.
fn drain_binary_buffer(buffer: &mut u64, size: &mut usize, codewords: &mut Vec<u8>) {
    let mut lawrencium = [0u8; 6];
    for l in lawrencium.iter_mut().take(*size + 1) {
        *l = (*buffer % 103) as u8;
        *buffer /= 103;
    }
    for i in (0..=*size).rev() {
        codewords.push(lawrencium[i]);
    }
    *buffer = 0;
    *size = 0;
}

/* ---- Placement ---- */

/// Codewords to a bit stream: two mask bits then 9-bit dot patterns.
fn make_dotstream(masked: &[u8], dot_stream: &mut Vec<u8>) {
    dot_stream.clear();
    crate::common::bin_append(masked[0] as u32, 2, dot_stream);
    for &cw in &masked[1..] {
        crate::common::bin_append(DOT_PATTERNS[cw as usize] as u32, 9, dot_stream);
    }
}

/// Reserved corner dots carrying the last six message bits.
fn is_corner(column: i32, row: i32, width: i32, height: i32) -> bool {
    // Top left
    if column == 0 && row == 0 {
        return true;
    }
    if height % 2 == 1 {
        // Top right and bottom left for odd heights.
        if (column == width - 2 && row == 0) || (column == width - 1 && row == 1) {
            return true;
        }
        if column == 0 && row == height - 1 {
            return true;
        }
    } else {
        if column == width - 1 && row == 0 {
            return true;
        }
        if (column == 0 && row == height - 2) || (column == 1 && row == height - 1) {
            return true;
        }
    }
    // Bottom right
    (column == width - 2 && row == height - 1) || (column == width - 1 && row == height - 2)
}

/// Folds the bit stream over the checkerboard, horizontally for odd
/// heights and vertically for even.
fn fold_dotstream(dot_stream: &[u8], width: i32, height: i32, dot_array: &mut [u8]) {
    let w = width as usize;
    let h = height as usize;
    let mut input_position = 0usize;

    if height % 2 == 1 {
        for row in 0..height {
            for column in 0..width {
                let idx = (height - row - 1) as usize * w + column as usize;
                if (column + row) % 2 == 0 {
                    if is_corner(column, row, width, height) {
                        dot_array[row as usize * w + column as usize] = b'C';
                    } else {
                        dot_array[idx] = dot_stream[input_position];
                        input_position += 1;
                    }
                } else {
                    dot_array[idx] = b' '; // non-data position
                }
            }
        }
        for idx in [w - 2, h * w - 2, 2 * w - 1, (h - 1) * w - 1, 0, (h - 1) * w] {
            dot_array[idx] = dot_stream[input_position];
            input_position += 1;
        }
    } else {
        for column in 0..width {
            for row in 0..height {
                let idx = row as usize * w + column as usize;
                if (column + row) % 2 == 0 {
                    if is_corner(column, row, width, height) {
                        dot_array[idx] = b'C';
                    } else {
                        dot_array[idx] = dot_stream[input_position];
                        input_position += 1;
                    }
                } else {
                    dot_array[idx] = b' ';
                }
            }
        }
        for idx in [
            (h - 1) * w - 1,
            (h - 2) * w,
            h * w - 2,
            (h - 1) * w + 1,
            w - 1,
            0,
        ] {
            dot_array[idx] = dot_stream[input_position];
            input_position += 1;
        }
    }
}

/// Masks the codeword stream (weights 0/3/7/17 cumulative mod 113) and
/// recomputes the check words.
fn apply_mask(mask: usize, data: &[u8], ecc_length: usize) -> Vec<u8> {
    const WEIGHTS: [u32; 4] = [0, 3, 7, 17];
    let mut masked = Vec::with_capacity(data.len() + 1 + ecc_length);
    masked.push(mask as u8);
    let mut weight = 0u32;
    for &cw in data {
        masked.push(((weight + cw as u32) % 113) as u8);
        weight += WEIGHTS[mask];
    }
    masked.resize(data.len() + 1 + ecc_length, 0);
    rsencode(data.len() + 1, ecc_length, &mut masked);
    masked
}

fn force_corners(width: i32, height: i32, dot_array: &mut [u8]) {
    let w = width as usize;
    let h = height as usize;
    if width % 2 == 1 {
        // "Vertical" symbol
        for idx in [0, w - 1, (h - 2) * w, (h - 1) * w - 1, (h - 1) * w + 1, h * w - 2] {
            dot_array[idx] = b'1';
        }
    } else {
        // "Horizontal" symbol
        for idx in [0, w - 2, 2 * w - 1, (h - 1) * w - 1, (h - 1) * w, h * w - 2] {
            dot_array[idx] = b'1';
        }
    }
}

fn build_dot_array(
    masked: &[u8],
    n_dots: usize,
    width: i32,
    height: i32,
    dot_stream: &mut Vec<u8>,
    dot_array: &mut [u8],
) {
    make_dotstream(masked, dot_stream);
    while dot_stream.len() < n_dots {
        dot_stream.push(b'1'); // pad bits
    }
    fold_dotstream(dot_stream, width, height, dot_array);
}

/* ---- Top level ---- */

pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let source = segs[0].source.clone();
    let eci = segs[0].eci;

    if eci > 811799 {
        return Err(symbol.err(Error::InvalidOption("invalid ECI".into())));
    }

    // User mask is mask + 1 in the high byte of option_3.
    let mut user_mask = (symbol.option_3 >> 8) & 0x0f;
    if user_mask > 8 {
        user_mask = 0;
    }

    let mut codewords: Vec<u8> = Vec::with_capacity(source.len() * 4 + 8);
    let binary_finish = encode_message(symbol, &source, eci, &mut codewords);
    let mut data_length = codewords.len();
    debug_assert!(data_length > 0);

    if symbol.debug {
        log::debug!(
            "Codeword length {data_length}, ECC length {}: {:?}",
            3 + data_length / 2,
            codewords
        );
    }

    let min_dots = 9 * (data_length + 3 + data_length / 2) + 2;
    let min_area = min_dots * 2;

    let (mut width, mut height);
    if symbol.option_2 == 0 {
        // Automatic sizing at the recommended 3:2 aspect ratio.
        let h = (min_area as f64 * 0.666).sqrt();
        let w = (min_area as f64 * 1.5).sqrt();
        height = h as i32;
        width = w as i32;

        if (width + height) & 1 == 1 {
            if (width * height) < min_area as i32 {
                width += 1;
                height += 1;
            }
        } else if h * (width as f64) < w * height as f64 {
            width += 1;
            if (width * height) < min_area as i32 {
                width -= 1;
                height += 1;
                if (width * height) < min_area as i32 {
                    width += 2;
                }
            }
        } else {
            height += 1;
            if (width * height) < min_area as i32 {
                width += 1;
                height -= 1;
                if (width * height) < min_area as i32 {
                    height += 2;
                }
            }
        }
    } else {
        // User-defined width.
        width = symbol.option_2;
        height = (min_area as i32 + width - 1) / width;
        if (width + height) % 2 == 0 {
            height += 1;
        }
    }

    if symbol.debug {
        log::debug!("DotCode size {width}x{height}");
    }

    if height > 200 || width > 200 {
        return Err(symbol.err(Error::InvalidOption(format!(
            "symbol size {width}x{height} (WxH) is too large"
        ))));
    }
    if height < 5 || width < 5 {
        return Err(symbol.err(Error::InvalidOption(format!(
            "symbol size {width}x{height} (WxH) is too small"
        ))));
    }

    let n_dots = (height * width) as usize / 2;

    // Pad codewords into the spare dots.
    let mut padding_dots = n_dots as i32 - min_dots as i32;
    let mut is_first = true;
    while padding_dots >= 9 {
        if padding_dots < 18 && data_length % 2 == 0 {
            padding_dots -= 9;
        } else if padding_dots >= 18 {
            if data_length % 2 == 0 {
                padding_dots -= 9;
            } else {
                padding_dots -= 18;
            }
        } else {
            break; // not enough padding dots left
        }
        codewords.push(if is_first && binary_finish { 109 } else { 106 });
        data_length += 1;
        is_first = false;
    }

    let ecc_length = 3 + data_length / 2;
    let mut dot_stream: Vec<u8> = Vec::with_capacity(n_dots + data_length * 9);
    let mut dot_array = vec![0u8; (width * height) as usize];

    let best_mask = if user_mask != 0 {
        user_mask as usize - 1
    } else {
        let mut mask_score = [0i32; 8];
        for (mask, score) in mask_score.iter_mut().enumerate().take(4) {
            let masked = apply_mask(mask, &codewords, ecc_length);
            build_dot_array(&masked, n_dots, width, height, &mut dot_stream, &mut dot_array);
            *score = score_array(&dot_array, height, width);
            if symbol.debug {
                log::debug!("Mask {mask} score {score}");
            }
        }

        let mut high_score = mask_score[0];
        let mut best = 0usize;
        for (mask, &score) in mask_score.iter().enumerate().take(4).skip(1) {
            if score >= high_score {
                high_score = score;
                best = mask;
            }
        }

        // Re-evaluate with forced corners if the best score is weak; the
        // tie between natural and forced variants keeps the forced one.
        if high_score <= (height * width) / 2 {
            for mask in 0..4 {
                let masked = apply_mask(mask, &codewords, ecc_length);
                build_dot_array(&masked, n_dots, width, height, &mut dot_stream, &mut dot_array);
                force_corners(width, height, &mut dot_array);
                mask_score[mask + 4] = score_array(&dot_array, height, width);
                if symbol.debug {
                    log::debug!("Mask {} score {}", mask + 4, mask_score[mask + 4]);
                }
            }
            for (mask, &score) in mask_score.iter().enumerate().skip(4) {
                if score >= high_score {
                    high_score = score;
                    best = mask;
                }
            }
        }
        best
    };

    // Apply the winning mask.
    let masked = apply_mask(best_mask % 4, &codewords, ecc_length);
    build_dot_array(&masked, n_dots, width, height, &mut dot_stream, &mut dot_array);
    if best_mask >= 4 {
        force_corners(width, height, &mut dot_array);
    }

    symbol.width = width as usize;
    symbol.rows = height as usize;
    for y in 0..height as usize {
        for x in 0..width as usize {
            if dot_array[y * width as usize + x] == b'1' {
                symbol.set_module(y, x);
            }
        }
        symbol.set_row_height(y, 1.0);
    }
    symbol.height = height as f32;

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::DotCode)
    }

    #[test]
    fn test_auto_size_parity() {
        let mut s = symbol();
        s.encode(b"A1B2C3").unwrap();
        assert_eq!((s.width + s.rows) % 2, 1);
        assert!(s.width >= 5 && s.rows >= 5);
    }

    #[test]
    fn test_dark_modules_on_checkerboard() {
        let mut s = symbol();
        s.encode(b"A1B2C3").unwrap();
        for y in 0..s.rows {
            for x in 0..s.width {
                if s.module_is_set(y, x) {
                    assert_eq!((x + y) % 2, 0, "dot off the lattice at ({y},{x})");
                }
            }
        }
    }

    #[test]
    fn test_digit_pairs_in_c() {
        let mut s = symbol();
        let mut cws = Vec::new();
        // Leading digit pair: implied FNC1 then pairs.
        encode_message(&s, b"123456", 0, &mut cws);
        assert_eq!(cws, vec![107, 12, 34, 56]);
        s.input_mode.base = BaseMode::Gs1;
        let mut cws = Vec::new();
        encode_message(&s, b"123456", 0, &mut cws);
        assert_eq!(cws, vec![12, 34, 56]);
    }

    #[test]
    fn test_date_compaction() {
        // "17xxxxxx10..." compacts the date digits behind codeword 100.
        let s = symbol();
        let mut cws = Vec::new();
        encode_message(&s, b"1709021510123456", 0, &mut cws);
        // Implied FNC1 first for plain digit-led input.
        assert_eq!(cws[0], 107);
        assert_eq!(cws[1], 100);
        assert_eq!(&cws[2..5], &[9, 2, 15]);
        // The remaining digits continue as set C pairs.
        assert_eq!(&cws[5..], &[12, 34, 56]);
    }

    #[test]
    fn test_binary_latch_and_radix103() {
        let s = symbol();
        let mut cws = Vec::new();
        let data = [0x80u8, 0x81, 0x82, 0x83, 0x84, 0x85];
        encode_message(&s, &data, 0, &mut cws);
        // Latch from C into binary: 112 first.
        assert_eq!(cws[0], 112);
        // 5 bytes pack into 6 radix-103 codewords, the 6th byte drains.
        assert!(cws.len() >= 1 + 6 + 2);
        assert!(cws[1..7].iter().all(|&c| c < 103));
    }

    #[test]
    fn test_mixed_case_switches() {
        let s = symbol();
        let mut cws = Vec::new();
        encode_message(&s, b"Ab", 0, &mut cws);
        // From C: 'A' wins ahead_a? both A and b reachable; either a latch
        // or shift must appear before data values.
        assert!(cws.len() >= 3);
    }

    #[test]
    fn test_ecc_codeword_count() {
        let mut wd = vec![1u8, 2, 3, 4, 0, 0, 0, 0, 0];
        rsencode(4, 5, &mut wd);
        assert!(wd[4..].iter().all(|&c| c < 113));
        // Data part untouched.
        assert_eq!(&wd[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_user_width() {
        let mut s = symbol();
        s.option_2 = 13;
        s.encode(b"count").unwrap();
        assert_eq!(s.width, 13);
        assert_eq!((s.width + s.rows) % 2, 1);
    }

    #[test]
    fn test_width_too_small() {
        let mut s = symbol();
        s.option_2 = 4;
        assert_eq!(s.encode(b"x").unwrap_err().code(), 8);
    }

    #[test]
    fn test_too_large_rejected() {
        let mut s = symbol();
        s.option_2 = 201;
        assert_eq!(s.encode(b"x").unwrap_err().code(), 8);
    }

    #[test]
    fn test_corner_positions_odd_height() {
        // For an odd-height symbol the six reserved corners are fixed.
        assert!(is_corner(0, 0, 12, 9));
        assert!(is_corner(10, 0, 12, 9));
        assert!(is_corner(11, 1, 12, 9));
        assert!(is_corner(0, 8, 12, 9));
        assert!(is_corner(10, 8, 12, 9));
        assert!(is_corner(11, 7, 12, 9));
        assert!(!is_corner(2, 0, 12, 9));
    }

    #[test]
    fn test_user_mask_applied() {
        let mut s = symbol();
        s.option_3 = 3 << 8; // mask 2
        s.encode(b"mask test").unwrap();
        assert!(s.rows > 0);
    }

    #[test]
    fn test_reader_init_prefix() {
        let mut s = symbol();
        s.output_options.reader_init = true;
        let mut cws = Vec::new();
        encode_message(&s, b"AB", 0, &mut cws);
        assert_eq!(cws[0], 109); // FNC3
    }

    #[test]
    fn test_eci_prefix() {
        let s = symbol();
        let mut cws = Vec::new();
        encode_message(&s, b"AB", 26, &mut cws);
        assert_eq!(cws[0], 108); // FNC2
        assert_eq!(cws[1], 26);
    }
}
