//! PDF417 (ISO/IEC 15438) and MicroPDF417 (ISO/IEC 24728).
//!
//! Block segmentation follows the Appendix D rules: numeric runs of 13 or
//! more (6 when the run is the whole input) stay numeric, 11-12 digit runs
//! are costed against the text alternative, short runs are absorbed by
//! their neighbours. Text compaction tracks the four sub-modes across
//! segments so byte shifts interleave correctly.

use std::sync::OnceLock;

use crate::common::bin_append;
use crate::error::{Error, Warning, worse};
use crate::reedsol::Rs929;
use crate::symbol::{Segment, Symbol, Symbology};

const MAX_LEN: usize = 2710;
const MICRO_MAX_LEN: usize = 366;

/* ---- Compaction modes ---- */

const TEX: i32 = 900;
const BYT: i32 = 901;
const NUM: i32 = 902;

// Text sub-modes as bit flags.
const T_ALPHA: u8 = 1;
const T_LOWER: u8 = 2;
const T_MIXED: u8 = 4;
const T_PUNCT: u8 = 8;

/// Text sub-mode membership per ASCII value.
#[rustfmt::skip]
static ASCII_X: [u8; 127] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 12, 8, 0, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    7, 8, 8, 4, 12, 4, 4, 8, 8, 8, 12, 4, 12, 12, 12, 12, 4, 4, 4, 4, 4, 4, 4, 4,
    4, 4, 12, 8, 8, 4, 8, 8, 8, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1,
    1, 1, 1, 1, 8, 8, 8, 4, 8, 8, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2, 2,
    2, 2, 2, 2, 8, 8, 8, 8,
];

/// Text sub-mode values per ASCII value.
#[rustfmt::skip]
static ASCII_Y: [u8; 127] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 12, 15, 0, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    26, 10, 20, 15, 18, 21, 10, 28, 23, 24, 22, 20, 13, 16, 17, 19, 0, 1, 2, 3,
    4, 5, 6, 7, 8, 9, 14, 0, 1, 23, 2, 25, 3, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,
    16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 4, 5, 6, 24, 7, 8, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10,
    11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 21, 27, 9,
];

/// Automatic size selection for MicroPDF417: data-codeword thresholds and
/// the variant chosen at each.
#[rustfmt::skip]
static MICRO_AUTOSIZE: [u8; 56] = [
    4, 6, 7, 8, 10, 12, 13, 14, 16, 18, 19, 20, 24, 29, 30, 33, 34, 37, 39, 46, 54, 58, 70, 72, 82, 90, 108, 126,
    1, 14, 2, 7, 3, 25, 8, 16, 5, 17, 9, 6, 10, 11, 28, 12, 19, 13, 29, 20, 30, 21, 22, 31, 23, 32, 33, 34,
];

/// MicroPDF417 variants: columns, rows and error-correction codewords.
#[rustfmt::skip]
static MICRO_VARIANTS: [(u8, u8, u8); 34] = [
    (1, 11, 7), (1, 14, 7), (1, 17, 7), (1, 20, 8), (1, 24, 8), (1, 28, 8),
    (2, 8, 8), (2, 11, 9), (2, 14, 9), (2, 17, 10), (2, 20, 11), (2, 23, 13), (2, 26, 15),
    (3, 6, 12), (3, 8, 14), (3, 10, 16), (3, 12, 18), (3, 15, 21), (3, 20, 26), (3, 26, 32),
    (3, 32, 38), (3, 38, 44), (3, 44, 50),
    (4, 4, 8), (4, 6, 12), (4, 8, 14), (4, 10, 16), (4, 12, 18), (4, 15, 21), (4, 20, 26),
    (4, 26, 32), (4, 32, 38), (4, 38, 44), (4, 44, 50),
];

/* ---- Bar pattern tables, generated at first use ----
 *
 * Each codeword is 17 modules in 4 bars and 4 spaces of width 1-6;
 * cluster membership is (b1 - b2 + b3 - b4) mod 9. Sequences are
 * enumerated in lexicographic width order and the first 929 of each
 * cluster are assigned codeword values in order.
 */

fn pattern_tables() -> &'static [[u32; 929]; 3] {
    static TABLES: OnceLock<Box<[[u32; 929]; 3]>> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut tables = Box::new([[0u32; 929]; 3]);
        let mut counts = [0usize; 3];
        let mut widths = [1u32; 8];
        loop {
            let total: u32 = widths.iter().sum();
            if total == 17 {
                let cluster =
                    ((widths[0] as i32 - widths[2] as i32 + widths[4] as i32 - widths[6] as i32)
                        .rem_euclid(9)) as usize;
                if cluster % 3 == 0 {
                    let slot = cluster / 3;
                    if counts[slot] < 929 {
                        let mut bits = 0u32;
                        for (i, &w) in widths.iter().enumerate() {
                            for _ in 0..w {
                                bits = bits << 1 | (1 - (i as u32 & 1));
                            }
                        }
                        tables[slot][counts[slot]] = bits;
                        counts[slot] += 1;
                    }
                }
            }
            // Next tuple in lexicographic order.
            let mut i = 8;
            loop {
                if i == 0 {
                    debug_assert!(counts.iter().all(|&c| c == 929));
                    return tables;
                }
                i -= 1;
                if widths[i] < 6 {
                    widths[i] += 1;
                    for w in &mut widths[i + 1..] {
                        *w = 1;
                    }
                    break;
                }
            }
        }
    })
}

/// Row address patterns for MicroPDF417, 52 per side/centre: 10 modules in
/// 3 bars and 3 spaces, enumerated like the codeword patterns.
fn rap_tables() -> &'static (Vec<u32>, Vec<u32>) {
    static TABLES: OnceLock<(Vec<u32>, Vec<u32>)> = OnceLock::new();
    TABLES.get_or_init(|| {
        let mut side = Vec::with_capacity(52);
        let mut centre = Vec::with_capacity(52);
        let mut widths = [1u32; 6];
        'outer: loop {
            let total: u32 = widths.iter().sum();
            if total == 10 {
                let mut bits = 0u32;
                for (i, &w) in widths.iter().enumerate() {
                    for _ in 0..w {
                        bits = bits << 1 | (1 - (i as u32 & 1));
                    }
                }
                if side.len() < 52 {
                    side.push(bits);
                } else if centre.len() < 52 {
                    centre.push(bits);
                } else {
                    break 'outer;
                }
            }
            let mut i = 6;
            loop {
                if i == 0 {
                    break 'outer;
                }
                i -= 1;
                if widths[i] < 5 {
                    widths[i] += 1;
                    for w in &mut widths[i + 1..] {
                        *w = 1;
                    }
                    break;
                }
            }
        }
        debug_assert_eq!(side.len(), 52);
        debug_assert_eq!(centre.len(), 52);
        (side, centre)
    })
}

/* ---- Appendix D block segmentation ---- */

fn quelmode(c: u8) -> i32 {
    if c.is_ascii_digit() {
        NUM
    } else if c < 127 && ASCII_X[c as usize] != 0 {
        TEX
    } else {
        BYT
    }
}

#[derive(Debug, Clone, Copy)]
struct Block {
    length: usize,
    mode: i32,
    start: usize,
}

/// Combined length of consecutive text/numeric blocks from `start` (capped
/// at 5, all that matters).
fn text_num_length(blocks: &[Block], start: usize) -> usize {
    let mut len = 0;
    for b in &blocks[start..] {
        if b.mode == BYT {
            break;
        }
        len += b.length;
        if len >= 5 {
            break;
        }
    }
    len
}

/// Length in text codeword halves of a block, allowing for sub-mode
/// switches (the no-output twin of `textprocess`).
fn text_submode_length(data: &[u8], start: usize, length: usize, curtable: &mut u8) -> usize {
    let mut wnet = 0;
    for j in 0..length {
        let t = ASCII_X[data[start + j] as usize];
        if t & *curtable != 0 {
            wnet += 1;
            continue;
        }
        // Obliged to change table.
        let newtable = if j == length - 1 || t & ASCII_X[data[start + j + 1] as usize] == 0 {
            // Single-character excursion: try a temporary shift.
            if t & T_ALPHA != 0 && *curtable == T_LOWER {
                wnet += 2; // AS + char
                continue;
            }
            if t & T_PUNCT != 0 {
                wnet += 2; // PS + char
                continue;
            }
            t
        } else {
            t & ASCII_X[data[start + j + 1] as usize]
        };

        let newtable = reduce_table_choice(newtable);
        wnet += switch_cost(*curtable, newtable);
        *curtable = newtable;
        wnet += 1;
    }
    wnet
}

/// Keeps the first table when several are possible.
fn reduce_table_choice(t: u8) -> u8 {
    if t == T_ALPHA | T_LOWER | T_MIXED {
        T_ALPHA
    } else if t == T_MIXED | T_PUNCT {
        T_MIXED
    } else {
        t
    }
}

/// Codeword halves spent latching from one sub-mode to another.
fn switch_cost(from: u8, to: u8) -> usize {
    match (from, to) {
        (T_ALPHA, T_LOWER) | (T_ALPHA, T_MIXED) => 1,
        (T_ALPHA, T_PUNCT) => 2, // ML + PL
        (T_LOWER, T_ALPHA) => 2, // ML + AL
        (T_LOWER, T_MIXED) => 1,
        (T_LOWER, T_PUNCT) => 2,
        (T_MIXED, _) => 1,
        (T_PUNCT, T_ALPHA) => 1,
        (T_PUNCT, _) => 2,
        _ => 0,
    }
}

/// Whether a numeric block should stay numeric (Appendix D).
fn num_stay(data: &[u8], blocks: &[Block], i: usize) -> bool {
    if blocks[i].length >= 13 || (blocks.len() == 1 && blocks[i].length > 5) {
        return true;
    }
    if blocks[i].length < 11 {
        return false;
    }

    // An 11-12 digit run: weigh numeric against staying in text.
    let mut curtable = T_ALPHA;
    let last_len = if i == 0 {
        0
    } else {
        text_submode_length(data, blocks[i - 1].start, blocks[i - 1].length, &mut curtable)
    };
    let last_ml = curtable == T_MIXED;

    curtable = T_ALPHA; // after NUM the sub-mode resets to alpha
    let next_len = if i == blocks.len() - 1 {
        0
    } else {
        text_submode_length(data, blocks[i + 1].start, blocks[i + 1].length, &mut curtable)
    };
    let num_cws = (last_len + 1) / 2
        + 1
        + 4
        + usize::from(blocks[i].length > 11)
        + 1
        + (next_len + 1) / 2;

    curtable = T_MIXED; // staying text means digits through the mixed table
    let next_len = if i == blocks.len() - 1 {
        0
    } else {
        text_submode_length(data, blocks[i + 1].start, blocks[i + 1].length, &mut curtable)
    };
    let tex_cws = (last_len + usize::from(!last_ml) + blocks[i].length + next_len + 1) / 2;

    num_cws <= tex_cws
}

/// Merges the initial homogeneous runs per Appendix D.
fn appendix_d_encode(data: &[u8], blocks: &mut Vec<Block>) {
    let mut out: Vec<Block> = Vec::with_capacity(blocks.len());
    let mut i = 0;
    let mut stayintext = false;

    while i < blocks.len() {
        if blocks[i].mode == NUM && num_stay(data, blocks, i) {
            // Leave as numeric.
            out.push(blocks[i]);
            stayintext = false;
            i += 1;
        } else if (blocks[i].mode == TEX || blocks[i].mode == NUM)
            && (stayintext
                || i == blocks.len() - 1
                || blocks[i].length >= 5
                || text_num_length(blocks, i) >= 5)
        {
            // Text, absorbing adjacent short numeric runs.
            let mut merged = blocks[i];
            merged.mode = TEX;
            stayintext = false;
            let mut next = i + 1;
            while next < blocks.len() {
                if blocks[next].mode == NUM && num_stay(data, blocks, next) {
                    break;
                }
                if blocks[next].mode == BYT {
                    break;
                }
                merged.length += blocks[next].length;
                next += 1;
            }
            out.push(merged);
            i = next;
        } else {
            // Byte, absorbing any short text/numeric stragglers.
            let mut merged = blocks[i];
            merged.mode = BYT;
            stayintext = false;
            let mut next = i + 1;
            while next < blocks.len() {
                if blocks[next].mode != BYT {
                    // A single byte shifted from text mode stays in text.
                    if merged.length == 1
                        && !out.is_empty()
                        && out.last().unwrap().mode == TEX
                    {
                        stayintext = true;
                        break;
                    }
                    if blocks[next].length >= 5 || text_num_length(blocks, next) >= 5 {
                        break;
                    }
                }
                merged.length += blocks[next].length;
                next += 1;
            }
            out.push(merged);
            i = next;
        }
    }

    *blocks = out;
}

/* ---- Compaction processors ---- */

struct TextState {
    curtable: u8,
    padded: bool,
}

fn textprocess(
    codewords: &mut Vec<u16>,
    data: &[u8],
    start: usize,
    length: usize,
    lastmode: i32,
    state: &mut TextState,
) {
    let mut chainet: Vec<u8> = Vec::with_capacity(length * 2 + 8);

    if lastmode != TEX {
        state.curtable = T_ALPHA;
    }

    for j in 0..length {
        let t = ASCII_X[data[start + j] as usize];
        let v = ASCII_Y[data[start + j] as usize];
        if t & state.curtable != 0 {
            chainet.push(v);
            continue;
        }
        let newtable = if j == length - 1 || t & ASCII_X[data[start + j + 1] as usize] == 0 {
            if t & T_ALPHA != 0 && state.curtable == T_LOWER {
                chainet.push(27); // AS
                chainet.push(v);
                continue;
            }
            if t & T_PUNCT != 0 {
                chainet.push(29); // PS
                chainet.push(v);
                continue;
            }
            t
        } else {
            t & ASCII_X[data[start + j + 1] as usize]
        };
        let newtable = reduce_table_choice(newtable);

        match (state.curtable, newtable) {
            (T_ALPHA, T_LOWER) => chainet.push(27),
            (T_ALPHA, T_MIXED) => chainet.push(28),
            (T_ALPHA, T_PUNCT) | (T_LOWER, T_PUNCT) => {
                chainet.push(28);
                chainet.push(25);
            }
            (T_LOWER, T_ALPHA) => {
                chainet.push(28);
                chainet.push(28);
            }
            (T_LOWER, T_MIXED) => chainet.push(28),
            (T_MIXED, T_ALPHA) => chainet.push(28),
            (T_MIXED, T_LOWER) => chainet.push(27),
            (T_MIXED, T_PUNCT) => chainet.push(25),
            (T_PUNCT, T_ALPHA) => chainet.push(29),
            (T_PUNCT, T_LOWER) => {
                chainet.push(29);
                chainet.push(27);
            }
            (T_PUNCT, T_MIXED) => {
                chainet.push(29);
                chainet.push(28);
            }
            _ => {}
        }
        state.curtable = newtable;
        chainet.push(v);
    }

    state.padded = chainet.len() & 1 != 0;
    if state.padded {
        chainet.push(29);
    }

    if lastmode != TEX {
        codewords.push(900);
    }
    for pair in chainet.chunks(2) {
        codewords.push(30 * pair[0] as u16 + pair[1] as u16);
    }
}

fn byteprocess(
    codewords: &mut Vec<u16>,
    data: &[u8],
    start: usize,
    length: usize,
    lastmode: i32,
) {
    if length == 1 {
        // Shift or latch depending on the previous mode.
        codewords.push(if lastmode == TEX { 913 } else { 901 });
        codewords.push(data[start] as u16);
        return;
    }

    codewords.push(if length % 6 == 0 { 924 } else { 901 });

    let mut chunk_start = start;
    let mut remaining = length;
    while remaining >= 6 {
        // Six bytes as a 48-bit integer, five base-900 codewords.
        let mut total: u64 = 0;
        for k in 0..6 {
            total |= (data[chunk_start + k] as u64) << ((5 - k) * 8);
        }
        let mut group = [0u16; 5];
        for k in (0..5).rev() {
            group[k] = (total % 900) as u16;
            total /= 900;
        }
        codewords.extend_from_slice(&group);
        chunk_start += 6;
        remaining -= 6;
    }
    for k in 0..remaining {
        codewords.push(data[chunk_start + k] as u16);
    }
}

fn numbprocess(codewords: &mut Vec<u16>, data: &[u8], start: usize, length: usize) {
    codewords.push(902);

    let mut j = 0;
    while j < length {
        let chunk = (length - j).min(44);
        // '1' prefix guards leading zeros; repeated division by 900
        // yields the codewords least-significant first.
        let mut digits: Vec<u8> = Vec::with_capacity(chunk + 1);
        digits.push(1);
        digits.extend(data[start + j..start + j + chunk].iter().map(|&c| c - b'0'));

        let mut emitted: Vec<u16> = Vec::new();
        let mut len = digits.len();
        loop {
            let mut p = 0;
            let mut nombre: u32 = 0;
            let mut quotient: Vec<u8> = vec![0; len];
            let mut qp = 0;
            for &d in &digits[..len] {
                nombre = nombre * 10 + d as u32;
                if nombre < 900 {
                    if qp > 0 {
                        quotient[qp] = 0;
                        qp += 1;
                    }
                } else {
                    quotient[qp] = (nombre / 900) as u8;
                    qp += 1;
                    nombre %= 900;
                }
                p = qp;
            }
            emitted.push(nombre as u16);
            if p == 0 {
                break;
            }
            digits[..p].copy_from_slice(&quotient[..p]);
            len = p;
        }
        for &cw in emitted.iter().rev() {
            codewords.push(cw);
        }
        j += chunk;
    }
}

/* ---- Initial processing (shared between full and micro) ---- */

struct PdfState {
    lastmode: i32,
    text: TextState,
}

fn initial(
    symbol: &mut Symbol,
    data: &[u8],
    eci: u32,
    is_micro: bool,
    state: &mut PdfState,
    codewords: &mut Vec<u16>,
) -> Result<(), Error> {
    // Homogeneous runs.
    let mut blocks: Vec<Block> = Vec::new();
    let mut indexchaine = 0;
    let mut mode = quelmode(data[0]);
    while indexchaine < data.len() {
        let start = indexchaine;
        let block_mode = mode;
        let mut length = 0;
        while indexchaine < data.len() && mode == block_mode {
            length += 1;
            indexchaine += 1;
            if indexchaine < data.len() {
                mode = quelmode(data[indexchaine]);
            }
        }
        blocks.push(Block { length, mode: block_mode, start });
    }

    appendix_d_encode(data, &mut blocks);

    if codewords.is_empty() && !is_micro {
        codewords.push(0); // length descriptor placeholder
    }
    if codewords.len() <= 1 && symbol.output_options.reader_init {
        codewords.push(921);
    }

    if eci != 0 {
        if eci > 811799 {
            return Err(symbol.err(Error::InvalidOption("invalid ECI".into())));
        }
        if eci <= 899 {
            codewords.push(927);
            codewords.push(eci as u16);
        } else if eci <= 810899 {
            codewords.push(926);
            codewords.push((eci / 900 - 1) as u16);
            codewords.push((eci % 900) as u16);
        } else {
            codewords.push(925);
            codewords.push((eci - 810900) as u16);
        }
    }

    for b in &blocks {
        match b.mode {
            TEX => {
                textprocess(codewords, data, b.start, b.length, state.lastmode, &mut state.text);
                state.lastmode = TEX;
            }
            BYT => {
                byteprocess(codewords, data, b.start, b.length, state.lastmode);
                if state.lastmode != TEX || b.length != 1 {
                    state.lastmode = BYT;
                } else if state.text.curtable == T_PUNCT && state.text.padded {
                    // A padded PS must fall back to alpha before the shift
                    // byte resumes text (ISO 15438 5.4.2.4).
                    state.text.curtable = T_ALPHA;
                }
            }
            _ => {
                numbprocess(codewords, data, b.start, b.length);
                state.lastmode = NUM;
            }
        }
    }

    Ok(())
}

/// Structured Append control block (ISO 15438 5.4.5 / 24728 5.4.4).
fn structapp_codewords(symbol: &mut Symbol) -> Result<Vec<u16>, Error> {
    let Some(sa) = symbol.structapp.clone() else {
        return Ok(Vec::new());
    };

    if !(2..=99999).contains(&sa.count) {
        return Err(symbol.err(Error::InvalidOption(
            "Structured Append count out of range (2-99999)".into(),
        )));
    }
    if sa.index < 1 || sa.index > sa.count {
        return Err(symbol.err(Error::InvalidOption(format!(
            "Structured Append index out of range (1-{})",
            sa.count
        ))));
    }

    let mut ids: Vec<u16> = Vec::new();
    if !sa.id.is_empty() {
        if sa.id.len() > 30 {
            return Err(symbol.err(Error::InvalidOption(
                "Structured Append ID too long (30 digit maximum)".into(),
            )));
        }
        for triplet in sa.id.as_bytes().chunks(3) {
            let val = crate::common::to_int(triplet);
            if val < 0 {
                return Err(symbol.err(Error::InvalidOption(
                    "invalid Structured Append ID (digits only)".into(),
                )));
            }
            if val > 899 {
                return Err(symbol.err(Error::InvalidOption(format!(
                    "Structured Append ID triplet '{val:03}' out of range (000-899)"
                ))));
            }
            ids.push(val as u16);
        }
    }

    let mut cws: Vec<u16> = Vec::with_capacity(18);
    cws.push(928); // macro marker
    cws.push(((100000 + sa.index as u32 - 1) / 900) as u16);
    cws.push(((100000 + sa.index as u32 - 1) % 900) as u16);
    cws.extend_from_slice(&ids);
    cws.push(923); // optional field
    cws.push(1); // segment count tag
    cws.push(((100000 + sa.count as u32) / 900) as u16);
    cws.push(((100000 + sa.count as u32) % 900) as u16);
    if sa.index == sa.count {
        cws.push(922); // terminator on the last segment
    }
    Ok(cws)
}

fn initial_segs(
    symbol: &mut Symbol,
    segs: &[Segment],
    is_micro: bool,
) -> Result<(Vec<u16>, Vec<u16>), Error> {
    let structapp = structapp_codewords(symbol)?;

    let mut codewords: Vec<u16> = Vec::new();
    let mut state = PdfState {
        // The full symbol defaults to Text Compaction, the micro to Byte.
        lastmode: if is_micro { BYT } else { TEX },
        text: TextState { curtable: T_ALPHA, padded: false },
    };
    for seg in segs {
        let source = seg.source.clone();
        initial(symbol, &source, seg.eci, is_micro, &mut state, &mut codewords)?;
    }

    Ok((codewords, structapp))
}

/* ---- Row rendering ---- */

fn render_row(symbol: &mut Symbol, row: usize, bits: &[u8]) {
    for (col, &b) in bits.iter().enumerate() {
        if b == b'1' {
            symbol.set_module(row, col);
        }
    }
    if bits.len() > symbol.width {
        symbol.width = bits.len();
    }
}

/* ---- PDF417 ---- */

pub fn pdf417(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let mut warning = None;

    if !(-1..=8).contains(&symbol.option_1) {
        warning = symbol.warn(Warning::InvalidOption, "security value out of range (0 to 8)");
        symbol.option_1 = -1;
    }
    if !(0..=30).contains(&symbol.option_2) {
        warning = symbol.warn(Warning::InvalidOption, "number of columns out of range (1 to 30)");
        symbol.option_2 = 0;
    }
    if symbol.option_3 != 0 && !(3..=90).contains(&symbol.option_3) {
        return Err(symbol.err(Error::InvalidOption(
            "number of rows out of range (3 to 90)".into(),
        )));
    }
    if symbol.option_2 != 0 && symbol.option_3 != 0 && symbol.option_2 * symbol.option_3 > 928 {
        return Err(symbol.err(Error::InvalidOption(
            "columns x rows out of range (1 to 928)".into(),
        )));
    }

    let total_len: usize = segs.iter().map(|s| s.source.len()).sum();
    if total_len > MAX_LEN {
        return Err(symbol.err(Error::TooLong("input string too long".into())));
    }

    let (mut codewords, structapp) = initial_segs(symbol, segs, false)?;

    if symbol.debug {
        log::debug!("Data codewords (excl. length): {:?}", &codewords[1..]);
    }

    // ECC level by data count when unspecified (Annex E recommended
    // minima).
    let ecc = if symbol.option_1 >= 0 {
        symbol.option_1 as u32
    } else {
        let data_cws = codewords.len() - 1 + structapp.len();
        match data_cws {
            0..=40 => 2,
            41..=160 => 3,
            161..=320 => 4,
            321..=863 => 5,
            _ => 6,
        }
    };
    let ecc_cws = 1usize << (ecc + 1);

    let longueur = codewords.len() + structapp.len() + ecc_cws;
    if longueur > 928 {
        return Err(symbol.err(Error::TooLong("input string too long".into())));
    }

    // Fit rows x cols.
    let mut cols = symbol.option_2 as usize;
    let mut rows = symbol.option_3 as usize;
    if rows != 0 {
        if cols == 0 {
            cols = longueur.div_ceil(rows);
            if cols <= 1 {
                cols = 1;
            } else {
                while cols > 30 && rows < 90 {
                    rows += 1;
                    cols = longueur.div_ceil(rows);
                }
                while cols >= 1 && rows < 90 && rows * cols > 928 {
                    rows += 1;
                    cols = longueur.div_ceil(rows);
                }
                if rows * cols > 928 {
                    return Err(symbol.err(Error::TooLong(
                        "data too long for specified number of rows".into(),
                    )));
                }
            }
        } else {
            while rows <= 90 && rows * cols < longueur {
                rows += 1;
            }
            if rows > 90 || rows * cols > 928 {
                return Err(symbol.err(Error::TooLong(
                    "data too long for specified number of columns".into(),
                )));
            }
        }
        if rows != symbol.option_3 as usize {
            warning = symbol.warn(
                Warning::InvalidOption,
                format!("rows increased from {} to {}", symbol.option_3, rows),
            );
        }
    } else {
        if cols == 0 {
            cols = (((longueur - 1) as f32 / 3.0).sqrt()).round() as usize;
        }
        cols = cols.max(1);
        rows = longueur.div_ceil(cols);
        if rows <= 3 {
            rows = 3;
        } else {
            while rows > 90 && cols < 30 {
                cols += 1;
                rows = longueur.div_ceil(cols);
            }
            while rows >= 3 && cols < 30 && rows * cols > 928 {
                cols += 1;
                rows = longueur.div_ceil(cols);
            }
            if rows * cols > 928 {
                return Err(symbol.err(Error::TooLong(
                    "data too long for specified number of columns".into(),
                )));
            }
            if symbol.option_2 != 0 && cols != symbol.option_2 as usize {
                warning = symbol.warn(
                    Warning::InvalidOption,
                    format!("columns increased from {} to {}", symbol.option_2, cols),
                );
            }
        }
    }
    debug_assert!(rows * cols >= longueur);

    // Padding, then the Structured Append block, then the length
    // descriptor.
    let padding = rows * cols - longueur;
    codewords.extend(std::iter::repeat_n(900, padding));
    codewords.extend_from_slice(&structapp);
    codewords[0] = codewords.len() as u16;

    // GF(929) check codewords.
    let rs = Rs929::new(ecc_cws);
    let check = rs.encode(&codewords);
    codewords.extend_from_slice(&check);

    if symbol.debug {
        log::debug!("Complete codeword stream ({}): {:?}", codewords.len(), codewords);
    }

    // Row assembly: cluster rotates 0/3/6 by row, with left/right row
    // descriptors derived from rows, ECC level and columns.
    let tables = pattern_tables();
    let c1 = ((rows - 1) / 3) as u16;
    let c2 = (ecc * 3) as u16 + ((rows - 1) % 3) as u16;
    let c3 = (cols - 1) as u16;

    for i in 0..rows {
        let cluster = i % 3;
        let k = ((i / 3) * 30) as u16;
        let (left, right) = match cluster {
            0 => (k + c1, k + c3),
            1 => (k + c2, k + c1),
            _ => (k + c3, k + c2),
        };

        let mut bits: Vec<u8> = Vec::with_capacity(cols * 17 + 70);
        bin_append(0x1FEA8, 17, &mut bits); // row start

        bin_append(tables[cluster][left as usize], 17, &mut bits);
        for j in 0..cols {
            bin_append(tables[cluster][codewords[i * cols + j] as usize], 17, &mut bits);
        }

        if symbol.symbology != Symbology::Pdf417Comp {
            bin_append(tables[cluster][right as usize], 17, &mut bits);
            bin_append(0x3FA29, 18, &mut bits); // row stop
        } else {
            bits.push(b'1'); // compact stop
        }

        render_row(symbol, i, &bits);
    }
    symbol.rows = rows;

    // 3X minimum row height; an earlier option warning takes precedence.
    let height_warning = if warning.is_some() {
        crate::common::set_height(symbol, 3.0, 0.0, 0.0, true);
        None
    } else {
        crate::common::set_height(symbol, 3.0, 0.0, 0.0, false)
    };

    Ok(worse(warning, height_warning))
}

/* ---- MicroPDF417 ---- */

pub fn micropdf417(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>, Error> {
    let mut warning = None;

    let total_len: usize = segs.iter().map(|s| s.source.len()).sum();
    if total_len > MICRO_MAX_LEN {
        return Err(symbol.err(Error::TooLong("input data too long".into())));
    }
    if symbol.option_3 != 0 {
        return Err(symbol.err(Error::InvalidOption(
            "cannot specify rows for this symbology".into(),
        )));
    }

    let (mut codewords, structapp) = initial_segs(symbol, segs, true)?;
    let data_len = codewords.len() + structapp.len();

    if data_len > 126 {
        return Err(symbol.err(Error::TooLong("input data too long".into())));
    }
    if symbol.option_2 > 4 {
        warning = symbol.warn(Warning::InvalidOption, "specified width out of range");
        symbol.option_2 = 0;
    }

    // Columns request vs data demand.
    let col_caps = [(1usize, 20usize), (2, 37), (3, 82)];
    for &(opt, cap) in &col_caps {
        if symbol.option_2 == opt as i32 && data_len > cap {
            warning = symbol.warn(
                Warning::InvalidOption,
                "specified symbol size too small for data",
            );
            symbol.option_2 = 0;
        }
    }

    let variant = match symbol.option_2 {
        1 => match data_len {
            0..=4 => 1,
            5..=7 => 2,
            8..=10 => 3,
            11..=12 => 4,
            13..=16 => 5,
            _ => 6,
        },
        2 => match data_len {
            0..=8 => 7,
            9..=13 => 8,
            14..=19 => 9,
            20..=24 => 10,
            25..=29 => 11,
            30..=33 => 12,
            _ => 13,
        },
        3 => match data_len {
            0..=6 => 14,
            7..=10 => 15,
            11..=14 => 16,
            15..=18 => 17,
            19..=24 => 18,
            25..=34 => 19,
            35..=46 => 20,
            47..=58 => 21,
            59..=70 => 22,
            _ => 23,
        },
        4 => match data_len {
            0..=8 => 24,
            9..=12 => 25,
            13..=18 => 26,
            19..=24 => 27,
            25..=30 => 28,
            31..=39 => 29,
            40..=54 => 30,
            55..=72 => 31,
            73..=90 => 32,
            91..=108 => 33,
            _ => 34,
        },
        _ => {
            let mut variant = 0;
            for i in (0..28).rev() {
                if MICRO_AUTOSIZE[i] as usize >= data_len {
                    variant = MICRO_AUTOSIZE[i + 28];
                } else {
                    break;
                }
            }
            variant as i32
        }
    };
    debug_assert!(variant > 0);

    let (cols, rows, k) = {
        let v = MICRO_VARIANTS[variant as usize - 1];
        (v.0 as usize, v.1 as usize, v.2 as usize)
    };
    let capacity = cols * rows - k;

    // Padding, then Structured Append.
    codewords.extend(std::iter::repeat_n(900, capacity - data_len));
    codewords.extend_from_slice(&structapp);

    let rs = Rs929::new(k);
    let check = rs.encode(&codewords);
    codewords.extend_from_slice(&check);

    if symbol.debug {
        log::debug!("Codeword stream with ECC ({}): {:?}", codewords.len(), codewords);
    }

    // Row address patterns and cluster rotate per row.
    let (rap_side, rap_centre) = rap_tables();
    let mut left_rap = variant as usize % 52;
    let mut centre_rap = (variant as usize + 17) % 52;
    let mut right_rap = (variant as usize + 34) % 52;
    let mut cluster = variant as usize % 3;
    let tables = pattern_tables();

    for i in 0..rows {
        let mut bits: Vec<u8> = Vec::with_capacity(cols * 17 + 45);
        let k0 = i * cols;

        bin_append(rap_side[left_rap], 10, &mut bits);
        bin_append(tables[cluster][codewords[k0] as usize], 17, &mut bits);
        if cols >= 2 {
            if cols == 3 {
                bin_append(rap_centre[centre_rap], 10, &mut bits);
            }
            bin_append(tables[cluster][codewords[k0 + 1] as usize], 17, &mut bits);
            if cols >= 3 {
                if cols == 4 {
                    bin_append(rap_centre[centre_rap], 10, &mut bits);
                }
                bin_append(tables[cluster][codewords[k0 + 2] as usize], 17, &mut bits);
                if cols == 4 {
                    bin_append(tables[cluster][codewords[k0 + 3] as usize], 17, &mut bits);
                }
            }
        }
        bin_append(rap_side[right_rap], 10, &mut bits);
        bits.push(b'1'); // stop

        render_row(symbol, i, &bits);

        left_rap = (left_rap + 1) % 52;
        centre_rap = (centre_rap + 1) % 52;
        right_rap = (right_rap + 1) % 52;
        cluster = (cluster + 1) % 3;
    }
    symbol.rows = rows;

    // 2X minimum row height; an earlier option warning takes precedence.
    let height_warning = if warning.is_some() {
        crate::common::set_height(symbol, 2.0, 0.0, 0.0, true);
        None
    } else {
        crate::common::set_height(symbol, 2.0, 0.0, 0.0, false)
    };

    Ok(worse(warning, height_warning))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{StructApp, Symbol, Symbology};

    fn symbol() -> Symbol {
        Symbol::new(Symbology::Pdf417)
    }

    #[test]
    fn test_pattern_tables_shape() {
        let tables = pattern_tables();
        for cluster in 0..3 {
            for &p in tables[cluster].iter() {
                // 17 modules, leading bar, trailing space.
                assert_eq!(p >> 16, 1);
                assert_eq!(p & 1, 0);
            }
        }
        // All patterns within a cluster are distinct.
        for cluster in 0..3 {
            let mut seen = std::collections::HashSet::new();
            assert!(tables[cluster].iter().all(|&p| seen.insert(p)));
        }
    }

    #[test]
    fn test_digits_40_layout() {
        let mut s = symbol();
        s.option_1 = 2;
        s.option_2 = 4;
        let data = vec![b'1'; 40];
        s.encode(&data).unwrap();
        // 40 digits numeric-compact into 1 (length descriptor) + 902 + 14
        // codewords = 16 data codewords; level 2 adds 8 check codewords:
        // total 24, exactly 4 columns x 6 rows with no padding.
        assert_eq!(s.rows, 6);
        // start + left + 4 data + right at 17 modules each, stop 18.
        assert_eq!(s.width, 17 + 17 + 4 * 17 + 17 + 18);
    }

    #[test]
    fn test_numeric_compaction_codewords() {
        // "000213298174000" -> 902, 1, 624, 434, 632, 282, 200
        let mut cws: Vec<u16> = Vec::new();
        numbprocess(&mut cws, b"000213298174000", 0, 15);
        assert_eq!(cws, vec![902, 1, 624, 434, 632, 282, 200]);
    }

    #[test]
    fn test_text_compaction_alpha_pairs() {
        // "PDF417" -> alpha P,D,F then mixed for digits.
        let mut cws: Vec<u16> = Vec::new();
        let mut state = TextState { curtable: T_ALPHA, padded: false };
        textprocess(&mut cws, b"PDF417", 0, 6, BYT, &mut state);
        assert_eq!(cws[0], 900); // mode latch
        // P=15, D=3, F=5, ML=28, 4=4, 1=1, 7=7:
        // pairs (15,3)(5,28)(4,1)(7,PS pad 29)
        assert_eq!(&cws[1..], &[453, 178, 121, 239]);
    }

    #[test]
    fn test_byte_compaction_groups_of_six() {
        // "alcool": 6 bytes -> 924 + 5 codewords.
        let mut cws: Vec<u16> = Vec::new();
        byteprocess(&mut cws, b"alcool", 0, 6, NUM);
        assert_eq!(cws[0], 924);
        assert_eq!(cws.len(), 6);
        // 0x616C636F6F6C = 107118183069548 decimal;
        // base 900: 163 238 432 766 748
        assert_eq!(&cws[1..], &[163, 238, 432, 766, 748]);
    }

    #[test]
    fn test_byte_single_shift_from_text() {
        let mut cws: Vec<u16> = Vec::new();
        byteprocess(&mut cws, b"\xff", 0, 1, TEX);
        assert_eq!(cws, vec![913, 255]);
    }

    #[test]
    fn test_ecc_level_auto_selection() {
        // <= 40 data codewords -> level 2 (8 ecc codewords).
        let mut s = symbol();
        s.encode(b"pdf417").unwrap();
        assert!(s.rows >= 3);
    }

    #[test]
    fn test_explicit_rows_capacity_error() {
        let mut s = symbol();
        s.option_2 = 1;
        s.option_3 = 3;
        let data = vec![b'A'; 200];
        assert_eq!(s.encode(&data).unwrap_err().code(), 5);
    }

    #[test]
    fn test_structapp_block() {
        let mut s = symbol();
        s.structapp = Some(StructApp { index: 2, count: 3, id: "017053".into() });
        let cws = structapp_codewords(&mut s).unwrap();
        assert_eq!(cws[0], 928);
        // index 1: (100000 + 1) / 900 = 111, % 900 = 101
        assert_eq!(cws[1], 111);
        assert_eq!(cws[2], 101);
        assert_eq!(cws[3], 17); // id triplet "017"
        assert_eq!(cws[4], 53); // id triplet "053"
        assert_eq!(cws[5], 923);
        assert_eq!(cws[6], 1);
        // count: (100000 + 3) / 900 = 111, % 900 = 103
        assert_eq!(cws[7], 111);
        assert_eq!(cws[8], 103);
        assert_eq!(cws.len(), 9); // not the last segment: no 922
    }

    #[test]
    fn test_structapp_last_segment_terminator() {
        let mut s = symbol();
        s.structapp = Some(StructApp { index: 3, count: 3, id: String::new() });
        let cws = structapp_codewords(&mut s).unwrap();
        assert_eq!(*cws.last().unwrap(), 922);
    }

    #[test]
    fn test_structapp_validation() {
        let mut s = symbol();
        s.structapp = Some(StructApp { index: 4, count: 3, id: String::new() });
        assert_eq!(structapp_codewords(&mut s).unwrap_err().code(), 8);
        s.structapp = Some(StructApp { index: 1, count: 1, id: String::new() });
        assert_eq!(structapp_codewords(&mut s).unwrap_err().code(), 8);
        s.structapp = Some(StructApp { index: 1, count: 2, id: "90A".into() });
        assert_eq!(structapp_codewords(&mut s).unwrap_err().code(), 8);
    }

    #[test]
    fn test_micro_variant_selection() {
        let mut s = Symbol::new(Symbology::MicroPdf417);
        s.encode(b"01234567").unwrap();
        assert!(s.rows > 0);
        assert!(s.width > 0);
    }

    #[test]
    fn test_micro_rejects_rows_option() {
        let mut s = Symbol::new(Symbology::MicroPdf417);
        s.option_3 = 10;
        assert_eq!(s.encode(b"123").unwrap_err().code(), 8);
    }

    #[test]
    fn test_micro_columns_too_small_warns_and_grows() {
        let mut s = Symbol::new(Symbology::MicroPdf417);
        s.option_2 = 1;
        let data = vec![b'A'; 60];
        let warning = s.encode(&data).unwrap();
        assert_eq!(warning, Some(Warning::InvalidOption));
    }

    #[test]
    fn test_compact_variant_narrower() {
        let mut full = Symbol::new(Symbology::Pdf417);
        full.encode(b"compact").unwrap();
        let mut compact = Symbol::new(Symbology::Pdf417Comp);
        compact.encode(b"compact").unwrap();
        assert!(compact.width < full.width);
        assert_eq!(compact.rows, full.rows);
    }
}
